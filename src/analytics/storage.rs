//! Key-value persistence used for the install identifier and the anonymous local id.
//!
//! The host application injects a [`Storage`] implementation through
//! [`Analytics::set_storage`](crate::analytics::Analytics::set_storage). [`InMemoryStorage`]
//! suits tests and ephemeral sessions; [`FileStorage`] keeps values in a JSON file so ids survive
//! process restarts on desktop and server targets.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::analytics::error::{storage_error, AnalyticsResult};

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Storage: Send + Sync {
    async fn get_item(&self, key: &str) -> AnalyticsResult<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> AnalyticsResult<()>;
    async fn remove_item(&self, key: &str) -> AnalyticsResult<()>;
}

/// Reads the identifier stored under `key`, generating and persisting a UUID v4 when absent.
pub(crate) async fn get_or_create_id(storage: &dyn Storage, key: &str) -> AnalyticsResult<String> {
    if let Some(stored) = storage.get_item(key).await? {
        if !stored.is_empty() {
            return Ok(stored);
        }
    }
    let generated = uuid::Uuid::new_v4().to_string();
    storage.set_item(key, &generated).await?;
    Ok(generated)
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Storage for InMemoryStorage {
    async fn get_item(&self, key: &str) -> AnalyticsResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> AnalyticsResult<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> AnalyticsResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Stores every key in a single `storage.json` file inside `base_dir`.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf) -> AnalyticsResult<Self> {
        fs::create_dir_all(&base_dir).map_err(|err| {
            storage_error(format!(
                "Failed to create analytics storage directory '{}': {}",
                base_dir.display(),
                err
            ))
        })?;
        Ok(Self {
            path: Arc::new(base_dir.join("storage.json")),
            lock: Arc::new(Mutex::new(())),
        })
    }

    /// Uses `NATIVE_ANALYTICS_STORAGE_DIR` when set, `./.native-analytics` otherwise.
    pub fn from_env() -> AnalyticsResult<Self> {
        if let Ok(dir) = std::env::var("NATIVE_ANALYTICS_STORAGE_DIR") {
            return Self::new(PathBuf::from(dir));
        }

        let dir = std::env::current_dir()
            .map_err(|err| storage_error(format!("Failed to obtain working directory: {err}")))?
            .join(".native-analytics");
        Self::new(dir)
    }

    fn read_all(&self) -> AnalyticsResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = fs::read(self.path.as_ref()).map_err(|err| {
            storage_error(format!(
                "Failed to read analytics storage '{}': {}",
                self.path.display(),
                err
            ))
        })?;
        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                log::warn!(
                    "discarding unreadable analytics storage '{}': {err}",
                    self.path.display()
                );
                Ok(HashMap::new())
            }
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> AnalyticsResult<()> {
        let bytes = serde_json::to_vec(entries).map_err(|err| {
            storage_error(format!(
                "Failed to serialize analytics storage '{}': {}",
                self.path.display(),
                err
            ))
        })?;
        fs::write(self.path.as_ref(), bytes).map_err(|err| {
            storage_error(format!(
                "Failed to write analytics storage '{}': {}",
                self.path.display(),
                err
            ))
        })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> AnalyticsResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_all()?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> AnalyticsResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    async fn remove_item(&self, key: &str) -> AnalyticsResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
