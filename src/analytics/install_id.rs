use std::sync::Arc;

use async_lock::Mutex;
use async_trait::async_trait;
use serde_json::json;

use crate::analytics::constants::CLIENT_INSTALL_ID_DEFAULT_KEY;
use crate::analytics::context::{ContextProvider, ContextScope};
use crate::analytics::error::{storage_not_set, AnalyticsResult};
use crate::analytics::storage::{get_or_create_id, Storage};
use crate::analytics::types::JsonMap;

#[derive(Clone, Default)]
pub struct ClientInstallIdOptions {
    /// Storage used for the identifier. Defaults to the storage of the analytics instance.
    pub storage: Option<Arc<dyn Storage>>,
    /// Key under which the identifier is persisted.
    pub storage_key: Option<String>,
}

/// Adds `app.clientInstallId`, a UUID identifying one installation of the application.
///
/// The identifier is read from storage on first use, generated and persisted when absent, and
/// cached in memory afterwards. Storage failures surface as errors, which the context aggregator
/// absorbs.
pub struct ClientInstallIdContext {
    storage: Option<Arc<dyn Storage>>,
    storage_key: String,
    cached: Mutex<Option<String>>,
}

impl ClientInstallIdContext {
    pub fn new(options: ClientInstallIdOptions) -> Self {
        Self {
            storage: options.storage,
            storage_key: options
                .storage_key
                .unwrap_or_else(|| CLIENT_INSTALL_ID_DEFAULT_KEY.to_string()),
            cached: Mutex::new(None),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Returns the identifier, generating and persisting it on first call.
    pub async fn client_install_id(&self, scope: &ContextScope) -> AnalyticsResult<String> {
        // Held across the storage round trip so concurrent first calls agree on one id.
        let mut cached = self.cached.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let storage = self.storage.clone().or_else(|| scope.storage()).ok_or_else(|| {
            storage_not_set("No storage available to persist the client install id")
        })?;

        let id = get_or_create_id(storage.as_ref(), &self.storage_key).await?;
        *cached = Some(id.clone());
        Ok(id)
    }
}

impl Default for ClientInstallIdContext {
    fn default() -> Self {
        Self::new(ClientInstallIdOptions::default())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ContextProvider for ClientInstallIdContext {
    fn name(&self) -> &str {
        "clientInstallId"
    }

    async fn resolve(&self, scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        let id = self.client_install_id(scope).await?;
        let mut fragment = JsonMap::new();
        fragment.insert("app".into(), json!({ "clientInstallId": id }));
        Ok(fragment)
    }
}
