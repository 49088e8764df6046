use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::analytics::error::{storage_error, AnalyticsResult};
use crate::analytics::Storage;

/// In-memory storage that records every read and write.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<(String, String)>>>,
    reads: Arc<AtomicUsize>,
}

impl RecordingStorage {
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get_item(&self, key: &str) -> AnalyticsResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> AnalyticsResult<()> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> AnalyticsResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Storage whose every operation fails.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn get_item(&self, key: &str) -> AnalyticsResult<Option<String>> {
        Err(storage_error(format!("cannot read `{key}`")))
    }

    async fn set_item(&self, key: &str, _value: &str) -> AnalyticsResult<()> {
        Err(storage_error(format!("cannot write `{key}`")))
    }

    async fn remove_item(&self, key: &str) -> AnalyticsResult<()> {
        Err(storage_error(format!("cannot remove `{key}`")))
    }
}
