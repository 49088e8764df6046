//! Context aggregation.
//!
//! Every event carries a context object assembled from the registered [`ContextProvider`]s.
//! Providers run concurrently and their fragments are shallow-merged in registration order, so a
//! provider registered later overrides keys produced by earlier ones. A provider that fails (or
//! panics) is logged and skipped; context is enrichment and never blocks an event.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::{json, Value};

use crate::analytics::constants::{LIBRARY_VERSION, PACKAGE_NAME};
use crate::analytics::error::AnalyticsResult;
use crate::analytics::logger::LOGGER;
use crate::analytics::storage::Storage;
use crate::analytics::types::JsonMap;

/// Capabilities available to providers while a context is being resolved.
#[derive(Clone, Default)]
pub struct ContextScope {
    storage: Option<Arc<dyn Storage>>,
}

impl ContextScope {
    pub fn new(storage: Option<Arc<dyn Storage>>) -> Self {
        Self { storage }
    }

    /// Storage assigned to the analytics instance, if any.
    pub fn storage(&self) -> Option<Arc<dyn Storage>> {
        self.storage.clone()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ContextProvider: Send + Sync {
    /// Label used when reporting failures.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn resolve(&self, scope: &ContextScope) -> AnalyticsResult<JsonMap>;
}

/// Adapts a synchronous closure into a [`ContextProvider`].
pub struct FnContextProvider<F> {
    name: String,
    provide: F,
}

impl<F> FnContextProvider<F>
where
    F: Fn() -> JsonMap + Send + Sync,
{
    pub fn new(name: impl Into<String>, provide: F) -> Self {
        Self {
            name: name.into(),
            provide,
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<F> ContextProvider for FnContextProvider<F>
where
    F: Fn() -> JsonMap + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        Ok((self.provide)())
    }
}

/// Describes the library that produced the event.
#[derive(Clone, Debug)]
pub struct LibraryContext {
    name: String,
    version: String,
}

impl LibraryContext {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for LibraryContext {
    fn default() -> Self {
        Self::new(PACKAGE_NAME, LIBRARY_VERSION)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ContextProvider for LibraryContext {
    fn name(&self) -> &str {
        "library"
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        let mut fragment = JsonMap::new();
        fragment.insert(
            "library".into(),
            json!({ "name": self.name, "version": self.version }),
        );
        Ok(fragment)
    }
}

#[derive(Default)]
pub struct ContextAggregator {
    providers: Mutex<Vec<Arc<dyn ContextProvider>>>,
}

impl ContextAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&self, provider: Arc<dyn ContextProvider>) {
        self.providers.lock().unwrap().push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every provider once and merges the fragments; later providers win conflicts.
    pub async fn resolve(&self, scope: &ContextScope) -> JsonMap {
        let providers = self.providers.lock().unwrap().clone();

        let outcomes = join_all(providers.iter().map(|provider| async move {
            let outcome = AssertUnwindSafe(provider.resolve(scope)).catch_unwind().await;
            (provider.name().to_string(), outcome)
        }))
        .await;

        let mut merged = JsonMap::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(Ok(fragment)) => merged.extend(fragment),
                Ok(Err(err)) => {
                    LOGGER.warn(format!("context provider `{name}` failed: {err}"));
                }
                Err(_) => {
                    LOGGER.error(format!("context provider `{name}` panicked"));
                }
            }
        }
        merged
    }
}

/// Builds the context of one event: the aggregated context with the caller's event context
/// nested under `event`. The event context never reaches the top level.
pub(crate) fn with_event_context(mut context: JsonMap, event_context: Option<&JsonMap>) -> JsonMap {
    let event = event_context.cloned().unwrap_or_default();
    context.insert("event".into(), Value::Object(event));
    context
}
