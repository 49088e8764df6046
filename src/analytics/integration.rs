//! Contract implemented by third-party integrations.
//!
//! An integration is registered as an [`IntegrationAdapter`] (the factory side, consulted while
//! deciding whether to load) and, once loaded, lives as an [`Integration`] instance receiving
//! every event.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::analytics::api::AnalyticsHelper;
use crate::analytics::error::AnalyticsResult;
use crate::analytics::types::{ConsentState, EventEnvelope, LoadSnapshot};

/// Options passed verbatim to [`IntegrationAdapter::create_instance`].
pub type IntegrationOptions = Value;

pub trait IntegrationAdapter: Send + Sync {
    /// Decides whether the integration may load under `consent`. `None` means no consent was
    /// given yet; adapters that do not depend on consent should return `true` regardless.
    fn should_load(&self, consent: Option<&ConsentState>) -> bool;

    fn create_instance(
        &self,
        options: &IntegrationOptions,
        load: &LoadSnapshot,
        helper: AnalyticsHelper,
    ) -> AnalyticsResult<IntegrationHandle>;

    /// Checked when the integration is registered.
    fn validate_options(&self, _options: &IntegrationOptions) -> AnalyticsResult<()> {
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Integration: Send + Sync {
    async fn track(&self, envelope: &EventEnvelope) -> AnalyticsResult<()>;

    async fn on_set_user(&self, _load: &LoadSnapshot) -> AnalyticsResult<()> {
        Ok(())
    }
}

/// A loaded integration instance.
///
/// Cloning is cheap; every clone points at the same instance. [`downcast`](Self::downcast)
/// recovers the concrete type for integration-specific calls.
#[derive(Clone)]
pub struct IntegrationHandle {
    integration: Arc<dyn Integration>,
    any: Arc<dyn Any + Send + Sync>,
}

impl IntegrationHandle {
    pub fn new<T>(integration: T) -> Self
    where
        T: Integration + 'static,
    {
        Self::from_arc(Arc::new(integration))
    }

    pub fn from_arc<T>(integration: Arc<T>) -> Self
    where
        T: Integration + 'static,
    {
        Self {
            integration: integration.clone(),
            any: integration,
        }
    }

    pub fn integration(&self) -> &Arc<dyn Integration> {
        &self.integration
    }

    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Integration + 'static,
    {
        self.any.clone().downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &IntegrationHandle) -> bool {
        Arc::ptr_eq(&self.any, &other.any)
    }
}

impl fmt::Debug for IntegrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationHandle").finish_non_exhaustive()
    }
}
