//! Default context providers backed by the host platform.
//!
//! The native side (device-info bridge, window metrics, locale settings) is reached through the
//! [`PlatformInfo`] trait so the providers stay testable without a device.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::analytics::constants::{DEFAULT_DEVICE_LANGUAGE, UNKNOWN_DEVICE_MODEL};
use crate::analytics::context::{ContextProvider, ContextScope};
use crate::analytics::error::AnalyticsResult;
use crate::analytics::types::JsonMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingSystem {
    Ios,
    Android,
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowDimensions {
    pub width: f64,
    pub height: f64,
}

/// Read-only view of the device the application runs on.
pub trait PlatformInfo: Send + Sync {
    fn os(&self) -> OperatingSystem;

    /// `AppleLocale` from the iOS settings manager.
    fn apple_locale(&self) -> Option<String> {
        None
    }

    /// `AppleLanguages` from the iOS settings manager, preferred language first.
    fn apple_languages(&self) -> Vec<String> {
        Vec::new()
    }

    /// Locale identifier reported by the Android i18n manager.
    fn android_locale(&self) -> Option<String> {
        None
    }

    fn model(&self) -> String;

    fn device_id(&self) -> String;

    fn system_name(&self) -> String;

    fn system_version(&self) -> String;

    fn window_dimensions(&self) -> WindowDimensions;
}

fn single(key: &str, value: Value) -> JsonMap {
    let mut fragment = JsonMap::new();
    fragment.insert(key.to_string(), value);
    fragment
}

/// Adds `deviceLanguage`, falling back to `"en"` when the platform reports nothing.
pub struct DeviceLanguageContext {
    platform: Arc<dyn PlatformInfo>,
}

impl DeviceLanguageContext {
    pub fn new(platform: Arc<dyn PlatformInfo>) -> Self {
        Self { platform }
    }

    fn device_locale(&self) -> String {
        let locale = match self.platform.os() {
            OperatingSystem::Ios => self
                .platform
                .apple_locale()
                .or_else(|| self.platform.apple_languages().into_iter().next()),
            OperatingSystem::Android => self.platform.android_locale(),
            OperatingSystem::Other => None,
        };

        locale
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE_LANGUAGE.to_string())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ContextProvider for DeviceLanguageContext {
    fn name(&self) -> &str {
        "deviceLanguage"
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        Ok(single("deviceLanguage", json!(self.device_locale())))
    }
}

/// Adds `device` with the model name. iOS model names come from a maintained lookup table, so an
/// `"unknown"` model falls back to the raw device id.
pub struct DeviceModelContext {
    platform: Arc<dyn PlatformInfo>,
}

impl DeviceModelContext {
    pub fn new(platform: Arc<dyn PlatformInfo>) -> Self {
        Self { platform }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ContextProvider for DeviceModelContext {
    fn name(&self) -> &str {
        "device"
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        let mut model = self.platform.model();
        if model == UNKNOWN_DEVICE_MODEL {
            model = self.platform.device_id();
        }
        Ok(single("device", json!(model)))
    }
}

/// Adds `deviceOS` as `"<system name> <system version>"`.
pub struct DeviceOsContext {
    platform: Arc<dyn PlatformInfo>,
}

impl DeviceOsContext {
    pub fn new(platform: Arc<dyn PlatformInfo>) -> Self {
        Self { platform }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ContextProvider for DeviceOsContext {
    fn name(&self) -> &str {
        "deviceOS"
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        let os = format!(
            "{} {}",
            self.platform.system_name(),
            self.platform.system_version()
        );
        Ok(single("deviceOS", json!(os)))
    }
}

/// Adds `screenWidth` and `screenHeight` from the application window.
pub struct ScreenDimensionsContext {
    platform: Arc<dyn PlatformInfo>,
}

impl ScreenDimensionsContext {
    pub fn new(platform: Arc<dyn PlatformInfo>) -> Self {
        Self { platform }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ContextProvider for ScreenDimensionsContext {
    fn name(&self) -> &str {
        "screenDimensions"
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        let dimensions = self.platform.window_dimensions();
        let mut fragment = single("screenWidth", json!(dimensions.width));
        fragment.insert("screenHeight".into(), json!(dimensions.height));
        Ok(fragment)
    }
}

/// The providers registered by default on a mobile analytics instance, in registration order.
pub fn default_platform_providers(platform: Arc<dyn PlatformInfo>) -> Vec<Arc<dyn ContextProvider>> {
    vec![
        Arc::new(DeviceLanguageContext::new(platform.clone())) as Arc<dyn ContextProvider>,
        Arc::new(DeviceModelContext::new(platform.clone())),
        Arc::new(DeviceOsContext::new(platform.clone())),
        Arc::new(ScreenDimensionsContext::new(platform)),
    ]
}
