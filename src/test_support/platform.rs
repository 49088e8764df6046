use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::analytics::error::AnalyticsResult;
use crate::analytics::{ContextProvider, ContextScope, JsonMap, OperatingSystem, PlatformInfo, WindowDimensions};

#[derive(Clone, Debug)]
pub struct FakePlatform {
    pub os: OperatingSystem,
    pub apple_locale: Option<String>,
    pub apple_languages: Vec<String>,
    pub android_locale: Option<String>,
    pub model: String,
    pub device_id: String,
    pub system_name: String,
    pub system_version: String,
    pub dimensions: WindowDimensions,
}

impl FakePlatform {
    pub fn iphone() -> Self {
        Self {
            os: OperatingSystem::Ios,
            apple_locale: None,
            apple_languages: Vec::new(),
            android_locale: None,
            model: "iPhone 11 Pro Max".into(),
            device_id: "iPhone12,5".into(),
            system_name: "iOS".into(),
            system_version: "13.0".into(),
            dimensions: WindowDimensions {
                width: 800.0,
                height: 1000.0,
            },
        }
    }

    pub fn android() -> Self {
        Self {
            os: OperatingSystem::Android,
            model: "Pixel 4".into(),
            device_id: "flame".into(),
            system_name: "Android".into(),
            system_version: "11".into(),
            ..Self::iphone()
        }
    }
}

impl PlatformInfo for FakePlatform {
    fn os(&self) -> OperatingSystem {
        self.os
    }

    fn apple_locale(&self) -> Option<String> {
        self.apple_locale.clone()
    }

    fn apple_languages(&self) -> Vec<String> {
        self.apple_languages.clone()
    }

    fn android_locale(&self) -> Option<String> {
        self.android_locale.clone()
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn device_id(&self) -> String {
        self.device_id.clone()
    }

    fn system_name(&self) -> String {
        self.system_name.clone()
    }

    fn system_version(&self) -> String {
        self.system_version.clone()
    }

    fn window_dimensions(&self) -> WindowDimensions {
        self.dimensions
    }
}

/// Context provider counting how many times it was resolved.
#[derive(Clone, Default)]
pub struct CountingContext {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ContextProvider for CountingContext {
    fn name(&self) -> &str {
        "counting"
    }

    async fn resolve(&self, _scope: &ContextScope) -> AnalyticsResult<JsonMap> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut fragment = JsonMap::new();
        fragment.insert("resolutions".into(), json!(calls));
        Ok(fragment)
    }
}
