use crate::analytics::constants::{DEFAULT_PLATFORM, LIBRARY_VERSION, LOCAL_ID_DEFAULT_KEY, PACKAGE_NAME};

/// Static configuration of an [`Analytics`](crate::analytics::Analytics) instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyticsSettings {
    /// Platform label attached to every envelope.
    pub platform: String,
    /// Reported under `context.library.name`.
    pub library_name: String,
    /// Reported under `context.library.version`.
    pub library_version: String,
    /// Storage key of the anonymous local user id.
    pub local_id_storage_key: String,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            platform: DEFAULT_PLATFORM.to_string(),
            library_name: PACKAGE_NAME.to_string(),
            library_version: LIBRARY_VERSION.to_string(),
            local_id_storage_key: LOCAL_ID_DEFAULT_KEY.to_string(),
        }
    }
}

impl AnalyticsSettings {
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_local_id_storage_key(mut self, key: impl Into<String>) -> Self {
        self.local_id_storage_key = key.into();
        self
    }
}
