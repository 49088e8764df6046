pub const PACKAGE_NAME: &str = "native-analytics";
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ANALYTICS_LOGGER_NAME: &str = "@native-analytics/analytics";

/// Storage key under which the install identifier is persisted unless overridden.
pub const CLIENT_INSTALL_ID_DEFAULT_KEY: &str = "native-analytics/clientInstallIdContext";
/// Storage key under which the anonymous local user id is persisted unless overridden.
pub const LOCAL_ID_DEFAULT_KEY: &str = "native-analytics/localId";

pub const DEFAULT_PLATFORM: &str = "mobile";
pub const DEFAULT_DEVICE_LANGUAGE: &str = "en";
pub const UNKNOWN_DEVICE_MODEL: &str = "unknown";

pub const CONSENT_STATISTICS: &str = "statistics";
pub const CONSENT_MARKETING: &str = "marketing";
pub const CONSENT_PREFERENCES: &str = "preferences";
