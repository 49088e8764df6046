mod api;
mod config;
pub mod constants;
mod context;
pub mod error;
pub mod event_types;
mod install_id;
mod integration;
mod loader;
mod logger;
mod platform;
mod registry;
mod storage;
mod types;

pub use api::{Analytics, AnalyticsHelper, LifecycleState};
pub use config::AnalyticsSettings;
pub use context::{ContextAggregator, ContextProvider, ContextScope, FnContextProvider, LibraryContext};
pub use install_id::{ClientInstallIdContext, ClientInstallIdOptions};
pub use integration::{Integration, IntegrationAdapter, IntegrationHandle, IntegrationOptions};
pub use platform::{
    default_platform_providers, DeviceLanguageContext, DeviceModelContext, DeviceOsContext, OperatingSystem,
    PlatformInfo, ScreenDimensionsContext, WindowDimensions,
};
pub use registry::{IntegrationRegistration, IntegrationRegistry};
pub use storage::{FileStorage, InMemoryStorage, Storage};
pub use types::{ConsentState, EventEnvelope, JsonMap, LoadSnapshot, TrackType, UserSnapshot};
