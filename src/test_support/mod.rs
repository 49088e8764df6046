//! Test utilities shared across crate-level unit tests.

pub mod integrations;
pub mod platform;
pub mod storage;

pub use integrations::{load_snapshot, FailingIntegration, RecordingIntegration, TestAdapter};
pub use platform::{CountingContext, FakePlatform};
pub use storage::{FailingStorage, RecordingStorage};

use serde_json::Value;

use crate::analytics::JsonMap;

/// Unwraps a `json!({...})` literal into an object map.
pub fn object(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
