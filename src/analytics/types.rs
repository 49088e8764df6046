use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analytics::constants::{CONSENT_MARKETING, CONSENT_PREFERENCES, CONSENT_STATISTICS};

/// Free-form JSON object used for event properties, user traits and context fragments.
pub type JsonMap = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Track,
    Screen,
}

impl TrackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Track => "track",
            TrackType::Screen => "screen",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category consent flags. Categories that were never set count as denied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentState {
    pub entries: BTreeMap<String, bool>,
}

impl ConsentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: impl Into<String>, granted: bool) -> Self {
        self.entries.insert(category.into(), granted);
        self
    }

    pub fn granted(&self, category: &str) -> bool {
        self.entries.get(category).copied().unwrap_or(false)
    }

    pub fn statistics(&self) -> bool {
        self.granted(CONSENT_STATISTICS)
    }

    pub fn marketing(&self) -> bool {
        self.granted(CONSENT_MARKETING)
    }

    pub fn preferences(&self) -> bool {
        self.granted(CONSENT_PREFERENCES)
    }
}

impl<K, const N: usize> From<[(K, bool); N]> for ConsentState
where
    K: Into<String>,
{
    fn from(entries: [(K, bool); N]) -> Self {
        Self {
            entries: entries.into_iter().map(|(key, value)| (key.into(), value)).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub id: Option<String>,
    pub local_id: Option<String>,
    pub traits: JsonMap,
}

impl UserSnapshot {
    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }
}

/// Fully assembled event handed to every loaded integration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub track_type: TrackType,
    pub event: String,
    pub properties: JsonMap,
    pub context: JsonMap,
    pub user: UserSnapshot,
    pub consent: ConsentState,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

impl EventEnvelope {
    /// The caller-supplied event context, stored under the `event` key of the merged context.
    pub fn event_context(&self) -> Option<&JsonMap> {
        self.context.get("event").and_then(Value::as_object)
    }
}

/// Snapshot handed to integrations when they are created and whenever the user changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshot {
    pub user: UserSnapshot,
    pub consent: ConsentState,
    pub context: JsonMap,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LastScreenRecord {
    pub name: String,
    pub properties: JsonMap,
    pub event_context: Option<JsonMap>,
}
