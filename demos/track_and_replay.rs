//! Registers a console integration gated on marketing consent, records a screen view before the
//! user decides, then grants consent and watches the screen get replayed.
//!
//! Run with `cargo run --example track_and_replay`.

use std::sync::Arc;

use async_trait::async_trait;
use native_analytics::analytics::error::AnalyticsResult;
use native_analytics::analytics::event_types;
use native_analytics::analytics::{
    Analytics, AnalyticsHelper, ConsentState, EventEnvelope, InMemoryStorage, Integration,
    IntegrationAdapter, IntegrationHandle, IntegrationOptions, JsonMap, LoadSnapshot,
};
use serde_json::json;

struct Console {
    prefix: String,
}

#[async_trait]
impl Integration for Console {
    async fn track(&self, envelope: &EventEnvelope) -> AnalyticsResult<()> {
        println!(
            "[{}] {} {:?} context={}",
            self.prefix,
            envelope.track_type,
            envelope.event,
            serde_json::Value::Object(envelope.context.clone())
        );
        Ok(())
    }

    async fn on_set_user(&self, load: &LoadSnapshot) -> AnalyticsResult<()> {
        println!("[{}] user is now {:?}", self.prefix, load.user.id);
        Ok(())
    }
}

struct ConsoleAdapter;

impl IntegrationAdapter for ConsoleAdapter {
    fn should_load(&self, consent: Option<&ConsentState>) -> bool {
        consent.is_some_and(ConsentState::marketing)
    }

    fn create_instance(
        &self,
        options: &IntegrationOptions,
        _load: &LoadSnapshot,
        _helper: AnalyticsHelper,
    ) -> AnalyticsResult<IntegrationHandle> {
        let prefix = options
            .get("prefix")
            .and_then(|value| value.as_str())
            .unwrap_or("console")
            .to_string();
        Ok(IntegrationHandle::new(Console { prefix }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnalyticsResult<()> {
    let analytics = Analytics::new();
    analytics.set_storage(Arc::new(InMemoryStorage::new()));
    analytics.add_context_fn("appVersion", || {
        let mut fragment = JsonMap::new();
        fragment.insert("appVersion".into(), json!("4.2.0"));
        fragment
    });
    analytics.add_integration("console", Arc::new(ConsoleAdapter), json!({ "prefix": "demo" }))?;

    analytics.ready().await?;
    analytics.set_user("user-42", None).await;

    let mut screen_context = JsonMap::new();
    screen_context.insert("tab".into(), json!("feed"));
    analytics
        .screen("Home", Default::default(), Some(screen_context))
        .await;
    analytics
        .track(event_types::VIEWED_PROMOTION, Default::default(), None)
        .await;
    println!("nothing delivered yet: marketing consent not granted");

    analytics
        .set_consent(ConsentState::new().with("marketing", true))
        .await;

    analytics
        .track(event_types::SELECTED_PROMOTION, Default::default(), None)
        .await;
    Ok(())
}
