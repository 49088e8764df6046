//! Persists the client install id to disk. Running the demo twice prints the same id.
//!
//! Set `NATIVE_ANALYTICS_STORAGE_DIR` to choose where `storage.json` is written.

use std::sync::Arc;

use native_analytics::analytics::error::AnalyticsResult;
use native_analytics::analytics::{Analytics, ClientInstallIdContext, FileStorage};
use native_analytics::logger::{set_log_level, LogLevel};

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnalyticsResult<()> {
    if let Err(err) = set_log_level(LogLevel::Debug) {
        eprintln!("{err}");
    }

    let analytics = Analytics::new();
    analytics.set_storage(Arc::new(FileStorage::from_env()?));
    analytics.add_context_provider(Arc::new(ClientInstallIdContext::default()));
    analytics.ready().await?;

    let context = analytics.context().await;
    match context.get("app").and_then(|app| app.get("clientInstallId")) {
        Some(id) => println!("client install id: {id}"),
        None => println!("no client install id could be resolved"),
    }
    Ok(())
}
