use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, Weak};

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;

use crate::analytics::config::AnalyticsSettings;
use crate::analytics::context::{
    with_event_context, ContextAggregator, ContextProvider, ContextScope, FnContextProvider, LibraryContext,
};
use crate::analytics::error::{storage_not_set, AnalyticsResult};
use crate::analytics::integration::{IntegrationAdapter, IntegrationHandle, IntegrationOptions};
use crate::analytics::loader;
use crate::analytics::logger::LOGGER;
use crate::analytics::platform::{default_platform_providers, PlatformInfo};
use crate::analytics::registry::IntegrationRegistry;
use crate::analytics::storage::{get_or_create_id, Storage};
use crate::analytics::types::{
    ConsentState, EventEnvelope, JsonMap, LastScreenRecord, LoadSnapshot, TrackType, UserSnapshot,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// No storage assigned yet.
    Uninitialized,
    /// Storage assigned; `ready` has not completed.
    AwaitingStorage,
    /// `ready` completed; integrations are loaded as consent allows.
    Ready,
}

/// Analytics dispatch engine.
///
/// Accepts `track`/`screen` calls, enriches them with the aggregated context and delivers the
/// resulting [`EventEnvelope`] to every loaded integration. Integrations load lazily on
/// [`ready`](Self::ready) and [`set_consent`](Self::set_consent); the ones loading after a screen
/// view receive a replay of the last screen.
///
/// The handle is cheap to clone and is meant to be created once per application and passed to
/// whatever emits events. Integration and context failures are logged, never returned.
#[derive(Clone)]
pub struct Analytics {
    inner: Arc<AnalyticsInner>,
}

impl fmt::Debug for Analytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analytics")
            .field("platform", &self.inner.settings.platform)
            .field("state", &self.state())
            .field("integrations", &self.inner.integrations.len())
            .finish()
    }
}

struct AnalyticsInner {
    settings: AnalyticsSettings,
    state: Mutex<LifecycleState>,
    storage: Mutex<Option<Arc<dyn Storage>>>,
    user: Mutex<UserSnapshot>,
    consent: Mutex<Option<ConsentState>>,
    last_screen: Mutex<Option<LastScreenRecord>>,
    contexts: ContextAggregator,
    integrations: IntegrationRegistry,
    ready_gate: async_lock::Mutex<()>,
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

impl Analytics {
    /// Creates an instance with default settings and only the library context registered.
    pub fn new() -> Self {
        Self::with_settings(AnalyticsSettings::default())
    }

    pub fn with_settings(settings: AnalyticsSettings) -> Self {
        let contexts = ContextAggregator::new();
        contexts.add_provider(Arc::new(LibraryContext::new(
            settings.library_name.clone(),
            settings.library_version.clone(),
        )));

        let inner = AnalyticsInner {
            settings,
            state: Mutex::new(LifecycleState::Uninitialized),
            storage: Mutex::new(None),
            user: Mutex::new(UserSnapshot::default()),
            consent: Mutex::new(None),
            last_screen: Mutex::new(None),
            contexts,
            integrations: IntegrationRegistry::new(),
            ready_gate: async_lock::Mutex::new(()),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates an instance for a mobile device, registering the device language, model, OS and
    /// screen dimension contexts.
    pub fn for_platform(platform: Arc<dyn PlatformInfo>, settings: AnalyticsSettings) -> Self {
        let analytics = Self::with_settings(settings);
        for provider in default_platform_providers(platform) {
            analytics.inner.contexts.add_provider(provider);
        }
        analytics
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.inner.settings
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock().unwrap()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Assigns the storage used for the install identifier and the local user id.
    ///
    /// Calling it again replaces the previous storage (last write wins). Identifiers already
    /// cached in memory are kept.
    pub fn set_storage(&self, storage: Arc<dyn Storage>) -> &Self {
        let previous = self.inner.storage.lock().unwrap().replace(storage);
        if previous.is_some() {
            LOGGER.warn("storage was already set; the new storage replaces it");
        }

        let mut state = self.inner.state.lock().unwrap();
        if *state == LifecycleState::Uninitialized {
            *state = LifecycleState::AwaitingStorage;
        }
        self
    }

    pub fn storage(&self) -> Option<Arc<dyn Storage>> {
        self.inner.storage.lock().unwrap().clone()
    }

    pub fn add_context_provider(&self, provider: Arc<dyn ContextProvider>) -> &Self {
        self.inner.contexts.add_provider(provider);
        self
    }

    /// Registers a synchronous closure as a context provider.
    pub fn add_context_fn<F>(&self, name: impl Into<String>, provide: F) -> &Self
    where
        F: Fn() -> JsonMap + Send + Sync + 'static,
    {
        self.add_context_provider(Arc::new(FnContextProvider::new(name, provide)))
    }

    /// Resolves every registered context provider into one merged object.
    pub async fn context(&self) -> JsonMap {
        let scope = ContextScope::new(self.storage());
        self.inner.contexts.resolve(&scope).await
    }

    /// Registers an integration. It is loaded on `ready` or on a later consent change, as soon
    /// as its adapter accepts the current consent.
    pub fn add_integration(
        &self,
        name: &str,
        adapter: Arc<dyn IntegrationAdapter>,
        options: IntegrationOptions,
    ) -> AnalyticsResult<&Self> {
        self.inner.integrations.register(name, adapter, options)?;
        Ok(self)
    }

    /// The loaded instance registered under `name`, if any.
    pub fn integration(&self, name: &str) -> Option<IntegrationHandle> {
        self.inner.integrations.get(name)
    }

    pub fn clear_integrations(&self) {
        self.inner.integrations.clear();
    }

    pub fn user(&self) -> UserSnapshot {
        self.inner.user.lock().unwrap().clone()
    }

    pub fn consent(&self) -> Option<ConsentState> {
        self.inner.consent.lock().unwrap().clone()
    }

    /// Identifies the current user. Loaded integrations are notified through `on_set_user` once
    /// the instance is ready; repeated calls with the same id are not deduplicated.
    pub async fn set_user(&self, id: impl Into<String>, traits: Option<JsonMap>) -> &Self {
        {
            let mut user = self.inner.user.lock().unwrap();
            user.id = Some(id.into());
            user.traits = traits.unwrap_or_default();
        }
        self.notify_user_changed().await;
        self
    }

    /// Forgets the user id and traits. The anonymous local id is kept.
    pub async fn anonymize(&self) -> &Self {
        {
            let mut user = self.inner.user.lock().unwrap();
            user.id = None;
            user.traits = JsonMap::new();
        }
        self.notify_user_changed().await;
        self
    }

    /// Replaces the consent state. Once ready, integrations accepting the new consent are loaded
    /// and receive the last screen view, if one was tracked.
    pub async fn set_consent(&self, consent: ConsentState) -> &Self {
        *self.inner.consent.lock().unwrap() = Some(consent);

        if self.is_ready() {
            let newly_loaded = self.load_integrations().await;
            self.on_loaded_integrations(&newly_loaded).await;
        }
        self
    }

    /// Completes initialization: assigns the local user id and loads every integration accepting
    /// the current consent. Requires a storage. Subsequent calls return immediately.
    pub async fn ready(&self) -> AnalyticsResult<&Self> {
        if self.is_ready() {
            return Ok(self);
        }

        let _gate = self.inner.ready_gate.lock().await;
        if self.is_ready() {
            return Ok(self);
        }

        let storage = self
            .storage()
            .ok_or_else(|| storage_not_set("`set_storage` must be called before `ready`"))?;
        self.ensure_local_id(storage.as_ref()).await;

        let newly_loaded = self.load_integrations().await;
        *self.inner.state.lock().unwrap() = LifecycleState::Ready;
        LOGGER.debug(format!(
            "analytics ready with {} loaded integration(s)",
            self.inner.integrations.loaded().len()
        ));

        self.on_loaded_integrations(&newly_loaded).await;
        Ok(self)
    }

    /// Tracks a custom event.
    pub async fn track(&self, event: &str, properties: JsonMap, event_context: Option<JsonMap>) -> &Self {
        self.dispatch_event(TrackType::Track, event, properties, event_context.as_ref())
            .await;
        self
    }

    /// Tracks a screen view and remembers it for integrations loading later.
    ///
    /// The screen is recorded when `screen` is called, before the returned future is first
    /// polled, so the last screen follows call order even when futures complete out of order.
    pub fn screen<'a>(
        &'a self,
        name: &str,
        properties: JsonMap,
        event_context: Option<JsonMap>,
    ) -> impl Future<Output = &'a Self> + 'a {
        *self.inner.last_screen.lock().unwrap() = Some(LastScreenRecord {
            name: name.to_string(),
            properties: properties.clone(),
            event_context: event_context.clone(),
        });

        let name = name.to_string();
        async move {
            self.dispatch_event(TrackType::Screen, &name, properties, event_context.as_ref())
                .await;
            self
        }
    }

    /// Forgets the last screen view so later loads get no replay.
    pub fn clear_last_screen(&self) {
        self.inner.last_screen.lock().unwrap().take();
    }

    /// Returns to the pre-`ready` state: integrations, user, consent and last screen are cleared.
    /// Storage and context providers are kept.
    pub fn reset(&self) {
        self.inner.integrations.clear();
        self.clear_last_screen();
        *self.inner.user.lock().unwrap() = UserSnapshot::default();
        self.inner.consent.lock().unwrap().take();

        let has_storage = self.inner.storage.lock().unwrap().is_some();
        *self.inner.state.lock().unwrap() = if has_storage {
            LifecycleState::AwaitingStorage
        } else {
            LifecycleState::Uninitialized
        };
    }

    fn helper(&self) -> AnalyticsHelper {
        AnalyticsHelper {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn last_screen(&self) -> Option<LastScreenRecord> {
        self.inner.last_screen.lock().unwrap().clone()
    }

    async fn load_snapshot(&self) -> LoadSnapshot {
        let context = self.context().await;
        LoadSnapshot {
            user: self.user(),
            consent: self.consent().unwrap_or_default(),
            context,
            platform: self.inner.settings.platform.clone(),
            timestamp: Utc::now(),
        }
    }

    async fn build_envelope(
        &self,
        track_type: TrackType,
        event: &str,
        properties: JsonMap,
        event_context: Option<&JsonMap>,
    ) -> EventEnvelope {
        let context = with_event_context(self.context().await, event_context);
        EventEnvelope {
            track_type,
            event: event.to_string(),
            properties,
            context,
            user: self.user(),
            consent: self.consent().unwrap_or_default(),
            platform: self.inner.settings.platform.clone(),
            timestamp: Utc::now(),
        }
    }

    async fn dispatch_event(
        &self,
        track_type: TrackType,
        event: &str,
        properties: JsonMap,
        event_context: Option<&JsonMap>,
    ) {
        if event.trim().is_empty() {
            LOGGER.warn(format!("ignoring {track_type} call with an empty event name"));
            return;
        }

        let envelope = self
            .build_envelope(track_type, event, properties, event_context)
            .await;

        let targets = self.inner.integrations.loaded();
        if targets.is_empty() {
            LOGGER.debug(format!("no integration loaded for {track_type} `{event}`"));
            return;
        }
        dispatch(&targets, &envelope).await;
    }

    /// Loads the pending integrations accepting the current consent. Context is only resolved
    /// when at least one integration is about to load.
    async fn load_integrations(&self) -> Vec<(String, IntegrationHandle)> {
        let registry = &self.inner.integrations;
        let eligible = loader::eligible(registry, self.consent().as_ref());
        if eligible.is_empty() {
            return Vec::new();
        }

        let load = self.load_snapshot().await;
        loader::load_integrations(registry, eligible, &load, &self.helper())
    }

    /// Replays the last screen view to integrations that just loaded. Context is resolved again
    /// since it may have changed since the original call.
    async fn on_loaded_integrations(&self, loaded: &[(String, IntegrationHandle)]) {
        if loaded.is_empty() {
            return;
        }
        let Some(record) = self.last_screen() else {
            return;
        };

        let envelope = self
            .build_envelope(
                TrackType::Screen,
                &record.name,
                record.properties,
                record.event_context.as_ref(),
            )
            .await;
        dispatch(loaded, &envelope).await;
    }

    async fn notify_user_changed(&self) {
        if !self.is_ready() {
            return;
        }
        let targets = self.inner.integrations.loaded();
        if targets.is_empty() {
            return;
        }

        let load = self.load_snapshot().await;
        join_all(targets.iter().map(|(name, handle)| {
            isolate(name, "on_set_user", handle.integration().on_set_user(&load))
        }))
        .await;
    }

    async fn ensure_local_id(&self, storage: &dyn Storage) {
        if self.user().local_id.is_some() {
            return;
        }

        match get_or_create_id(storage, &self.inner.settings.local_id_storage_key).await {
            Ok(local_id) => self.inner.user.lock().unwrap().local_id = Some(local_id),
            Err(err) => LOGGER.warn(format!("failed to load the local user id: {err}")),
        }
    }
}

async fn dispatch(targets: &[(String, IntegrationHandle)], envelope: &EventEnvelope) {
    join_all(
        targets
            .iter()
            .map(|(name, handle)| isolate(name, "track", handle.integration().track(envelope))),
    )
    .await;
}

/// Runs one integration call, logging errors and panics instead of propagating them.
async fn isolate<F>(name: &str, method: &str, call: F)
where
    F: Future<Output = AnalyticsResult<()>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => LOGGER.error(format!("integration `{name}` failed in {method}: {err}")),
        Err(_) => LOGGER.error(format!("integration `{name}` panicked in {method}")),
    }
}

/// Restricted view of the analytics instance handed to integrations on creation.
///
/// It only exposes read accessors and does not keep the instance alive; every accessor returns
/// `None` once the instance is dropped.
#[derive(Clone)]
pub struct AnalyticsHelper {
    inner: Weak<AnalyticsInner>,
}

impl fmt::Debug for AnalyticsHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsHelper")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl AnalyticsHelper {
    /// A helper bound to no instance, for exercising adapters in isolation.
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn analytics(&self) -> Option<Analytics> {
        self.inner.upgrade().map(|inner| Analytics { inner })
    }

    pub fn user(&self) -> Option<UserSnapshot> {
        self.analytics().map(|analytics| analytics.user())
    }

    pub fn consent(&self) -> Option<ConsentState> {
        self.analytics().and_then(|analytics| analytics.consent())
    }

    pub fn platform(&self) -> Option<String> {
        self.analytics()
            .map(|analytics| analytics.settings().platform.clone())
    }

    pub async fn context(&self) -> Option<JsonMap> {
        match self.analytics() {
            Some(analytics) => Some(analytics.context().await),
            None => None,
        }
    }
}
