use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::analytics::error::{integration_error, invalid_argument, AnalyticsResult};
use crate::analytics::{
    AnalyticsHelper, ConsentState, EventEnvelope, Integration, IntegrationAdapter, IntegrationHandle,
    IntegrationOptions, JsonMap, LoadSnapshot, UserSnapshot,
};

pub fn load_snapshot() -> LoadSnapshot {
    LoadSnapshot {
        user: UserSnapshot::default(),
        consent: ConsentState::default(),
        context: JsonMap::new(),
        platform: "mobile".into(),
        timestamp: Utc::now(),
    }
}

/// Integration recording every envelope and user change it receives.
#[derive(Default)]
pub struct RecordingIntegration {
    events: Mutex<Vec<EventEnvelope>>,
    users: Mutex<Vec<UserSnapshot>>,
}

impl RecordingIntegration {
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<UserSnapshot> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait]
impl Integration for RecordingIntegration {
    async fn track(&self, envelope: &EventEnvelope) -> AnalyticsResult<()> {
        self.events.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    async fn on_set_user(&self, load: &LoadSnapshot) -> AnalyticsResult<()> {
        self.users.lock().unwrap().push(load.user.clone());
        Ok(())
    }
}

pub enum FailingIntegration {
    Erroring,
    Panicking,
}

impl FailingIntegration {
    pub fn erroring() -> Self {
        FailingIntegration::Erroring
    }

    pub fn panicking() -> Self {
        FailingIntegration::Panicking
    }
}

#[async_trait]
impl Integration for FailingIntegration {
    async fn track(&self, envelope: &EventEnvelope) -> AnalyticsResult<()> {
        match self {
            FailingIntegration::Erroring => Err(integration_error(format!(
                "vendor rejected `{}`",
                envelope.event
            ))),
            FailingIntegration::Panicking => panic!("vendor SDK crashed on `{}`", envelope.event),
        }
    }
}

type Factory = Arc<dyn Fn() -> IntegrationHandle + Send + Sync>;

/// Configurable adapter. Creates [`RecordingIntegration`]s unless a factory is supplied.
pub struct TestAdapter {
    required_consent: Option<String>,
    required_option: Option<String>,
    fail_creation: bool,
    panic_on_creation: bool,
    panic_on_consent_check: bool,
    factory: Option<Factory>,
    consent_checks: AtomicUsize,
    created: AtomicUsize,
    last_helper: Mutex<Option<AnalyticsHelper>>,
}

impl TestAdapter {
    /// Loads regardless of consent.
    pub fn always() -> Self {
        Self {
            required_consent: None,
            required_option: None,
            fail_creation: false,
            panic_on_creation: false,
            panic_on_consent_check: false,
            factory: None,
            consent_checks: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            last_helper: Mutex::new(None),
        }
    }

    /// Loads only once `category` is granted.
    pub fn requiring(category: &str) -> Self {
        Self {
            required_consent: Some(category.to_string()),
            ..Self::always()
        }
    }

    pub fn requiring_option(mut self, key: &str) -> Self {
        self.required_option = Some(key.to_string());
        self
    }

    pub fn failing_creation(mut self) -> Self {
        self.fail_creation = true;
        self
    }

    pub fn panicking_creation(mut self) -> Self {
        self.panic_on_creation = true;
        self
    }

    pub fn panicking_consent_check(mut self) -> Self {
        self.panic_on_consent_check = true;
        self
    }

    pub fn with_factory<F, T>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Integration + 'static,
    {
        self.factory = Some(Arc::new(move || IntegrationHandle::new(factory())));
        self
    }

    pub fn consent_checks(&self) -> usize {
        self.consent_checks.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_helper(&self) -> Option<AnalyticsHelper> {
        self.last_helper.lock().unwrap().clone()
    }
}

impl IntegrationAdapter for TestAdapter {
    fn should_load(&self, consent: Option<&ConsentState>) -> bool {
        self.consent_checks.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_consent_check {
            panic!("consent manager unavailable");
        }
        match &self.required_consent {
            None => true,
            Some(category) => consent.is_some_and(|consent| consent.granted(category)),
        }
    }

    fn create_instance(
        &self,
        _options: &IntegrationOptions,
        _load: &LoadSnapshot,
        helper: AnalyticsHelper,
    ) -> AnalyticsResult<IntegrationHandle> {
        if self.fail_creation {
            return Err(integration_error("vendor SDK is not installed"));
        }
        if self.panic_on_creation {
            panic!("vendor SDK crashed while starting");
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_helper.lock().unwrap() = Some(helper);
        Ok(match &self.factory {
            Some(factory) => factory(),
            None => IntegrationHandle::new(RecordingIntegration::default()),
        })
    }

    fn validate_options(&self, options: &IntegrationOptions) -> AnalyticsResult<()> {
        match &self.required_option {
            Some(key) if options.get(key).is_none() => {
                Err(invalid_argument(format!("missing required option `{key}`")))
            }
            _ => Ok(()),
        }
    }
}
