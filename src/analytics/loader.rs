//! Consent-gated loading of registered integrations.
//!
//! Only integrations without an instance are evaluated. Loaded integrations are never unloaded,
//! even when consent is later withdrawn.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::analytics::api::AnalyticsHelper;
use crate::analytics::error::{internal_error, AnalyticsResult};
use crate::analytics::integration::IntegrationHandle;
use crate::analytics::logger::LOGGER;
use crate::analytics::registry::{IntegrationRegistration, IntegrationRegistry};
use crate::analytics::types::{ConsentState, LoadSnapshot};

/// Pending integrations whose adapter accepts `consent`, in registration order.
///
/// Each adapter is asked once. An adapter panicking in `should_load` is logged and skipped.
pub(crate) fn eligible(
    registry: &IntegrationRegistry,
    consent: Option<&ConsentState>,
) -> Vec<Arc<IntegrationRegistration>> {
    registry
        .pending()
        .into_iter()
        .filter(|registration| {
            match catch_unwind(AssertUnwindSafe(|| registration.adapter().should_load(consent))) {
                Ok(accepted) => accepted,
                Err(_) => {
                    LOGGER.error(format!(
                        "integration `{}` panicked in should_load",
                        registration.name()
                    ));
                    false
                }
            }
        })
        .collect()
}

/// Instantiates the `eligible` integrations and returns the newly loaded ones in order.
///
/// Adapters run without the registry lock held, so they may look up other integrations. An
/// instance created for a name that got loaded concurrently is dropped. A failing or panicking
/// adapter is logged and its integration stays pending.
pub(crate) fn load_integrations(
    registry: &IntegrationRegistry,
    eligible: Vec<Arc<IntegrationRegistration>>,
    load: &LoadSnapshot,
    helper: &AnalyticsHelper,
) -> Vec<(String, IntegrationHandle)> {
    let mut newly_loaded = Vec::new();

    for registration in eligible {
        let handle = match create_instance(&registration, load, helper) {
            Ok(handle) => handle,
            Err(err) => {
                LOGGER.error(format!(
                    "failed to create integration `{}`: {err}",
                    registration.name()
                ));
                continue;
            }
        };

        if registry.insert_loaded(&registration, handle.clone()) {
            LOGGER.debug(format!("integration `{}` loaded", registration.name()));
            newly_loaded.push((registration.name().to_string(), handle));
        }
    }

    newly_loaded
}

fn create_instance(
    registration: &IntegrationRegistration,
    load: &LoadSnapshot,
    helper: &AnalyticsHelper,
) -> AnalyticsResult<IntegrationHandle> {
    catch_unwind(AssertUnwindSafe(|| {
        registration
            .adapter()
            .create_instance(registration.options(), load, helper.clone())
    }))
    .unwrap_or_else(|_| Err(internal_error("adapter panicked in create_instance")))
}
