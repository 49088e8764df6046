use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::analytics::error::{duplicate_integration, invalid_argument, AnalyticsResult};
use crate::analytics::integration::{IntegrationAdapter, IntegrationHandle, IntegrationOptions};

/// One `add_integration` call. Immutable once created.
pub struct IntegrationRegistration {
    name: String,
    adapter: Arc<dyn IntegrationAdapter>,
    options: IntegrationOptions,
}

impl IntegrationRegistration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> &Arc<dyn IntegrationAdapter> {
        &self.adapter
    }

    pub fn options(&self) -> &IntegrationOptions {
        &self.options
    }
}

impl fmt::Debug for IntegrationRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationRegistration")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    registrations: Vec<Arc<IntegrationRegistration>>,
    loaded: HashMap<String, IntegrationHandle>,
}

/// Registered integrations and, separately, the instances loaded so far.
#[derive(Default)]
pub struct IntegrationRegistry {
    state: Mutex<RegistryState>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: &str,
        adapter: Arc<dyn IntegrationAdapter>,
        options: IntegrationOptions,
    ) -> AnalyticsResult<()> {
        if name.trim().is_empty() {
            return Err(invalid_argument("Integration name must not be empty"));
        }
        adapter.validate_options(&options)?;

        let mut state = self.state.lock().unwrap();
        if state.registrations.iter().any(|entry| entry.name == name) {
            return Err(duplicate_integration(name));
        }
        state.registrations.push(Arc::new(IntegrationRegistration {
            name: name.to_string(),
            adapter,
            options,
        }));
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .registrations
            .iter()
            .any(|entry| entry.name == name)
    }

    /// The loaded instance for `name`, or `None` when unknown or not loaded yet.
    pub fn get(&self, name: &str) -> Option<IntegrationHandle> {
        self.state.lock().unwrap().loaded.get(name).cloned()
    }

    /// Loaded instances in registration order.
    pub fn loaded(&self) -> Vec<(String, IntegrationHandle)> {
        let state = self.state.lock().unwrap();
        state
            .registrations
            .iter()
            .filter_map(|entry| {
                state
                    .loaded
                    .get(&entry.name)
                    .map(|handle| (entry.name.clone(), handle.clone()))
            })
            .collect()
    }

    /// Registrations without a loaded instance, in registration order.
    pub fn pending(&self) -> Vec<Arc<IntegrationRegistration>> {
        let state = self.state.lock().unwrap();
        state
            .registrations
            .iter()
            .filter(|entry| !state.loaded.contains_key(&entry.name))
            .cloned()
            .collect()
    }

    /// Stores `handle` for `registration`. Returns `false`, leaving the registry untouched, when
    /// the name already has an instance or the registration was cleared in the meantime.
    pub(crate) fn insert_loaded(
        &self,
        registration: &Arc<IntegrationRegistration>,
        handle: IntegrationHandle,
    ) -> bool {
        let mut state = self.state.lock().unwrap();
        let still_registered = state
            .registrations
            .iter()
            .any(|entry| Arc::ptr_eq(entry, registration));
        if !still_registered || state.loaded.contains_key(&registration.name) {
            return false;
        }
        state.loaded.insert(registration.name.clone(), handle);
        true
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every registration and every loaded instance.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.registrations.clear();
        state.loaded.clear();
    }
}
