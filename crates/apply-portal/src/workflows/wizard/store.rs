use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

/// Attribute map exchanged with the key-value service.
pub type StateMap = Map<String, Value>;

/// Composite key so wizards for different actors and entities never share state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(
        wizard_name: &str,
        actor_id: impl fmt::Display,
        entity_id: impl fmt::Display,
    ) -> Self {
        Self(format!("{wizard_name}_store_{actor_id}_{entity_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage abstraction for partially completed wizards. Last write wins.
pub trait WizardStateStore: Send + Sync {
    fn read(&self, key: &StoreKey) -> Result<Option<StateMap>, StoreError>;
    fn write(&self, key: &StoreKey, state: StateMap) -> Result<(), StoreError>;
    fn delete(&self, key: &StoreKey) -> Result<(), StoreError>;
}

impl<T: WizardStateStore + ?Sized> WizardStateStore for Arc<T> {
    fn read(&self, key: &StoreKey) -> Result<Option<StateMap>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &StoreKey, state: StateMap) -> Result<(), StoreError> {
        (**self).write(key, state)
    }

    fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

/// Error enumeration for wizard store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("wizard store unavailable: {0}")]
    Unavailable(String),
    #[error("stored wizard state under {key} is not a JSON object")]
    Corrupt { key: String },
}

/// Process-local store holding the serialized JSON text, as a remote cache would.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWizardStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryWizardStore {
    /// Inspection helpers ignore lock poisoning.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw serialized payload, mainly for inspecting what was persisted.
    pub fn raw(&self, key: &StoreKey) -> Option<String> {
        self.entries().get(key.as_str()).cloned()
    }

    /// Writes a raw payload without going through a wizard.
    pub fn put_raw(&self, key: &StoreKey, payload: impl Into<String>) {
        self.entries().insert(key.as_str().to_string(), payload.into());
    }
}

impl WizardStateStore for InMemoryWizardStore {
    fn read(&self, key: &StoreKey) -> Result<Option<StateMap>, StoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("wizard store mutex poisoned".to_string()))?;
        let Some(payload) = guard.get(key.as_str()) else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            _ => Err(StoreError::Corrupt {
                key: key.as_str().to_string(),
            }),
        }
    }

    fn write(&self, key: &StoreKey, state: StateMap) -> Result<(), StoreError> {
        let payload = Value::Object(state).to_string();
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("wizard store mutex poisoned".to_string()))?;
        guard.insert(key.as_str().to_string(), payload);
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("wizard store mutex poisoned".to_string()))?;
        guard.remove(key.as_str());
        Ok(())
    }
}
