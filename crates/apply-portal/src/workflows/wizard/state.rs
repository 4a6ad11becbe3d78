use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::store::{StateMap, StoreKey};
use super::WizardDefinition;

/// Persisted envelope: schema version, step marker, and the attribute struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState<A, S> {
    pub version: u32,
    pub current_step: S,
    pub attributes: A,
}

impl<A, S> WizardState<A, S>
where
    A: Serialize + DeserializeOwned,
    S: Serialize + DeserializeOwned,
{
    pub fn to_map(&self) -> Result<StateMap, serde_json::Error> {
        let mut map = StateMap::new();
        map.insert("version".to_string(), Value::from(self.version));
        map.insert(
            "current_step".to_string(),
            serde_json::to_value(&self.current_step)?,
        );
        map.insert(
            "attributes".to_string(),
            serde_json::to_value(&self.attributes)?,
        );
        Ok(map)
    }

    /// Decode stored state, upgrading older schemas. Anything unusable is
    /// discarded so the wizard restarts instead of failing the request.
    pub(super) fn restore<D>(key: &StoreKey, mut map: StateMap) -> Option<Self>
    where
        D: WizardDefinition<Attributes = A, Step = S>,
    {
        let version = map
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|version| u32::try_from(version).ok())
            .unwrap_or(0);

        if version != D::SCHEMA_VERSION {
            let attributes = match map.remove("attributes") {
                Some(Value::Object(attributes)) => attributes,
                _ => StateMap::new(),
            };
            let Some(upgraded) = (version < D::SCHEMA_VERSION)
                .then(|| D::upgrade(version, attributes))
                .flatten()
            else {
                warn!(
                    wizard = D::NAME,
                    key = %key,
                    stored_version = version,
                    expected_version = D::SCHEMA_VERSION,
                    "discarding wizard state saved under an incompatible schema"
                );
                return None;
            };
            map.insert("version".to_string(), Value::from(D::SCHEMA_VERSION));
            map.insert("attributes".to_string(), Value::Object(upgraded));
        }

        match serde_json::from_value(Value::Object(map)) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(wizard = D::NAME, key = %key, error = %err, "discarding undecodable wizard state");
                None
            }
        }
    }
}
