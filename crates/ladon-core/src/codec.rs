//! Policy codec: domain [`Policy`] <-> durable [`WireRecord`].
//!
//! The store sees conditions only as an opaque JSON payload; this module is the
//! one place they are (un)marshalled.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

use crate::condition::ConditionRegistry;
use crate::error::{Error, Result};
use crate::policy::{Effect, Policy};

/// Durable record shape. Field names are the storage contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subjects: Vec<String>,
    pub effect: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<String>,
    /// Opaque condition payload; absent or `null` means no conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Box<RawValue>>,
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

/// Encodes/decodes policies, resolving condition tags through a registry.
#[derive(Debug, Clone, Default)]
pub struct PolicyCodec {
    registry: Arc<ConditionRegistry>,
}

impl PolicyCodec {
    pub fn new(registry: Arc<ConditionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    pub fn encode(&self, policy: &Policy) -> Result<WireRecord> {
        let conditions = policy.conditions.to_json()?;
        let raw = serde_json::value::to_raw_value(&conditions)
            .map_err(|e| Error::Encode(format!("policy {}: {e}", policy.id())))?;

        Ok(WireRecord {
            id: policy.id().to_string(),
            description: policy.description.clone(),
            subjects: policy.subjects.clone(),
            effect: policy.effect.as_str().to_string(),
            resources: policy.resources.clone(),
            actions: policy.actions.clone(),
            conditions: Some(raw),
        })
    }

    pub fn decode(&self, record: &WireRecord) -> Result<Policy> {
        let effect: Effect = record
            .effect
            .parse()
            .map_err(|e| Error::Decode(format!("policy {}: {e}", record.id)))?;

        let conditions = match record.conditions.as_deref() {
            None => Default::default(),
            Some(raw) => {
                let v: serde_json::Value = serde_json::from_str(raw.get())
                    .map_err(|e| Error::Decode(format!("policy {}: {e}", record.id)))?;
                self.registry
                    .decode(&v)
                    .map_err(|e| Error::Decode(format!("policy {}: {e}", record.id)))?
            }
        };

        Ok(Policy::new(record.id.clone(), effect)
            .with_description(record.description.clone())
            .with_subjects(record.subjects.iter().cloned())
            .with_resources(record.resources.iter().cloned())
            .with_actions(record.actions.iter().cloned())
            .with_conditions(conditions))
    }

    /// Decode an optional side of a change document.
    pub fn decode_opt(&self, record: Option<&WireRecord>) -> Result<Option<Policy>> {
        record.map(|r| self.decode(r)).transpose()
    }
}
