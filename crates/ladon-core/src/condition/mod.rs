//! Policy conditions.
//!
//! A condition is a named, parameterized check evaluated against a request at
//! authorization time. This core only needs the marshal/unmarshal contract:
//! conditions are stored as one JSON object keyed by condition name, each
//! entry tagged with its type:
//!
//! ```json
//! { "owner": { "type": "SubjectIsOwnerCondition", "options": {} } }
//! ```
//!
//! Tags are resolved to concrete types through a [`ConditionRegistry`].

mod builtin;
mod registry;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub use builtin::{
    CidrCondition, StringEqualCondition, StringMatchCondition, StringPairsEqualCondition,
    SubjectIsNotOwnerCondition, SubjectIsOwnerCondition,
};
pub use registry::{ConditionFactory, ConditionRegistry};

/// Authorization request a condition is evaluated against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    pub subject: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub action: String,
    /// Condition inputs, keyed by condition name.
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

/// A single condition variant.
pub trait Condition: fmt::Debug + Send + Sync {
    /// Type tag used on the wire.
    fn name(&self) -> &'static str;

    /// Parameters of this condition as JSON (`options` on the wire).
    fn options(&self) -> Result<Value>;

    /// Evaluate against the context value stored under this condition's name.
    fn fulfills(&self, value: &Value, request: &Request) -> bool;
}

/// Wire entry for one condition.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConditionEntry {
    #[serde(rename = "type")]
    pub(crate) tag: String,
    #[serde(default)]
    pub(crate) options: Value,
}

/// Named set of conditions attached to a policy.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    inner: BTreeMap<String, Arc<dyn Condition>>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<C>(&mut self, name: impl Into<String>, condition: C)
    where
        C: Condition + 'static,
    {
        self.inner.insert(name.into(), Arc::new(condition));
    }

    pub fn insert_shared(&mut self, name: impl Into<String>, condition: Arc<dyn Condition>) {
        self.inner.insert(name.into(), condition);
    }

    pub fn with<C>(mut self, name: impl Into<String>, condition: C) -> Self
    where
        C: Condition + 'static,
    {
        self.insert(name, condition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Condition>> {
        self.inner.get(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Condition>)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All conditions hold for `request`. A condition whose name is missing
    /// from the request context is not fulfilled.
    pub fn fulfilled_by(&self, request: &Request) -> bool {
        self.inner.iter().all(|(name, cond)| {
            request
                .context
                .get(name)
                .is_some_and(|v| cond.fulfills(v, request))
        })
    }

    /// Marshal into the tagged JSON object.
    pub fn to_json(&self) -> Result<Value> {
        let mut out = serde_json::Map::with_capacity(self.inner.len());
        for (name, cond) in &self.inner {
            let entry = ConditionEntry {
                tag: cond.name().to_string(),
                options: cond.options()?,
            };
            let v = serde_json::to_value(entry)
                .map_err(|e| Error::Encode(format!("condition {name}: {e}")))?;
            out.insert(name.clone(), v);
        }
        Ok(Value::Object(out))
    }
}

impl PartialEq for Conditions {
    fn eq(&self, other: &Self) -> bool {
        if self.inner.len() != other.inner.len() {
            return false;
        }
        self.inner.iter().all(|(name, a)| {
            let Some(b) = other.inner.get(name) else { return false; };
            if a.name() != b.name() {
                return false;
            }
            match (a.options(), b.options()) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            }
        })
    }
}
