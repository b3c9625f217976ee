use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::builtin::{
    CidrCondition, StringEqualCondition, StringMatchCondition, StringPairsEqualCondition,
    SubjectIsNotOwnerCondition, SubjectIsOwnerCondition,
};
use super::{Condition, ConditionEntry, Conditions};
use crate::error::{Error, Result};

/// Builds a condition from its `options` object.
pub type ConditionFactory = fn(Value) -> Result<Arc<dyn Condition>>;

/// Type tag -> factory lookup used when decoding stored conditions.
///
/// Unknown tags are decode errors; a condition is never silently dropped.
#[derive(Clone)]
pub struct ConditionRegistry {
    factories: HashMap<&'static str, ConditionFactory>,
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConditionRegistry {
    /// Registry with no known tags.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in condition type.
    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        r.register_serde::<StringEqualCondition>("StringEqualCondition");
        r.register_serde::<StringMatchCondition>("StringMatchCondition");
        r.register_serde::<CidrCondition>("CIDRCondition");
        r.register_serde::<SubjectIsOwnerCondition>("SubjectIsOwnerCondition");
        r.register_serde::<SubjectIsNotOwnerCondition>("SubjectIsNotOwnerCondition");
        r.register_serde::<StringPairsEqualCondition>("StringPairsEqualCondition");
        r
    }

    pub fn register(&mut self, tag: &'static str, factory: ConditionFactory) {
        self.factories.insert(tag, factory);
    }

    /// Register a condition whose `options` deserialize directly into it.
    pub fn register_serde<C>(&mut self, tag: &'static str)
    where
        C: Condition + DeserializeOwned + 'static,
    {
        self.register(tag, build_serde::<C>);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<&'static str> {
        let mut out: Vec<_> = self.factories.keys().copied().collect();
        out.sort_unstable();
        out
    }

    pub fn build(&self, tag: &str, options: Value) -> Result<Arc<dyn Condition>> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| Error::Decode(format!("unknown condition type: {tag}")))?;
        factory(options)
    }

    /// Unmarshal a tagged conditions object. `null` means no conditions.
    pub fn decode(&self, payload: &Value) -> Result<Conditions> {
        let mut out = Conditions::new();
        let entries = match payload {
            Value::Null => return Ok(out),
            Value::Object(m) => m,
            other => {
                return Err(Error::Decode(format!(
                    "conditions must be an object, got {}",
                    json_type(other)
                )))
            }
        };

        for (name, raw) in entries {
            let entry: ConditionEntry = serde_json::from_value(raw.clone())
                .map_err(|e| Error::Decode(format!("condition {name}: {e}")))?;
            let cond = self
                .build(&entry.tag, entry.options)
                .map_err(|e| Error::Decode(format!("condition {name}: {e}")))?;
            out.insert_shared(name.clone(), cond);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

fn build_serde<C>(options: Value) -> Result<Arc<dyn Condition>>
where
    C: Condition + DeserializeOwned + 'static,
{
    // Parameterless conditions are often stored with `options: null`.
    let options = if options.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        options
    };
    let c: C = serde_json::from_value(options).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(Arc::new(c))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
