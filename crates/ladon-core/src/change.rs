//! Change feed documents and their decoded shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{PolicyCodec, WireRecord};
use crate::error::Error;
use crate::policy::Policy;

/// Which half of a change document failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSide {
    Old,
    New,
}

impl ChangeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeSide::Old => "old",
            ChangeSide::New => "new",
        }
    }
}

impl fmt::Display for ChangeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change document whose `side` could not be decoded.
#[derive(Debug, thiserror::Error)]
#[error("{side} side: {source}")]
pub struct ChangeDecodeError {
    pub side: ChangeSide,
    pub source: Error,
}

/// Raw change document as delivered by the store's change stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireChange {
    #[serde(default)]
    pub old_val: Option<WireRecord>,
    #[serde(default)]
    pub new_val: Option<WireRecord>,
}

impl WireChange {
    pub fn insert(record: WireRecord) -> Self {
        Self { old_val: None, new_val: Some(record) }
    }

    pub fn delete(record: WireRecord) -> Self {
        Self { old_val: Some(record), new_val: None }
    }

    pub fn update(old: WireRecord, new: WireRecord) -> Self {
        Self { old_val: Some(old), new_val: Some(new) }
    }

    /// Decode both sides. Either side failing fails the whole event.
    pub fn decode(&self, codec: &PolicyCodec) -> Result<ChangeEvent, ChangeDecodeError> {
        let old = codec
            .decode_opt(self.old_val.as_ref())
            .map_err(|source| ChangeDecodeError { side: ChangeSide::Old, source })?;
        let new = codec
            .decode_opt(self.new_val.as_ref())
            .map_err(|source| ChangeDecodeError { side: ChangeSide::New, source })?;
        Ok(ChangeEvent::from_pair(old, new))
    }

    /// Id of the record this change is about, preferring the new side.
    pub fn id(&self) -> Option<&str> {
        self.new_val
            .as_ref()
            .or(self.old_val.as_ref())
            .map(|r| r.id.as_str())
    }
}

/// Decoded change event, one of the four valid shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Neither side present; ignored.
    Noop,
    Insert(Policy),
    Delete(Policy),
    /// Remove `old.id()`, then insert `new`. The ids may differ (rename).
    Update { old: Policy, new: Policy },
}

impl ChangeEvent {
    pub fn from_pair(old: Option<Policy>, new: Option<Policy>) -> Self {
        match (old, new) {
            (None, None) => ChangeEvent::Noop,
            (None, Some(new)) => ChangeEvent::Insert(new),
            (Some(old), None) => ChangeEvent::Delete(old),
            (Some(old), Some(new)) => ChangeEvent::Update { old, new },
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Noop => "noop",
            ChangeEvent::Insert(_) => "insert",
            ChangeEvent::Delete(_) => "delete",
            ChangeEvent::Update { .. } => "update",
        }
    }
}
