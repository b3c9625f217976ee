//! ladon core: policy domain types, condition registry, wire codec, and errors.
//!
//! This crate defines the policy model and the durable wire contract shared by
//! the replica runtime, store adapters, and tooling. It carries no async runtime
//! dependency so store implementations can reuse it in any context.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `Error`/`Result` so a malformed record coming
//! off the store can never take down the authorization cache.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod change;
pub mod codec;
pub mod condition;
pub mod error;
pub mod matcher;
pub mod policy;

pub use change::{ChangeDecodeError, ChangeEvent, ChangeSide, WireChange};
pub use codec::{PolicyCodec, WireRecord};
pub use condition::{Condition, ConditionRegistry, Conditions, Request};
pub use error::{Error, ErrorKind, Result};
pub use matcher::{PolicyMatcher, WildcardMatcher};
pub use policy::{Effect, Policy};
