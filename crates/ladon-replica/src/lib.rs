//! ladon replica library entry.
//!
//! This crate wires the store contract, the in-memory replica cache, the
//! change feed consumer, and the manager facade into a replicated policy
//! cache. It is consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cache;
pub mod config;
pub mod feed;
pub mod manager;
pub mod obs;
pub mod store;

pub use cache::ReplicaCache;
pub use feed::{Backoff, ChangeFeedConsumer, FeedExit, Shutdown};
pub use manager::{PolicyManager, ReplicatedManager, WatchHandle};
pub use store::{ChangeStream, MemoryStore, PolicyStore};
