//! Change feed consumer.
//!
//! Keeps the replica convergent with the store: applies every change event,
//! resubscribes with capped exponential backoff when the stream breaks, and
//! stops only when its shutdown signal fires.

mod backoff;
mod consumer;
mod shutdown;

pub use backoff::Backoff;
pub use consumer::{ChangeFeedConsumer, FeedExit};
pub use shutdown::Shutdown;
