//! Lightweight in-process metrics for the replica.
//!
//! Counters and gauges are atomics keyed by label sets and rendered in the
//! Prometheus text format on demand.

pub mod metrics;

pub use metrics::ReplicaMetrics;
