//! Metrics registry for the replica.
//!
//! Labels are flattened into sorted key vectors so rendering order is
//! deterministic per label set.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &[(String, String)]) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(r.key()), val);
        }
    }
}

/// Single unlabeled gauge.
#[derive(Default)]
pub struct Gauge {
    v: AtomicI64,
}

impl Gauge {
    pub fn set(&self, v: i64) {
        self.v.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.v.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge\n{} {}", name, name, self.get());
    }
}

#[derive(Default)]
pub struct ReplicaMetrics {
    /// Applied change events, by `kind` (insert/delete/update/noop).
    pub feed_events: CounterVec,
    /// Events dropped because a side failed to decode, by `side` (old/new).
    pub feed_skipped: CounterVec,
    /// Stream terminations, by `reason` (error/end).
    pub feed_interruptions: CounterVec,
    /// Resubscription attempts, by `outcome` (ok/error).
    pub feed_resubscribes: CounterVec,
    /// Cold starts, by `outcome` (ok/store_error/decode_error).
    pub cold_starts: CounterVec,
    /// Policies currently held by the replica.
    pub cache_policies: Gauge,
}

impl ReplicaMetrics {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.feed_events.render("ladon_feed_events_total", &mut out);
        self.feed_skipped.render("ladon_feed_events_skipped_total", &mut out);
        self.feed_interruptions.render("ladon_feed_interruptions_total", &mut out);
        self.feed_resubscribes.render("ladon_feed_resubscribes_total", &mut out);
        self.cold_starts.render("ladon_cold_starts_total", &mut out);
        self.cache_policies.render("ladon_cache_policies", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_label_order_independent() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
        assert_eq!(c.get(&[("a", "x")]), 0);
    }

    #[test]
    fn render_prometheus_text() {
        let m = ReplicaMetrics::default();
        m.feed_events.inc(&[("kind", "insert")]);
        m.cache_policies.set(3);
        let out = m.render();
        assert!(out.contains("# TYPE ladon_feed_events_total counter"));
        assert!(out.contains("ladon_feed_events_total{kind=\"insert\"} 1"));
        assert!(out.contains("ladon_cache_policies 3"));
    }
}
