//! Shared helpers for replica integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use ladon_core::error::{Error, Result};
use ladon_core::{Effect, Policy, PolicyCodec, WildcardMatcher, WireChange, WireRecord};
use ladon_replica::config::FeedConfig;
use ladon_replica::{ChangeStream, MemoryStore, PolicyStore, ReplicatedManager};

pub fn policy(id: &str, subjects: &[&str]) -> Policy {
    Policy::new(id, Effect::Allow)
        .with_description(format!("policy {id}"))
        .with_subjects(subjects.iter().copied())
        .with_resources(["articles:*"])
        .with_actions(["read"])
}

pub fn record(p: &Policy) -> WireRecord {
    PolicyCodec::default().encode(p).unwrap()
}

/// Record whose effect is outside the closed set.
pub fn broken_record(id: &str) -> WireRecord {
    let mut r = record(&policy(id, &["alice"]));
    r.effect = "perhaps".into();
    r
}

/// Tight, deterministic backoff for tests.
pub fn fast_feed() -> FeedConfig {
    FeedConfig {
        backoff_base_ms: 1,
        backoff_max_ms: 20,
        jitter: false,
    }
}

pub fn manager_for(store: Arc<MemoryStore>) -> ReplicatedManager {
    ReplicatedManager::new(
        store,
        PolicyCodec::default(),
        Arc::new(WildcardMatcher::new()),
        fast_feed(),
    )
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

pub fn sorted_ids(policies: &[Arc<Policy>]) -> Vec<String> {
    let mut ids: Vec<String> = policies.iter().map(|p| p.id().to_string()).collect();
    ids.sort();
    ids
}

/// Store whose every operation fails.
pub struct DownStore;

#[async_trait]
impl PolicyStore for DownStore {
    async fn scan_all(&self) -> Result<Vec<WireRecord>> {
        Err(Error::Store("connection refused".into()))
    }

    async fn insert(&self, _record: WireRecord) -> Result<()> {
        Err(Error::Store("connection refused".into()))
    }

    async fn delete_by_id(&self, _id: &str) -> Result<()> {
        Err(Error::Store("connection refused".into()))
    }

    async fn subscribe_changes(&self) -> Result<ChangeStream> {
        Err(Error::Store("connection refused".into()))
    }
}

/// Store that accepts every subscription and fails the stream at once,
/// optionally after delivering one no-op change.
#[derive(Default)]
pub struct FlappingStore {
    subscribes: AtomicUsize,
    deliver_first: bool,
}

impl FlappingStore {
    pub fn delivering() -> Self {
        Self {
            deliver_first: true,
            ..Self::default()
        }
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyStore for FlappingStore {
    async fn scan_all(&self) -> Result<Vec<WireRecord>> {
        Ok(Vec::new())
    }

    async fn insert(&self, _record: WireRecord) -> Result<()> {
        Ok(())
    }

    async fn delete_by_id(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<ChangeStream> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let mut items = Vec::new();
        if self.deliver_first {
            items.push(Ok(WireChange::default()));
        }
        items.push(Err(Error::Store("stream reset".into())));
        Ok(stream::iter(items).boxed())
    }
}
