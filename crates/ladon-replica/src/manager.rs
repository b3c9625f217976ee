//! Manager facade: the only entry point other subsystems call.
//!
//! Writes go to the store and nowhere else. The replica learns about them when
//! the change feed delivers the corresponding event, so a `get` right after a
//! successful `create` may still miss. Reads never touch the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use ladon_core::error::{Error, Result};
use ladon_core::{Policy, PolicyCodec, PolicyMatcher, WildcardMatcher};

use crate::cache::ReplicaCache;
use crate::config::FeedConfig;
use crate::feed::{ChangeFeedConsumer, FeedExit, Shutdown};
use crate::obs::ReplicaMetrics;
use crate::store::PolicyStore;

/// Policy manager contract (create / get / delete / find by subject).
#[async_trait]
pub trait PolicyManager: Send + Sync {
    async fn create(&self, policy: &Policy) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Arc<Policy>>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Arc<Policy>>>;
}

/// Replicated policy manager backed by a [`PolicyStore`].
pub struct ReplicatedManager {
    store: Arc<dyn PolicyStore>,
    codec: PolicyCodec,
    matcher: Arc<dyn PolicyMatcher>,
    cache: Arc<ReplicaCache>,
    metrics: Arc<ReplicaMetrics>,
    feed: FeedConfig,
    watching: Arc<AtomicBool>,
}

impl ReplicatedManager {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        codec: PolicyCodec,
        matcher: Arc<dyn PolicyMatcher>,
        feed: FeedConfig,
    ) -> Self {
        Self {
            store,
            codec,
            matcher,
            cache: Arc::new(ReplicaCache::new()),
            metrics: Arc::new(ReplicaMetrics::default()),
            feed,
            watching: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Built-in conditions, wildcard matching, default feed settings.
    pub fn with_defaults(store: Arc<dyn PolicyStore>) -> Self {
        Self::new(
            store,
            PolicyCodec::default(),
            Arc::new(WildcardMatcher::new()),
            FeedConfig::default(),
        )
    }

    pub fn metrics(&self) -> &ReplicaMetrics {
        &self.metrics
    }

    /// Number of policies currently replicated.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Rebuild the replica from a full scan. Any undecodable record aborts the
    /// bootstrap and leaves the replica untouched.
    pub async fn cold_start(&self) -> Result<usize> {
        let records = match self.store.scan_all().await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "cold start scan failed");
                self.metrics.cold_starts.inc(&[("outcome", "store_error")]);
                return Err(e);
            }
        };

        let mut policies = HashMap::with_capacity(records.len());
        for rec in &records {
            match self.codec.decode(rec) {
                Ok(p) => {
                    policies.insert(p.id().to_string(), p);
                }
                Err(e) => {
                    error!(id = %rec.id, error = %e, "cold start aborted on undecodable record");
                    self.metrics.cold_starts.inc(&[("outcome", "decode_error")]);
                    return Err(e);
                }
            }
        }

        let n = policies.len();
        self.cache.replace_all(policies);
        self.metrics.cache_policies.set(n as i64);
        self.metrics.cold_starts.inc(&[("outcome", "ok")]);
        info!(policies = n, "replica cold start complete");
        Ok(n)
    }

    /// Write-through create. The replica is not touched.
    pub async fn create(&self, policy: &Policy) -> Result<()> {
        let record = self.codec.encode(policy)?;
        self.store.insert(record).await
    }

    /// Write-through delete. The replica is not touched.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete_by_id(id).await
    }

    pub fn get(&self, id: &str) -> Result<Arc<Policy>> {
        self.cache.get(id)
    }

    /// Policies whose subject patterns match `subject`, in no particular order.
    /// Fails as a whole if the matcher fails on any policy.
    pub fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Arc<Policy>>> {
        let mut out = Vec::new();
        for p in self.cache.snapshot() {
            if self.matcher.matches(&p, &p.subjects, subject)? {
                out.push(p);
            }
        }
        Ok(out)
    }

    /// Start the change feed consumer; stop it through the returned handle.
    pub async fn watch(&self) -> Result<WatchHandle> {
        let (tx, rx) = watch::channel(false);
        let task = self.spawn_consumer(Shutdown::new(rx)).await?;
        Ok(WatchHandle {
            stop: Some(tx),
            task,
        })
    }

    /// Start the change feed consumer, stopped when `shutdown` becomes `true`.
    pub async fn watch_until(&self, shutdown: watch::Receiver<bool>) -> Result<WatchHandle> {
        let task = self.spawn_consumer(Shutdown::new(shutdown)).await?;
        Ok(WatchHandle { stop: None, task })
    }

    async fn spawn_consumer(&self, shutdown: Shutdown) -> Result<JoinHandle<FeedExit>> {
        if self
            .watching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyWatching);
        }
        let guard = WatchingGuard(Arc::clone(&self.watching));

        // The initial subscription is the only failure reported to the caller.
        let stream = self.store.subscribe_changes().await?;

        let consumer = ChangeFeedConsumer::new(
            Arc::clone(&self.store),
            self.codec.clone(),
            Arc::clone(&self.cache),
            Arc::clone(&self.metrics),
            self.feed.backoff(),
        );

        Ok(tokio::spawn(async move {
            let _guard = guard;
            consumer.run(stream, shutdown).await
        }))
    }
}

/// Clears the manager's "watching" flag when the consumer goes away.
struct WatchingGuard(Arc<AtomicBool>);

impl Drop for WatchingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running change feed consumer.
///
/// Dropping the handle detaches the consumer; it keeps running.
#[derive(Debug)]
pub struct WatchHandle {
    stop: Option<watch::Sender<bool>>,
    task: JoinHandle<FeedExit>,
}

impl WatchHandle {
    /// Request a stop. No-op for handles from `watch_until`, whose signal
    /// belongs to the caller.
    pub fn stop(&self) {
        if let Some(tx) = &self.stop {
            let _ = tx.send(true);
        }
    }

    /// Wait for the consumer to exit.
    pub async fn join(self) -> Result<FeedExit> {
        // Sender outlives the task; dropping it first would detach the consumer.
        let WatchHandle { stop, task } = self;
        let res = task
            .await
            .map_err(|e| Error::Internal(format!("change feed task failed: {e}")));
        drop(stop);
        res
    }

    /// Request a stop and wait for the consumer to exit.
    pub async fn shutdown(self) -> Result<FeedExit> {
        self.stop();
        self.join().await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[async_trait]
impl PolicyManager for ReplicatedManager {
    async fn create(&self, policy: &Policy) -> Result<()> {
        ReplicatedManager::create(self, policy).await
    }

    async fn get(&self, id: &str) -> Result<Arc<Policy>> {
        ReplicatedManager::get(self, id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        ReplicatedManager::delete(self, id).await
    }

    async fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Arc<Policy>>> {
        ReplicatedManager::find_policies_for_subject(self, subject)
    }
}
