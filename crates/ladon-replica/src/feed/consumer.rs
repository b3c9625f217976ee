use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use ladon_core::error::Result;
use ladon_core::{ChangeDecodeError, PolicyCodec, WireChange};

use super::{Backoff, Shutdown};
use crate::cache::ReplicaCache;
use crate::obs::ReplicaMetrics;
use crate::store::{ChangeStream, PolicyStore};

/// Why the consumer returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedExit {
    /// Shutdown was requested; the subscription has been dropped.
    Cancelled,
}

/// Outcome of waiting on the stream.
enum Step {
    Cancelled,
    Change(WireChange),
    Failed(ladon_core::Error),
    Ended,
}

/// Applies store change events to the replica until shut down.
pub struct ChangeFeedConsumer {
    store: Arc<dyn PolicyStore>,
    codec: PolicyCodec,
    cache: Arc<ReplicaCache>,
    metrics: Arc<ReplicaMetrics>,
    backoff: Backoff,
}

impl ChangeFeedConsumer {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        codec: PolicyCodec,
        cache: Arc<ReplicaCache>,
        metrics: Arc<ReplicaMetrics>,
        backoff: Backoff,
    ) -> Self {
        Self {
            store,
            codec,
            cache,
            metrics,
            backoff,
        }
    }

    /// Consume `stream`, resubscribing whenever it fails or ends.
    ///
    /// Returns only on shutdown. Stream and subscription errors are logged and
    /// retried, never returned.
    pub async fn run(self, stream: ChangeStream, mut shutdown: Shutdown) -> FeedExit {
        let mut stream = stream;
        let mut attempt: u32 = 0;
        info!("change feed consumer started");

        loop {
            let mut delivered = false;
            loop {
                let step = tokio::select! {
                    biased;
                    _ = shutdown.requested() => Step::Cancelled,
                    item = stream.next() => match item {
                        Some(Ok(change)) => Step::Change(change),
                        Some(Err(e)) => Step::Failed(e),
                        None => Step::Ended,
                    },
                };

                match step {
                    Step::Change(change) => {
                        delivered = true;
                        self.apply(change);
                    }
                    Step::Cancelled => {
                        drop(stream);
                        info!("change feed consumer cancelled");
                        return FeedExit::Cancelled;
                    }
                    Step::Failed(e) => {
                        warn!(error = %e, "change feed stream failed");
                        self.metrics.feed_interruptions.inc(&[("reason", "error")]);
                        break;
                    }
                    Step::Ended => {
                        warn!("change feed stream ended");
                        self.metrics.feed_interruptions.inc(&[("reason", "end")]);
                        break;
                    }
                }
            }

            drop(stream);
            // Only a stream that delivered something counts as recovered.
            if delivered {
                attempt = 0;
            }
            stream = match self.resubscribe(&mut shutdown, &mut attempt).await {
                Some(s) => s,
                None => {
                    info!("change feed consumer cancelled while resubscribing");
                    return FeedExit::Cancelled;
                }
            };
        }
    }

    /// Retry `subscribe_changes` forever with backoff. `None` on shutdown.
    ///
    /// `attempt` grows with every subscription made, successful or not, and is
    /// reset by the caller once a stream proves healthy.
    async fn resubscribe(
        &self,
        shutdown: &mut Shutdown,
        attempt: &mut u32,
    ) -> Option<ChangeStream> {
        loop {
            let delay = self.backoff.delay(*attempt);
            debug!(
                attempt = *attempt,
                delay_ms = delay.as_millis() as u64,
                "resubscribing to change feed"
            );

            tokio::select! {
                biased;
                _ = shutdown.requested() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            let res: Result<ChangeStream> = tokio::select! {
                biased;
                _ = shutdown.requested() => return None,
                res = self.store.subscribe_changes() => res,
            };

            let tried = *attempt;
            *attempt = attempt.saturating_add(1);
            match res {
                Ok(s) => {
                    info!(attempt = tried, "change feed resubscribed");
                    self.metrics.feed_resubscribes.inc(&[("outcome", "ok")]);
                    return Some(s);
                }
                Err(e) => {
                    error!(attempt = tried, error = %e, "change feed resubscribe failed");
                    self.metrics.feed_resubscribes.inc(&[("outcome", "error")]);
                }
            }
        }
    }

    /// Decode and apply one change. A side that fails to decode drops the
    /// whole event; the consumer moves on to the next one.
    fn apply(&self, change: WireChange) {
        let event = match change.decode(&self.codec) {
            Ok(event) => event,
            Err(err) => return self.skip(&change, &err),
        };

        let kind = event.kind();
        debug!(kind, "applying change event");
        self.cache.apply(event);
        self.metrics.feed_events.inc(&[("kind", kind)]);
        self.metrics.cache_policies.set(self.cache.len() as i64);
    }

    fn skip(&self, change: &WireChange, err: &ChangeDecodeError) {
        let id = change.id().unwrap_or_default();
        let side = err.side.as_str();
        warn!(id, side, error = %err.source, "skipping undecodable change event");
        self.metrics.feed_skipped.inc(&[("side", side)]);
    }
}
