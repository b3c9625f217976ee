//! In-memory [`PolicyStore`] used by tests and the demo binary.
//!
//! Records live in a `DashMap`; every subscriber owns an unbounded channel.
//! The feed can be paused to simulate a broken change stream: live
//! subscriptions fail, new subscriptions are refused, and committed changes
//! are buffered until the next subscriber after `resume_feed`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use ladon_core::error::{Error, Result};
use ladon_core::{WireChange, WireRecord};

use super::{ChangeStream, PolicyStore};

type FeedTx = mpsc::UnboundedSender<Result<WireChange>>;

#[derive(Default)]
struct FeedState {
    subscribers: Vec<FeedTx>,
    paused: bool,
    backlog: Vec<WireChange>,
}

impl FeedState {
    fn publish(&mut self, change: WireChange) {
        if self.paused {
            self.backlog.push(change);
            return;
        }
        self.subscribers
            .retain(|tx| tx.send(Ok(change.clone())).is_ok());
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, WireRecord>,
    // Held across record mutation and publish so subscribers see commit order.
    feed: Mutex<FeedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records` (no change events are emitted).
    pub fn with_records(records: impl IntoIterator<Item = WireRecord>) -> Self {
        let this = Self::new();
        for r in records {
            this.records.insert(r.id.clone(), r);
        }
        this
    }

    fn feed(&self) -> MutexGuard<'_, FeedState> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Insert-or-replace, as an external writer would (emits insert or update).
    pub fn replace(&self, record: WireRecord) {
        let mut feed = self.feed();
        let change = match self.records.insert(record.id.clone(), record.clone()) {
            Some(old) => WireChange::update(old, record),
            None => WireChange::insert(record),
        };
        feed.publish(change);
    }

    /// Replace the record stored under `old_id` with `record`, which may carry
    /// a different id (emits one update with both sides).
    pub fn rename(&self, old_id: &str, record: WireRecord) -> Result<()> {
        let mut feed = self.feed();
        let (_, old) = self
            .records
            .remove(old_id)
            .ok_or_else(|| Error::Store(format!("no such record: {old_id}")))?;
        self.records.insert(record.id.clone(), record.clone());
        feed.publish(WireChange::update(old, record));
        Ok(())
    }

    /// Push a raw change document to subscribers without touching records.
    pub fn publish_raw(&self, change: WireChange) {
        self.feed().publish(change);
    }

    /// Break every live subscription with a stream error and refuse new ones.
    /// Changes committed while paused are buffered.
    pub fn pause_feed(&self) {
        let mut feed = self.feed();
        feed.paused = true;
        for tx in feed.subscribers.drain(..) {
            let _ = tx.send(Err(Error::Store("change feed interrupted".into())));
        }
    }

    /// Accept subscriptions again; the next subscriber receives the backlog first.
    pub fn resume_feed(&self) {
        self.feed().paused = false;
    }

    /// End every live subscription cleanly (no error item).
    pub fn close_subscriptions(&self) {
        self.feed().subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        let mut feed = self.feed();
        feed.subscribers.retain(|tx| !tx.is_closed());
        feed.subscribers.len()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn scan_all(&self) -> Result<Vec<WireRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn insert(&self, record: WireRecord) -> Result<()> {
        let mut feed = self.feed();
        if self.records.contains_key(&record.id) {
            return Err(Error::Store(format!("duplicate primary key: {}", record.id)));
        }
        self.records.insert(record.id.clone(), record.clone());
        feed.publish(WireChange::insert(record));
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let mut feed = self.feed();
        if let Some((_, old)) = self.records.remove(id) {
            feed.publish(WireChange::delete(old));
        }
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<ChangeStream> {
        let mut feed = self.feed();
        if feed.paused {
            return Err(Error::Store("change feed unavailable".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for change in feed.backlog.drain(..) {
            let _ = tx.send(Ok(change));
        }
        feed.subscribers.push(tx);

        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}
