//! Replica cache: the in-memory id -> policy view that serves every read.
//!
//! One reader/writer lock guards the whole map. Reads run concurrently; a
//! mutation excludes everything else for its duration, so a `get` issued after
//! a mutation returns always observes it. Cold start swaps the map wholesale
//! (`replace_all`) and the change feed goes through `apply`; nothing else
//! mutates the replica.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ladon_core::error::{Error, Result};
use ladon_core::{ChangeEvent, Policy};

#[derive(Debug, Default)]
pub struct ReplicaCache {
    inner: RwLock<HashMap<String, Arc<Policy>>>,
}

impl ReplicaCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single map operation; a poisoned lock never guards
    // a half-applied update.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Policy>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Policy>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically discard all content and install `policies`.
    pub fn replace_all(&self, policies: HashMap<String, Policy>) {
        let next: HashMap<String, Arc<Policy>> = policies
            .into_iter()
            .map(|(id, p)| (id, Arc::new(p)))
            .collect();
        *self.write() = next;
    }

    pub fn upsert(&self, id: impl Into<String>, policy: Policy) {
        self.write().insert(id.into(), Arc::new(policy));
    }

    /// Remove `id`. Absent ids are a no-op.
    pub fn remove(&self, id: &str) {
        self.write().remove(id);
    }

    /// Apply one decoded change event under a single write lock.
    pub fn apply(&self, event: ChangeEvent) {
        match event {
            ChangeEvent::Noop => {}
            ChangeEvent::Insert(new) => {
                self.write().insert(new.id().to_string(), Arc::new(new));
            }
            ChangeEvent::Delete(old) => {
                self.write().remove(old.id());
            }
            ChangeEvent::Update { old, new } => {
                let mut map = self.write();
                map.remove(old.id());
                map.insert(new.id().to_string(), Arc::new(new));
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Policy>> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Point-in-time copy, safe to iterate without holding the lock.
    pub fn snapshot(&self) -> Vec<Arc<Policy>> {
        self.read().values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use ladon_core::Effect;

    fn policy(id: &str) -> Policy {
        Policy::new(id, Effect::Allow).with_subjects(["alice"])
    }

    fn sorted_ids(c: &ReplicaCache) -> Vec<String> {
        let mut ids = c.ids();
        ids.sort();
        ids
    }

    #[test]
    fn read_after_write() {
        let c = ReplicaCache::new();
        c.upsert("a", policy("a"));
        assert_eq!(*c.get("a").unwrap(), policy("a"));
    }

    #[test]
    fn missing_is_not_found() {
        let c = ReplicaCache::new();
        let err = c.get("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn remove_absent_is_noop() {
        let c = ReplicaCache::new();
        c.upsert("a", policy("a"));
        c.remove("zzz");
        c.apply(ChangeEvent::Delete(policy("zzz")));
        assert_eq!(sorted_ids(&c), vec!["a"]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let c = ReplicaCache::new();
        c.apply(ChangeEvent::Insert(policy("a")));
        c.apply(ChangeEvent::Insert(policy("a")));
        assert_eq!(c.len(), 1);
        assert_eq!(*c.get("a").unwrap(), policy("a"));
    }

    #[test]
    fn replace_all_discards_prior_content() {
        let c = ReplicaCache::new();
        c.upsert("old", policy("old"));
        let next: HashMap<_, _> = ["a", "b", "c"]
            .into_iter()
            .map(|id| (id.to_string(), policy(id)))
            .collect();
        c.replace_all(next);
        assert_eq!(sorted_ids(&c), vec!["a", "b", "c"]);
    }

    #[test]
    fn update_with_rename() {
        let c = ReplicaCache::new();
        c.upsert("a", policy("a"));
        c.apply(ChangeEvent::Update {
            old: policy("a"),
            new: policy("b"),
        });
        assert!(c.get("a").unwrap_err().is_not_found());
        assert_eq!(c.get("b").unwrap().id(), "b");
    }

    #[test]
    fn update_same_id_replaces_value() {
        let c = ReplicaCache::new();
        c.upsert("a", policy("a"));
        let changed = policy("a").with_description("v2");
        c.apply(ChangeEvent::Update {
            old: policy("a"),
            new: changed.clone(),
        });
        assert_eq!(*c.get("a").unwrap(), changed);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn snapshot_is_detached() {
        let c = ReplicaCache::new();
        c.upsert("a", policy("a"));
        let snap = c.snapshot();
        c.remove("a");
        assert_eq!(snap.len(), 1);
        assert!(c.is_empty());
    }

    #[test]
    fn concurrent_readers_and_writer() {
        let c = Arc::new(ReplicaCache::new());
        let mut handles = Vec::new();
        for i in 0..4 {
            let c = Arc::clone(&c);
            handles.push(std::thread::spawn(move || {
                for j in 0..200 {
                    let id = format!("p{}", (i * 200 + j) % 50);
                    if i == 0 {
                        c.upsert(id.clone(), policy(&id));
                    } else {
                        let _ = c.get(&id);
                        let _ = c.snapshot();
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.len(), 50);
    }
}
