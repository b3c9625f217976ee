//! Cold start, write-through, and lookup behavior of the manager facade.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use ladon_core::error::{Error, Result};
use ladon_core::{Effect, Policy, PolicyCodec, PolicyMatcher};
use ladon_replica::{MemoryStore, PolicyManager, ReplicatedManager};

use common::{broken_record, fast_feed, manager_for, policy, record, sorted_ids, DownStore};

#[tokio::test]
async fn cold_start_loads_exact_key_set() {
    let store = Arc::new(MemoryStore::with_records(
        ["A", "B", "C"].map(|id| record(&policy(id, &["alice"]))),
    ));
    let m = manager_for(store);

    assert_eq!(m.cold_start().await.unwrap(), 3);
    let all = m.find_policies_for_subject("alice").unwrap();
    assert_eq!(sorted_ids(&all), vec!["A", "B", "C"]);
    assert_eq!(m.len(), 3);
    assert_eq!(m.metrics().cold_starts.get(&[("outcome", "ok")]), 1);
}

#[tokio::test]
async fn cold_start_replaces_previous_content() {
    let store = Arc::new(MemoryStore::with_records([record(&policy("A", &["alice"]))]));
    let m = manager_for(Arc::clone(&store));
    m.cold_start().await.unwrap();

    store.replace(record(&policy("B", &["alice"])));
    store.rename("A", record(&policy("C", &["alice"]))).unwrap();
    m.cold_start().await.unwrap();

    let all = m.find_policies_for_subject("alice").unwrap();
    assert_eq!(sorted_ids(&all), vec!["B", "C"]);
}

#[tokio::test]
async fn scenario_get_after_cold_start() {
    let p1 = Policy::new("p1", Effect::Allow).with_subjects(["alice"]);
    let store = Arc::new(MemoryStore::with_records([record(&p1)]));
    let m = manager_for(store);
    m.cold_start().await.unwrap();

    assert_eq!(*m.get("p1").unwrap(), p1);
    assert!(m.get("p2").unwrap_err().is_not_found());
}

#[tokio::test]
async fn cold_start_decode_error_is_fatal_and_leaves_replica() {
    let store = Arc::new(MemoryStore::with_records([record(&policy("good", &["alice"]))]));
    let m = manager_for(Arc::clone(&store));
    m.cold_start().await.unwrap();

    store.replace(broken_record("bad"));
    let err = m.cold_start().await.unwrap_err();
    assert_eq!(err.kind().as_str(), "DECODE");

    // previous replica survives untouched
    assert_eq!(m.len(), 1);
    assert!(m.get("good").is_ok());
    assert!(m.get("bad").unwrap_err().is_not_found());
    assert_eq!(m.metrics().cold_starts.get(&[("outcome", "decode_error")]), 1);
}

#[tokio::test]
async fn store_errors_surface_synchronously() {
    let m = ReplicatedManager::with_defaults(Arc::new(DownStore));

    assert_eq!(m.cold_start().await.unwrap_err().kind().as_str(), "STORE");
    assert_eq!(
        m.create(&policy("p", &["alice"])).await.unwrap_err().kind().as_str(),
        "STORE"
    );
    assert_eq!(m.delete("p").await.unwrap_err().kind().as_str(), "STORE");
    assert_eq!(m.watch().await.unwrap_err().kind().as_str(), "STORE");
}

#[tokio::test]
async fn create_and_delete_do_not_touch_replica() {
    let store = Arc::new(MemoryStore::new());
    let m = manager_for(Arc::clone(&store));
    m.cold_start().await.unwrap();

    m.create(&policy("new", &["alice"])).await.unwrap();
    assert!(store.contains("new"));
    assert!(m.get("new").unwrap_err().is_not_found());

    m.cold_start().await.unwrap();
    assert!(m.get("new").is_ok());

    m.delete("new").await.unwrap();
    assert!(!store.contains("new"));
    assert!(m.get("new").is_ok(), "replica only changes via the feed");
}

#[tokio::test]
async fn delete_missing_id_is_ok() {
    let m = manager_for(Arc::new(MemoryStore::new()));
    m.delete("ghost").await.unwrap();
}

#[tokio::test]
async fn find_returns_empty_when_nothing_matches() {
    let store = Arc::new(MemoryStore::with_records([
        record(&policy("a", &["alice"])),
        record(&policy("b", &["group:admins"])),
    ]));
    let m = manager_for(store);
    m.cold_start().await.unwrap();

    assert!(m.find_policies_for_subject("mallory").unwrap().is_empty());
    assert_eq!(
        sorted_ids(&m.find_policies_for_subject("group:admins").unwrap()),
        vec!["b"]
    );
}

#[tokio::test]
async fn find_uses_wildcards() {
    let store = Arc::new(MemoryStore::with_records([
        record(&policy("users", &["user:*"])),
        record(&policy("bob", &["user:bob"])),
        record(&policy("other", &["service:billing"])),
    ]));
    let m = manager_for(store);
    m.cold_start().await.unwrap();

    let hits = m.find_policies_for_subject("user:bob").unwrap();
    assert_eq!(sorted_ids(&hits), vec!["bob", "users"]);
}

#[tokio::test]
async fn find_fails_on_malformed_pattern() {
    let store = Arc::new(MemoryStore::with_records([
        record(&policy("fine", &["alice"])),
        record(&policy("broken", &["al*ce"])),
    ]));
    let m = manager_for(store);
    m.cold_start().await.unwrap();

    let err = m.find_policies_for_subject("alice").unwrap_err();
    assert_eq!(err.kind().as_str(), "MATCH");
}

/// Matches everything except one policy, which it cannot evaluate.
struct FailOn(&'static str);

impl PolicyMatcher for FailOn {
    fn matches(&self, policy: &Policy, _haystack: &[String], _needle: &str) -> Result<bool> {
        if policy.id() == self.0 {
            return Err(Error::Match(format!("cannot evaluate {}", policy.id())));
        }
        Ok(true)
    }
}

#[tokio::test]
async fn find_fails_fast_even_after_matches() {
    let mut records: Vec<_> = (0..20)
        .map(|i| record(&policy(&format!("ok-{i}"), &["alice"])))
        .collect();
    records.push(record(&policy("poison", &["alice"])));
    let store = Arc::new(MemoryStore::with_records(records));

    let m = ReplicatedManager::new(
        store,
        PolicyCodec::default(),
        Arc::new(FailOn("poison")),
        fast_feed(),
    );
    m.cold_start().await.unwrap();

    let err = m.find_policies_for_subject("alice").unwrap_err();
    assert!(err.to_string().contains("poison"));
}

#[tokio::test]
async fn trait_object_facade() {
    let store = Arc::new(MemoryStore::with_records([record(&policy("p1", &["alice"]))]));
    let m = manager_for(store);
    m.cold_start().await.unwrap();

    let dynm: &dyn PolicyManager = &m;
    assert_eq!(dynm.get("p1").await.unwrap().id(), "p1");
    assert_eq!(dynm.find_policies_for_subject("alice").await.unwrap().len(), 1);
    dynm.create(&policy("p2", &["bob"])).await.unwrap();
    dynm.delete("p2").await.unwrap();
}
