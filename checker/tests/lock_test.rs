//! Testable property 1 (spec.md §8): for any trigger, across N concurrent
//! workers, the count of overlapping evaluator calls is 0.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use checker::lock::TriggerLockGuard;
use shared::store::memory::InMemoryStore;
use shared::store::{Store, StoreError};
use shared::types::{Trigger, TriggerId, TriggerType, TtlState};

fn trigger(id: &str) -> Trigger {
    Trigger {
        id: TriggerId::from(id),
        name: "t".into(),
        targets: vec!["metric".into()],
        warn_value: Some(1.0),
        error_value: Some(2.0),
        trigger_type: TriggerType::Rising,
        expression: None,
        patterns: vec![],
        tags: HashSet::new(),
        schedule: None,
        ttl: None,
        ttl_state: TtlState::NoData,
        is_remote: false,
        mute_new_metrics: false,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn lock_excludes_concurrent_workers_on_the_same_trigger() {
    let memory_store = InMemoryStore::new();
    memory_store.put_trigger(trigger("t1"));
    let store: Arc<dyn Store> = Arc::new(memory_store);

    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let overlap_detected = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let current = current.clone();
        let max_seen = max_seen.clone();
        let overlap_detected = overlap_detected.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                let guard = match TriggerLockGuard::acquire(
                    store.clone(),
                    TriggerId::from("t1"),
                    Duration::from_millis(50),
                )
                .await
                {
                    | Ok(guard) => guard,
                    | Err(StoreError::BusyLock(_)) => {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        continue;
                    }
                    | Err(_) => continue,
                };

                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                if now > 1 {
                    overlap_detected.store(true, Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
                current.fetch_sub(1, Ordering::SeqCst);
                drop(guard);
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(
        !overlap_detected.load(Ordering::SeqCst),
        "observed overlapping lock holders for the same trigger"
    );
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}
