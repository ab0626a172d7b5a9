use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock namespaces, one per pipeline edge.
pub mod edges {
    pub const LEAD_OPPORTUNITY: &str = "lead-opportunity";
    pub const OPPORTUNITY_QUOTE: &str = "opportunity-quote";
    pub const QUOTE_ORDER: &str = "quote-order";
    /// Status writes onto an owning opportunity (rules 4 and 5).
    pub const OPPORTUNITY_STATUS: &str = "opportunity-status";
}

/// Async mutexes keyed by `<edge>:<originId>`.
///
/// Held across the existence check and the creation so two concurrent
/// triggers for the same origin cannot both pass the check. An entry lives
/// only while a guard or a waiter holds it.
#[derive(Default)]
pub struct CreationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds one key of [`CreationLocks`]. Dropping it releases the mutex and
/// removes the map entry once nobody else is queued on it.
pub struct CreationGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps its own Arc; release it before counting.
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl CreationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, edge: &str, origin_id: &str) -> CreationGuard<'_> {
        let key = format!("{}:{}", edge, origin_id);
        // Clone out of the map before awaiting so no shard lock is held.
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        CreationGuard {
            locks: &self.locks,
            key,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(CreationLocks::new());
        let guard = locks.acquire(edges::QUOTE_ORDER, "q-1").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = contender.acquire(edges::QUOTE_ORDER, "q-1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = CreationLocks::new();
        let _a = locks.acquire(edges::QUOTE_ORDER, "q-1").await;
        let _b = locks.acquire(edges::OPPORTUNITY_QUOTE, "q-1").await;
        let _c = locks.acquire(edges::QUOTE_ORDER, "q-2").await;
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = CreationLocks::new();
        for i in 0..500 {
            let _guard = locks.acquire(edges::LEAD_OPPORTUNITY, &format!("lead-{}", i)).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(CreationLocks::new());
        let guard = locks.acquire(edges::QUOTE_ORDER, "q-1").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = contender.acquire(edges::QUOTE_ORDER, "q-1").await;
            contender.len()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);
        assert_eq!(waiter.await.unwrap(), 1);
        assert!(locks.is_empty());
    }
}
