//! # Request Coalescing
//!
//! [`PendingTable`] maps each [`ResourceKey`] being resolved to the shared
//! future of its outcome. The first caller for a key installs the entry and
//! starts the resolution; everyone arriving while it is in flight clones the
//! same future and awaits it.
//!
//! The table lock is held only to check-and-insert and to remove. Starting the
//! resolution happens after the lock is released. The entry is owned by a
//! [`PendingGuard`]: [`PendingGuard::settle`] removes it and then hands the
//! result to every waiter. A guard dropped without settling (the resolving task
//! panicked or was aborted) still removes the entry, and the waiters get
//! [`ReconcileError::TaskFailed`].

use crate::error::ReconcileError;
use crate::model::{ResourceKey, ResourceRef};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::trace;

/// Outcome of one resolution, cloneable so every waiter gets a copy.
pub type Resolution = Shared<BoxFuture<'static, Result<ResourceRef, ReconcileError>>>;

type Completion = oneshot::Sender<Result<ResourceRef, ReconcileError>>;

/// Shared `ResourceKey -> in-flight resolution` table.
#[derive(Clone, Default)]
pub struct PendingTable {
    inner: Arc<Mutex<HashMap<ResourceKey, Resolution>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the in-flight resolution for `key`, or starts one.
    ///
    /// When no resolution is in flight, an entry is installed under the lock
    /// and `start` is called with its guard once the lock is released. `start`
    /// should hand the guard to the resolving work, which calls
    /// [`PendingGuard::settle`] when done.
    ///
    /// Returns the resolution and whether this call started it.
    pub fn join_or_start<F>(&self, key: &ResourceKey, start: F) -> (Resolution, bool)
    where
        F: FnOnce(PendingGuard),
    {
        let (resolution, completion) = {
            let mut table = self.lock();
            if let Some(existing) = table.get(key) {
                trace!(%key, "Joining in-flight resolution");
                return (existing.clone(), false);
            }

            let (completion, settled) = oneshot::channel();
            let resolution = settled
                .map(|received| {
                    received.unwrap_or_else(|_| {
                        Err(ReconcileError::TaskFailed(
                            "resolution ended without a result".into(),
                        ))
                    })
                })
                .boxed()
                .shared();
            table.insert(key.clone(), resolution.clone());
            (resolution, completion)
        };

        start(PendingGuard {
            table: self.clone(),
            key: key.clone(),
            completion: Some(completion),
        });
        (resolution, true)
    }

    /// Number of keys currently being resolved.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().contains_key(key)
    }

    fn remove(&self, key: &ResourceKey) {
        self.lock().remove(key);
    }

    // Nothing panics while the lock is held, and the map is valid even if
    // something did, so a poisoned lock is safe to keep using.
    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKey, Resolution>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns one entry of the [`PendingTable`]. Removes it when settled or dropped.
pub struct PendingGuard {
    table: PendingTable,
    key: ResourceKey,
    completion: Option<Completion>,
}

impl PendingGuard {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Removes the entry, then delivers `result` to every waiter.
    ///
    /// A caller arriving after this point starts a fresh resolution.
    pub fn settle(mut self, result: Result<ResourceRef, ReconcileError>) {
        let completion = self.completion.take();
        drop(self);
        if let Some(completion) = completion {
            // Nobody left waiting is fine.
            let _ = completion.send(result);
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        trace!(key = %self.key, "Resolution settled");
        self.table.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, ResourceKey};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn guava() -> (ResourceKey, ResourceRef) {
        let key = ResourceKey::component("guava");
        let resource = ResourceRef::persisted("c1", key.clone(), Attributes::new());
        (key, resource)
    }

    #[tokio::test]
    async fn test_second_caller_joins_first() {
        let table = PendingTable::new();
        let (key, resource) = guava();

        let mut guards = Vec::new();
        let (first, started) = table.join_or_start(&key, |guard| guards.push(guard));
        assert!(started);

        let (second, started_again) =
            table.join_or_start(&key, |_| panic!("must not start twice"));
        assert!(!started_again);
        assert_eq!(table.len(), 1);

        guards.pop().unwrap().settle(Ok(resource.clone()));
        assert!(table.is_empty());
        assert_eq!(first.await, Ok(resource.clone()));
        assert_eq!(second.await, Ok(resource));
    }

    #[tokio::test]
    async fn test_dropped_guard_fails_waiters_and_frees_key() {
        let table = PendingTable::new();
        let (key, _) = guava();

        let mut guards = Vec::new();
        let (waiter, _) = table.join_or_start(&key, |guard| guards.push(guard));
        assert!(table.contains(&key));

        drop(guards);
        assert!(table.is_empty());
        assert!(matches!(waiter.await, Err(ReconcileError::TaskFailed(_))));

        let mut guards = Vec::new();
        let (_, restarted) = table.join_or_start(&key, |guard| guards.push(guard));
        assert!(restarted);
    }

    #[test]
    fn test_panicking_start_releases_entry() {
        let table = PendingTable::new();
        let (key, _) = guava();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            table.join_or_start(&key, |_guard| panic!("no runtime to spawn on"))
        }));
        assert!(outcome.is_err());
        assert!(table.is_empty());

        let mut guards = Vec::new();
        let (_, restarted) = table.join_or_start(&key, |guard| guards.push(guard));
        assert!(restarted);
    }

    #[test]
    fn test_distinct_keys_do_not_share() {
        let table = PendingTable::new();
        let a = ResourceKey::release("guava", "27");
        let b = ResourceKey::release("guava", "28");

        let mut guards = Vec::new();
        let (_, started_a) = table.join_or_start(&a, |guard| guards.push(guard));
        let (_, started_b) = table.join_or_start(&b, |guard| guards.push(guard));
        assert!(started_a && started_b);
        assert_eq!(table.len(), 2);
        assert_eq!(guards[1].key(), &b);
    }
}
