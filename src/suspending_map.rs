//! SuspendingSnapshotMap: cooperative facade using a task-suspending build lock.

use crate::core_map::CoreMap;
use crate::snapshot::Snapshot;
use core::borrow::Borrow;
use core::future::Future;
use core::hash::{BuildHasher, Hash};
use dashmap::DashMap;
use std::collections::hash_map::RandomState;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The async counterpart of [`SnapshotMap`](crate::SnapshotMap).
///
/// Same state and protocol, with the blocking build lock replaced by
/// [`tokio::sync::Mutex`]: a task contending for the lock suspends instead
/// of occupying a worker thread, and resumes once the lock is granted.
/// Point operations are synchronous and never suspend.
///
/// If the task is cancelled while suspended on the lock or mid-build, the
/// lock is released and no snapshot is published.
pub struct SuspendingSnapshotMap<K, V, S = RandomState> {
    core: CoreMap<K, V, S>,
    build_lock: Mutex<()>,
}

impl<K, V> SuspendingSnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self {
            core: CoreMap::new(),
            build_lock: Mutex::new(()),
        }
    }
}

impl<K, V> Default for SuspendingSnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SuspendingSnapshotMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Clone + Default,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            core: CoreMap::with_hasher(hasher),
            build_lock: Mutex::new(()),
        }
    }

    /// Wrap an existing, possibly populated backing store.
    pub fn from_store(store: DashMap<K, V, S>) -> Self {
        Self {
            core: CoreMap::from_store(store),
            build_lock: Mutex::new(()),
        }
    }

    /// Toggle value-equality elision (default on). See
    /// [`SnapshotMap::elide_unchanged`](crate::SnapshotMap::elide_unchanged).
    pub fn elide_unchanged(mut self, enabled: bool) -> Self {
        self.core.elide_unchanged = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.get(key)
    }

    /// Insert or replace; invalidates unless the previous value compared
    /// equal (elision). Synchronous; never waits on a build in progress.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.core.insert(key, value)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.remove(key)
    }

    pub fn remove_if_equals<Q>(&self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.remove_if_equals(key, expected)
    }

    pub fn insert_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.core.insert_all(entries)
    }

    pub fn clear(&self) {
        self.core.clear()
    }

    pub fn has_snapshot(&self) -> bool {
        self.core.cached().is_some()
    }

    pub fn cached_snapshot(&self) -> Option<Arc<Snapshot<K, V>>> {
        self.core.cached()
    }

    /// Visit every entry exactly once, suspending rather than blocking when
    /// the build lock is contended.
    ///
    /// Entries are passed to `action` by value (clones of the stored pair),
    /// so the returned future borrows nothing from the map's internals.
    ///
    /// Protocol as in the blocking variant: lock-free fast path, then a
    /// double-checked build under the suspending lock. The build traversal
    /// buffers entries without suspending, so no backing-store shard stays
    /// locked across an await; `action` then runs over the buffered pairs
    /// before the conditional publish. Dropping the future mid-build
    /// releases the lock and publishes nothing.
    pub async fn for_each<F, Fut>(&self, mut action: F)
    where
        F: FnMut(K, V) -> Fut,
        Fut: Future<Output = ()>,
    {
        if let Some(snap) = self.core.cached() {
            for (k, v) in snap.iter() {
                action(k.clone(), v.clone()).await;
            }
            return;
        }

        let _guard = self.build_lock.lock().await;
        if let Some(snap) = self.core.cached() {
            for (k, v) in snap.iter() {
                action(k.clone(), v.clone()).await;
            }
            return;
        }

        let built = self.core.collect();
        for (k, v) in built.iter() {
            action(k.clone(), v.clone()).await;
        }
        self.core.publish(built);
    }
}
