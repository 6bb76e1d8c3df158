//! SnapshotMap: blocking facade over CoreMap using a thread-blocking build lock.

use crate::core_map::CoreMap;
use crate::snapshot::Snapshot;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::sync::Arc;

/// A concurrent map that caches an immutable snapshot of its contents so
/// repeated full traversals avoid re-walking the backing store.
///
/// Point operations are pass-through to the backing [`DashMap`] followed by
/// conditional invalidation of the cached snapshot. [`SnapshotMap::for_each`]
/// serves the cached snapshot lock-free when one is present and otherwise
/// rebuilds it under a blocking build lock; at most one thread builds at a
/// time.
///
/// Intended for read-heavy workloads: many threads scanning all entries
/// against a map that mutates only occasionally.
pub struct SnapshotMap<K, V, S = RandomState> {
    core: CoreMap<K, V, S>,
    build_lock: Mutex<()>,
}

impl<K, V> SnapshotMap<K, V>
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

impl<K, V> Default for SnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SnapshotMap<K, V, S>
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

    /// Toggle value-equality elision (default on). When enabled, re-writing
    /// the value already present under a key does not invalidate the cached
    /// snapshot. Requires `V::eq` to be a pure comparison of the stored
    /// data; disable it for value types whose contents can diverge from
    /// their `PartialEq` (see the crate docs).
    pub fn elide_unchanged(mut self, enabled: bool) -> Self {
        self.core.elide_unchanged = enabled;
        self
    }

    /// Number of entries in the backing store.
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

    /// Clone of the current value under `key`, if any. Linearizable
    /// single-key read on the backing store; never touches the snapshot.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.get(key)
    }

    /// Insert or replace, returning the previous value. Invalidates the
    /// cached snapshot unless the previous value compared equal (elision).
    /// Never waits on a build in progress.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.core.insert(key, value)
    }

    /// Remove, returning the previous value. Invalidates only if a mapping
    /// was actually removed.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.remove(key)
    }

    /// Remove only if the current value equals `expected`. Invalidates only
    /// on success.
    pub fn remove_if_equals<Q>(&self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.remove_if_equals(key, expected)
    }

    /// Bulk insert; always invalidates.
    pub fn insert_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.core.insert_all(entries)
    }

    /// Remove all entries; always invalidates.
    pub fn clear(&self) {
        self.core.clear()
    }

    /// Whether a snapshot is currently cached. Mainly an observability aid;
    /// another thread may invalidate immediately after this returns.
    pub fn has_snapshot(&self) -> bool {
        self.core.cached().is_some()
    }

    /// Lock-free handle to the cached snapshot, if one is present. The
    /// snapshot stays valid for as long as the `Arc` is held, even across
    /// later invalidations.
    pub fn cached_snapshot(&self) -> Option<Arc<Snapshot<K, V>>> {
        self.core.cached()
    }

    /// Visit every entry exactly once.
    ///
    /// Fast path: if a snapshot is cached, iterate it without taking any
    /// lock. Slow path: take the build lock, re-check (another thread may
    /// have finished building while this one contended), and if the cache
    /// is still empty perform one traversal of the backing store, invoking
    /// `action` and buffering each entry. The buffer is published as the
    /// new snapshot only if no mutation happened during the traversal;
    /// otherwise it is discarded and the next caller retries.
    ///
    /// The traversal of the backing store is weakly consistent: entries
    /// mutated concurrently with the build may or may not be observed. Once
    /// mutations stop, traversals reflect the true contents.
    ///
    /// A panic in `action` propagates; the build lock is released on unwind
    /// and no partial snapshot is published. `action` must not mutate this
    /// map: the backing store holds a shard lock while it runs during a
    /// build.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&K, &V),
    {
        if let Some(snap) = self.core.cached() {
            for (k, v) in snap.iter() {
                action(k, v);
            }
            return;
        }

        let _guard = self.build_lock.lock();
        if let Some(snap) = self.core.cached() {
            for (k, v) in snap.iter() {
                action(k, v);
            }
            return;
        }
        self.core.build_with(&mut action);
    }
}
