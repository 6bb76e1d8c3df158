//! CoreMap: backing store + snapshot cell + the point-operation protocol
//! shared by the blocking and suspending facades.

use crate::snapshot::{Snapshot, SnapshotCell};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::hash_map::RandomState;
use std::sync::Arc;

/// Shared state of a snapshot map: the thread-safe backing store, the
/// versioned snapshot cell, and the value-equality elision toggle.
///
/// Every mutating operation writes through to the store and then invalidates
/// the cell iff observable content changed. The facades add only the build
/// lock and the traversal entry points.
pub(crate) struct CoreMap<K, V, S = RandomState> {
    pub(crate) store: DashMap<K, V, S>,
    pub(crate) cell: SnapshotCell<K, V>,
    pub(crate) elide_unchanged: bool,
}

impl<K, V> CoreMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    pub(crate) fn new() -> Self {
        Self::from_store(DashMap::new())
    }
}

impl<K, V, S> CoreMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Clone + Default,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self::from_store(DashMap::with_hasher(hasher))
    }

    /// Wrap an existing backing store. The cell starts empty, so the first
    /// traversal performs a real build over the seeded contents.
    pub(crate) fn from_store(store: DashMap<K, V, S>) -> Self {
        Self {
            store,
            cell: SnapshotCell::new(),
            elide_unchanged: true,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.contains_key(key)
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.get(key).map(|entry| entry.value().clone())
    }

    /// Write through, then invalidate unless the previous value under `key`
    /// already compared equal (and elision is enabled). The shard guard is
    /// released before the invalidation so writers never wait on readers of
    /// the cell.
    pub(crate) fn insert(&self, key: K, value: V) -> Option<V> {
        let (previous, changed) = match self.store.entry(key) {
            Entry::Occupied(mut occupied) => {
                let unchanged = self.elide_unchanged && *occupied.get() == value;
                (Some(occupied.insert(value)), !unchanged)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                (None, true)
            }
        };
        if changed {
            self.cell.invalidate();
        }
        previous
    }

    /// Invalidates only if a mapping was actually present and removed.
    pub(crate) fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self.store.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.cell.invalidate();
        }
        removed
    }

    /// Conditional remove; invalidates only on success.
    pub(crate) fn remove_if_equals<Q>(&self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self
            .store
            .remove_if(key, |_, current| current == expected)
            .is_some();
        if removed {
            self.cell.invalidate();
        }
        removed
    }

    /// Bulk insert. Always invalidates; bulk operations are assumed to
    /// change content.
    pub(crate) fn insert_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.store.insert(key, value);
        }
        self.cell.invalidate();
    }

    /// Always invalidates.
    pub(crate) fn clear(&self) {
        self.store.clear();
        self.cell.invalidate();
    }

    pub(crate) fn cached(&self) -> Option<Arc<Snapshot<K, V>>> {
        self.cell.load()
    }

    /// One real traversal of the backing store, interleaving the caller's
    /// action with buffering, then a conditional publish. Must be called
    /// with the build lock held and the cell already re-checked empty.
    ///
    /// If `action` panics the buffers are dropped and nothing is published.
    pub(crate) fn build_with<F>(&self, action: &mut F)
    where
        F: FnMut(&K, &V),
    {
        let started_at = self.cell.version();
        let mut keys = Vec::with_capacity(self.store.len());
        let mut values = Vec::with_capacity(self.store.len());
        for entry in self.store.iter() {
            let (k, v) = entry.pair();
            action(k, v);
            keys.push(k.clone());
            values.push(v.clone());
        }
        self.cell.publish_if_unchanged(Snapshot::new(keys, values, started_at));
    }

    /// One real traversal buffered into an unpublished snapshot, with no
    /// user code run while a store shard is locked. The suspending facade
    /// runs its action over the buffer and then offers it to the cell.
    pub(crate) fn collect(&self) -> Snapshot<K, V> {
        let started_at = self.cell.version();
        let mut keys = Vec::with_capacity(self.store.len());
        let mut values = Vec::with_capacity(self.store.len());
        for entry in self.store.iter() {
            let (k, v) = entry.pair();
            keys.push(k.clone());
            values.push(v.clone());
        }
        Snapshot::new(keys, values, started_at)
    }

    pub(crate) fn publish(&self, snap: Snapshot<K, V>) {
        self.cell.publish_if_unchanged(snap);
    }
}
