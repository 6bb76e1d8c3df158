//! Snapshot: immutable point-in-time capture of all entries, plus the
//! versioned cell that decides when a cached capture may still be served.

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An immutable, index-correlated capture of every entry in the map, stamped
/// with the version counter value observed when its traversal started.
///
/// Snapshots are replaced wholesale, never edited in place. Any number of
/// readers may iterate one concurrently.
pub struct Snapshot<K, V> {
    keys: Box<[K]>,
    values: Box<[V]>,
    version: u64,
}

impl<K, V> Snapshot<K, V> {
    pub(crate) fn new(keys: Vec<K>, values: Vec<V>, version: u64) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self {
            keys: keys.into_boxed_slice(),
            values: values.into_boxed_slice(),
            version,
        }
    }

    /// Number of entries captured.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Version counter value at the start of the traversal that produced
    /// this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterate the captured entries in build order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }
}

/// Holds the current (possibly absent) snapshot and the version counter.
///
/// The counter is bumped exactly once per content-changing mutation; the
/// snapshot reference is cleared at the same time. A snapshot built from a
/// traversal is published only if no bump happened during the build, so a
/// cached snapshot always matches the state the backing store had at the
/// start of the traversal that produced it.
pub(crate) struct SnapshotCell<K, V> {
    current: ArcSwapOption<Snapshot<K, V>>,
    version: AtomicU64,
}

impl<K, V> SnapshotCell<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            current: ArcSwapOption::const_empty(),
            version: AtomicU64::new(0),
        }
    }

    /// Lock-free read of the cached snapshot. Wait-free; never allocates.
    pub(crate) fn load(&self) -> Option<Arc<Snapshot<K, V>>> {
        self.current.load_full()
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Record a content change: bump the counter, then drop the cached
    /// snapshot. Callers never hold the build lock here; the counter bump
    /// must land before the clear so an in-flight build that re-reads the
    /// counter after observing the old snapshot cannot miss the change.
    pub(crate) fn invalidate(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        self.current.store(None);
    }

    /// Publish `snap` only if the counter still equals the version it was
    /// built under. Returns whether the snapshot was published.
    ///
    /// A writer may invalidate between our counter check and our store,
    /// which would leave a stale snapshot cached. The counter is re-read
    /// after the store and the reference cleared if it moved; the writer's
    /// bump precedes its clear, so one of the two clears always wins and
    /// the worst outcome of the race is a discarded build.
    pub(crate) fn publish_if_unchanged(&self, snap: Snapshot<K, V>) -> bool {
        let built_at = snap.version;
        if self.version.load(Ordering::SeqCst) != built_at {
            return false;
        }
        self.current.store(Some(Arc::new(snap)));
        if self.version.load(Ordering::SeqCst) != built_at {
            self.current.store(None);
            return false;
        }
        true
    }
}
