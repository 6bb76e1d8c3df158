//! snapshot-hashmap: a concurrent map wrapper that caches an immutable
//! iteration snapshot so read-heavy full scans avoid re-traversing the
//! backing store.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: serve repeated full traversals from an immutable, versioned
//!   snapshot that is never stale relative to observed mutations, while
//!   keeping point operations linearizable pass-throughs to the backing
//!   store.
//! - Layers:
//!   - Snapshot / SnapshotCell: an immutable (keys, values, version)
//!     capture, held in an atomically swappable reference next to an
//!     atomic version counter; decides per traversal whether the cached
//!     capture may be served or must be rebuilt.
//!   - CoreMap<K, V, S>: owns the DashMap backing store, the cell, and the
//!     elision toggle; implements every point operation and the
//!     traversal/buffering step shared by both facades.
//!   - SnapshotMap / SuspendingSnapshotMap: public facades that add only
//!     the build lock: `parking_lot::Mutex` for OS threads, or
//!     `tokio::sync::Mutex` (feature `async`) for cooperative tasks that
//!     must suspend rather than occupy a worker thread.
//!
//! Invalidation protocol
//! - Every content-changing mutation bumps the version counter exactly once
//!   and clears the snapshot reference, without taking any lock.
//! - A traversal first tries a wait-free read of the reference. On a miss it
//!   takes the build lock, re-checks (double-checked pattern), records the
//!   counter, walks the backing store once while buffering entries, and
//!   publishes the buffer only if the counter did not move during the walk.
//!   A failed publish leaves the cache empty; the next caller retries.
//! - The publish re-checks the counter after the store and clears the
//!   reference if a writer raced the window, so a mutation can cost a
//!   discarded build but never a stale snapshot.
//!
//! Constraints
//! - At most one task inside the build critical section; unbounded readers
//!   on a published snapshot (it is immutable).
//! - Point operations and the fast-path traversal never wait on a build.
//! - Traversal of the backing store during a build is weakly consistent
//!   (DashMap's iteration contract): concurrently mutated entries may be
//!   missed or doubly observed. Once mutations stop, traversals match the
//!   true contents exactly.
//! - The traversal action must not mutate the same map; the blocking build
//!   runs it while a backing-store shard is locked.
//!
//! Elision
//! - `insert` skips invalidation when the previous value under the key
//!   compares equal to the new one, avoiding rebuild storms from idempotent
//!   re-writes. This assumes `V::eq` is a pure comparison of the stored
//!   data; if values are mutated behind shared references without going
//!   through `insert`, elision will silently miss invalidations. It is a
//!   construction-time toggle (`elide_unchanged`, default on).
//!
//! Overflow semantics
//! - The version counter is a `u64` bumped once per mutation; wraparound is
//!   not a realistic concern and comparisons are exact equality. No
//!   wraparound-safe arithmetic is performed.
//!
//! Why this split?
//! - Localize invariants: the cell owns the version protocol, CoreMap owns
//!   write-through-then-invalidate, the facades own only lock choice.
//! - One algorithm, two locks: both facades run the same double-checked
//!   build; nothing about versioning or publishing is duplicated.
//! - Clear failure boundaries: a panicking or cancelled build releases its
//!   lock via RAII and publishes nothing; the backing store and counter are
//!   never left inconsistent.
//!
//! Notes and non-goals
//! - The backing store is an external collaborator (`dashmap`); this crate
//!   implements no hash table of its own.
//! - No multi-key transactions; no guarantee that a traversal reflects the
//!   absolute latest write at the instant it is requested, only some
//!   internally consistent state no older than the start of the build that
//!   produced it.
//! - Public surface is `SnapshotMap`, `SuspendingSnapshotMap` (feature
//!   `async`), and the read-only `Snapshot`; lower layers are
//!   implementation details.

mod core_map;
pub mod snapshot;
mod snapshot_map;
#[cfg(feature = "async")]
mod suspending_map;

// Public surface
pub use snapshot::Snapshot;
pub use snapshot_map::SnapshotMap;
#[cfg(feature = "async")]
pub use suspending_map::SuspendingSnapshotMap;
