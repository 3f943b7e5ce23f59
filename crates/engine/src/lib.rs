//! # Engine - Shoal mutable segment
//!
//! Ties the [`index`] and [`wal`] crates together into a [`Segment`]: a
//! concurrent in-memory B-tree whose every mutation is first made durable in
//! a write-ahead log.
//!
//! ## Architecture
//!
//! ```text
//! Client threads
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   SEGMENT                     │
//! │                                               │
//! │ write.rs → (leaf latch) → op index → WAL      │
//! │                           append → B-tree     │
//! │                                               │
//! │ read.rs  → B-tree get / cursor (no log I/O)   │
//! │                                               │
//! │ compaction.rs → snapshot B-tree → WAL replace │
//! │                                               │
//! │ recovery.rs → WAL scan → truncate torn tail   │
//! │               → replay by op index            │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module           | Purpose                                            |
//! |------------------|----------------------------------------------------|
//! | [`lib.rs`]       | `Segment` struct, accessors, `Debug`, `Drop`       |
//! | [`recovery`]     | `open()`: log scan, tail truncation, replay        |
//! | [`write`]        | `upsert()`, `freeze()`                             |
//! | [`read`]         | `get()`, `cursor()`, `iter()`                      |
//! | [`compaction`]   | `compact()`: rewrite the log from the index        |
//!
//! ## Crash Safety
//!
//! A mutation is appended to the log before the index changes, and both
//! happen under the latch of the leaf that owns the key, so for any single
//! key the log order matches the order the index saw. Recovery replays in
//! op-index order and cuts off a record torn by a crash.
mod compaction;
mod read;
mod recovery;
mod write;

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use index::BTree;
use parking_lot::RwLock;
use wal::WriteAheadLog;

/// A mutable, durable, ordered segment.
///
/// Any number of threads may [`upsert`](Segment::upsert) and read at once.
/// [`compact`](Segment::compact) and [`freeze`](Segment::freeze) wait for
/// in-flight writes and block new ones while they run.
pub struct Segment<K, V, C> {
    pub(crate) tree: BTree<K, V, C>,
    pub(crate) wal: WriteAheadLog<K, V>,
    /// Op index handed to the next mutation.
    pub(crate) next_op: AtomicI64,
    /// Writers hold it shared; log rewrites hold it exclusively.
    pub(crate) gate: RwLock<()>,
}

impl<K, V, C> std::fmt::Debug for Segment<K, V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("path", &self.wal.path())
            .field("entries", &self.tree.len())
            .field("next_op", &self.next_op.load(Ordering::Acquire))
            .field("frozen", &self.wal.is_frozen())
            .field("incremental_backup", &self.wal.incremental_backup())
            .finish()
    }
}

impl<K, V, C> Segment<K, V, C> {
    /// Op index the next mutation will be logged under.
    #[must_use]
    pub fn next_op_index(&self) -> i64 {
        self.next_op.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        self.wal.path()
    }

    pub fn is_frozen(&self) -> bool {
        self.wal.is_frozen()
    }

    /// Toggles the `.full` backup taken before each [`compact`](Segment::compact).
    pub fn set_incremental_backup(&self, enabled: bool) {
        self.wal.set_incremental_backup(enabled);
    }

    /// Deletes the segment's log. The in-memory index is dropped with `self`.
    pub fn destroy(self) -> anyhow::Result<()> {
        self.wal.destroy()?;
        tracing::info!(path = %self.wal.path().display(), "segment destroyed");
        Ok(())
    }
}

/// Best-effort sync on drop.
///
/// Errors are ignored because Drop cannot propagate them; with `wal_sync`
/// enabled every acknowledged write is already durable.
impl<K, V, C> Drop for Segment<K, V, C> {
    fn drop(&mut self) {
        if !self.wal.is_frozen() {
            let _ = self.wal.sync();
        }
    }
}

#[cfg(test)]
mod tests;
