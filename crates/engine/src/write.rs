/// Write path: `upsert()` and `freeze()`.
///
/// A mutation takes its op index and is appended to the log while the
/// owning leaf is latched, then lands in the B-tree before the latch drops.
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use index::{AddOrUpdateResult, Comparer};

use crate::Segment;

impl<K, V, C> Segment<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    /// Inserts or overwrites `key`, logging it first.
    ///
    /// # Errors
    ///
    /// Fails if the log append fails (the index is left untouched) or the
    /// segment is frozen.
    pub fn upsert(&self, key: K, value: V) -> Result<AddOrUpdateResult> {
        let _gate = self.gate.read();
        let logged_key = key.clone();
        self.tree
            .compute(key, |slot| {
                let op_index = self.next_op.fetch_add(1, Ordering::AcqRel);
                if let Err(e) = self.wal.append(&logged_key, &value, op_index) {
                    return (None, Err(e));
                }
                match slot {
                    Some(existing) => {
                        *existing = value;
                        (None, Ok(AddOrUpdateResult::Updated))
                    }
                    None => (Some(value), Ok(AddOrUpdateResult::Added)),
                }
            })
            .context("failed to append to segment log")
    }

    /// Makes the segment read-only and releases its log.
    ///
    /// The log is flushed on a background thread; join the returned handle
    /// to wait for it. Returns `None` if the segment was already frozen.
    pub fn freeze(&self) -> Option<JoinHandle<()>> {
        let _gate = self.gate.write();
        let handle = self.wal.mark_frozen();
        if handle.is_some() {
            tracing::info!(
                path = %self.wal.path().display(),
                keys = self.tree.len(),
                "segment frozen"
            );
        }
        handle
    }
}
