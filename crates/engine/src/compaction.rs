/// Compaction: rewrites the log so it holds exactly one record per live key.
///
/// Every upsert appends, so a hot key accumulates records. Compaction
/// replaces the log with a snapshot of the index, numbered `0..n`.
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use index::Comparer;

use crate::Segment;

impl<K, V, C> Segment<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    /// Replaces the log with the current contents of the index. Returns the
    /// change in log length (negative when it shrank).
    ///
    /// Writers are blocked for the duration. With incremental backup on, the
    /// old log is first appended to `<path>.full`.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if the segment is frozen. A crash
    /// midway leaves a short log that the next [`open`](Segment::open)
    /// truncates at the torn record.
    pub fn compact(&self) -> Result<i64> {
        let _gate = self.gate.write();
        let (keys, values): (Vec<K>, Vec<V>) = self.tree.iter().unzip();
        let delta = self
            .wal
            .replace(&keys, &values, false)
            .with_context(|| format!("failed to compact log {}", self.wal.path().display()))?;
        self.next_op.store(keys.len() as i64, Ordering::Release);

        tracing::info!(
            path = %self.wal.path().display(),
            keys = keys.len(),
            delta,
            "segment log compacted"
        );
        Ok(delta)
    }
}
