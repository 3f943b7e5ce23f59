/// Cold-start path: scan the log, cut off a torn tail, and replay the
/// surviving records into a fresh B-tree.
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::EngineConfig;
use index::{BTree, Comparer};
use parking_lot::RwLock;
use wal::{ReadOptions, RecordFailure, Serializer, WriteAheadLog};

use crate::Segment;

impl<K, V, C> Segment<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
{
    /// Opens (or creates) the segment logged at `path`.
    ///
    /// # Recovery Steps
    ///
    /// 1. Scan every record, sorted by op index.
    /// 2. Refuse to open if any record other than a torn tail failed, unless
    ///    `tolerate_corrupt_records` is set. In that case the failed records
    ///    are dropped and the log is rewritten from what survived. A refused
    ///    open leaves the log untouched.
    /// 3. Truncate a record torn by a crash so appends resume cleanly.
    /// 4. Replay the valid records into the B-tree; a later op index wins.
    /// 5. Continue numbering after the largest recovered op index.
    pub fn open<P: AsRef<Path>>(
        path: P,
        config: &EngineConfig,
        comparer: C,
        key_codec: Arc<dyn Serializer<K>>,
        value_codec: Arc<dyn Serializer<V>>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let wal = WriteAheadLog::open(path, key_codec, value_codec, config.wal_sync)
            .with_context(|| format!("failed to open log {}", path.display()))?;
        wal.set_incremental_backup(config.incremental_backup);

        let options = ReadOptions {
            stop_on_io_error: config.stop_on_io_error,
            stop_on_checksum_failure: config.stop_on_checksum_failure,
            sort_by_op_index: true,
        };
        let report = wal
            .read_entries(&options)
            .with_context(|| format!("failed to scan log {}", path.display()))?;

        let corrupt: Vec<&RecordFailure> = report
            .failures
            .values()
            .filter(|f| !matches!(f, RecordFailure::IncompleteTail { .. }))
            .collect();
        if let Some(first) = corrupt.first() {
            anyhow::ensure!(
                config.tolerate_corrupt_records,
                "log {} has {} corrupt records; first: {}",
                path.display(),
                corrupt.len(),
                first
            );
            tracing::warn!(
                path = %path.display(),
                corrupt = corrupt.len(),
                first = %first,
                "dropping corrupt log records"
            );
        }
        let rewrite = !corrupt.is_empty();

        // Only cut the torn tail once the open is known to go ahead.
        if let Some(position) = report.incomplete_tail_position() {
            wal.truncate_incomplete_tail(position)?;
        }

        let tree = BTree::with_capacity(comparer, config.leaf_capacity, config.interior_capacity);
        let mut replayed = 0usize;
        for entry in report.entries.into_iter().filter(|e| e.checksum_valid) {
            tree.insert_or_replace(entry.key, entry.value);
            replayed += 1;
        }
        let next_op = report.max_op_index.map_or(0, |max| max + 1);

        let segment = Self {
            tree,
            wal,
            next_op: AtomicI64::new(next_op),
            gate: RwLock::new(()),
        };
        if rewrite {
            segment
                .compact()
                .context("failed to rewrite log after dropping corrupt records")?;
        }

        tracing::info!(
            path = %path.display(),
            records = replayed,
            keys = segment.tree.len(),
            next_op = segment.next_op_index(),
            "segment recovered"
        );
        Ok(segment)
    }
}
