use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::codec::Serializer;
use crate::record::{read_frame, FrameError};
use crate::{RecordFailure, WalError};

/// How tolerant a recovery scan is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Halt at the first I/O error instead of trying the next record.
    pub stop_on_io_error: bool,
    /// Halt at the first checksum or decode failure. The failing record is
    /// not included in the output.
    pub stop_on_checksum_failure: bool,
    /// Stable-sort the recovered entries by op index.
    pub sort_by_op_index: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            stop_on_io_error: true,
            stop_on_checksum_failure: false,
            sort_by_op_index: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredEntry<K, V> {
    /// Position of the record in the log, counting from zero.
    pub ordinal: usize,
    pub op_index: i64,
    pub key: K,
    pub value: V,
    /// `false` when the stored checksum did not match. Such entries also
    /// appear in [`RecoveryReport::failures`] under the same ordinal.
    pub checksum_valid: bool,
}

/// Everything a recovery scan found.
///
/// Entries whose checksum failed are still returned (flagged); callers
/// decide whether to trust them by cross-referencing `failures`.
#[derive(Debug)]
pub struct RecoveryReport<K, V> {
    pub entries: Vec<RecoveredEntry<K, V>>,
    /// Largest op index among entries with a valid checksum.
    pub max_op_index: Option<i64>,
    /// `true` when `failures` is empty.
    pub success: bool,
    pub failures: BTreeMap<usize, RecordFailure>,
}

impl<K, V> RecoveryReport<K, V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_op_index: None,
            success: true,
            failures: BTreeMap::new(),
        }
    }

    fn fail(&mut self, failure: RecordFailure) {
        self.success = false;
        self.failures.entry(failure.ordinal()).or_insert(failure);
    }

    /// Keys of every recovered entry, in output order. Includes entries
    /// whose checksum failed; see [`valid_entries`](Self::valid_entries).
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Values of every recovered entry, in the same order as [`keys`](Self::keys).
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|e| &e.value)
    }

    /// Entries whose checksum matched.
    pub fn valid_entries(&self) -> impl Iterator<Item = &RecoveredEntry<K, V>> {
        self.entries.iter().filter(|e| e.checksum_valid)
    }

    /// Byte offset of a torn trailing record, if the scan found one.
    pub fn incomplete_tail_position(&self) -> Option<u64> {
        self.failures.values().find_map(|f| match f {
            RecordFailure::IncompleteTail { position, .. } => Some(*position),
            _ => None,
        })
    }
}

/// Sequential log reader.
///
/// Generic over any `Read + Seek` so it can scan files, in-memory buffers or
/// a live sink borrowed from a writer.
pub struct WalReader<R: Read + Seek> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing log file for recovery.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read + Seek> WalReader<R> {
    /// Wraps any seekable byte stream, such as an in-memory buffer. The scan
    /// starts from offset zero regardless of the stream's position.
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Scans every record from the start of the stream.
    ///
    /// Per-record problems never fail the call; they are collected in the
    /// report keyed by ordinal. Only seeking the stream itself can fail.
    /// The stream is left at its end on return.
    pub fn read_entries<K, V>(
        &mut self,
        options: &ReadOptions,
        key_codec: &dyn Serializer<K>,
        value_codec: &dyn Serializer<V>,
    ) -> Result<RecoveryReport<K, V>, WalError> {
        let log_length = self.rdr.seek(SeekFrom::End(0))?;
        self.rdr.seek(SeekFrom::Start(0))?;

        let mut report = RecoveryReport::new();
        let mut ordinal = 0;
        loop {
            let position = self.rdr.stream_position()?;
            let raw = match read_frame(&mut self.rdr) {
                Ok(raw) => raw,
                Err(FrameError::End) => break,
                Err(FrameError::Truncated) => {
                    report.fail(RecordFailure::IncompleteTail {
                        ordinal,
                        position,
                        log_length,
                    });
                    break;
                }
                Err(FrameError::Malformed(detail)) => {
                    report.fail(RecordFailure::Malformed {
                        ordinal,
                        position,
                        detail,
                    });
                    break;
                }
                Err(FrameError::Io(source)) => {
                    report.fail(RecordFailure::Io { ordinal, source });
                    if options.stop_on_io_error || self.rdr.stream_position()? == position {
                        break;
                    }
                    ordinal += 1;
                    continue;
                }
            };

            let checksum_valid = raw.checksum_valid();
            if !checksum_valid {
                report.fail(RecordFailure::Checksum { ordinal });
                if options.stop_on_checksum_failure {
                    break;
                }
            }

            let decoded = key_codec
                .deserialize(&raw.key)
                .and_then(|key| Ok((key, value_codec.deserialize(&raw.value)?)));
            match decoded {
                Ok((key, value)) => {
                    if checksum_valid {
                        report.max_op_index = report.max_op_index.max(Some(raw.op_index));
                    }
                    report.entries.push(RecoveredEntry {
                        ordinal,
                        op_index: raw.op_index,
                        key,
                        value,
                        checksum_valid,
                    });
                }
                Err(source) => {
                    report.fail(RecordFailure::Decode { ordinal, source });
                    if options.stop_on_checksum_failure {
                        break;
                    }
                }
            }
            ordinal += 1;
        }
        self.rdr.seek(SeekFrom::End(0))?;

        if options.sort_by_op_index {
            report.entries.sort_by_key(|e| e.op_index);
        }
        tracing::debug!(
            entries = report.entries.len(),
            failures = report.failures.len(),
            max_op_index = ?report.max_op_index,
            "log scan finished"
        );
        Ok(report)
    }
}
