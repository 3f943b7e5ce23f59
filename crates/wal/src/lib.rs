//! # WAL - Write-Ahead Log
//!
//! Durability for a Shoal segment. Every mutation is framed into a binary
//! record and appended to the log before the in-memory index sees it; on
//! restart the log is scanned to rebuild the index.
//!
//! ## Binary Record Format
//!
//! ```text
//! [op_index: i64 LE][key_len: i32 LE][value_len: i32 LE][key][value][crc32: u32 LE]
//! ```
//!
//! The CRC covers the op index, both lengths, the key and the value, in that
//! order. Keys and values are turned into bytes by an injected
//! [`Serializer`].
//!
//! ## Recovery
//!
//! [`WalReader::read_entries`] never aborts on a bad record. Each problem is
//! filed in the [`RecoveryReport`] under the record's ordinal, and a record
//! cut short by a crash is reported as [`RecordFailure::IncompleteTail`]
//! with the byte offset to truncate back to.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wal::{I64Codec, ReadOptions, Serializer, StringCodec, WriteAheadLog};
//!
//! let keys: Arc<dyn Serializer<String>> = Arc::new(StringCodec);
//! let values: Arc<dyn Serializer<i64>> = Arc::new(I64Codec);
//! let log = WriteAheadLog::open("wal.log", keys, values, true).unwrap();
//! log.append(&"hello".to_string(), &42, 0).unwrap();
//!
//! let report = log.read_entries(&ReadOptions::default()).unwrap();
//! assert!(report.success);
//! ```

mod codec;
mod reader;
mod record;
mod sink;
mod writer;

pub use codec::{BytesCodec, I32Codec, I64Codec, Serializer, StringCodec, U64Codec};
pub use reader::{ReadOptions, RecoveredEntry, RecoveryReport, WalReader};
pub use sink::{FileSink, LogSink, MemorySink};
pub use writer::WriteAheadLog;

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors from log operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The log was released by `mark_frozen` and can no longer be used.
    #[error("log is frozen")]
    Frozen,

    #[error("record field of {len} bytes exceeds the {max} byte limit")]
    RecordTooLarge { len: usize, max: usize },

    #[error("replace got {keys} keys but {values} values")]
    LengthMismatch { keys: usize, values: usize },
}

/// A serializer rejected stored bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} bytes, found {actual}")]
    Width { expected: usize, actual: usize },

    #[error("invalid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Why one record could not be recovered.
#[derive(Debug, Error)]
pub enum RecordFailure {
    /// The log ends inside this record, usually a write cut off by a crash.
    #[error("record {ordinal} at byte {position} is incomplete (log is {log_length} bytes)")]
    IncompleteTail {
        ordinal: usize,
        position: u64,
        log_length: u64,
    },

    #[error("record {ordinal}: io error: {source}")]
    Io {
        ordinal: usize,
        #[source]
        source: io::Error,
    },

    /// A length field is unusable, so the rest of the log cannot be framed.
    #[error("record {ordinal} at byte {position} is malformed: {detail}")]
    Malformed {
        ordinal: usize,
        position: u64,
        detail: String,
    },

    #[error("record {ordinal}: checksum mismatch")]
    Checksum { ordinal: usize },

    #[error("record {ordinal}: {source}")]
    Decode {
        ordinal: usize,
        #[source]
        source: CodecError,
    },
}

impl RecordFailure {
    pub fn ordinal(&self) -> usize {
        match self {
            RecordFailure::IncompleteTail { ordinal, .. }
            | RecordFailure::Io { ordinal, .. }
            | RecordFailure::Malformed { ordinal, .. }
            | RecordFailure::Checksum { ordinal }
            | RecordFailure::Decode { ordinal, .. } => *ordinal,
        }
    }
}
