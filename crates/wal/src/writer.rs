use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::codec::Serializer;
use crate::reader::{ReadOptions, RecoveryReport, WalReader};
use crate::record;
use crate::sink::{FileSink, LogSink};
use crate::WalError;

/// `<path><suffix>`, e.g. `wal.log.full`.
fn side_file(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// The write side of one log.
///
/// Appends from any number of threads are serialized on the sink lock, so
/// each record lands as one contiguous run of bytes. Op indices are chosen
/// by the caller and may reach the log out of order.
pub struct WriteAheadLog<K, V, S: LogSink = FileSink> {
    path: PathBuf,
    /// `None` once the log has been frozen.
    sink: Mutex<Option<S>>,
    key_codec: Arc<dyn Serializer<K>>,
    value_codec: Arc<dyn Serializer<V>>,
    sync: bool,
    incremental_backup: AtomicBool,
}

impl<K, V> WriteAheadLog<K, V, FileSink> {
    /// Opens (or creates) a file-backed log.
    ///
    /// * `sync` - if true, every append is followed by an fsync.
    pub fn open<P: AsRef<Path>>(
        path: P,
        key_codec: Arc<dyn Serializer<K>>,
        value_codec: Arc<dyn Serializer<V>>,
        sync: bool,
    ) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let sink = FileSink::open(&path)?;
        Ok(Self::with_sink(path, sink, key_codec, value_codec, sync))
    }
}

impl<K, V, S: LogSink> WriteAheadLog<K, V, S> {
    /// Wraps an existing sink. `path` names the log for side files (`.full`
    /// backups, `.tail`) even when the sink itself is not a file.
    pub fn with_sink<P: AsRef<Path>>(
        path: P,
        sink: S,
        key_codec: Arc<dyn Serializer<K>>,
        value_codec: Arc<dyn Serializer<V>>,
        sync: bool,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sink: Mutex::new(Some(sink)),
            key_codec,
            value_codec,
            sync,
            incremental_backup: AtomicBool::new(false),
        }
    }

    /// The name this log was opened under.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`replace`](Self::replace) appends old content when
    /// incremental backup is on: `<path>.full`.
    pub fn backup_path(&self) -> PathBuf {
        side_file(&self.path, ".full")
    }

    /// `<path>.tail`, removed by [`destroy`](Self::destroy).
    pub fn tail_path(&self) -> PathBuf {
        side_file(&self.path, ".tail")
    }

    /// True once [`mark_frozen`](Self::mark_frozen) or
    /// [`destroy`](Self::destroy) has released the sink.
    pub fn is_frozen(&self) -> bool {
        self.sink.lock().is_none()
    }

    pub fn incremental_backup(&self) -> bool {
        self.incremental_backup.load(Ordering::Acquire)
    }

    /// When enabled, [`replace`](Self::replace) first appends the old log
    /// content to the `.full` backup file.
    pub fn set_incremental_backup(&self, enabled: bool) {
        self.incremental_backup.store(enabled, Ordering::Release);
    }

    /// Current length of the log in bytes.
    pub fn len(&self) -> Result<u64, WalError> {
        let mut guard = self.sink.lock();
        let sink = guard.as_mut().ok_or(WalError::Frozen)?;
        Ok(sink.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, WalError> {
        Ok(self.len()? == 0)
    }

    /// Serializes and appends one record.
    ///
    /// A failed append leaves no bytes behind: the log is cut back to where
    /// the record would have started, so later appends never follow a torn
    /// frame.
    pub fn append(&self, key: &K, value: &V, op_index: i64) -> Result<(), WalError> {
        let frame = record::encode(
            op_index,
            &self.key_codec.serialize(key),
            &self.value_codec.serialize(value),
        )?;

        let mut guard = self.sink.lock();
        let sink = guard.as_mut().ok_or(WalError::Frozen)?;
        let start = sink.seek(SeekFrom::End(0))?;
        let written = sink.write_all(&frame).and_then(|()| sink.flush()).and_then(|()| {
            if self.sync {
                sink.sync()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            let rolled_back = sink
                .set_len(start)
                .and_then(|()| sink.seek(SeekFrom::Start(start)));
            if let Err(rollback) = rolled_back {
                tracing::warn!(
                    path = %self.path.display(),
                    start,
                    error = %rollback,
                    "could not roll back failed append"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Rewrites the log to hold exactly `keys[i] -> values[i]` with op
    /// indices `0..n`. Returns the change in length (negative if the log
    /// shrank).
    ///
    /// Not crash-atomic: a crash between truncation and the last write
    /// leaves a short log, which recovery reports as an incomplete tail.
    pub fn replace(
        &self,
        keys: &[K],
        values: &[V],
        disable_backup: bool,
    ) -> Result<i64, WalError> {
        if keys.len() != values.len() {
            return Err(WalError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let mut frames = Vec::new();
        for (op_index, (key, value)) in keys.iter().zip(values).enumerate() {
            frames.extend(record::encode(
                op_index as i64,
                &self.key_codec.serialize(key),
                &self.value_codec.serialize(value),
            )?);
        }

        let mut guard = self.sink.lock();
        let sink = guard.as_mut().ok_or(WalError::Frozen)?;
        let old_len = sink.len()?;

        if self.incremental_backup() && !disable_backup {
            let content = sink.content_including_tail()?;
            let backup = self.backup_path();
            let mut file = OpenOptions::new().create(true).append(true).open(&backup)?;
            file.write_all(&content)?;
            file.sync_all()?;
            tracing::info!(path = %backup.display(), bytes = content.len(), "appended log backup");
        }

        sink.set_len(0)?;
        sink.seek(SeekFrom::Start(0))?;
        sink.write_all(&frames)?;
        sink.flush()?;
        if self.sync {
            sink.sync()?;
        }
        let new_len = sink.len()?;

        let delta = new_len as i64 - old_len as i64;
        tracing::debug!(
            path = %self.path.display(),
            records = keys.len(),
            old_len,
            new_len,
            delta,
            "replaced log"
        );
        Ok(delta)
    }

    /// Cuts the log back to `position`, dropping a torn trailing record.
    pub fn truncate_incomplete_tail(&self, position: u64) -> Result<(), WalError> {
        let mut guard = self.sink.lock();
        let sink = guard.as_mut().ok_or(WalError::Frozen)?;
        let len = sink.len()?;
        sink.set_len(position)?;
        sink.seek(SeekFrom::End(0))?;
        if self.sync {
            sink.sync()?;
        }
        tracing::warn!(
            path = %self.path.display(),
            position,
            dropped = len.saturating_sub(position),
            "truncated incomplete tail record"
        );
        Ok(())
    }

    /// Recovers every record currently in the log.
    pub fn read_entries(&self, options: &ReadOptions) -> Result<RecoveryReport<K, V>, WalError> {
        let mut guard = self.sink.lock();
        let sink = guard.as_mut().ok_or(WalError::Frozen)?;
        WalReader::from_reader(sink).read_entries(options, &*self.key_codec, &*self.value_codec)
    }

    /// Forces everything appended so far to durable storage.
    pub fn sync(&self) -> Result<(), WalError> {
        let mut guard = self.sink.lock();
        let sink = guard.as_mut().ok_or(WalError::Frozen)?;
        sink.flush_tail()?;
        sink.sync()?;
        Ok(())
    }

    /// Releases the sink. Buffered content is flushed and synced on a
    /// background thread; the returned handle joins it. Every later call
    /// that needs the sink fails with [`WalError::Frozen`].
    ///
    /// Returns `None` if the log was already frozen.
    pub fn mark_frozen(&self) -> Option<JoinHandle<()>> {
        let mut sink = self.sink.lock().take()?;
        let path = self.path.clone();
        Some(thread::spawn(move || {
            let flushed = sink.flush_tail().and_then(|()| sink.sync());
            match flushed {
                Ok(()) => tracing::debug!(path = %path.display(), "frozen log released"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "flushing frozen log failed")
                }
            }
        }))
    }

    /// Releases the sink and deletes the log and its `.tail` side file.
    /// The `.full` backup is kept. The log behaves as frozen afterwards.
    ///
    /// Files are only removed when the sink is backed by `path`; destroying
    /// an in-memory log never touches the filesystem.
    pub fn destroy(&self) -> Result<(), WalError> {
        drop(self.sink.lock().take());
        if S::FILE_BACKED {
            remove_if_exists(&self.path)?;
            remove_if_exists(&self.tail_path())?;
        }
        Ok(())
    }
}
