//! Durable byte sinks a log writes through.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// An append-capable, truncatable, seekable byte stream owned by exactly one
/// [`crate::WriteAheadLog`].
pub trait LogSink: Read + Write + Seek + Send + 'static {
    /// Total bytes in the log, independent of the current position.
    fn len(&mut self) -> io::Result<u64>;

    /// Truncates or zero-extends the log to `len` bytes.
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Every byte of the log, including anything buffered but not yet
    /// written through. Must not move the write position.
    fn content_including_tail(&mut self) -> io::Result<Vec<u8>>;

    /// Pushes any buffered tail down to the underlying stream.
    fn flush_tail(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// Makes everything written so far durable.
    fn sync(&mut self) -> io::Result<()>;

    /// True if the sink is the file at the log's path, so destroying the
    /// log should delete it.
    const FILE_BACKED: bool = false;
}

/// A plain file.
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Opens (or creates) the log file, positioned at its end.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self { file })
    }
}

impl Read for FileSink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl LogSink for FileSink {
    const FILE_BACKED: bool = true;

    fn len(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    fn content_including_tail(&mut self) -> io::Result<Vec<u8>> {
        let pos = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(0))?;
        let mut content = Vec::new();
        let read = self.file.read_to_end(&mut content);
        self.file.seek(SeekFrom::Start(pos))?;
        read?;
        Ok(content)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}

/// An in-memory log, for tests and for logs that never need to survive the
/// process.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Cursor<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink pre-loaded with `bytes`, positioned at the start.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buf: Cursor::new(bytes),
        }
    }

    /// Everything written so far.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.get_ref()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf.into_inner()
    }
}

impl Read for MemorySink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buf.read(buf)
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemorySink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl LogSink for MemorySink {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.buf.get_ref().len() as u64)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len =
            usize::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.buf.get_mut().resize(len, 0);
        Ok(())
    }

    fn content_including_tail(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.buf.get_ref().clone())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
