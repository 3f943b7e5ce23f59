//! Record framing.
//!
//! ```text
//! [op_index: i64][key_len: i32][value_len: i32][key][value][crc32: u32]
//! ```
//!
//! All integers are little-endian. The CRC covers every preceding field of
//! the record in order.

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use config::MAX_RECORD_FIELD_LEN;
use crc32fast::Hasher as Crc32;

use crate::WalError;

/// `op_index + key_len + value_len`.
pub(crate) const HEADER_LEN: usize = 16;
pub(crate) const CHECKSUM_LEN: usize = 4;

/// A framed record as read from the log, before the codecs see it.
pub(crate) struct RawRecord {
    pub(crate) op_index: i64,
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
    pub(crate) checksum: u32,
}

impl RawRecord {
    pub(crate) fn checksum_valid(&self) -> bool {
        checksum(self.op_index, &self.key, &self.value) == self.checksum
    }
}

/// Why a frame could not be read.
pub(crate) enum FrameError {
    /// No bytes left at a record boundary.
    End,
    /// The stream ended inside the record.
    Truncated,
    /// A length field is negative or above the cap.
    Malformed(String),
    Io(io::Error),
}

pub(crate) fn checksum(op_index: i64, key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(&op_index.to_le_bytes());
    hasher.update(&(key.len() as i32).to_le_bytes());
    hasher.update(&(value.len() as i32).to_le_bytes());
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

/// Frames one record into a single buffer so it can be written with one
/// `write_all`.
pub(crate) fn encode(op_index: i64, key: &[u8], value: &[u8]) -> Result<Vec<u8>, WalError> {
    for len in [key.len(), value.len()] {
        if len > MAX_RECORD_FIELD_LEN {
            return Err(WalError::RecordTooLarge {
                len,
                max: MAX_RECORD_FIELD_LEN,
            });
        }
    }

    let mut buf = Vec::with_capacity(HEADER_LEN + key.len() + value.len() + CHECKSUM_LEN);
    buf.write_i64::<LittleEndian>(op_index)?;
    buf.write_i32::<LittleEndian>(key.len() as i32)?;
    buf.write_i32::<LittleEndian>(value.len() as i32)?;
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf.write_u32::<LittleEndian>(checksum(op_index, key, value))?;
    Ok(buf)
}

/// Reads until `buf` is full or the stream ends. Returns the bytes read.
fn fill<R: Read>(rdr: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match rdr.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

fn field_len(raw: i32, name: &str) -> Result<usize, FrameError> {
    match usize::try_from(raw) {
        Ok(len) if len <= MAX_RECORD_FIELD_LEN => Ok(len),
        _ => Err(FrameError::Malformed(format!("{name} length {raw} out of range"))),
    }
}

pub(crate) fn read_frame<R: Read>(rdr: &mut R) -> Result<RawRecord, FrameError> {
    let mut header = [0u8; HEADER_LEN];
    match fill(rdr, &mut header).map_err(FrameError::Io)? {
        0 => return Err(FrameError::End),
        n if n < HEADER_LEN => return Err(FrameError::Truncated),
        _ => {}
    }
    let op_index = LittleEndian::read_i64(&header[0..8]);
    let key_len = field_len(LittleEndian::read_i32(&header[8..12]), "key")?;
    let value_len = field_len(LittleEndian::read_i32(&header[12..16]), "value")?;

    let mut body = vec![0u8; key_len + value_len + CHECKSUM_LEN];
    if fill(rdr, &mut body).map_err(FrameError::Io)? < body.len() {
        return Err(FrameError::Truncated);
    }
    let checksum = LittleEndian::read_u32(&body[key_len + value_len..]);
    body.truncate(key_len + value_len);
    let value = body.split_off(key_len);
    Ok(RawRecord {
        op_index,
        key: body,
        value,
        checksum,
    })
}
