//! Key/value serializers.
//!
//! A log is generic over its key and value types; the bytes that land on
//! disk come from a [`Serializer`] injected per type. Serializers must
//! round-trip exactly, otherwise checksums computed at append time will not
//! match on recovery.

use byteorder::{ByteOrder, LittleEndian};

use crate::CodecError;

/// Converts one key or value type to and from its on-disk bytes.
///
/// `serialize` cannot fail; anything a log accepts must be encodable.
/// `deserialize` runs on recovery and reports bytes it cannot decode, which
/// the reader records as a per-record decode failure.
pub trait Serializer<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Vec<u8>;
    fn deserialize(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Raw bytes, stored as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

/// UTF-8 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

/// Fixed-width little-endian `i32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct I32Codec;

/// Fixed-width little-endian `i64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

/// Fixed-width little-endian `u64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct U64Codec;

impl Serializer<Vec<u8>> for BytesCodec {
    fn serialize(&self, value: &Vec<u8>) -> Vec<u8> {
        value.clone()
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

impl Serializer<String> for StringCodec {
    fn serialize(&self, value: &String) -> Vec<u8> {
        value.as_bytes().to_vec()
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<String, CodecError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

fn expect_width(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() != expected {
        return Err(CodecError::Width {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

impl Serializer<i32> for I32Codec {
    fn serialize(&self, value: &i32) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        LittleEndian::write_i32(&mut buf, *value);
        buf
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<i32, CodecError> {
        expect_width(bytes, 4)?;
        Ok(LittleEndian::read_i32(bytes))
    }
}

impl Serializer<i64> for I64Codec {
    fn serialize(&self, value: &i64) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        LittleEndian::write_i64(&mut buf, *value);
        buf
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<i64, CodecError> {
        expect_width(bytes, 8)?;
        Ok(LittleEndian::read_i64(bytes))
    }
}

impl Serializer<u64> for U64Codec {
    fn serialize(&self, value: &u64) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        LittleEndian::write_u64(&mut buf, *value);
        buf
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<u64, CodecError> {
        expect_width(bytes, 8)?;
        Ok(LittleEndian::read_u64(bytes))
    }
}
