//! Little-endian and variable-length integer encoding.
//!
//! Every codec reads its header through [`ByteReader`], which turns truncated
//! or malformed input into [`IndexError::CorruptData`] instead of panicking.

use crate::index::error::{IndexError, IndexResult};

/// Encode a u64 as a variable-length integer (LEB128)
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 64 || (shift == 63 && byte > 1) {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Number of bytes `encode_varint` emits for `value`
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Map a signed integer onto the unsigned range so small magnitudes stay small
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Read a u32 in little-endian format at `offset`
#[inline]
pub fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Read a u64 in little-endian format at `offset`
#[inline]
pub fn read_u64_le(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Forward-only cursor over a byte slice used to parse codec headers
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn u8(&mut self, what: &str) -> IndexResult<u8> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| IndexError::corrupt(format!("truncated {what}")))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn u32_le(&mut self, what: &str) -> IndexResult<u32> {
        let value = read_u32_le(self.buf, self.pos)
            .ok_or_else(|| IndexError::corrupt(format!("truncated {what}")))?;
        self.pos += 4;
        Ok(value)
    }

    pub fn u64_le(&mut self, what: &str) -> IndexResult<u64> {
        let value = read_u64_le(self.buf, self.pos)
            .ok_or_else(|| IndexError::corrupt(format!("truncated {what}")))?;
        self.pos += 8;
        Ok(value)
    }

    pub fn varint(&mut self, what: &str) -> IndexResult<u64> {
        let (value, consumed) = decode_varint(&self.buf[self.pos..])
            .ok_or_else(|| IndexError::corrupt(format!("invalid varint for {what}")))?;
        self.pos += consumed;
        Ok(value)
    }

    /// Varint that must fit in a u32
    pub fn varint_u32(&mut self, what: &str) -> IndexResult<u32> {
        let value = self.varint(what)?;
        u32::try_from(value)
            .map_err(|_| IndexError::corrupt(format!("{what} {value} exceeds u32 range")))
    }

    /// Skip `len` bytes, failing if fewer are available
    pub fn skip(&mut self, len: usize, what: &str) -> IndexResult<usize> {
        if len > self.remaining() {
            return Err(IndexError::corrupt(format!(
                "{what} needs {len} bytes, only {} available",
                self.remaining()
            )));
        }
        let start = self.pos;
        self.pos += len;
        Ok(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let values = [0, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX];
        for value in values {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert_eq!(buf.len(), varint_len(value));
            let (decoded, consumed) = decode_varint(&buf).unwrap();
            assert_eq!(value, decoded);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_varint_rejects_truncated_and_overlong() {
        assert!(decode_varint(&[0x80, 0x80]).is_none());
        assert!(decode_varint(&[0xFF; 11]).is_none());
    }

    #[test]
    fn test_zigzag() {
        for value in [0i64, -1, 1, -2, 2, i64::MIN, i64::MAX, -123_456] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
    }

    #[test]
    fn test_byte_reader_reports_truncation() {
        let mut reader = ByteReader::new(&[7, 1, 0]);
        assert_eq!(reader.u8("tag").unwrap(), 7);
        let err = reader.u32_le("size").unwrap_err();
        assert!(matches!(err, IndexError::CorruptData(_)));
        assert!(reader.skip(3, "payload").is_err());
        assert_eq!(reader.skip(2, "payload").unwrap(), 1);
        assert_eq!(reader.remaining(), 0);
    }
}
