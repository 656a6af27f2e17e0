//! Native codec: `[size: u32 LE][value: u32 LE]*size`.
//!
//! Random access is a direct little-endian read. This is also the layout merge
//! results are written in unless a caller asks for another codec.

use crate::index::error::{IndexError, IndexResult};
use crate::index::item_index::ItemIndex;
use crate::index::types::IndexType;
use crate::utils::{ByteReader, SharedBytes};
use std::iter::Map;
use std::slice::ChunksExact;

/// Iterator over the raw value region of a native index
pub type NativeIter<'a> = Map<ChunksExact<'a, u8>, fn(&[u8]) -> u32>;

#[inline]
fn le_u32(chunk: &[u8]) -> u32 {
    u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
}

#[derive(Clone, Debug)]
pub struct NativeIndex {
    values: SharedBytes,
    len: u32,
}

impl NativeIndex {
    pub fn parse(payload: &SharedBytes) -> IndexResult<Self> {
        let mut reader = ByteReader::new(payload);
        let len = reader.u32_le("native size")?;
        let value_bytes = (len as usize)
            .checked_mul(4)
            .ok_or_else(|| IndexError::corrupt(format!("native size {len} too large")))?;
        let start = reader.skip(value_bytes, "native values")?;
        Ok(Self {
            values: payload.slice(start, value_bytes)?,
            len,
        })
    }

    pub(crate) fn from_parts(values: SharedBytes, len: u32) -> Self {
        debug_assert_eq!(values.len(), len as usize * 4);
        Self { values, len }
    }

    pub fn encode(values: &[u32], out: &mut Vec<u8>) {
        out.reserve(4 + values.len() * 4);
        out.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for &value in values {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn payload_len(&self) -> usize {
        4 + self.values.len()
    }

    /// Value at `pos`; the caller guarantees `pos < len`
    #[inline]
    pub fn get(&self, pos: u32) -> u32 {
        let offset = pos as usize * 4;
        le_u32(&self.values[offset..offset + 4])
    }

    pub fn iter(&self) -> NativeIter<'_> {
        self.values.chunks_exact(4).map(le_u32 as fn(&[u8]) -> u32)
    }

    pub fn find(&self, value: u32) -> Option<u32> {
        super::search_sorted(self.len, value, |pos| self.get(pos))
    }
}

/// Streams ascending values straight into a tagged native buffer
pub struct NativeWriter {
    buf: Vec<u8>,
    count: u32,
    last: Option<u32>,
}

impl NativeWriter {
    pub fn with_capacity(values: usize) -> Self {
        let mut buf = Vec::with_capacity(5 + values * 4);
        buf.push(IndexType::Native.tag());
        buf.extend_from_slice(&0u32.to_le_bytes());
        Self {
            buf,
            count: 0,
            last: None,
        }
    }

    #[inline]
    pub fn push(&mut self, value: u32) {
        debug_assert!(self.last.is_none_or(|last| last < value));
        self.buf.extend_from_slice(&value.to_le_bytes());
        self.count += 1;
        self.last = Some(value);
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    /// Seal the buffer into a native item index
    pub fn finish(mut self) -> ItemIndex {
        self.buf[1..5].copy_from_slice(&self.count.to_le_bytes());
        ItemIndex::from_native_buffer(self.buf, self.count)
    }
}
