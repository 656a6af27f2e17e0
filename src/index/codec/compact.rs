//! Bounded compact uint array: `[size: varint][bits: u8][packed values]`.
//!
//! Values are stored as-is at the width of the largest one. The packed region
//! holds exactly `ceil(size*bits/8)` bytes.

use crate::index::error::{IndexError, IndexResult};
use crate::utils::{ByteReader, SharedBytes, bits_needed, encode_varint, pack_into, packed_len, unpack_at};

/// Fixed-width bit-packed array over shared bytes
#[derive(Clone, Debug)]
pub struct PackedArray {
    data: SharedBytes,
    bits: u8,
    len: usize,
}

impl PackedArray {
    /// View `len` elements of width `bits` starting at `offset` in `region`
    pub fn parse(region: &SharedBytes, offset: usize, bits: u8, len: usize) -> IndexResult<Self> {
        if bits > 64 {
            return Err(IndexError::corrupt(format!("bit width {bits} exceeds 64")));
        }
        let data = region.slice(offset, packed_len(len, bits))?;
        Ok(Self { data, bits, len })
    }

    pub fn write<I>(values: I, bits: u8, out: &mut Vec<u8>)
    where
        I: IntoIterator<Item = u64>,
    {
        pack_into(values, bits, out);
    }

    #[inline]
    pub fn get(&self, pos: usize) -> u64 {
        debug_assert!(pos < self.len);
        unpack_at(&self.data, self.bits, pos)
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

#[derive(Clone, Debug)]
pub struct CompactIndex {
    packed: PackedArray,
    len: u32,
    payload_len: usize,
}

impl CompactIndex {
    pub fn parse(payload: &SharedBytes) -> IndexResult<Self> {
        let mut reader = ByteReader::new(payload);
        let len = reader.varint_u32("compact size")?;
        let bits = reader.u8("compact bit width")?;
        if !(1..=32).contains(&bits) {
            return Err(IndexError::corrupt(format!("compact bit width {bits}")));
        }
        let offset = reader.skip(packed_len(len as usize, bits), "compact values")?;
        let packed = PackedArray::parse(payload, offset, bits, len as usize)?;
        Ok(Self {
            packed,
            len,
            payload_len: reader.position(),
        })
    }

    pub fn encode(values: &[u32], out: &mut Vec<u8>) {
        let bits = bits_needed(values.last().copied().unwrap_or(0) as u64);
        encode_varint(values.len() as u64, out);
        out.push(bits);
        PackedArray::write(values.iter().map(|&v| v as u64), bits, out);
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn bits(&self) -> u8 {
        self.packed.bits()
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    #[inline]
    pub fn get(&self, pos: u32) -> u32 {
        self.packed.get(pos as usize) as u32
    }

    pub fn iter(&self) -> CompactIter<'_> {
        CompactIter {
            index: self,
            pos: 0,
        }
    }

    pub fn find(&self, value: u32) -> Option<u32> {
        super::search_sorted(self.len, value, |pos| self.get(pos))
    }
}

#[derive(Clone, Debug)]
pub struct CompactIter<'a> {
    index: &'a CompactIndex,
    pos: u32,
}

impl Iterator for CompactIter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.pos >= self.index.len {
            return None;
        }
        let value = self.index.get(self.pos);
        self.pos += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.index.len - self.pos) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for CompactIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(values: &[u32]) -> CompactIndex {
        let mut out = Vec::new();
        CompactIndex::encode(values, &mut out);
        CompactIndex::parse(&SharedBytes::from_vec(out)).unwrap()
    }

    #[test]
    fn test_width_follows_maximum() {
        let index = encoded(&[1, 2, 3, 7]);
        assert_eq!(index.bits(), 3);
        assert_eq!(index.payload_len(), 1 + 1 + 2);
        assert_eq!(index.iter().collect::<Vec<_>>(), vec![1, 2, 3, 7]);

        let wide = encoded(&[0, u32::MAX]);
        assert_eq!(wide.bits(), 32);
        assert_eq!(wide.get(1), u32::MAX);
    }

    #[test]
    fn test_empty() {
        let index = encoded(&[]);
        assert_eq!(index.len(), 0);
        assert_eq!(index.iter().next(), None);
        assert_eq!(index.find(0), None);
    }

    #[test]
    fn test_find() {
        let index = encoded(&[5, 10, 400, 9000]);
        assert_eq!(index.find(400), Some(2));
        assert_eq!(index.find(401), None);
    }

    #[test]
    fn test_rejects_bad_width_and_truncation() {
        let bad_width = SharedBytes::from_vec(vec![1, 33, 0, 0, 0, 0, 0]);
        assert!(CompactIndex::parse(&bad_width).is_err());

        let truncated = SharedBytes::from_vec(vec![4, 8, 1, 2]);
        assert!(matches!(
            CompactIndex::parse(&truncated),
            Err(IndexError::CorruptData(_))
        ));
    }
}
