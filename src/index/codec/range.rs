//! Range generator codec: `[begin: varint][end: varint][stride: varint]`.
//!
//! The set `{begin, begin+stride, ...}` below the exclusive `end`. Nothing is
//! stored per element.

use crate::index::error::{IndexError, IndexResult};
use crate::utils::{ByteReader, encode_varint, varint_len};

const END_LIMIT: u64 = 1 << 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeIndex {
    begin: u32,
    end: u64,
    stride: u32,
    len: u32,
}

impl RangeIndex {
    pub fn new(begin: u32, end: u64, stride: u32) -> IndexResult<Self> {
        if stride == 0 {
            return Err(IndexError::corrupt("range stride is zero"));
        }
        if end > END_LIMIT {
            return Err(IndexError::corrupt(format!("range end {end} exceeds u32 domain")));
        }
        if end < begin as u64 {
            return Err(IndexError::corrupt(format!(
                "range end {end} below begin {begin}"
            )));
        }
        let len = (end - begin as u64).div_ceil(stride as u64);
        let len = u32::try_from(len)
            .map_err(|_| IndexError::Overflow(format!("range holds {len} elements")))?;
        Ok(Self {
            begin,
            end,
            stride,
            len,
        })
    }

    pub fn empty() -> Self {
        Self {
            begin: 0,
            end: 0,
            stride: 1,
            len: 0,
        }
    }

    /// Detect an arithmetic progression
    pub fn detect(values: &[u32]) -> Option<Self> {
        match values {
            [] => Some(Self::empty()),
            [only] => Self::new(*only, *only as u64 + 1, 1).ok(),
            [first, second, ..] => {
                let stride = second.checked_sub(*first).filter(|&s| s > 0)?;
                if values.windows(2).any(|w| w[1].wrapping_sub(w[0]) != stride || w[1] <= w[0]) {
                    return None;
                }
                let last = *values.last()?;
                Self::new(*first, last as u64 + 1, stride).ok()
            }
        }
    }

    pub fn parse(payload: &[u8]) -> IndexResult<(Self, usize)> {
        let mut reader = ByteReader::new(payload);
        let begin = reader.varint_u32("range begin")?;
        let end = reader.varint("range end")?;
        let stride = reader.varint_u32("range stride")?;
        Ok((Self::new(begin, end, stride)?, reader.position()))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        encode_varint(self.begin as u64, out);
        encode_varint(self.end, out);
        encode_varint(self.stride as u64, out);
    }

    pub fn payload_len(&self) -> usize {
        varint_len(self.begin as u64) + varint_len(self.end) + varint_len(self.stride as u64)
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn begin(&self) -> u32 {
        self.begin
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn get(&self, pos: u32) -> u32 {
        (self.begin as u64 + pos as u64 * self.stride as u64) as u32
    }

    pub fn find(&self, value: u32) -> Option<u32> {
        if value < self.begin || value as u64 >= self.end {
            return None;
        }
        let offset = value - self.begin;
        (offset % self.stride == 0).then_some(offset / self.stride)
    }

    pub fn iter(&self) -> RangeIter {
        RangeIter {
            next: self.begin as u64,
            stride: self.stride as u64,
            remaining: self.len,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RangeIter {
    next: u64,
    stride: u64,
    remaining: u32,
}

impl Iterator for RangeIter {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.next as u32;
        self.next += self.stride;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for RangeIter {}
