//! Frame-of-reference codec.
//!
//! Payload: `[size: varint][block_size: varint][block_count: varint]` followed
//! by one `[first: varint][bits: u8][packed gaps]` record per block. A block of
//! `len` elements packs its `len - 1` consecutive gaps at `bits` each.
//!
//! Access to an isolated position costs a prefix sum inside its block. Scans go
//! through [`ForIter`], which decodes a whole block at a time, so sequential
//! reads are amortized O(1). Set operations only ever scan.

use crate::index::error::{IndexError, IndexResult};
use crate::utils::{
    ByteReader, SharedBytes, bits_needed, encode_varint, pack_into, packed_len, unpack_at,
};
use std::sync::Arc;

/// Pack `deltas` at `bits` each; emits exactly `ceil(bits * len / 8)` bytes
pub fn encode_block(deltas: &[u32], bits: u8, out: &mut Vec<u8>) {
    pack_into(deltas.iter().map(|&d| d as u64), bits, out);
}

/// Decode `len` packed deltas, appending the running sum starting from `prev`
pub fn decode_block(data: &[u8], prev: u32, len: usize, bits: u8, out: &mut Vec<u32>) {
    let mut acc = prev;
    for pos in 0..len {
        acc = acc.wrapping_add(unpack_at(data, bits, pos) as u32);
        out.push(acc);
    }
}

#[derive(Clone, Copy, Debug)]
struct BlockHeader {
    first: u32,
    bits: u8,
    /// Start of the packed gaps inside the payload
    offset: usize,
    len: u32,
}

#[derive(Clone, Debug)]
pub struct ForIndex {
    data: SharedBytes,
    len: u32,
    block_size: u32,
    blocks: Arc<[BlockHeader]>,
}

impl ForIndex {
    pub fn encode(values: &[u32], block_size: u32, out: &mut Vec<u8>) -> IndexResult<()> {
        if block_size == 0 {
            return Err(IndexError::Unsupported("FoR block size of zero".to_string()));
        }
        encode_varint(values.len() as u64, out);
        encode_varint(block_size as u64, out);
        encode_varint(values.len().div_ceil(block_size as usize) as u64, out);

        let mut deltas = Vec::with_capacity(block_size as usize);
        for block in values.chunks(block_size as usize) {
            deltas.clear();
            deltas.extend(block.windows(2).map(|w| {
                debug_assert!(w[0] < w[1]);
                w[1] - w[0]
            }));
            let bits = deltas
                .iter()
                .max()
                .map_or(0, |&gap| bits_needed(gap as u64));
            encode_varint(block[0] as u64, out);
            out.push(bits);
            encode_block(&deltas, bits, out);
        }
        Ok(())
    }

    pub fn parse(payload: &SharedBytes) -> IndexResult<Self> {
        let mut reader = ByteReader::new(payload);
        let len = reader.varint_u32("FoR size")?;
        let block_size = reader.varint_u32("FoR block size")?;
        if block_size == 0 {
            return Err(IndexError::corrupt("FoR block size is zero"));
        }
        let block_count = reader.varint("FoR block count")?;
        let expected = len.div_ceil(block_size) as u64;
        if block_count != expected {
            return Err(IndexError::corrupt(format!(
                "FoR declares {block_count} blocks, {expected} needed for {len} elements"
            )));
        }

        // Every block record takes at least two bytes
        let mut blocks = Vec::with_capacity((expected as usize).min(reader.remaining() / 2));
        let mut remaining = len;
        while remaining > 0 {
            let block_len = remaining.min(block_size);
            let first = reader.varint_u32("FoR block start")?;
            let bits = reader.u8("FoR block width")?;
            if bits > 32 || (bits == 0 && block_len > 1) {
                return Err(IndexError::corrupt(format!(
                    "FoR block width {bits} for {block_len} elements"
                )));
            }
            let offset = reader.skip(
                packed_len(block_len as usize - 1, bits),
                "FoR block deltas",
            )?;
            blocks.push(BlockHeader {
                first,
                bits,
                offset,
                len: block_len,
            });
            remaining -= block_len;
        }

        Ok(Self {
            data: payload.slice(0, reader.position())?,
            len,
            block_size,
            blocks: blocks.into(),
        })
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn payload_len(&self) -> usize {
        self.data.len()
    }

    fn gaps(&self, block: &BlockHeader) -> &[u8] {
        &self.data[block.offset..]
    }

    /// Value at `pos`; `pos < len`. Costs a prefix sum inside the block.
    pub fn get(&self, pos: u32) -> u32 {
        let block = &self.blocks[(pos / self.block_size) as usize];
        let within = (pos % self.block_size) as usize;
        let gaps = self.gaps(block);
        (0..within).fold(block.first, |acc, i| {
            acc.wrapping_add(unpack_at(gaps, block.bits, i) as u32)
        })
    }

    /// Append every value of block `index` to `out`
    fn decode_into(&self, index: usize, out: &mut Vec<u32>) {
        let block = &self.blocks[index];
        out.push(block.first);
        decode_block(
            self.gaps(block),
            block.first,
            block.len as usize - 1,
            block.bits,
            out,
        );
    }

    pub fn find(&self, value: u32) -> Option<u32> {
        let index = self.blocks.partition_point(|b| b.first <= value).checked_sub(1)?;
        let mut values = Vec::with_capacity(self.blocks[index].len as usize);
        self.decode_into(index, &mut values);
        let within = values.binary_search(&value).ok()?;
        Some(index as u32 * self.block_size + within as u32)
    }

    pub fn iter(&self) -> ForIter<'_> {
        ForIter {
            index: self,
            next_block: 0,
            buf: Vec::with_capacity(self.block_size.min(self.len) as usize),
            buf_pos: 0,
            remaining: self.len,
        }
    }
}

/// Block-buffered forward iterator
#[derive(Clone, Debug)]
pub struct ForIter<'a> {
    index: &'a ForIndex,
    next_block: usize,
    buf: Vec<u32>,
    buf_pos: usize,
    remaining: u32,
}

impl Iterator for ForIter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.buf_pos == self.buf.len() {
            if self.next_block == self.index.blocks.len() {
                return None;
            }
            self.buf.clear();
            self.index.decode_into(self.next_block, &mut self.buf);
            self.next_block += 1;
            self.buf_pos = 0;
        }
        let value = self.buf[self.buf_pos];
        self.buf_pos += 1;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for ForIter<'_> {}
