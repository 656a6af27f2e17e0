//! The [`ItemIndex`] handle: an immutable, sorted, duplicate-free `u32` set.
//!
//! An `ItemIndex` is a closed enum over the codec views in [`codec`]. Views
//! decoded from a store borrow its bytes through [`SharedBytes`], so cloning a
//! handle only bumps reference counts.

use crate::index::codec::compact::CompactIter;
use crate::index::codec::frame_of_reference::ForIter;
use crate::index::codec::native::NativeIter;
use crate::index::codec::range::RangeIter;
use crate::index::codec::regline::RegLineIter;
use crate::index::codec::{
    CompactIndex, ForIndex, NativeIndex, RangeIndex, RegLineIndex, VectorIndex,
};
use crate::index::error::{IndexError, IndexResult};
use crate::index::types::{EncodeOptions, IndexType};
use crate::utils::SharedBytes;
use roaring::RoaringBitmap;
use std::fmt;
use std::iter::Copied;
use std::slice;

#[derive(Clone, Debug)]
pub(crate) enum Repr {
    Native(NativeIndex),
    Vector(VectorIndex),
    Range(RangeIndex),
    Compact(CompactIndex),
    RegLine(RegLineIndex),
    For(ForIndex),
}

/// Immutable sorted set of `u32` values with a pluggable encoding
#[derive(Clone)]
pub struct ItemIndex {
    pub(crate) repr: Repr,
    /// Exact tagged serialization; `None` only for vectors
    encoded: Option<SharedBytes>,
}

/// Fail with `Unsorted` unless `values` is strictly ascending
pub(crate) fn check_sorted(values: &[u32]) -> IndexResult<()> {
    match values.windows(2).position(|w| w[0] >= w[1]) {
        Some(pos) => Err(IndexError::Unsorted { pos: pos + 1 }),
        None => Ok(()),
    }
}

/// Tagged serialization of sorted `values` in codec `ty`
pub(crate) fn encode_tagged(
    values: &[u32],
    ty: IndexType,
    options: &EncodeOptions,
) -> IndexResult<Vec<u8>> {
    let mut out = Vec::with_capacity(16 + values.len());
    out.push(ty.serialized().tag());
    match ty {
        IndexType::Native | IndexType::Vector => NativeIndex::encode(values, &mut out),
        IndexType::BoundedCompactUintArray => CompactIndex::encode(values, &mut out),
        IndexType::RegLine => RegLineIndex::encode(values, &mut out)?,
        IndexType::FoR => ForIndex::encode(values, options.for_block_size, &mut out)?,
        IndexType::RangeGenerator => RangeIndex::detect(values)
            .ok_or_else(|| {
                IndexError::Unsupported(
                    "values do not form an arithmetic progression".to_string(),
                )
            })?
            .encode(&mut out),
    }
    Ok(out)
}

impl ItemIndex {
    pub fn empty() -> Self {
        Self::from_vector(VectorIndex::from_sorted_unchecked(Vec::new()))
    }

    /// In-memory index over `values`, which must be strictly ascending
    pub fn from_sorted(values: Vec<u32>) -> IndexResult<Self> {
        Ok(Self::from_vector(VectorIndex::new(values)?))
    }

    pub(crate) fn from_sorted_unchecked(values: Vec<u32>) -> Self {
        Self::from_vector(VectorIndex::from_sorted_unchecked(values))
    }

    fn from_vector(vector: VectorIndex) -> Self {
        Self {
            repr: Repr::Vector(vector),
            encoded: None,
        }
    }

    /// `{begin, begin+stride, ...}` below the exclusive `end`
    pub fn from_range(begin: u32, end: u64, stride: u32) -> IndexResult<Self> {
        let range = RangeIndex::new(begin, end, stride)?;
        let mut out = Vec::with_capacity(1 + range.payload_len());
        out.push(IndexType::RangeGenerator.tag());
        range.encode(&mut out);
        Ok(Self {
            repr: Repr::Range(range),
            encoded: Some(SharedBytes::from_vec(out)),
        })
    }

    pub(crate) fn from_native_buffer(buf: Vec<u8>, count: u32) -> Self {
        let bytes = SharedBytes::from_vec(buf);
        let values = bytes.sub_view(5, count as usize * 4);
        Self {
            repr: Repr::Native(NativeIndex::from_parts(values, count)),
            encoded: Some(bytes),
        }
    }

    /// Encode strictly ascending `values` with codec `ty`
    pub fn encode(values: &[u32], ty: IndexType) -> IndexResult<Self> {
        Self::encode_with(values, ty, &EncodeOptions::default())
    }

    pub fn encode_with(values: &[u32], ty: IndexType, options: &EncodeOptions) -> IndexResult<Self> {
        check_sorted(values)?;
        Self::encode_sorted(values, ty, options)
    }

    pub(crate) fn encode_sorted(
        values: &[u32],
        ty: IndexType,
        options: &EncodeOptions,
    ) -> IndexResult<Self> {
        if ty == IndexType::Vector {
            return Ok(Self::from_sorted_unchecked(values.to_vec()));
        }
        Self::from_bytes_unchecked(SharedBytes::from_vec(encode_tagged(values, ty, options)?))
    }

    /// Decode a type-tagged index; trailing bytes after it are ignored
    ///
    /// Every value is visited once to check that the set strictly ascends, so
    /// decoding is O(n). Out-of-order bytes fail with `CorruptData`.
    pub fn from_bytes(bytes: SharedBytes) -> IndexResult<Self> {
        let index = Self::from_bytes_unchecked(bytes)?;
        index.validate()?;
        Ok(index)
    }

    /// Decode bytes this crate encoded itself, skipping the order check
    pub(crate) fn from_bytes_unchecked(bytes: SharedBytes) -> IndexResult<Self> {
        let tag = *bytes
            .first()
            .ok_or_else(|| IndexError::corrupt("empty index bytes"))?;
        let payload = bytes.slice_from(1)?;
        let (repr, payload_len) = match IndexType::from_tag(tag)? {
            IndexType::Native | IndexType::Vector => {
                let native = NativeIndex::parse(&payload)?;
                let len = native.payload_len();
                (Repr::Native(native), len)
            }
            IndexType::BoundedCompactUintArray => {
                let compact = CompactIndex::parse(&payload)?;
                let len = compact.payload_len();
                (Repr::Compact(compact), len)
            }
            IndexType::RegLine => {
                let regline = RegLineIndex::parse(&payload)?;
                let len = regline.payload_len();
                (Repr::RegLine(regline), len)
            }
            IndexType::FoR => {
                let for_index = ForIndex::parse(&payload)?;
                let len = for_index.payload_len();
                (Repr::For(for_index), len)
            }
            IndexType::RangeGenerator => {
                let (range, len) = RangeIndex::parse(&payload)?;
                (Repr::Range(range), len)
            }
        };
        Ok(Self {
            repr,
            encoded: Some(bytes.slice(0, 1 + payload_len)?),
        })
    }

    /// Fail with `CorruptData` unless the values strictly ascend
    pub fn validate(&self) -> IndexResult<()> {
        match &self.repr {
            // Ascending by construction
            Repr::Vector(_) | Repr::Range(_) | Repr::RegLine(_) => Ok(()),
            _ => {
                let mut values = self.iter();
                let Some(mut prev) = values.next() else {
                    return Ok(());
                };
                for (pos, value) in values.enumerate() {
                    if value <= prev {
                        return Err(IndexError::corrupt(format!(
                            "{} value {value} at {} does not exceed {prev}",
                            self.index_type(),
                            pos + 1
                        )));
                    }
                    prev = value;
                }
                Ok(())
            }
        }
    }

    /// Number of elements
    #[inline]
    pub fn size(&self) -> u32 {
        match &self.repr {
            Repr::Native(i) => i.len(),
            Repr::Vector(i) => i.len(),
            Repr::Range(i) => i.len(),
            Repr::Compact(i) => i.len(),
            Repr::RegLine(i) => i.len(),
            Repr::For(i) => i.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn index_type(&self) -> IndexType {
        match &self.repr {
            Repr::Native(_) => IndexType::Native,
            Repr::Vector(_) => IndexType::Vector,
            Repr::Range(_) => IndexType::RangeGenerator,
            Repr::Compact(_) => IndexType::BoundedCompactUintArray,
            Repr::RegLine(_) => IndexType::RegLine,
            Repr::For(_) => IndexType::FoR,
        }
    }

    /// Bytes taken by the tagged serialization
    pub fn serialized_size(&self) -> u64 {
        match &self.encoded {
            Some(bytes) => bytes.len() as u64,
            None => 1 + 4 + 4 * self.size() as u64,
        }
    }

    /// Average bits per element of the serialized form
    pub fn bpn(&self) -> f64 {
        match self.size() {
            0 => 0.0,
            n => (self.serialized_size() * 8) as f64 / n as f64,
        }
    }

    /// The `pos`-th smallest element
    pub fn at(&self, pos: u32) -> IndexResult<u32> {
        if pos >= self.size() {
            return Err(IndexError::out_of_bounds(pos, self.size()));
        }
        Ok(match &self.repr {
            Repr::Native(i) => i.get(pos),
            Repr::Vector(i) => i.get(pos),
            Repr::Range(i) => i.get(pos),
            Repr::Compact(i) => i.get(pos),
            Repr::RegLine(i) => i.get(pos),
            Repr::For(i) => i.get(pos),
        })
    }

    pub fn first(&self) -> IndexResult<u32> {
        self.at(0)
    }

    pub fn last(&self) -> IndexResult<u32> {
        match self.size() {
            0 => Err(IndexError::out_of_bounds(0u32, 0u32)),
            n => self.at(n - 1),
        }
    }

    /// Position of `value`, if present
    pub fn find(&self, value: u32) -> Option<u32> {
        match &self.repr {
            Repr::Native(i) => i.find(value),
            Repr::Vector(i) => i.find(value),
            Repr::Range(i) => i.find(value),
            Repr::Compact(i) => i.find(value),
            Repr::RegLine(i) => i.find(value),
            Repr::For(i) => i.find(value),
        }
    }

    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        self.find(value).is_some()
    }

    pub fn iter(&self) -> Iter<'_> {
        match &self.repr {
            Repr::Native(i) => Iter::Native(i.iter()),
            Repr::Vector(i) => Iter::Vector(i.as_slice().iter().copied()),
            Repr::Range(i) => Iter::Range(i.iter()),
            Repr::Compact(i) => Iter::Compact(i.iter()),
            Repr::RegLine(i) => Iter::RegLine(i.iter()),
            Repr::For(i) => Iter::For(i.iter()),
        }
    }

    pub fn to_vec(&self) -> Vec<u32> {
        match &self.repr {
            Repr::Vector(i) => i.as_slice().to_vec(),
            _ => self.iter().collect(),
        }
    }

    /// Re-encode with codec `ty`; a no-op clone when the codec already matches
    pub fn convert(&self, ty: IndexType) -> IndexResult<Self> {
        self.convert_with(ty, &EncodeOptions::default())
    }

    pub fn convert_with(&self, ty: IndexType, options: &EncodeOptions) -> IndexResult<Self> {
        if ty == self.index_type() && ty != IndexType::FoR {
            return Ok(self.clone());
        }
        match &self.repr {
            Repr::Vector(i) => Self::encode_sorted(i.as_slice(), ty, options),
            _ => Self::encode_sorted(&self.to_vec(), ty, options),
        }
    }

    /// Append the tagged serialization to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match (&self.encoded, &self.repr) {
            (Some(bytes), _) => out.extend_from_slice(bytes),
            (None, Repr::Vector(i)) => {
                out.push(IndexType::Native.tag());
                NativeIndex::encode(i.as_slice(), out);
            }
            (None, _) => {
                out.push(IndexType::Native.tag());
                NativeIndex::encode(&self.to_vec(), out);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size() as usize);
        self.write_to(&mut out);
        out
    }

    /// Exact tagged bytes backing this view, if it is not a vector
    pub fn encoded_bytes(&self) -> Option<&SharedBytes> {
        self.encoded.as_ref()
    }

    pub fn to_bitmap(&self) -> RoaringBitmap {
        self.iter().collect()
    }

    pub fn from_bitmap(bitmap: &RoaringBitmap, ty: IndexType) -> IndexResult<Self> {
        let values: Vec<u32> = bitmap.iter().collect();
        Self::encode_sorted(&values, ty, &EncodeOptions::default())
    }
}

impl Default for ItemIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for ItemIndex {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.iter().eq(other.iter())
    }
}

impl Eq for ItemIndex {}

impl fmt::Debug for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 8;
        let head: Vec<u32> = self.iter().take(SHOWN).collect();
        let mut s = f.debug_struct("ItemIndex");
        s.field("type", &format_args!("{}", self.index_type()))
            .field("size", &self.size())
            .field("head", &head);
        if self.size() as usize > SHOWN {
            s.field("truncated", &true);
        }
        s.finish()
    }
}

impl<'a> IntoIterator for &'a ItemIndex {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl TryFrom<Vec<u32>> for ItemIndex {
    type Error = IndexError;

    fn try_from(values: Vec<u32>) -> IndexResult<Self> {
        Self::from_sorted(values)
    }
}

/// Forward iterator over any codec
#[derive(Clone, Debug)]
pub enum Iter<'a> {
    Native(NativeIter<'a>),
    Vector(Copied<slice::Iter<'a, u32>>),
    Range(RangeIter),
    Compact(CompactIter<'a>),
    RegLine(RegLineIter<'a>),
    For(ForIter<'a>),
}

impl Iterator for Iter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        match self {
            Iter::Native(it) => it.next(),
            Iter::Vector(it) => it.next(),
            Iter::Range(it) => it.next(),
            Iter::Compact(it) => it.next(),
            Iter::RegLine(it) => it.next(),
            Iter::For(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Native(it) => it.size_hint(),
            Iter::Vector(it) => it.size_hint(),
            Iter::Range(it) => it.size_hint(),
            Iter::Compact(it) => it.size_hint(),
            Iter::RegLine(it) => it.size_hint(),
            Iter::For(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}
