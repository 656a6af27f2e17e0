use crate::index::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of an index inside a store
pub type IndexId = u32;

/// Current version of the flushed store format
pub const STORE_VERSION: u8 = 1;

/// Default number of elements per frame-of-reference block
pub const DEFAULT_BLOCK_SIZE: u32 = 128;

/// Codec used to encode an item index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Fixed-width little-endian u32 array
    #[default]
    Native,
    /// In-memory vector; serialized as `Native`
    Vector,
    /// Implicit arithmetic progression
    RangeGenerator,
    /// Raw values bit-packed at a single width
    BoundedCompactUintArray,
    /// Regression line plus bit-packed residuals
    RegLine,
    /// Frame of reference, block-coded deltas
    FoR,
}

impl IndexType {
    /// All codecs that have their own byte layout
    pub const SERIALIZABLE: [IndexType; 5] = [
        IndexType::Native,
        IndexType::BoundedCompactUintArray,
        IndexType::RegLine,
        IndexType::FoR,
        IndexType::RangeGenerator,
    ];

    /// Tag byte written in front of a serialized index
    pub fn tag(self) -> u8 {
        match self {
            IndexType::Native | IndexType::Vector => 1,
            IndexType::BoundedCompactUintArray => 2,
            IndexType::RegLine => 3,
            IndexType::FoR => 4,
            IndexType::RangeGenerator => 5,
        }
    }

    pub fn from_tag(tag: u8) -> IndexResult<Self> {
        match tag {
            1 => Ok(IndexType::Native),
            2 => Ok(IndexType::BoundedCompactUintArray),
            3 => Ok(IndexType::RegLine),
            4 => Ok(IndexType::FoR),
            5 => Ok(IndexType::RangeGenerator),
            other => Err(IndexError::UnknownType(other)),
        }
    }

    /// The codec whose bytes this type produces when serialized
    pub fn serialized(self) -> Self {
        match self {
            IndexType::Vector => IndexType::Native,
            other => other,
        }
    }

    /// Whether `at` is O(1) without decoding neighbouring elements
    pub fn is_random_access(self) -> bool {
        !matches!(self, IndexType::FoR)
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexType::Native => "native",
            IndexType::Vector => "vector",
            IndexType::RangeGenerator => "range",
            IndexType::BoundedCompactUintArray => "compact",
            IndexType::RegLine => "regline",
            IndexType::FoR => "for",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(IndexType::Native),
            "vector" => Ok(IndexType::Vector),
            "range" | "rangegenerator" => Ok(IndexType::RangeGenerator),
            "compact" | "boundedcompactuintarray" => Ok(IndexType::BoundedCompactUintArray),
            "regline" => Ok(IndexType::RegLine),
            "for" => Ok(IndexType::FoR),
            other => Err(IndexError::Unsupported(format!("unknown index type '{other}'"))),
        }
    }
}

/// Set operation applied by the merge engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    Union,
    Intersection,
    /// Elements of the left operand not in the right one
    Difference,
    SymmetricDifference,
}

impl SetOp {
    /// Emit an element only present in the left operand
    #[inline]
    pub fn keeps_left(self) -> bool {
        matches!(
            self,
            SetOp::Union | SetOp::Difference | SetOp::SymmetricDifference
        )
    }

    /// Emit an element only present in the right operand
    #[inline]
    pub fn keeps_right(self) -> bool {
        matches!(self, SetOp::Union | SetOp::SymmetricDifference)
    }

    /// Emit an element present in both operands
    #[inline]
    pub fn keeps_both(self) -> bool {
        matches!(self, SetOp::Union | SetOp::Intersection)
    }

    /// Upper bound on the result size
    pub fn size_bound(self, left: u32, right: u32) -> usize {
        let (l, r) = (left as usize, right as usize);
        match self {
            SetOp::Union | SetOp::SymmetricDifference => l + r,
            SetOp::Intersection => l.min(r),
            SetOp::Difference => l,
        }
    }
}

impl FromStr for SetOp {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "union" | "or" => Ok(SetOp::Union),
            "intersect" | "intersection" | "and" => Ok(SetOp::Intersection),
            "difference" | "diff" | "minus" => Ok(SetOp::Difference),
            "symdiff" | "xor" => Ok(SetOp::SymmetricDifference),
            other => Err(IndexError::Unsupported(format!("unknown set operation '{other}'"))),
        }
    }
}

/// Parameters for codecs that have tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Elements per frame-of-reference block
    pub for_block_size: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            for_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Configuration for the item index factory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Codec every added index is encoded with
    pub index_type: IndexType,
    pub encode: EncodeOptions,
    /// Number of leading bytes fed into the fingerprint
    pub fingerprint_prefix: usize,
    /// Reuse ids of byte-identical indexes
    pub deduplicate: bool,
    /// Decode every freshly encoded index and compare it with its input
    pub verify_on_insert: bool,
    /// Show progress bars for bulk operations
    pub show_progress: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            index_type: IndexType::RegLine,
            encode: EncodeOptions::default(),
            fingerprint_prefix: 256,
            deduplicate: true,
            verify_on_insert: false,
            show_progress: false,
        }
    }
}

impl FactoryConfig {
    pub fn with_type(index_type: IndexType) -> Self {
        Self {
            index_type,
            ..Self::default()
        }
    }
}

/// Per-codec totals inside a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub count: u64,
    pub elements: u64,
    pub bytes: u64,
}

impl TypeStats {
    /// Average bits per stored element
    pub fn bpn(&self) -> f64 {
        if self.elements == 0 {
            0.0
        } else {
            (self.bytes * 8) as f64 / self.elements as f64
        }
    }
}

/// Summary of a flushed store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub version: u8,
    pub index_type: IndexType,
    pub index_count: u32,
    pub total_elements: u64,
    pub data_bytes: u64,
    pub total_bytes: u64,
    pub largest_index: u32,
    pub by_type: BTreeMap<IndexType, TypeStats>,
}
