//! Concrete byte layouts for item indexes.
//!
//! Every codec parses a payload (the bytes after the type tag) into a cheap
//! view over [`SharedBytes`](crate::utils::SharedBytes) and encodes a sorted
//! `&[u32]` into a payload.

pub mod compact;
pub mod frame_of_reference;
pub mod native;
pub mod range;
pub mod regline;
pub mod vector;

pub use compact::{CompactIndex, PackedArray};
pub use frame_of_reference::{ForIndex, decode_block, encode_block};
pub use native::{NativeIndex, NativeWriter};
pub use range::RangeIndex;
pub use regline::{RegLineArray, RegLineIndex};
pub use vector::VectorIndex;

/// Binary search over a sorted sequence of `len` values read through `at`
pub(crate) fn search_sorted(len: u32, value: u32, at: impl Fn(u32) -> u32) -> Option<u32> {
    let (mut lo, mut hi) = (0u32, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match at(mid).cmp(&value) {
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
            std::cmp::Ordering::Equal => return Some(mid),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_sorted() {
        let values = [2u32, 4, 8, 16, 32];
        let at = |pos: u32| values[pos as usize];
        assert_eq!(search_sorted(5, 16, at), Some(3));
        assert_eq!(search_sorted(5, 2, at), Some(0));
        assert_eq!(search_sorted(5, 33, at), None);
        assert_eq!(search_sorted(0, 1, at), None);
    }
}
