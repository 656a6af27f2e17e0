//! Transient in-memory index over a shared `u32` slice.

use crate::index::error::{IndexError, IndexResult};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct VectorIndex {
    values: Arc<[u32]>,
}

impl VectorIndex {
    /// Wrap `values`, rejecting anything that is not strictly ascending
    pub fn new(values: Vec<u32>) -> IndexResult<Self> {
        if let Some(pos) = values.windows(2).position(|w| w[0] >= w[1]) {
            return Err(IndexError::Unsorted { pos: pos + 1 });
        }
        Ok(Self::from_sorted_unchecked(values))
    }

    pub(crate) fn from_sorted_unchecked(values: Vec<u32>) -> Self {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
        Self {
            values: values.into(),
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.values.len() as u32
    }

    #[inline]
    pub fn get(&self, pos: u32) -> u32 {
        self.values[pos as usize]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }

    pub fn find(&self, value: u32) -> Option<u32> {
        self.values.binary_search(&value).ok().map(|pos| pos as u32)
    }
}
