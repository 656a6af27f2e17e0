//! Incremental construction of item indexes.

use crate::index::error::{IndexError, IndexResult};
use crate::index::item_index::ItemIndex;
use crate::index::types::{EncodeOptions, IndexType};

/// Push-back builder accepting strictly ascending values
#[derive(Debug, Default, Clone)]
pub struct ItemIndexBuilder {
    values: Vec<u32>,
}

impl ItemIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append `value`, which must exceed every value pushed so far
    pub fn push(&mut self, value: u32) -> IndexResult<()> {
        if self.values.last().is_some_and(|&last| last >= value) {
            return Err(IndexError::Unsorted {
                pos: self.values.len(),
            });
        }
        self.values.push(value);
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = u32>>(&mut self, values: I) -> IndexResult<()> {
        values.into_iter().try_for_each(|value| self.push(value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Transient in-memory index over the pushed values
    pub fn finish_vector(self) -> ItemIndex {
        ItemIndex::from_sorted_unchecked(self.values)
    }

    pub fn finish(self, ty: IndexType) -> IndexResult<ItemIndex> {
        self.finish_with(ty, &EncodeOptions::default())
    }

    pub fn finish_with(self, ty: IndexType, options: &EncodeOptions) -> IndexResult<ItemIndex> {
        match ty {
            IndexType::Vector => Ok(self.finish_vector()),
            _ => ItemIndex::encode_sorted(&self.values, ty, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_finish() {
        let mut builder = ItemIndexBuilder::with_capacity(4);
        builder.push(3).unwrap();
        builder.extend([7, 9, 100]).unwrap();
        assert_eq!(builder.len(), 4);

        let index = builder.clone().finish(IndexType::RegLine).unwrap();
        assert_eq!(index.index_type(), IndexType::RegLine);
        assert_eq!(index.to_vec(), vec![3, 7, 9, 100]);
        assert_eq!(builder.finish_vector().index_type(), IndexType::Vector);
    }

    #[test]
    fn test_rejects_out_of_order() {
        let mut builder = ItemIndexBuilder::new();
        builder.extend([1, 5]).unwrap();
        assert!(matches!(builder.push(5), Err(IndexError::Unsorted { pos: 2 })));
        assert!(builder.push(4).is_err());
        assert_eq!(builder.values(), &[1, 5]);
    }

    #[test]
    fn test_custom_block_size() {
        let mut builder = ItemIndexBuilder::new();
        builder.extend(0..1_000).unwrap();
        let options = EncodeOptions { for_block_size: 16 };
        let index = builder.finish_with(IndexType::FoR, &options).unwrap();
        assert_eq!(index.size(), 1_000);
        assert_eq!(index.at(999).unwrap(), 999);
    }
}
