//! # itemidx - Compressed Sorted Integer Sets
//!
//! itemidx stores sets of `u32` ids (postings lists, item ids, cell ids) as
//! immutable, compressed indexes that can be combined with set algebra and
//! persisted in deduplicated, memory-mapped stores.
//!
//! ## Architecture
//!
//! - [`index`] - The [`ItemIndex`](index::ItemIndex) handle, codecs, set
//!   operations, the deduplicating factory and the store reader
//! - [`utils`] - Byte encoding, bit packing and shared byte buffers
//!
//! ## Quick Start
//!
//! ```
//! use itemidx::index::{FactoryConfig, IndexType, ItemIndex, ItemIndexFactory, ItemIndexStore};
//! use itemidx::utils::SharedBytes;
//!
//! let a = ItemIndex::encode(&[1, 5, 9, 13], IndexType::RegLine).unwrap();
//! let b = ItemIndex::encode(&[5, 6, 13], IndexType::FoR).unwrap();
//! assert_eq!((&a & &b).to_vec(), vec![5, 13]);
//!
//! let factory = ItemIndexFactory::new(FactoryConfig::default()).unwrap();
//! let id = factory.add_index(&(&a | &b)).unwrap();
//! let store = ItemIndexStore::from_bytes(SharedBytes::from_vec(factory.flush_to_vec().unwrap())).unwrap();
//! assert_eq!(store.get(id).unwrap().size(), 5);
//! ```
//!
//! ## Codecs
//!
//! | codec     | random access | best for                         |
//! |-----------|---------------|----------------------------------|
//! | native    | O(1)          | small or incompressible sets     |
//! | compact   | O(1)          | dense sets of small values       |
//! | regline   | O(1)          | long, evenly spread sets         |
//! | for       | O(block)      | scans and set algebra            |
//! | range     | O(1)          | arithmetic progressions          |

pub mod index;
pub mod utils;
