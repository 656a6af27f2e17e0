//! Item indexes: codecs, set algebra and stores.
//!
//! - [`item_index`] - the [`ItemIndex`] handle over every codec
//! - [`codec`] - byte layouts (native, compact, regression line, FoR, range)
//! - [`set_ops`] - merge engine behind `|`, `&`, `-` and `^`
//! - [`factory`] - deduplicating store writer
//! - [`store`] - zero-copy store reader

pub mod build;
pub mod builder;
pub mod codec;
pub mod error;
pub mod factory;
pub mod item_index;
pub mod set_ops;
pub mod stats;
pub mod store;
pub mod types;

pub use builder::ItemIndexBuilder;
pub use error::{IndexError, IndexResult};
pub use factory::{Fingerprint, ItemIndexFactory, prefix_fingerprint};
pub use item_index::{ItemIndex, Iter};
pub use set_ops::{merge, merge_while};
pub use store::{ItemIndexStore, StoreHeader};
pub use types::*;
