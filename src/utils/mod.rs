//! Utility functions and data structures.
//!
//! This module provides the byte-level plumbing shared by every codec:
//!
//! ## Modules
//!
//! - [`encoding`] - Little-endian fixed-width and varint/zig-zag encoding
//! - [`bits`] - Fixed-width bit packing (the storage behind compact arrays)
//! - [`shared_bytes`] - Reference-counted byte regions (owned or memory-mapped)
//! - [`progress`] - Progress bars that compile away without the `progress` feature
//!
//! ## Key Functions
//!
//! ```
//! use itemidx::utils::{encode_varint, decode_varint, pack_into, unpack_at};
//!
//! let mut buf = Vec::new();
//! encode_varint(300, &mut buf);
//! assert_eq!(decode_varint(&buf), Some((300, 2)));
//!
//! let mut packed = Vec::new();
//! pack_into([5u64, 1, 7], 3, &mut packed);
//! assert_eq!(unpack_at(&packed, 3, 2), 7);
//! ```

pub mod bits;
pub mod encoding;
pub mod progress;
pub mod shared_bytes;

pub use bits::*;
pub use encoding::*;
pub use shared_bytes::SharedBytes;
