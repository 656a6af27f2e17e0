//! Reference-counted, immutable byte regions.
//!
//! A [`SharedBytes`] is a window into either an owned buffer or a memory-mapped
//! file. Cloning or slicing never copies the underlying bytes, so index views
//! resolved from a store stay zero-copy.

use crate::index::error::{IndexError, IndexResult};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v,
            Backing::Mapped(m) => m,
        }
    }
}

/// Cheaply clonable view into shared, read-only bytes
#[derive(Clone)]
pub struct SharedBytes {
    backing: Arc<Backing>,
    start: usize,
    len: usize,
}

impl SharedBytes {
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self {
            backing: Arc::new(Backing::Owned(data)),
            start: 0,
            len,
        }
    }

    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Memory-map a file read-only
    pub fn map_file(path: &Path) -> IndexResult<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            // Mapping an empty file fails on some platforms
            return Ok(Self::from_vec(Vec::new()));
        }
        // SAFETY: the mapping is read-only; stores are written once and not
        // modified while readers hold them open.
        let mmap = unsafe { Mmap::map(&file)? };
        let len = mmap.len();
        Ok(Self {
            backing: Arc::new(Backing::Mapped(mmap)),
            start: 0,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.backing.as_slice()[self.start..self.start + self.len]
    }

    /// Sub-view of `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> IndexResult<Self> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.len)
            .ok_or_else(|| {
                IndexError::corrupt(format!(
                    "range {offset}+{len} exceeds region of {} bytes",
                    self.len
                ))
            })?;
        Ok(Self {
            backing: Arc::clone(&self.backing),
            start: self.start + offset,
            len: end - offset,
        })
    }

    /// Sub-view from `offset` to the end
    pub fn slice_from(&self, offset: usize) -> IndexResult<Self> {
        let len = self.len.checked_sub(offset).ok_or_else(|| {
            IndexError::corrupt(format!(
                "offset {offset} exceeds region of {} bytes",
                self.len
            ))
        })?;
        self.slice(offset, len)
    }

    /// Sub-view of a range the caller has already validated
    pub(crate) fn sub_view(&self, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= self.len);
        Self {
            backing: Arc::clone(&self.backing),
            start: self.start + offset,
            len,
        }
    }

    /// Whether the bytes come from a memory-mapped file
    pub fn is_mapped(&self) -> bool {
        matches!(*self.backing, Backing::Mapped(_))
    }
}

impl Deref for SharedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBytes")
            .field("len", &self.len)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
