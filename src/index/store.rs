//! Read side of a flushed item index store.
//!
//! File layout:
//! `[version: u8][index_type: u8][data_len: u64 LE][data][offset table]`.
//! The offset table is a regression-line coded array holding the start of
//! every index inside `data`; an index ends where the next one starts, the
//! last one at `data_len`.

use crate::index::codec::RegLineArray;
use crate::index::error::{IndexError, IndexResult};
use crate::index::item_index::ItemIndex;
use crate::index::types::{IndexId, IndexType, STORE_VERSION, StoreStats};
use crate::utils::{ByteReader, SharedBytes};
use lru::LruCache;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Resolved views kept per open store
const CACHE_SIZE: usize = 256;

/// Fixed-size header at the start of every store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub version: u8,
    /// Codec the store was built with
    pub index_type: IndexType,
    /// Length of the concatenated index bytes
    pub data_len: u64,
}

impl StoreHeader {
    pub const SIZE: usize = 10;

    pub fn new(index_type: IndexType, data_len: u64) -> Self {
        Self {
            version: STORE_VERSION,
            index_type: index_type.serialized(),
            data_len,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&[self.version, self.index_type.tag()])?;
        out.write_all(&self.data_len.to_le_bytes())
    }

    pub fn parse(bytes: &[u8]) -> IndexResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let version = reader.u8("store version")?;
        if version != STORE_VERSION {
            return Err(IndexError::VersionMismatch {
                expected: STORE_VERSION,
                found: version,
            });
        }
        let index_type = IndexType::from_tag(reader.u8("store index type")?)?;
        let data_len = reader.u64_le("store data length")?;
        Ok(Self {
            version,
            index_type,
            data_len,
        })
    }
}

/// Memory-mapped (or in-memory) collection of item indexes addressed by id
pub struct ItemIndexStore {
    header: StoreHeader,
    data: SharedBytes,
    offsets: RegLineArray,
    total_bytes: u64,
    cache: Mutex<LruCache<IndexId, ItemIndex>>,
}

impl ItemIndexStore {
    /// Map the store at `path` without copying it
    pub fn open(path: &Path) -> IndexResult<Self> {
        let store = Self::from_bytes(SharedBytes::map_file(path)?)?;
        info!(
            path = %path.display(),
            indexes = store.size(),
            bytes = store.total_bytes,
            "opened item index store"
        );
        Ok(store)
    }

    pub fn from_bytes(bytes: SharedBytes) -> IndexResult<Self> {
        let header = StoreHeader::parse(&bytes)?;
        let data_len = usize::try_from(header.data_len)
            .map_err(|_| IndexError::corrupt(format!("data length {}", header.data_len)))?;
        let data = bytes.slice(StoreHeader::SIZE, data_len)?;
        let table = bytes.slice_from(StoreHeader::SIZE + data_len)?;
        let offsets = RegLineArray::parse(&table)?;
        if offsets.payload_len() != table.len() {
            return Err(IndexError::corrupt(format!(
                "{} trailing bytes after offset table",
                table.len() - offsets.payload_len()
            )));
        }

        let mut previous = 0u64;
        for id in 0..offsets.len() {
            let offset = offsets.get(id)?;
            if offset < previous || offset > header.data_len || (id == 0 && offset != 0) {
                return Err(IndexError::corrupt(format!(
                    "offset {offset} of index {id} out of order"
                )));
            }
            previous = offset;
        }
        debug!(indexes = offsets.len(), data_len, "validated store offsets");

        Ok(Self {
            header,
            data,
            offsets,
            total_bytes: bytes.len() as u64,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// Number of indexes
    pub fn size(&self) -> u32 {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    pub fn index_type(&self) -> IndexType {
        self.header.index_type
    }

    pub fn data_size(&self) -> u64 {
        self.header.data_len
    }

    pub fn total_size(&self) -> u64 {
        self.total_bytes
    }

    /// Tagged bytes of index `id`
    pub fn raw_bytes(&self, id: IndexId) -> IndexResult<SharedBytes> {
        if id >= self.size() {
            return Err(IndexError::out_of_bounds(id, self.size()));
        }
        let start = self.offsets.get(id)?;
        let end = match id + 1 {
            next if next < self.size() => self.offsets.get(next)?,
            _ => self.header.data_len,
        };
        self.data.slice(start as usize, (end - start) as usize)
    }

    /// Decode index `id` without touching the cache
    pub fn load(&self, id: IndexId) -> IndexResult<ItemIndex> {
        let bytes = self.raw_bytes(id)?;
        let len = bytes.len() as u64;
        let index = ItemIndex::from_bytes(bytes)?;
        if index.serialized_size() != len {
            return Err(IndexError::corrupt(format!(
                "index {id} uses {} of its {len} bytes",
                index.serialized_size()
            )));
        }
        Ok(index)
    }

    /// Index `id`, served from the view cache when possible
    pub fn get(&self, id: IndexId) -> IndexResult<ItemIndex> {
        if let Some(index) = self.lock_cache()?.get(&id) {
            return Ok(index.clone());
        }
        // Decode without holding the lock; a racing reader may decode the same id
        let index = self.load(id)?;
        self.lock_cache()?.put(id, index.clone());
        Ok(index)
    }

    fn lock_cache(&self) -> IndexResult<MutexGuard<'_, LruCache<IndexId, ItemIndex>>> {
        self.cache
            .lock()
            .map_err(|e| IndexError::Poisoned(e.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexResult<ItemIndex>> + '_ {
        (0..self.size()).map(|id| self.load(id))
    }

    /// Totals per codec over every index
    pub fn stats(&self) -> IndexResult<StoreStats> {
        let mut stats = StoreStats {
            version: self.header.version,
            index_type: self.header.index_type,
            index_count: self.size(),
            data_bytes: self.header.data_len,
            total_bytes: self.total_bytes,
            ..StoreStats::default()
        };
        for index in self.iter() {
            let index = index?;
            stats.total_elements += index.size() as u64;
            stats.largest_index = stats.largest_index.max(index.size());
            let entry = stats.by_type.entry(index.index_type()).or_default();
            entry.count += 1;
            entry.elements += index.size() as u64;
            entry.bytes += index.serialized_size();
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for ItemIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemIndexStore")
            .field("header", &self.header)
            .field("indexes", &self.size())
            .finish()
    }
}
