//! Deduplicating writer for item index stores.
//!
//! The factory assigns stable sequential ids to distinct encoded indexes.
//! Candidates are found through a fingerprint over the encoded length and a
//! bounded prefix, then compared byte for byte, so fingerprint collisions
//! never merge two different indexes.

use crate::index::codec::RegLineArray;
use crate::index::error::{IndexError, IndexResult};
use crate::index::item_index::{ItemIndex, check_sorted, encode_tagged};
use crate::index::store::{ItemIndexStore, StoreHeader};
use crate::index::types::{FactoryConfig, IndexId, IndexType};
use crate::utils::SharedBytes;
use crate::utils::progress::store_progress;
use ahash::RandomState;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::hash::{BuildHasher, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, trace};

/// Indexes re-encoded per parallel batch in `insert_store`
const INSERT_CHUNK: u32 = 4096;

/// Hash over encoded index bytes used to find dedup candidates
pub type Fingerprint = Box<dyn Fn(&[u8]) -> u64 + Send + Sync>;

/// ahash with fixed seeds over the length and the first `prefix` bytes
pub fn prefix_fingerprint(prefix: usize) -> Fingerprint {
    let state = RandomState::with_seeds(
        0x2d35_8dcc_aa6c_78a5,
        0x8bb8_4b93_962e_acc9,
        0x4b33_a62e_d433_d4a3,
        0x4d5a_2da5_1de1_aa47,
    );
    Box::new(move |bytes: &[u8]| {
        let mut hasher = state.build_hasher();
        hasher.write_usize(bytes.len());
        hasher.write(&bytes[..bytes.len().min(prefix)]);
        hasher.finish()
    })
}

#[derive(Default)]
struct FactoryState {
    data: Vec<u8>,
    offsets: Vec<u64>,
    buckets: FxHashMap<u64, Vec<IndexId>>,
}

impl FactoryState {
    fn bytes_of(&self, id: IndexId) -> &[u8] {
        let start = self.offsets[id as usize] as usize;
        let end = self
            .offsets
            .get(id as usize + 1)
            .map_or(self.data.len(), |&next| next as usize);
        &self.data[start..end]
    }

    fn lookup(&self, fingerprint: u64, bytes: &[u8]) -> Option<IndexId> {
        self.buckets
            .get(&fingerprint)?
            .iter()
            .copied()
            .find(|&id| self.bytes_of(id) == bytes)
    }
}

/// Builds a store of deduplicated item indexes
pub struct ItemIndexFactory {
    config: FactoryConfig,
    state: RwLock<FactoryState>,
    hits: AtomicU64,
    fingerprint: Fingerprint,
}

impl ItemIndexFactory {
    /// New factory holding only the empty index as id 0
    pub fn new(config: FactoryConfig) -> IndexResult<Self> {
        let fingerprint = prefix_fingerprint(config.fingerprint_prefix);
        Self::with_fingerprint(config, fingerprint)
    }

    pub fn with_fingerprint(config: FactoryConfig, fingerprint: Fingerprint) -> IndexResult<Self> {
        if config.encode.for_block_size == 0 {
            return Err(IndexError::Unsupported("FoR block size of zero".to_string()));
        }
        let factory = Self {
            config,
            state: RwLock::new(FactoryState::default()),
            hits: AtomicU64::new(0),
            fingerprint,
        };
        factory.add_sorted(&[])?;
        Ok(factory)
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn index_type(&self) -> IndexType {
        self.config.index_type
    }

    fn read(&self) -> IndexResult<RwLockReadGuard<'_, FactoryState>> {
        self.state
            .read()
            .map_err(|e| IndexError::Poisoned(e.to_string()))
    }

    fn write(&self) -> IndexResult<RwLockWriteGuard<'_, FactoryState>> {
        self.state
            .write()
            .map_err(|e| IndexError::Poisoned(e.to_string()))
    }

    /// Number of distinct indexes, the empty one included
    pub fn size(&self) -> IndexResult<u32> {
        Ok(self.read()?.offsets.len() as u32)
    }

    /// Inserts answered with an existing id
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Bytes of concatenated index data
    pub fn data_size(&self) -> IndexResult<u64> {
        Ok(self.read()?.data.len() as u64)
    }

    fn insert(&self, bytes: &[u8]) -> IndexResult<IndexId> {
        if !self.config.deduplicate {
            let mut state = self.write()?;
            return Self::append(&mut state, bytes);
        }

        let fingerprint = (self.fingerprint)(bytes);
        if let Some(id) = self.read()?.lookup(fingerprint, bytes) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(id, "index already stored");
            return Ok(id);
        }

        let mut state = self.write()?;
        // Another writer may have stored the same bytes since the lookup
        if let Some(id) = state.lookup(fingerprint, bytes) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(id);
        }
        let id = Self::append(&mut state, bytes)?;
        state.buckets.entry(fingerprint).or_default().push(id);
        Ok(id)
    }

    fn append(state: &mut FactoryState, bytes: &[u8]) -> IndexResult<IndexId> {
        let id = IndexId::try_from(state.offsets.len())
            .map_err(|_| IndexError::Overflow("index id space exhausted".to_string()))?;
        let offset = state.data.len() as u64;
        state.offsets.push(offset);
        state.data.extend_from_slice(bytes);
        trace!(id, bytes = bytes.len(), "stored new index");
        Ok(id)
    }

    /// Store tagged index bytes as they are
    pub fn add_bytes(&self, bytes: &[u8]) -> IndexResult<IndexId> {
        let index = ItemIndex::from_bytes(SharedBytes::copy_from_slice(bytes))?;
        if index.serialized_size() != bytes.len() as u64 {
            return Err(IndexError::corrupt(format!(
                "{} trailing bytes after index",
                bytes.len() as u64 - index.serialized_size()
            )));
        }
        self.insert(bytes)
    }

    /// Encode strictly ascending `values` with the configured codec and store them
    pub fn add_sorted(&self, values: &[u32]) -> IndexResult<IndexId> {
        check_sorted(values)?;
        self.insert(&self.encode_values(values)?)
    }

    /// Store `index`, re-encoding it when its codec differs from the configured one
    pub fn add_index(&self, index: &ItemIndex) -> IndexResult<IndexId> {
        match self.reusable_bytes(index) {
            Some(bytes) => self.insert(bytes),
            None => self.insert(&self.encode_values(&index.to_vec())?),
        }
    }

    /// Stored bytes of `index` when they already use the configured encoding
    fn reusable_bytes<'a>(&self, index: &'a ItemIndex) -> Option<&'a [u8]> {
        // FoR bytes depend on the block size, so they are always rebuilt
        if index.index_type() != self.config.index_type || index.index_type() == IndexType::FoR {
            return None;
        }
        index.encoded_bytes().map(|bytes| bytes.as_slice())
    }

    fn encode_values(&self, values: &[u32]) -> IndexResult<Vec<u8>> {
        let bytes = match encode_tagged(values, self.config.index_type, &self.config.encode) {
            Err(IndexError::Unsupported(_))
                if self.config.index_type == IndexType::RangeGenerator =>
            {
                encode_tagged(values, IndexType::Native, &self.config.encode)?
            }
            other => other?,
        };
        if self.config.verify_on_insert {
            verify(&bytes, values)?;
        }
        Ok(bytes)
    }

    /// Decode a stored index
    pub fn get(&self, id: IndexId) -> IndexResult<ItemIndex> {
        let state = self.read()?;
        if id as usize >= state.offsets.len() {
            return Err(IndexError::out_of_bounds(id, state.offsets.len() as u32));
        }
        // Checked when it was added
        ItemIndex::from_bytes_unchecked(SharedBytes::copy_from_slice(state.bytes_of(id)))
    }

    /// Re-insert every index of `store`, returning the new id of each old id
    ///
    /// Indexes are re-encoded in parallel and inserted in id order, so the
    /// resulting ids do not depend on scheduling.
    pub fn insert_store(&self, store: &ItemIndexStore) -> IndexResult<Vec<IndexId>> {
        let total = store.size();
        let pb = store_progress(total as u64, self.config.show_progress, "Recoding indexes");
        let mut ids = Vec::with_capacity(total as usize);

        let mut start = 0;
        while start < total {
            let end = total.min(start.saturating_add(INSERT_CHUNK));
            let encoded = (start..end)
                .into_par_iter()
                .map(|id| {
                    let index = store.load(id)?;
                    match self.reusable_bytes(&index) {
                        Some(bytes) => Ok(bytes.to_vec()),
                        None => self.encode_values(&index.to_vec()),
                    }
                })
                .collect::<IndexResult<Vec<_>>>()?;
            for bytes in &encoded {
                ids.push(self.insert(bytes)?);
                pb.inc(1);
            }
            start = end;
        }
        pb.finish_and_clear();

        info!(
            indexes = ids.len(),
            distinct = self.size()?,
            hits = self.hit_count(),
            "re-inserted store"
        );
        Ok(ids)
    }

    /// Write the store; returns the number of bytes written
    pub fn flush_to<W: Write>(&self, out: &mut W) -> IndexResult<u64> {
        let state = self.read()?;
        let mut table = Vec::new();
        RegLineArray::encode(&state.offsets, &mut table)?;

        StoreHeader::new(self.config.index_type, state.data.len() as u64).write_to(out)?;
        out.write_all(&state.data)?;
        out.write_all(&table)?;

        let total = (StoreHeader::SIZE + state.data.len() + table.len()) as u64;
        info!(
            indexes = state.offsets.len(),
            data_bytes = state.data.len(),
            offset_bytes = table.len(),
            hits = self.hit_count(),
            "flushed item index store"
        );
        Ok(total)
    }

    pub fn flush_to_vec(&self) -> IndexResult<Vec<u8>> {
        let mut out = Vec::new();
        self.flush_to(&mut out)?;
        Ok(out)
    }

    pub fn flush_to_path(&self, path: &Path) -> IndexResult<u64> {
        let mut writer = BufWriter::new(File::create(path)?);
        let written = self.flush_to(&mut writer)?;
        writer.flush()?;
        Ok(written)
    }
}

/// Check that freshly encoded bytes decode back to `values`
fn verify(bytes: &[u8], values: &[u32]) -> IndexResult<()> {
    let decoded = ItemIndex::from_bytes(SharedBytes::copy_from_slice(bytes))?;
    if decoded.size() as usize != values.len() || !decoded.iter().eq(values.iter().copied()) {
        return Err(IndexError::corrupt(format!(
            "{} index of {} values does not decode to its input",
            decoded.index_type(),
            values.len()
        )));
    }
    Ok(())
}
