//! Integration tests for the factory and the on-disk store.

use itemidx::index::{
    FactoryConfig, IndexError, IndexType, ItemIndex, ItemIndexFactory, ItemIndexStore,
    STORE_VERSION, StoreHeader,
};
use itemidx::utils::SharedBytes;
use proptest::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

fn sample_sets() -> Vec<Vec<u32>> {
    (0..200u32)
        .map(|k| (0..(k % 37) * 11).map(|i| i * (k % 5 + 1) + k).collect())
        .collect()
}

fn filled_factory(index_type: IndexType) -> (ItemIndexFactory, Vec<u32>) {
    let factory = ItemIndexFactory::new(FactoryConfig::with_type(index_type)).unwrap();
    let ids = sample_sets()
        .iter()
        .map(|set| factory.add_sorted(set).unwrap())
        .collect();
    (factory, ids)
}

#[test]
fn flush_and_open_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.idx");

    for index_type in [
        IndexType::Native,
        IndexType::BoundedCompactUintArray,
        IndexType::RegLine,
        IndexType::FoR,
    ] {
        let (factory, ids) = filled_factory(index_type);
        let written = factory.flush_to_path(&path).unwrap();
        assert_eq!(written, std::fs::metadata(&path).unwrap().len());

        let store = ItemIndexStore::open(&path).unwrap();
        assert_eq!(store.size(), factory.size().unwrap());
        assert_eq!(store.index_type(), index_type);
        assert_eq!(store.data_size(), factory.data_size().unwrap());

        for (set, &id) in sample_sets().iter().zip(&ids) {
            let index = store.get(id).unwrap();
            assert_eq!(&index.to_vec(), set, "{index_type} id {id}");
            assert_eq!(index.index_type(), index_type);
        }
    }
}

#[test]
fn duplicates_share_ids() {
    let (factory, ids) = filled_factory(IndexType::RegLine);
    let sets = sample_sets();
    for (i, a) in sets.iter().enumerate() {
        for (j, b) in sets.iter().enumerate() {
            assert_eq!(a == b, ids[i] == ids[j]);
        }
    }
    let hits = factory.hit_count();
    let again = factory.add_sorted(&sets[50]).unwrap();
    assert_eq!(again, ids[50]);
    assert_eq!(factory.hit_count(), hits + 1);
}

#[test]
fn forced_collisions_keep_sets_apart() {
    let factory =
        ItemIndexFactory::with_fingerprint(FactoryConfig::default(), Box::new(|_: &[u8]| 0))
            .unwrap();
    let sets = sample_sets();
    let ids: Vec<u32> = sets.iter().map(|s| factory.add_sorted(s).unwrap()).collect();
    for (set, &id) in sets.iter().zip(&ids) {
        assert_eq!(&factory.get(id).unwrap().to_vec(), set);
    }
}

#[test]
fn concurrent_inserts_agree_on_ids() {
    let factory = Arc::new(ItemIndexFactory::new(FactoryConfig::default()).unwrap());
    let sets = sample_sets();
    let ids: Vec<u32> = sets
        .par_iter()
        .chain(sets.par_iter())
        .map(|set| factory.add_sorted(set).unwrap())
        .collect();
    let (first, second) = ids.split_at(sets.len());
    assert_eq!(first, second);
    for (set, &id) in sets.iter().zip(first) {
        assert_eq!(&factory.get(id).unwrap().to_vec(), set);
    }
}

#[test]
fn recode_store_in_parallel() {
    let (factory, ids) = filled_factory(IndexType::Native);
    let source = ItemIndexStore::from_bytes(SharedBytes::from_vec(factory.flush_to_vec().unwrap()))
        .unwrap();

    let recoder = ItemIndexFactory::new(FactoryConfig::with_type(IndexType::FoR)).unwrap();
    let mapping = recoder.insert_store(&source).unwrap();
    assert_eq!(mapping.len(), source.size() as usize);
    assert_eq!(mapping[0], 0);

    let target = ItemIndexStore::from_bytes(SharedBytes::from_vec(recoder.flush_to_vec().unwrap()))
        .unwrap();
    assert_eq!(target.size(), source.size());
    for (set, &old) in sample_sets().iter().zip(&ids) {
        let index = target.get(mapping[old as usize]).unwrap();
        assert_eq!(index.index_type(), IndexType::FoR);
        assert_eq!(&index.to_vec(), set);
    }
}

#[test]
fn wrong_version_is_rejected() {
    let (factory, _) = filled_factory(IndexType::Native);
    let mut bytes = factory.flush_to_vec().unwrap();
    bytes[0] = STORE_VERSION + 1;
    assert!(matches!(
        ItemIndexStore::from_bytes(SharedBytes::from_vec(bytes)),
        Err(IndexError::VersionMismatch { .. })
    ));
}

#[test]
fn truncated_store_is_corrupt() {
    let (factory, _) = filled_factory(IndexType::RegLine);
    let bytes = factory.flush_to_vec().unwrap();
    for cut in [1, StoreHeader::SIZE - 1, StoreHeader::SIZE + 3, bytes.len() - 1] {
        let result = ItemIndexStore::from_bytes(SharedBytes::copy_from_slice(&bytes[..cut]));
        assert!(
            matches!(result, Err(IndexError::CorruptData(_))),
            "cut at {cut}: {result:?}"
        );
    }
}

#[test]
fn unknown_ids_are_out_of_bounds() {
    let (factory, _) = filled_factory(IndexType::Native);
    let store = ItemIndexStore::from_bytes(SharedBytes::from_vec(factory.flush_to_vec().unwrap()))
        .unwrap();
    let size = store.size();
    for id in [size, size + 1, u32::MAX] {
        assert!(matches!(store.get(id), Err(IndexError::OutOfBounds { .. })));
    }
}

#[test]
fn store_views_combine_with_in_memory_indexes() {
    let (factory, ids) = filled_factory(IndexType::FoR);
    let store = ItemIndexStore::from_bytes(SharedBytes::from_vec(factory.flush_to_vec().unwrap()))
        .unwrap();
    let a = store.get(ids[12]).unwrap();
    let b = ItemIndex::from_sorted(sample_sets()[13].clone()).unwrap();
    let union = &a | &b;
    let mut expected: Vec<u32> = sample_sets()[12].iter().chain(&sample_sets()[13]).copied().collect();
    expected.sort_unstable();
    expected.dedup();
    assert_eq!(union.to_vec(), expected);
}

#[test]
fn stats_cover_every_index() {
    let (factory, _) = filled_factory(IndexType::RegLine);
    let store = ItemIndexStore::from_bytes(SharedBytes::from_vec(factory.flush_to_vec().unwrap()))
        .unwrap();
    let stats = store.stats().unwrap();
    let elements: u64 = (0..store.size())
        .map(|id| store.get(id).unwrap().size() as u64)
        .sum();
    assert_eq!(stats.index_count, store.size());
    assert_eq!(stats.total_elements, elements);
    let bytes: u64 = stats.by_type.values().map(|t| t.bytes).sum();
    assert_eq!(bytes, stats.data_bytes);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arbitrary_sets_survive_a_store(
        sets in proptest::collection::vec(
            proptest::collection::btree_set(any::<u32>(), 0..50),
            0..20,
        ),
        ty in proptest::sample::select(vec![
            IndexType::Native,
            IndexType::BoundedCompactUintArray,
            IndexType::RegLine,
            IndexType::FoR,
        ]),
    ) {
        let factory = ItemIndexFactory::new(FactoryConfig::with_type(ty)).unwrap();
        let sets: Vec<Vec<u32>> = sets.into_iter().map(|s| s.into_iter().collect()).collect();
        let ids: Vec<u32> = sets.iter().map(|s| factory.add_sorted(s).unwrap()).collect();
        let store = ItemIndexStore::from_bytes(SharedBytes::from_vec(factory.flush_to_vec().unwrap())).unwrap();
        for (set, id) in sets.iter().zip(ids) {
            prop_assert_eq!(&store.get(id).unwrap().to_vec(), set);
        }
    }
}
