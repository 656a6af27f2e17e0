//! Property-based tests for codecs and set algebra.
//!
//! Every law is checked across all codec combinations, with `RoaringBitmap`
//! as the reference implementation.

use itemidx::index::{IndexError, IndexType, ItemIndex, SetOp};
use itemidx::utils::SharedBytes;
use proptest::prelude::*;
use roaring::RoaringBitmap;

const CODECS: [IndexType; 5] = [
    IndexType::Native,
    IndexType::Vector,
    IndexType::BoundedCompactUintArray,
    IndexType::RegLine,
    IndexType::FoR,
];

/// Sorted, unique ids drawn from `0..universe`
fn sorted_unique_ids(max_len: usize, universe: u32) -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::btree_set(0..universe, 0..=max_len)
        .prop_map(|set| set.into_iter().collect())
}

/// Sparse ids with large gaps, typical of postings lists
fn sparse_ids(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::btree_set(any::<u32>(), 0..=max_len)
        .prop_map(|set| set.into_iter().collect())
}

/// Consecutive runs, typical of cell ranges
fn dense_ids(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    (0..100_000u32, 0..=max_len).prop_map(|(start, len)| (start..start + len as u32).collect())
}

fn any_ids() -> impl Strategy<Value = Vec<u32>> {
    prop_oneof![
        sorted_unique_ids(300, 2_000),
        sparse_ids(200),
        dense_ids(400),
    ]
}

fn codec() -> impl Strategy<Value = IndexType> {
    proptest::sample::select(CODECS.to_vec())
}

fn index(values: &[u32], ty: IndexType) -> ItemIndex {
    ItemIndex::encode(values, ty).expect("sorted input encodes")
}

fn oracle(values: &[u32]) -> RoaringBitmap {
    values.iter().copied().collect()
}

fn expected(a: &[u32], b: &[u32], op: SetOp) -> Vec<u32> {
    let (a, b) = (oracle(a), oracle(b));
    let result = match op {
        SetOp::Union => a | b,
        SetOp::Intersection => a & b,
        SetOp::Difference => a - b,
        SetOp::SymmetricDifference => a ^ b,
    };
    result.iter().collect()
}

const OPS: [SetOp; 4] = [
    SetOp::Union,
    SetOp::Intersection,
    SetOp::Difference,
    SetOp::SymmetricDifference,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // =======================================================================
    // CODECS: decode(encode(S)) == S and at(pos) is the pos-th smallest
    // =======================================================================

    #[test]
    fn roundtrip_every_codec(values in any_ids(), ty in codec()) {
        let encoded = index(&values, ty);
        prop_assert_eq!(encoded.size() as usize, values.len());
        prop_assert_eq!(encoded.to_vec(), values.clone());

        let decoded = ItemIndex::from_bytes(SharedBytes::from_vec(encoded.to_bytes())).unwrap();
        prop_assert_eq!(decoded.to_vec(), values);
    }

    #[test]
    fn random_access_agrees(values in any_ids(), ty in codec()) {
        let encoded = index(&values, ty);
        for (pos, &value) in values.iter().enumerate() {
            prop_assert_eq!(encoded.at(pos as u32).unwrap(), value);
            prop_assert_eq!(encoded.find(value), Some(pos as u32));
        }
    }

    #[test]
    fn out_of_bounds_always_errors(values in any_ids(), ty in codec(), k in 0u32..1_000) {
        let encoded = index(&values, ty);
        let pos = encoded.size().saturating_add(k);
        let is_oob = matches!(encoded.at(pos), Err(IndexError::OutOfBounds { .. }));
        prop_assert!(is_oob);
    }

    // =======================================================================
    // SET ALGEBRA against the bitmap oracle, all codec pairs
    // =======================================================================

    #[test]
    fn operations_match_oracle(
        a in any_ids(),
        b in any_ids(),
        ta in codec(),
        tb in codec(),
    ) {
        let (ia, ib) = (index(&a, ta), index(&b, tb));
        for op in OPS {
            prop_assert_eq!(ia.apply(&ib, op).to_vec(), expected(&a, &b, op), "{:?}", op);
        }
        prop_assert_eq!((&ia | &ib).to_vec(), expected(&a, &b, SetOp::Union));
        prop_assert_eq!((&ia & &ib).to_vec(), expected(&a, &b, SetOp::Intersection));
        prop_assert_eq!((&ia - &ib).to_vec(), expected(&a, &b, SetOp::Difference));
        prop_assert_eq!((&ia ^ &ib).to_vec(), expected(&a, &b, SetOp::SymmetricDifference));
    }

    #[test]
    fn commutative_laws(a in any_ids(), b in any_ids(), ta in codec(), tb in codec()) {
        let (ia, ib) = (index(&a, ta), index(&b, tb));
        prop_assert_eq!(&ia | &ib, &ib | &ia);
        prop_assert_eq!(&ia & &ib, &ib & &ia);
        prop_assert_eq!(&ia ^ &ib, &ib ^ &ia);
    }

    #[test]
    fn associative_laws(
        a in any_ids(),
        b in any_ids(),
        c in any_ids(),
        ta in codec(),
        tb in codec(),
        tc in codec(),
    ) {
        let (ia, ib, ic) = (index(&a, ta), index(&b, tb), index(&c, tc));
        prop_assert_eq!(&(&ia | &ib) | &ic, &ia | &(&ib | &ic));
        prop_assert_eq!(&(&ia & &ib) & &ic, &ia & &(&ib & &ic));
    }

    #[test]
    fn identity_laws(a in any_ids(), b in any_ids(), ta in codec(), tb in codec()) {
        let (ia, ib) = (index(&a, ta), index(&b, tb));
        let empty = ItemIndex::empty();
        prop_assert_eq!(&ia & &ia, ia.clone());
        prop_assert_eq!(&ia | &empty, ia.clone());
        prop_assert!((&ia - &ia).is_empty());
        prop_assert!((&(&ia - &ib) & &ib).is_empty());
    }

    #[test]
    fn requested_codec_is_honoured(a in any_ids(), b in any_ids(), ty in codec()) {
        let (ia, ib) = (index(&a, IndexType::RegLine), index(&b, IndexType::FoR));
        let result = ia.union_as(&ib, ty).unwrap();
        prop_assert_eq!(result.index_type(), ty);
        prop_assert_eq!(result.to_vec(), expected(&a, &b, SetOp::Union));
    }

    #[test]
    fn multiway_matches_oracle(sets in proptest::collection::vec(any_ids(), 0..8), ty in codec()) {
        let indexes: Vec<ItemIndex> = sets.iter().map(|s| index(s, ty)).collect();

        let union: RoaringBitmap = sets.iter().flatten().copied().collect();
        prop_assert_eq!(ItemIndex::unite_all(&indexes).to_vec(), union.iter().collect::<Vec<_>>());

        let intersection = sets
            .iter()
            .map(|s| oracle(s))
            .reduce(|acc, s| acc & s)
            .unwrap_or_default();
        prop_assert_eq!(
            ItemIndex::intersect_all(&indexes).to_vec(),
            intersection.iter().collect::<Vec<_>>()
        );
    }

    // =======================================================================
    // RANGES: implicit progressions combine like any other codec
    // =======================================================================

    #[test]
    fn ranges_match_oracle(
        begin_a in 0u32..500,
        len_a in 0u64..300,
        stride_a in 1u32..4,
        begin_b in 0u32..500,
        len_b in 0u64..300,
        stride_b in 1u32..4,
        other in any_ids(),
        ty in codec(),
    ) {
        let ra = ItemIndex::from_range(begin_a, begin_a as u64 + len_a, stride_a).unwrap();
        let rb = ItemIndex::from_range(begin_b, begin_b as u64 + len_b, stride_b).unwrap();
        let (a, b) = (ra.to_vec(), rb.to_vec());
        let io = index(&other, ty);

        for op in OPS {
            prop_assert_eq!(ra.apply(&rb, op).to_vec(), expected(&a, &b, op), "{:?}", op);
            prop_assert_eq!(ra.apply(&io, op).to_vec(), expected(&a, &other, op), "{:?}", op);
        }
        for value in a.iter().copied() {
            prop_assert!(ra.contains(value));
        }
    }

    // =======================================================================
    // LIMITED MERGES: the first `count` values of the full result
    // =======================================================================

    #[test]
    fn unite_k_is_union_prefix(
        a in any_ids(),
        b in any_ids(),
        ta in codec(),
        tb in codec(),
        count in 0u32..500,
    ) {
        let (ia, ib) = (index(&a, ta), index(&b, tb));
        let union = oracle(&a) | oracle(&b);
        let prefix: Vec<u32> = union.iter().take(count as usize).collect();
        prop_assert_eq!(ia.unite_k(&ib, count).to_vec(), prefix);
    }

    #[test]
    fn fused_intersect_difference_matches_oracle(
        intersect in proptest::collection::vec(sorted_unique_ids(300, 600), 1..5),
        subtract in proptest::collection::vec(sorted_unique_ids(100, 600), 0..4),
        ty in codec(),
        count in 0u32..200,
        modulus in 1u32..4,
    ) {
        let ii: Vec<ItemIndex> = intersect.iter().map(|s| index(s, ty)).collect();
        let si: Vec<ItemIndex> = subtract.iter().map(|s| index(s, IndexType::Native)).collect();

        let common = intersect
            .iter()
            .map(|s| oracle(s))
            .reduce(|acc, s| acc & s)
            .unwrap_or_default();
        let removed: RoaringBitmap = subtract.iter().flatten().copied().collect();
        let keep = |v: u32| v % modulus == 0;

        let fused: Vec<u32> = (&common - &removed)
            .iter()
            .filter(|&v| keep(v))
            .take(count as usize)
            .collect();
        prop_assert_eq!(
            ItemIndex::fused_intersect_difference(&ii, &si, count, keep).to_vec(),
            fused
        );

        let constrained: Vec<u32> = common
            .iter()
            .filter(|&v| keep(v))
            .take(count as usize)
            .collect();
        prop_assert_eq!(ItemIndex::constrained_intersect(&ii, count, keep).to_vec(), constrained);
    }

    // =======================================================================
    // DECODING: arbitrary bytes either fail or yield an ascending set
    // =======================================================================

    #[test]
    fn decoded_bytes_ascend(tag in 1u8..=5, payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&payload);
        if let Ok(decoded) = ItemIndex::from_bytes(SharedBytes::from_vec(bytes)) {
            let values: Vec<u32> = decoded.iter().take(4_096).collect();
            prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn bitmap_roundtrip(values in any_ids(), ty in codec()) {
        let encoded = index(&values, ty);
        let bitmap = encoded.to_bitmap();
        prop_assert_eq!(bitmap.len(), values.len() as u64);
        prop_assert_eq!(ItemIndex::from_bitmap(&bitmap, ty).unwrap(), encoded);
    }
}

#[test]
fn regression_line_small_set() {
    let encoded = index(&[3, 7, 9, 100], IndexType::RegLine);
    assert_eq!(encoded.at(0).unwrap(), 3);
    assert_eq!(encoded.at(1).unwrap(), 7);
    assert_eq!(encoded.at(2).unwrap(), 9);
    assert_eq!(encoded.at(3).unwrap(), 100);
    assert!(encoded.at(4).is_err());
}

#[test]
fn extreme_values_in_every_codec() {
    let values = [0, 1, u32::MAX / 2, u32::MAX - 1, u32::MAX];
    for ty in CODECS {
        let encoded = index(&values, ty);
        assert_eq!(encoded.to_vec(), values, "{ty}");
        assert_eq!(encoded.last().unwrap(), u32::MAX);
    }
}
