#![no_main]

use arbitrary::Arbitrary;
use itemidx::index::{IndexType, ItemIndex, SetOp};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

#[derive(Debug, Arbitrary)]
struct Input {
    left: BTreeSet<u32>,
    right: BTreeSet<u32>,
    left_codec: u8,
    right_codec: u8,
    op: u8,
}

const CODECS: [IndexType; 5] = [
    IndexType::Native,
    IndexType::Vector,
    IndexType::BoundedCompactUintArray,
    IndexType::RegLine,
    IndexType::FoR,
];

const OPS: [SetOp; 4] = [
    SetOp::Union,
    SetOp::Intersection,
    SetOp::Difference,
    SetOp::SymmetricDifference,
];

fuzz_target!(|input: Input| {
    let left: Vec<u32> = input.left.iter().copied().collect();
    let right: Vec<u32> = input.right.iter().copied().collect();
    let a = ItemIndex::encode(&left, CODECS[input.left_codec as usize % CODECS.len()]).unwrap();
    let b = ItemIndex::encode(&right, CODECS[input.right_codec as usize % CODECS.len()]).unwrap();
    let op = OPS[input.op as usize % OPS.len()];

    let expected: Vec<u32> = match op {
        SetOp::Union => input.left.union(&input.right).copied().collect(),
        SetOp::Intersection => input.left.intersection(&input.right).copied().collect(),
        SetOp::Difference => input.left.difference(&input.right).copied().collect(),
        SetOp::SymmetricDifference => input
            .left
            .symmetric_difference(&input.right)
            .copied()
            .collect(),
    };
    assert_eq!(a.apply(&b, op).to_vec(), expected);

    let limit = input.op as u32;
    let union: Vec<u32> = input.left.union(&input.right).copied().take(limit as usize).collect();
    assert_eq!(a.unite_k(&b, limit).to_vec(), union);
});
