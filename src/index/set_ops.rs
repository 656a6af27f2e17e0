//! Set algebra over item indexes.
//!
//! Every operation is one two-pointer [`merge`] over the ascending element
//! streams of both operands. The dispatch below only chooses which concrete
//! iterator types get monomorphized; results default to the native codec.

use crate::index::codec::NativeWriter;
use crate::index::error::IndexResult;
use crate::index::item_index::{ItemIndex, Iter, Repr};
use crate::index::types::{EncodeOptions, IndexType, SetOp};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

/// Total element count above which multi-way merges fork onto rayon
const PARALLEL_THRESHOLD: u64 = 1 << 16;

/// Merge two ascending streams, emitting every element `op` keeps
pub fn merge<A, B, F>(left: A, right: B, op: SetOp, mut emit: F)
where
    A: IntoIterator<Item = u32>,
    B: IntoIterator<Item = u32>,
    F: FnMut(u32),
{
    merge_while(left, right, op, |value| {
        emit(value);
        true
    });
}

/// Like [`merge`], but stops as soon as `emit` returns `false`
pub fn merge_while<A, B, F>(left: A, right: B, op: SetOp, mut emit: F)
where
    A: IntoIterator<Item = u32>,
    B: IntoIterator<Item = u32>,
    F: FnMut(u32) -> bool,
{
    let mut left = left.into_iter();
    let mut right = right.into_iter();
    let mut a = left.next();
    let mut b = right.next();

    loop {
        match (a, b) {
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Less => {
                    if op.keeps_left() && !emit(x) {
                        return;
                    }
                    a = left.next();
                }
                Ordering::Greater => {
                    if op.keeps_right() && !emit(y) {
                        return;
                    }
                    b = right.next();
                }
                Ordering::Equal => {
                    if op.keeps_both() && !emit(x) {
                        return;
                    }
                    a = left.next();
                    b = right.next();
                }
            },
            (Some(x), None) => {
                if op.keeps_left() && emit(x) {
                    for value in left {
                        if !emit(value) {
                            break;
                        }
                    }
                }
                return;
            }
            (None, Some(y)) => {
                if op.keeps_right() && emit(y) {
                    for value in right {
                        if !emit(value) {
                            break;
                        }
                    }
                }
                return;
            }
            (None, None) => return,
        }
    }
}

/// Advance `stream` past every value below `target` and peek the next one
fn skip_below(stream: &mut Peekable<Iter<'_>>, target: u32) -> Option<u32> {
    while let Some(&value) = stream.peek() {
        if value >= target {
            return Some(value);
        }
        stream.next();
    }
    None
}

/// Walk the values common to every `intersect` operand and absent from every
/// `subtract` operand in ascending order, until `emit` returns `false`
fn sweep<F>(intersect: &[ItemIndex], subtract: &[ItemIndex], mut emit: F)
where
    F: FnMut(u32) -> bool,
{
    let mut order: Vec<&ItemIndex> = intersect.iter().collect();
    order.sort_by_key(|index| index.size());
    let Some((smallest, rest)) = order.split_first() else {
        return;
    };
    let mut required: Vec<_> = rest.iter().map(|index| index.iter().peekable()).collect();
    let mut excluded: Vec<_> = subtract.iter().map(|index| index.iter().peekable()).collect();

    'candidates: for candidate in smallest.iter() {
        for stream in &mut required {
            match skip_below(stream, candidate) {
                None => return,
                Some(value) if value != candidate => continue 'candidates,
                Some(_) => {}
            }
        }
        for stream in &mut excluded {
            if skip_below(stream, candidate) == Some(candidate) {
                continue 'candidates;
            }
        }
        if !emit(candidate) {
            return;
        }
    }
}

/// Collect at most `count` values passing `filter` into a native index
fn limited<F, W>(count: u32, capacity: usize, filter: F, walk: W) -> ItemIndex
where
    F: Fn(u32) -> bool,
    W: FnOnce(&mut dyn FnMut(u32) -> bool),
{
    let mut writer = NativeWriter::with_capacity(capacity.min(count as usize));
    if count > 0 {
        walk(&mut |value| {
            if filter(value) {
                writer.push(value);
            }
            writer.len() < count
        });
    }
    writer.finish()
}

/// Result fully determined by an empty operand
fn short_circuit(left: &ItemIndex, right: &ItemIndex, op: SetOp) -> Option<ItemIndex> {
    match (left.is_empty(), right.is_empty()) {
        (false, false) => None,
        (true, _) => Some(match op {
            SetOp::Union | SetOp::SymmetricDifference => right.clone(),
            SetOp::Intersection | SetOp::Difference => ItemIndex::empty(),
        }),
        (false, true) => Some(match op {
            SetOp::Union | SetOp::SymmetricDifference | SetOp::Difference => left.clone(),
            SetOp::Intersection => ItemIndex::empty(),
        }),
    }
}

/// Contiguous ranges stay ranges under intersection and touching union
fn range_fast_path(left: &ItemIndex, right: &ItemIndex, op: SetOp) -> Option<ItemIndex> {
    let (Repr::Range(a), Repr::Range(b)) = (&left.repr, &right.repr) else {
        return None;
    };
    if a.stride() != 1 || b.stride() != 1 {
        return None;
    }
    let lo = a.begin().max(b.begin());
    let hi = a.end().min(b.end());
    match op {
        SetOp::Intersection if lo as u64 >= hi => Some(ItemIndex::empty()),
        SetOp::Intersection => ItemIndex::from_range(lo, hi, 1).ok(),
        SetOp::Union if lo as u64 <= hi => {
            ItemIndex::from_range(a.begin().min(b.begin()), a.end().max(b.end()), 1).ok()
        }
        _ => None,
    }
}

impl ItemIndex {
    /// Apply `op`, producing a native index unless an operand can be reused
    pub fn apply(&self, other: &ItemIndex, op: SetOp) -> ItemIndex {
        if let Some(result) = short_circuit(self, other, op) {
            return result;
        }
        if let Some(result) = range_fast_path(self, other, op) {
            return result;
        }

        let mut writer = NativeWriter::with_capacity(op.size_bound(self.size(), other.size()));
        let emit = |value| writer.push(value);
        match (&self.repr, &other.repr) {
            (Repr::Vector(a), Repr::Vector(b)) => merge(
                a.as_slice().iter().copied(),
                b.as_slice().iter().copied(),
                op,
                emit,
            ),
            (Repr::Native(a), Repr::Native(b)) => merge(a.iter(), b.iter(), op, emit),
            _ => merge(self.iter(), other.iter(), op, emit),
        }
        writer.finish()
    }

    /// Apply `op` and encode the result with codec `ty`
    pub fn apply_as(&self, other: &ItemIndex, op: SetOp, ty: IndexType) -> IndexResult<ItemIndex> {
        self.apply_as_with(other, op, ty, &EncodeOptions::default())
    }

    pub fn apply_as_with(
        &self,
        other: &ItemIndex,
        op: SetOp,
        ty: IndexType,
        options: &EncodeOptions,
    ) -> IndexResult<ItemIndex> {
        if ty == IndexType::Native || ty == IndexType::Vector {
            let mut values = Vec::with_capacity(op.size_bound(self.size(), other.size()));
            merge(self.iter(), other.iter(), op, |value| values.push(value));
            return ItemIndex::encode_sorted(&values, ty, options);
        }
        self.apply(other, op).convert_with(ty, options)
    }

    pub fn union(&self, other: &ItemIndex) -> ItemIndex {
        self.apply(other, SetOp::Union)
    }

    pub fn intersection(&self, other: &ItemIndex) -> ItemIndex {
        self.apply(other, SetOp::Intersection)
    }

    /// Elements of `self` that are not in `other`
    pub fn difference(&self, other: &ItemIndex) -> ItemIndex {
        self.apply(other, SetOp::Difference)
    }

    pub fn symmetric_difference(&self, other: &ItemIndex) -> ItemIndex {
        self.apply(other, SetOp::SymmetricDifference)
    }

    pub fn union_as(&self, other: &ItemIndex, ty: IndexType) -> IndexResult<ItemIndex> {
        self.apply_as(other, SetOp::Union, ty)
    }

    pub fn intersection_as(&self, other: &ItemIndex, ty: IndexType) -> IndexResult<ItemIndex> {
        self.apply_as(other, SetOp::Intersection, ty)
    }

    pub fn difference_as(&self, other: &ItemIndex, ty: IndexType) -> IndexResult<ItemIndex> {
        self.apply_as(other, SetOp::Difference, ty)
    }

    pub fn symmetric_difference_as(
        &self,
        other: &ItemIndex,
        ty: IndexType,
    ) -> IndexResult<ItemIndex> {
        self.apply_as(other, SetOp::SymmetricDifference, ty)
    }

    /// The `count` smallest values of `self ∪ other`
    pub fn unite_k(&self, other: &ItemIndex, count: u32) -> ItemIndex {
        let bound = SetOp::Union.size_bound(self.size(), other.size());
        limited(count, bound, |_| true, |emit| {
            merge_while(self.iter(), other.iter(), SetOp::Union, emit)
        })
    }

    /// The `count` smallest values of the intersection of `indexes` that pass
    /// `filter`; empty when no index is given
    pub fn constrained_intersect<F>(indexes: &[ItemIndex], count: u32, filter: F) -> ItemIndex
    where
        F: Fn(u32) -> bool,
    {
        Self::fused_intersect_difference(indexes, &[], count, filter)
    }

    /// The `count` smallest values that lie in every `intersect` index, in no
    /// `subtract` index and pass `filter`
    ///
    /// The operands are streamed together, so the work stops once `count`
    /// values are found.
    pub fn fused_intersect_difference<F>(
        intersect: &[ItemIndex],
        subtract: &[ItemIndex],
        count: u32,
        filter: F,
    ) -> ItemIndex
    where
        F: Fn(u32) -> bool,
    {
        if intersect.iter().any(ItemIndex::is_empty) {
            return ItemIndex::empty();
        }
        let bound = intersect.iter().map(|index| index.size() as usize).min().unwrap_or(0);
        limited(count, bound, filter, |emit| sweep(intersect, subtract, emit))
    }

    /// Union of all `indexes`, merged as a balanced tree
    pub fn unite_all(indexes: &[ItemIndex]) -> ItemIndex {
        let refs: Vec<&ItemIndex> = indexes.iter().collect();
        merge_tree(&refs, SetOp::Union)
    }

    /// Intersection of all `indexes`; empty when none are given
    pub fn intersect_all(indexes: &[ItemIndex]) -> ItemIndex {
        if indexes.iter().any(ItemIndex::is_empty) {
            return ItemIndex::empty();
        }
        // Sort by size for efficient intersection
        let mut refs: Vec<&ItemIndex> = indexes.iter().collect();
        refs.sort_by_key(|index| index.size());
        merge_tree(&refs, SetOp::Intersection)
    }
}

fn merge_tree(indexes: &[&ItemIndex], op: SetOp) -> ItemIndex {
    match indexes {
        [] => ItemIndex::empty(),
        [only] => (*only).clone(),
        _ => {
            let (left, right) = indexes.split_at(indexes.len() / 2);
            let total: u64 = indexes.iter().map(|index| index.size() as u64).sum();
            let (left, right) = if total >= PARALLEL_THRESHOLD {
                rayon::join(|| merge_tree(left, op), || merge_tree(right, op))
            } else {
                (merge_tree(left, op), merge_tree(right, op))
            };
            left.apply(&right, op)
        }
    }
}

macro_rules! set_operator {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:expr) => {
        impl $trait<&ItemIndex> for &ItemIndex {
            type Output = ItemIndex;

            fn $method(self, rhs: &ItemIndex) -> ItemIndex {
                self.apply(rhs, $op)
            }
        }

        impl $trait for ItemIndex {
            type Output = ItemIndex;

            fn $method(self, rhs: ItemIndex) -> ItemIndex {
                self.apply(&rhs, $op)
            }
        }

        impl $assign_trait<&ItemIndex> for ItemIndex {
            fn $assign_method(&mut self, rhs: &ItemIndex) {
                *self = self.apply(rhs, $op);
            }
        }
    };
}

set_operator!(BitOr, bitor, BitOrAssign, bitor_assign, SetOp::Union);
set_operator!(BitAnd, bitand, BitAndAssign, bitand_assign, SetOp::Intersection);
set_operator!(Sub, sub, SubAssign, sub_assign, SetOp::Difference);
set_operator!(BitXor, bitxor, BitXorAssign, bitxor_assign, SetOp::SymmetricDifference);
