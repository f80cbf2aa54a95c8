//! Composable load comparators.
//!
//! The solver ranks stores with small comparator closures composed out
//! of a handful of combinators: lexicographic chains (`slice_*`), sign
//! flips (`neg_load_cmp`), projections onto the optimistic or
//! pessimistic bound (`min_lp_cmp` / `max_lp_cmp`), and envelope width
//! (`diff_cmp`). Every numeric comparison goes through `step_rank`, a
//! step quantizer that treats sub-step differences as ties so the
//! scheduler does not oscillate between near-identical candidates.

use std::cmp::Ordering;

use crate::load::{LoadPred, StoreLoad};

pub type LoadCmp = Box<dyn Fn(&StoreLoad, &StoreLoad) -> Ordering>;
pub type LoadPredCmp = Box<dyn Fn(&LoadPred, &LoadPred) -> Ordering>;

pub fn byte_rate(load: &StoreLoad) -> f64 {
    load.byte_rate
}

pub fn key_rate(load: &StoreLoad) -> f64 {
    load.key_rate
}

pub fn count(load: &StoreLoad) -> f64 {
    load.count
}

/// Quantize a value into integer steps away from `zero`.
///
/// A step of 0 degenerates to exact comparison: the f64→i64 cast
/// saturates, so any nonzero offset lands on `i64::MIN`/`i64::MAX` and
/// only exact equality ranks as a tie.
pub fn step_rank(zero: f64, step: f64) -> impl Fn(f64) -> i64 {
    move |value| ((value - zero) / step) as i64
}

/// Compare two values by their quantized ranks.
pub fn rank_cmp(a: f64, b: f64, rank: impl Fn(f64) -> i64) -> Ordering {
    rank(a).cmp(&rank(b))
}

/// Compare one dimension of a load through a rank quantizer.
pub fn rank_load_cmp(
    dim: fn(&StoreLoad) -> f64,
    rank: impl Fn(f64) -> i64 + 'static,
) -> LoadCmp {
    Box::new(move |a, b| rank_cmp(dim(a), dim(b), &rank))
}

/// First non-equal result wins.
pub fn slice_load_cmp(cmps: Vec<LoadCmp>) -> LoadCmp {
    Box::new(move |a, b| {
        cmps.iter()
            .map(|cmp| cmp(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    })
}

pub fn neg_load_cmp(cmp: LoadCmp) -> LoadCmp {
    Box::new(move |a, b| cmp(a, b).reverse())
}

/// First non-equal result wins, over load predictions.
pub fn slice_lp_cmp(cmps: Vec<LoadPredCmp>) -> LoadPredCmp {
    Box::new(move |a, b| {
        cmps.iter()
            .map(|cmp| cmp(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    })
}

/// Compare predictions by their optimistic bounds.
pub fn min_lp_cmp(cmp: LoadCmp) -> LoadPredCmp {
    Box::new(move |a, b| cmp(&a.min(), &b.min()))
}

/// Compare predictions by their pessimistic bounds.
pub fn max_lp_cmp(cmp: LoadCmp) -> LoadPredCmp {
    Box::new(move |a, b| cmp(&a.max(), &b.max()))
}

/// Compare predictions by envelope width; tighter envelopes (less
/// uncertainty) rank smaller.
pub fn diff_cmp(cmp: LoadCmp) -> LoadPredCmp {
    Box::new(move |a, b| cmp(&a.diff(), &b.diff()))
}
