//! The store load model.
//!
//! Every quantity is a 3-tuple of byte rate, key rate, and hot-replica
//! count. `StoreLoad` is what a store carries; `Influence` is what one
//! in-flight operator will shift between two stores once it completes;
//! `LoadPred` bundles the observed load with a projection and the
//! cluster-wide expectation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreLoad {
    pub byte_rate: f64,
    pub key_rate: f64,
    pub count: f64,
}

impl StoreLoad {
    pub fn min_of(a: StoreLoad, b: StoreLoad) -> StoreLoad {
        StoreLoad {
            byte_rate: a.byte_rate.min(b.byte_rate),
            key_rate: a.key_rate.min(b.key_rate),
            count: a.count.min(b.count),
        }
    }

    pub fn max_of(a: StoreLoad, b: StoreLoad) -> StoreLoad {
        StoreLoad {
            byte_rate: a.byte_rate.max(b.byte_rate),
            key_rate: a.key_rate.max(b.key_rate),
            count: a.count.max(b.count),
        }
    }

    fn sub(self, other: StoreLoad) -> StoreLoad {
        StoreLoad {
            byte_rate: self.byte_rate - other.byte_rate,
            key_rate: self.key_rate - other.key_rate,
            count: self.count - other.count,
        }
    }

    /// Project this load forward by the store's net pending influence.
    pub fn to_load_pred(self, pending: Influence) -> LoadPred {
        let future = StoreLoad {
            byte_rate: self.byte_rate + pending.byte_rate,
            key_rate: self.key_rate + pending.key_rate,
            count: self.count + pending.count,
        };
        LoadPred {
            current: self,
            future,
            expect: StoreLoad::default(),
        }
    }
}

/// The load one operator will shift from its source to its destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub byte_rate: f64,
    pub key_rate: f64,
    pub count: f64,
}

impl Influence {
    /// Accumulate `other`, scaled by `weight`. Negative weights subtract.
    pub fn add(self, other: &Influence, weight: f64) -> Influence {
        Influence {
            byte_rate: self.byte_rate + other.byte_rate * weight,
            key_rate: self.key_rate + other.key_rate * weight,
            count: self.count + other.count * weight,
        }
    }
}

/// Observed, projected, and expected load of a store.
///
/// `future` may go negative coordinatewise when outbound influence
/// exceeds the observed load; the comparators clamp by taking the min
/// or max against `current`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadPred {
    pub current: StoreLoad,
    pub future: StoreLoad,
    /// Cluster-wide mean load, broadcast into every store's prediction.
    pub expect: StoreLoad,
}

impl LoadPred {
    /// Optimistic bound: the best case for evaluating a source store.
    pub fn min(&self) -> StoreLoad {
        StoreLoad::min_of(self.current, self.future)
    }

    /// Pessimistic bound: the worst case for evaluating a destination.
    pub fn max(&self) -> StoreLoad {
        StoreLoad::max_of(self.current, self.future)
    }

    /// Width of the prediction envelope.
    pub fn diff(&self) -> StoreLoad {
        self.max().sub(self.min())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(byte_rate: f64, key_rate: f64, count: f64) -> StoreLoad {
        StoreLoad {
            byte_rate,
            key_rate,
            count,
        }
    }

    #[test]
    fn min_max_are_coordinatewise() {
        let a = load(10.0, 2.0, 5.0);
        let b = load(3.0, 7.0, 5.0);

        assert_eq!(StoreLoad::min_of(a, b), load(3.0, 2.0, 5.0));
        assert_eq!(StoreLoad::max_of(a, b), load(10.0, 7.0, 5.0));
    }

    #[test]
    fn pred_bounds_clamp_negative_future() {
        // Outbound influence exceeding current load drives future negative.
        let pred = load(10.0, 10.0, 1.0).to_load_pred(Influence {
            byte_rate: -15.0,
            key_rate: -5.0,
            count: -1.0,
        });

        assert_eq!(pred.future, load(-5.0, 5.0, 0.0));
        assert_eq!(pred.min(), load(-5.0, 5.0, 0.0));
        assert_eq!(pred.max(), pred.current);
        assert_eq!(pred.diff(), load(15.0, 5.0, 1.0));
    }

    #[test]
    fn influence_add_is_weighted() {
        let base = Influence::default();
        let delta = Influence {
            byte_rate: 100.0,
            key_rate: 10.0,
            count: 1.0,
        };

        let half = base.add(&delta, 0.5);
        assert_eq!(half.byte_rate, 50.0);
        assert_eq!(half.key_rate, 5.0);
        assert_eq!(half.count, 0.5);

        let back = half.add(&delta, -0.5);
        assert_eq!(back, Influence::default());
    }
}
