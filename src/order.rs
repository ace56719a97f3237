//! Traits and types for partially ordered versions.

use std::fmt::{Debug, Error, Formatter};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A type that is partially ordered.
///
/// This trait is distinct from Rust's `PartialOrd` trait, because the implementation
/// of that trait precludes a distinct `Ord` implementation. We need an independent
/// trait if we want to have a partially ordered type that can also be sorted.
pub trait PartialOrder: PartialEq {
    /// Returns true iff one element is strictly less than the other.
    fn less_than(&self, other: &Self) -> bool {
        self.less_equal(other) && self != other
    }
    /// Returns true iff one element is less than or equal to the other.
    fn less_equal(&self, other: &Self) -> bool;
}

macro_rules! implement_partial {
    ($($index_type:ty,)*) => (
        $(
            impl PartialOrder for $index_type {
                #[inline] fn less_than(&self, other: &Self) -> bool { self < other }
                #[inline] fn less_equal(&self, other: &Self) -> bool { self <= other }
            }
        )*
    )
}

implement_partial!(u8, u16, u32, u64, usize, (),);

/// A point in a partially ordered lattice of versions.
///
/// A version is a tuple of non-negative integers of some arity, ordered by the
/// product partial order: `u ≤ v` iff `u[i] ≤ v[i]` for every coordinate `i`.
/// Versions of equal arity form a lattice whose join is the componentwise maximum
/// and whose meet is the componentwise minimum.
///
/// The derived `Ord` implementation is lexicographic. At equal arity it is a linear
/// extension of the product order, which lets versions key ordered containers and
/// be processed in an order compatible with the partial order.
///
/// The `extend` and `truncate` methods move versions in and out of iterative
/// subgraphs, which run at one higher arity with a trailing iteration coordinate.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Version {
    coords: SmallVec<[u64; 4]>,
}

impl Version {
    /// Creates a version from its coordinates.
    pub fn new<I: IntoIterator<Item = u64>>(coords: I) -> Self {
        let coords: SmallVec<[u64; 4]> = coords.into_iter().collect();
        assert!(!coords.is_empty(), "a version must have arity at least one");
        Version { coords }
    }

    /// The least version of the given arity: all coordinates zero.
    pub fn minimum(arity: usize) -> Self {
        Version::new(std::iter::repeat(0).take(arity))
    }

    /// The number of coordinates.
    pub fn arity(&self) -> usize {
        self.coords.len()
    }

    /// The coordinates themselves.
    pub fn coords(&self) -> &[u64] {
        &self.coords
    }

    /// Appends a zero coordinate, moving the version into an iterative subgraph.
    pub fn extend(&self) -> Self {
        let mut coords = self.coords.clone();
        coords.push(0);
        Version { coords }
    }

    /// Drops the trailing coordinate, moving the version out of an iterative subgraph.
    pub fn truncate(&self) -> Self {
        assert!(self.arity() > 1, "cannot truncate a version of arity one");
        let mut coords = self.coords.clone();
        coords.pop();
        Version { coords }
    }

    /// The version reached by advancing the trailing coordinate by `step`.
    ///
    /// This is the path summary of the feedback edge in an iterative subgraph.
    pub fn results_in(&self, step: u64) -> Self {
        let mut coords = self.coords.clone();
        let last = coords.len() - 1;
        coords[last] = coords[last].saturating_add(step);
        Version { coords }
    }
}

impl PartialOrder for Version {
    #[inline]
    fn less_equal(&self, other: &Self) -> bool {
        debug_assert_eq!(self.arity(), other.arity());
        self.coords
            .iter()
            .zip(other.coords.iter())
            .all(|(a, b)| a <= b)
    }
}

impl From<Vec<u64>> for Version {
    fn from(coords: Vec<u64>) -> Self {
        Version::new(coords)
    }
}

impl From<&[u64]> for Version {
    fn from(coords: &[u64]) -> Self {
        Version::new(coords.iter().copied())
    }
}

// Debug implementation to avoid seeing the backing container.
impl Debug for Version {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let mut tuple = f.debug_tuple("");
        for coord in self.coords.iter() {
            tuple.field(coord);
        }
        tuple.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_order() {
        let a = Version::from(vec![0, 1]);
        let b = Version::from(vec![1, 0]);
        let c = Version::from(vec![1, 1]);

        assert!(!a.less_equal(&b));
        assert!(!b.less_equal(&a));
        assert!(a.less_equal(&c));
        assert!(b.less_equal(&c));
        assert!(a.less_than(&c));
        assert!(!c.less_than(&c));
        assert!(c.less_equal(&c));
    }

    #[test]
    fn lexicographic_extends_product() {
        // At equal arity, `u ≤ v` in the product order implies `u <= v` in `Ord`.
        let versions = [
            Version::from(vec![0, 0]),
            Version::from(vec![0, 2]),
            Version::from(vec![1, 1]),
            Version::from(vec![2, 0]),
        ];
        for u in versions.iter() {
            for v in versions.iter() {
                if u.less_equal(v) {
                    assert!(u <= v);
                }
            }
        }
    }

    #[test]
    fn extend_truncate() {
        let v = Version::from(vec![3]);
        assert_eq!(v.extend(), Version::from(vec![3, 0]));
        assert_eq!(v.extend().results_in(1), Version::from(vec![3, 1]));
        assert_eq!(v.extend().truncate(), v);
    }
}
