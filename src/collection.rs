//! Multisets of records with signed multiplicities.
//!
//! A [`Collection`] is the value that flows through the dataflow graph, one batch per
//! version: an unordered multiset in which each record carries a signed multiplicity.
//! Negative multiplicities are what make a collection usable as a *difference*; a
//! collection all of whose multiplicities cancel is equal to the empty collection.
//!
//! The linear operations (`map`, `filter`, `negate`, `concat`) commute with addition,
//! which is what lets the incremental operators process differences instead of whole
//! collections. The key-aware operations (`join`, `reduce_by_key` and its derivatives)
//! are also provided here in value-level form; the incremental runtime does not use
//! them directly, but they serve as the non-incremental reference semantics.

use std::collections::BTreeMap;
use std::ops::{Add, Neg};

use fnv::FnvHashMap;

use crate::consolidation;
use crate::{Data, Diff};

/// A multiset of records with signed multiplicities.
///
/// The backing vector is not necessarily consolidated: the same record may appear in
/// several entries, and entries may carry zero multiplicity. Equality is semantic, so
/// none of this is observable without inspecting the raw updates.
///
/// # Examples
///
/// ```
/// use deltaflow::Collection;
///
/// let a = Collection::from(vec![("cat", 2), ("dog", 1)]);
/// let b = Collection::from(vec![("dog", 1), ("cat", 1), ("cat", 1)]);
/// assert_eq!(a, b);
/// assert_eq!(a.clone() + b.negate(), Collection::new());
/// ```
#[derive(Clone, Debug)]
pub struct Collection<D: Data> {
    updates: Vec<(D, Diff)>,
}

impl<D: Data> Default for Collection<D> {
    fn default() -> Self {
        Collection {
            updates: Vec::new(),
        }
    }
}

impl<D: Data> Collection<D> {
    /// Creates a new empty collection.
    pub fn new() -> Self {
        Collection {
            updates: Vec::new(),
        }
    }

    /// Reveals the underlying updates.
    pub fn updates(&self) -> &[(D, Diff)] {
        &self.updates
    }

    /// Extracts the underlying updates.
    pub fn into_updates(self) -> Vec<(D, Diff)> {
        self.updates
    }

    /// Adds `diff` copies of `record` to the collection.
    pub fn update(&mut self, record: D, diff: Diff) {
        self.updates.push((record, diff));
    }

    /// True iff the collection accumulates to the empty multiset.
    pub fn is_empty(&self) -> bool {
        self.clone().consolidate().updates.is_empty()
    }

    /// Canonicalizes the collection: sorted records, merged duplicates, no zeros.
    pub fn consolidate(mut self) -> Self {
        consolidation::consolidate(&mut self.updates);
        self
    }

    /// Applies `logic` to each record, retaining multiplicities.
    pub fn map<D2: Data, L: FnMut(D) -> D2>(&self, mut logic: L) -> Collection<D2> {
        self.updates
            .iter()
            .map(|(record, diff)| (logic(record.clone()), *diff))
            .collect()
    }

    /// Retains the records satisfying `predicate`.
    pub fn filter<P: FnMut(&D) -> bool>(&self, mut predicate: P) -> Collection<D> {
        self.updates
            .iter()
            .filter(|(record, _)| predicate(record))
            .cloned()
            .collect()
    }

    /// Flips the sign of each multiplicity.
    pub fn negate(&self) -> Collection<D> {
        self.updates
            .iter()
            .map(|(record, diff)| (record.clone(), -diff))
            .collect()
    }

    /// The multiset union of two collections: pointwise addition of multiplicities.
    pub fn concat(&self, other: &Collection<D>) -> Collection<D> {
        let mut updates = self.updates.clone();
        updates.extend(other.updates.iter().cloned());
        Collection { updates }
    }
}

impl<K: Data, V: Data> Collection<(K, V)> {
    /// Matches records by key, producing a pair of values for each match.
    ///
    /// The multiplicity of an output record is the product of the multiplicities of
    /// the records that produced it.
    pub fn join<V2: Data>(&self, other: &Collection<(K, V2)>) -> Collection<(K, (V, V2))> {
        let mut index: FnvHashMap<&K, Vec<(&V2, Diff)>> = FnvHashMap::default();
        for ((key, value), diff) in other.updates.iter() {
            index.entry(key).or_default().push((value, *diff));
        }

        let mut result = Collection::new();
        for ((key, value), diff) in self.updates.iter() {
            if let Some(matches) = index.get(key) {
                for (value2, diff2) in matches.iter() {
                    result.update(
                        (key.clone(), (value.clone(), (*value2).clone())),
                        diff * diff2,
                    );
                }
            }
        }
        result.consolidate()
    }

    /// Groups records by key and applies `logic` to each group of values.
    ///
    /// The values handed to `logic` are consolidated: sorted with no zero
    /// multiplicities. Keys whose values accumulate to nothing are not presented.
    pub fn reduce_by_key<V2: Data, L: FnMut(&K, &[(V, Diff)]) -> Vec<(V2, Diff)>>(
        &self,
        mut logic: L,
    ) -> Collection<(K, V2)> {
        let mut grouped: BTreeMap<&K, Vec<(V, Diff)>> = BTreeMap::new();
        for ((key, value), diff) in self.updates.iter() {
            grouped.entry(key).or_default().push((value.clone(), *diff));
        }

        let mut result = Collection::new();
        for (key, mut values) in grouped {
            consolidation::consolidate(&mut values);
            if !values.is_empty() {
                for (value2, diff) in logic(key, &values) {
                    result.update((key.clone(), value2), diff);
                }
            }
        }
        result.consolidate()
    }

    /// The number of records with each key, as a `(key, count)` record.
    pub fn count(&self) -> Collection<(K, Diff)> {
        self.reduce_by_key(|_key, values| {
            let total: Diff = values.iter().map(|(_, diff)| diff).sum();
            if total == 0 {
                Vec::new()
            } else {
                vec![(total, 1)]
            }
        })
    }

    /// The distinct `(key, value)` pairs present with non-zero multiplicity.
    pub fn distinct(&self) -> Collection<(K, V)> {
        self.reduce_by_key(|_key, values| {
            values.iter().map(|(value, _)| (value.clone(), 1)).collect()
        })
    }
}

impl<K: Data> Collection<(K, Diff)> {
    /// The sum of the values with each key, as a `(key, sum)` record.
    ///
    /// Each value contributes itself scaled by its multiplicity.
    pub fn sum(&self) -> Collection<(K, Diff)> {
        self.reduce_by_key(|_key, values| {
            let total: Diff = values.iter().map(|(value, diff)| value * diff).sum();
            vec![(total, 1)]
        })
    }
}

impl<D: Data> PartialEq for Collection<D> {
    /// Semantic equality: equal iff every record accumulates to the same multiplicity.
    fn eq(&self, other: &Self) -> bool {
        self.clone().consolidate().updates == other.clone().consolidate().updates
    }
}

impl<D: Data> Eq for Collection<D> {}

impl<D: Data> Add for Collection<D> {
    type Output = Collection<D>;
    fn add(mut self, other: Self) -> Self {
        self.updates.extend(other.updates);
        self
    }
}

impl<D: Data> Neg for Collection<D> {
    type Output = Collection<D>;
    fn neg(self) -> Self {
        self.negate()
    }
}

impl<D: Data> From<Vec<(D, Diff)>> for Collection<D> {
    fn from(updates: Vec<(D, Diff)>) -> Self {
        Collection { updates }
    }
}

impl<D: Data> FromIterator<(D, Diff)> for Collection<D> {
    fn from_iter<I: IntoIterator<Item = (D, Diff)>>(iter: I) -> Self {
        Collection {
            updates: iter.into_iter().collect(),
        }
    }
}
