//! Difference traces: collections described by their changes across versions.
//!
//! A trace records, for each version, the difference between the collection at that
//! version and the accumulation of all earlier differences. The collection *at* a
//! version is reconstructed by summing the differences at all versions less than or
//! equal to it in the partial order.
//!
//! Two forms are provided. [`Trace`] is the unindexed form, a list of versioned
//! differences. [`Index`] groups differences by key, which is what the `join` and
//! `reduce` operators need: an incoming difference touches a handful of keys, and the
//! per-key history lets the operator react without scanning everything it has seen.
//!
//! Both forms support physical compaction once a frontier has closed over a set of
//! versions: closed versions are advanced to their least indistinguishable position
//! beyond the frontier and merged, and cancelled tuples are dropped. Compaction
//! preserves reconstruction at every version still open under the frontier.

use fnv::FnvHashMap;

use crate::collection::Collection;
use crate::consolidation;
use crate::frontier::Antichain;
use crate::lattice::Lattice;
use crate::order::{PartialOrder, Version};
use crate::{Data, Diff};

/// An unindexed difference trace: versioned differences in order of insertion.
#[derive(Clone, Debug, Default)]
pub struct Trace<D: Data> {
    updates: Vec<(Version, Collection<D>)>,
}

impl<D: Data> Trace<D> {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Trace {
            updates: Vec::new(),
        }
    }

    /// Appends a difference at a version. Differences are never eagerly merged.
    pub fn insert(&mut self, version: Version, difference: Collection<D>) {
        self.updates.push((version, difference));
    }

    /// Reveals the versioned differences.
    pub fn updates(&self) -> &[(Version, Collection<D>)] {
        &self.updates
    }

    /// The collection at `version`: the sum of all differences at versions `≤ version`.
    pub fn reconstruct_at(&self, version: &Version) -> Collection<D> {
        let mut result = Collection::new();
        for (entry_version, difference) in self.updates.iter() {
            if entry_version.less_equal(version) {
                for (record, diff) in difference.updates() {
                    result.update(record.clone(), *diff);
                }
            }
        }
        result.consolidate()
    }

    /// Physically consolidates all differences closed under `frontier`.
    ///
    /// Closed versions are advanced to their least position indistinguishable beyond
    /// the frontier and entries landing at the same version are merged, dropping
    /// cancelled records. Reconstruction at any version still open under `frontier`
    /// is unaffected. Under the empty frontier every version is closed and nothing
    /// remains to serve, so the trace empties.
    pub fn consolidate_up_to(&mut self, frontier: &Antichain<Version>) {
        if frontier.is_empty() {
            self.updates.clear();
            return;
        }

        let mut flat = Vec::new();
        for (version, difference) in self.updates.drain(..) {
            let version = version
                .advance_by(frontier.elements())
                .expect("non-empty frontier");
            for (record, diff) in difference.into_updates() {
                flat.push((record, version.clone(), diff));
            }
        }
        consolidation::consolidate_updates(&mut flat);

        // Regroup by version, in version order.
        flat.sort_by(|x, y| (&x.1, &x.0).cmp(&(&y.1, &y.0)));
        for (record, version, diff) in flat {
            match self.updates.last_mut() {
                Some((last, difference)) if last == &version => difference.update(record, diff),
                _ => {
                    let mut difference = Collection::new();
                    difference.update(record, diff);
                    self.updates.push((version, difference));
                }
            }
        }
    }
}

/// A per-key indexed difference trace.
///
/// Each key maps to the tuples `(value, version, multiplicity)` received for it.
/// Within a key the tuples are unordered; compaction canonicalizes them.
#[derive(Clone, Debug, Default)]
pub struct Index<K: Data, V: Data> {
    entries: FnvHashMap<K, Vec<(V, Version, Diff)>>,
}

impl<K: Data, V: Data> Index<K, V> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Index {
            entries: FnvHashMap::default(),
        }
    }

    /// Adds a tuple for `key`. Tuples are never eagerly merged.
    pub fn update(&mut self, key: K, value: V, version: Version, diff: Diff) {
        self.entries
            .entry(key)
            .or_default()
            .push((value, version, diff));
    }

    /// The tuples recorded for `key`.
    pub fn entries(&self, key: &K) -> &[(V, Version, Diff)] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The distinct versions at which `key` has recorded tuples.
    pub fn versions(&self, key: &K) -> Vec<Version> {
        let mut versions: Vec<Version> = self
            .entries(key)
            .iter()
            .map(|(_, version, _)| version.clone())
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    /// The values for `key` at `version`: tuples at versions `≤ version`, consolidated.
    pub fn reconstruct_at(&self, key: &K, version: &Version) -> Vec<(V, Diff)> {
        let mut values: Vec<(V, Diff)> = self
            .entries(key)
            .iter()
            .filter(|(_, entry_version, _)| entry_version.less_equal(version))
            .map(|(value, _, diff)| (value.clone(), *diff))
            .collect();
        consolidation::consolidate(&mut values);
        values
    }

    /// Physically compacts the index up to `frontier`.
    ///
    /// Versions are advanced to their least position indistinguishable beyond the
    /// frontier (versions still open are left where they are), tuples that collide are
    /// merged, and cancelled tuples are dropped. Reads at versions beyond `frontier`
    /// are unaffected. Under the empty frontier no reads remain and the index empties.
    pub fn compact(&mut self, frontier: &Antichain<Version>) {
        if frontier.is_empty() {
            self.entries.clear();
            return;
        }

        self.entries.retain(|_key, tuples| {
            for (_, version, _) in tuples.iter_mut() {
                *version = version
                    .advance_by(frontier.elements())
                    .expect("non-empty frontier");
            }
            consolidation::consolidate_updates(tuples);
            !tuples.is_empty()
        });
    }

    /// The number of keys with any recorded tuple.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff no key has recorded tuples.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
