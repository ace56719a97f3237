//! Per-key reductions: reduce, count, sum, and distinct.
//!
//! Unlike the linear operators, a reduction cannot react to a difference in
//! isolation: the reducer sees a key's whole multiset of values, so any touched key
//! must be re-evaluated from its accumulated input. The operator keeps two indices,
//! one of its input and one of what it has emitted, and for each touched key and
//! completed version emits the difference between the reducer's fresh output and the
//! output already on record.
//!
//! Evaluation waits until a version is closed on the input frontier: only then is the
//! key's input at that version complete. A key touched at incomparable versions also
//! needs re-evaluation at their lattice joins, where both touches first become
//! visible together; the scheduled version set is closed under join as it grows.

use std::collections::{BTreeMap, BTreeSet};

use crate::collection::Collection;
use crate::consolidation;
use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{Operate, Stream};
use crate::lattice::{close_under_join, Lattice};
use crate::order::Version;
use crate::trace::Index;
use crate::{Data, Diff};

struct Reduce<K, V, V2, L>
where
    K: Data,
    V: Data,
    V2: Data,
    L: FnMut(&K, &[(V, Diff)]) -> Vec<(V2, Diff)>,
{
    name: &'static str,
    input: InputPort<(K, V)>,
    output: OutputPort<(K, V2)>,
    input_trace: Index<K, V>,
    output_trace: Index<K, V2>,
    pending: BTreeMap<Version, BTreeSet<K>>,
    logic: L,
}

impl<K, V, V2, L> Reduce<K, V, V2, L>
where
    K: Data,
    V: Data,
    V2: Data,
    L: FnMut(&K, &[(V, Diff)]) -> Vec<(V2, Diff)>,
{
    /// Schedules `key` for re-evaluation at `version` and at the joins of `version`
    /// with every other version at which the key is already interesting.
    fn schedule(&mut self, key: &K, version: &Version) {
        let mut interesting = vec![version.clone()];
        for other in self.input_trace.versions(key) {
            interesting.push(version.join(&other));
        }
        for (pending_version, keys) in self.pending.iter() {
            if keys.contains(key) {
                interesting.push(version.join(pending_version));
            }
        }
        close_under_join(&mut interesting);
        for interesting_version in interesting {
            self.pending
                .entry(interesting_version)
                .or_default()
                .insert(key.clone());
        }
    }

    /// Re-evaluates `key` at `version`, recording and returning the output change.
    fn evaluate(&mut self, key: &K, version: &Version) -> Vec<(V2, Diff)> {
        let values = self.input_trace.reconstruct_at(key, version);
        let mut delta = if values.is_empty() {
            Vec::new()
        } else {
            (self.logic)(key, &values)
        };
        for (value, diff) in self.output_trace.reconstruct_at(key, version) {
            delta.push((value, -diff));
        }
        consolidation::consolidate(&mut delta);
        for (value, diff) in delta.iter() {
            self.output_trace
                .update(key.clone(), value.clone(), version.clone(), *diff);
        }
        delta
    }
}

impl<K, V, V2, L> Operate for Reduce<K, V, V2, L>
where
    K: Data,
    V: Data,
    V2: Data,
    L: FnMut(&K, &[(V, Diff)]) -> Vec<(V2, Diff)>,
{
    fn name(&self) -> &str {
        self.name
    }

    fn pending(&self) -> bool {
        self.input.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.input.recv() {
            match message {
                Message::Data(version, collection) => {
                    for ((key, value), diff) in collection.into_updates() {
                        self.schedule(&key, &version);
                        self.input_trace.update(key, value, version.clone(), diff);
                    }
                }
                Message::Frontier(frontier) => {
                    // Scheduled versions no longer open are complete. The map iterates
                    // lexicographically, so lower versions are re-evaluated first and
                    // their corrections are on record before the versions above them.
                    let ready: Vec<Version> = self
                        .pending
                        .keys()
                        .filter(|version| !frontier.less_equal(version))
                        .cloned()
                        .collect();
                    for version in ready {
                        if let Some(keys) = self.pending.remove(&version) {
                            let mut batch = Collection::new();
                            for key in keys {
                                for (value, diff) in self.evaluate(&key, &version) {
                                    batch.update((key.clone(), value), diff);
                                }
                            }
                            self.output.send_data(version.clone(), batch);
                        }
                    }
                    self.output.send_frontier(frontier.clone());
                    self.input_trace.compact(&frontier);
                    self.output_trace.compact(&frontier);
                }
            }
        }
    }
}

impl<K: Data, V: Data> Stream<(K, V)> {
    fn reduce_core<V2, L>(&self, name: &'static str, logic: L) -> Stream<(K, V2)>
    where
        V2: Data,
        L: FnMut(&K, &[(V, Diff)]) -> Vec<(V2, Diff)> + 'static,
    {
        let input = self.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Reduce {
            name,
            input,
            output,
            input_trace: Index::new(),
            output_trace: Index::new(),
            pending: BTreeMap::new(),
            logic,
        }));
        stream
    }

    /// Groups records by key and applies `logic` to each group of values.
    ///
    /// The values handed to `logic` are consolidated, and keys whose values accumulate
    /// to nothing are not presented. Changes to a key's group are emitted as the
    /// difference between the fresh reduction and the previously emitted one.
    pub fn reduce<V2, L>(&self, logic: L) -> Stream<(K, V2)>
    where
        V2: Data,
        L: FnMut(&K, &[(V, Diff)]) -> Vec<(V2, Diff)> + 'static,
    {
        self.reduce_core("Reduce", logic)
    }

    /// The number of records with each key, as a `(key, count)` record.
    pub fn count(&self) -> Stream<(K, Diff)> {
        self.reduce_core("Count", |_key, values| {
            let total: Diff = values.iter().map(|(_, diff)| diff).sum();
            if total == 0 {
                Vec::new()
            } else {
                vec![(total, 1)]
            }
        })
    }

    /// The distinct `(key, value)` pairs present with non-zero multiplicity.
    pub fn distinct(&self) -> Stream<(K, V)> {
        self.reduce_core("Distinct", |_key, values| {
            values.iter().map(|(value, _)| (value.clone(), 1)).collect()
        })
    }
}

impl<K: Data> Stream<(K, Diff)> {
    /// The sum of the values with each key, each scaled by its multiplicity.
    pub fn sum(&self) -> Stream<(K, Diff)> {
        self.reduce_core("Sum", |_key, values| {
            let total: Diff = values.iter().map(|(value, diff)| value * diff).sum();
            vec![(total, 1)]
        })
    }
}
