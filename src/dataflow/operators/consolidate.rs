//! Physically compacts batches, one net batch per closed version.
//!
//! Logically `consolidate` changes nothing: a stream is read as the accumulation of
//! its batches, and merging them preserves the accumulation. Practically the
//! difference matters a great deal: a collection of cancelling records and an actually
//! empty collection look the same to accumulation but not to the operators that
//! forward batches, and inside iterative subgraphs that distinction separates
//! termination from endless circulation of cancelling batches.
//!
//! This is the only operator that guarantees downstream consumers exactly one data
//! batch per version, carrying the true net change.

use std::collections::BTreeMap;

use crate::collection::Collection;
use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{Operate, Stream};
use crate::order::Version;
use crate::Data;

/// An operator withholding each version's batches until the version closes.
struct Consolidate<D: Data> {
    input: InputPort<D>,
    output: OutputPort<D>,
    pending: BTreeMap<Version, Collection<D>>,
}

impl<D: Data> Operate for Consolidate<D> {
    fn name(&self) -> &str {
        "Consolidate"
    }

    fn pending(&self) -> bool {
        self.input.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.input.recv() {
            match message {
                Message::Data(version, collection) => {
                    let slot = self.pending.entry(version).or_default();
                    for (record, diff) in collection.into_updates() {
                        slot.update(record, diff);
                    }
                }
                Message::Frontier(frontier) => {
                    // Versions no longer open under the new frontier are complete:
                    // merge and release them, in an order compatible with the partial
                    // order (the map iterates lexicographically).
                    let closed: Vec<Version> = self
                        .pending
                        .keys()
                        .filter(|version| !frontier.less_equal(version))
                        .cloned()
                        .collect();
                    for version in closed {
                        if let Some(collection) = self.pending.remove(&version) {
                            self.output.send_data(version, collection.consolidate());
                        }
                    }
                    self.output.send_frontier(frontier);
                }
            }
        }
    }
}

impl<D: Data> Stream<D> {
    /// Defers each version's batches until the version closes, then emits their net
    /// effect as a single batch.
    pub fn consolidate(&self) -> Stream<D> {
        let input = self.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Consolidate {
            input,
            output,
            pending: BTreeMap::new(),
        }));
        stream
    }
}
