//! Matches the records of two keyed streams.
//!
//! Join is bilinear: the change in its output caused by a change on one input is the
//! change joined against everything the other input has ever delivered. Each side
//! therefore keeps an index of its full history, and each incoming batch streams out
//! its matches immediately; no frontier gating is needed. A matched pair is labeled
//! with the lattice join of the versions of the records that produced it, the
//! earliest version at which both are present.

use std::collections::BTreeMap;

use crate::collection::Collection;
use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{Operate, Stream};
use crate::lattice::Lattice;
use crate::order::Version;
use crate::trace::Index;
use crate::Data;

struct Join<K: Data, V1: Data, V2: Data> {
    left: InputPort<(K, V1)>,
    right: InputPort<(K, V2)>,
    left_trace: Index<K, V1>,
    right_trace: Index<K, V2>,
    output: OutputPort<(K, (V1, V2))>,
}

impl<K: Data, V1: Data, V2: Data> Join<K, V1, V2> {
    fn process_left(&mut self, version: Version, collection: Collection<(K, V1)>) {
        let mut produced: BTreeMap<_, Collection<(K, (V1, V2))>> = BTreeMap::new();
        for ((key, value), diff) in collection.into_updates() {
            for (value2, version2, diff2) in self.right_trace.entries(&key) {
                produced
                    .entry(version.join(version2))
                    .or_default()
                    .update((key.clone(), (value.clone(), value2.clone())), diff * diff2);
            }
            self.left_trace.update(key, value, version.clone(), diff);
        }
        for (version, collection) in produced {
            self.output.send_data(version, collection.consolidate());
        }
    }

    fn process_right(&mut self, version: Version, collection: Collection<(K, V2)>) {
        let mut produced: BTreeMap<_, Collection<(K, (V1, V2))>> = BTreeMap::new();
        for ((key, value), diff) in collection.into_updates() {
            for (value1, version1, diff1) in self.left_trace.entries(&key) {
                produced
                    .entry(version.join(version1))
                    .or_default()
                    .update((key.clone(), (value1.clone(), value.clone())), diff1 * diff);
            }
            self.right_trace.update(key, value, version.clone(), diff);
        }
        for (version, collection) in produced {
            self.output.send_data(version, collection.consolidate());
        }
    }
}

impl<K: Data, V1: Data, V2: Data> Operate for Join<K, V1, V2> {
    fn name(&self) -> &str {
        "Join"
    }

    fn pending(&self) -> bool {
        self.left.pending() || self.right.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.left.recv() {
            if let Message::Data(version, collection) = message {
                self.process_left(version, collection);
            }
        }
        while let Some(message) = self.right.recv() {
            if let Message::Data(version, collection) = message {
                self.process_right(version, collection);
            }
        }

        let frontier = self.left.frontier().meet(self.right.frontier());
        self.output.send_frontier(frontier);

        // A side's history can only matter to future batches on the opposite side, so
        // each trace compacts up to the opposite input's frontier.
        self.left_trace.compact(self.right.frontier());
        self.right_trace.compact(self.left.frontier());
    }
}

impl<K: Data, V1: Data> Stream<(K, V1)> {
    /// Matches records by key, producing `(key, (value, other_value))` for each pair
    /// of matching records, with the product of their multiplicities.
    pub fn join<V2: Data>(&self, other: &Stream<(K, V2)>) -> Stream<(K, (V1, V2))> {
        assert_eq!(
            self.arity, other.arity,
            "joined streams must agree on version arity",
        );
        let left = self.connect_to();
        let right = other.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Join {
            left,
            right,
            left_trace: Index::new(),
            right_trace: Index::new(),
            output,
        }));
        stream
    }
}
