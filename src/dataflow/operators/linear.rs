//! The linear unary operators: map, filter, and negate.
//!
//! All three transform each update independently, so they forward every batch as soon
//! as it arrives and pass frontiers through untouched. Linearity is what makes them
//! trivially incremental: transforming a difference is the difference of transforming.

use crate::collection::Collection;
use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{Operate, Stream};
use crate::{Data, Diff};

/// An operator applying an update-at-a-time transformation.
struct Linear<D1: Data, D2: Data, L: FnMut(D1, Diff) -> Option<(D2, Diff)>> {
    name: &'static str,
    input: InputPort<D1>,
    output: OutputPort<D2>,
    logic: L,
}

impl<D1: Data, D2: Data, L: FnMut(D1, Diff) -> Option<(D2, Diff)>> Operate for Linear<D1, D2, L> {
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
                    let transformed: Collection<D2> = collection
                        .into_updates()
                        .into_iter()
                        .filter_map(|(record, diff)| (self.logic)(record, diff))
                        .collect();
                    self.output.send_data(version, transformed);
                }
                Message::Frontier(frontier) => self.output.send_frontier(frontier),
            }
        }
    }
}

impl<D: Data> Stream<D> {
    fn linear<D2: Data, L: FnMut(D, Diff) -> Option<(D2, Diff)> + 'static>(
        &self,
        name: &'static str,
        logic: L,
    ) -> Stream<D2> {
        let input = self.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Linear {
            name,
            input,
            output,
            logic,
        }));
        stream
    }

    /// Applies `logic` to each record, retaining multiplicities.
    pub fn map<D2: Data, L: FnMut(D) -> D2 + 'static>(&self, mut logic: L) -> Stream<D2> {
        self.linear("Map", move |record, diff| Some((logic(record), diff)))
    }

    /// Retains the records satisfying `predicate`.
    pub fn filter<P: FnMut(&D) -> bool + 'static>(&self, mut predicate: P) -> Stream<D> {
        self.linear("Filter", move |record, diff| {
            if predicate(&record) {
                Some((record, diff))
            } else {
                None
            }
        })
    }

    /// Flips the sign of each multiplicity.
    pub fn negate(&self) -> Stream<D> {
        self.linear("Negate", |record, diff| Some((record, -diff)))
    }
}
