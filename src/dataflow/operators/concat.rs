//! Merges the contents of two streams.

use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{Operate, Stream};
use crate::Data;

/// An operator forwarding the batches of both inputs.
///
/// Concatenation holds no state: batches pass through as they arrive, and the output
/// frontier is the meet of the two input frontiers, since a future batch may be in the
/// future of either.
struct Concat<D: Data> {
    left: InputPort<D>,
    right: InputPort<D>,
    output: OutputPort<D>,
}

impl<D: Data> Operate for Concat<D> {
    fn name(&self) -> &str {
        "Concat"
    }

    fn pending(&self) -> bool {
        self.left.pending() || self.right.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.left.recv() {
            if let Message::Data(version, collection) = message {
                self.output.send_data(version, collection);
            }
        }
        while let Some(message) = self.right.recv() {
            if let Message::Data(version, collection) = message {
                self.output.send_data(version, collection);
            }
        }
        let frontier = self.left.frontier().meet(self.right.frontier());
        self.output.send_frontier(frontier);
    }
}

impl<D: Data> Stream<D> {
    /// The multiset union of two streams: both streams' batches, interleaved.
    pub fn concat(&self, other: &Stream<D>) -> Stream<D> {
        assert_eq!(
            self.arity, other.arity,
            "concatenated streams must agree on version arity",
        );
        let left = self.connect_to();
        let right = other.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Concat {
            left,
            right,
            output,
        }));
        stream
    }
}
