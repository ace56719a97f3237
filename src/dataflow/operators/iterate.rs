//! Iterative application of a dataflow fragment.
//!
//! The `iterate` operator takes a closure from a stream to a stream of the same
//! record type, and returns the least fixpoint of `X = input ∪ body(X)`: the
//! accumulation of the body's changes, fed back into itself until no net change
//! remains.
//!
//! The implementation establishes a cyclic subgraph running at one higher version
//! arity. An *ingress* operator extends incoming versions with a trailing zero
//! iteration coordinate; a *feedback* operator returns the body's output to the
//! loop with that coordinate advanced by one; the loop variable is the
//! concatenation of the two; and an *egress* operator truncates the iteration
//! coordinate off whatever the variable accumulates, back into the enclosing graph.
//!
//! **Note**: the dataflow assembled by `iterate` does not automatically insert
//! `consolidate` for you. This means that either (i) you should insert one yourself,
//! (ii) you should be certain that all paths around the loop involve consolidation,
//! or (iii) you should be worried that logically cancelable differences may circulate
//! indefinitely.

use fnv::FnvHashSet;

use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{GraphBuilder, Operate, Stream};
use crate::frontier::Antichain;
use crate::order::{PartialOrder, Version};
use crate::Data;

/// Moves a stream into the loop: versions gain a trailing zero coordinate.
struct Ingress<D: Data> {
    input: InputPort<D>,
    output: OutputPort<D>,
}

impl<D: Data> Operate for Ingress<D> {
    fn name(&self) -> &str {
        "Ingress"
    }

    fn pending(&self) -> bool {
        self.input.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.input.recv() {
            match message {
                Message::Data(version, collection) => {
                    self.output.send_data(version.extend(), collection);
                }
                Message::Frontier(frontier) => self.output.send_frontier(frontier.extended()),
            }
        }
    }
}

/// Moves a stream out of the loop: versions lose their iteration coordinate.
struct Egress<D: Data> {
    input: InputPort<D>,
    output: OutputPort<D>,
}

impl<D: Data> Operate for Egress<D> {
    fn name(&self) -> &str {
        "Egress"
    }

    fn pending(&self) -> bool {
        self.input.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.input.recv() {
            match message {
                Message::Data(version, collection) => {
                    self.output.send_data(version.truncate(), collection);
                }
                Message::Frontier(frontier) => self.output.send_frontier(frontier.truncated()),
            }
        }
    }
}

/// Returns the body's output to the loop, one iteration later.
///
/// Beyond re-stamping data, feedback owns frontier shrinking. Once an outer version
/// reaches fixpoint, the loop carries no data at that outer prefix, but frontier
/// advances would still circulate with an ever-growing iteration coordinate. A
/// frontier advance for an outer prefix that moved only the iteration coordinate,
/// with no data at that prefix since the previous advance, proves the loop has
/// drained there: the prefix is dropped from the emitted frontier and ignored until
/// data at it reappears.
struct Feedback<D: Data> {
    input: InputPort<D>,
    output: OutputPort<D>,
    step_size: u64,
    arity: usize,
    initialized: bool,
    prev_frontier: Antichain<Version>,
    saw_data: FnvHashSet<Version>,
    quiet: FnvHashSet<Version>,
}

impl<D: Data> Operate for Feedback<D> {
    fn name(&self) -> &str {
        "Feedback"
    }

    fn pending(&self) -> bool {
        !self.initialized || self.input.pending()
    }

    fn step(&mut self) {
        if !self.initialized {
            self.initialized = true;
            // The earliest possible output is the minimum version taken once around
            // the loop; announcing it unsticks consumers waiting on this edge.
            self.output.send_frontier(Antichain::from_elem(
                Version::minimum(self.arity).results_in(self.step_size),
            ));
        }
        while let Some(message) = self.input.recv() {
            match message {
                Message::Data(version, collection) => {
                    let outer = version.truncate();
                    self.quiet.remove(&outer);
                    self.saw_data.insert(outer);
                    self.output
                        .send_data(version.results_in(self.step_size), collection);
                }
                Message::Frontier(frontier) => {
                    let mut advanced = Antichain::new();
                    for element in frontier.elements() {
                        let outer = element.truncate();
                        if self.quiet.contains(&outer) {
                            continue;
                        }
                        let inner_chatter = !self.saw_data.contains(&outer)
                            && self
                                .prev_frontier
                                .elements()
                                .iter()
                                .any(|prev| prev.truncate() == outer && prev.less_than(element));
                        if inner_chatter {
                            self.quiet.insert(outer);
                        } else {
                            advanced.insert(element.results_in(self.step_size));
                        }
                    }
                    self.prev_frontier = frontier;
                    self.saw_data.clear();
                    self.output.send_frontier(advanced);
                }
            }
        }
    }
}

/// The connection point for a feedback edge, to be wired once the body exists.
struct FeedbackHandle<D: Data> {
    output: OutputPort<D>,
    step_size: u64,
    arity: usize,
}

impl<D: Data> FeedbackHandle<D> {
    /// Completes the loop, feeding `source` back around.
    fn connect(self, source: &Stream<D>) {
        let input = source.connect_to();
        source.builder.add_operator(Box::new(Feedback {
            input,
            output: self.output,
            step_size: self.step_size,
            arity: self.arity,
            initialized: false,
            prev_frontier: Antichain::from_elem(Version::minimum(self.arity)),
            saw_data: FnvHashSet::default(),
            quiet: FnvHashSet::default(),
        }));
    }
}

/// Creates a feedback edge: a stream whose contents are supplied later, advanced by
/// `step_size` iterations.
fn feedback<D: Data>(
    builder: &GraphBuilder,
    arity: usize,
    step_size: u64,
) -> (FeedbackHandle<D>, Stream<D>) {
    let (output, stream) = builder.new_stream(arity);
    (
        FeedbackHandle {
            output,
            step_size,
            arity,
        },
        stream,
    )
}

impl<D: Data> Stream<D> {
    /// Iteratively applies `body` to the source stream until fixpoint.
    ///
    /// The stream handed to `body` is the loop variable: the source plus everything
    /// `body` produced in earlier iterations. The returned stream is the variable's
    /// accumulation once no iteration produces a net change.
    ///
    /// Importantly, this method does not consolidate results inside the loop. Unless
    /// every path from the variable to the body's output consolidates, cancelling
    /// differences may circulate without the fixpoint ever becoming observable.
    pub fn iterate<B>(&self, body: B) -> Stream<D>
    where
        B: FnOnce(&Stream<D>) -> Stream<D>,
    {
        let inner_arity = self.arity + 1;

        let entered = {
            let input = self.connect_to();
            let (output, stream) = self.builder.new_stream(inner_arity);
            self.builder
                .add_operator(Box::new(Ingress { input, output }));
            stream
        };

        let (handle, returned) = feedback(&self.builder, inner_arity, 1);
        let variable = entered.concat(&returned);

        let result = body(&variable);
        assert_eq!(
            result.arity, inner_arity,
            "iterate body must produce a stream of the loop it was given",
        );
        handle.connect(&result);

        let input = variable.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Egress { input, output }));
        stream
    }
}
