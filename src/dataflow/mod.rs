//! The dataflow graph: builder, streams, and the step scheduler.
//!
//! A computation is assembled once, against a [`GraphBuilder`], by chaining operator
//! methods on [`Stream`] handles. [`GraphBuilder::finalize`] seals the topology and
//! returns a [`Graph`], which the host drives by calling [`Graph::step`] until it
//! reports no more work.
//!
//! The scheduler is deliberately ignorant of graph structure: it activates operators
//! with pending input in round-robin order, which is fair, and relies on each operator
//! producing finitely many messages per input message for progress.

pub mod channels;
pub mod operators;

use std::cell::RefCell;
use std::rc::Rc;

use crate::Data;
use channels::{InputPort, OutputPort, Tee};

pub use channels::Message;
pub use operators::input::InputSession;
pub use operators::inspect::CaptureHandle;

/// A node in the dataflow graph.
///
/// Operators are driven by the scheduler: [`Operate::pending`] reports whether the
/// operator has outstanding work, and [`Operate::step`] performs a quantum of it,
/// draining the input messages queued at the time of the call.
pub trait Operate {
    /// An informative name for logging.
    fn name(&self) -> &str;
    /// True iff the operator has outstanding work.
    fn pending(&self) -> bool;
    /// Performs one quantum of work.
    fn step(&mut self);
}

struct BuilderState {
    operators: Vec<Box<dyn Operate>>,
    finalized: bool,
}

/// Assembles a dataflow graph.
///
/// Cloning a builder yields another handle to the same graph under construction;
/// streams hold such a handle so that operator methods can extend the graph.
#[derive(Clone)]
pub struct GraphBuilder {
    state: Rc<RefCell<BuilderState>>,
}

impl GraphBuilder {
    /// Creates a builder for an empty graph.
    pub fn new() -> Self {
        GraphBuilder {
            state: Rc::new(RefCell::new(BuilderState {
                operators: Vec::new(),
                finalized: false,
            })),
        }
    }

    /// Adds an operator to the graph.
    pub(crate) fn add_operator(&self, operator: Box<dyn Operate>) {
        let mut state = self.state.borrow_mut();
        assert!(
            !state.finalized,
            "graph mutated after finalize: operator {:?} added too late",
            operator.name(),
        );
        state.operators.push(operator);
    }

    /// Creates a fresh stream and the output port that feeds it.
    pub(crate) fn new_stream<D: Data>(&self, arity: usize) -> (OutputPort<D>, Stream<D>) {
        let tee = Tee::new();
        let port = OutputPort::new(tee.clone(), arity);
        let stream = Stream {
            tee,
            arity,
            builder: self.clone(),
        };
        (port, stream)
    }

    /// Seals the topology. After this, no operators may be added.
    pub fn finalize(self) -> Graph {
        let mut state = self.state.borrow_mut();
        assert!(!state.finalized, "graph finalized twice");
        state.finalized = true;
        Graph {
            operators: std::mem::take(&mut state.operators),
            cursor: 0,
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        GraphBuilder::new()
    }
}

/// A handle to a stream of versioned data batches.
///
/// A stream identifies the output of one operator; each operator method attaches a new
/// edge to it, so a stream may be consumed any number of times. The operator methods
/// themselves live with their operators, under [`operators`].
pub struct Stream<D: Data> {
    pub(crate) tee: Tee<D>,
    pub(crate) arity: usize,
    pub(crate) builder: GraphBuilder,
}

impl<D: Data> Clone for Stream<D> {
    fn clone(&self) -> Self {
        Stream {
            tee: self.tee.clone(),
            arity: self.arity,
            builder: self.builder.clone(),
        }
    }
}

impl<D: Data> Stream<D> {
    /// The arity of the versions labeling this stream's batches.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Attaches a new edge to this stream, returning the consumer's port.
    pub(crate) fn connect_to(&self) -> InputPort<D> {
        InputPort::new(self.tee.attach(), self.arity)
    }
}

/// A finalized dataflow graph.
pub struct Graph {
    operators: Vec<Box<dyn Operate>>,
    cursor: usize,
}

impl Graph {
    /// Performs one quantum of work, returning true iff any operator had work to do.
    ///
    /// Operators are considered in round-robin order starting after the last operator
    /// activated, so every operator with pending input is eventually activated.
    pub fn step(&mut self) -> bool {
        let count = self.operators.len();
        for offset in 0..count {
            let index = (self.cursor + offset) % count;
            if self.operators[index].pending() {
                log::trace!("activating operator {}", self.operators[index].name());
                self.cursor = index + 1;
                self.operators[index].step();
                return true;
            }
        }
        false
    }

    /// Steps until no operator has work to do.
    ///
    /// This does not terminate on a graph with a non-convergent cycle; hosts that
    /// cannot rule one out should call [`Graph::step`] under their own budget.
    pub fn run(&mut self) {
        while self.step() {}
    }
}
