//! Graph inputs and the writer sessions that feed them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::collection::Collection;
use crate::dataflow::channels::{Message, OutputPort, Queue};
use crate::dataflow::{GraphBuilder, Operate, Stream};
use crate::frontier::Antichain;
use crate::order::{PartialOrder, Version};
use crate::Data;

/// The operator behind a graph input: forwards whatever its session has queued.
struct Input<D: Data> {
    queue: Queue<D>,
    output: OutputPort<D>,
}

impl<D: Data> Operate for Input<D> {
    fn name(&self) -> &str {
        "Input"
    }

    fn pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    fn step(&mut self) {
        let queued: Vec<Message<D>> = self.queue.borrow_mut().drain(..).collect();
        for message in queued {
            match message {
                Message::Data(version, collection) => self.output.send_data(version, collection),
                Message::Frontier(frontier) => self.output.send_frontier(frontier),
            }
        }
    }
}

/// A writer for one graph input.
///
/// The session enforces the input contract: data batches must be labeled with versions
/// in the future of the session's frontier, and frontier advances must be monotone.
/// Violations are programming errors and panic.
pub struct InputSession<D: Data> {
    queue: Queue<D>,
    frontier: Antichain<Version>,
}

impl<D: Data> InputSession<D> {
    /// Enqueues a batch of changes at `version`.
    ///
    /// Panics if `version` is not in the future of the session's frontier.
    pub fn send_data(&mut self, version: Version, collection: Collection<D>) {
        assert!(
            self.frontier.less_equal(&version),
            "data batch at {:?} not beyond the input frontier {:?}",
            version,
            self.frontier.elements(),
        );
        self.queue
            .borrow_mut()
            .push_back(Message::Data(version, collection));
    }

    /// Advances the session's frontier.
    ///
    /// Panics unless the new frontier is beyond the current one. The empty antichain
    /// closes the input permanently.
    pub fn send_frontier(&mut self, frontier: Antichain<Version>) {
        assert!(
            PartialOrder::less_equal(&self.frontier, &frontier),
            "non-monotone frontier advance from {:?} to {:?}",
            self.frontier.elements(),
            frontier.elements(),
        );
        self.frontier = frontier.clone();
        self.queue
            .borrow_mut()
            .push_back(Message::Frontier(frontier));
    }

    /// Closes the input: shorthand for sending the empty frontier.
    pub fn close(&mut self) {
        self.send_frontier(Antichain::new());
    }

    /// The session's current frontier.
    pub fn frontier(&self) -> &Antichain<Version> {
        &self.frontier
    }
}

impl GraphBuilder {
    /// Creates a new graph input carrying versions of the given arity.
    ///
    /// Returns the stream of its batches and the session that writes to it.
    pub fn new_input<D: Data>(&self, arity: usize) -> (Stream<D>, InputSession<D>) {
        assert!(arity >= 1, "versions must have arity at least one");
        let queue: Queue<D> = Rc::new(RefCell::new(VecDeque::new()));
        let (output, stream) = self.new_stream(arity);
        self.add_operator(Box::new(Input {
            queue: Rc::clone(&queue),
            output,
        }));
        let session = InputSession {
            queue,
            frontier: Antichain::from_elem(Version::minimum(arity)),
        };
        (stream, session)
    }
}
