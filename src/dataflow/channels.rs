//! Message channels between operators.
//!
//! An edge is a FIFO queue of messages between one producer and one consumer. A
//! producer pushes into a [`Tee`], which forwards a copy of each message to every
//! edge attached to it; attaching happens at graph construction time, as consumers
//! connect to the stream. Messages are never reordered or dropped.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::collection::Collection;
use crate::frontier::Antichain;
use crate::order::{PartialOrder, Version};
use crate::Data;

/// A message on a dataflow edge.
#[derive(Clone, Debug)]
pub enum Message<D: Data> {
    /// A batch of changes to a collection, labeled with a version.
    Data(Version, Collection<D>),
    /// A promise that no future data batch on this edge carries a version not in the
    /// future of the antichain.
    Frontier(Antichain<Version>),
}

/// The consumer end of an edge.
pub type Queue<D> = Rc<RefCell<VecDeque<Message<D>>>>;

/// The producer end of a stream: forwards each message to every attached edge.
pub struct Tee<D: Data> {
    listeners: Rc<RefCell<Vec<Queue<D>>>>,
}

impl<D: Data> Clone for Tee<D> {
    fn clone(&self) -> Self {
        Tee {
            listeners: Rc::clone(&self.listeners),
        }
    }
}

impl<D: Data> Tee<D> {
    /// Creates a tee with no attached edges.
    pub fn new() -> Self {
        Tee {
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Attaches a new edge, returning its consumer end.
    pub fn attach(&self) -> Queue<D> {
        let queue: Queue<D> = Rc::new(RefCell::new(VecDeque::new()));
        self.listeners.borrow_mut().push(Rc::clone(&queue));
        queue
    }

    /// Pushes a message to every attached edge.
    pub fn push(&self, message: Message<D>) {
        for queue in self.listeners.borrow().iter() {
            queue.borrow_mut().push_back(message.clone());
        }
    }
}

impl<D: Data> Default for Tee<D> {
    fn default() -> Self {
        Tee::new()
    }
}

/// An operator's view of one input edge: the queue, and the frontier it implies.
///
/// The input frontier starts at the minimum antichain for the stream's arity and is
/// updated as frontier messages are received.
pub struct InputPort<D: Data> {
    queue: Queue<D>,
    frontier: Antichain<Version>,
}

impl<D: Data> InputPort<D> {
    /// Creates a port over `queue` for a stream of versions with `arity` coordinates.
    pub fn new(queue: Queue<D>, arity: usize) -> Self {
        InputPort {
            queue,
            frontier: Antichain::from_elem(Version::minimum(arity)),
        }
    }

    /// True iff messages are queued.
    pub fn pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    /// Dequeues the next message, tracking frontier advances.
    pub fn recv(&mut self) -> Option<Message<D>> {
        let message = self.queue.borrow_mut().pop_front();
        if let Some(Message::Frontier(frontier)) = &message {
            debug_assert!(
                PartialOrder::less_equal(&self.frontier, frontier),
                "frontier messages must be monotone",
            );
            self.frontier = frontier.clone();
        }
        message
    }

    /// The frontier implied by the messages received so far.
    pub fn frontier(&self) -> &Antichain<Version> {
        &self.frontier
    }
}

/// An operator's output: the tee, and the last frontier emitted on it.
///
/// Data batches at versions behind the emitted frontier are contract violations, and
/// frontier emissions must be monotone; both are asserted here. Frontier messages are
/// suppressed when nothing changed, which keeps frontier traffic finite.
pub struct OutputPort<D: Data> {
    tee: Tee<D>,
    frontier: Antichain<Version>,
}

impl<D: Data> OutputPort<D> {
    /// Creates a port over `tee` for a stream of versions with `arity` coordinates.
    pub fn new(tee: Tee<D>, arity: usize) -> Self {
        OutputPort {
            tee,
            frontier: Antichain::from_elem(Version::minimum(arity)),
        }
    }

    /// Emits a data batch, unless it has no updates.
    pub fn send_data(&self, version: Version, collection: Collection<D>) {
        debug_assert!(
            self.frontier.less_equal(&version),
            "data batch at {:?} behind the emitted frontier {:?}",
            version,
            self.frontier.elements(),
        );
        if !collection.updates().is_empty() {
            self.tee.push(Message::Data(version, collection));
        }
    }

    /// Emits a frontier advance, unless the frontier is unchanged.
    pub fn send_frontier(&mut self, frontier: Antichain<Version>) {
        if frontier != self.frontier {
            debug_assert!(
                PartialOrder::less_equal(&self.frontier, &frontier),
                "emitted frontiers must be monotone",
            );
            self.frontier = frontier.clone();
            self.tee.push(Message::Frontier(frontier));
        }
    }

    /// The last emitted frontier.
    pub fn frontier(&self) -> &Antichain<Version> {
        &self.frontier
    }
}
