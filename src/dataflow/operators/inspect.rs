//! Taps and sinks for observing a stream.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::collection::Collection;
use crate::dataflow::channels::{InputPort, Message, OutputPort};
use crate::dataflow::{Operate, Stream};
use crate::frontier::Antichain;
use crate::order::Version;
use crate::{Data, Diff};

/// An operator invoking a callback on each message, optionally forwarding it.
struct Inspect<D: Data, L: FnMut(&Message<D>)> {
    name: &'static str,
    input: InputPort<D>,
    output: Option<OutputPort<D>>,
    logic: L,
}

impl<D: Data, L: FnMut(&Message<D>)> Operate for Inspect<D, L> {
    fn name(&self) -> &str {
        self.name
    }

    fn pending(&self) -> bool {
        self.input.pending()
    }

    fn step(&mut self) {
        while let Some(message) = self.input.recv() {
            (self.logic)(&message);
            if let Some(output) = self.output.as_mut() {
                match message {
                    Message::Data(version, collection) => output.send_data(version, collection),
                    Message::Frontier(frontier) => output.send_frontier(frontier),
                }
            }
        }
    }
}

/// A handle to the messages recorded by [`Stream::capture`].
pub struct CaptureHandle<D: Data> {
    messages: Rc<RefCell<Vec<Message<D>>>>,
    arity: usize,
}

impl<D: Data> CaptureHandle<D> {
    /// The recorded messages, in arrival order.
    pub fn messages(&self) -> Vec<Message<D>> {
        self.messages.borrow().clone()
    }

    /// The recorded data, merged per version, cancelled records dropped, in version order.
    pub fn extract(&self) -> Vec<(Version, Vec<(D, Diff)>)> {
        let mut by_version: BTreeMap<Version, Collection<D>> = BTreeMap::new();
        for message in self.messages.borrow().iter() {
            if let Message::Data(version, collection) = message {
                let slot = by_version.entry(version.clone()).or_default();
                for (record, diff) in collection.updates() {
                    slot.update(record.clone(), *diff);
                }
            }
        }
        by_version
            .into_iter()
            .map(|(version, collection)| (version, collection.consolidate().into_updates()))
            .filter(|(_, updates)| !updates.is_empty())
            .collect()
    }

    /// The number of data batches recorded, counting cancelling batches separately.
    pub fn batch_count(&self) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|message| matches!(message, Message::Data(..)))
            .count()
    }

    /// The last frontier recorded, or the initial frontier if none has been.
    pub fn frontier(&self) -> Antichain<Version> {
        self.messages
            .borrow()
            .iter()
            .rev()
            .find_map(|message| match message {
                Message::Frontier(frontier) => Some(frontier.clone()),
                _ => None,
            })
            .unwrap_or_else(|| Antichain::from_elem(Version::minimum(self.arity)))
    }

    /// Every frontier recorded, in arrival order.
    pub fn frontiers(&self) -> Vec<Antichain<Version>> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|message| match message {
                Message::Frontier(frontier) => Some(frontier.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<D: Data> Stream<D> {
    /// Invokes `logic` on each message, passing the stream through unchanged.
    pub fn inspect<L: FnMut(&Message<D>) + 'static>(&self, logic: L) -> Stream<D> {
        let input = self.connect_to();
        let (output, stream) = self.builder.new_stream(self.arity);
        self.builder.add_operator(Box::new(Inspect {
            name: "Inspect",
            input,
            output: Some(output),
            logic,
        }));
        stream
    }

    /// Logs each message under `label` at debug level, passing the stream through.
    pub fn debug(&self, label: &str) -> Stream<D> {
        let label = label.to_string();
        self.inspect(move |message| match message {
            Message::Data(version, collection) => {
                log::debug!("{}: data at {:?}: {:?}", label, version, collection.updates());
            }
            Message::Frontier(frontier) => {
                log::debug!("{}: frontier {:?}", label, frontier.elements());
            }
        })
    }

    /// Records every message into a handle the host can read back.
    pub fn capture(&self) -> CaptureHandle<D> {
        let messages: Rc<RefCell<Vec<Message<D>>>> = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&messages);
        let input = self.connect_to();
        self.builder.add_operator(Box::new(Inspect {
            name: "Capture",
            input,
            output: None,
            logic: move |message: &Message<D>| recorded.borrow_mut().push(message.clone()),
        }));
        CaptureHandle {
            messages,
            arity: self.arity,
        }
    }
}
