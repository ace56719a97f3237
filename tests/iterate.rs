use std::cell::RefCell;
use std::rc::Rc;

use deltaflow::dataflow::{GraphBuilder, Message};
use deltaflow::{Antichain, Collection, Version};

fn v(coords: &[u64]) -> Version {
    Version::from(coords)
}

#[test]
fn iterate_noop_with_consolidate_converges() {
    // The body cancels itself exactly, so the loop variable is the input alone,
    // and the loop must settle after the cancellation is observed once.
    let _ = env_logger::builder().is_test(true).try_init();
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<i64>(1);
    let handle = stream
        .iterate(|variable| {
            variable
                .map(|x| x + 1)
                .map(|x| x - 1)
                .negate()
                .concat(variable)
                .consolidate()
        })
        .capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![(1, 1)]));
    input.close();
    graph.run();

    assert_eq!(handle.extract(), vec![(v(&[0]), vec![(1, 1)])]);
    assert!(handle.frontier().is_empty());
}

#[test]
fn iterate_without_consolidate_circulates() {
    // Dropping the consolidate leaves the same logically empty body as separate
    // cancelling batches, which the loop dutifully circulates forever. A bounded
    // step budget must observe ever more batches and no completion.
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<i64>(1);
    let handle = stream
        .iterate(|variable| {
            variable
                .map(|x| x + 1)
                .map(|x| x - 1)
                .negate()
                .concat(variable)
        })
        .capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![(1, 1)]));
    input.close();

    for _ in 0..60 {
        graph.step();
    }

    assert!(handle.batch_count() > 10);
    assert!(!handle.frontier().is_empty());
    assert!(graph.step());

    // Everything the loop leaks out is labeled at the one outer version.
    for message in handle.messages() {
        if let Message::Data(version, _) = message {
            assert_eq!(version, v(&[0]));
        }
    }
}

#[test]
fn iterate_shrinks_feedback_frontiers() {
    // After the outer version reaches fixpoint, frontier messages with a growing
    // iteration coordinate must not keep circulating: the loop settles after a
    // bounded number of messages inside the loop.
    let inner_messages = Rc::new(RefCell::new(0usize));
    let observed = Rc::clone(&inner_messages);

    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<i64>(1);
    let handle = stream
        .iterate(move |variable| {
            variable
                .map(|x| x + 1)
                .map(|x| x - 1)
                .negate()
                .concat(variable)
                .consolidate()
                .inspect(move |_message| *observed.borrow_mut() += 1)
        })
        .capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![(1, 1)]));
    input.close();
    graph.run();

    assert!(handle.frontier().is_empty());
    assert!(
        *inner_messages.borrow() <= 8,
        "loop kept talking after fixpoint: {} messages",
        inner_messages.borrow(),
    );
}

#[test]
fn iterate_reaches_a_closure_fixpoint() {
    // Grow the set {1} by the capped successor until nothing new appears.
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(u64, ())>(1);
    let handle = stream
        .iterate(|variable| {
            variable
                .map(|(x, ())| (std::cmp::min(x + 1, 6), ()))
                .distinct()
        })
        .capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![((1, ()), 1)]));
    input.send_frontier(Antichain::from_elem(v(&[1])));
    graph.run();

    // Retract the seed: the whole closure must unwind.
    input.send_data(v(&[1]), Collection::from(vec![((1, ()), -1)]));
    input.close();
    graph.run();

    let expected_grown: Vec<((u64, ()), isize)> = (1..=6).map(|x| ((x, ()), 1)).collect();
    let expected_unwound: Vec<((u64, ()), isize)> = (1..=6).map(|x| ((x, ()), -1)).collect();
    assert_eq!(
        handle.extract(),
        vec![(v(&[0]), expected_grown), (v(&[1]), expected_unwound)],
    );
    assert!(handle.frontier().is_empty());
}

#[test]
fn iterate_observes_messages_in_order() {
    // Per-edge order: on the captured edge, no data batch may arrive at a version
    // already closed by an earlier frontier message.
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(u64, ())>(1);
    let handle = stream
        .iterate(|variable| variable.map(|(x, ())| (x, ())).distinct())
        .capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![((1, ()), 1)]));
    input.close();
    graph.run();

    let mut closed = Antichain::from_elem(v(&[0]));
    for message in handle.messages() {
        match message {
            Message::Data(version, _) => assert!(closed.less_equal(&version)),
            Message::Frontier(frontier) => closed = frontier,
        }
    }
}
