use deltaflow::dataflow::GraphBuilder;
use deltaflow::{Antichain, Collection, Version};

fn v(coords: &[u64]) -> Version {
    Version::from(coords)
}

#[test]
fn count_incrementally() {
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<&'static str>(1);
    let handle = stream.map(|record| (record, ())).count().capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![("a", 2), ("b", 1)]));
    input.send_data(v(&[1]), Collection::from(vec![("a", -1), ("c", 3)]));
    input.close();
    graph.run();

    // "a" moves from count 2 to count 1; "c" appears with count 3.
    assert_eq!(
        handle.extract(),
        vec![
            (v(&[0]), vec![(("a", 2), 1), (("b", 1), 1)]),
            (v(&[1]), vec![(("a", 1), 1), (("a", 2), -1), (("c", 3), 1)]),
        ],
    );
    assert!(handle.frontier().is_empty());
}

#[test]
fn count_waits_for_closed_versions() {
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(u64, ())>(1);
    let handle = stream.count().capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![((1, ()), 1)]));
    graph.run();
    // Version 0 is still open: more records could arrive, so no count is final.
    assert_eq!(handle.batch_count(), 0);

    input.send_data(v(&[0]), Collection::from(vec![((1, ()), 1)]));
    input.send_frontier(Antichain::from_elem(v(&[1])));
    graph.run();
    assert_eq!(handle.extract(), vec![(v(&[0]), vec![((1, 2), 1)])]);

    input.close();
    graph.run();
    assert!(handle.frontier().is_empty());
}

#[test]
fn distinct_retracts() {
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(&'static str, u64)>(1);
    let handle = stream.distinct().capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![(("a", 5), 2), (("a", 7), 1)]));
    input.send_data(v(&[1]), Collection::from(vec![(("a", 5), -2)]));
    input.close();
    graph.run();

    assert_eq!(
        handle.extract(),
        vec![
            (v(&[0]), vec![(("a", 5), 1), (("a", 7), 1)]),
            (v(&[1]), vec![(("a", 5), -1)]),
        ],
    );
}

#[test]
fn sum_scales_by_multiplicity() {
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(&'static str, isize)>(1);
    let handle = stream.sum().capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![(("a", 5), 2), (("a", 7), 1)]));
    input.send_data(v(&[1]), Collection::from(vec![(("a", 7), -1)]));
    input.close();
    graph.run();

    assert_eq!(
        handle.extract(),
        vec![
            (v(&[0]), vec![(("a", 17), 1)]),
            (v(&[1]), vec![(("a", 10), 1), (("a", 17), -1)]),
        ],
    );
}

#[test]
fn reduce_with_user_logic() {
    // Keep, per key, the smallest value present.
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(&'static str, u64)>(1);
    let handle = stream
        .reduce(|_key, values| vec![(values[0].0.clone(), 1)])
        .capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0]), Collection::from(vec![(("a", 5), 1), (("a", 3), 1)]));
    input.send_data(v(&[1]), Collection::from(vec![(("a", 3), -1)]));
    input.close();
    graph.run();

    assert_eq!(
        handle.extract(),
        vec![
            (v(&[0]), vec![(("a", 3), 1)]),
            (v(&[1]), vec![(("a", 3), -1), (("a", 5), 1)]),
        ],
    );
}

#[test]
fn count_corrects_at_version_joins() {
    // A key touched at incomparable versions needs a correction at their join:
    // at (1, 1) both records are visible for the first time, and the two counts
    // of one give way to a single count of two.
    let builder = GraphBuilder::new();
    let (stream, mut input) = builder.new_input::<(&'static str, ())>(2);
    let handle = stream.count().capture();
    let mut graph = builder.finalize();

    input.send_data(v(&[0, 1]), Collection::from(vec![(("k", ()), 1)]));
    input.send_data(v(&[1, 0]), Collection::from(vec![(("k", ()), 1)]));
    input.close();
    graph.run();

    assert_eq!(
        handle.extract(),
        vec![
            (v(&[0, 1]), vec![(("k", 1), 1)]),
            (v(&[1, 0]), vec![(("k", 1), 1)]),
            (v(&[1, 1]), vec![(("k", 1), -2), (("k", 2), 1)]),
        ],
    );
}
