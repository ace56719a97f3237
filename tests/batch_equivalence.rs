//! The incremental engine against value-level recomputation from scratch.
//!
//! For random update streams and a few representative graphs, the accumulation of
//! everything emitted at versions up to `v` must equal the batch recomputation over
//! the accumulated inputs at `v`, for every closed `v`.

use deltaflow::dataflow::GraphBuilder;
use deltaflow::{Antichain, Collection, Data, Diff, PartialOrder, Version};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn v(coords: &[u64]) -> Version {
    Version::from(coords)
}

fn random_batches(rng: &mut StdRng, versions: usize) -> Vec<Vec<((u64, u64), Diff)>> {
    (0..versions)
        .map(|_| {
            (0..rng.gen_range(0..4))
                .map(|_| {
                    let key = rng.gen_range(0..4u64);
                    let value = rng.gen_range(0..3u64);
                    let diff = loop {
                        let diff: Diff = rng.gen_range(-2..=2);
                        if diff != 0 {
                            break diff;
                        }
                    };
                    ((key, value), diff)
                })
                .collect()
        })
        .collect()
}

/// Accumulates the extracted output at versions less or equal to `upto`.
fn accumulate<D: Data>(extracted: &[(Version, Vec<(D, Diff)>)], upto: &Version) -> Collection<D> {
    let mut result = Collection::new();
    for (version, updates) in extracted.iter() {
        if version.less_equal(upto) {
            for (record, diff) in updates.iter() {
                result.update(record.clone(), *diff);
            }
        }
    }
    result.consolidate()
}

/// Accumulates the raw input batches at versions less or equal to `upto`.
fn accumulate_input(
    batches: &[(Version, Vec<((u64, u64), Diff)>)],
    upto: &Version,
) -> Collection<(u64, u64)> {
    let mut result = Collection::new();
    for (version, updates) in batches.iter() {
        if version.less_equal(upto) {
            for (record, diff) in updates.iter() {
                result.update(*record, *diff);
            }
        }
    }
    result.consolidate()
}

#[test]
fn chain_versions_agree_with_batch_recomputation() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let versions = 5;
        let left_batches = random_batches(&mut rng, versions);
        let right_batches = random_batches(&mut rng, versions);

        let builder = GraphBuilder::new();
        let (left, mut left_input) = builder.new_input::<(u64, u64)>(1);
        let (right, mut right_input) = builder.new_input::<(u64, u64)>(1);

        let chained = left
            .concat(&right.negate())
            .map(|(key, value)| (key, value + 1))
            .filter(|(key, _)| key % 2 == 0)
            .consolidate()
            .capture();
        let joined = left.join(&right).capture();
        let counted = left.count().capture();
        let distinct = right.distinct().capture();

        let mut graph = builder.finalize();

        let mut left_sent = Vec::new();
        let mut right_sent = Vec::new();
        for index in 0..versions {
            let version = v(&[index as u64]);
            left_input.send_data(version.clone(), Collection::from(left_batches[index].clone()));
            right_input.send_data(
                version.clone(),
                Collection::from(right_batches[index].clone()),
            );
            left_sent.push((version.clone(), left_batches[index].clone()));
            right_sent.push((version, right_batches[index].clone()));
            let next = Antichain::from_elem(v(&[index as u64 + 1]));
            left_input.send_frontier(next.clone());
            right_input.send_frontier(next);
            graph.run();
        }
        left_input.close();
        right_input.close();
        graph.run();

        for index in 0..versions {
            let version = v(&[index as u64]);
            let left_acc = accumulate_input(&left_sent, &version);
            let right_acc = accumulate_input(&right_sent, &version);

            assert_eq!(
                accumulate(&chained.extract(), &version),
                left_acc
                    .concat(&right_acc.negate())
                    .map(|(key, value)| (key, value + 1))
                    .filter(|(key, _)| key % 2 == 0),
                "chain diverged at version {} for seed {}",
                index,
                seed,
            );
            assert_eq!(
                accumulate(&joined.extract(), &version),
                left_acc.join(&right_acc),
                "join diverged at version {} for seed {}",
                index,
                seed,
            );
            assert_eq!(
                accumulate(&counted.extract(), &version),
                left_acc.count(),
                "count diverged at version {} for seed {}",
                index,
                seed,
            );
            assert_eq!(
                accumulate(&distinct.extract(), &version),
                right_acc.distinct(),
                "distinct diverged at version {} for seed {}",
                index,
                seed,
            );
        }
    }
}

#[test]
fn partially_ordered_versions_agree_with_batch_recomputation() {
    // Updates land on a two-dimensional grid of versions, none of which waits for
    // the others, and the reductions must still agree with recomputation at every
    // grid point once everything closes.
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let grid: Vec<Version> = (0..2u64)
            .cartesian_product(0..2u64)
            .map(|(outer, inner)| v(&[outer, inner]))
            .collect();

        let batches = random_batches(&mut rng, grid.len());
        let sent: Vec<(Version, Vec<((u64, u64), Diff)>)> = grid
            .iter()
            .cloned()
            .zip(batches.iter().cloned())
            .collect();

        let builder = GraphBuilder::new();
        let (stream, mut input) = builder.new_input::<(u64, u64)>(2);
        let counted = stream.count().capture();
        let distinct = stream.distinct().capture();
        let mut graph = builder.finalize();

        for (version, batch) in sent.iter() {
            input.send_data(version.clone(), Collection::from(batch.clone()));
        }
        input.close();
        graph.run();

        let everything = v(&[2, 2]);
        for probe in grid.iter().chain(Some(&everything)) {
            let input_acc = accumulate_input(&sent, probe);
            assert_eq!(
                accumulate(&counted.extract(), probe),
                input_acc.count(),
                "count diverged at {:?} for seed {}",
                probe,
                seed,
            );
            assert_eq!(
                accumulate(&distinct.extract(), probe),
                input_acc.distinct(),
                "distinct diverged at {:?} for seed {}",
                probe,
                seed,
            );
        }
    }
}
