//! Common logic for the consolidation of update vectors.
//!
//! Often we find ourselves with vectors of records with associated multiplicities,
//! where we want to reduce the vector to the point that each record occurs at most
//! once, with the accumulated multiplicity. These methods supply that functionality,
//! and are the canonicalization step behind semantic collection equality.

use crate::order::Version;
use crate::Diff;

/// Sorts and consolidates `vec`.
///
/// This method will sort `vec` and then consolidate runs of more than one entry with
/// identical first elements by accumulating the second elements of the pairs. Should the
/// final accumulation be zero, the entry is discarded.
pub fn consolidate<T: Ord>(vec: &mut Vec<(T, Diff)>) {
    if vec.len() > 1 {
        vec.sort_by(|x, y| x.0.cmp(&y.0));

        // Counts the number of distinct known-non-zero accumulations. Indexes the write location.
        let mut offset = 0;
        for index in 1..vec.len() {
            if vec[index].0 == vec[offset].0 {
                let diff = vec[index].1;
                vec[offset].1 += diff;
            } else {
                if vec[offset].1 != 0 {
                    offset += 1;
                }
                vec.swap(offset, index);
            }
        }
        if vec[offset].1 != 0 {
            offset += 1;
        }
        vec.truncate(offset);
    } else {
        vec.retain(|x| x.1 != 0);
    }
}

/// Sorts and consolidates the versioned update vector `vec`.
///
/// As `consolidate`, but for triples of record, version, and multiplicity: entries
/// merge only when both record and version are identical.
pub fn consolidate_updates<D: Ord>(vec: &mut Vec<(D, Version, Diff)>) {
    if vec.len() > 1 {
        vec.sort_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));

        let mut offset = 0;
        for index in 1..vec.len() {
            if vec[index].0 == vec[offset].0 && vec[index].1 == vec[offset].1 {
                let diff = vec[index].2;
                vec[offset].2 += diff;
            } else {
                if vec[offset].2 != 0 {
                    offset += 1;
                }
                vec.swap(offset, index);
            }
        }
        if vec[offset].2 != 0 {
            offset += 1;
        }
        vec.truncate(offset);
    } else {
        vec.retain(|x| x.2 != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_and_drops_zeros() {
        let mut updates = vec![("b", 1), ("a", 2), ("b", -1), ("a", 1)];
        consolidate(&mut updates);
        assert_eq!(updates, vec![("a", 3)]);
    }

    #[test]
    fn empty_and_singleton() {
        let mut updates: Vec<(u64, Diff)> = vec![];
        consolidate(&mut updates);
        assert!(updates.is_empty());

        let mut updates = vec![(1u64, 0)];
        consolidate(&mut updates);
        assert!(updates.is_empty());
    }

    #[test]
    fn versioned_updates_merge_per_version() {
        let v0 = Version::from(vec![0]);
        let v1 = Version::from(vec![1]);
        let mut updates = vec![
            ("a", v1.clone(), 1),
            ("a", v0.clone(), 1),
            ("a", v0.clone(), 1),
            ("b", v0.clone(), 1),
            ("b", v0.clone(), -1),
        ];
        consolidate_updates(&mut updates);
        assert_eq!(updates, vec![("a", v0, 2), ("a", v1, 1)]);
    }
}
