//! Deltaflow is an incremental dataflow engine over partially ordered versions.
//!
//! Deltaflow programs are written in a collection-oriented style, where multisets of
//! records are transformed and combined using primitive operations like `map`, `filter`,
//! `join`, and `reduce`. Deltaflow also includes a higher-order operation `iterate`.
//!
//! Having defined a computation, you may then add or remove records from its inputs at
//! any version of a partially ordered set of versions, and the engine will update the
//! computation's outputs with the corresponding additions and removals, using work
//! roughly proportional to the size of the change rather than the size of the data.
//!
//! The engine is single-threaded and cooperative: the host repeatedly calls
//! [`Graph::step`](dataflow::Graph::step), and each call performs a bounded quantum of
//! work on one operator with pending input.
//!
//! # Examples
//!
//! ```
//! use deltaflow::dataflow::GraphBuilder;
//! use deltaflow::{Collection, Version};
//!
//! let builder = GraphBuilder::new();
//! let (stream, mut input) = builder.new_input::<u64>(1);
//! let handle = stream.map(|x| x + 10).filter(|x| *x > 10).capture();
//! let mut graph = builder.finalize();
//!
//! input.send_data(Version::from(vec![0]), Collection::from(vec![(1, 1), (2, 1)]));
//! input.close();
//! graph.run();
//!
//! assert_eq!(
//!     handle.extract(),
//!     vec![(Version::from(vec![0]), vec![(11, 1), (12, 1)])],
//! );
//! ```

#![forbid(missing_docs)]

use std::fmt::Debug;
use std::hash::Hash;

/// A change in multiplicity.
///
/// A multiplicity of zero is indistinguishable from absence.
pub type Diff = isize;

/// A composite trait for record types usable in deltaflow.
///
/// Records are opaque to the engine: any hashable, orderable, cloneable value will do.
/// Key-aware operators (`join`, the `reduce` family) interpret records as `(key, value)`
/// pairs. The `Ord` requirement exists so that collections can be canonicalized and
/// compared semantically; it need not be meaningful for the domain.
pub trait Data: Clone + Eq + Ord + Hash + Debug + 'static {}
impl<T: Clone + Eq + Ord + Hash + Debug + 'static> Data for T {}

pub use collection::Collection;
pub use frontier::Antichain;
pub use lattice::Lattice;
pub use order::{PartialOrder, Version};

pub mod collection;
pub mod consolidation;
pub mod dataflow;
pub mod frontier;
pub mod lattice;
pub mod order;
pub mod trace;
