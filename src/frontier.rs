//! Tracks minimal sets of mutually incomparable versions.

use serde::{Deserialize, Serialize};

use crate::order::{PartialOrder, Version};

/// A set of mutually incomparable elements, interpreted as a frontier.
///
/// An antichain is a set of partially ordered elements, each of which is incomparable
/// to the others. The frontier it denotes is the set of elements greater than or equal
/// to some member; inserting an element evicts any member it is less than, so the set
/// stays minimal. The empty antichain denotes the terminal frontier, beyond which no
/// element lies.
///
/// Two antichains are equal if they contain the same set of elements, even if in
/// different orders. This can make equality testing quadratic, though linear in the
/// common case that the sequences are identical.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Antichain<T> {
    elements: Vec<T>,
}

impl<T: PartialOrder> Antichain<T> {
    /// Updates the antichain if the element is not greater than or equal to some present element.
    ///
    /// Returns true if the element is added to the set.
    ///
    /// # Examples
    ///
    ///```
    /// use deltaflow::Antichain;
    ///
    /// let mut frontier = Antichain::new();
    /// assert!(frontier.insert(2u64));
    /// assert!(!frontier.insert(3));
    ///```
    pub fn insert(&mut self, element: T) -> bool {
        if !self.elements.iter().any(|x| x.less_equal(&element)) {
            self.elements.retain(|x| !element.less_equal(x));
            self.elements.push(element);
            true
        } else {
            false
        }
    }

    /// Performs a sequence of insertions and returns true iff any insertion does.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iterator: I) -> bool {
        let mut added = false;
        for element in iterator {
            added = self.insert(element) || added;
        }
        added
    }

    /// Returns true if any item in the antichain is strictly less than the argument.
    #[inline]
    pub fn less_than(&self, element: &T) -> bool {
        self.elements.iter().any(|x| x.less_than(element))
    }

    /// Returns true if any item in the antichain is less than or equal to the argument.
    ///
    /// This is the "is `element` still open" test: a frontier keeps a version open
    /// exactly when some frontier element is less than or equal to it.
    ///
    /// # Examples
    ///
    ///```
    /// use deltaflow::Antichain;
    ///
    /// let frontier = Antichain::from_elem(2u64);
    /// assert!(frontier.less_equal(&3));
    /// assert!(frontier.less_equal(&2));
    /// assert!(!frontier.less_equal(&1));
    ///```
    #[inline]
    pub fn less_equal(&self, element: &T) -> bool {
        self.elements.iter().any(|x| x.less_equal(element))
    }

    /// The meet of two antichains: the finest frontier no finer than either argument.
    ///
    /// Formed as the union of the elements with dominated elements removed, this is the
    /// frontier whose future is the union of the two futures.
    pub fn meet(&self, other: &Self) -> Self
    where
        T: Clone,
    {
        let mut result = self.clone();
        result.extend(other.elements.iter().cloned());
        result
    }
}

impl<T> Antichain<T> {
    /// Creates a new empty antichain: the terminal frontier.
    pub fn new() -> Antichain<T> {
        Antichain {
            elements: Vec::new(),
        }
    }

    /// Creates a new singleton antichain.
    pub fn from_elem(element: T) -> Antichain<T> {
        Antichain {
            elements: vec![element],
        }
    }

    /// Reveals the elements in the antichain.
    #[inline]
    pub fn elements(&self) -> &[T] {
        &self.elements[..]
    }

    /// Returns true if the antichain is empty, i.e. every version is closed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sorts the elements so that comparisons between antichains can be made.
    pub fn sort(&mut self)
    where
        T: Ord,
    {
        self.elements.sort()
    }
}

impl<T: PartialEq> PartialEq for Antichain<T> {
    fn eq(&self, other: &Self) -> bool {
        // Lengths should be the same, with the option for fast acceptance if identical.
        self.elements().len() == other.elements().len()
            && (self
                .elements()
                .iter()
                .zip(other.elements().iter())
                .all(|(t1, t2)| t1 == t2)
                || self
                    .elements()
                    .iter()
                    .all(|t1| other.elements().iter().any(|t2| t1.eq(t2))))
    }
}

impl<T: Eq> Eq for Antichain<T> {}

impl<T: PartialOrder> PartialOrder for Antichain<T> {
    /// An antichain is less or equal to another if every element of the second is
    /// greater or equal to some element of the first: its frontier contains the other's.
    fn less_equal(&self, other: &Self) -> bool {
        other
            .elements()
            .iter()
            .all(|t2| self.elements().iter().any(|t1| t1.less_equal(t2)))
    }
}

impl<T: PartialOrder> From<Vec<T>> for Antichain<T> {
    fn from(vec: Vec<T>) -> Self {
        let mut temp = Antichain::new();
        for elem in vec.into_iter() {
            temp.insert(elem);
        }
        temp
    }
}

impl Antichain<Version> {
    /// The antichain with each element extended by a trailing zero coordinate.
    ///
    /// Extension preserves incomparability, so no re-minimization is needed; the
    /// insertion path is used anyway to keep the invariant locally evident.
    pub fn extended(&self) -> Self {
        let mut result = Antichain::new();
        result.extend(self.elements.iter().map(|v| v.extend()));
        result
    }

    /// The antichain with each element's trailing coordinate dropped, re-minimized.
    ///
    /// Truncation can make elements comparable, so the result is rebuilt by insertion.
    pub fn truncated(&self) -> Self {
        let mut result = Antichain::new();
        result.extend(self.elements.iter().map(|v| v.truncate()));
        result
    }
}
