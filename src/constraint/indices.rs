//! Sets of constrained DOF indices
use std::collections::BTreeSet;

/// An ordered set of DOF block indices without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintIndices {
    indices: BTreeSet<usize>,
}

impl ConstraintIndices {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an index; returns false if it was already present
    pub fn insert(&mut self, index: usize) -> bool {
        self.indices.insert(index)
    }

    /// Remove an index; returns false if it was not present
    pub fn remove(&mut self, index: usize) -> bool {
        self.indices.remove(&index)
    }

    /// Remove all indices
    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Check if an index is in the set
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Iterate over the indices in increasing order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// The number of indices
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The largest index
    pub fn max(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// Remove all indices that are not less than `size` and return them
    pub fn retain_below(&mut self, size: usize) -> Vec<usize> {
        self.indices.split_off(&size).into_iter().collect()
    }
}

impl FromIterator<usize> for ConstraintIndices {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

impl Extend<usize> for ConstraintIndices {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        self.indices.extend(iter);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_indices() {
        let mut s = ConstraintIndices::new();
        assert!(s.is_empty());
        assert!(s.insert(4));
        assert!(s.insert(1));
        assert!(!s.insert(4));
        s.extend([9, 2]);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1, 2, 4, 9]);
        assert_eq!(s.max(), Some(9));
        assert!(s.remove(2));
        assert!(!s.remove(2));

        assert_eq!(s.retain_below(4), vec![4, 9]);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1]);
        assert!(s.contains(1));
        s.clear();
        assert_eq!(s.len(), 0);
    }
}
