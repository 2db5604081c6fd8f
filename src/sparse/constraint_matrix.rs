//! Sparse constraint rows
use crate::types::RealScalar;
use std::collections::BTreeMap;

/// A set of sparse constraint rows over a DOF space
///
/// Each row is identified by a constraint index and holds values of size `N` attached to DOF
/// block indices. This is the right-hand side used by constraint based solvers, where forces
/// are replaced by rows of a constraint Jacobian.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintMatrix<T: RealScalar, const N: usize> {
    rows: BTreeMap<usize, BTreeMap<usize, [T; N]>>,
}

impl<T: RealScalar, const N: usize> ConstraintMatrix<T, N> {
    /// Create an empty set of rows
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Add `value` to the entry of row `row` attached to DOF `dof`
    pub fn add_entry(&mut self, row: usize, dof: usize, value: [T; N]) {
        let entry = self
            .rows
            .entry(row)
            .or_default()
            .entry(dof)
            .or_insert([T::zero(); N]);
        for (e, v) in entry.iter_mut().zip(value.iter()) {
            *e = *e + *v;
        }
    }

    /// Get a row
    pub fn row(&self, row: usize) -> Option<&BTreeMap<usize, [T; N]>> {
        self.rows.get(&row)
    }

    /// Iterate over the rows in increasing order
    pub fn rows(&self) -> impl Iterator<Item = (usize, &BTreeMap<usize, [T; N]>)> {
        self.rows.iter().map(|(r, entries)| (*r, entries))
    }

    /// Iterate mutably over all entries as (row, DOF, value)
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut [T; N])> {
        self.rows.iter_mut().flat_map(|(r, entries)| {
            let r = *r;
            entries.iter_mut().map(move |(dof, value)| (r, *dof, value))
        })
    }

    /// The number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove all rows
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
