//! Scalar sparse matrix in coordinate format
use crate::linalg::Block;
use crate::traits::StiffnessAccumulator;
use crate::types::{Error, RealScalar, Result};

/// Data for a sparse matrix stored as (row, column, value) triplets
///
/// Repeated positions are allowed; their values are summed when the matrix is applied. This
/// is the layout used to assemble one global matrix from the contributions of many
/// components.
#[derive(Debug, Clone)]
pub struct SparseMatrixData<T: RealScalar> {
    /// Data
    pub data: Vec<T>,
    /// Rows
    pub rows: Vec<usize>,
    /// Columns
    pub cols: Vec<usize>,
    /// Shape of the matrix
    pub shape: [usize; 2],
}

impl<T: RealScalar> SparseMatrixData<T> {
    /// Create new sparse matrix
    pub fn new(shape: [usize; 2]) -> Self {
        Self {
            data: vec![],
            rows: vec![],
            cols: vec![],
            shape,
        }
    }
    /// Create new sparse matrix with a known number of entries
    pub fn new_known_size(shape: [usize; 2], size: usize) -> Self {
        Self {
            data: Vec::with_capacity(size),
            rows: Vec::with_capacity(size),
            cols: Vec::with_capacity(size),
            shape,
        }
    }
    /// Add a single entry
    pub fn add_entry(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.shape[0] || col >= self.shape[1] {
            return Err(Error::OutOfBounds {
                row,
                col,
                shape: self.shape,
            });
        }
        self.rows.push(row);
        self.cols.push(col);
        self.data.push(value);
        Ok(())
    }
    /// Add another sparse matrix to this matrix
    pub fn add(&mut self, other: SparseMatrixData<T>) {
        debug_assert!(self.shape[0] == other.shape[0]);
        debug_assert!(self.shape[1] == other.shape[1]);
        self.rows.extend(&other.rows);
        self.cols.extend(&other.cols);
        self.data.extend(&other.data);
    }
    /// Compute the sum of this sparse matrix and another sparse matrix
    pub fn sum(&self, other: SparseMatrixData<T>) -> SparseMatrixData<T> {
        let mut out = self.clone();
        out.add(other);
        out
    }
    /// Compute `out = self * input` for flat vectors
    pub fn matvec(&self, out: &mut [T], input: &[T]) -> Result<()> {
        if out.len() != self.shape[0] {
            return Err(Error::DimensionMismatch {
                expected: self.shape[0],
                found: out.len(),
            });
        }
        if input.len() != self.shape[1] {
            return Err(Error::DimensionMismatch {
                expected: self.shape[1],
                found: input.len(),
            });
        }
        out.fill(T::zero());
        for ((r, c), v) in self.rows.iter().zip(&self.cols).zip(&self.data) {
            out[*r] = out[*r] + *v * input[*c];
        }
        Ok(())
    }
}

impl<T: RealScalar, const N: usize> StiffnessAccumulator<T, N> for SparseMatrixData<T> {
    fn accumulate(&mut self, row: usize, col: usize, block: &Block<T, N, N>) -> Result<()> {
        for (i, block_row) in block.iter().enumerate() {
            for (j, value) in block_row.iter().enumerate() {
                self.add_entry(row * N + i, col * N + j, *value)?;
            }
        }
        Ok(())
    }
}
