//! Block sparse matrix
use crate::linalg::{
    block_add_assign, block_mul, block_mul_vec, block_transpose_mul_vec, zero_block, Block,
};
use crate::sparse::constraint_matrix::ConstraintMatrix;
use crate::traits::StiffnessAccumulator;
use crate::types::{Error, RealScalar, Result};
use itertools::Itertools;
use std::collections::BTreeMap;

/// A row-major sparse matrix whose entries are dense `R` by `C` blocks
///
/// Entries are staged with [BlockSparseMatrix::insert] (ordered, for matrices that are built
/// row by row) or [BlockSparseMatrix::add_block] (unordered, duplicates are summed). The matrix
/// must be finalised with [BlockSparseMatrix::compress] before it can be multiplied. Staging a
/// new entry into a compressed matrix moves its entries back into the staging area.
///
/// All indices are block indices: a matrix of shape `[m, n]` maps vectors of `n` blocks of
/// size `C` to vectors of `m` blocks of size `R`.
#[derive(Debug, Clone)]
pub struct BlockSparseMatrix<T: RealScalar, const R: usize, const C: usize> {
    shape: [usize; 2],

    // Staged entries
    rows: Vec<usize>,
    cols: Vec<usize>,
    data: Vec<Block<T, R, C>>,
    sorted: bool,
    open_row: Option<usize>,

    // Compressed storage
    row_offsets: Vec<usize>,
    indices: Vec<usize>,
    blocks: Vec<Block<T, R, C>>,
    compressed: bool,
}

impl<T: RealScalar, const R: usize, const C: usize> Default for BlockSparseMatrix<T, R, C> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<T: RealScalar, const R: usize, const C: usize> BlockSparseMatrix<T, R, C> {
    /// Create an empty matrix with `nrows` block rows and `ncols` block columns
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            shape: [nrows, ncols],
            rows: vec![],
            cols: vec![],
            data: vec![],
            sorted: true,
            open_row: None,
            row_offsets: vec![],
            indices: vec![],
            blocks: vec![],
            compressed: false,
        }
    }

    /// Change the shape of the matrix and remove all of its entries
    pub fn resize(&mut self, nrows: usize, ncols: usize) {
        self.shape = [nrows, ncols];
        self.clear();
    }

    /// Remove all entries, keeping the shape
    pub fn clear(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.data.clear();
        self.sorted = true;
        self.open_row = None;
        self.row_offsets.clear();
        self.indices.clear();
        self.blocks.clear();
        self.compressed = false;
    }

    /// The shape of the matrix in blocks
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// The number of block rows
    pub fn nrows(&self) -> usize {
        self.shape[0]
    }

    /// The number of block columns
    pub fn ncols(&self) -> usize {
        self.shape[1]
    }

    /// The shape of the matrix in scalars
    pub fn scalar_shape(&self) -> [usize; 2] {
        [self.shape[0] * R, self.shape[1] * C]
    }

    /// Check if the matrix has been compressed
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The number of stored blocks
    ///
    /// Before compression, duplicated entries added with [BlockSparseMatrix::add_block] are
    /// counted separately.
    pub fn nnz_blocks(&self) -> usize {
        if self.compressed {
            self.blocks.len()
        } else {
            self.data.len()
        }
    }

    /// Check if the matrix has no stored blocks
    pub fn is_empty(&self) -> bool {
        self.nnz_blocks() == 0
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        if row < self.shape[0] && col < self.shape[1] {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                row,
                col,
                shape: self.shape,
            })
        }
    }

    /// Move compressed entries back into the staging area
    fn stage(&mut self) {
        if !self.compressed {
            return;
        }
        let nblocks = self.blocks.len();
        self.rows.reserve(nblocks);
        for (row, range) in self.row_offsets.iter().tuple_windows().enumerate() {
            let (start, end) = range;
            self.rows.extend(std::iter::repeat(row).take(end - start));
        }
        self.cols = std::mem::take(&mut self.indices);
        self.data = std::mem::take(&mut self.blocks);
        self.row_offsets.clear();
        self.sorted = true;
        self.compressed = false;
    }

    /// Open row `row` for insertion
    ///
    /// Rows must be opened in increasing order.
    pub fn begin_row(&mut self, row: usize) -> Result<()> {
        if row >= self.shape[0] {
            return Err(Error::OutOfBounds {
                row,
                col: 0,
                shape: self.shape,
            });
        }
        match self.open_row {
            Some(last) if row < last => Err(Error::RowOrder { row, last }),
            _ => {
                self.open_row = Some(row);
                Ok(())
            }
        }
    }

    /// Append a block at the end of row `row`
    ///
    /// `col` must be strictly greater than any column previously inserted in the row, and
    /// `row` must not come before the most recently opened row. A row that has not been
    /// opened yet is opened.
    pub fn insert(&mut self, row: usize, col: usize, block: Block<T, R, C>) -> Result<()> {
        self.check_bounds(row, col)?;
        match self.open_row {
            Some(last) if row < last => return Err(Error::RowOrder { row, last }),
            Some(last) if row == last => {
                self.stage();
                if let (Some(&last_row), Some(&last_col)) = (self.rows.last(), self.cols.last()) {
                    if last_row == row && col <= last_col {
                        return Err(Error::ColumnOrder {
                            row,
                            col,
                            last: last_col,
                        });
                    }
                }
            }
            _ => {
                self.stage();
                self.open_row = Some(row);
            }
        }
        self.push(row, col, block);
        Ok(())
    }

    /// Insert a block on the diagonal
    pub fn insert_diagonal_block(&mut self, index: usize, block: Block<T, R, C>) -> Result<()> {
        self.insert(index, index, block)
    }

    /// Add a block to the entry at (`row`, `col`)
    ///
    /// Blocks can be added in any order. Blocks added at the same position are summed when the
    /// matrix is compressed.
    pub fn add_block(&mut self, row: usize, col: usize, block: Block<T, R, C>) -> Result<()> {
        self.check_bounds(row, col)?;
        self.stage();
        self.push(row, col, block);
        Ok(())
    }

    fn push(&mut self, row: usize, col: usize, block: Block<T, R, C>) {
        if let (Some(&last_row), Some(&last_col)) = (self.rows.last(), self.cols.last()) {
            if (row, col) <= (last_row, last_col) {
                self.sorted = false;
            }
        }
        self.rows.push(row);
        self.cols.push(col);
        self.data.push(block);
    }

    /// Finalise the staged entries into compressed row storage
    pub fn compress(&mut self) {
        if self.compressed {
            return;
        }
        let order = if self.sorted {
            (0..self.data.len()).collect::<Vec<_>>()
        } else {
            (0..self.data.len())
                .sorted_by_key(|i| (self.rows[*i], self.cols[*i]))
                .collect::<Vec<_>>()
        };

        let mut row_offsets = vec![0; self.shape[0] + 1];
        let mut indices = Vec::with_capacity(order.len());
        let mut blocks: Vec<Block<T, R, C>> = Vec::with_capacity(order.len());
        let mut last = None;
        for i in order {
            let position = (self.rows[i], self.cols[i]);
            if last == Some(position) {
                if let Some(b) = blocks.last_mut() {
                    block_add_assign(b, &self.data[i]);
                }
            } else {
                row_offsets[position.0 + 1] += 1;
                indices.push(position.1);
                blocks.push(self.data[i]);
                last = Some(position);
            }
        }
        for r in 0..self.shape[0] {
            row_offsets[r + 1] += row_offsets[r];
        }

        self.rows.clear();
        self.cols.clear();
        self.data.clear();
        self.sorted = true;
        self.row_offsets = row_offsets;
        self.indices = indices;
        self.blocks = blocks;
        self.compressed = true;
    }

    fn check_compressed(&self) -> Result<()> {
        if self.compressed {
            Ok(())
        } else {
            Err(Error::NotCompressed)
        }
    }

    /// The column indices and blocks stored in a row of a compressed matrix
    pub fn row(&self, row: usize) -> Option<(&[usize], &[Block<T, R, C>])> {
        if !self.compressed || row >= self.shape[0] {
            return None;
        }
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        Some((&self.indices[range.clone()], &self.blocks[range]))
    }

    /// The block stored at (`row`, `col`) of a compressed matrix
    pub fn block(&self, row: usize, col: usize) -> Option<&Block<T, R, C>> {
        let (indices, blocks) = self.row(row)?;
        indices.binary_search(&col).ok().map(|k| &blocks[k])
    }

    /// Compute `out = self * input`
    pub fn mul(&self, out: &mut [[T; R]], input: &[[T; C]]) -> Result<()> {
        self.check_compressed()?;
        check_len(self.shape[0], out.len())?;
        check_len(self.shape[1], input.len())?;
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.row_product(row, input);
        }
        Ok(())
    }

    /// Compute `out += factor * self * input`
    pub fn mul_add(&self, out: &mut [[T; R]], input: &[[T; C]], factor: T) -> Result<()> {
        self.check_compressed()?;
        check_len(self.shape[0], out.len())?;
        check_len(self.shape[1], input.len())?;
        for (row, o) in out.iter_mut().enumerate() {
            let product = self.row_product(row, input);
            for (x, y) in o.iter_mut().zip(product.iter()) {
                *x = *x + factor * *y;
            }
        }
        Ok(())
    }

    fn row_product(&self, row: usize, input: &[[T; C]]) -> [T; R] {
        let mut acc = [T::zero(); R];
        for k in self.row_offsets[row]..self.row_offsets[row + 1] {
            let product = block_mul_vec(&self.blocks[k], &input[self.indices[k]]);
            for (a, p) in acc.iter_mut().zip(product.iter()) {
                *a = *a + *p;
            }
        }
        acc
    }

    /// Compute `out += selfᵗ * input`
    ///
    /// `out` is accumulated into and is never reset.
    pub fn mul_transpose_add(&self, out: &mut [[T; C]], input: &[[T; R]]) -> Result<()> {
        self.check_compressed()?;
        check_len(self.shape[1], out.len())?;
        check_len(self.shape[0], input.len())?;
        for (row, x) in input.iter().enumerate() {
            for k in self.row_offsets[row]..self.row_offsets[row + 1] {
                let product = block_transpose_mul_vec(&self.blocks[k], x);
                let o = &mut out[self.indices[k]];
                for (a, p) in o.iter_mut().zip(product.iter()) {
                    *a = *a + *p;
                }
            }
        }
        Ok(())
    }

    /// Accumulate the rows of `input` multiplied by this matrix into `out`
    ///
    /// Each row `c` of `input` is a sparse row vector over the block rows of this matrix; the
    /// row `c` of `out` receives `input_c * self`. This is the transpose product used by
    /// constraint based solvers.
    pub fn mul_transpose_rows(
        &self,
        out: &mut ConstraintMatrix<T, C>,
        input: &ConstraintMatrix<T, R>,
    ) -> Result<()> {
        self.check_compressed()?;
        for (constraint, entries) in input.rows() {
            for (&block_row, value) in entries {
                if block_row >= self.shape[0] {
                    return Err(Error::OutOfBounds {
                        row: block_row,
                        col: 0,
                        shape: self.shape,
                    });
                }
                for k in self.row_offsets[block_row]..self.row_offsets[block_row + 1] {
                    out.add_entry(
                        constraint,
                        self.indices[k],
                        block_transpose_mul_vec(&self.blocks[k], value),
                    );
                }
            }
        }
        Ok(())
    }

    /// Compute the product `self * other`
    pub fn matmul<const K: usize>(
        &self,
        other: &BlockSparseMatrix<T, C, K>,
    ) -> Result<BlockSparseMatrix<T, R, K>> {
        self.check_compressed()?;
        other.check_compressed()?;
        check_len(self.shape[1], other.shape[0])?;

        let mut out = BlockSparseMatrix::<T, R, K>::new(self.shape[0], other.shape[1]);
        for row in 0..self.shape[0] {
            let mut acc = BTreeMap::<usize, Block<T, R, K>>::new();
            for k in self.row_offsets[row]..self.row_offsets[row + 1] {
                let inner = self.indices[k];
                for m in other.row_offsets[inner]..other.row_offsets[inner + 1] {
                    let entry = acc
                        .entry(other.indices[m])
                        .or_insert_with(zero_block::<T, R, K>);
                    block_add_assign(entry, &block_mul(&self.blocks[k], &other.blocks[m]));
                }
            }
            for (col, block) in acc {
                out.insert(row, col, block)?;
            }
        }
        out.compress();
        Ok(out)
    }
}

impl<T: RealScalar, const N: usize> StiffnessAccumulator<T, N> for BlockSparseMatrix<T, N, N> {
    fn accumulate(&mut self, row: usize, col: usize, block: &Block<T, N, N>) -> Result<()> {
        self.add_block(row, col, *block)
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, found })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linalg::identity;
    use approx::*;
    use paste::paste;

    fn example_matrix<T: RealScalar>() -> BlockSparseMatrix<T, 1, 2> {
        let one = T::one();
        let two = one + one;
        let mut m = BlockSparseMatrix::<T, 1, 2>::new(3, 4);
        m.begin_row(0).unwrap();
        m.insert(0, 1, [[one, two]]).unwrap();
        m.insert(0, 3, [[-one, one]]).unwrap();
        m.begin_row(1).unwrap();
        m.begin_row(2).unwrap();
        m.insert(2, 0, [[two, two]]).unwrap();
        m.compress();
        m
    }

    macro_rules! test_mul {
        ($($scalar:ident),+) => {
        $(
            paste! {
                #[test]
                fn [<test_mul_ $scalar>]() {
                    let m = example_matrix::<$scalar>();
                    let input = [[1.0, 0.0], [0.0, 1.0], [2.0, 2.0], [1.0, -1.0]];
                    let mut out = [[7.0]; 3];
                    m.mul(&mut out, &input).unwrap();
                    assert_relative_eq!(out[0][0], 2.0 - 2.0);
                    assert_relative_eq!(out[1][0], 0.0);
                    assert_relative_eq!(out[2][0], 2.0);
                }

                #[test]
                fn [<test_mul_transpose_add_ $scalar>]() {
                    let m = example_matrix::<$scalar>();
                    let input = [[1.0], [5.0], [-1.0]];
                    let mut out = [[1.0, 1.0]; 4];
                    m.mul_transpose_add(&mut out, &input).unwrap();
                    assert_eq!(out[0], [-1.0, -1.0]);
                    assert_eq!(out[1], [2.0, 3.0]);
                    assert_eq!(out[2], [1.0, 1.0]);
                    assert_eq!(out[3], [0.0, 2.0]);
                }
            }
        )*
        };
    }

    test_mul!(f32, f64);

    #[test]
    fn test_column_order() {
        let mut m = BlockSparseMatrix::<f64, 1, 1>::new(2, 3);
        m.insert(0, 1, [[1.0]]).unwrap();
        assert_eq!(
            m.insert(0, 0, [[1.0]]),
            Err(Error::ColumnOrder {
                row: 0,
                col: 0,
                last: 1
            })
        );
        assert_eq!(
            m.insert(0, 1, [[1.0]]),
            Err(Error::ColumnOrder {
                row: 0,
                col: 1,
                last: 1
            })
        );
        m.insert(1, 0, [[1.0]]).unwrap();
        assert_eq!(
            m.insert(0, 2, [[1.0]]),
            Err(Error::RowOrder { row: 0, last: 1 })
        );
        assert_eq!(m.begin_row(0), Err(Error::RowOrder { row: 0, last: 1 }));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut m = BlockSparseMatrix::<f64, 1, 1>::new(2, 3);
        assert!(matches!(
            m.insert(2, 0, [[1.0]]),
            Err(Error::OutOfBounds { row: 2, col: 0, .. })
        ));
        assert!(matches!(
            m.add_block(0, 3, [[1.0]]),
            Err(Error::OutOfBounds { row: 0, col: 3, .. })
        ));
    }

    #[test]
    fn test_mul_requires_compress() {
        let mut m = BlockSparseMatrix::<f64, 1, 1>::new(1, 1);
        m.insert(0, 0, [[2.0]]).unwrap();
        let mut out = [[0.0]];
        assert_eq!(m.mul(&mut out, &[[1.0]]), Err(Error::NotCompressed));
        m.compress();
        m.mul(&mut out, &[[1.0]]).unwrap();
        assert_eq!(out, [[2.0]]);
        assert_eq!(
            m.mul(&mut out, &[[1.0], [1.0]]),
            Err(Error::DimensionMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn test_add_block_sums_duplicates() {
        let mut m = BlockSparseMatrix::<f64, 2, 2>::new(3, 3);
        m.add_block(2, 0, [[1.0, 0.0], [0.0, 1.0]]).unwrap();
        m.add_block(0, 1, [[1.0, 2.0], [3.0, 4.0]]).unwrap();
        m.add_block(2, 0, [[1.0, 1.0], [1.0, 1.0]]).unwrap();
        m.add_block(0, 0, [[5.0, 0.0], [0.0, 5.0]]).unwrap();
        assert_eq!(m.nnz_blocks(), 4);
        m.compress();
        assert_eq!(m.nnz_blocks(), 3);
        assert_eq!(m.block(2, 0), Some(&[[2.0, 1.0], [1.0, 2.0]]));
        assert_eq!(m.block(0, 0), Some(&[[5.0, 0.0], [0.0, 5.0]]));
        assert_eq!(m.block(1, 1), None);
        let (cols, _) = m.row(0).unwrap();
        assert_eq!(cols, &[0, 1]);
    }

    #[test]
    fn test_insert_after_compress() {
        let mut m = BlockSparseMatrix::<f64, 1, 1>::new(3, 3);
        m.insert_diagonal_block(0, [[1.0]]).unwrap();
        m.compress();
        m.insert_diagonal_block(1, [[2.0]]).unwrap();
        assert!(!m.is_compressed());
        m.insert_diagonal_block(2, [[3.0]]).unwrap();
        m.compress();
        let mut out = [[0.0]; 3];
        m.mul(&mut out, &[[1.0], [1.0], [1.0]]).unwrap();
        assert_eq!(out, [[1.0], [2.0], [3.0]]);
    }

    #[test]
    fn test_matmul() {
        let m = example_matrix::<f64>();
        let mut id = BlockSparseMatrix::<f64, 2, 2>::new(4, 4);
        for i in 0..4 {
            id.insert_diagonal_block(i, identity()).unwrap();
        }
        id.compress();
        let product = m.matmul(&id).unwrap();
        assert_eq!(product.shape(), [3, 4]);
        assert_eq!(product.nnz_blocks(), m.nnz_blocks());
        for row in 0..3 {
            assert_eq!(product.row(row), m.row(row));
        }
        let mut wrong = BlockSparseMatrix::<f64, 2, 2>::new(3, 3);
        wrong.compress();
        assert_eq!(
            id.matmul(&wrong).err(),
            Some(Error::DimensionMismatch {
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn test_mul_transpose_rows() {
        let m = example_matrix::<f64>();
        let mut input = ConstraintMatrix::<f64, 1>::new();
        input.add_entry(4, 0, [2.0]);
        input.add_entry(4, 2, [1.0]);
        let mut out = ConstraintMatrix::<f64, 2>::new();
        m.mul_transpose_rows(&mut out, &input).unwrap();
        let row = out.row(4).unwrap();
        assert_eq!(row.get(&0), Some(&[2.0, 2.0]));
        assert_eq!(row.get(&1), Some(&[2.0, 4.0]));
        assert_eq!(row.get(&3), Some(&[-2.0, 2.0]));
        assert_eq!(out.row_count(), 1);
    }
}
