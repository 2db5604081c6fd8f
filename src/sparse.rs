//! Sparse matrices
pub mod block_sparse;
pub mod constraint_matrix;
pub mod triplets;

pub use block_sparse::BlockSparseMatrix;
pub use constraint_matrix::ConstraintMatrix;
pub use triplets::SparseMatrixData;
