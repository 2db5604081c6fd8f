//! Global stiffness accumulation
use crate::linalg::Block;
use crate::types::{RealScalar, Result};

/// A sink for block contributions to a global stiffness matrix
///
/// Systems that assemble a single global matrix pass an accumulator to every component
/// instead of asking each component for its own matrix.
pub trait StiffnessAccumulator<T: RealScalar, const N: usize> {
    /// Add `block` to the block at (`row`, `col`)
    fn accumulate(&mut self, row: usize, col: usize, block: &Block<T, N, N>) -> Result<()>;
}
