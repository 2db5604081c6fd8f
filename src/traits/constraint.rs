//! Projective constraints
use crate::sparse::{BlockSparseMatrix, ConstraintMatrix};
use crate::types::{RealScalar, Result};

/// A constraint that projects the state of a DOF space with blocks of size `N` onto an
/// allowed subspace
pub trait ProjectiveConstraint<T: RealScalar, const N: usize> {
    /// Project a response (e.g. an acceleration or a solver correction) in place
    fn project_response(&mut self, response: &mut [[T; N]]) -> Result<()>;

    /// Project velocities in place
    fn project_velocity(&mut self, velocity: &mut [[T; N]]) -> Result<()> {
        self.project_response(velocity)
    }

    /// Project positions in place
    fn project_position(&self, position: &mut [[T; N]]) -> Result<()>;

    /// Replace an assembled system matrix `M` by `P M P`
    ///
    /// The projector acts on the blocks starting at block `offset` of `matrix` and is the
    /// identity on all other blocks.
    fn project_matrix(&mut self, matrix: &mut BlockSparseMatrix<T, N, N>, offset: usize)
        -> Result<()>;

    /// Project the entries of constraint rows in place
    fn project_jacobian_rows(&self, rows: &mut ConstraintMatrix<T, N>) -> Result<()>;
}
