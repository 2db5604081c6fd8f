//! Mappings between DOF spaces
use crate::sparse::{BlockSparseMatrix, ConstraintMatrix};
use crate::traits::StiffnessAccumulator;
use crate::types::{RealScalar, Result};

/// A differentiable mapping from a parent DOF space with blocks of size `NIN` to a child DOF
/// space with blocks of size `NOUT`
///
/// Within one step the calls are expected in the order `apply`, `apply_j`, `apply_jt`,
/// `apply_djt`. The Jacobian built by `apply` describes the configuration passed to it and
/// stays valid until the next call to `apply`.
pub trait Mapping<T: RealScalar, const NIN: usize, const NOUT: usize> {
    /// Map the parent positions `input` to the child positions `out`, and rebuild the Jacobian
    /// at this configuration
    fn apply(&mut self, out: &mut [[T; NOUT]], input: &[[T; NIN]]) -> Result<()>;

    /// Propagate parent velocities to child velocities: `out = J input`
    fn apply_j(&self, out: &mut [[T; NOUT]], input: &[[T; NIN]]) -> Result<()>;

    /// Propagate child forces to parent forces: `out += Jᵗ input`
    ///
    /// `out` is accumulated into; callers are responsible for zeroing it.
    fn apply_jt(&self, out: &mut [[T; NIN]], input: &[[T; NOUT]]) -> Result<()>;

    /// Propagate child constraint rows to parent constraint rows: `out += input J`
    fn apply_jt_constraint(
        &self,
        out: &mut ConstraintMatrix<T, NIN>,
        input: &ConstraintMatrix<T, NOUT>,
    ) -> Result<()>;

    /// Add the geometric stiffness contribution to the parent force
    ///
    /// This computes `parent_force += k_factor * dJᵗ/dx(child_force) * parent_displacement`.
    fn apply_djt(
        &self,
        parent_force: &mut [[T; NIN]],
        parent_displacement: &[[T; NIN]],
        child_force: &[[T; NOUT]],
        k_factor: T,
    ) -> Result<()>;

    /// The Jacobian at the configuration of the last call to `apply`
    fn jacobian(&self) -> &BlockSparseMatrix<T, NOUT, NIN>;
}

/// A nonlinear mapping that can assemble its geometric stiffness
pub trait GeometricStiffnessMapping<T: RealScalar, const NIN: usize, const NOUT: usize>:
    Mapping<T, NIN, NOUT>
{
    /// Assemble the geometric stiffness for the given child force into the matrix owned by
    /// the mapping
    fn update_k(&mut self, child_force: &[[T; NOUT]]) -> Result<()>;

    /// The geometric stiffness matrix assembled by the last call to `update_k`
    fn geometric_stiffness(&self) -> &BlockSparseMatrix<T, NIN, NIN>;

    /// Add the geometric stiffness for the given child force to a global accumulator
    fn build_geometric_stiffness_matrix<A: StiffnessAccumulator<T, NIN>>(
        &self,
        accumulator: &mut A,
        child_force: &[[T; NOUT]],
    ) -> Result<()>;
}
