//! Geometric stiffness
use crate::linalg::{block_mul_vec, block_scale, Mat3, Vec3};
use crate::sparse::BlockSparseMatrix;
use crate::traits::StiffnessAccumulator;
use crate::types::{Error, RealScalar, Result};

/// Selects when the geometric stiffness of a mapping is taken into account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometricStiffnessMode {
    /// Never
    None,
    /// For every element
    Always,
    /// Only for elements whose child force is negative (compression)
    #[default]
    Negative,
}

impl GeometricStiffnessMode {
    /// Check if an element with the given child force contributes
    pub fn is_active<T: RealScalar>(&self, child_force: T) -> bool {
        match self {
            GeometricStiffnessMode::None => false,
            GeometricStiffnessMode::Always => true,
            GeometricStiffnessMode::Negative => child_force < T::zero(),
        }
    }
}

/// The geometric stiffness of one element with `M` vertices
///
/// The contribution to the stiffness block coupling the vertices `vertices[i]` and
/// `vertices[j]` is `weight * hessian[i][j]`.
#[derive(Debug, Clone)]
pub struct ElementStiffness<T: RealScalar, const M: usize> {
    /// Parent DOF indices of the element's vertices
    pub vertices: [usize; M],
    /// Second derivative of the mapped value with respect to the vertices
    pub hessian: [[Mat3<T>; M]; M],
    /// The child force acting on the element
    pub weight: T,
}

impl<T: RealScalar, const M: usize> ElementStiffness<T, M> {
    /// The weighted block coupling local vertices `i` and `j`
    pub fn block(&self, i: usize, j: usize) -> Mat3<T> {
        block_scale(&self.hessian[i][j], self.weight)
    }
}

/// Second-order correction of a nonlinear mapping over the parent DOF space
///
/// The stiffness is either assembled into a block sparse matrix by
/// [GeometricStiffness::assemble], or left empty, in which case it is evaluated element by
/// element when it is applied. Both give the same result.
#[derive(Debug, Clone, Default)]
pub struct GeometricStiffness<T: RealScalar> {
    matrix: BlockSparseMatrix<T, 3, 3>,
}

impl<T: RealScalar> GeometricStiffness<T> {
    /// Create an empty (unassembled) stiffness
    pub fn new() -> Self {
        Self {
            matrix: BlockSparseMatrix::new(0, 0),
        }
    }

    /// The assembled matrix
    pub fn matrix(&self) -> &BlockSparseMatrix<T, 3, 3> {
        &self.matrix
    }

    /// Check if the stiffness has been assembled with at least one block
    pub fn is_assembled(&self) -> bool {
        self.matrix.is_compressed() && !self.matrix.is_empty()
    }

    /// Drop the assembled matrix
    pub fn clear(&mut self) {
        self.matrix.resize(0, 0);
    }

    /// Assemble the contributions of `elements` into a `size` by `size` block matrix
    pub fn assemble<const M: usize>(
        &mut self,
        size: usize,
        elements: &[ElementStiffness<T, M>],
    ) -> Result<()> {
        self.matrix.resize(size, size);
        Self::accumulate_into(&mut self.matrix, elements)?;
        self.matrix.compress();
        Ok(())
    }

    /// Add the contributions of `elements` to an accumulator
    pub fn accumulate_into<A: StiffnessAccumulator<T, 3>, const M: usize>(
        accumulator: &mut A,
        elements: &[ElementStiffness<T, M>],
    ) -> Result<()> {
        for element in elements {
            for (i, vi) in element.vertices.iter().enumerate() {
                for (j, vj) in element.vertices.iter().enumerate() {
                    accumulator.accumulate(*vi, *vj, &element.block(i, j))?;
                }
            }
        }
        Ok(())
    }

    /// Compute `force += k_factor * K * displacement` with the assembled matrix
    pub fn add_mul(
        &self,
        force: &mut [Vec3<T>],
        displacement: &[Vec3<T>],
        k_factor: T,
    ) -> Result<()> {
        self.matrix.mul_add(force, displacement, k_factor)
    }

    /// Compute `force += k_factor * K * displacement` directly from element contributions
    pub fn apply_elements<const M: usize>(
        force: &mut [Vec3<T>],
        displacement: &[Vec3<T>],
        k_factor: T,
        elements: &[ElementStiffness<T, M>],
    ) -> Result<()> {
        if force.len() != displacement.len() {
            return Err(Error::DimensionMismatch {
                expected: force.len(),
                found: displacement.len(),
            });
        }
        for element in elements {
            if let Some(&index) = element.vertices.iter().find(|v| **v >= force.len()) {
                return Err(Error::IndexOutOfRange {
                    index,
                    size: force.len(),
                });
            }
            for (i, vi) in element.vertices.iter().enumerate() {
                for (j, vj) in element.vertices.iter().enumerate() {
                    let product = block_mul_vec(&element.block(i, j), &displacement[*vj]);
                    for (f, p) in force[*vi].iter_mut().zip(product.iter()) {
                        *f = *f + k_factor * *p;
                    }
                }
            }
        }
        Ok(())
    }
}
