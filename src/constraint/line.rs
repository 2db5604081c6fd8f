//! Constraint of points to a line
use crate::constraint::indices::ConstraintIndices;
use crate::linalg::{identity, point, to_vec3, Mat3, Vec3};
use crate::sparse::{BlockSparseMatrix, ConstraintMatrix};
use crate::traits::ProjectiveConstraint;
use crate::types::{Error, RealScalar, Result};
use log::{debug, error};
use rlst::rlst_static_array;

/// Parameters of a line constraint
#[derive(Debug, Clone)]
pub struct LineConstraintParams<T: RealScalar> {
    /// A point on the line
    pub origin: Vec3<T>,
    /// The direction of the line; it does not need to be normalised
    pub direction: Vec3<T>,
    /// The constrained DOF indices
    pub indices: ConstraintIndices,
}

impl<T: RealScalar> Default for LineConstraintParams<T> {
    fn default() -> Self {
        Self {
            origin: [T::zero(); 3],
            direction: [T::one(), T::zero(), T::zero()],
            indices: ConstraintIndices::new(),
        }
    }
}

/// Normalise a direction, falling back to the x axis if it has no length
fn normalise<T: RealScalar>(direction: &Vec3<T>) -> Vec3<T> {
    let mut n = point(direction);
    let length = n.view().norm_2();
    if length > T::zero() && num::Float::is_finite(length) {
        n.scale_inplace(T::one() / length);
        to_vec3(&n)
    } else {
        [T::one(), T::zero(), T::zero()]
    }
}

/// Restricts the motion of a set of 3D DOFs to a line
///
/// Constrained positions are projected orthogonally onto the line through `origin` with
/// direction `direction`; velocities and responses are projected onto the direction. The
/// projector is block diagonal with the block `n nᵗ` for constrained DOFs and the identity for
/// the others.
#[derive(Debug, Clone)]
pub struct LineProjectiveConstraint<T: RealScalar> {
    origin: Vec3<T>,
    direction: Vec3<T>,
    indices: ConstraintIndices,
    projector: BlockSparseMatrix<T, 3, 3>,
    built_size: Option<usize>,
}

impl<T: RealScalar> LineProjectiveConstraint<T> {
    /// Create a constraint to the line through `origin` with direction `direction`
    ///
    /// No DOF is constrained until indices are added.
    pub fn new(origin: Vec3<T>, direction: Vec3<T>) -> Self {
        Self::from_params(LineConstraintParams {
            origin,
            direction,
            indices: ConstraintIndices::new(),
        })
    }

    /// Create a constraint from its parameters
    pub fn from_params(params: LineConstraintParams<T>) -> Self {
        Self {
            origin: params.origin,
            direction: normalise(&params.direction),
            indices: params.indices,
            projector: BlockSparseMatrix::new(0, 0),
            built_size: None,
        }
    }

    /// A point on the line
    pub fn origin(&self) -> &Vec3<T> {
        &self.origin
    }

    /// The unit direction of the line
    pub fn direction(&self) -> &Vec3<T> {
        &self.direction
    }

    /// The constrained DOF indices
    pub fn indices(&self) -> &ConstraintIndices {
        &self.indices
    }

    /// The projector built by the last rebuild
    pub fn projector(&self) -> &BlockSparseMatrix<T, 3, 3> {
        &self.projector
    }

    /// Move the line
    pub fn set_origin(&mut self, origin: Vec3<T>) {
        self.origin = origin;
    }

    /// Change the direction of the line
    pub fn set_direction(&mut self, direction: Vec3<T>) {
        self.direction = normalise(&direction);
        self.built_size = None;
    }

    /// Constrain a DOF
    pub fn add_constraint(&mut self, index: usize) {
        if self.indices.insert(index) {
            self.built_size = None;
        }
    }

    /// Release a DOF
    pub fn remove_constraint(&mut self, index: usize) {
        if self.indices.remove(index) {
            self.built_size = None;
        }
    }

    /// Release all DOFs
    pub fn clear_constraints(&mut self) {
        self.indices.clear();
        self.built_size = None;
    }

    /// Check the indices against a DOF space with `dof_count` blocks and build the projector
    ///
    /// Indices outside the DOF space are removed.
    pub fn init(&mut self, dof_count: usize) -> Result<()> {
        for index in self.indices.retain_below(dof_count) {
            error!("Constraint index {index} is out of range for {dof_count} DOFs; removed");
        }
        self.rebuild(dof_count)
    }

    /// Build the block diagonal projector over `dof_count` blocks
    pub fn rebuild(&mut self, dof_count: usize) -> Result<()> {
        let line_block = self.line_block();
        let free_block = identity::<T, 3>();
        self.projector.resize(dof_count, dof_count);
        for index in 0..dof_count {
            let block = if self.indices.contains(index) {
                line_block
            } else {
                free_block
            };
            self.projector.insert_diagonal_block(index, block)?;
        }
        self.projector.compress();
        self.built_size = Some(dof_count);
        Ok(())
    }

    fn rebuild_if_stale(&mut self, dof_count: usize) -> Result<()> {
        if self.built_size != Some(dof_count) {
            debug!("Rebuilding line projector over {dof_count} DOFs");
            self.rebuild(dof_count)?;
        }
        Ok(())
    }

    fn check_indices(&self, size: usize) -> Result<()> {
        match self.indices.max() {
            Some(index) if index >= size => Err(Error::IndexOutOfRange { index, size }),
            _ => Ok(()),
        }
    }

    fn line_block(&self) -> Mat3<T> {
        let n = self.direction;
        n.map(|ni| n.map(|nj| ni * nj))
    }
}

impl<T: RealScalar> ProjectiveConstraint<T, 3> for LineProjectiveConstraint<T> {
    fn project_response(&mut self, response: &mut [Vec3<T>]) -> Result<()> {
        self.rebuild_if_stale(response.len())?;
        let input = response.to_vec();
        self.projector.mul(response, &input)
    }

    fn project_position(&self, position: &mut [Vec3<T>]) -> Result<()> {
        self.check_indices(position.len())?;
        let origin = point(&self.origin);
        let direction = point(&self.direction);
        let mut offset = rlst_static_array!(T, 3);
        let mut along = rlst_static_array!(T, 3);
        for index in self.indices.iter() {
            offset.fill_from(point(&position[index]).view() - origin.view());
            along.fill_from(direction.view().scalar_mul(direction.inner(offset.view())));
            position[index] = to_vec3(&along);
            for (p, o) in position[index].iter_mut().zip(self.origin) {
                *p = *p + o;
            }
        }
        Ok(())
    }

    fn project_matrix(
        &mut self,
        matrix: &mut BlockSparseMatrix<T, 3, 3>,
        offset: usize,
    ) -> Result<()> {
        let size = matrix.nrows();
        if matrix.ncols() != size {
            return Err(Error::DimensionMismatch {
                expected: size,
                found: matrix.ncols(),
            });
        }
        if offset > size {
            return Err(Error::IndexOutOfRange {
                index: offset,
                size,
            });
        }
        self.check_indices(size - offset)?;

        let line_block = self.line_block();
        let mut embedded = BlockSparseMatrix::<T, 3, 3>::new(size, size);
        for index in 0..size {
            let block = if index >= offset && self.indices.contains(index - offset) {
                line_block
            } else {
                identity()
            };
            embedded.insert_diagonal_block(index, block)?;
        }
        embedded.compress();

        *matrix = embedded.matmul(&matrix.matmul(&embedded)?)?;
        Ok(())
    }

    fn project_jacobian_rows(&self, rows: &mut ConstraintMatrix<T, 3>) -> Result<()> {
        let direction = point(&self.direction);
        let mut projected = rlst_static_array!(T, 3);
        for (_, dof, value) in rows.entries_mut() {
            if self.indices.contains(dof) {
                let along = direction.inner(point(value).view());
                projected.fill_from(direction.view().scalar_mul(along));
                *value = to_vec3(&projected);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::*;
    use paste::paste;

    fn diagonal_line<T: RealScalar>() -> LineProjectiveConstraint<T> {
        let one = T::one();
        LineProjectiveConstraint::new([one, T::zero(), one], [one, one, T::zero()])
    }

    macro_rules! test_line {
        ($($scalar:ident),+) => {
        $(
            paste! {
                #[test]
                fn [<test_project_position_ $scalar>]() {
                    let mut c = diagonal_line::<$scalar>();
                    c.add_constraint(1);
                    let mut x = [[0.0, 0.0, 0.0], [3.0, 1.0, 5.0]];
                    c.project_position(&mut x).unwrap();
                    assert_eq!(x[0], [0.0, 0.0, 0.0]);
                    assert_relative_eq!(x[1][0], 2.5, epsilon = 1e-6);
                    assert_relative_eq!(x[1][1], 1.5, epsilon = 1e-6);
                    assert_relative_eq!(x[1][2], 1.0, epsilon = 1e-6);
                }

                #[test]
                fn [<test_project_response_ $scalar>]() {
                    let mut c = diagonal_line::<$scalar>();
                    c.add_constraint(0);
                    let mut v = [[1.0, 0.0, 2.0], [1.0, 0.0, 2.0]];
                    c.project_response(&mut v).unwrap();
                    assert_relative_eq!(v[0][0], 0.5, epsilon = 1e-6);
                    assert_relative_eq!(v[0][1], 0.5, epsilon = 1e-6);
                    assert_relative_eq!(v[0][2], 0.0, epsilon = 1e-6);
                    assert_eq!(v[1], [1.0, 0.0, 2.0]);
                }
            }
        )*
        };
    }

    test_line!(f32, f64);

    #[test]
    fn test_fills_gaps() {
        let mut c = LineProjectiveConstraint::<f64>::new([0.0; 3], [0.0, 0.0, 2.0]);
        c.add_constraint(0);
        c.add_constraint(2);
        c.init(5).unwrap();
        let p = c.projector();
        assert_eq!(p.nnz_blocks(), 5);
        let line = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let id = identity::<f64, 3>();
        let expected = [line, id, line, id, id];
        for (i, block) in expected.iter().enumerate() {
            assert_eq!(p.block(i, i), Some(block));
        }
    }

    #[test]
    fn test_direction_fallback() {
        let c = LineProjectiveConstraint::<f64>::new([0.0; 3], [0.0; 3]);
        assert_eq!(c.direction(), &[1.0, 0.0, 0.0]);
        let mut c = LineProjectiveConstraint::<f64>::new([0.0; 3], [0.0, 3.0, 4.0]);
        assert_relative_eq!(c.direction()[1], 0.6);
        c.set_direction([0.0; 3]);
        assert_eq!(c.direction(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_defaults() {
        let params = LineConstraintParams::<f64>::default();
        assert!(params.indices.is_empty());
        let mut c = LineProjectiveConstraint::from_params(params);
        c.init(3).unwrap();
        let mut v = [[1.0, 2.0, 3.0]; 3];
        c.project_response(&mut v).unwrap();
        assert_eq!(v, [[1.0, 2.0, 3.0]; 3]);
    }

    #[test]
    fn test_init_drops_out_of_range() {
        let mut c = LineProjectiveConstraint::<f64>::new([0.0; 3], [1.0, 0.0, 0.0]);
        c.add_constraint(1);
        c.add_constraint(7);
        let mut x = [[1.0, 1.0, 1.0]; 3];
        assert_eq!(
            c.project_position(&mut x),
            Err(Error::IndexOutOfRange { index: 7, size: 3 })
        );
        assert_eq!(x, [[1.0, 1.0, 1.0]; 3]);

        c.init(3).unwrap();
        assert_eq!(c.indices().iter().collect::<Vec<_>>(), vec![1]);
        c.project_position(&mut x).unwrap();
        assert_eq!(x[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rebuild_on_resize() {
        let mut c = LineProjectiveConstraint::<f64>::new([0.0; 3], [0.0, 1.0, 0.0]);
        c.add_constraint(0);
        c.init(1).unwrap();
        let mut v = [[1.0, 1.0, 1.0]; 2];
        c.project_response(&mut v).unwrap();
        assert_eq!(c.projector().shape(), [2, 2]);
        assert_eq!(v, [[0.0, 1.0, 0.0], [1.0, 1.0, 1.0]]);

        c.remove_constraint(0);
        c.project_velocity(&mut v).unwrap();
        assert_eq!(v, [[0.0, 1.0, 0.0], [1.0, 1.0, 1.0]]);
        assert_eq!(c.projector().block(0, 0), Some(&identity()));
    }

    #[test]
    fn test_project_matrix() {
        let mut m = BlockSparseMatrix::<f64, 3, 3>::new(3, 3);
        let full = [[1.0, 2.0, 3.0], [2.0, 4.0, 5.0], [3.0, 5.0, 6.0]];
        for i in 0..3 {
            m.insert_diagonal_block(i, full).unwrap();
        }
        m.compress();

        let mut c = LineProjectiveConstraint::<f64>::new([0.0; 3], [0.0, 1.0, 0.0]);
        c.add_constraint(0);
        c.project_matrix(&mut m, 1).unwrap();

        assert_eq!(m.block(0, 0), Some(&full));
        assert_eq!(
            m.block(1, 1),
            Some(&[[0.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 0.0]])
        );
        assert_eq!(m.block(2, 2), Some(&full));

        c.add_constraint(2);
        assert_eq!(
            c.project_matrix(&mut m, 1),
            Err(Error::IndexOutOfRange { index: 2, size: 2 })
        );
    }

    #[test]
    fn test_project_jacobian_rows() {
        let mut c = LineProjectiveConstraint::<f64>::new([0.0; 3], [0.0, 0.0, 1.0]);
        c.add_constraint(3);
        let mut rows = ConstraintMatrix::new();
        rows.add_entry(0, 3, [1.0, 2.0, 3.0]);
        rows.add_entry(0, 1, [1.0, 2.0, 3.0]);
        c.project_jacobian_rows(&mut rows).unwrap();
        let row = rows.row(0).unwrap();
        assert_eq!(row[&3], [0.0, 0.0, 3.0]);
        assert_eq!(row[&1], [1.0, 2.0, 3.0]);

        c.clear_constraints();
        assert!(c.indices().is_empty());
    }
}
