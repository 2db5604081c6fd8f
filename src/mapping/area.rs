//! Mapping from triangle vertices to triangle areas
use crate::linalg::{point, to_vec3, zero_block, Mat3, Vec3};
use crate::mapping::geometric_stiffness::{
    ElementStiffness, GeometricStiffness, GeometricStiffnessMode,
};
use crate::sparse::{BlockSparseMatrix, ConstraintMatrix};
use crate::traits::{GeometricStiffnessMapping, Mapping, StiffnessAccumulator, Topology};
use crate::types::{Error, MappingState, RealScalar, ReferenceCellType, Result};
use itertools::izip;
use log::{debug, error, info};
use rayon::prelude::*;
use rlst::{rlst_static_array, rlst_static_type};

/// The edge opposite each vertex of a triangle, and the unnormalised normal
///
/// Edge `i` runs from vertex `i + 2` to vertex `i + 1` (modulo 3).
fn triangle_frame<T: RealScalar>(
    v: &[Vec3<T>; 3],
) -> ([rlst_static_type!(T, 3); 3], rlst_static_type!(T, 3)) {
    let vertices = v.map(|x| point(&x));
    let edges: [rlst_static_type!(T, 3); 3] = std::array::from_fn(|i| {
        let mut edge = rlst_static_array!(T, 3);
        edge.fill_from(vertices[(i + 1) % 3].view() - vertices[(i + 2) % 3].view());
        edge
    });
    let mut normal = rlst_static_array!(T, 3);
    edges[1].cross(edges[2].view(), normal.view_mut());
    (edges, normal)
}

/// Compute the area of a triangle and its derivative with respect to each vertex
///
/// Returns `None` if the triangle is degenerate.
pub fn triangle_area_gradient<T: RealScalar>(v: &[Vec3<T>; 3]) -> Option<(T, [Vec3<T>; 3])> {
    let (edges, normal) = triangle_frame(v);
    let length = normal.view().norm_2();
    if length <= T::zero() || !num::Float::is_finite(length) {
        return None;
    }
    let two = T::one() + T::one();
    let mut derivative = rlst_static_array!(T, 3);
    let gradient = std::array::from_fn(|i| {
        edges[i].cross(normal.view(), derivative.view_mut());
        derivative.scale_inplace(T::one() / (two * length));
        to_vec3(&derivative)
    });
    Some((length / two, gradient))
}

/// Compute the second derivative of the area of a triangle with respect to its vertices
///
/// Entry `[i][j]` is the derivative of the gradient with respect to vertex `i` in the
/// direction of vertex `j`. The triangle must not be degenerate.
pub fn triangle_area_hessian<T: RealScalar>(v: &[Vec3<T>; 3]) -> [[Mat3<T>; 3]; 3] {
    let (edges, normal) = triangle_frame(v);
    let n2 = normal.inner(normal.view());
    let two = T::one() + T::one();
    let ka = T::one() / (two * num::Float::sqrt(n2 * n2 * n2));

    let a: [Vec3<T>; 3] = std::array::from_fn(|i| to_vec3(&edges[i]));
    let mut rotated = rlst_static_array!(T, 3);
    let b: [Vec3<T>; 3] = std::array::from_fn(|i| {
        normal.cross(edges[i].view(), rotated.view_mut());
        to_vec3(&rotated)
    });
    let n = to_vec3(&normal);
    let z = T::zero();
    let n_cross = [[z, -n[2], n[1]], [n[2], z, -n[0]], [-n[1], n[0], z]];

    let mut hessian = [[zero_block::<T, 3, 3>(); 3]; 3];
    for (i, hessian_row) in hessian.iter_mut().enumerate() {
        for (j, block) in hessian_row.iter_mut().enumerate() {
            let dot_product = edges[i].inner(edges[j].view());
            // Negative when j follows i cyclically
            let skew = if i == j {
                T::zero()
            } else if j == (i + 1) % 3 {
                -n2
            } else {
                n2
            };
            for (r, row) in block.iter_mut().enumerate() {
                for (c, entry) in row.iter_mut().enumerate() {
                    let diagonal = if r == c { dot_product } else { T::zero() };
                    let stretch = n2 * (diagonal - a[j][r] * a[i][c]);
                    *entry = ka * (stretch - b[i][r] * b[j][c] + skew * n_cross[r][c]);
                }
            }
        }
    }
    hessian
}

/// Maps the positions of a triangulated surface to the areas of its triangles
///
/// The parent DOFs are 3D points and the child DOFs are scalars, one per triangle of the
/// topology. The topology is borrowed for the lifetime of the mapping;
/// [AreaMapping::set_topology] moves the mapping to another one.
pub struct AreaMapping<'a, T: RealScalar, Topo: Topology> {
    topology: &'a Topo,
    state: MappingState,
    geometric_stiffness_mode: GeometricStiffnessMode,
    jacobian: BlockSparseMatrix<T, 1, 3>,
    stiffness: GeometricStiffness<T>,
    positions: Vec<Vec3<T>>,
    parent_size: usize,
    topology_changed: bool,
}

impl<'a, T: RealScalar, Topo: Topology> AreaMapping<'a, T, Topo> {
    /// Create an area mapping over the triangles of `topology`
    pub fn new(topology: &'a Topo) -> Self {
        Self {
            topology,
            state: MappingState::Uninitialised,
            geometric_stiffness_mode: GeometricStiffnessMode::default(),
            jacobian: BlockSparseMatrix::new(0, 0),
            stiffness: GeometricStiffness::new(),
            positions: vec![],
            parent_size: 0,
            topology_changed: false,
        }
    }

    /// Set the geometric stiffness mode
    pub fn with_geometric_stiffness(mut self, mode: GeometricStiffnessMode) -> Self {
        self.geometric_stiffness_mode = mode;
        self
    }

    /// Set the geometric stiffness mode
    pub fn set_geometric_stiffness(&mut self, mode: GeometricStiffnessMode) {
        self.geometric_stiffness_mode = mode;
    }

    /// The geometric stiffness mode
    pub fn geometric_stiffness_mode(&self) -> GeometricStiffnessMode {
        self.geometric_stiffness_mode
    }

    /// The lifecycle state
    pub fn state(&self) -> MappingState {
        self.state
    }

    /// The topology the mapping reads its triangles from
    pub fn topology(&self) -> &Topo {
        self.topology
    }

    /// Read the triangles from `topology` instead
    ///
    /// The next [Mapping::apply] rebuilds the mapping over the new triangles. Until then the
    /// geometric stiffness of the previous triangles cannot be evaluated.
    pub fn set_topology(&mut self, topology: &'a Topo) {
        self.topology = topology;
        self.topology_changed = true;
    }

    /// Validate the topology and size the mapping for `parent_size` parent DOFs
    ///
    /// A topology without triangles, or with cells that are not triangles, leaves the
    /// mapping in the [MappingState::Invalid] state.
    pub fn init(&mut self, parent_size: usize) -> Result<()> {
        match self.setup(parent_size) {
            Ok(()) => {
                info!(
                    "Area mapping initialised with {} triangles over {} DOFs",
                    self.jacobian.nrows(),
                    parent_size
                );
                self.state = MappingState::Ready;
                Ok(())
            }
            Err(e) => {
                error!("Area mapping setup failed: {e}");
                self.state = MappingState::Invalid;
                Err(e)
            }
        }
    }

    fn setup(&mut self, parent_size: usize) -> Result<()> {
        let ntriangles = self.topology.entity_count(ReferenceCellType::Triangle);
        if ntriangles == 0 {
            return Err(Error::NoTriangles);
        }
        if let Some(cell_type) = self.topology.cell_types().iter().find(|t| {
            **t != ReferenceCellType::Triangle && self.topology.entity_count(**t) > 0
        }) {
            return Err(Error::UnsupportedCell(*cell_type));
        }
        if let Some(&index) = self
            .topology
            .triangles()
            .iter()
            .flat_map(|t| t.iter())
            .find(|v| **v >= parent_size)
        {
            return Err(Error::IndexOutOfRange {
                index,
                size: parent_size,
            });
        }

        self.jacobian.resize(ntriangles, parent_size);
        self.stiffness.clear();
        self.positions.clear();
        self.parent_size = parent_size;
        self.topology_changed = false;
        Ok(())
    }

    /// Rebuild the mapping if the topology or the parent size changed since it was built
    pub fn rebuild_if_stale(&mut self, parent_size: usize) -> Result<()> {
        if self.state != MappingState::Ready {
            return Err(Error::NotInitialised);
        }
        if self.topology_changed
            || self.topology.triangles().len() != self.jacobian.nrows()
            || parent_size != self.parent_size
        {
            debug!(
                "Rebuilding area mapping: {} triangles over {} DOFs",
                self.topology.triangles().len(),
                parent_size
            );
            self.init(parent_size)?;
        }
        Ok(())
    }

    fn check_ready(&self) -> Result<()> {
        if self.state == MappingState::Ready {
            Ok(())
        } else {
            Err(Error::NotInitialised)
        }
    }

    fn check_evaluated(&self) -> Result<()> {
        if self.topology_changed {
            return Err(Error::NotInitialised);
        }
        let ntriangles = self.topology.triangles().len();
        if ntriangles != self.jacobian.nrows() {
            return Err(Error::DimensionMismatch {
                expected: self.jacobian.nrows(),
                found: ntriangles,
            });
        }
        Ok(())
    }

    fn stiffness_disabled(&self) -> bool {
        self.geometric_stiffness_mode == GeometricStiffnessMode::None || self.positions.is_empty()
    }

    fn element_stiffness(&self, child_force: &[[T; 1]]) -> Result<Vec<ElementStiffness<T, 3>>> {
        self.check_evaluated()?;
        let triangles = self.topology.triangles();
        if child_force.len() != triangles.len() {
            return Err(Error::DimensionMismatch {
                expected: triangles.len(),
                found: child_force.len(),
            });
        }
        let positions = &self.positions;
        let mode = self.geometric_stiffness_mode;
        Ok(triangles
            .par_iter()
            .zip(child_force.par_iter())
            .filter(|(_, force)| mode.is_active(force[0]))
            .map(|(triangle, force)| ElementStiffness {
                vertices: *triangle,
                hessian: triangle_area_hessian(&triangle.map(|v| positions[v])),
                weight: force[0],
            })
            .collect())
    }
}

impl<'a, T: RealScalar, Topo: Topology> Mapping<T, 3, 1> for AreaMapping<'a, T, Topo> {
    fn apply(&mut self, out: &mut [[T; 1]], input: &[Vec3<T>]) -> Result<()> {
        self.rebuild_if_stale(input.len())?;
        let topology = self.topology;
        let triangles = topology.triangles();
        if out.len() != triangles.len() {
            return Err(Error::DimensionMismatch {
                expected: triangles.len(),
                found: out.len(),
            });
        }

        let entries = triangles
            .par_iter()
            .enumerate()
            .map(|(index, triangle)| -> Result<(T, [(usize, Vec3<T>); 3])> {
                let (area, gradient) = triangle_area_gradient(&triangle.map(|v| input[v]))
                    .ok_or(Error::DegenerateElement(index))?;
                Ok((area, std::array::from_fn(|i| (triangle[i], gradient[i]))))
            })
            .collect::<Result<Vec<_>>>()?;

        self.jacobian.clear();
        for (row, value, (area, mut derivatives)) in izip!(0.., out.iter_mut(), entries) {
            *value = [area];
            // Columns must be inserted in increasing order
            derivatives.sort_by_key(|(vertex, _)| *vertex);
            self.jacobian.begin_row(row)?;
            for (vertex, derivative) in derivatives {
                self.jacobian.insert(row, vertex, [derivative])?;
            }
        }
        self.jacobian.compress();
        // K belongs to the previous configuration
        self.stiffness.clear();

        self.positions.clear();
        self.positions.extend_from_slice(input);
        Ok(())
    }

    fn apply_j(&self, out: &mut [[T; 1]], input: &[Vec3<T>]) -> Result<()> {
        self.check_ready()?;
        self.jacobian.mul(out, input)
    }

    fn apply_jt(&self, out: &mut [Vec3<T>], input: &[[T; 1]]) -> Result<()> {
        self.check_ready()?;
        self.jacobian.mul_transpose_add(out, input)
    }

    fn apply_jt_constraint(
        &self,
        out: &mut ConstraintMatrix<T, 3>,
        input: &ConstraintMatrix<T, 1>,
    ) -> Result<()> {
        self.check_ready()?;
        self.jacobian.mul_transpose_rows(out, input)
    }

    fn apply_djt(
        &self,
        parent_force: &mut [Vec3<T>],
        parent_displacement: &[Vec3<T>],
        child_force: &[[T; 1]],
        k_factor: T,
    ) -> Result<()> {
        if self.stiffness_disabled() {
            return Ok(());
        }
        for len in [parent_force.len(), parent_displacement.len()] {
            if len != self.parent_size {
                return Err(Error::DimensionMismatch {
                    expected: self.parent_size,
                    found: len,
                });
            }
        }

        if self.stiffness.is_assembled() {
            self.stiffness.add_mul(parent_force, parent_displacement, k_factor)
        } else {
            let elements = self.element_stiffness(child_force)?;
            GeometricStiffness::apply_elements(
                parent_force,
                parent_displacement,
                k_factor,
                &elements,
            )
        }
    }

    fn jacobian(&self) -> &BlockSparseMatrix<T, 1, 3> {
        &self.jacobian
    }
}

impl<'a, T: RealScalar, Topo: Topology> GeometricStiffnessMapping<T, 3, 1>
    for AreaMapping<'a, T, Topo>
{
    fn update_k(&mut self, child_force: &[[T; 1]]) -> Result<()> {
        if self.stiffness_disabled() {
            self.stiffness.clear();
            return Ok(());
        }
        let elements = self.element_stiffness(child_force)?;
        self.stiffness.assemble(self.parent_size, &elements)
    }

    fn geometric_stiffness(&self) -> &BlockSparseMatrix<T, 3, 3> {
        self.stiffness.matrix()
    }

    fn build_geometric_stiffness_matrix<A: StiffnessAccumulator<T, 3>>(
        &self,
        accumulator: &mut A,
        child_force: &[[T; 1]],
    ) -> Result<()> {
        if self.stiffness_disabled() {
            return Ok(());
        }
        let elements = self.element_stiffness(child_force)?;
        GeometricStiffness::accumulate_into(accumulator, &elements)
    }
}
