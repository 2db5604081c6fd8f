//! Definition of various test shapes.
//!
//! Each function returns the vertex positions together with the topology of the surface, so
//! that the positions can be passed directly to a mapping built on the topology.

use crate::linalg::Vec3;
use crate::topology::{
    MixedTopology, MixedTopologyBuilder, TriangleTopology, TriangleTopologyBuilder,
};
use crate::types::{RealScalar, ReferenceCellType};
use std::collections::HashMap;

/// Create a square surface with triangle cells
///
/// Create a surface of the square \[0,1\]^2 with triangle cells. The input ncells is the number
/// of cells along each side of the square.
pub fn screen_triangles<T: RealScalar>(ncells: usize) -> (Vec<Vec3<T>>, TriangleTopology) {
    if ncells == 0 {
        panic!("Cannot create a surface with 0 cells");
    }
    let points = screen_points(ncells);

    let mut b = TriangleTopologyBuilder::new_with_capacity(2 * ncells * ncells);
    for y in 0..ncells {
        for x in 0..ncells {
            b.add_cell(
                2 * y * ncells + 2 * x,
                [
                    y * (ncells + 1) + x,
                    y * (ncells + 1) + x + 1,
                    y * (ncells + 1) + x + ncells + 2,
                ],
            );
            b.add_cell(
                2 * y * ncells + 2 * x + 1,
                [
                    y * (ncells + 1) + x,
                    y * (ncells + 1) + x + ncells + 2,
                    y * (ncells + 1) + x + ncells + 1,
                ],
            );
        }
    }

    (points, b.create_topology())
}

/// Create a square surface with quadrilateral cells
///
/// Create a surface of the square \[0,1\]^2 with quadrilateral cells. The input ncells is the
/// number of cells along each side of the square.
pub fn screen_quadrilaterals<T: RealScalar>(ncells: usize) -> (Vec<Vec3<T>>, MixedTopology) {
    if ncells == 0 {
        panic!("Cannot create a surface with 0 cells");
    }
    let points = screen_points(ncells);

    let mut b = MixedTopologyBuilder::new();
    for y in 0..ncells {
        for x in 0..ncells {
            let cell = vec![
                y * (ncells + 1) + x,
                y * (ncells + 1) + x + 1,
                y * (ncells + 1) + x + ncells + 1,
                y * (ncells + 1) + x + ncells + 2,
            ];
            b.add_cell(y * ncells + x, (cell, ReferenceCellType::Quadrilateral))
                .unwrap();
        }
    }

    (points, b.create_topology())
}

fn screen_points<T: RealScalar>(ncells: usize) -> Vec<Vec3<T>> {
    let zero = T::zero();
    let n = T::from(ncells).unwrap();
    let mut points = Vec::with_capacity((ncells + 1) * (ncells + 1));
    for y in 0..ncells + 1 {
        for x in 0..ncells + 1 {
            points.push([T::from(x).unwrap() / n, T::from(y).unwrap() / n, zero]);
        }
    }
    points
}

/// Create a regular sphere
///
/// A regular sphere is created by starting with a regular octahedron. The shape is then refined
/// `refinement_level` times. Each time the surface is refined, each triangle is split into four
/// triangles (by adding lines connecting the midpoints of each edge). The new points are then
/// scaled so that they are a distance of 1 from the origin.
pub fn regular_sphere<T: RealScalar>(refinement_level: u32) -> (Vec<Vec3<T>>, TriangleTopology) {
    let zero = T::zero();
    let one = T::one();
    let half = one / (one + one);

    let mut points = Vec::<Vec3<T>>::with_capacity(2 + usize::pow(4, refinement_level + 1));
    points.push([zero, zero, one]);
    points.push([one, zero, zero]);
    points.push([zero, one, zero]);
    points.push([-one, zero, zero]);
    points.push([zero, -one, zero]);
    points.push([zero, zero, -one]);

    let mut cells = vec![
        [0, 1, 2],
        [0, 2, 3],
        [0, 3, 4],
        [0, 4, 1],
        [5, 2, 1],
        [5, 3, 2],
        [5, 4, 3],
        [5, 1, 4],
    ];

    for _ in 0..refinement_level {
        let mut edge_points = HashMap::new();
        let mut new_cells = Vec::with_capacity(4 * cells.len());
        for c in &cells {
            let edges = [[1, 2], [0, 2], [0, 1]].map(|[i, j]| {
                let key = (usize::min(c[i], c[j]), usize::max(c[i], c[j]));
                *edge_points.entry(key).or_insert_with(|| {
                    let (v_i, v_j) = (points[c[i]], points[c[j]]);
                    let mut new_pt: Vec3<T> = std::array::from_fn(|d| half * (v_i[d] + v_j[d]));
                    let size = num::Float::sqrt(new_pt.iter().map(|&x| x * x).sum::<T>());
                    for x in new_pt.iter_mut() {
                        *x = *x / size;
                    }
                    points.push(new_pt);
                    points.len() - 1
                })
            });
            new_cells.push([c[0], edges[2], edges[1]]);
            new_cells.push([c[1], edges[0], edges[2]]);
            new_cells.push([c[2], edges[1], edges[0]]);
            new_cells.push([edges[0], edges[1], edges[2]]);
        }
        cells = new_cells;
    }

    (points, TriangleTopology::new(cells))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traits::Topology;
    use approx::*;

    #[test]
    fn test_screen_triangles() {
        let (points, topology) = screen_triangles::<f64>(3);
        assert_eq!(points.len(), 16);
        assert_eq!(topology.triangles().len(), 18);
        assert_eq!(topology.vertex_count(), 16);
        assert_relative_eq!(points[15][0], 1.0);
        assert_relative_eq!(points[15][1], 1.0);
    }

    #[test]
    fn test_screen_quadrilaterals() {
        let (points, topology) = screen_quadrilaterals::<f32>(2);
        assert_eq!(points.len(), 9);
        assert_eq!(topology.entity_count(ReferenceCellType::Quadrilateral), 4);
        assert!(topology.triangles().is_empty());
    }

    #[test]
    fn test_regular_sphere() {
        let (points, topology) = regular_sphere::<f64>(2);
        assert_eq!(topology.triangles().len(), 8 * 16);
        assert_eq!(points.len(), 2 + usize::pow(4, 3));
        for p in &points {
            assert_relative_eq!(p[0] * p[0] + p[1] * p[1] + p[2] * p[2], 1.0, epsilon = 1e-12);
        }
    }
}
