extern crate blas_src;
extern crate lapack_src;

use approx::*;
use projmap::constraint::{ConstraintIndices, LineConstraintParams, LineProjectiveConstraint};
use projmap::mapping::AreaMapping;
use projmap::shapes::screen_triangles;
use projmap::sparse::{BlockSparseMatrix, ConstraintMatrix};
use projmap::traits::{Mapping, ProjectiveConstraint, Topology};
use rand::prelude::*;

fn random_vectors(rng: &mut StdRng, n: usize) -> Vec<[f64; 3]> {
    (0..n)
        .map(|_| std::array::from_fn(|_| rng.gen_range(-1.0..1.0)))
        .collect()
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn constraint(dof_count: usize) -> LineProjectiveConstraint<f64> {
    let mut c = LineProjectiveConstraint::from_params(LineConstraintParams {
        origin: [0.5, -1.0, 2.0],
        direction: [1.0, 2.0, -2.0],
        indices: ConstraintIndices::from_iter([1, 4, 5]),
    });
    c.init(dof_count).unwrap();
    c
}

#[test]
fn test_projector_idempotent_and_symmetric() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut c = constraint(8);

    let x = random_vectors(&mut rng, 8);
    let mut once = x.clone();
    c.project_response(&mut once).unwrap();
    let mut twice = once.clone();
    c.project_response(&mut twice).unwrap();
    for (a, b) in once.iter().zip(&twice) {
        for d in 0..3 {
            assert_relative_eq!(a[d], b[d], epsilon = 1e-14);
        }
    }

    let p = c.projector();
    for i in 0..8 {
        let block = p.block(i, i).unwrap();
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(block[r][c], block[c][r]);
            }
        }
    }

    // Adjoint: y·(Px) = (Py)·x
    let y = random_vectors(&mut rng, 8);
    let mut py = y.clone();
    c.project_velocity(&mut py).unwrap();
    let lhs = y.iter().zip(&once).map(|(a, b)| dot(a, b)).sum::<f64>();
    let rhs = py.iter().zip(&x).map(|(a, b)| dot(a, b)).sum::<f64>();
    assert_relative_eq!(lhs, rhs, epsilon = 1e-12);
}

#[test]
fn test_projected_positions_lie_on_line() {
    let mut rng = StdRng::seed_from_u64(1);
    let c = constraint(6);
    let mut x = random_vectors(&mut rng, 6);
    let free = x[0];
    c.project_position(&mut x).unwrap();
    assert_eq!(x[0], free);

    let n = *c.direction();
    let o = *c.origin();
    for i in [1, 4, 5] {
        let offset = [x[i][0] - o[0], x[i][1] - o[1], x[i][2] - o[2]];
        let along = dot(&offset, &n);
        for d in 0..3 {
            assert_relative_eq!(offset[d], along * n[d], epsilon = 1e-12);
        }
    }

    let mut again = x.clone();
    c.project_position(&mut again).unwrap();
    for (a, b) in again.iter().zip(&x) {
        for d in 0..3 {
            assert_relative_eq!(a[d], b[d], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_projected_matrix_matches_projected_products() {
    let mut rng = StdRng::seed_from_u64(2);
    let n = 6;
    let offset = 2;
    let mut m = BlockSparseMatrix::<f64, 3, 3>::new(n + offset, n + offset);
    for i in 0..n + offset {
        for j in [i.saturating_sub(1), i, i + 1] {
            if j < n + offset {
                let block = std::array::from_fn(|_| std::array::from_fn(|_| rng.gen()));
                m.add_block(i, j, block).unwrap();
            }
        }
    }
    m.compress();
    let original = m.clone();

    let mut c = constraint(n);
    c.project_matrix(&mut m, offset).unwrap();

    // P M P x computed with the matrix-free projector
    let x = random_vectors(&mut rng, n + offset);
    let project = |c: &mut LineProjectiveConstraint<f64>, v: &mut Vec<[f64; 3]>| {
        let mut tail = v[offset..].to_vec();
        c.project_response(&mut tail).unwrap();
        v[offset..].copy_from_slice(&tail);
    };
    let mut px = x.clone();
    project(&mut c, &mut px);
    let mut mpx = vec![[0.0; 3]; n + offset];
    original.mul(&mut mpx, &px).unwrap();
    project(&mut c, &mut mpx);

    let mut expected = vec![[0.0; 3]; n + offset];
    m.mul(&mut expected, &x).unwrap();
    for (a, b) in expected.iter().zip(&mpx) {
        for d in 0..3 {
            assert_relative_eq!(a[d], b[d], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_constraint_rows_through_mapping() {
    let (points, topology) = screen_triangles::<f64>(2);
    let mut mapping = AreaMapping::new(&topology);
    mapping.init(points.len()).unwrap();
    let mut areas = vec![[0.0]; topology.triangles().len()];
    mapping.apply(&mut areas, &points).unwrap();

    let mut rows = ConstraintMatrix::new();
    rows.add_entry(0, 0, [1.0]);
    rows.add_entry(1, 3, [-2.0]);
    let mut parent_rows = ConstraintMatrix::new();
    mapping.apply_jt_constraint(&mut parent_rows, &rows).unwrap();

    let mut c = LineProjectiveConstraint::new([0.0; 3], [1.0, 0.0, 0.0]);
    for i in 0..points.len() {
        c.add_constraint(i);
    }
    c.init(points.len()).unwrap();
    c.project_jacobian_rows(&mut parent_rows).unwrap();

    assert_eq!(parent_rows.row_count(), 2);
    let mut moving = 0;
    for (_, entries) in parent_rows.rows() {
        for value in entries.values() {
            assert_eq!(value[1], 0.0);
            assert_eq!(value[2], 0.0);
            if value[0] != 0.0 {
                moving += 1;
            }
        }
    }
    assert!(moving > 0);
}
