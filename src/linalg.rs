//! Dense blocks of block sparse matrices
//!
//! DOF blocks and the blocks stored in block sparse matrices are plain arrays. Vector
//! algebra on 3D points goes through rlst static arrays; [point] and [to_vec3] convert
//! between the two.
use crate::types::RealScalar;
use rlst::{rlst_static_array, rlst_static_type, RawAccess, RawAccessMut};

/// A 3D vector
pub type Vec3<T> = [T; 3];

/// A 3 by 3 matrix, stored row by row
pub type Mat3<T> = [[T; 3]; 3];

/// A dense `R` by `C` block, stored row by row
pub type Block<T, const R: usize, const C: usize> = [[T; C]; R];

/// Copy a DOF block into an rlst vector
pub fn point<T: RealScalar>(x: &Vec3<T>) -> rlst_static_type!(T, 3) {
    let mut p = rlst_static_array!(T, 3);
    p.data_mut().copy_from_slice(x);
    p
}

/// Copy an rlst vector into a DOF block
pub fn to_vec3<T: RealScalar>(p: &rlst_static_type!(T, 3)) -> Vec3<T> {
    let mut x = [T::zero(); 3];
    x.copy_from_slice(p.data());
    x
}

/// The zero block
pub fn zero_block<T: RealScalar, const R: usize, const C: usize>() -> Block<T, R, C> {
    [[T::zero(); C]; R]
}

/// The identity block
pub fn identity<T: RealScalar, const N: usize>() -> Block<T, N, N> {
    let mut out = zero_block::<T, N, N>();
    for (i, row) in out.iter_mut().enumerate() {
        row[i] = T::one();
    }
    out
}

/// Compute `a += b` for two blocks
pub fn block_add_assign<T: RealScalar, const R: usize, const C: usize>(
    a: &mut Block<T, R, C>,
    b: &Block<T, R, C>,
) {
    for (row_a, row_b) in a.iter_mut().zip(b.iter()) {
        for (x, y) in row_a.iter_mut().zip(row_b.iter()) {
            *x = *x + *y;
        }
    }
}

/// Compute `s * a` for a block
pub fn block_scale<T: RealScalar, const R: usize, const C: usize>(
    a: &Block<T, R, C>,
    s: T,
) -> Block<T, R, C> {
    a.map(|row| row.map(|x| x * s))
}

/// Compute `b x` for a block `b`
pub fn block_mul_vec<T: RealScalar, const R: usize, const C: usize>(
    b: &Block<T, R, C>,
    x: &[T; C],
) -> [T; R] {
    b.map(|row| {
        row.iter()
            .zip(x.iter())
            .fold(T::zero(), |acc, (bij, xj)| acc + *bij * *xj)
    })
}

/// Compute `bᵗ x` for a block `b`
pub fn block_transpose_mul_vec<T: RealScalar, const R: usize, const C: usize>(
    b: &Block<T, R, C>,
    x: &[T; R],
) -> [T; C] {
    let mut out = [T::zero(); C];
    for (row, xi) in b.iter().zip(x.iter()) {
        for (o, bij) in out.iter_mut().zip(row.iter()) {
            *o = *o + *bij * *xi;
        }
    }
    out
}

/// Compute the product `a b` of two blocks
pub fn block_mul<T: RealScalar, const R: usize, const C: usize, const K: usize>(
    a: &Block<T, R, C>,
    b: &Block<T, C, K>,
) -> Block<T, R, K> {
    let mut out = zero_block::<T, R, K>();
    for (out_row, a_row) in out.iter_mut().zip(a.iter()) {
        for (aij, b_row) in a_row.iter().zip(b.iter()) {
            for (o, bjk) in out_row.iter_mut().zip(b_row.iter()) {
                *o = *o + *aij * *bjk;
            }
        }
    }
    out
}
