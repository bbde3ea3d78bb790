//! Householder column triangularization
//!
//! The SRIF builds each predict/update step as one orthogonal
//! triangularization of a stacked block matrix. Each call here applies a
//! single reflection that zeroes the sub-diagonal entries of one column and
//! carries the trailing columns along; sweeping the columns left to right
//! triangularizes the whole matrix without forming normal equations.
//!
//! The routines are generic over matrix storage so they apply equally to
//! statically sized scratch (the SRIF time update) and to dynamically
//! stacked observation sets (the SRIF measurement update).

use nalgebra::storage::StorageMut;
use nalgebra::{Dim, Matrix, RealField};

/// Applies one Householder reflection zeroing the sub-diagonal entries of
/// column `col`, updating all trailing columns in place.
///
/// The pivot takes the sign opposite the input `(col, col)` entry, which
/// avoids catastrophic cancellation when forming the reflector. The matrix
/// is caller-owned scratch; there is no aliasing between input and output.
/// The reflector is staged inside the column being zeroed, so no side
/// buffer is needed.
///
/// If the sub-column is already zero the reflection is the identity and
/// nothing is touched. A matrix with a single column gets its reflection
/// applied with no trailing columns to update.
pub fn householder_column<T, R, C, S>(a: &mut Matrix<T, R, C, S>, col: usize)
where
    T: RealField + Copy,
    R: Dim,
    C: Dim,
    S: StorageMut<T, R, C>,
{
    let nrows = a.nrows();
    let ncols = a.ncols();
    debug_assert!(col < ncols && col < nrows);

    let mut norm_sq = T::zero();
    for i in col..nrows {
        norm_sq += a[(i, col)] * a[(i, col)];
    }
    if norm_sq == T::zero() {
        return;
    }

    // Pivot sign opposite the input pivot.
    let mut sigma = norm_sq.sqrt();
    if a[(col, col)] > T::zero() {
        sigma = -sigma;
    }

    // Stage the reflector v in the column itself: v[col] is the shifted
    // pivot, the entries below are already in place.
    // H = I + beta·v·vᵀ with beta = 1/(sigma·v[col]), which equals the
    // textbook -2/(vᵀv) for this sign choice.
    a[(col, col)] -= sigma;
    let beta = T::one() / (sigma * a[(col, col)]);

    for k in (col + 1)..ncols {
        let mut dot = T::zero();
        for i in col..nrows {
            dot += a[(i, col)] * a[(i, k)];
        }
        let gamma = beta * dot;
        for i in col..nrows {
            let v_i = a[(i, col)];
            a[(i, k)] += gamma * v_i;
        }
    }

    a[(col, col)] = sigma;
    for i in (col + 1)..nrows {
        a[(i, col)] = T::zero();
    }
}

/// Triangularizes a matrix by sweeping Householder reflections left to
/// right over its columns.
///
/// On return the sub-diagonal entries of every column are zero; the upper
/// triangle holds the triangular factor of an orthogonal decomposition of
/// the input.
pub fn triangularize<T, R, C, S>(a: &mut Matrix<T, R, C, S>)
where
    T: RealField + Copy,
    R: Dim,
    C: Dim,
    S: StorageMut<T, R, C>,
{
    let sweep = a.ncols().min(a.nrows());
    for col in 0..sweep {
        householder_column(a, col);
    }
}
