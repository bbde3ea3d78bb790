//! Triangular matrix inversion and substitution solves
//!
//! Inverting a triangular factor by substitution is O(n²) per column and
//! numerically stable, unlike general inversion. The information-form
//! filters lean on these routines for covariance recovery.

use nalgebra::{RealField, SMatrix, SVector};

use crate::{EstimError, Result};

/// Inverts an upper-triangular matrix by back substitution.
///
/// Only the upper triangle of `u` is read; the result is upper triangular.
///
/// # Errors
/// Returns [`EstimError::SingularMatrix`] if any diagonal entry is zero.
pub fn triangular_inverse_upper<T: RealField + Copy, const N: usize>(
    u: &SMatrix<T, N, N>,
) -> Result<SMatrix<T, N, N>> {
    let mut inv = SMatrix::<T, N, N>::zeros();

    for j in 0..N {
        if u[(j, j)] == T::zero() {
            return Err(EstimError::SingularMatrix);
        }
        inv[(j, j)] = T::one() / u[(j, j)];

        // Column j above the diagonal, bottom-up.
        for i in (0..j).rev() {
            let mut sum = T::zero();
            for k in (i + 1)..=j {
                sum += u[(i, k)] * inv[(k, j)];
            }
            inv[(i, j)] = -sum / u[(i, i)];
        }
    }

    Ok(inv)
}

/// Inverts a lower-triangular matrix by forward substitution.
///
/// Only the lower triangle of `l` is read; the result is lower triangular.
///
/// # Errors
/// Returns [`EstimError::SingularMatrix`] if any diagonal entry is zero.
pub fn triangular_inverse_lower<T: RealField + Copy, const N: usize>(
    l: &SMatrix<T, N, N>,
) -> Result<SMatrix<T, N, N>> {
    let upper = triangular_inverse_upper(&l.transpose())?;
    Ok(upper.transpose())
}

/// Solves `R x = b` for upper-triangular `R` by back substitution.
///
/// This is how the SRIF extracts a state correction from its information
/// array without forming `R⁻¹`.
///
/// # Errors
/// Returns [`EstimError::SingularMatrix`] if any diagonal entry is zero.
pub fn back_substitute<T: RealField + Copy, const N: usize>(
    r: &SMatrix<T, N, N>,
    b: &SVector<T, N>,
) -> Result<SVector<T, N>> {
    let mut x = SVector::<T, N>::zeros();

    for i in (0..N).rev() {
        if r[(i, i)] == T::zero() {
            return Err(EstimError::SingularMatrix);
        }
        let mut sum = b[i];
        for k in (i + 1)..N {
            sum -= r[(i, k)] * x[k];
        }
        x[i] = sum / r[(i, i)];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_inverse_identity() {
        let u: nalgebra::SMatrix<f64, 3, 3> = nalgebra::matrix![
            2.0, 1.0, -1.0;
            0.0, 3.0, 0.5;
            0.0, 0.0, 4.0
        ];
        let inv = triangular_inverse_upper(&u).unwrap();
        let prod = u * inv;

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_lower_inverse_identity() {
        let l: nalgebra::SMatrix<f64, 3, 3> = nalgebra::matrix![
            1.5, 0.0, 0.0;
            -2.0, 2.0, 0.0;
            0.3, 1.0, 0.5
        ];
        let inv = triangular_inverse_lower(&l).unwrap();
        let prod = l * inv;

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_diagonal_rejected() {
        let u = nalgebra::matrix![
            2.0, 1.0;
            0.0, 0.0
        ];
        assert_eq!(
            triangular_inverse_upper(&u),
            Err(EstimError::SingularMatrix)
        );
    }

    #[test]
    fn test_back_substitute() {
        let r: nalgebra::SMatrix<f64, 2, 2> = nalgebra::matrix![
            2.0, 1.0;
            0.0, 4.0
        ];
        let x_true = nalgebra::vector![3.0, -1.0];
        let b = r * x_true;

        let x = back_substitute(&r, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] + 1.0).abs() < 1e-12);
    }
}
