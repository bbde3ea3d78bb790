//! Symmetric square roots and U-D covariance factorization

use nalgebra::{RealField, SMatrix, SVector};

use crate::{EstimError, Result};

/// Relative tolerance below which a negative eigenvalue or U-D pivot is
/// treated as floating-point noise and clamped to zero.
fn psd_tolerance<T: RealField + Copy>(scale: T) -> T {
    T::from_f64(1e-9).unwrap() * (T::one() + scale.abs())
}

/// Computes a symmetric square root `S` of a symmetric PSD matrix,
/// such that `S·Sᵀ = M`.
///
/// Uses a symmetric eigendecomposition `M = Q·Λ·Qᵀ` and returns
/// `S = Q·√Λ·Qᵀ`. Eigenvalues that are negative within tolerance are
/// clamped to zero.
///
/// # Errors
/// Returns [`EstimError::NotPositiveSemiDefinite`] if an eigenvalue is
/// negative beyond the numerical tolerance.
pub fn symmetric_square_root<T: RealField + Copy, const N: usize>(
    m: &SMatrix<T, N, N>,
) -> Result<SMatrix<T, N, N>>
where
    nalgebra::Const<N>: nalgebra::DimSub<nalgebra::U1>,
    nalgebra::DefaultAllocator: nalgebra::allocator::Allocator<
            nalgebra::DimDiff<nalgebra::Const<N>, nalgebra::U1>,
        > + nalgebra::allocator::Allocator<
            nalgebra::Const<N>,
            nalgebra::DimDiff<nalgebra::Const<N>, nalgebra::U1>,
        >,
{
    let eigen = m.symmetric_eigen();

    let mut max_abs = T::zero();
    for i in 0..N {
        if eigen.eigenvalues[i].abs() > max_abs {
            max_abs = eigen.eigenvalues[i].abs();
        }
    }
    let tol = psd_tolerance(max_abs);

    let mut sqrt_vals = SVector::<T, N>::zeros();
    for i in 0..N {
        let lambda = eigen.eigenvalues[i];
        if lambda < -tol {
            return Err(EstimError::NotPositiveSemiDefinite);
        }
        sqrt_vals[i] = if lambda > T::zero() {
            lambda.sqrt()
        } else {
            T::zero()
        };
    }

    let q = eigen.eigenvectors;
    Ok(q * SMatrix::from_diagonal(&sqrt_vals) * q.transpose())
}

// ============================================================================
// U-D Factorization
// ============================================================================

/// U-D factors of a covariance matrix: `P = U·D·Uᵀ`.
///
/// `U` is unit upper triangular (its lower triangle and diagonal are not
/// stored implicitly here; the matrix carries an explicit unit diagonal) and
/// `D` is diagonal with non-negative entries. Each predict/update step of
/// the U-D filter produces a fresh consistent pair.
#[derive(Debug, Clone, PartialEq)]
pub struct UdFactors<T: RealField, const N: usize> {
    /// Unit upper-triangular factor
    pub u: SMatrix<T, N, N>,
    /// Diagonal factor entries
    pub d: SVector<T, N>,
}

impl<T: RealField + Copy, const N: usize> UdFactors<T, N> {
    /// Factors of the identity covariance.
    pub fn identity() -> Self {
        Self {
            u: SMatrix::identity(),
            d: SVector::repeat(T::one()),
        }
    }
}

/// Factorizes a symmetric PSD covariance into U-D form.
///
/// The modified Cholesky recursion runs over columns right to left, so the
/// input is consumed into a working copy rather than mutated in place.
///
/// # Errors
/// Returns [`EstimError::NotPositiveSemiDefinite`] if a pivot goes negative
/// beyond the numerical tolerance.
pub fn ud_factorize<T: RealField + Copy, const N: usize>(
    p: &SMatrix<T, N, N>,
) -> Result<UdFactors<T, N>> {
    let mut work = *p;
    let mut u = SMatrix::<T, N, N>::identity();
    let mut d = SVector::<T, N>::zeros();

    let tol = psd_tolerance(p.trace());

    for j in (0..N).rev() {
        let pivot = work[(j, j)];
        if pivot < -tol {
            return Err(EstimError::NotPositiveSemiDefinite);
        }
        let pivot = if pivot > T::zero() { pivot } else { T::zero() };
        d[j] = pivot;

        if pivot == T::zero() {
            // Zero variance in this direction; the column of U stays zero
            // off-diagonal and nothing is folded back.
            continue;
        }

        for i in 0..j {
            u[(i, j)] = work[(i, j)] / pivot;
            // Fold the rank-1 contribution of column j back into the
            // remaining leading block.
            for k in 0..=i {
                work[(k, i)] -= u[(k, j)] * d[j] * u[(i, j)];
            }
        }
    }

    Ok(UdFactors { u, d })
}

/// Reconstructs the covariance from its U-D factors: `P = U·D·Uᵀ`.
pub fn ud_reconstruct<T: RealField + Copy, const N: usize>(
    factors: &UdFactors<T, N>,
) -> SMatrix<T, N, N> {
    factors.u * SMatrix::from_diagonal(&factors.d) * factors.u.transpose()
}
