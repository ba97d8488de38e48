//! Lanczos iteration for the lowest eigenpair of a symmetric operator.
//!
//! The operator is supplied as a matrix-vector product, so callers never
//! form the effective Hamiltonian densely. Full reorthogonalization keeps
//! the Krylov basis well conditioned at the dimensions reached here.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{DmrgError, Result};

const BREAKDOWN_TOL: f64 = 1e-12;

/// Options for the Lanczos iteration.
#[derive(Debug, Clone, Copy)]
pub struct LanczosOptions {
    /// Maximum Krylov dimension.
    pub max_iter: usize,
    /// Stop once the lowest Ritz value changes by less than this.
    pub tol: f64,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            max_iter: 40,
            tol: 1e-13,
        }
    }
}

/// Lowest Ritz value and eigenvector of the tridiagonal projection.
fn lowest_ritz(alphas: &[f64], betas: &[f64]) -> (f64, DVector<f64>) {
    let m = alphas.len();
    let mut tri = DMatrix::zeros(m, m);
    for i in 0..m {
        tri[(i, i)] = alphas[i];
        if i + 1 < m {
            tri[(i, i + 1)] = betas[i];
            tri[(i + 1, i)] = betas[i];
        }
    }
    let eig = SymmetricEigen::new(tri);
    let mut best = 0;
    for i in 1..m {
        if eig.eigenvalues[i] < eig.eigenvalues[best] {
            best = i;
        }
    }
    (eig.eigenvalues[best], eig.eigenvectors.column(best).into_owned())
}

/// Find the lowest eigenpair of a symmetric operator by Lanczos iteration.
///
/// `apply` must implement a symmetric matrix-vector product; `v0` is the
/// starting vector, which also fixes any invariant subspace the iteration
/// stays inside.
///
/// # Errors
///
/// Returns `NumericalBreakdown` if the starting vector has (near-)zero norm
/// or the iteration produces non-finite values. An early loss of a new
/// direction (an exact invariant subspace) is not an error; the current
/// Ritz pair is returned.
pub fn lowest_eigenpair<F>(
    apply: F,
    v0: &DVector<f64>,
    opts: &LanczosOptions,
) -> Result<(f64, DVector<f64>)>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let norm0 = v0.norm();
    if !norm0.is_finite() || norm0 < BREAKDOWN_TOL {
        return Err(DmrgError::NumericalBreakdown {
            context: "Lanczos starting vector has zero norm".to_string(),
        });
    }

    let mut basis: Vec<DVector<f64>> = vec![v0 / norm0];
    let mut alphas: Vec<f64> = Vec::new();
    let mut betas: Vec<f64> = Vec::new();
    let mut last_value = f64::INFINITY;

    let max_iter = opts.max_iter.min(v0.len()).max(1);
    for j in 0..max_iter {
        let vj = &basis[j];
        let mut w = apply(vj);
        let alpha = vj.dot(&w);
        if !alpha.is_finite() {
            return Err(DmrgError::NumericalBreakdown {
                context: "Lanczos produced a non-finite diagonal element".to_string(),
            });
        }
        w -= vj * alpha;
        if j > 0 {
            w -= &basis[j - 1] * betas[j - 1];
        }
        // Full reorthogonalization against the whole basis.
        for v in &basis {
            let overlap = v.dot(&w);
            w -= v * overlap;
        }
        alphas.push(alpha);

        let (value, _) = lowest_ritz(&alphas, &betas);
        let converged = (last_value - value).abs() < opts.tol;
        last_value = value;

        let beta = w.norm();
        if !beta.is_finite() {
            return Err(DmrgError::NumericalBreakdown {
                context: "Lanczos produced a non-finite off-diagonal element".to_string(),
            });
        }
        // beta below tolerance means the Krylov space closed on an invariant
        // subspace; the Ritz pair is exact there.
        if converged || beta < BREAKDOWN_TOL || j + 1 == max_iter {
            break;
        }
        betas.push(beta);
        basis.push(w / beta);
    }

    let (value, coeffs) = lowest_ritz(&alphas, &betas);
    let mut vec = DVector::zeros(v0.len());
    for (v, &c) in basis.iter().zip(coeffs.iter()) {
        vec += v * c;
    }
    let norm = vec.norm();
    if !norm.is_finite() || norm < BREAKDOWN_TOL {
        return Err(DmrgError::NumericalBreakdown {
            context: "Lanczos eigenvector lost its norm".to_string(),
        });
    }
    vec /= norm;
    Ok((value, vec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_symmetric(n: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
        (&a + a.transpose()) * 0.5
    }

    #[test]
    fn test_matches_dense_eigensolver() {
        for seed in 0..3u64 {
            let n = 24;
            let mat = random_symmetric(n, seed);
            let mut rng = ChaCha8Rng::seed_from_u64(seed + 100);
            let v0 = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));

            let opts = LanczosOptions {
                max_iter: n,
                tol: 1e-14,
            };
            let (value, vec) = lowest_eigenpair(|v| &mat * v, &v0, &opts).unwrap();

            let eig = SymmetricEigen::new(mat.clone());
            let dense_min = eig.eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min);
            assert!((value - dense_min).abs() < 1e-9, "seed {seed}");

            // Residual check: ||Hv - value v|| small.
            let residual = (&mat * &vec - &vec * value).norm();
            assert!(residual < 1e-7, "seed {seed}, residual {residual}");
        }
    }

    #[test]
    fn test_diagonal_matrix_converges_fast() {
        let mat = DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, -5.0, 1.0, 2.0]));
        let v0 = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        let (value, vec) = lowest_eigenpair(|v| &mat * v, &v0, &LanczosOptions::default()).unwrap();
        assert!((value + 5.0).abs() < 1e-10);
        assert!((vec[1].abs() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_invariant_subspace_is_not_an_error() {
        // Start exactly on an eigenvector; beta collapses immediately.
        let mat = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 7.0]));
        let v0 = DVector::from_vec(vec![1.0, 0.0]);
        let (value, _) = lowest_eigenpair(|v| &mat * v, &v0, &LanczosOptions::default()).unwrap();
        assert!((value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_start_vector_is_breakdown() {
        let mat = DMatrix::identity(3, 3);
        let v0 = DVector::zeros(3);
        assert!(matches!(
            lowest_eigenpair(|v| &mat * v, &v0, &LanczosOptions::default()),
            Err(DmrgError::NumericalBreakdown { .. })
        ));
    }
}
