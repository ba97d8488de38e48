//! Matrix reshapes and truncated SVD factorization for tensor trains.
//!
//! These helpers convert between the 3-leg site tensors and the matrices
//! handed to the factorization backend, and perform the rank-revealing
//! split used by canonical moves and bond truncation.

use nalgebra::DMatrix;

use crate::error::{Result, TensorTrainError};
use crate::types::Tensor3;

/// Reshape a (left, site, right) tensor into a (left * site, right) matrix.
pub fn tensor3_to_left_matrix(t: &Tensor3<f64>) -> DMatrix<f64> {
    let (l, s, r) = (t.left_dim(), t.site_dim(), t.right_dim());
    DMatrix::from_fn(l * s, r, |row, col| t[[row / s, row % s, col]])
}

/// Reshape a (left, site, right) tensor into a (left, site * right) matrix.
pub fn tensor3_to_right_matrix(t: &Tensor3<f64>) -> DMatrix<f64> {
    let (l, s, r) = (t.left_dim(), t.site_dim(), t.right_dim());
    DMatrix::from_fn(l, s * r, |row, col| t[[row, col / r, col % r]])
}

/// Reshape a (left * site, bond) matrix back into a (left, site, bond) tensor.
pub fn tensor3_from_left_matrix(m: &DMatrix<f64>, left_dim: usize, site_dim: usize) -> Tensor3<f64> {
    let bond = m.ncols();
    let mut t = Tensor3::zeros(left_dim, site_dim, bond);
    for l in 0..left_dim {
        for s in 0..site_dim {
            for b in 0..bond {
                t[[l, s, b]] = m[(l * site_dim + s, b)];
            }
        }
    }
    t
}

/// Reshape a (bond, site * right) matrix back into a (bond, site, right) tensor.
pub fn tensor3_from_right_matrix(
    m: &DMatrix<f64>,
    site_dim: usize,
    right_dim: usize,
) -> Tensor3<f64> {
    let bond = m.nrows();
    let mut t = Tensor3::zeros(bond, site_dim, right_dim);
    for b in 0..bond {
        for s in 0..site_dim {
            for r in 0..right_dim {
                t[[b, s, r]] = m[(b, s * right_dim + r)];
            }
        }
    }
    t
}

/// Truncation parameters for an SVD split.
///
/// `cutoff` uses squared-weight semantics: the split discards the largest
/// tail of singular values whose summed squares stay below
/// `cutoff * sum(sigma_i^2)`. `max_rank` caps the retained rank afterwards.
/// At least one singular value is always kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncateSpec {
    /// Maximum retained rank (bond dimension). `None` means unbounded.
    pub max_rank: Option<usize>,
    /// Squared-weight truncation cutoff. `None` keeps the full spectrum.
    pub cutoff: Option<f64>,
}

impl TruncateSpec {
    /// Keep the full spectrum (exact split, no truncation).
    pub fn exact() -> Self {
        Self::default()
    }

    /// Set the maximum retained rank.
    pub fn with_max_rank(mut self, max_rank: usize) -> Self {
        self.max_rank = Some(max_rank);
        self
    }

    /// Set the squared-weight truncation cutoff.
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
}

/// Result of a truncated SVD split `A ≈ U * diag(s) * Vt`.
#[derive(Debug, Clone)]
pub struct SvdSplit {
    /// Left factor with orthonormal columns, (nrows, rank).
    pub u: DMatrix<f64>,
    /// Retained singular values, descending.
    pub singular_values: Vec<f64>,
    /// Right factor with orthonormal rows, (rank, ncols).
    pub vt: DMatrix<f64>,
    /// Relative squared weight of the discarded tail.
    pub discarded_weight: f64,
}

/// Compute a truncated SVD split of a matrix.
///
/// Singular values are returned in descending order regardless of backend
/// ordering.
///
/// # Errors
///
/// Returns `FactorizationFailed` if the backend does not produce both
/// factors, if any singular value is non-finite, or if the input matrix is
/// identically zero (norm collapse).
pub fn svd_split(mat: &DMatrix<f64>, spec: &TruncateSpec) -> Result<SvdSplit> {
    let svd = mat.clone().svd(true, true);
    let u = svd.u.ok_or_else(|| TensorTrainError::FactorizationFailed {
        message: "SVD did not return U".to_string(),
    })?;
    let vt = svd.v_t.ok_or_else(|| TensorTrainError::FactorizationFailed {
        message: "SVD did not return Vt".to_string(),
    })?;
    let sigma: Vec<f64> = svd.singular_values.iter().copied().collect();

    if sigma.iter().any(|s| !s.is_finite()) {
        return Err(TensorTrainError::FactorizationFailed {
            message: "SVD produced non-finite singular values".to_string(),
        });
    }

    // Descending order; the backend does not guarantee it.
    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].partial_cmp(&sigma[a]).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = sigma.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return Err(TensorTrainError::FactorizationFailed {
            message: "matrix has zero norm".to_string(),
        });
    }

    // Discard the smallest tail with squared weight below cutoff * total.
    let mut rank = sigma.len();
    if let Some(cutoff) = spec.cutoff {
        let budget = cutoff * total;
        let mut discarded = 0.0;
        while rank > 1 {
            let s = sigma[order[rank - 1]];
            if discarded + s * s > budget {
                break;
            }
            discarded += s * s;
            rank -= 1;
        }
    }
    if let Some(max_rank) = spec.max_rank {
        rank = rank.min(max_rank.max(1));
    }

    let discarded_weight: f64 =
        order[rank..].iter().map(|&i| sigma[i] * sigma[i]).sum::<f64>() / total;

    let u_trunc = DMatrix::from_fn(u.nrows(), rank, |i, j| u[(i, order[j])]);
    let vt_trunc = DMatrix::from_fn(rank, vt.ncols(), |i, j| vt[(order[i], j)]);
    let s_trunc: Vec<f64> = order[..rank].iter().map(|&i| sigma[i]).collect();

    Ok(SvdSplit {
        u: u_trunc,
        singular_values: s_trunc,
        vt: vt_trunc,
        discarded_weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reshape_round_trip() {
        let data: Vec<f64> = (0..24).map(|x| x as f64).collect();
        let t = Tensor3::from_data(data, 2, 3, 4);

        let lm = tensor3_to_left_matrix(&t);
        assert_eq!((lm.nrows(), lm.ncols()), (6, 4));
        assert_eq!(tensor3_from_left_matrix(&lm, 2, 3), t);

        let rm = tensor3_to_right_matrix(&t);
        assert_eq!((rm.nrows(), rm.ncols()), (2, 12));
        assert_eq!(tensor3_from_right_matrix(&rm, 3, 4), t);
    }

    #[test]
    fn test_svd_split_reconstructs() {
        let mat = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let split = svd_split(&mat, &TruncateSpec::exact()).unwrap();

        assert_eq!(split.discarded_weight, 0.0);
        let s = DMatrix::from_fn(split.singular_values.len(), split.singular_values.len(), |i, j| {
            if i == j {
                split.singular_values[i]
            } else {
                0.0
            }
        });
        let rebuilt = &split.u * s * &split.vt;
        assert!((rebuilt - &mat).norm() < 1e-10);
    }

    #[test]
    fn test_svd_split_descending_order() {
        let mat = DMatrix::from_row_slice(2, 2, &[0.1, 0.0, 0.0, 5.0]);
        let split = svd_split(&mat, &TruncateSpec::exact()).unwrap();
        assert!(split.singular_values[0] >= split.singular_values[1]);
        assert!((split.singular_values[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_svd_split_max_rank() {
        let mat = DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 4.0]);
        let split = svd_split(&mat, &TruncateSpec::exact().with_max_rank(1)).unwrap();
        assert_eq!(split.singular_values.len(), 1);
        assert!((split.singular_values[0] - 4.0).abs() < 1e-12);
        // Discarded 3^2 out of 25.
        assert!((split.discarded_weight - 9.0 / 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_svd_split_cutoff() {
        let mat = DMatrix::from_row_slice(2, 2, &[1e-9, 0.0, 0.0, 1.0]);
        let split = svd_split(&mat, &TruncateSpec::exact().with_cutoff(1e-10)).unwrap();
        assert_eq!(split.singular_values.len(), 1);
    }

    #[test]
    fn test_svd_split_keeps_at_least_one() {
        let mat = DMatrix::from_row_slice(2, 2, &[1e-12, 0.0, 0.0, 1e-12]);
        let split = svd_split(&mat, &TruncateSpec::exact().with_cutoff(0.5)).unwrap();
        assert!(!split.singular_values.is_empty());
    }

    #[test]
    fn test_svd_split_rejects_zero_matrix() {
        let mat = DMatrix::zeros(3, 3);
        assert!(svd_split(&mat, &TruncateSpec::exact()).is_err());
    }
}
