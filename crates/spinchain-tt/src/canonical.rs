//! Canonical forms for tensor trains.
//!
//! A train is in center-canonical form with center `c` when every tensor to
//! the left of `c` is left-orthogonal and every tensor to the right is
//! right-orthogonal. The moves here are exact (no truncation): the split
//! keeps the full singular spectrum and absorbs the weights into the
//! neighboring tensor.

use crate::decomposition::{
    svd_split, tensor3_from_left_matrix, tensor3_from_right_matrix, tensor3_to_left_matrix,
    tensor3_to_right_matrix, TruncateSpec,
};
use crate::error::{Result, TensorTrainError};
use crate::tensortrain::TensorTrain;
use crate::types::Tensor3;

fn check_site(tt: &TensorTrain, site: usize) -> Result<()> {
    if site >= tt.len() {
        return Err(TensorTrainError::SiteOutOfBounds {
            site,
            length: tt.len(),
        });
    }
    Ok(())
}

/// Left-orthogonalize the tensor at `site`, absorbing the remainder into
/// `site + 1`.
///
/// # Errors
///
/// Returns `SiteOutOfBounds` if `site + 1 >= len()` and propagates
/// factorization failures.
pub fn move_center_right(tt: &mut TensorTrain, site: usize) -> Result<()> {
    check_site(tt, site + 1)?;

    let t = tt.tensor(site);
    let (l, s) = (t.left_dim(), t.site_dim());
    let split = svd_split(&tensor3_to_left_matrix(t), &TruncateSpec::exact())?;

    *tt.tensor_mut(site) = tensor3_from_left_matrix(&split.u, l, s);

    // Carry diag(s) * Vt into the right neighbor.
    let rank = split.singular_values.len();
    let next = tt.tensor(site + 1);
    let (ns, nr) = (next.site_dim(), next.right_dim());
    let mut updated = Tensor3::zeros(rank, ns, nr);
    for a in 0..rank {
        let weight = split.singular_values[a];
        for b in 0..split.vt.ncols() {
            let carry = weight * split.vt[(a, b)];
            if carry == 0.0 {
                continue;
            }
            for sp in 0..ns {
                for r in 0..nr {
                    updated[[a, sp, r]] += carry * next[[b, sp, r]];
                }
            }
        }
    }
    *tt.tensor_mut(site + 1) = updated;
    Ok(())
}

/// Right-orthogonalize the tensor at `site`, absorbing the remainder into
/// `site - 1`.
///
/// # Errors
///
/// Returns `SiteOutOfBounds` if `site == 0` or `site >= len()` and
/// propagates factorization failures.
pub fn move_center_left(tt: &mut TensorTrain, site: usize) -> Result<()> {
    check_site(tt, site)?;
    if site == 0 {
        return Err(TensorTrainError::SiteOutOfBounds {
            site: 0,
            length: tt.len(),
        });
    }

    let t = tt.tensor(site);
    let (s, r) = (t.site_dim(), t.right_dim());
    let split = svd_split(&tensor3_to_right_matrix(t), &TruncateSpec::exact())?;

    *tt.tensor_mut(site) = tensor3_from_right_matrix(&split.vt, s, r);

    // Carry U * diag(s) into the left neighbor.
    let rank = split.singular_values.len();
    let prev = tt.tensor(site - 1);
    let (pl, ps) = (prev.left_dim(), prev.site_dim());
    let mut updated = Tensor3::zeros(pl, ps, rank);
    for b in 0..rank {
        let weight = split.singular_values[b];
        for a in 0..split.u.nrows() {
            let carry = split.u[(a, b)] * weight;
            if carry == 0.0 {
                continue;
            }
            for l in 0..pl {
                for sp in 0..ps {
                    updated[[l, sp, b]] += prev[[l, sp, a]] * carry;
                }
            }
        }
    }
    *tt.tensor_mut(site - 1) = updated;
    Ok(())
}

/// Bring a tensor train into center-canonical form with the given center.
///
/// # Errors
///
/// Returns `SiteOutOfBounds` if `center >= len()` and propagates
/// factorization failures.
pub fn center_canonicalize(tt: &mut TensorTrain, center: usize) -> Result<()> {
    check_site(tt, center)?;
    for site in 0..center {
        move_center_right(tt, site)?;
    }
    for site in (center + 1..tt.len()).rev() {
        move_center_left(tt, site)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_train(seed: u64, site_dims: &[usize], bond: usize) -> TensorTrain {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = site_dims.len();
        let mut tensors = Vec::with_capacity(n);
        for (i, &d) in site_dims.iter().enumerate() {
            let l = if i == 0 { 1 } else { bond };
            let r = if i == n - 1 { 1 } else { bond };
            let data: Vec<f64> = (0..l * d * r).map(|_| rng.gen_range(-1.0..1.0)).collect();
            tensors.push(Tensor3::from_data(data, l, d, r));
        }
        TensorTrain::new(tensors).unwrap()
    }

    fn all_indices(site_dims: &[usize]) -> Vec<Vec<usize>> {
        let mut out = vec![vec![]];
        for &d in site_dims {
            let mut next = Vec::new();
            for prefix in &out {
                for s in 0..d {
                    let mut idx = prefix.clone();
                    idx.push(s);
                    next.push(idx);
                }
            }
            out = next;
        }
        out
    }

    fn is_left_orthogonal(t: &Tensor3<f64>) -> bool {
        let m = tensor3_to_left_matrix(t);
        let gram = m.transpose() * &m;
        let mut ok = true;
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                ok &= (gram[(i, j)] - expected).abs() < 1e-10;
            }
        }
        ok
    }

    fn is_right_orthogonal(t: &Tensor3<f64>) -> bool {
        let m = tensor3_to_right_matrix(t);
        let gram = &m * m.transpose();
        let mut ok = true;
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                ok &= (gram[(i, j)] - expected).abs() < 1e-10;
            }
        }
        ok
    }

    #[test]
    fn test_center_canonicalize_preserves_values() {
        let dims = vec![2, 2, 2, 2];
        let reference = random_train(7, &dims, 3);
        for center in 0..dims.len() {
            let mut tt = reference.clone();
            center_canonicalize(&mut tt, center).unwrap();
            for idx in all_indices(&dims) {
                let a = reference.evaluate(&idx).unwrap();
                let b = tt.evaluate(&idx).unwrap();
                assert!((a - b).abs() < 1e-10, "center {center} index {idx:?}");
            }
        }
    }

    #[test]
    fn test_center_canonicalize_orthogonality() {
        let dims = vec![2, 2, 2, 2, 2];
        let center = 2;
        let mut tt = random_train(13, &dims, 4);
        center_canonicalize(&mut tt, center).unwrap();
        for site in 0..center {
            assert!(is_left_orthogonal(tt.tensor(site)), "site {site}");
        }
        for site in center + 1..tt.len() {
            assert!(is_right_orthogonal(tt.tensor(site)), "site {site}");
        }
    }

    #[test]
    fn test_move_center_right_then_left_round_trip() {
        let dims = vec![2, 3, 2];
        let reference = random_train(21, &dims, 2);
        let mut tt = reference.clone();
        move_center_right(&mut tt, 0).unwrap();
        move_center_left(&mut tt, 1).unwrap();
        for idx in all_indices(&dims) {
            let a = reference.evaluate(&idx).unwrap();
            let b = tt.evaluate(&idx).unwrap();
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_moves_reject_out_of_bounds() {
        let mut tt = random_train(3, &[2, 2], 2);
        assert!(move_center_right(&mut tt, 1).is_err());
        assert!(move_center_left(&mut tt, 0).is_err());
        assert!(center_canonicalize(&mut tt, 2).is_err());
    }
}
