//! Local observables and operator sanity checks.

use nalgebra::DMatrix;
use spinchain_tt::{center_canonicalize, move_center_right, Tensor3, TensorTrain};

use crate::error::{DmrgError, Result};
use crate::hamiltonian::Mpo;
use crate::ops::SpinOp;

/// Expectation value of a single-site operator, normalized.
///
/// # Errors
///
/// Returns a configuration error if the site is out of range or the
/// operator does not match the local dimension, and `NumericalBreakdown`
/// if the state has zero norm.
pub fn local_expectation(state: &TensorTrain, site: usize, op: &DMatrix<f64>) -> Result<f64> {
    if site >= state.len() {
        return Err(DmrgError::Config {
            parameter: "site",
            message: format!("site {site} outside chain of {} sites", state.len()),
        });
    }
    let d = state.tensor(site).site_dim();
    if op.nrows() != d || op.ncols() != d {
        return Err(DmrgError::Config {
            parameter: "op",
            message: format!("operator is {}x{} but the site dimension is {d}", op.nrows(), op.ncols()),
        });
    }
    let mut work = state.clone();
    center_canonicalize(&mut work, site)?;
    center_value(work.tensor(site), op)
}

/// With the center on this tensor, the rest of the chain contracts to
/// identity and the observable reduces to a single-site sandwich.
fn center_value(t: &Tensor3<f64>, op: &DMatrix<f64>) -> Result<f64> {
    let (l_dim, d, r_dim) = (t.left_dim(), t.site_dim(), t.right_dim());
    let mut num = 0.0;
    let mut den = 0.0;
    for l in 0..l_dim {
        for s in 0..d {
            for r in 0..r_dim {
                let v = t[[l, s, r]];
                den += v * v;
                for sp in 0..d {
                    num += v * op[(s, sp)] * t[[l, sp, r]];
                }
            }
        }
    }
    if den < 1e-300 {
        return Err(DmrgError::NumericalBreakdown {
            context: "observable on a zero-norm state".to_string(),
        });
    }
    Ok(num / den)
}

/// Per-site `<Sz>` profile, computed in one sweep of center moves.
///
/// The input state is not modified.
///
/// # Errors
///
/// Propagates factorization failures from the canonical moves.
pub fn sz_profile(state: &TensorTrain) -> Result<Vec<f64>> {
    let sz = SpinOp::Sz.matrix();
    let mut work = state.clone();
    center_canonicalize(&mut work, 0)?;
    let mut profile = Vec::with_capacity(work.len());
    for site in 0..work.len() {
        profile.push(center_value(work.tensor(site), &sz)?);
        if site + 1 < work.len() {
            move_center_right(&mut work, site)?;
        }
    }
    Ok(profile)
}

/// Total magnetization `sum_i <Sz_i>`.
///
/// # Errors
///
/// Same conditions as [`sz_profile`].
pub fn total_sz(state: &TensorTrain) -> Result<f64> {
    Ok(sz_profile(state)?.into_iter().sum())
}

/// Matrix element `<bra| op |ket>` between two (possibly different) states.
///
/// # Errors
///
/// Returns a configuration error if lengths or site dimensions disagree.
pub fn matrix_element(bra: &TensorTrain, ket: &TensorTrain, op: &Mpo) -> Result<f64> {
    if bra.len() != op.len() || ket.len() != op.len() {
        return Err(DmrgError::Config {
            parameter: "bra",
            message: format!(
                "lengths disagree: bra {}, ket {}, operator {}",
                bra.len(),
                ket.len(),
                op.len()
            ),
        });
    }
    // env(b, w, k): bra bond, operator bond, ket bond.
    let mut env = Tensor3::zeros(1, 1, 1);
    env[[0, 0, 0]] = 1.0;
    for ((b_t, k_t), w_t) in bra
        .tensors()
        .iter()
        .zip(ket.tensors().iter())
        .zip(op.tensors().iter())
    {
        if b_t.site_dim() != w_t.row_dim() || k_t.site_dim() != w_t.col_dim() {
            return Err(DmrgError::Config {
                parameter: "op",
                message: "site dimensions disagree with the operator".to_string(),
            });
        }
        let mut next = Tensor3::zeros(b_t.right_dim(), w_t.right_dim(), k_t.right_dim());
        for b in 0..b_t.left_dim() {
            for w in 0..w_t.left_dim() {
                for k in 0..k_t.left_dim() {
                    let e = env[[b, w, k]];
                    if e == 0.0 {
                        continue;
                    }
                    for sp in 0..b_t.site_dim() {
                        for s in 0..k_t.site_dim() {
                            for wr in 0..w_t.right_dim() {
                                let wv = w_t[[w, sp, s, wr]];
                                if wv == 0.0 {
                                    continue;
                                }
                                for bp in 0..b_t.right_dim() {
                                    let bv = b_t[[b, sp, bp]];
                                    if bv == 0.0 {
                                        continue;
                                    }
                                    for kp in 0..k_t.right_dim() {
                                        next[[bp, wr, kp]] += e * wv * bv * k_t[[k, s, kp]];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        env = next;
    }
    Ok(env[[0, 0, 0]])
}

/// Asymmetry residual `|<bra|op|ket> - <ket|op|bra>|`.
///
/// Zero (to rounding) for a symmetric operator; used as a cheap sanity
/// check that an assembled Hamiltonian is self-adjoint.
///
/// # Errors
///
/// Same conditions as [`matrix_element`].
pub fn symmetry_residual(op: &Mpo, bra: &TensorTrain, ket: &TensorTrain) -> Result<f64> {
    Ok((matrix_element(bra, ket, op)? - matrix_element(ket, bra, op)?).abs())
}
