//! Left and right environments for operator sandwiches.
//!
//! An environment contracts everything to one side of a site into a 3-leg
//! tensor with legs (bra bond, operator bond, ket bond). Environments are
//! grown one site at a time, which is what makes sweeping linear in the
//! chain length.

use spinchain_tt::{Tensor3, Tensor4, TensorTrain};

use crate::error::{DmrgError, Result};
use crate::hamiltonian::Mpo;

/// The trivial boundary environment, a 1x1x1 tensor holding 1.
pub fn boundary() -> Tensor3<f64> {
    let mut t = Tensor3::zeros(1, 1, 1);
    t[[0, 0, 0]] = 1.0;
    t
}

/// Absorb one site into a left environment.
///
/// `env` has legs (bra bond, op bond, ket bond) on the left of the site;
/// the result has the same legs on its right. The same state tensor is used
/// on the bra and ket sides.
pub fn grow_left(env: &Tensor3<f64>, a: &Tensor3<f64>, w: &Tensor4<f64>) -> Tensor3<f64> {
    let (al, s, ar) = (a.left_dim(), a.site_dim(), a.right_dim());
    let (wl, wr) = (w.left_dim(), w.right_dim());

    // T1(w, k, s', b') = sum_b env(b, w, k) a(b, s', b')
    let mut t1 = vec![0.0f64; wl * al * s * ar];
    let t1_idx = |wi: usize, k: usize, sp: usize, bp: usize| ((wi * al + k) * s + sp) * ar + bp;
    for b in 0..al {
        for wi in 0..wl {
            for k in 0..al {
                let e = env[[b, wi, k]];
                if e == 0.0 {
                    continue;
                }
                for sp in 0..s {
                    for bp in 0..ar {
                        t1[t1_idx(wi, k, sp, bp)] += e * a[[b, sp, bp]];
                    }
                }
            }
        }
    }

    // T2(w', sk, k, b') = sum_{w, s'} w(w, s', sk, w') t1(w, k, s', b')
    let mut t2 = vec![0.0f64; wr * s * al * ar];
    let t2_idx = |wo: usize, sk: usize, k: usize, bp: usize| ((wo * s + sk) * al + k) * ar + bp;
    for wi in 0..wl {
        for sp in 0..s {
            for sk in 0..s {
                for wo in 0..wr {
                    let wv = w[[wi, sp, sk, wo]];
                    if wv == 0.0 {
                        continue;
                    }
                    for k in 0..al {
                        for bp in 0..ar {
                            t2[t2_idx(wo, sk, k, bp)] += wv * t1[t1_idx(wi, k, sp, bp)];
                        }
                    }
                }
            }
        }
    }

    // out(b', w', b) = sum_{k, sk} t2(w', sk, k, b') a(k, sk, b)
    let mut out = Tensor3::zeros(ar, wr, ar);
    for wo in 0..wr {
        for sk in 0..s {
            for k in 0..al {
                for bp in 0..ar {
                    let v = t2[t2_idx(wo, sk, k, bp)];
                    if v == 0.0 {
                        continue;
                    }
                    for b in 0..ar {
                        out[[bp, wo, b]] += v * a[[k, sk, b]];
                    }
                }
            }
        }
    }
    out
}

/// Absorb one site into a right environment.
///
/// `env` has legs (bra bond, op bond, ket bond) on the right of the site;
/// the result has the same legs on its left.
pub fn grow_right(env: &Tensor3<f64>, a: &Tensor3<f64>, w: &Tensor4<f64>) -> Tensor3<f64> {
    let (al, s, ar) = (a.left_dim(), a.site_dim(), a.right_dim());
    let (wl, wr) = (w.left_dim(), w.right_dim());

    // T1(w, k, s', b') = sum_b a(b', s', b) env(b, w, k)
    let mut t1 = vec![0.0f64; wr * ar * s * al];
    let t1_idx = |wi: usize, k: usize, sp: usize, bp: usize| ((wi * ar + k) * s + sp) * al + bp;
    for bp in 0..al {
        for sp in 0..s {
            for b in 0..ar {
                let av = a[[bp, sp, b]];
                if av == 0.0 {
                    continue;
                }
                for wi in 0..wr {
                    for k in 0..ar {
                        t1[t1_idx(wi, k, sp, bp)] += av * env[[b, wi, k]];
                    }
                }
            }
        }
    }

    // T2(w', sk, k, b') = sum_{w, s'} w(w', s', sk, w) t1(w, k, s', b')
    let mut t2 = vec![0.0f64; wl * s * ar * al];
    let t2_idx = |wo: usize, sk: usize, k: usize, bp: usize| ((wo * s + sk) * ar + k) * al + bp;
    for wo in 0..wl {
        for sp in 0..s {
            for sk in 0..s {
                for wi in 0..wr {
                    let wv = w[[wo, sp, sk, wi]];
                    if wv == 0.0 {
                        continue;
                    }
                    for k in 0..ar {
                        for bp in 0..al {
                            t2[t2_idx(wo, sk, k, bp)] += wv * t1[t1_idx(wi, k, sp, bp)];
                        }
                    }
                }
            }
        }
    }

    // out(b', w', b) = sum_{k, sk} t2(w', sk, k, b') a(b, sk, k)
    let mut out = Tensor3::zeros(al, wl, al);
    for wo in 0..wl {
        for sk in 0..s {
            for k in 0..ar {
                for bp in 0..al {
                    let v = t2[t2_idx(wo, sk, k, bp)];
                    if v == 0.0 {
                        continue;
                    }
                    for b in 0..al {
                        out[[bp, wo, b]] += v * a[[b, sk, k]];
                    }
                }
            }
        }
    }
    out
}

/// Expectation value `<state| op |state>` of an MPO in a tensor train state.
///
/// The state is not assumed normalized; callers wanting a normalized value
/// divide by `state.norm_squared()`.
///
/// # Errors
///
/// Returns a configuration error if the state and operator lengths differ.
pub fn expectation_value(state: &TensorTrain, op: &Mpo) -> Result<f64> {
    if state.len() != op.len() {
        return Err(DmrgError::Config {
            parameter: "state",
            message: format!(
                "state has {} sites but operator has {}",
                state.len(),
                op.len()
            ),
        });
    }
    let mut env = boundary();
    for (a, w) in state.tensors().iter().zip(op.tensors().iter()) {
        env = grow_left(&env, a, w);
    }
    Ok(env[[0, 0, 0]])
}
