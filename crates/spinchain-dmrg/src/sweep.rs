//! Two-site variational sweeps.
//!
//! Each bond update contracts the two site tensors into a single two-site
//! block, minimizes the energy of that block with Lanczos against the
//! frozen rest of the chain, and splits the result back with a truncated
//! SVD. Environments are updated incrementally so a full sweep costs one
//! environment contraction per site.

use nalgebra::{DMatrix, DVector};
use spinchain_tt::{
    center_canonicalize, svd_split, tensor3_from_left_matrix, tensor3_from_right_matrix, Tensor3,
    Tensor4, TensorTrain, TruncateSpec,
};

use crate::environment::{boundary, grow_left, grow_right};
use crate::error::{DmrgError, Result};
use crate::hamiltonian::Mpo;
use crate::lanczos::{lowest_eigenpair, LanczosOptions};

/// Truncation parameters for one sweep.
#[derive(Debug, Clone, Copy)]
pub struct Sweep {
    /// Maximum bond dimension kept at each split.
    pub max_bond: usize,
    /// Squared-weight truncation cutoff at each split.
    pub cutoff: f64,
}

/// A sequence of sweeps with per-sweep truncation parameters.
#[derive(Debug, Clone)]
pub struct SweepSchedule {
    sweeps: Vec<Sweep>,
}

impl SweepSchedule {
    /// `n_sweeps` sweeps with the same bond cap and cutoff.
    pub fn uniform(n_sweeps: usize, max_bond: usize, cutoff: f64) -> Self {
        Self {
            sweeps: vec![Sweep { max_bond, cutoff }; n_sweeps],
        }
    }

    /// `n_sweeps` sweeps whose bond cap doubles from `start_bond` each
    /// sweep until it reaches `max_bond`.
    ///
    /// Early sweeps on a cheap bond dimension get the state roughly right
    /// before the expensive sweeps refine it.
    pub fn ramp(n_sweeps: usize, start_bond: usize, max_bond: usize, cutoff: f64) -> Self {
        let mut sweeps = Vec::with_capacity(n_sweeps);
        let mut bond = start_bond.max(1);
        for _ in 0..n_sweeps {
            sweeps.push(Sweep {
                max_bond: bond.min(max_bond),
                cutoff,
            });
            bond = bond.saturating_mul(2);
        }
        Self { sweeps }
    }

    /// The sweeps in execution order.
    pub fn sweeps(&self) -> &[Sweep] {
        &self.sweeps
    }

    /// Number of sweeps.
    pub fn len(&self) -> usize {
        self.sweeps.len()
    }

    /// Whether the schedule has no sweeps.
    pub fn is_empty(&self) -> bool {
        self.sweeps.is_empty()
    }
}

/// Options for the sweep driver.
#[derive(Debug, Clone, Copy)]
pub struct DmrgOptions {
    /// Maximum Krylov dimension per bond update.
    pub lanczos_max_iter: usize,
    /// Ritz value convergence tolerance per bond update.
    pub lanczos_tol: f64,
    /// Stop early once the sweep energy changes by less than this.
    pub energy_tol: Option<f64>,
    /// Print per-sweep progress to stderr.
    pub verbose: bool,
}

impl Default for DmrgOptions {
    fn default() -> Self {
        Self {
            lanczos_max_iter: 40,
            lanczos_tol: 1e-13,
            energy_tol: None,
            verbose: false,
        }
    }
}

impl DmrgOptions {
    /// Set the maximum Krylov dimension per bond update.
    pub fn with_lanczos_max_iter(mut self, max_iter: usize) -> Self {
        self.lanczos_max_iter = max_iter;
        self
    }

    /// Set the Ritz value convergence tolerance per bond update.
    pub fn with_lanczos_tol(mut self, tol: f64) -> Self {
        self.lanczos_tol = tol;
        self
    }

    /// Stop sweeping once the energy changes by less than `tol`.
    pub fn with_energy_tol(mut self, tol: f64) -> Self {
        self.energy_tol = Some(tol);
        self
    }

    /// Enable per-sweep progress output on stderr.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Outcome of a sweep run.
#[derive(Debug, Clone)]
pub struct DmrgResult {
    /// Final variational energy.
    pub energy: f64,
    /// Optimized state, normalized, center-canonical at site 0.
    pub state: TensorTrain,
    /// Energy after each completed sweep.
    pub sweep_energies: Vec<f64>,
    /// Largest relative squared weight discarded at any split.
    pub max_truncation_error: f64,
}

/// Effective Hamiltonian of a two-site block between frozen environments.
struct EffectiveHam<'a> {
    left: &'a Tensor3<f64>,
    right: &'a Tensor3<f64>,
    w1: &'a Tensor4<f64>,
    w2: &'a Tensor4<f64>,
    al: usize,
    d1: usize,
    d2: usize,
    ar: usize,
}

impl<'a> EffectiveHam<'a> {
    fn new(
        left: &'a Tensor3<f64>,
        right: &'a Tensor3<f64>,
        w1: &'a Tensor4<f64>,
        w2: &'a Tensor4<f64>,
    ) -> Self {
        Self {
            left,
            right,
            w1,
            w2,
            al: left.right_dim(),
            d1: w1.col_dim(),
            d2: w2.col_dim(),
            ar: right.right_dim(),
        }
    }

    fn dim(&self) -> usize {
        self.al * self.d1 * self.d2 * self.ar
    }

    /// `y = H_eff x`, staged left to right.
    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let (al, d1, d2, ar) = (self.al, self.d1, self.d2, self.ar);
        let (wl, wm) = (self.w1.left_dim(), self.w1.right_dim());
        let wr = self.w2.right_dim();
        let x_idx = |a: usize, s1: usize, s2: usize, r: usize| ((a * d1 + s1) * d2 + s2) * ar + r;

        // S1(wl, a', s1, s2, r) = sum_a L(a', wl, a) x(a, s1, s2, r)
        let mut s1t = vec![0.0f64; wl * al * d1 * d2 * ar];
        let s1_idx = |w: usize, ap: usize, s1: usize, s2: usize, r: usize| {
            (((w * al + ap) * d1 + s1) * d2 + s2) * ar + r
        };
        for ap in 0..al {
            for w in 0..wl {
                for a in 0..al {
                    let lv = self.left[[ap, w, a]];
                    if lv == 0.0 {
                        continue;
                    }
                    for s1 in 0..d1 {
                        for s2 in 0..d2 {
                            for r in 0..ar {
                                s1t[s1_idx(w, ap, s1, s2, r)] += lv * x[x_idx(a, s1, s2, r)];
                            }
                        }
                    }
                }
            }
        }

        // S2(wm, a', s1', s2, r) = sum_{wl, s1} W1(wl, s1', s1, wm) S1
        let mut s2t = vec![0.0f64; wm * al * d1 * d2 * ar];
        let s2_idx = |w: usize, ap: usize, s1: usize, s2: usize, r: usize| {
            (((w * al + ap) * d1 + s1) * d2 + s2) * ar + r
        };
        for w in 0..wl {
            for s1p in 0..d1 {
                for s1 in 0..d1 {
                    for wo in 0..wm {
                        let wv = self.w1[[w, s1p, s1, wo]];
                        if wv == 0.0 {
                            continue;
                        }
                        for ap in 0..al {
                            for s2 in 0..d2 {
                                for r in 0..ar {
                                    s2t[s2_idx(wo, ap, s1p, s2, r)] +=
                                        wv * s1t[s1_idx(w, ap, s1, s2, r)];
                                }
                            }
                        }
                    }
                }
            }
        }

        // S3(wr, a', s1', s2', r) = sum_{wm, s2} W2(wm, s2', s2, wr) S2
        let mut s3t = vec![0.0f64; wr * al * d1 * d2 * ar];
        let s3_idx = |w: usize, ap: usize, s1: usize, s2: usize, r: usize| {
            (((w * al + ap) * d1 + s1) * d2 + s2) * ar + r
        };
        for w in 0..wm {
            for s2p in 0..d2 {
                for s2 in 0..d2 {
                    for wo in 0..wr {
                        let wv = self.w2[[w, s2p, s2, wo]];
                        if wv == 0.0 {
                            continue;
                        }
                        for ap in 0..al {
                            for s1 in 0..d1 {
                                for r in 0..ar {
                                    s3t[s3_idx(wo, ap, s1, s2p, r)] +=
                                        wv * s2t[s2_idx(w, ap, s1, s2, r)];
                                }
                            }
                        }
                    }
                }
            }
        }

        // y(a', s1', s2', r') = sum_{wr, r} R(r', wr, r) S3
        let mut y = DVector::zeros(self.dim());
        for rp in 0..ar {
            for w in 0..wr {
                for r in 0..ar {
                    let rv = self.right[[rp, w, r]];
                    if rv == 0.0 {
                        continue;
                    }
                    for ap in 0..al {
                        for s1 in 0..d1 {
                            for s2 in 0..d2 {
                                y[x_idx(ap, s1, s2, rp)] += rv * s3t[s3_idx(w, ap, s1, s2, r)];
                            }
                        }
                    }
                }
            }
        }
        y
    }
}

fn two_site_block(a: &Tensor3<f64>, b: &Tensor3<f64>) -> DVector<f64> {
    let (al, d1) = (a.left_dim(), a.site_dim());
    let (d2, ar) = (b.site_dim(), b.right_dim());
    let mut theta = DVector::zeros(al * d1 * d2 * ar);
    for l in 0..al {
        for s1 in 0..d1 {
            for bond in 0..a.right_dim() {
                let av = a[[l, s1, bond]];
                if av == 0.0 {
                    continue;
                }
                for s2 in 0..d2 {
                    for r in 0..ar {
                        theta[((l * d1 + s1) * d2 + s2) * ar + r] += av * b[[bond, s2, r]];
                    }
                }
            }
        }
    }
    theta
}

/// Entries this small are treated as exact zeros when reading charge
/// structure off a tensor.
const CHARGE_SUPPORT_TOL: f64 = 1e-10;

/// Twice the Sz of a local basis state (`+1` for up, `-1` for down on
/// spin-1/2; generalizes to `d - 1 - 2s`).
fn spin_charge(s: usize, d: usize) -> i32 {
    d as i32 - 1 - 2 * s as i32
}

/// Charge labels (twice total Sz) per bond index, accumulated from each end
/// of the chain.
///
/// The local eigensolver would otherwise drift toward the effective
/// Hamiltonian's global ground state: a rounding-level leak into a
/// lower-energy sector gets amplified by the Krylov iteration until a trial
/// seeded above half filling collapses onto the half-filled ground state.
/// With the labels in hand every Lanczos iterate is projected back onto the
/// target sector and every split runs block by block, so bond indices keep
/// exact charges throughout the sweeps.
struct SectorCharges {
    /// Twice the total Sz of the represented state.
    target: i32,
    /// `left[i][a]` = charge accumulated over sites `[0, i)` for bond index
    /// `a` entering site `i`.
    left: Vec<Vec<i32>>,
    /// `right[i][a]` = charge accumulated over sites `[i, n)`.
    right: Vec<Vec<i32>>,
}

impl SectorCharges {
    /// Read the labels off a state that is center-canonical at site 0.
    ///
    /// Returns `None` when some bond index mixes charges (the state is not
    /// sector-pure); the sweeps then run without sector projection.
    fn infer(state: &TensorTrain) -> Option<Self> {
        let n = state.len();
        let mut right = vec![Vec::new(); n + 1];
        right[n] = vec![0];
        for i in (1..n).rev() {
            right[i] = infer_bond_charges(state.tensor(i), &right[i + 1])?;
        }

        let t = state.tensor(0);
        let mut target: Option<i32> = None;
        for s in 0..t.site_dim() {
            for r in 0..t.right_dim() {
                if t[[0, s, r]].abs() > CHARGE_SUPPORT_TOL {
                    let q = spin_charge(s, t.site_dim()) + right[1][r];
                    match target {
                        None => target = Some(q),
                        Some(existing) if existing != q => return None,
                        Some(_) => {}
                    }
                }
            }
        }

        let mut left = vec![Vec::new(); n + 1];
        left[0] = vec![0];
        Some(Self {
            target: target?,
            left,
            right,
        })
    }
}

/// Charge of each left bond index of a right-orthogonal tensor, given the
/// charges of its right bond.
fn infer_bond_charges(t: &Tensor3<f64>, next: &[i32]) -> Option<Vec<i32>> {
    let mut charges = Vec::with_capacity(t.left_dim());
    for b in 0..t.left_dim() {
        let mut q: Option<i32> = None;
        for s in 0..t.site_dim() {
            for r in 0..t.right_dim() {
                if t[[b, s, r]].abs() > CHARGE_SUPPORT_TOL {
                    let candidate = spin_charge(s, t.site_dim()) + next[r];
                    match q {
                        None => q = Some(candidate),
                        Some(existing) if existing != candidate => return None,
                        Some(_) => {}
                    }
                }
            }
        }
        charges.push(q?);
    }
    Some(charges)
}

/// Zero every component whose row plus column charge misses the target.
fn project_sector(v: &mut DVector<f64>, row_q: &[i32], col_q: &[i32], target: i32) {
    let ncols = col_q.len();
    for (row, &rq) in row_q.iter().enumerate() {
        for (col, &cq) in col_q.iter().enumerate() {
            if rq + cq != target {
                v[row * ncols + col] = 0.0;
            }
        }
    }
}

struct ChargedSplit {
    u: DMatrix<f64>,
    singular_values: Vec<f64>,
    vt: DMatrix<f64>,
    discarded_weight: f64,
    /// Left-accumulated charge of each kept bond index.
    charges: Vec<i32>,
}

/// Truncated SVD of a sector-pure two-site matrix, one charge block at a
/// time.
///
/// A plain SVD could rotate degenerate singular vectors across blocks;
/// factoring per block keeps every kept bond index at an exact charge. The
/// combined spectrum is truncated with the same cutoff/cap semantics as
/// `svd_split`.
fn split_by_charge(
    mat: &DMatrix<f64>,
    row_q: &[i32],
    col_q: &[i32],
    target: i32,
    sweep: &Sweep,
) -> Result<ChargedSplit> {
    struct Candidate {
        sigma: f64,
        charge: i32,
        u: Vec<f64>,
        vt: Vec<f64>,
    }

    let mut block_charges: Vec<i32> = Vec::new();
    for &q in row_q {
        if !block_charges.contains(&q) {
            block_charges.push(q);
        }
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for &q in &block_charges {
        let rows: Vec<usize> = (0..row_q.len()).filter(|&i| row_q[i] == q).collect();
        let cols: Vec<usize> = (0..col_q.len()).filter(|&j| q + col_q[j] == target).collect();
        if cols.is_empty() {
            continue;
        }
        let sub = DMatrix::from_fn(rows.len(), cols.len(), |i, j| mat[(rows[i], cols[j])]);
        if sub.iter().map(|v| v * v).sum::<f64>() <= 0.0 {
            continue;
        }
        let split = svd_split(&sub, &TruncateSpec::exact()).map_err(|e| {
            DmrgError::NumericalBreakdown {
                context: format!("charge-block split: {e}"),
            }
        })?;
        for k in 0..split.singular_values.len() {
            let mut u_full = vec![0.0; mat.nrows()];
            for (i, &row) in rows.iter().enumerate() {
                u_full[row] = split.u[(i, k)];
            }
            let mut vt_full = vec![0.0; mat.ncols()];
            for (j, &col) in cols.iter().enumerate() {
                vt_full[col] = split.vt[(k, j)];
            }
            candidates.push(Candidate {
                sigma: split.singular_values[k],
                charge: q,
                u: u_full,
                vt: vt_full,
            });
        }
    }

    if candidates.is_empty() {
        return Err(DmrgError::NumericalBreakdown {
            context: "every charge block of the two-site matrix is empty".to_string(),
        });
    }
    candidates
        .sort_by(|a, b| b.sigma.partial_cmp(&a.sigma).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = candidates.iter().map(|c| c.sigma * c.sigma).sum();
    if total <= 0.0 {
        return Err(DmrgError::NumericalBreakdown {
            context: "two-site matrix has zero norm".to_string(),
        });
    }
    let mut rank = candidates.len();
    let budget = sweep.cutoff * total;
    let mut discarded = 0.0;
    while rank > 1 {
        let s = candidates[rank - 1].sigma;
        if discarded + s * s > budget {
            break;
        }
        discarded += s * s;
        rank -= 1;
    }
    rank = rank.min(sweep.max_bond.max(1));
    let discarded_weight: f64 =
        candidates[rank..].iter().map(|c| c.sigma * c.sigma).sum::<f64>() / total;

    let u = DMatrix::from_fn(mat.nrows(), rank, |i, j| candidates[j].u[i]);
    let vt = DMatrix::from_fn(rank, mat.ncols(), |i, j| candidates[i].vt[j]);
    Ok(ChargedSplit {
        u,
        singular_values: candidates[..rank].iter().map(|c| c.sigma).collect(),
        vt,
        discarded_weight,
        charges: candidates[..rank].iter().map(|c| c.charge).collect(),
    })
}

struct BondUpdate {
    energy: f64,
    truncation_error: f64,
}

/// Optimize the block on bond `(site, site + 1)` and split it back,
/// leaving the center on `site + 1` when moving right and on `site` when
/// moving left.
#[allow(clippy::too_many_arguments)]
fn update_bond(
    state: &mut TensorTrain,
    mpo: &Mpo,
    left_env: &Tensor3<f64>,
    right_env: &Tensor3<f64>,
    site: usize,
    sweep: &Sweep,
    lanczos: &LanczosOptions,
    moving_right: bool,
    mut sector: Option<&mut SectorCharges>,
) -> Result<BondUpdate> {
    let ham = EffectiveHam::new(left_env, right_env, mpo.tensor(site), mpo.tensor(site + 1));
    let (al, d1, d2, ar) = (ham.al, ham.d1, ham.d2, ham.ar);

    // Per-row and per-column charges of the two-site matrix, when known.
    let sector_info: Option<(Vec<i32>, Vec<i32>, i32)> = sector.as_deref().map(|sc| {
        let mut row_q = Vec::with_capacity(al * d1);
        for a in 0..al {
            for s1 in 0..d1 {
                row_q.push(sc.left[site][a] + spin_charge(s1, d1));
            }
        }
        let mut col_q = Vec::with_capacity(d2 * ar);
        for s2 in 0..d2 {
            for r in 0..ar {
                col_q.push(spin_charge(s2, d2) + sc.right[site + 2][r]);
            }
        }
        (row_q, col_q, sc.target)
    });

    let mut theta0 = two_site_block(state.tensor(site), state.tensor(site + 1));
    if let Some((row_q, col_q, target)) = &sector_info {
        project_sector(&mut theta0, row_q, col_q, *target);
    }
    let (energy, theta) = lowest_eigenpair(
        |v| {
            let mut y = ham.apply(v);
            if let Some((row_q, col_q, target)) = &sector_info {
                project_sector(&mut y, row_q, col_q, *target);
            }
            y
        },
        &theta0,
        lanczos,
    )?;

    let mat = DMatrix::from_fn(al * d1, d2 * ar, |row, col| theta[row * d2 * ar + col]);
    let (u, mut singular_values, vt, discarded_weight, new_charges) = match &sector_info {
        Some((row_q, col_q, target)) => {
            let split = split_by_charge(&mat, row_q, col_q, *target, sweep)?;
            (
                split.u,
                split.singular_values,
                split.vt,
                split.discarded_weight,
                Some(split.charges),
            )
        }
        None => {
            let spec = TruncateSpec::exact()
                .with_max_rank(sweep.max_bond)
                .with_cutoff(sweep.cutoff);
            let split = svd_split(&mat, &spec).map_err(|e| DmrgError::NumericalBreakdown {
                context: format!("two-site split at bond ({site}, {}): {e}", site + 1),
            })?;
            (
                split.u,
                split.singular_values,
                split.vt,
                split.discarded_weight,
                None,
            )
        }
    };

    // Renormalize the kept spectrum so the state keeps unit norm.
    let kept: f64 = singular_values.iter().map(|s| s * s).sum::<f64>().sqrt();
    if kept < 1e-300 {
        return Err(DmrgError::NumericalBreakdown {
            context: format!("norm collapse at bond ({site}, {})", site + 1),
        });
    }
    for s in &mut singular_values {
        *s /= kept;
    }

    let rank = singular_values.len();
    if moving_right {
        // A_site = U, A_{site+1} = diag(s) Vt.
        *state.tensor_mut(site) = tensor3_from_left_matrix(&u, al, d1);
        let mut sv = vt;
        for (i, &s) in singular_values.iter().enumerate() {
            for j in 0..sv.ncols() {
                sv[(i, j)] *= s;
            }
        }
        *state.tensor_mut(site + 1) = tensor3_from_right_matrix(&sv, d2, ar);
    } else {
        // A_site = U diag(s), A_{site+1} = Vt.
        let mut us = u;
        for (j, &s) in singular_values.iter().enumerate() {
            for i in 0..us.nrows() {
                us[(i, j)] *= s;
            }
        }
        *state.tensor_mut(site) = tensor3_from_left_matrix(&us, al, d1);
        *state.tensor_mut(site + 1) = tensor3_from_right_matrix(&vt, d2, ar);
    }
    debug_assert_eq!(state.tensor(site).right_dim(), rank);

    if let (Some(sc), Some(charges)) = (sector.as_deref_mut(), new_charges) {
        if moving_right {
            sc.left[site + 1] = charges;
        } else {
            // The right-accumulated charge is the complement of the left one.
            sc.right[site + 1] = charges.iter().map(|&q| sc.target - q).collect();
        }
    }

    Ok(BondUpdate {
        energy,
        truncation_error: discarded_weight,
    })
}

fn validate(mpo: &Mpo, initial: &TensorTrain, schedule: &SweepSchedule) -> Result<()> {
    if initial.len() != mpo.len() {
        return Err(DmrgError::Config {
            parameter: "initial",
            message: format!(
                "state has {} sites but operator has {}",
                initial.len(),
                mpo.len()
            ),
        });
    }
    if initial.len() < 2 {
        return Err(DmrgError::Config {
            parameter: "initial",
            message: "two-site sweeps need at least 2 sites".to_string(),
        });
    }
    if schedule.is_empty() {
        return Err(DmrgError::Config {
            parameter: "schedule",
            message: "schedule has no sweeps".to_string(),
        });
    }
    for (k, sweep) in schedule.sweeps().iter().enumerate() {
        if sweep.max_bond == 0 {
            return Err(DmrgError::Config {
                parameter: "max_bond",
                message: format!("sweep {k} has bond cap 0"),
            });
        }
        if !sweep.cutoff.is_finite() || sweep.cutoff < 0.0 {
            return Err(DmrgError::Config {
                parameter: "cutoff",
                message: format!("sweep {k} has cutoff {}", sweep.cutoff),
            });
        }
    }
    Ok(())
}

/// Run two-site sweeps to minimize `<state| H |state>`.
///
/// The initial state fixes the symmetry sector. When it is sector-pure in
/// total Sz, per-bond charge labels are read off it and enforced through
/// every local solve and split, so the result stays in the same sector even
/// though rounding would otherwise leak weight toward lower-energy sectors.
/// States that mix sectors are optimized without the projection.
///
/// # Errors
///
/// Configuration errors are returned for mismatched lengths, chains
/// shorter than 2 sites, or a degenerate schedule. `NumericalBreakdown`
/// is returned when the local eigensolver or a split loses its footing.
pub fn dmrg(
    mpo: &Mpo,
    initial: &TensorTrain,
    schedule: &SweepSchedule,
    opts: &DmrgOptions,
) -> Result<DmrgResult> {
    validate(mpo, initial, schedule)?;
    let n = initial.len();

    let mut state = initial.clone();
    center_canonicalize(&mut state, 0).map_err(|e| DmrgError::NumericalBreakdown {
        context: format!("canonicalizing the initial state: {e}"),
    })?;

    let lanczos = LanczosOptions {
        max_iter: opts.lanczos_max_iter,
        tol: opts.lanczos_tol,
    };
    let mut sector = SectorCharges::infer(&state);

    // left_envs[i] covers sites [0, i); right_envs[i] covers sites [i, n).
    let mut left_envs: Vec<Tensor3<f64>> = vec![boundary(); n + 1];
    let mut right_envs: Vec<Tensor3<f64>> = vec![boundary(); n + 1];
    for i in (2..n).rev() {
        right_envs[i] = grow_right(&right_envs[i + 1], state.tensor(i), mpo.tensor(i));
    }

    let mut sweep_energies = Vec::with_capacity(schedule.len());
    let mut max_truncation_error = 0.0f64;
    let mut energy = f64::INFINITY;

    for (k, sweep) in schedule.sweeps().iter().enumerate() {
        for site in 0..n - 1 {
            let update = update_bond(
                &mut state,
                mpo,
                &left_envs[site],
                &right_envs[site + 2],
                site,
                sweep,
                &lanczos,
                true,
                sector.as_mut(),
            )?;
            energy = update.energy;
            max_truncation_error = max_truncation_error.max(update.truncation_error);
            left_envs[site + 1] = grow_left(&left_envs[site], state.tensor(site), mpo.tensor(site));
        }
        for site in (0..n - 1).rev() {
            let update = update_bond(
                &mut state,
                mpo,
                &left_envs[site],
                &right_envs[site + 2],
                site,
                sweep,
                &lanczos,
                false,
                sector.as_mut(),
            )?;
            energy = update.energy;
            max_truncation_error = max_truncation_error.max(update.truncation_error);
            right_envs[site + 1] = grow_right(
                &right_envs[site + 2],
                state.tensor(site + 1),
                mpo.tensor(site + 1),
            );
        }

        if opts.verbose {
            eprintln!(
                "sweep {:>3}: energy = {:.12}, max bond = {}, max trunc = {:.3e}",
                k + 1,
                energy,
                state.max_bond_dim(),
                max_truncation_error
            );
        }

        let previous = sweep_energies.last().copied();
        sweep_energies.push(energy);
        if let (Some(tol), Some(prev)) = (opts.energy_tol, previous) {
            if (prev - energy).abs() < tol {
                break;
            }
        }
    }

    Ok(DmrgResult {
        energy,
        state,
        sweep_energies,
        max_truncation_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::heisenberg;
    use crate::lattice::spin_half_chain;
    use crate::state::product_state;
    use nalgebra::SymmetricEigen;

    fn lowest_in_sector(mpo: &Mpo, n: usize, nup: usize) -> f64 {
        // Dense diagonalization restricted to states with nup up spins.
        let h = mpo.to_dense();
        let dim: usize = 1 << n;
        let indices: Vec<usize> = (0..dim)
            .filter(|i| (i.count_ones() as usize) == n - nup)
            .collect();
        let m = indices.len();
        let sub = nalgebra::DMatrix::from_fn(m, m, |a, b| h[(indices[a], indices[b])]);
        let eig = SymmetricEigen::new(sub);
        eig.eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_ground_state_small_chain() {
        let n = 6;
        let sites = spin_half_chain(n).unwrap();
        let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
        let initial = product_state(&sites, n / 2).unwrap();
        let schedule = SweepSchedule::uniform(8, 16, 1e-12);

        let result = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
        let reference = lowest_in_sector(&mpo, n, n / 2);
        assert!(
            (result.energy - reference).abs() < 1e-8,
            "dmrg {} vs dense {}",
            result.energy,
            reference
        );
        assert!((result.state.norm() - 1.0).abs() < 1e-8);
        assert_eq!(result.sweep_energies.len(), 8);
    }

    #[test]
    fn test_sweeps_stay_in_a_magnetized_sector() {
        // Seeded one up spin above half filling; the optimizer must land on
        // that sector's minimum, not the lower-lying half-filled ground
        // state.
        let n = 4;
        let sites = spin_half_chain(n).unwrap();
        let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
        let initial = product_state(&sites, 3).unwrap();
        let schedule = SweepSchedule::uniform(4, 8, 1e-10);

        let result = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
        let magnetized = lowest_in_sector(&mpo, n, 3);
        let ground = lowest_in_sector(&mpo, n, 2);
        assert!(
            (result.energy - magnetized).abs() < 1e-8,
            "energy {} vs sector minimum {}",
            result.energy,
            magnetized
        );
        assert!(result.energy > ground + 0.1);

        let total = crate::observables::total_sz(&result.state).unwrap();
        assert!((total - 1.0).abs() < 1e-8, "total Sz = {total}");
    }

    #[test]
    fn test_energy_is_monotone_over_sweeps() {
        let n = 8;
        let sites = spin_half_chain(n).unwrap();
        let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
        let initial = product_state(&sites, n / 2).unwrap();
        let schedule = SweepSchedule::uniform(6, 24, 1e-12);

        let result = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
        for pair in result.sweep_energies.windows(2) {
            // Small upward wiggle allowed at the truncation floor.
            assert!(pair[1] <= pair[0] + 1e-9, "{:?}", result.sweep_energies);
        }
    }

    #[test]
    fn test_bond_cap_one_keeps_product_state() {
        let n = 4;
        let sites = spin_half_chain(n).unwrap();
        let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
        let initial = product_state(&sites, n / 2).unwrap();
        let schedule = SweepSchedule::uniform(3, 1, 1e-12);

        let result = dmrg(&mpo, &initial, &schedule, &DmrgOptions::default()).unwrap();
        assert_eq!(result.state.max_bond_dim(), 1);
        assert!(result.energy.is_finite());
    }

    #[test]
    fn test_energy_tol_stops_early() {
        let n = 6;
        let sites = spin_half_chain(n).unwrap();
        let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
        let initial = product_state(&sites, n / 2).unwrap();
        let schedule = SweepSchedule::uniform(30, 16, 1e-12);
        let opts = DmrgOptions::default().with_energy_tol(1e-10);

        let result = dmrg(&mpo, &initial, &schedule, &opts).unwrap();
        assert!(result.sweep_energies.len() < 30);
    }

    #[test]
    fn test_ramp_schedule_caps_at_max() {
        let schedule = SweepSchedule::ramp(5, 4, 20, 1e-10);
        let bonds: Vec<usize> = schedule.sweeps().iter().map(|s| s.max_bond).collect();
        assert_eq!(bonds, vec![4, 8, 16, 20, 20]);
    }

    #[test]
    fn test_validation_errors() {
        let sites = spin_half_chain(4).unwrap();
        let mpo = heisenberg(&sites, 1.0).unwrap().to_mpo();
        let initial = product_state(&sites, 2).unwrap();

        let empty = SweepSchedule::uniform(0, 10, 1e-10);
        assert!(matches!(
            dmrg(&mpo, &initial, &empty, &DmrgOptions::default()),
            Err(DmrgError::Config { parameter: "schedule", .. })
        ));

        let zero_bond = SweepSchedule::uniform(2, 0, 1e-10);
        assert!(dmrg(&mpo, &initial, &zero_bond, &DmrgOptions::default()).is_err());

        let wrong_len = product_state(&spin_half_chain(3).unwrap(), 1).unwrap();
        assert!(dmrg(&mpo, &wrong_len, &SweepSchedule::uniform(1, 8, 0.0), &DmrgOptions::default()).is_err());
    }
}
