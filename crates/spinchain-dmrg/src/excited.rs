//! Random-restart search in a magnetized sector.
//!
//! The lowest state with one extra up spin is found by running independent
//! sweeps from many random product states of that sector and keeping the
//! best outcome. Trials are embarrassingly parallel; the reduction is
//! sequential and deterministic so a fixed seed always reproduces the same
//! answer.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use spinchain_tt::TensorTrain;

use crate::error::{DmrgError, Result};
use crate::hamiltonian::Mpo;
use crate::lattice::Site;
use crate::state::random_product_state;
use crate::sweep::{dmrg, DmrgOptions, SweepSchedule};

/// Outcome of a restart search.
#[derive(Debug, Clone)]
pub struct ExcitedResult {
    /// Lowest energy found across all successful trials.
    pub energy: f64,
    /// The state realizing that energy.
    pub state: TensorTrain,
    /// Index of the winning trial.
    pub trial: usize,
    /// Energy per trial; `None` for trials that broke down.
    pub trial_energies: Vec<Option<f64>>,
}

/// Find the lowest state with `n/2 + 1` up spins by random restarts.
///
/// Trial `t` seeds its RNG with `seed + t`, so results are reproducible
/// and independent of how trials are scheduled across threads. Trials
/// that hit a numerical breakdown are dropped; the search only fails if
/// every trial does.
///
/// # Errors
///
/// Configuration errors from any trial propagate immediately (they are
/// deterministic and would fail every trial). Returns `AllTrialsFailed`
/// if no trial produced a result.
pub fn find_excited(
    mpo: &Mpo,
    sites: &[Site],
    schedule: &SweepSchedule,
    opts: &DmrgOptions,
    trials: usize,
    seed: u64,
) -> Result<ExcitedResult> {
    if trials == 0 {
        return Err(DmrgError::Config {
            parameter: "trials",
            message: "restart search needs at least one trial".to_string(),
        });
    }
    let nup = sites.len() / 2 + 1;

    let outcomes: Vec<Result<(f64, TensorTrain)>> = (0..trials)
        .into_par_iter()
        .map(|t| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
            let initial = random_product_state(sites, nup, &mut rng)?;
            let result = dmrg(mpo, &initial, schedule, opts)?;
            Ok((result.energy, result.state))
        })
        .collect();

    let mut trial_energies = Vec::with_capacity(trials);
    let mut best: Option<(usize, f64, TensorTrain)> = None;
    for (t, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok((energy, state)) => {
                trial_energies.push(Some(energy));
                // Strictly lower wins, so ties go to the earliest trial.
                let better = best.as_ref().map_or(true, |(_, e, _)| energy < *e);
                if better {
                    best = Some((t, energy, state));
                }
            }
            Err(err @ DmrgError::Config { .. }) => return Err(err),
            Err(_) => trial_energies.push(None),
        }
    }

    match best {
        Some((trial, energy, state)) => Ok(ExcitedResult {
            energy,
            state,
            trial,
            trial_energies,
        }),
        None => Err(DmrgError::AllTrialsFailed { trials }),
    }
}
