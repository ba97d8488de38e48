//! Run configuration and the end-to-end driver.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{DmrgError, Result};
use crate::excited::find_excited;
use crate::hamiltonian::heisenberg;
use crate::lattice::spin_half_chain;
use crate::observables::{symmetry_residual, sz_profile};
use crate::state::{product_state, random_product_state};
use crate::sweep::{dmrg, DmrgOptions, SweepSchedule};

/// Parameters for a full ground-plus-excited run on a Heisenberg chain.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Chain length.
    pub n: usize,
    /// Exchange coupling.
    pub j: f64,
    /// Maximum bond dimension.
    pub max_bond: usize,
    /// Number of sweeps per optimization.
    pub n_sweeps: usize,
    /// Truncation cutoff per split.
    pub cutoff: f64,
    /// Number of restart trials for the excited sector.
    pub trials: usize,
    /// Base RNG seed for the restart trials.
    pub seed: u64,
    /// Print per-sweep progress to stderr.
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n: 10,
            j: 1.0,
            max_bond: 100,
            n_sweeps: 20,
            cutoff: 1e-10,
            trials: 100,
            seed: 0,
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Set the chain length.
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Set the exchange coupling.
    pub fn with_j(mut self, j: f64) -> Self {
        self.j = j;
        self
    }

    /// Set the maximum bond dimension.
    pub fn with_max_bond(mut self, max_bond: usize) -> Self {
        self.max_bond = max_bond;
        self
    }

    /// Set the number of sweeps.
    pub fn with_n_sweeps(mut self, n_sweeps: usize) -> Self {
        self.n_sweeps = n_sweeps;
        self
    }

    /// Set the truncation cutoff.
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Set the number of restart trials.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Set the base RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable per-sweep progress output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check all parameters, naming the first offending one.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.n < 2 {
            return Err(DmrgError::Config {
                parameter: "n",
                message: format!("chain length must be at least 2, got {}", self.n),
            });
        }
        if !self.j.is_finite() {
            return Err(DmrgError::Config {
                parameter: "j",
                message: format!("coupling must be finite, got {}", self.j),
            });
        }
        if self.max_bond == 0 {
            return Err(DmrgError::Config {
                parameter: "max_bond",
                message: "bond dimension cap must be positive".to_string(),
            });
        }
        if self.n_sweeps == 0 {
            return Err(DmrgError::Config {
                parameter: "n_sweeps",
                message: "at least one sweep is required".to_string(),
            });
        }
        if !self.cutoff.is_finite() || self.cutoff < 0.0 {
            return Err(DmrgError::Config {
                parameter: "cutoff",
                message: format!("cutoff must be finite and non-negative, got {}", self.cutoff),
            });
        }
        if self.trials == 0 {
            return Err(DmrgError::Config {
                parameter: "trials",
                message: "at least one restart trial is required".to_string(),
            });
        }
        Ok(())
    }

    /// Run the full pipeline: build the Hamiltonian, optimize the ground
    /// state at half filling, search the `n/2 + 1` sector by random
    /// restarts, and collect magnetization profiles.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors, sweep breakdowns on the ground
    /// state, and `AllTrialsFailed` from the excited search.
    pub fn run(&self) -> Result<RunSummary> {
        self.validate()?;

        let sites = spin_half_chain(self.n)?;
        let mpo = heisenberg(&sites, self.j)?.to_mpo();

        // Cheap self-adjointness check on the assembled operator.
        let bra = product_state(&sites, self.n / 2)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let ket = random_product_state(&sites, self.n / 2, &mut rng)?;
        let residual = symmetry_residual(&mpo, &bra, &ket)?;
        if residual > 1e-10 {
            eprintln!("warning: Hamiltonian asymmetry residual {residual:.3e}");
        }

        let schedule = SweepSchedule::uniform(self.n_sweeps, self.max_bond, self.cutoff);
        let opts = DmrgOptions::default().with_verbose(self.verbose);

        let ground = dmrg(&mpo, &bra, &schedule, &opts)?;
        let excited = find_excited(&mpo, &sites, &schedule, &opts, self.trials, self.seed)?;

        let ground_profile = sz_profile(&ground.state)?;
        let excited_profile = sz_profile(&excited.state)?;

        Ok(RunSummary {
            ground_energy: ground.energy,
            excited_energy: excited.energy,
            gap: excited.energy - ground.energy,
            sweep_energies: ground.sweep_energies,
            max_truncation_error: ground.max_truncation_error,
            winning_trial: excited.trial,
            ground_profile,
            excited_profile,
        })
    }
}

/// Aggregate results of a full run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Ground state energy at half filling.
    pub ground_energy: f64,
    /// Lowest energy in the `n/2 + 1` sector.
    pub excited_energy: f64,
    /// Magnetization gap `excited - ground`.
    pub gap: f64,
    /// Ground state energy after each sweep.
    pub sweep_energies: Vec<f64>,
    /// Largest truncation error seen while optimizing the ground state.
    pub max_truncation_error: f64,
    /// Index of the winning restart trial.
    pub winning_trial: usize,
    /// Per-site `<Sz>` of the ground state.
    pub ground_profile: Vec<f64>,
    /// Per-site `<Sz>` of the excited state.
    pub excited_profile: Vec<f64>,
}
