//! Two-site DMRG for spin-1/2 chains.
//!
//! The crate builds nearest-neighbor Hamiltonians as matrix product
//! operators, optimizes tensor train states by two-site variational
//! sweeps, and searches magnetized sectors by seeded random restarts.
//!
//! A typical run goes through [`RunConfig`]:
//!
//! ```no_run
//! use spinchain_dmrg::RunConfig;
//!
//! let summary = RunConfig::default().with_n(10).run()?;
//! println!("gap = {:.6}", summary.gap);
//! # Ok::<(), spinchain_dmrg::DmrgError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod environment;
pub mod error;
pub mod excited;
pub mod hamiltonian;
pub mod lanczos;
pub mod lattice;
pub mod observables;
pub mod ops;
pub mod state;
pub mod sweep;

pub use config::{RunConfig, RunSummary};
pub use environment::expectation_value;
pub use error::{DmrgError, Result};
pub use excited::{find_excited, ExcitedResult};
pub use hamiltonian::{heisenberg, Mpo, OpSum, PairTerm, Term};
pub use lanczos::{lowest_eigenpair, LanczosOptions};
pub use lattice::{spin_half_chain, Site};
pub use observables::{
    local_expectation, matrix_element, symmetry_residual, sz_profile, total_sz,
};
pub use ops::SpinOp;
pub use state::{product_state, random_product_state};
pub use sweep::{dmrg, DmrgOptions, DmrgResult, Sweep, SweepSchedule};
