//! Error types for the DMRG driver.

use thiserror::Error;

/// Result type for DMRG operations.
pub type Result<T> = std::result::Result<T, DmrgError>;

/// Errors that can occur while building operators or running sweeps.
#[derive(Debug, Error)]
pub enum DmrgError {
    /// A configuration parameter is invalid.
    #[error("Invalid configuration: {parameter}: {message}")]
    Config {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Description of the constraint that was violated.
        message: String,
    },

    /// The iterative eigensolver or a factorization lost numerical footing.
    ///
    /// Distinct from configuration errors so that restart-based searches can
    /// absorb it and move on to the next trial.
    #[error("Numerical breakdown: {context}")]
    NumericalBreakdown {
        /// Where the breakdown occurred.
        context: String,
    },

    /// Every restart trial of an excited-state search failed.
    #[error("All {trials} restart trials failed")]
    AllTrialsFailed {
        /// Number of trials attempted.
        trials: usize,
    },

    /// Error from the tensor train layer.
    #[error(transparent)]
    TensorTrain(#[from] spinchain_tt::TensorTrainError),
}
