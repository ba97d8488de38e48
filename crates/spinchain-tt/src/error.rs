//! Error types for tensor train operations.

use thiserror::Error;

/// Result type for tensor train operations.
pub type Result<T> = std::result::Result<T, TensorTrainError>;

/// Errors that can occur in tensor train operations.
#[derive(Debug, Error)]
pub enum TensorTrainError {
    /// Tensor train is empty (has no tensors).
    #[error("Tensor train is empty")]
    Empty,

    /// Site index is out of bounds.
    #[error("Site index {site} is out of bounds (tensor train has {length} sites)")]
    SiteOutOfBounds {
        /// The offending site index.
        site: usize,
        /// Number of sites in the train.
        length: usize,
    },

    /// Bond dimension mismatch between adjacent tensors.
    #[error("Bond dimension mismatch at site {site}: left tensor has right dim {left_dim}, right tensor has left dim {right_dim}")]
    BondDimensionMismatch {
        /// Site index of the left tensor of the offending bond.
        site: usize,
        /// Right dimension of the left tensor.
        left_dim: usize,
        /// Left dimension of the right tensor.
        right_dim: usize,
    },

    /// Boundary tensors must have outer bond dimension 1.
    #[error("Invalid boundary: {which} tensor has outer bond dimension {dim} (must be 1)")]
    InvalidBoundary {
        /// Which boundary ("first" or "last").
        which: &'static str,
        /// The offending outer bond dimension.
        dim: usize,
    },

    /// A matrix factorization did not produce the requested factors.
    #[error("Factorization failed: {message}")]
    FactorizationFailed {
        /// Description of the failure.
        message: String,
    },

    /// General invalid operation.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the invalid operation.
        message: String,
    },
}
