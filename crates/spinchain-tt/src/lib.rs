//! Tensor train (matrix product state) core.
//!
//! This crate provides the dense tensor containers, the validated
//! [`TensorTrain`] type, exact canonical-form moves, and the truncated SVD
//! split used by higher-level variational algorithms.

#![warn(missing_docs)]

pub mod canonical;
pub mod decomposition;
pub mod error;
pub mod tensortrain;
pub mod types;

pub use canonical::{center_canonicalize, move_center_left, move_center_right};
pub use decomposition::{
    svd_split, tensor3_from_left_matrix, tensor3_from_right_matrix, tensor3_to_left_matrix,
    tensor3_to_right_matrix, SvdSplit, TruncateSpec,
};
pub use error::{Result, TensorTrainError};
pub use tensortrain::TensorTrain;
pub use types::{Tensor3, Tensor4};
