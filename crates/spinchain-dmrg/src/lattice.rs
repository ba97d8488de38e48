//! One-dimensional lattice description.

use crate::error::{DmrgError, Result};

/// A single lattice site with its local Hilbert space dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    /// Position along the chain, 0-based.
    pub id: usize,
    /// Local Hilbert space dimension.
    pub dim: usize,
}

/// Build an open spin-1/2 chain of `n` sites.
///
/// Basis convention per site: index 0 is spin up, index 1 is spin down.
///
/// # Errors
///
/// Returns a configuration error for chains shorter than two sites; the
/// two-site update needs at least one bond.
pub fn spin_half_chain(n: usize) -> Result<Vec<Site>> {
    if n < 2 {
        return Err(DmrgError::Config {
            parameter: "n",
            message: format!("chain length must be at least 2, got {n}"),
        });
    }
    Ok((0..n).map(|id| Site { id, dim: 2 }).collect())
}
