//! Initial states in a fixed total-Sz sector.

use rand::seq::SliceRandom;
use rand::Rng;
use spinchain_tt::{Tensor3, TensorTrain};

use crate::error::{DmrgError, Result};
use crate::lattice::Site;

fn check_sector(sites: &[Site], nup: usize) -> Result<()> {
    if sites.is_empty() {
        return Err(DmrgError::Config {
            parameter: "sites",
            message: "lattice is empty".to_string(),
        });
    }
    if nup > sites.len() {
        return Err(DmrgError::Config {
            parameter: "nup",
            message: format!("{nup} up spins do not fit on {} sites", sites.len()),
        });
    }
    if sites.iter().any(|s| s.dim != 2) {
        return Err(DmrgError::Config {
            parameter: "sites",
            message: "sector initializers require spin-1/2 sites".to_string(),
        });
    }
    Ok(())
}

fn from_spins(spins: &[usize]) -> Result<TensorTrain> {
    let tensors = spins
        .iter()
        .map(|&s| {
            let mut t = Tensor3::zeros(1, 2, 1);
            t[[0, s, 0]] = 1.0;
            t
        })
        .collect();
    Ok(TensorTrain::new(tensors)?)
}

/// Product state with the first `nup` sites up and the rest down.
///
/// The result is normalized and lies exactly in the total-Sz sector
/// `(nup - (n - nup)) / 2`.
///
/// # Errors
///
/// Returns a configuration error if the lattice is empty, a site is not
/// spin-1/2, or `nup` exceeds the chain length.
pub fn product_state(sites: &[Site], nup: usize) -> Result<TensorTrain> {
    check_sector(sites, nup)?;
    let spins: Vec<usize> = (0..sites.len()).map(|i| usize::from(i >= nup)).collect();
    from_spins(&spins)
}

/// Product state with `nup` up spins at uniformly random positions.
///
/// Same sector guarantees as [`product_state`]; the arrangement is drawn
/// from the caller's RNG so searches can be reproduced from a seed.
///
/// # Errors
///
/// Same conditions as [`product_state`].
pub fn random_product_state<R: Rng + ?Sized>(
    sites: &[Site],
    nup: usize,
    rng: &mut R,
) -> Result<TensorTrain> {
    check_sector(sites, nup)?;
    let mut spins: Vec<usize> = (0..sites.len()).map(|i| usize::from(i >= nup)).collect();
    spins.shuffle(rng);
    from_spins(&spins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::spin_half_chain;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn total_sz(state: &TensorTrain) -> f64 {
        // Product states have bond dimension 1, so read each site directly.
        state
            .tensors()
            .iter()
            .map(|t| {
                let up = t[[0, 0, 0]];
                let down = t[[0, 1, 0]];
                0.5 * up * up - 0.5 * down * down
            })
            .sum()
    }

    #[test]
    fn test_product_state_sector() {
        let sites = spin_half_chain(6).unwrap();
        for nup in 0..=6 {
            let state = product_state(&sites, nup).unwrap();
            let expected = 0.5 * (nup as f64) - 0.5 * ((6 - nup) as f64);
            assert!((total_sz(&state) - expected).abs() < 1e-12, "nup = {nup}");
            assert!((state.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_random_product_state_sector_and_determinism() {
        let sites = spin_half_chain(8).unwrap();
        for seed in 0..5u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let state = random_product_state(&sites, 5, &mut rng).unwrap();
            assert!((total_sz(&state) - 1.0).abs() < 1e-12);

            let mut rng2 = ChaCha8Rng::seed_from_u64(seed);
            let again = random_product_state(&sites, 5, &mut rng2).unwrap();
            for (a, b) in state.tensors().iter().zip(again.tensors().iter()) {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_random_product_state_varies_with_seed() {
        let sites = spin_half_chain(10).unwrap();
        let mut seen = std::collections::HashSet::new();
        for seed in 0..20u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let state = random_product_state(&sites, 5, &mut rng).unwrap();
            let pattern: Vec<bool> = state
                .tensors()
                .iter()
                .map(|t| t[[0, 0, 0]] != 0.0)
                .collect();
            seen.insert(pattern);
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_rejects_bad_sector() {
        let sites = spin_half_chain(4).unwrap();
        assert!(product_state(&sites, 5).is_err());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(random_product_state(&sites, 5, &mut rng).is_err());
    }
}
