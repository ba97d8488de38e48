//! Operator sums and their matrix product operator form.
//!
//! Hamiltonians are assembled as sums of single-site and nearest-neighbor
//! terms, then compiled into an MPO with a finite-state-machine layout: bond
//! state 0 means "no term started yet", the last bond state means "a term
//! has been completed", and one intermediate state per pair-term channel
//! carries a half-finished term across the bond.

use nalgebra::DMatrix;
use spinchain_tt::Tensor4;

use crate::error::{DmrgError, Result};
use crate::lattice::Site;
use crate::ops::SpinOp;

/// A single-site term `coeff * op_{site}`.
#[derive(Debug, Clone, Copy)]
pub struct Term {
    /// Scalar coefficient.
    pub coeff: f64,
    /// Site the operator acts on.
    pub site: usize,
    /// The local operator.
    pub op: SpinOp,
}

/// A nearest-neighbor term `coeff * opA_{site} * opB_{site+1}`.
#[derive(Debug, Clone, Copy)]
pub struct PairTerm {
    /// Scalar coefficient, attached to the left factor.
    pub coeff: f64,
    /// Left site; the term acts on `site` and `site + 1`.
    pub site: usize,
    /// Operator on the left site.
    pub op_a: SpinOp,
    /// Operator on the right site.
    pub op_b: SpinOp,
}

/// A sum of local terms over a fixed lattice.
#[derive(Debug, Clone)]
pub struct OpSum {
    sites: Vec<Site>,
    terms: Vec<Term>,
    pair_terms: Vec<PairTerm>,
}

impl OpSum {
    /// Create an empty operator sum over the given lattice.
    pub fn new(sites: &[Site]) -> Self {
        Self {
            sites: sites.to_vec(),
            terms: Vec::new(),
            pair_terms: Vec::new(),
        }
    }

    /// Add a single-site term `coeff * op_{site}`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `site` is outside the lattice.
    pub fn add(&mut self, coeff: f64, site: usize, op: SpinOp) -> Result<()> {
        if site >= self.sites.len() {
            return Err(DmrgError::Config {
                parameter: "site",
                message: format!("site {site} outside chain of {} sites", self.sites.len()),
            });
        }
        self.terms.push(Term { coeff, site, op });
        Ok(())
    }

    /// Add a nearest-neighbor term `coeff * opA_{site} * opB_{site+1}`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bond `(site, site + 1)` is
    /// outside the lattice.
    pub fn add_pair(&mut self, coeff: f64, site: usize, op_a: SpinOp, op_b: SpinOp) -> Result<()> {
        if site + 1 >= self.sites.len() {
            return Err(DmrgError::Config {
                parameter: "site",
                message: format!(
                    "bond ({site}, {}) outside chain of {} sites",
                    site + 1,
                    self.sites.len()
                ),
            });
        }
        self.pair_terms.push(PairTerm {
            coeff,
            site,
            op_a,
            op_b,
        });
        Ok(())
    }

    /// Number of lattice sites.
    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    /// Compile the sum into a matrix product operator.
    ///
    /// The MPO bond dimension is `2 + c` where `c` is the number of distinct
    /// `(opA, opB)` channels among the pair terms.
    pub fn to_mpo(&self) -> Mpo {
        let n = self.sites.len();

        // Distinct pair channels, in first-seen order.
        let mut channels: Vec<(SpinOp, SpinOp)> = Vec::new();
        for t in &self.pair_terms {
            if !channels.contains(&(t.op_a, t.op_b)) {
                channels.push((t.op_a, t.op_b));
            }
        }
        let bond = 2 + channels.len();
        let done = bond - 1;

        let mut tensors = Vec::with_capacity(n);
        for (k, site) in self.sites.iter().enumerate() {
            let d = site.dim;
            let wl = if k == 0 { 1 } else { bond };
            let wr = if k == n - 1 { 1 } else { bond };
            let mut w = Tensor4::zeros(wl, d, d, wr);

            // Map full FSM rows/columns onto the (possibly trimmed) boundary
            // bonds: site 0 exposes only the initial row, site n-1 only the
            // done column.
            let row = |state: usize| -> Option<usize> {
                if k == 0 {
                    (state == 0).then_some(0)
                } else {
                    Some(state)
                }
            };
            let col = |state: usize| -> Option<usize> {
                if k == n - 1 {
                    (state == done).then_some(0)
                } else {
                    Some(state)
                }
            };

            let mut put = |from: usize, to: usize, mat: &DMatrix<f64>, scale: f64| {
                if let (Some(r), Some(c)) = (row(from), col(to)) {
                    for a in 0..d {
                        for b in 0..d {
                            w[[r, a, b, c]] += scale * mat[(a, b)];
                        }
                    }
                }
            };

            let id = SpinOp::Id.matrix();
            put(0, 0, &id, 1.0);
            put(done, done, &id, 1.0);

            for t in self.terms.iter().filter(|t| t.site == k) {
                put(0, done, &t.op.matrix(), t.coeff);
            }
            for t in self.pair_terms.iter().filter(|t| t.site == k) {
                let c = channels
                    .iter()
                    .position(|&ch| ch == (t.op_a, t.op_b))
                    .unwrap_or(0);
                put(0, 1 + c, &t.op_a.matrix(), t.coeff);
            }
            for (c, &(_, op_b)) in channels.iter().enumerate() {
                // Channel completion does not depend on which bond started it.
                if k > 0 {
                    put(1 + c, done, &op_b.matrix(), 1.0);
                }
            }

            tensors.push(w);
        }
        Mpo { tensors }
    }
}

/// Antiferromagnetic Heisenberg Hamiltonian on an open chain,
///
/// `H = sum_i (J/2)(S+_i S-_{i+1} + S-_i S+_{i+1}) + J Sz_i Sz_{i+1}`.
///
/// # Errors
///
/// Returns a configuration error for lattices with fewer than two sites.
pub fn heisenberg(sites: &[Site], j: f64) -> Result<OpSum> {
    if sites.len() < 2 {
        return Err(DmrgError::Config {
            parameter: "sites",
            message: format!("Heisenberg chain needs at least 2 sites, got {}", sites.len()),
        });
    }
    let mut sum = OpSum::new(sites);
    for i in 0..sites.len() - 1 {
        sum.add_pair(0.5 * j, i, SpinOp::Sp, SpinOp::Sm)?;
        sum.add_pair(0.5 * j, i, SpinOp::Sm, SpinOp::Sp)?;
        sum.add_pair(j, i, SpinOp::Sz, SpinOp::Sz)?;
    }
    Ok(sum)
}

/// Matrix product operator over a chain.
#[derive(Debug, Clone)]
pub struct Mpo {
    tensors: Vec<Tensor4<f64>>,
}

impl Mpo {
    /// Number of sites.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the MPO has no sites.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Site tensor at position `site`, legs (left, bra, ket, right).
    pub fn tensor(&self, site: usize) -> &Tensor4<f64> {
        &self.tensors[site]
    }

    /// All site tensors.
    pub fn tensors(&self) -> &[Tensor4<f64>] {
        &self.tensors
    }

    /// Internal bond dimensions, one per bond.
    pub fn bond_dims(&self) -> Vec<usize> {
        (0..self.tensors.len().saturating_sub(1))
            .map(|i| self.tensors[i].right_dim())
            .collect()
    }

    /// Contract the MPO into a dense matrix. Exponential in the chain
    /// length; intended for cross-checks on short chains.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let first = &self.tensors[0];
        let mut blocks: Vec<DMatrix<f64>> = (0..first.right_dim())
            .map(|w| {
                DMatrix::from_fn(first.row_dim(), first.col_dim(), |a, b| first[[0, a, b, w]])
            })
            .collect();
        for t in &self.tensors[1..] {
            let mut next: Vec<DMatrix<f64>> = Vec::with_capacity(t.right_dim());
            for wr in 0..t.right_dim() {
                let dim = blocks[0].nrows() * t.row_dim();
                let mut acc = DMatrix::zeros(dim, dim);
                for (wl, block) in blocks.iter().enumerate() {
                    let local =
                        DMatrix::from_fn(t.row_dim(), t.col_dim(), |a, b| t[[wl, a, b, wr]]);
                    acc += block.kronecker(&local);
                }
                next.push(acc);
            }
            blocks = next;
        }
        blocks.swap_remove(0)
    }
}
