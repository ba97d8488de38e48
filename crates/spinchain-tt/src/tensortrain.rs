//! Tensor train (matrix product state) type.

use nalgebra::DMatrix;

use crate::error::{Result, TensorTrainError};
use crate::types::Tensor3;

/// Tensor train representation of a vector in a product Hilbert space.
///
/// The represented vector is
///
/// `v[s1, s2, ..., sL] = A1[s1] * A2[s2] * ... * AL[sL]`
///
/// where each `Ak[sk]` is the (left_bond, right_bond) matrix obtained by
/// fixing the physical index of the k-th site tensor. The first tensor has
/// left bond dimension 1 and the last has right bond dimension 1, so the
/// product collapses to a scalar.
#[derive(Debug, Clone)]
pub struct TensorTrain {
    tensors: Vec<Tensor3<f64>>,
}

impl TensorTrain {
    /// Create a new tensor train from a list of site tensors.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, if adjacent bond dimensions do
    /// not match, or if the boundary bond dimensions are not 1.
    pub fn new(tensors: Vec<Tensor3<f64>>) -> Result<Self> {
        if tensors.is_empty() {
            return Err(TensorTrainError::Empty);
        }
        for i in 0..tensors.len() - 1 {
            if tensors[i].right_dim() != tensors[i + 1].left_dim() {
                return Err(TensorTrainError::BondDimensionMismatch {
                    site: i,
                    left_dim: tensors[i].right_dim(),
                    right_dim: tensors[i + 1].left_dim(),
                });
            }
        }
        let first = tensors[0].left_dim();
        if first != 1 {
            return Err(TensorTrainError::InvalidBoundary {
                which: "first",
                dim: first,
            });
        }
        let last = tensors[tensors.len() - 1].right_dim();
        if last != 1 {
            return Err(TensorTrainError::InvalidBoundary {
                which: "last",
                dim: last,
            });
        }
        Ok(Self { tensors })
    }

    /// Number of sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the train has no sites.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Get the tensor at a site.
    ///
    /// # Panics
    ///
    /// Panics if `site >= len()`.
    #[inline]
    pub fn tensor(&self, site: usize) -> &Tensor3<f64> {
        &self.tensors[site]
    }

    /// Get a mutable reference to the tensor at a site.
    #[inline]
    pub fn tensor_mut(&mut self, site: usize) -> &mut Tensor3<f64> {
        &mut self.tensors[site]
    }

    /// All site tensors.
    #[inline]
    pub fn tensors(&self) -> &[Tensor3<f64>] {
        &self.tensors
    }

    /// Physical dimensions, one per site.
    pub fn site_dims(&self) -> Vec<usize> {
        self.tensors.iter().map(|t| t.site_dim()).collect()
    }

    /// Bond dimensions, one per internal bond (length `len() - 1`).
    pub fn bond_dims(&self) -> Vec<usize> {
        (0..self.len().saturating_sub(1))
            .map(|i| self.tensors[i].right_dim())
            .collect()
    }

    /// Largest internal bond dimension.
    pub fn max_bond_dim(&self) -> usize {
        self.bond_dims().into_iter().max().unwrap_or(1)
    }

    /// Evaluate the represented vector at a full index assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of indices does not match the number
    /// of sites or an index exceeds the local dimension.
    pub fn evaluate(&self, indices: &[usize]) -> Result<f64> {
        if indices.len() != self.len() {
            return Err(TensorTrainError::InvalidOperation {
                message: format!(
                    "evaluate expects {} indices, got {}",
                    self.len(),
                    indices.len()
                ),
            });
        }
        // Row vector carried through the chain.
        let mut v = vec![1.0f64];
        for (site, (&s, tensor)) in indices.iter().zip(self.tensors.iter()).enumerate() {
            if s >= tensor.site_dim() {
                return Err(TensorTrainError::InvalidOperation {
                    message: format!(
                        "index {} at site {} exceeds local dimension {}",
                        s,
                        site,
                        tensor.site_dim()
                    ),
                });
            }
            let mut next = vec![0.0f64; tensor.right_dim()];
            for (l, &vl) in v.iter().enumerate() {
                if vl == 0.0 {
                    continue;
                }
                for (r, slot) in next.iter_mut().enumerate() {
                    *slot += vl * tensor[[l, s, r]];
                }
            }
            v = next;
        }
        Ok(v[0])
    }

    /// Inner product `<self | other>`.
    ///
    /// Both trains must have the same length and site dimensions.
    pub fn inner(&self, other: &TensorTrain) -> Result<f64> {
        if self.len() != other.len() {
            return Err(TensorTrainError::InvalidOperation {
                message: format!(
                    "inner product requires equal lengths ({} vs {})",
                    self.len(),
                    other.len()
                ),
            });
        }
        // Transfer matrix E(a', a): a' runs over self's bond, a over other's.
        let mut env = DMatrix::<f64>::from_element(1, 1, 1.0);
        for (site, (a, b)) in self.tensors.iter().zip(other.tensors.iter()).enumerate() {
            if a.site_dim() != b.site_dim() {
                return Err(TensorTrainError::InvalidOperation {
                    message: format!(
                        "site dimension mismatch at site {} ({} vs {})",
                        site,
                        a.site_dim(),
                        b.site_dim()
                    ),
                });
            }
            let mut next = DMatrix::<f64>::zeros(a.right_dim(), b.right_dim());
            for al in 0..a.left_dim() {
                for bl in 0..b.left_dim() {
                    let e = env[(al, bl)];
                    if e == 0.0 {
                        continue;
                    }
                    for s in 0..a.site_dim() {
                        for ar in 0..a.right_dim() {
                            let av = a[[al, s, ar]];
                            if av == 0.0 {
                                continue;
                            }
                            for br in 0..b.right_dim() {
                                next[(ar, br)] += e * av * b[[bl, s, br]];
                            }
                        }
                    }
                }
            }
            env = next;
        }
        Ok(env[(0, 0)])
    }

    /// Squared 2-norm of the represented vector.
    pub fn norm_squared(&self) -> f64 {
        // inner() cannot fail against self.
        self.inner(self).unwrap_or(f64::NAN)
    }

    /// 2-norm of the represented vector.
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }
}
