//! Core tensor containers for tensor train operations.

use std::ops::{Index, IndexMut};

/// A dense 3-leg tensor backed by a flat `Vec`.
///
/// Shape is (left_dim, site_dim, right_dim), row-major. For state (MPS)
/// tensors the legs are (left bond, physical, right bond); environment
/// tensors reuse the same container with legs (bra bond, operator bond,
/// ket bond).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3<T> {
    data: Vec<T>,
    dims: [usize; 3],
}

impl<T: Clone + Default> Tensor3<T> {
    /// Create a zero-filled tensor with the given dimensions.
    pub fn zeros(left_dim: usize, site_dim: usize, right_dim: usize) -> Self {
        Self {
            data: vec![T::default(); left_dim * site_dim * right_dim],
            dims: [left_dim, site_dim, right_dim],
        }
    }

    /// Create a tensor from flat data in row-major (left, site, right) order.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != left_dim * site_dim * right_dim`.
    pub fn from_data(data: Vec<T>, left_dim: usize, site_dim: usize, right_dim: usize) -> Self {
        assert_eq!(data.len(), left_dim * site_dim * right_dim);
        Self {
            data,
            dims: [left_dim, site_dim, right_dim],
        }
    }
}

impl<T> Tensor3<T> {
    /// Get the left (bond) dimension.
    #[inline]
    pub fn left_dim(&self) -> usize {
        self.dims[0]
    }

    /// Get the site (physical) dimension.
    #[inline]
    pub fn site_dim(&self) -> usize {
        self.dims[1]
    }

    /// Get the right (bond) dimension.
    #[inline]
    pub fn right_dim(&self) -> usize {
        self.dims[2]
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat view of the underlying data, row-major (left, site, right).
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T> Index<[usize; 3]> for Tensor3<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: [usize; 3]) -> &T {
        &self.data[(idx[0] * self.dims[1] + idx[1]) * self.dims[2] + idx[2]]
    }
}

impl<T> IndexMut<[usize; 3]> for Tensor3<T> {
    #[inline]
    fn index_mut(&mut self, idx: [usize; 3]) -> &mut T {
        &mut self.data[(idx[0] * self.dims[1] + idx[1]) * self.dims[2] + idx[2]]
    }
}

/// A dense 4-leg tensor backed by a flat `Vec`.
///
/// Shape is (left_dim, row_dim, col_dim, right_dim), row-major. Used for
/// operator (MPO) site tensors, where `row_dim`/`col_dim` are the outgoing
/// (bra) and incoming (ket) physical legs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor4<T> {
    data: Vec<T>,
    dims: [usize; 4],
}

impl<T: Clone + Default> Tensor4<T> {
    /// Create a zero-filled tensor with the given dimensions.
    pub fn zeros(left_dim: usize, row_dim: usize, col_dim: usize, right_dim: usize) -> Self {
        Self {
            data: vec![T::default(); left_dim * row_dim * col_dim * right_dim],
            dims: [left_dim, row_dim, col_dim, right_dim],
        }
    }
}

impl<T> Tensor4<T> {
    /// Get the left (bond) dimension.
    #[inline]
    pub fn left_dim(&self) -> usize {
        self.dims[0]
    }

    /// Get the outgoing (bra) physical dimension.
    #[inline]
    pub fn row_dim(&self) -> usize {
        self.dims[1]
    }

    /// Get the incoming (ket) physical dimension.
    #[inline]
    pub fn col_dim(&self) -> usize {
        self.dims[2]
    }

    /// Get the right (bond) dimension.
    #[inline]
    pub fn right_dim(&self) -> usize {
        self.dims[3]
    }
}

impl<T> Index<[usize; 4]> for Tensor4<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: [usize; 4]) -> &T {
        &self.data
            [((idx[0] * self.dims[1] + idx[1]) * self.dims[2] + idx[2]) * self.dims[3] + idx[3]]
    }
}

impl<T> IndexMut<[usize; 4]> for Tensor4<T> {
    #[inline]
    fn index_mut(&mut self, idx: [usize; 4]) -> &mut T {
        &mut self.data
            [((idx[0] * self.dims[1] + idx[1]) * self.dims[2] + idx[2]) * self.dims[3] + idx[3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor3_zeros() {
        let t: Tensor3<f64> = Tensor3::zeros(2, 3, 4);
        assert_eq!(t.left_dim(), 2);
        assert_eq!(t.site_dim(), 3);
        assert_eq!(t.right_dim(), 4);
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_tensor3_from_data_layout() {
        let data: Vec<f64> = (0..24).map(|x| x as f64).collect();
        let t = Tensor3::from_data(data, 2, 3, 4);

        assert_eq!(t[[0, 0, 0]], 0.0);
        assert_eq!(t[[0, 0, 1]], 1.0);
        assert_eq!(t[[0, 1, 0]], 4.0);
        assert_eq!(t[[1, 0, 0]], 12.0);
        assert_eq!(t[[1, 2, 3]], 23.0);
    }

    #[test]
    fn test_tensor3_index_mut() {
        let mut t: Tensor3<f64> = Tensor3::zeros(2, 3, 4);
        t[[1, 2, 3]] = 42.0;
        assert_eq!(t[[1, 2, 3]], 42.0);
        assert_eq!(t[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_tensor4_layout() {
        let mut w: Tensor4<f64> = Tensor4::zeros(5, 2, 2, 5);
        assert_eq!(w.left_dim(), 5);
        assert_eq!(w.row_dim(), 2);
        assert_eq!(w.col_dim(), 2);
        assert_eq!(w.right_dim(), 5);

        w[[4, 1, 0, 2]] = -1.5;
        assert_eq!(w[[4, 1, 0, 2]], -1.5);
        assert_eq!(w[[4, 0, 1, 2]], 0.0);
    }
}
