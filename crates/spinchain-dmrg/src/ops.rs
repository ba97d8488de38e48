//! Local spin-1/2 operators.

use nalgebra::DMatrix;

/// Single-site spin-1/2 operators in the (up, down) basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinOp {
    /// Identity.
    Id,
    /// z-component, diag(1/2, -1/2).
    Sz,
    /// Raising operator `S+`.
    Sp,
    /// Lowering operator `S-`.
    Sm,
}

impl SpinOp {
    /// Dense 2x2 matrix of the operator.
    pub fn matrix(self) -> DMatrix<f64> {
        match self {
            SpinOp::Id => DMatrix::identity(2, 2),
            SpinOp::Sz => DMatrix::from_row_slice(2, 2, &[0.5, 0.0, 0.0, -0.5]),
            SpinOp::Sp => DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]),
            SpinOp::Sm => DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commutator_sz_sp() {
        // [Sz, S+] = S+
        let sz = SpinOp::Sz.matrix();
        let sp = SpinOp::Sp.matrix();
        let comm = &sz * &sp - &sp * &sz;
        assert!((comm - sp).norm() < 1e-15);
    }

    #[test]
    fn test_sp_sm_ladder() {
        // S+ S- = diag(1, 0), S- S+ = diag(0, 1)
        let sp = SpinOp::Sp.matrix();
        let sm = SpinOp::Sm.matrix();
        let up = &sp * &sm;
        assert!((up - DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0])).norm() < 1e-15);
        let down = &sm * &sp;
        assert!((down - DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 0.0, 1.0])).norm() < 1e-15);
    }

    #[test]
    fn test_casimir() {
        // S^2 = (S+S- + S-S+)/2 + Sz^2 = s(s+1) Id with s = 1/2.
        let sz = SpinOp::Sz.matrix();
        let sp = SpinOp::Sp.matrix();
        let sm = SpinOp::Sm.matrix();
        let casimir = (&sp * &sm + &sm * &sp) * 0.5 + &sz * &sz;
        assert!((casimir - DMatrix::identity(2, 2) * 0.75).norm() < 1e-15);
    }
}
