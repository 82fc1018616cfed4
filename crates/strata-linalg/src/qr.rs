//! QR decomposition by Householder reflections.

use strata_tensor::{expr::Transpose, Tensor, TensorLike};

use crate::{error::LinalgError, ortho::OrthoHelper, scalar::Real};

/// The decomposition `A = Q R` of a matrix of any shape.
///
/// `Q` is square and orthogonal with the row count of `A`; `R` has the shape of `A` and
/// is upper triangular.
///
/// # Example
///
/// ```rust
/// use strata_linalg::qr::DecompQR;
/// use strata_tensor::{product::matmul, Tensor, TensorLike};
///
/// let a = Tensor::matrix([[3.0f64, 1.0], [4.0, 2.0]]).unwrap();
/// let qr = DecompQR::new(&a).unwrap();
/// assert_eq!(qr.matrix_r().at([1, 0]), 0.0);
/// assert!((qr.matrix_r().at([0, 0]).abs() - 5.0).abs() < 1e-12);
/// let back = matmul(&qr.matrix_q(), qr.matrix_r()).unwrap();
/// assert!((back.at([1, 1]) - 2.0).abs() < 1e-12);
/// ```
pub struct DecompQR<T: Real> {
    helper: OrthoHelper<T>,
}

impl<T: Real> DecompQR<T> {
    /// Upper triangularizes a copy of `expr`, accumulating `Q`.
    ///
    /// # Errors
    ///
    /// Fails only if the working matrices cannot be allocated.
    pub fn new<E>(expr: &E) -> Result<Self, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        let mut helper = OrthoHelper::new(expr, true, false)?;
        helper.upper_triangularize();
        Ok(Self { helper })
    }

    /// Number of rows of the input.
    pub fn rows(&self) -> usize {
        self.helper.rows()
    }

    /// Number of columns of the input.
    pub fn cols(&self) -> usize {
        self.helper.cols()
    }

    /// The orthogonal factor `Q`.
    pub fn matrix_q(&self) -> Transpose<&Tensor<T, 2>> {
        self.helper.matrix_u()
    }

    /// The upper triangular factor `R`.
    pub fn matrix_r(&self) -> &Tensor<T, 2> {
        self.helper.matrix_x()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometric::{is_near, is_near_unitary};
    use rand::{rngs::StdRng, SeedableRng};
    use strata_tensor::{product::matmul, CpuAllocator};

    #[test]
    fn round_trip() -> Result<(), LinalgError> {
        let mut rng = StdRng::seed_from_u64(5);
        for (rows, cols) in [(1, 1), (3, 3), (6, 4), (3, 5)] {
            let x = Tensor::<f64, 2>::from_random([rows, cols], &mut rng, CpuAllocator)?;
            let qr = DecompQR::new(&x)?;
            assert_eq!((qr.rows(), qr.cols()), (rows, cols));
            assert_eq!(qr.matrix_q().shape().sizes(), [rows, rows]);
            assert!(is_near_unitary(&qr.matrix_q(), 1e-12)?);
            assert!(is_near(&matmul(&qr.matrix_q(), qr.matrix_r())?, &x, 1e-12)?);
            let r = qr.matrix_r();
            for i in 0..rows {
                for j in 0..i.min(cols) {
                    assert_eq!(r[[i, j]], 0.0);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn single_precision() -> Result<(), LinalgError> {
        let x = Tensor::matrix([
            [1.0f32, 0.0, -3.0, -5.0],
            [7.0, 2.0, -1.0, -1.0],
            [-4.0, -3.0, 0.0, 0.0],
            [8.0, 5.0, 2.0, 1.0],
        ])?;
        let qr = DecompQR::new(&x)?;
        assert!(is_near_unitary(&qr.matrix_q(), 1e-5)?);
        assert!(is_near(&matmul(&qr.matrix_q(), qr.matrix_r())?, &x, 1e-4)?);
        Ok(())
    }
}
