use strata_tensor::TensorError;
use thiserror::Error;

/// An error type for the decompositions.
#[derive(Error, Debug, PartialEq)]
pub enum LinalgError {
    /// Tensor error, including shape mismatches between operands.
    #[error("Error with the tensor: {0}")]
    TensorError(#[from] TensorError),

    /// A pivot vanished during LU elimination.
    #[error("Singular matrix: pivot {0} is numerically zero")]
    SingularMatrix(usize),

    /// A Cholesky pivot was non-finite or too small.
    #[error("Matrix is not positive definite at pivot {0}")]
    NonPositiveDefinite(usize),

    /// The Givens sweep ran out of iterations.
    #[error("Diagonalization did not converge after {iterations} iterations")]
    DidNotConverge {
        /// Number of sweeps performed before giving up.
        iterations: usize,
    },

    /// An argument is invalid for the requested operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Fails with [`TensorError::ShapeMismatch`] unless the matrix is square.
pub(crate) fn ensure_square(rows: usize, cols: usize) -> Result<(), LinalgError> {
    if rows != cols {
        return Err(TensorError::shape_mismatch(&[rows], &[cols]).into());
    }
    Ok(())
}
