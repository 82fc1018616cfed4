#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Every decomposition copies its input expression into an owned coefficient matrix,
//! runs to completion in its constructor and is read-only afterwards. Factors are exposed
//! as lazy expressions over that storage.
//!
//! ```rust
//! use strata_linalg::{geometric::is_near, DecompSVD};
//! use strata_tensor::{product::matmul, Tensor};
//!
//! let a = Tensor::matrix([[2.0f64, 1.0], [1.0, 3.0], [0.0, 1.0]]).unwrap();
//! let svd = DecompSVD::new(&a).unwrap();
//! let usv = matmul(&matmul(&svd.matrix_u(), &svd.matrix_s()).unwrap(), &svd.matrix_v()).unwrap();
//! assert!(is_near(&usv, &a, 1e-12).unwrap());
//! ```

/// Pivoted Cholesky decomposition.
pub mod chol;

/// Error types for the decompositions.
pub mod error;

/// Distances, cross products, angles and closeness checks.
pub mod geometric;

/// Overflow-safe lengths and normalization.
pub mod length;

/// LU decomposition, inverse and determinant.
pub mod lu;

/// Householder and Givens transforms.
pub mod ortho;

/// QR decomposition.
pub mod qr;

/// Scalar trait and floating-point limits.
pub mod scalar;

/// Singular value decomposition.
pub mod svd;

pub use crate::chol::DecompChol;
pub use crate::error::LinalgError;
pub use crate::lu::{determinant, inverse, DecompLU};
pub use crate::ortho::{GivensCriteria, OrthoHelper, Side};
pub use crate::qr::DecompQR;
pub use crate::scalar::Real;
pub use crate::svd::{orthogonalize, pseudo_inverse, DecompSVD};
