#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `strata-tensor` provides N-dimensional tensors whose rank is a const generic and whose
//! extents are, axis by axis, either fixed or dynamic. Arithmetic on tensors builds lazy
//! expressions that are evaluated per coordinate and only materialized on request.
//!
//! # Architecture
//!
//! - **Shape**: per-axis extents with a fixed/dynamic flag, and the row-major iteration
//!   engine [`Shape::for_each`]
//! - **TensorLike**: the trait shared by tensors, views and expressions; reductions,
//!   sub-blocks and materialization are default methods
//! - **Expressions**: typed lazy nodes ([`expr::Zip`], [`expr::Map`], [`expr::Transpose`], ...)
//!   produced by operators and free functions
//! - **Tensor**: owning row-major storage with small-buffer inlining and a pluggable
//!   [`TensorAllocator`]
//! - **TensorView**: non-owning strided views with signed skips
//!
//! # Quick Start
//!
//! Creating tensors and combining them lazily:
//!
//! ```rust
//! use strata_tensor::{CpuAllocator, Tensor, TensorLike};
//!
//! // Create a 2x3 tensor from a vector
//! let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let a = Tensor::<f32, 2>::from_shape_vec([2, 3], data, CpuAllocator).unwrap();
//!
//! // Access elements
//! assert_eq!(a.get([0, 0]), Some(&1.0));
//! assert_eq!(a[[1, 2]], 6.0);
//!
//! // Build an expression; nothing is computed yet
//! let b = Tensor::<f32, 2>::from_shape_val([2, 3], 1.0, CpuAllocator).unwrap();
//! let expr = (&a - &b) * 2.0;
//!
//! // Evaluate a single coordinate, or the whole expression
//! assert_eq!(expr.at([1, 0]), 6.0);
//! let c = expr.execute().unwrap();
//! assert_eq!(c.as_slice(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
//! ```
//!
//! Sub-blocks and products:
//!
//! ```rust
//! use strata_tensor::{expr::transpose, product::matmul, Matrix, TensorLike, TensorLikeMut};
//!
//! let mut m = Matrix::matrix([[1, 2], [3, 4]]).unwrap();
//! m.row_mut(0).unwrap().fill(0);
//! let gram = matmul(&transpose(&m), &m).unwrap();
//! assert_eq!(gram.as_slice(), &[9, 12, 12, 16]);
//! ```
//!
//! # Type Aliases
//!
//! - [`Vector`]: one-dimensional tensor
//! - [`Matrix`]: two-dimensional tensor

/// Allocator module containing memory management utilities.
///
/// This module provides the [`TensorAllocator`] trait and implementations for different
/// memory backends. The default [`CpuAllocator`] uses the system allocator for CPU memory.
pub mod allocator;

/// Bincode module for binary serialization and deserialization.
///
/// This module provides efficient binary serialization support for tensors when the
/// `bincode` feature is enabled.
#[cfg(feature = "bincode")]
pub mod bincode;

/// Elementwise comparisons and logical combinators.
pub mod compare;

/// Lazy expression nodes and the free functions that build them.
pub mod expr;

/// Coordinate tuples and combination enumeration.
pub mod index;

/// Elementwise math functions.
pub mod math;

/// Operator overloads and checked arithmetic.
pub mod ops;

/// Vector and matrix products.
pub mod product;

/// Serde module for JSON/other format serialization and deserialization.
///
/// This module provides flexible serialization support for tensors when the
/// `serde` feature is enabled.
#[cfg(feature = "serde")]
pub mod serde;

/// Tensor shapes.
pub mod shape;

/// Axis ranges used to carve sub-tensors.
pub mod slice;

/// Storage module containing low-level memory buffer implementations.
///
/// This module provides [`storage::TensorStorage`] which manages the actual memory buffer
/// for tensor data with custom allocator support.
pub mod storage;

/// Tensor module containing the main tensor implementation and error types.
///
/// This module provides the core [`tensor::Tensor`] struct and related functionality.
pub mod tensor;

/// The traits shared by every tensor-shaped value.
pub mod tensor_like;

/// View module containing non-owning tensor view implementations.
///
/// This module provides [`view::TensorView`] for creating efficient, zero-copy views
/// into existing tensor data.
pub mod view;

pub use crate::allocator::{CpuAllocator, TensorAllocator};
pub use crate::index::IndexVector;
pub use crate::shape::{equal_shapes, Dim, Shape};
pub use crate::slice::{Slice, SliceLike, SliceToEnd, StaticSlice, TO_END};
pub use crate::tensor::{Tensor, TensorError};
pub use crate::tensor_like::{TensorLike, TensorLikeMut};
pub use crate::view::{TensorView, TensorViewMut};

/// Type alias for a 1-dimensional tensor.
pub type Vector<T, A = CpuAllocator> = Tensor<T, 1, A>;

/// Type alias for a 2-dimensional tensor.
pub type Matrix<T, A = CpuAllocator> = Tensor<T, 2, A>;

/// Imports for everyday use.
pub mod prelude {
    pub use crate::expr::{diag, identity, map, outer, transpose, zip};
    pub use crate::product::{dot, matmul, matvec, multi_dot, trace, vecmat};
    pub use crate::{
        CpuAllocator, IndexVector, Matrix, Shape, Slice, Tensor, TensorError, TensorLike,
        TensorLikeMut, Vector,
    };
}
