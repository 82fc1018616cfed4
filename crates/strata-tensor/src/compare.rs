//! Elementwise comparisons and logical combinators.
//!
//! Every function here is lazy and yields a `bool` expression, ready for
//! [`TensorLike::any_true`] and [`TensorLike::all_true`].
//!
//! ```rust
//! use strata_tensor::{compare, Tensor, TensorLike};
//!
//! let a = Tensor::vector([1, 5, 3]).unwrap();
//! let b = Tensor::vector([2, 2, 3]).unwrap();
//! assert!(compare::le(&a, &b).unwrap().any_true());
//! assert!(compare::gt_scalar(&a, 0).all_true());
//! ```

use crate::{
    expr::{zip, ScalarOp},
    ops::{BinaryExpr, ScalarExpr, ValueOf},
    tensor::TensorError,
    tensor_like::TensorLike,
};

macro_rules! comparison {
    ($name:ident, $scalar:ident, $sym:tt) => {
        #[doc = concat!("Lazily tests `lhs ", stringify!($sym), " rhs` at every coordinate.")]
        ///
        /// # Errors
        ///
        /// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
        pub fn $name<L, R, const N: usize>(
            lhs: L,
            rhs: R,
        ) -> Result<BinaryExpr<L, R, bool, N>, TensorError>
        where
            L: TensorLike<N>,
            R: TensorLike<N>,
            ValueOf<L, N>: PartialOrd<ValueOf<R, N>>,
        {
            let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> bool = |a, b| a $sym b;
            zip(lhs, rhs, func)
        }

        #[doc = concat!("Lazily tests `value ", stringify!($sym), " scalar` at every coordinate.")]
        pub fn $scalar<E, S, const N: usize>(expr: E, scalar: S) -> ScalarExpr<E, S, bool, N>
        where
            E: TensorLike<N>,
            S: Clone,
            ValueOf<E, N>: PartialOrd<S>,
        {
            let func: fn(ValueOf<E, N>, S) -> bool = |a, s| a $sym s;
            ScalarOp::new(expr, scalar, func)
        }
    };
}

comparison!(eq, eq_scalar, ==);
comparison!(ne, ne_scalar, !=);
comparison!(lt, lt_scalar, <);
comparison!(le, le_scalar, <=);
comparison!(gt, gt_scalar, >);
comparison!(ge, ge_scalar, >=);

/// Lazy logical conjunction of two `bool`-like expressions.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn and<L, R, const N: usize>(lhs: L, rhs: R) -> Result<BinaryExpr<L, R, bool, N>, TensorError>
where
    L: TensorLike<N>,
    R: TensorLike<N>,
    ValueOf<L, N>: Into<bool>,
    ValueOf<R, N>: Into<bool>,
{
    let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> bool = |a, b| a.into() && b.into();
    zip(lhs, rhs, func)
}

/// Lazy logical disjunction of two `bool`-like expressions.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn or<L, R, const N: usize>(lhs: L, rhs: R) -> Result<BinaryExpr<L, R, bool, N>, TensorError>
where
    L: TensorLike<N>,
    R: TensorLike<N>,
    ValueOf<L, N>: Into<bool>,
    ValueOf<R, N>: Into<bool>,
{
    let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> bool = |a, b| a.into() || b.into();
    zip(lhs, rhs, func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::transpose, tensor::Tensor};

    #[test]
    fn tensor_comparisons() -> Result<(), TensorError> {
        let a = Tensor::vector([1.0, 2.0, 3.0])?;
        let b = Tensor::vector([3.0, 2.0, 1.0])?;
        assert_eq!(eq(&a, &b)?.execute()?.as_slice(), &[false, true, false]);
        assert_eq!(ne(&a, &b)?.execute()?.as_slice(), &[true, false, true]);
        assert_eq!(lt(&a, &b)?.execute()?.as_slice(), &[true, false, false]);
        assert_eq!(le(&a, &b)?.execute()?.as_slice(), &[true, true, false]);
        assert_eq!(gt(&a, &b)?.execute()?.as_slice(), &[false, false, true]);
        assert_eq!(ge(&a, &b)?.execute()?.as_slice(), &[false, true, true]);

        let c = Tensor::vector([1.0])?;
        assert!(lt(&a, &c).is_err());
        Ok(())
    }

    #[test]
    fn scalar_comparisons() -> Result<(), TensorError> {
        let v = Tensor::vector([1, 2, 3, 4])?;
        assert_eq!(lt_scalar(&v, 3).execute()?.as_slice(), &[true, true, false, false]);
        assert_eq!(ge_scalar(&v, 3).execute()?.as_slice(), &[false, false, true, true]);
        assert!(eq_scalar(&v, 4).any_true());
        assert!(ne_scalar(&v, 0).all_true());
        assert!(!gt_scalar(&v, 4).any_true());
        assert!(le_scalar(&v, 4).all_true());
        Ok(())
    }

    #[test]
    fn symmetric_check() -> Result<(), TensorError> {
        let sym = Tensor::matrix([[1, 2], [2, 1]])?;
        let skew = Tensor::matrix([[1, 2], [3, 1]])?;
        assert!(eq(&sym, transpose(&sym))?.all_true());
        assert!(!eq(&skew, transpose(&skew))?.all_true());
        Ok(())
    }

    #[test]
    fn logical_combinators() -> Result<(), TensorError> {
        let v = Tensor::vector([1, 5, 9])?;
        let inside = and(gt_scalar(&v, 2), lt_scalar(&v, 8))?;
        assert_eq!(inside.execute()?.as_slice(), &[false, true, false]);
        let outside = or(le_scalar(&v, 2), ge_scalar(&v, 8))?;
        assert_eq!(outside.execute()?.as_slice(), &[true, false, true]);
        assert_eq!((!outside).execute()?, inside.execute()?);
        Ok(())
    }
}
