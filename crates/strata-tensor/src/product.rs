//! Inner products and matrix multiplication.
//!
//! A vector dot product reduces to a scalar. Products involving a matrix are evaluated
//! eagerly into a new [`Tensor`]: each output value is a sum over a whole row and column,
//! so keeping the product lazy would repeat that sum on every access.

use std::ops::{Add, Mul};

use crate::{
    allocator::CpuAllocator,
    expr::diag,
    shape::Shape,
    tensor::{Tensor, TensorError},
    tensor_like::TensorLike,
};

fn check_inner(lhs: usize, rhs: usize) -> Result<(), TensorError> {
    if lhs != rhs {
        return Err(TensorError::shape_mismatch(&[lhs], &[rhs]));
    }
    Ok(())
}

#[inline]
fn accumulate<O: Default + Add<Output = O>>(slot: &mut O, term: O) {
    *slot = std::mem::take(slot) + term;
}

/// The inner product of two vectors.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the lengths differ.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{product::dot, Tensor};
///
/// let a = Tensor::vector([1i32, 2, 3]).unwrap();
/// let b = Tensor::vector([4i32, 5, 6]).unwrap();
/// assert_eq!(dot::<_, _, i32>(&a, &b).unwrap(), 32);
/// ```
pub fn dot<L, R, O>(lhs: &L, rhs: &R) -> Result<O, TensorError>
where
    L: TensorLike<1> + ?Sized,
    R: TensorLike<1> + ?Sized,
    L::Value: Mul<R::Value, Output = O>,
    O: Default + Add<Output = O>,
{
    check_inner(lhs.size(0), rhs.size(0))?;
    let mut sum = O::default();
    for k in 0..lhs.size(0) {
        accumulate(&mut sum, lhs.at([k]) * rhs.at([k]));
    }
    Ok(sum)
}

/// The product of a matrix and a column vector.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the matrix columns and the vector length
/// differ.
pub fn matvec<L, R, O>(lhs: &L, rhs: &R) -> Result<Tensor<O, 1>, TensorError>
where
    L: TensorLike<2> + ?Sized,
    R: TensorLike<1> + ?Sized,
    L::Value: Mul<R::Value, Output = O>,
    O: Clone + Default + Add<Output = O>,
{
    let (lshape, rshape) = (lhs.shape(), rhs.shape());
    check_inner(lshape.cols(), rshape.size(0))?;
    let mut out = Tensor::from_shape_val(lshape.take([0])?, O::default(), CpuAllocator)?;
    for i in 0..lshape.rows() {
        let slot = &mut out[[i]];
        for k in 0..lshape.cols() {
            accumulate(slot, lhs.at([i, k]) * rhs.at([k]));
        }
    }
    Ok(out)
}

/// The product of a row vector and a matrix.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the vector length and the matrix rows
/// differ.
pub fn vecmat<L, R, O>(lhs: &L, rhs: &R) -> Result<Tensor<O, 1>, TensorError>
where
    L: TensorLike<1> + ?Sized,
    R: TensorLike<2> + ?Sized,
    L::Value: Mul<R::Value, Output = O> + Clone,
    O: Clone + Default + Add<Output = O>,
{
    let (lshape, rshape) = (lhs.shape(), rhs.shape());
    check_inner(lshape.size(0), rshape.rows())?;
    let mut out = Tensor::from_shape_val(rshape.take([1])?, O::default(), CpuAllocator)?;
    for k in 0..rshape.rows() {
        let a = lhs.at([k]);
        for j in 0..rshape.cols() {
            accumulate(&mut out[[j]], a.clone() * rhs.at([k, j]));
        }
    }
    Ok(out)
}

/// The product of two matrices.
///
/// The output keeps the row axis of `lhs` and the column axis of `rhs`, fixed or
/// dynamic as they were.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the inner extents differ.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{product::matmul, Tensor};
///
/// let a = Tensor::matrix([[1, 2], [3, 4]]).unwrap();
/// let b = Tensor::matrix([[0, 1], [1, 0]]).unwrap();
/// assert_eq!(matmul(&a, &b).unwrap().as_slice(), &[2, 1, 4, 3]);
/// ```
pub fn matmul<L, R, O>(lhs: &L, rhs: &R) -> Result<Tensor<O, 2>, TensorError>
where
    L: TensorLike<2> + ?Sized,
    R: TensorLike<2> + ?Sized,
    L::Value: Mul<R::Value, Output = O> + Clone,
    O: Clone + Default + Add<Output = O>,
{
    let (lshape, rshape) = (lhs.shape(), rhs.shape());
    check_inner(lshape.cols(), rshape.rows())?;
    let shape: Shape<2> = lshape.take([0])?.append(&rshape.take([1])?);
    let mut out = Tensor::from_shape_val(shape, O::default(), CpuAllocator)?;
    for i in 0..lshape.rows() {
        for k in 0..lshape.cols() {
            let a = lhs.at([i, k]);
            for j in 0..rshape.cols() {
                accumulate(&mut out[[i, j]], a.clone() * rhs.at([k, j]));
            }
        }
    }
    Ok(out)
}

/// The product of a chain of matrices, multiplied from the right.
///
/// # Errors
///
/// Returns [`TensorError::InvalidArgument`] for an empty chain and
/// [`TensorError::ShapeMismatch`] if two neighbouring factors do not conform.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{product::multi_dot, Tensor, TensorLike};
///
/// let a = Tensor::matrix([[1.0, 2.0]]).unwrap();
/// let b = Tensor::matrix([[1.0, 0.0], [0.0, 1.0]]).unwrap();
/// let c = Tensor::matrix([[3.0], [4.0]]).unwrap();
/// let abc = multi_dot(&[&a, &b, &c]).unwrap();
/// assert_eq!(abc.at([0, 0]), 11.0);
/// ```
pub fn multi_dot<T>(factors: &[&dyn TensorLike<2, Value = T>]) -> Result<Tensor<T, 2>, TensorError>
where
    T: Clone + Default + Add<Output = T> + Mul<Output = T>,
{
    let Some((last, rest)) = factors.split_last() else {
        return Err(TensorError::InvalidArgument(
            "a product chain needs at least one factor".to_string(),
        ));
    };
    let mut acc = Tensor::from_expr(last, CpuAllocator)?;
    for factor in rest.iter().rev() {
        acc = matmul(factor, &acc)?;
    }
    Ok(acc)
}

/// The sum of the main diagonal.
pub fn trace<E>(expr: &E) -> E::Value
where
    E: TensorLike<2> + ?Sized,
    E::Value: Default + Add<Output = E::Value>,
{
    diag(expr).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{identity, transpose};

    #[test]
    fn dot_vectors() -> Result<(), TensorError> {
        let a = Tensor::vector([1.0f64, 2.0, 3.0])?;
        let b = Tensor::vector([4.0f64, -5.0, 6.0])?;
        assert_eq!(dot::<_, _, f64>(&a, &b)?, 12.0);
        assert_eq!(dot::<_, _, f64>(&a, &(&a * 2.0f64))?, 28.0);

        let c = Tensor::vector([1.0f64, 2.0])?;
        assert!(matches!(dot::<_, _, f64>(&a, &c), Err(TensorError::ShapeMismatch { .. })));

        let empty = Tensor::<f64, 1>::zeros([0], CpuAllocator)?;
        assert_eq!(dot::<_, _, f64>(&empty, &empty)?, 0.0);
        Ok(())
    }

    #[test]
    fn matrix_vector_products() -> Result<(), TensorError> {
        let m = Tensor::matrix([[1, 2, 3], [4, 5, 6]])?;
        let x = Tensor::vector([1, 0, -1])?;
        let y = Tensor::vector([1, 1])?;
        assert_eq!(matvec(&m, &x)?.as_slice(), &[-2, -2]);
        assert_eq!(vecmat(&y, &m)?.as_slice(), &[5, 7, 9]);
        assert!(matvec(&m, &y).is_err());
        assert!(vecmat(&x, &m).is_err());
        Ok(())
    }

    #[test]
    fn matmul_keeps_outer_axes() -> Result<(), TensorError> {
        let a = Tensor::matrix([[1, 2, 3], [4, 5, 6]])?;
        let b = transpose(&a);
        let ab = matmul(&a, &b)?;
        assert_eq!(ab.shape().sizes(), [2, 2]);
        assert!(ab.shape().is_static());
        assert_eq!(ab.as_slice(), &[14, 32, 32, 77]);

        let dynamic = Tensor::<i32, 2>::from_shape_vec([3, 1], vec![1, 1, 1], CpuAllocator)?;
        let ad = matmul(&a, &dynamic)?;
        assert!(ad.shape().is_fixed(0));
        assert!(!ad.shape().is_fixed(1));
        assert_eq!(ad.as_slice(), &[6, 15]);

        assert!(matmul(&a, &a).is_err());
        Ok(())
    }

    #[test]
    fn identity_is_neutral() -> Result<(), TensorError> {
        let a = Tensor::matrix([[1.5, -2.0], [0.25, 4.0]])?;
        let eye = identity::<f64, 2>([2, 2]);
        assert_eq!(matmul(&a, &eye)?, a);
        assert_eq!(matmul(&eye, &a)?, a);
        Ok(())
    }

    #[test]
    fn chained_products() -> Result<(), TensorError> {
        let a = Tensor::matrix([[1, 2], [3, 4]])?;
        let b = Tensor::matrix([[0, 1], [1, 0]])?;
        let c = Tensor::matrix([[2, 0], [0, 2]])?;
        let abc = multi_dot(&[&a, &b, &c])?;
        assert_eq!(abc, matmul(&matmul(&a, &b)?, &c)?);
        assert_eq!(multi_dot(&[&a])?, a);
        assert!(multi_dot::<i32>(&[]).is_err());
        Ok(())
    }

    #[test]
    fn trace_of_rectangular() -> Result<(), TensorError> {
        let a = Tensor::matrix([[1, 2, 3], [4, 5, 6]])?;
        assert_eq!(trace(&a), 6);
        assert_eq!(trace(&identity::<f32, 2>([4, 4])), 4.0);
        Ok(())
    }
}
