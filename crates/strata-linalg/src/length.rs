//! Overflow-safe Euclidean lengths.
//!
//! [`length`] rescales by the largest magnitude before squaring whenever the plain sum of
//! squares could underflow or overflow, so vectors with entries near the limits of the
//! floating-point range still get an accurate length.
//!
//! ```rust
//! use strata_linalg::length::{length, normalize};
//! use strata_tensor::Tensor;
//!
//! let v = Tensor::vector([3.0e200f64, 4.0e200, 0.0]).unwrap();
//! assert!((length(&v) / 5.0e200 - 1.0).abs() < 1e-12);
//!
//! let u = normalize(&v).unwrap();
//! assert!((length(&u) - 1.0).abs() < 1e-12);
//! ```

use num_traits::{Float, Zero};
use strata_tensor::{Tensor, TensorError, TensorLike, TensorLikeMut};

use crate::scalar::Real;

/// Euclidean length of a slice of values.
pub(crate) fn slice_length<T: Real>(values: &[T]) -> T {
    match values {
        [] => T::zero(),
        [a] => a.abs(),
        [a, b] => a.hypot(*b),
        _ => {
            let max_term = values.iter().fold(T::zero(), |acc, v| acc.max(v.abs()));
            let n = T::from_usize(values.len());
            if max_term <= T::min_sqr() || max_term * max_term >= T::max_value() / n {
                if max_term == T::zero() {
                    return T::zero();
                }
                let sum = values.iter().fold(T::zero(), |acc, v| {
                    let term = v.abs() / max_term;
                    acc + term * term
                });
                return sum.sqrt() * max_term;
            }
            values.iter().fold(T::zero(), |acc, v| acc + *v * *v).sqrt()
        }
    }
}

/// Scales a slice to unit length in place and returns the original length.
pub(crate) fn slice_normalize<T: Real>(values: &mut [T]) -> T {
    let len = slice_length(values);
    if len == T::zero() {
        values.fill(T::zero());
        return len;
    }
    let eight = T::from_usize(8);
    if len <= eight * T::min_inv() {
        values.iter_mut().for_each(|v| *v = *v / len);
    } else {
        let inv = len.recip();
        values.iter_mut().for_each(|v| *v = *v * inv);
    }
    len
}

fn collect<E: TensorLike<1> + ?Sized>(expr: &E) -> Vec<E::Value> {
    (0..expr.size(0)).map(|i| expr.at([i])).collect()
}

fn write_back<E, T>(expr: &mut E, values: &[T])
where
    E: TensorLikeMut<1, Value = T> + ?Sized,
    T: Real,
{
    for (i, v) in values.iter().enumerate() {
        *expr.at_mut([i]) = *v;
    }
}

/// The Euclidean length of a vector expression.
///
/// Lengths of one and two entries go through `abs` and `hypot`; longer vectors are
/// rescaled by their largest magnitude when squaring could underflow or overflow.
pub fn length<E>(expr: &E) -> E::Value
where
    E: TensorLike<1> + ?Sized,
    E::Value: Real,
{
    slice_length(&collect(expr))
}

/// The squared Euclidean length, with no protection against overflow.
pub fn length_squared<E>(expr: &E) -> E::Value
where
    E: TensorLike<1> + ?Sized,
    E::Value: Real,
{
    (0..expr.size(0)).fold(E::Value::zero(), |acc, i| {
        let v = expr.at([i]);
        acc + v * v
    })
}

/// The Euclidean length, computed directly from the sum of squares.
pub fn fast_length<E>(expr: &E) -> E::Value
where
    E: TensorLike<1> + ?Sized,
    E::Value: Real,
{
    length_squared(expr).sqrt()
}

/// Scales a vector to unit length in place and returns its original length.
///
/// A zero vector stays zero and reports length zero. Very short vectors are divided by
/// their length rather than multiplied by its reciprocal.
pub fn normalize_in_place<E>(expr: &mut E) -> E::Value
where
    E: TensorLikeMut<1> + ?Sized,
    E::Value: Real,
{
    let mut values = collect(&*expr);
    let len = slice_normalize(&mut values);
    write_back(expr, &values);
    len
}

/// A unit-length copy of a vector.
///
/// # Errors
///
/// Fails only if the output tensor cannot be allocated.
pub fn normalize<E>(expr: &E) -> Result<Tensor<E::Value, 1>, TensorError>
where
    E: TensorLike<1> + ?Sized,
    E::Value: Real,
{
    let mut out = expr.execute()?;
    normalize_in_place(&mut out);
    Ok(out)
}

/// The length of a vector together with its direction.
///
/// # Errors
///
/// Fails only if the output tensor cannot be allocated.
pub fn length_and_direction<E>(expr: &E) -> Result<(E::Value, Tensor<E::Value, 1>), TensorError>
where
    E: TensorLike<1> + ?Sized,
    E::Value: Real,
{
    let mut out = expr.execute()?;
    let len = normalize_in_place(&mut out);
    Ok((len, out))
}

/// Rescales a vector in place so that its length lies in `[min_len, max_len]`.
///
/// A zero vector that must grow becomes `min_len` along the first axis. Returns the
/// original length.
pub fn clamp_length_in_place<E>(expr: &mut E, min_len: E::Value, max_len: E::Value) -> E::Value
where
    E: TensorLikeMut<1> + ?Sized,
    E::Value: Real,
{
    let len = length(&*expr);
    let factor = if len < min_len && len == E::Value::zero() {
        expr.fill(E::Value::zero());
        if expr.size(0) > 0 {
            *expr.at_mut([0]) = min_len;
        }
        return len;
    } else if len < min_len {
        min_len / len
    } else if len > max_len {
        max_len / len
    } else {
        return len;
    };
    for i in 0..expr.size(0) {
        let v = expr.at_mut([i]);
        *v = *v * factor;
    }
    len
}

/// A copy of a vector with its length clamped to `[min_len, max_len]`.
///
/// # Errors
///
/// Fails only if the output tensor cannot be allocated.
pub fn clamp_length<E>(
    expr: &E,
    min_len: E::Value,
    max_len: E::Value,
) -> Result<Tensor<E::Value, 1>, TensorError>
where
    E: TensorLike<1> + ?Sized,
    E::Value: Real,
{
    let mut out = expr.execute()?;
    clamp_length_in_place(&mut out, min_len, max_len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strata_tensor::{CpuAllocator, Tensor};

    #[test]
    fn small_sizes() -> Result<(), TensorError> {
        let empty = Tensor::<f64, 1>::zeros([0], CpuAllocator)?;
        assert_eq!(length(&empty), 0.0);
        assert_eq!(length(&Tensor::vector([-2.5f32])?), 2.5);
        assert_eq!(length(&Tensor::vector([3.0f64, -4.0])?), 5.0);
        assert_relative_eq!(length(&Tensor::vector([1.0f64, 2.0, 2.0])?), 3.0);
        Ok(())
    }

    #[test]
    fn squared_and_fast_lengths() -> Result<(), TensorError> {
        let empty = Tensor::<f32, 1>::zeros([0], CpuAllocator)?;
        assert_eq!(length_squared(&empty), 0.0);
        assert_eq!(fast_length(&empty), 0.0);
        let v = Tensor::vector([1.0f64, -2.0, 2.0, 4.0])?;
        assert_eq!(length_squared(&v), 25.0);
        assert_eq!(fast_length(&v), 5.0);
        Ok(())
    }

    #[test]
    fn extreme_magnitudes() -> Result<(), TensorError> {
        let huge = Tensor::vector([3.0e30f32, 4.0e30, 0.0])?;
        assert_relative_eq!(length(&huge), 5.0e30, max_relative = 1e-6);
        assert!(fast_length(&huge).is_infinite());

        let tiny = Tensor::vector([3.0e-30f32, 4.0e-30, 0.0])?;
        assert_relative_eq!(length(&tiny), 5.0e-30, max_relative = 1e-6);

        let zeros = Tensor::vector([0.0f32; 4])?;
        assert_eq!(length(&zeros), 0.0);
        Ok(())
    }

    #[test]
    fn normalize_vectors() -> Result<(), TensorError> {
        let mut v = Tensor::vector([0.0f64, 3.0, 4.0])?;
        assert_eq!(normalize_in_place(&mut v), 5.0);
        assert_relative_eq!(v.as_slice()[1], 0.6, epsilon = 1e-12);
        assert_relative_eq!(v.as_slice()[2], 0.8, epsilon = 1e-12);

        let mut zero = Tensor::vector([0.0f64, 0.0, 0.0])?;
        assert_eq!(normalize_in_place(&mut zero), 0.0);
        assert_eq!(zero.as_slice(), &[0.0, 0.0, 0.0]);

        let (len, dir) = length_and_direction(&Tensor::vector([0.0f64, -2.0])?)?;
        assert_eq!(len, 2.0);
        assert_eq!(dir.as_slice(), &[0.0, -1.0]);
        Ok(())
    }

    #[test]
    fn clamp_vectors() -> Result<(), TensorError> {
        let v = Tensor::vector([0.0f64, 3.0, 4.0])?;
        assert_relative_eq!(length(&clamp_length(&v, 0.0, 1.0)?), 1.0, epsilon = 1e-12);
        assert_relative_eq!(length(&clamp_length(&v, 10.0, 20.0)?), 10.0, epsilon = 1e-12);
        assert_eq!(clamp_length(&v, 1.0, 10.0)?, v);

        let mut zero = Tensor::vector([0.0f64, 0.0])?;
        assert_eq!(clamp_length_in_place(&mut zero, 2.0, 3.0), 0.0);
        assert_eq!(zero.as_slice(), &[2.0, 0.0]);
        Ok(())
    }
}
