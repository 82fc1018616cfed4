//! Vector geometry and approximate comparisons.

use strata_tensor::{
    expr::{transpose, Transpose},
    ops::sub,
    product::matmul,
    Tensor, TensorError, TensorLike,
};

use crate::{length::length, scalar::Real};

fn ensure_len<E: TensorLike<1> + ?Sized>(expr: &E, len: usize) -> Result<(), TensorError> {
    if expr.size(0) != len {
        return Err(TensorError::shape_mismatch(&[len], &[expr.size(0)]));
    }
    Ok(())
}

/// The Euclidean distance between two points.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the points have different lengths.
pub fn distance<A, B, T>(a: &A, b: &B) -> Result<T, TensorError>
where
    A: TensorLike<1, Value = T> + ?Sized,
    B: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    Ok(length(&sub(b, a)?))
}

/// The squared Euclidean distance between two points.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the points have different lengths.
pub fn distance_squared<A, B, T>(a: &A, b: &B) -> Result<T, TensorError>
where
    A: TensorLike<1, Value = T> + ?Sized,
    B: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    Ok(crate::length::length_squared(&sub(b, a)?))
}

/// The counter-clockwise perpendicular of a 2-vector.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] unless the vector has 2 entries.
pub fn hodge2<E, T>(expr: &E) -> Result<Tensor<T, 1>, TensorError>
where
    E: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    ensure_len(expr, 2)?;
    Tensor::vector([-expr.at([1]), expr.at([0])])
}

/// The skew-symmetric matrix `[v]×` with `[v]× w == cross(v, w)`.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] unless the vector has 3 entries.
pub fn hodge3<E, T>(expr: &E) -> Result<Tensor<T, 2>, TensorError>
where
    E: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    ensure_len(expr, 3)?;
    let (x, y, z) = (expr.at([0]), expr.at([1]), expr.at([2]));
    let o = T::zero();
    Tensor::matrix([[o, -z, y], [z, o, -x], [-y, x, o]])
}

/// The scalar cross product of two 2-vectors.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] unless both vectors have 2 entries.
pub fn cross2<A, B, T>(a: &A, b: &B) -> Result<T, TensorError>
where
    A: TensorLike<1, Value = T> + ?Sized,
    B: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    ensure_len(a, 2)?;
    ensure_len(b, 2)?;
    Ok(a.at([0]) * b.at([1]) - a.at([1]) * b.at([0]))
}

/// The cross product of two 3-vectors.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] unless both vectors have 3 entries.
pub fn cross<A, B, T>(a: &A, b: &B) -> Result<Tensor<T, 1>, TensorError>
where
    A: TensorLike<1, Value = T> + ?Sized,
    B: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    ensure_len(a, 3)?;
    ensure_len(b, 3)?;
    let (a0, a1, a2) = (a.at([0]), a.at([1]), a.at([2]));
    let (b0, b1, b2) = (b.at([0]), b.at([1]), b.at([2]));
    Tensor::vector([a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
}

/// The angle between two vectors, in radians.
///
/// Uses Kahan's formula on the triangle spanned by the vectors, which stays accurate for
/// nearly parallel and nearly opposite vectors where `acos` of the normalized dot product
/// does not.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the vectors have different lengths.
pub fn angle_between<A, B, T>(a: &A, b: &B) -> Result<T, TensorError>
where
    A: TensorLike<1, Value = T> + ?Sized,
    B: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    let sep_len = length(&sub(b, a)?);
    let (mut min_len, mut max_len) = (length(a), length(b));
    if !(min_len < max_len) {
        std::mem::swap(&mut min_len, &mut max_len);
    }
    let coeff = if min_len >= sep_len {
        sep_len - (max_len - min_len)
    } else {
        min_len - (max_len - sep_len)
    };
    let numer = (max_len - min_len + sep_len) * coeff;
    let denom = (min_len + sep_len + max_len) * (max_len - sep_len + min_len);
    let two = T::one() + T::one();
    Ok(two * (numer / denom).max(T::zero()).sqrt().atan())
}

/// The angle between two unit vectors, in radians.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the vectors have different lengths.
pub fn angle_between_unit_length<A, B, T>(a: &A, b: &B) -> Result<T, TensorError>
where
    A: TensorLike<1, Value = T> + ?Sized,
    B: TensorLike<1, Value = T> + ?Sized,
    T: Real,
{
    let two = T::one() + T::one();
    let numer = crate::length::fast_length(&sub(b, a)?);
    let denom = ((two + numer) * (two - numer)).max(T::zero()).sqrt();
    Ok(two * (numer / denom).atan())
}

/// The point at angle `theta` on the unit circle.
pub fn unit_circle<T: Real>(theta: T) -> Result<Tensor<T, 1>, TensorError> {
    Tensor::vector([theta.cos(), theta.sin()])
}

/// The point at polar angle `theta` and azimuth `phi` on the unit sphere.
pub fn unit_sphere<T: Real>(theta: T, phi: T) -> Result<Tensor<T, 1>, TensorError> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Tensor::vector([sin_theta * cos_phi, sin_theta * sin_phi, cos_theta])
}

/// The adjoint of a real matrix, which is its transpose.
pub fn adjoint<E: TensorLike<2>>(expr: E) -> Transpose<E> {
    transpose(expr)
}

/// Whether every value is within `thresh` of zero.
pub fn is_near_zero<E, T, const N: usize>(expr: &E, thresh: T) -> bool
where
    E: TensorLike<N, Value = T> + ?Sized,
    T: Real,
{
    expr.shape()
        .for_each_while(|index| expr.access(index).abs() <= thresh)
}

/// Whether two tensors agree to within `thresh` everywhere.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn is_near<A, B, T, const N: usize>(a: &A, b: &B, thresh: T) -> Result<bool, TensorError>
where
    A: TensorLike<N, Value = T> + ?Sized,
    B: TensorLike<N, Value = T> + ?Sized,
    T: Real,
{
    Ok(is_near_zero(&sub(a, b)?, thresh))
}

/// Whether a matrix is within `thresh` of the identity, entry by entry.
pub fn is_near_identity<E, T>(expr: &E, thresh: T) -> bool
where
    E: TensorLike<2, Value = T> + ?Sized,
    T: Real,
{
    expr.shape().for_each_while(|index| {
        let target = if index[0] == index[1] { T::one() } else { T::zero() };
        (expr.access(index).abs() - target).abs() <= thresh
    })
}

/// Whether `M Mᵀ` is within `thresh` of the identity.
///
/// # Errors
///
/// Fails only if the product cannot be allocated.
pub fn is_near_unitary<E, T>(expr: &E, thresh: T) -> Result<bool, TensorError>
where
    E: TensorLike<2, Value = T> + ?Sized,
    T: Real,
{
    let gram = matmul(expr, &adjoint(expr))?;
    Ok(is_near_identity(&gram, thresh))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strata_tensor::product::matvec;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    fn cross_products() -> Result<(), TensorError> {
        let x = Tensor::vector([1.0f64, 0.0, 0.0])?;
        let y = Tensor::vector([0.0f64, 1.0, 0.0])?;
        assert_eq!(cross(&x, &y)?.as_slice(), &[0.0, 0.0, 1.0]);
        assert_eq!(cross(&y, &x)?.as_slice(), &[0.0, 0.0, -1.0]);

        let v = Tensor::vector([1.0f64, 2.0, 3.0])?;
        let w = Tensor::vector([-2.0f64, 0.5, 4.0])?;
        let skew = hodge3(&v)?;
        assert_eq!(matvec(&skew, &w)?, cross(&v, &w)?);

        let a = Tensor::vector([1.0f64, 2.0])?;
        let b = Tensor::vector([3.0f64, 4.0])?;
        assert_eq!(cross2(&a, &b)?, -2.0);
        assert_eq!(hodge2(&a)?.as_slice(), &[-2.0, 1.0]);
        assert!(cross(&a, &b).is_err());
        Ok(())
    }

    #[test]
    fn distances_and_angles() -> Result<(), TensorError> {
        let a = Tensor::vector([1.0f64, 1.0])?;
        let b = Tensor::vector([4.0f64, 5.0])?;
        assert_eq!(distance(&a, &b)?, 5.0);
        assert_eq!(distance_squared(&a, &b)?, 25.0);

        let x = Tensor::vector([2.0f64, 0.0])?;
        let y = Tensor::vector([0.0f64, 3.0])?;
        let xy = Tensor::vector([1.0f64, 1.0])?;
        assert_relative_eq!(angle_between(&x, &y)?, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(angle_between(&x, &xy)?, FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(angle_between(&x, &(-&x))?, PI, epsilon = 1e-12);
        assert_eq!(angle_between(&x, &x)?, 0.0);

        let ux = unit_circle(0.0f64)?;
        let uy = unit_circle(FRAC_PI_2)?;
        assert_relative_eq!(angle_between_unit_length(&ux, &uy)?, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(length(&unit_sphere(0.3f64, 1.2)?), 1.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn near_checks() -> Result<(), TensorError> {
        let m = Tensor::matrix([[1.0f64, 1e-9], [0.0, 1.0]])?;
        assert!(is_near_identity(&m, 1e-6));
        assert!(!is_near_identity(&m, 1e-12));
        assert!(is_near(&m, &Tensor::matrix([[1.0, 0.0], [0.0, 1.0]])?, 1e-6)?);
        assert!(is_near_zero(&(&m - &m), 0.0));

        let (s, c) = 0.7f64.sin_cos();
        let rotation = Tensor::matrix([[c, -s], [s, c]])?;
        assert!(is_near_unitary(&rotation, 1e-12)?);
        assert!(!is_near_unitary(&(&rotation * 2.0), 1e-12)?);
        assert_eq!(adjoint(&rotation).at([0, 1]), s);
        Ok(())
    }
}
