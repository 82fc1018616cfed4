//! Elementwise math functions lifted over expressions.
//!
//! Each function wraps its argument in a lazy [`Map`](crate::expr::Map) node.
//!
//! ```rust
//! use strata_tensor::{math, Tensor, TensorLike};
//!
//! let x = Tensor::vector([1.0f32, 4.0, 9.0]).unwrap();
//! assert_eq!(math::sqrt(&x).execute().unwrap().as_slice(), &[1.0, 2.0, 3.0]);
//! ```

use num_traits::Float;

use crate::{
    expr::{map, ScalarOp},
    ops::{ScalarExpr, UnaryExpr, ValueOf},
    tensor_like::TensorLike,
};

macro_rules! lift {
    ($($name:ident => $doc:literal),* $(,)?) => {
        $(
            #[doc = $doc]
            pub fn $name<E, const N: usize>(expr: E) -> UnaryExpr<E, ValueOf<E, N>, N>
            where
                E: TensorLike<N>,
                ValueOf<E, N>: Float,
            {
                let func: fn(ValueOf<E, N>) -> ValueOf<E, N> = |x| x.$name();
                map(expr, func)
            }
        )*
    };
}

lift!(
    abs => "Absolute value.",
    sqrt => "Square root.",
    cbrt => "Cube root.",
    exp => "`e^x`.",
    exp2 => "`2^x`.",
    ln => "Natural logarithm.",
    log2 => "Base 2 logarithm.",
    log10 => "Base 10 logarithm.",
    sin => "Sine.",
    cos => "Cosine.",
    tan => "Tangent.",
    asin => "Arcsine.",
    acos => "Arccosine.",
    atan => "Arctangent.",
    sinh => "Hyperbolic sine.",
    cosh => "Hyperbolic cosine.",
    tanh => "Hyperbolic tangent.",
    floor => "Largest integer not above the value.",
    ceil => "Smallest integer not below the value.",
    round => "Nearest integer, half away from zero.",
    trunc => "Integer part.",
    signum => "Sign, as `1` or `-1`; NaN for NaN.",
    recip => "`1 / x`.",
);

/// Raises every value to the power `p`.
pub fn powf<E, const N: usize>(expr: E, p: ValueOf<E, N>) -> ScalarExpr<E, ValueOf<E, N>, ValueOf<E, N>, N>
where
    E: TensorLike<N>,
    ValueOf<E, N>: Float,
{
    let func: fn(ValueOf<E, N>, ValueOf<E, N>) -> ValueOf<E, N> = |x, p| x.powf(p);
    ScalarOp::new(expr, p, func)
}

/// Limits every value to `[lo, hi]`.
pub fn clamp<E, const N: usize>(
    expr: E,
    lo: ValueOf<E, N>,
    hi: ValueOf<E, N>,
) -> ScalarExpr<E, (ValueOf<E, N>, ValueOf<E, N>), ValueOf<E, N>, N>
where
    E: TensorLike<N>,
    ValueOf<E, N>: Float,
{
    let func: fn(ValueOf<E, N>, (ValueOf<E, N>, ValueOf<E, N>)) -> ValueOf<E, N> =
        |x, (lo, hi)| x.max(lo).min(hi);
    ScalarOp::new(expr, (lo, hi), func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Tensor, TensorError};
    use approx::assert_relative_eq;

    #[test]
    fn lifted_functions() -> Result<(), TensorError> {
        let x = Tensor::vector([0.25f64, 1.0, 4.0])?;
        let y = ln(exp(&x)).execute()?;
        for (a, b) in x.as_slice().iter().zip(y.as_slice()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        assert_eq!(sqrt(&x).execute()?.as_slice(), &[0.5, 1.0, 2.0]);
        assert_eq!(recip(&x).execute()?.as_slice(), &[4.0, 1.0, 0.25]);
        assert_eq!(log2(&x).execute()?.as_slice(), &[-2.0, 0.0, 2.0]);

        let identity = (sin(&x) * sin(&x)) + (cos(&x) * cos(&x));
        for value in identity.execute()?.as_slice() {
            assert_relative_eq!(*value, 1.0, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn rounding_and_sign() -> Result<(), TensorError> {
        let x = Tensor::vector([-1.5f32, -0.25, 0.5, 2.75])?;
        assert_eq!(floor(&x).execute()?.as_slice(), &[-2.0, -1.0, 0.0, 2.0]);
        assert_eq!(ceil(&x).execute()?.as_slice(), &[-1.0, -0.0, 1.0, 3.0]);
        assert_eq!(round(&x).execute()?.as_slice(), &[-2.0, -0.0, 1.0, 3.0]);
        assert_eq!(trunc(&x).execute()?.as_slice(), &[-1.0, -0.0, 0.0, 2.0]);
        assert_eq!(signum(&x).execute()?.as_slice(), &[-1.0, -1.0, 1.0, 1.0]);
        assert_eq!(abs(&x).sum(), 5.0);
        Ok(())
    }

    #[test]
    fn power_and_clamp() -> Result<(), TensorError> {
        let x = Tensor::vector([-2.0f64, 0.5, 3.0])?;
        assert_eq!(powf(&x, 2.0).execute()?.as_slice(), &[4.0, 0.25, 9.0]);
        assert_eq!(clamp(&x, -1.0, 1.0).execute()?.as_slice(), &[-1.0, 0.5, 1.0]);
        Ok(())
    }
}
