//! The floating-point scalars the algorithms run on, and their numeric limits.

use std::fmt::Debug;

use num_traits::{Float, NumCast};

/// A real floating-point value usable in the decompositions.
///
/// Implemented for every `Float` that is also `Default` and `Debug`, i.e. `f32` and `f64`.
pub trait Real: Float + Default + Debug + 'static {
    /// The gap between one and the next representable value.
    #[inline]
    fn eps() -> Self {
        Self::epsilon()
    }

    /// The smallest positive value that can be divided into one without overflow.
    #[inline]
    fn min_inv() -> Self {
        let four = Self::one() + Self::one() + Self::one() + Self::one();
        Self::min_positive_value() / four + Self::min_positive_value() * Self::epsilon()
    }

    /// The smallest positive value that can be squared without underflow.
    #[inline]
    fn min_sqr() -> Self {
        (Self::min_positive_value() * Self::epsilon()).sqrt()
    }

    /// `1` or `-1`, following the sign bit, so that `sign(0) == 1`.
    #[inline]
    fn sign(self) -> Self {
        Self::one().copysign(self)
    }

    /// Converts a small integer constant.
    #[inline]
    fn from_usize(n: usize) -> Self {
        <Self as NumCast>::from(n).unwrap_or_else(Self::max_value)
    }
}

impl<T: Float + Default + Debug + 'static> Real for T {}
