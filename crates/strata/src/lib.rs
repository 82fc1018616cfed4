#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use strata_tensor as tensor;

#[doc(inline)]
pub use strata_linalg as linalg;
