//! Operations for tensors.
//!
//! Arithmetic and bitwise operators build lazy [`Zip`], [`ScalarOp`] and [`Map`] nodes from
//! any tensor, view or expression, on either side of a scalar. Operator impls panic when
//! the shapes of two operands differ; the functions in this module perform the same
//! operations and report the mismatch as a [`TensorError`] instead.
//!
//! ```rust
//! use strata_tensor::{Tensor, TensorLike};
//!
//! let a = Tensor::vector([1.0f64, 2.0, 3.0]).unwrap();
//! let b = Tensor::vector([4.0f64, 5.0, 6.0]).unwrap();
//! let c = (&a + &b) * 0.5f64 - 1.0f64;
//! assert_eq!(c.execute().unwrap().as_slice(), &[1.5, 2.5, 3.5]);
//! assert_eq!((2.0f64 * &a).sum(), 12.0);
//! ```

use std::ops::{
    Add, AddAssign, BitAnd, BitOr, BitXor, Div, DivAssign, Mul, MulAssign, Neg, Not, Rem,
    RemAssign, Shl, Shr, Sub, SubAssign,
};

use crate::{
    allocator::TensorAllocator,
    expr::{map, zip, Diag, Fixed, Lambda, Map, Outer, ScalarOp, Sliced, Transpose, Zip},
    shape::equal_shapes,
    tensor::{Tensor, TensorError},
    tensor_like::{TensorLike, TensorLikeMut},
    view::{TensorView, TensorViewMut},
};

/// The value type of a rank `N` expression.
pub type ValueOf<E, const N: usize> = <E as TensorLike<N>>::Value;

/// Output of a binary operator between two expressions.
pub type BinaryExpr<A, B, O, const N: usize> =
    Zip<A, B, fn(ValueOf<A, N>, ValueOf<B, N>) -> O, N>;

/// Output of a binary operator between an expression and a scalar.
pub type ScalarExpr<E, S, O, const N: usize> = ScalarOp<E, S, fn(ValueOf<E, N>, S) -> O, N>;

/// Output of a unary operator.
pub type UnaryExpr<E, O, const N: usize> = Map<E, fn(ValueOf<E, N>) -> O, N>;

// Calls `$m!` once per expression node with its generics, type and rank.
macro_rules! for_each_node {
    ($m:ident!($($args:tt)*)) => {
        $m!([T, const N: usize, A: TensorAllocator] Tensor<T, N, A>; N; $($args)*);
        $m!(['a, T, const N: usize, A: TensorAllocator] &'a Tensor<T, N, A>; N; $($args)*);
        $m!(['a, T, const N: usize] TensorView<'a, T, N>; N; $($args)*);
        $m!([F, const N: usize] Lambda<F, N>; N; $($args)*);
        $m!([E, F, const N: usize] Map<E, F, N>; N; $($args)*);
        $m!([L, R, F, const N: usize] Zip<L, R, F, N>; N; $($args)*);
        $m!([E, S, F, const N: usize] ScalarOp<E, S, F, N>; N; $($args)*);
        $m!([E, const R: usize, const N: usize] Fixed<E, R, N>; N; $($args)*);
        $m!([E, const N: usize] Sliced<E, N>; N; $($args)*);
        $m!([E] Transpose<E>; 2; $($args)*);
        $m!([E] Diag<E>; 1; $($args)*);
        $m!([L, R, const M: usize, const K: usize, const N: usize] Outer<L, R, M, K, N>; N; $($args)*);
    };
}

macro_rules! binary_op {
    ([$($gen:tt)*] $node:ty; $rank:tt; $Op:ident $op:ident $sym:tt) => {
        impl<$($gen)*, Rhs> $Op<Rhs> for $node
        where
            Self: TensorLike<$rank>,
            Rhs: TensorLike<$rank>,
            ValueOf<Self, $rank>: $Op<ValueOf<Rhs, $rank>>,
        {
            type Output = BinaryExpr<
                Self,
                Rhs,
                <ValueOf<Self, $rank> as $Op<ValueOf<Rhs, $rank>>>::Output,
                $rank,
            >;

            /// # Panics
            ///
            /// Panics if the shapes of the operands differ.
            fn $op(self, rhs: Rhs) -> Self::Output {
                let func: fn(
                    ValueOf<Self, $rank>,
                    ValueOf<Rhs, $rank>,
                ) -> <ValueOf<Self, $rank> as $Op<ValueOf<Rhs, $rank>>>::Output = |a, b| a $sym b;
                match zip(self, rhs, func) {
                    Ok(expr) => expr,
                    Err(err) => panic!("{err}"),
                }
            }
        }
    };
}

macro_rules! scalar_rhs_op {
    ([$($gen:tt)*] $node:ty; $rank:tt; $Op:ident $op:ident $sym:tt; $s:ty) => {
        impl<$($gen)*> $Op<$s> for $node
        where
            Self: TensorLike<$rank>,
            ValueOf<Self, $rank>: $Op<$s>,
        {
            type Output = ScalarExpr<Self, $s, <ValueOf<Self, $rank> as $Op<$s>>::Output, $rank>;

            fn $op(self, rhs: $s) -> Self::Output {
                let func: fn(ValueOf<Self, $rank>, $s) -> <ValueOf<Self, $rank> as $Op<$s>>::Output =
                    |t, s| t $sym s;
                ScalarOp::new(self, rhs, func)
            }
        }
    };
}

macro_rules! scalar_lhs_op {
    ([$($gen:tt)*] $node:ty; $rank:tt; $Op:ident $op:ident $sym:tt; $s:ty) => {
        impl<$($gen)*> $Op<$node> for $s
        where
            $node: TensorLike<$rank>,
            $s: $Op<ValueOf<$node, $rank>>,
        {
            type Output = ScalarExpr<$node, $s, <$s as $Op<ValueOf<$node, $rank>>>::Output, $rank>;

            fn $op(self, rhs: $node) -> Self::Output {
                let func: fn(ValueOf<$node, $rank>, $s) -> <$s as $Op<ValueOf<$node, $rank>>>::Output =
                    |t, s| s $sym t;
                ScalarOp::new(rhs, self, func)
            }
        }
    };
}

macro_rules! unary_op {
    ([$($gen:tt)*] $node:ty; $rank:tt; $Op:ident $op:ident $sym:tt) => {
        impl<$($gen)*> $Op for $node
        where
            Self: TensorLike<$rank>,
            ValueOf<Self, $rank>: $Op,
        {
            type Output = UnaryExpr<Self, <ValueOf<Self, $rank> as $Op>::Output, $rank>;

            fn $op(self) -> Self::Output {
                let func: fn(ValueOf<Self, $rank>) -> <ValueOf<Self, $rank> as $Op>::Output =
                    |t| $sym t;
                map(self, func)
            }
        }
    };
}

macro_rules! binary_ops {
    ($($Op:ident $op:ident $sym:tt),*) => {
        $( for_each_node!(binary_op!($Op $op $sym)); )*
    };
}

macro_rules! scalar_ops {
    ($Op:ident $op:ident $sym:tt; $($s:ty),*) => {
        $(
            for_each_node!(scalar_rhs_op!($Op $op $sym; $s));
            for_each_node!(scalar_lhs_op!($Op $op $sym; $s));
        )*
    };
}

binary_ops!(
    Add add +, Sub sub -, Mul mul *, Div div /, Rem rem %,
    BitAnd bitand &, BitOr bitor |, BitXor bitxor ^, Shl shl <<, Shr shr >>
);

scalar_ops!(Add add +; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(Sub sub -; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(Mul mul *; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(Div div /; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(Rem rem %; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(BitAnd bitand &; bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(BitOr bitor |; bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(BitXor bitxor ^; bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(Shl shl <<; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
scalar_ops!(Shr shr >>; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

for_each_node!(unary_op!(Neg neg -));
for_each_node!(unary_op!(Not not !));

macro_rules! for_each_writable {
    ($m:ident!($($args:tt)*)) => {
        $m!([T, const N: usize, A: TensorAllocator] Tensor<T, N, A>; N; $($args)*);
        $m!(['a, T, const N: usize] TensorViewMut<'a, T, N>; N; $($args)*);
    };
}

// Compound assignment evaluates the right-hand side once per coordinate, in row-major order.
macro_rules! assign_op {
    ([$($gen:tt)*] $node:ty; $rank:tt; $Op:ident $op:ident $sym:tt) => {
        impl<$($gen)*, Rhs> $Op<Rhs> for $node
        where
            Self: TensorLikeMut<$rank>,
            Rhs: TensorLike<$rank>,
            ValueOf<Self, $rank>: $Op<ValueOf<Rhs, $rank>>,
        {
            /// # Panics
            ///
            /// Panics if the shapes of the operands differ.
            fn $op(&mut self, rhs: Rhs) {
                let shape = match equal_shapes(&self.shape(), &rhs.shape()) {
                    Ok(shape) => shape,
                    Err(err) => panic!("{err}"),
                };
                shape.for_each(|index| *self.access_mut(index) $sym rhs.access(index));
            }
        }
    };
}

macro_rules! assign_scalar_op {
    ([$($gen:tt)*] $node:ty; $rank:tt; $Op:ident $op:ident $sym:tt; $s:ty) => {
        impl<$($gen)*> $Op<$s> for $node
        where
            Self: TensorLikeMut<$rank>,
            ValueOf<Self, $rank>: $Op<$s>,
        {
            fn $op(&mut self, rhs: $s) {
                self.shape().for_each(|index| *self.access_mut(index) $sym rhs);
            }
        }
    };
}

macro_rules! assign_ops {
    ($Op:ident $op:ident $sym:tt; $($s:ty),*) => {
        for_each_writable!(assign_op!($Op $op $sym));
        $( for_each_writable!(assign_scalar_op!($Op $op $sym; $s)); )*
    };
}

assign_ops!(AddAssign add_assign +=; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
assign_ops!(SubAssign sub_assign -=; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
assign_ops!(MulAssign mul_assign *=; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
assign_ops!(DivAssign div_assign /=; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
assign_ops!(RemAssign rem_assign %=; f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Lazily adds two expressions.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn add<L, R, const N: usize>(
    lhs: L,
    rhs: R,
) -> Result<BinaryExpr<L, R, <ValueOf<L, N> as Add<ValueOf<R, N>>>::Output, N>, TensorError>
where
    L: TensorLike<N>,
    R: TensorLike<N>,
    ValueOf<L, N>: Add<ValueOf<R, N>>,
{
    let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> _ = |a, b| a + b;
    zip(lhs, rhs, func)
}

/// Lazily subtracts two expressions.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn sub<L, R, const N: usize>(
    lhs: L,
    rhs: R,
) -> Result<BinaryExpr<L, R, <ValueOf<L, N> as Sub<ValueOf<R, N>>>::Output, N>, TensorError>
where
    L: TensorLike<N>,
    R: TensorLike<N>,
    ValueOf<L, N>: Sub<ValueOf<R, N>>,
{
    let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> _ = |a, b| a - b;
    zip(lhs, rhs, func)
}

/// Lazily multiplies two expressions element-wise.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn mul<L, R, const N: usize>(
    lhs: L,
    rhs: R,
) -> Result<BinaryExpr<L, R, <ValueOf<L, N> as Mul<ValueOf<R, N>>>::Output, N>, TensorError>
where
    L: TensorLike<N>,
    R: TensorLike<N>,
    ValueOf<L, N>: Mul<ValueOf<R, N>>,
{
    let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> _ = |a, b| a * b;
    zip(lhs, rhs, func)
}

/// Lazily divides two expressions element-wise.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn div<L, R, const N: usize>(
    lhs: L,
    rhs: R,
) -> Result<BinaryExpr<L, R, <ValueOf<L, N> as Div<ValueOf<R, N>>>::Output, N>, TensorError>
where
    L: TensorLike<N>,
    R: TensorLike<N>,
    ValueOf<L, N>: Div<ValueOf<R, N>>,
{
    let func: fn(ValueOf<L, N>, ValueOf<R, N>) -> _ = |a, b| a / b;
    zip(lhs, rhs, func)
}

fn combine_inplace<L, R, const N: usize>(
    lhs: &mut L,
    rhs: &R,
    mut f: impl FnMut(&mut ValueOf<L, N>, ValueOf<R, N>),
) -> Result<(), TensorError>
where
    L: TensorLikeMut<N> + ?Sized,
    R: TensorLike<N> + ?Sized,
{
    let shape = equal_shapes(&lhs.shape(), &rhs.shape())?;
    shape.for_each(|index| f(lhs.access_mut(index), rhs.access(index)));
    Ok(())
}

/// Adds an expression to a tensor in-place.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ. Nothing is written in
/// that case.
pub fn add_inplace<L, R, const N: usize>(lhs: &mut L, rhs: &R) -> Result<(), TensorError>
where
    L: TensorLikeMut<N> + ?Sized,
    R: TensorLike<N> + ?Sized,
    ValueOf<L, N>: AddAssign<ValueOf<R, N>>,
{
    combine_inplace(lhs, rhs, |a, b| *a += b)
}

/// Subtracts an expression from a tensor in-place.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn sub_inplace<L, R, const N: usize>(lhs: &mut L, rhs: &R) -> Result<(), TensorError>
where
    L: TensorLikeMut<N> + ?Sized,
    R: TensorLike<N> + ?Sized,
    ValueOf<L, N>: SubAssign<ValueOf<R, N>>,
{
    combine_inplace(lhs, rhs, |a, b| *a -= b)
}

/// Multiplies a tensor by an expression element-wise in-place.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn mul_inplace<L, R, const N: usize>(lhs: &mut L, rhs: &R) -> Result<(), TensorError>
where
    L: TensorLikeMut<N> + ?Sized,
    R: TensorLike<N> + ?Sized,
    ValueOf<L, N>: MulAssign<ValueOf<R, N>>,
{
    combine_inplace(lhs, rhs, |a, b| *a *= b)
}

/// Divides a tensor by an expression element-wise in-place.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn div_inplace<L, R, const N: usize>(lhs: &mut L, rhs: &R) -> Result<(), TensorError>
where
    L: TensorLikeMut<N> + ?Sized,
    R: TensorLike<N> + ?Sized,
    ValueOf<L, N>: DivAssign<ValueOf<R, N>>,
{
    combine_inplace(lhs, rhs, |a, b| *a /= b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocator::CpuAllocator,
        expr::{identity, transpose},
    };

    #[test]
    fn test_add() -> Result<(), TensorError> {
        let a = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator)?;
        let b = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![5, 6, 7, 8], CpuAllocator)?;

        let c = add(&a, &b)?.execute()?;
        assert_eq!(c.as_slice(), &[6, 8, 10, 12]);
        assert_eq!((&a + &b).execute()?, c);
        Ok(())
    }

    #[test]
    fn test_add_inplace() -> Result<(), TensorError> {
        let mut a = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator)?;
        let b = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![5, 6, 7, 8], CpuAllocator)?;

        add_inplace(&mut a, &b)?;
        assert_eq!(a.as_slice(), &[6, 8, 10, 12]);

        let c = Tensor::<i32, 2, _>::zeros([2, 3], CpuAllocator)?;
        assert!(add_inplace(&mut a, &c).is_err());
        assert_eq!(a.as_slice(), &[6, 8, 10, 12]);
        Ok(())
    }

    #[test]
    fn test_sub() -> Result<(), TensorError> {
        let a = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![10, 12, 14, 16], CpuAllocator)?;
        let b = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![5, 6, 7, 8], CpuAllocator)?;

        let c = sub(&a, &b)?.execute()?;
        assert_eq!(c.as_slice(), &[5, 6, 7, 8]);
        assert_eq!((&a - &b).execute()?, c);
        Ok(())
    }

    #[test]
    fn test_sub_inplace() -> Result<(), TensorError> {
        let mut a = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![10, 12, 14, 16], CpuAllocator)?;
        let b = Tensor::<i32, 2, _>::from_shape_vec([2, 2], vec![5, 6, 7, 8], CpuAllocator)?;

        sub_inplace(&mut a, &b)?;
        assert_eq!(a.as_slice(), &[5, 6, 7, 8]);
        Ok(())
    }

    #[test]
    fn test_mul_div() -> Result<(), TensorError> {
        let a = Tensor::<f32, 2, _>::from_shape_vec([2, 2], vec![1.0, 2.0, 3.0, 4.0], CpuAllocator)?;
        let b = Tensor::<f32, 2, _>::from_shape_vec([2, 2], vec![2.0, 4.0, 6.0, 8.0], CpuAllocator)?;

        assert_eq!(mul(&a, &b)?.execute()?.as_slice(), &[2.0, 8.0, 18.0, 32.0]);
        assert_eq!(div(&b, &a)?.execute()?.as_slice(), &[2.0, 2.0, 2.0, 2.0]);

        let mut c = b.clone();
        div_inplace(&mut c, &a)?;
        mul_inplace(&mut c, &a)?;
        assert_eq!(c, b);
        Ok(())
    }

    #[test]
    fn nested_expressions() -> Result<(), TensorError> {
        let a = Tensor::vector([1.0f64, 2.0, 3.0])?;
        let b = Tensor::vector([3.0f64, 2.0, 1.0])?;
        let expr = (&a + &b) * &a - 1.0f64;
        assert_eq!(expr.execute()?.as_slice(), &[3.0, 7.0, 11.0]);
        assert_eq!(expr.sum(), 21.0);

        let m = Tensor::matrix([[1i32, 2], [3, 4]])?;
        let sym = transpose(&m) + &m;
        assert_eq!(sym.execute()?.as_slice(), &[2, 5, 5, 8]);
        let shifted = &m - identity::<i32, 2>([2, 2]) * 10i32;
        assert_eq!(shifted.execute()?.as_slice(), &[-9, 2, 3, -6]);
        Ok(())
    }

    #[test]
    fn scalars_on_both_sides() -> Result<(), TensorError> {
        let v = Tensor::vector([1i32, 2, 4])?;
        assert_eq!((10i32 - &v).execute()?.as_slice(), &[9, 8, 6]);
        assert_eq!((&v - 10i32).execute()?.as_slice(), &[-9, -8, -6]);
        assert_eq!((8i32 / &v).execute()?.as_slice(), &[8, 4, 2]);
        assert_eq!((&v % 2i32).execute()?.as_slice(), &[1, 0, 0]);

        let x = Tensor::vector([0.5f32, 1.0])?;
        assert_eq!((2.0f32 * &x).execute()?.as_slice(), &[1.0, 2.0]);
        assert_eq!((1.0f32 / x.view()).execute()?.as_slice(), &[2.0, 1.0]);
        Ok(())
    }

    #[test]
    fn bitwise_and_unary() -> Result<(), TensorError> {
        let v = Tensor::vector([1u8, 2, 3])?;
        assert_eq!((&v & 1u8).execute()?.as_slice(), &[1, 0, 1]);
        assert_eq!((&v << 2u8).execute()?.as_slice(), &[4, 8, 12]);
        assert_eq!((&v ^ &v).sum(), 0);
        assert_eq!((!&v).execute()?.as_slice(), &[254, 253, 252]);

        let w = Tensor::vector([1, -2])?;
        assert_eq!((-&w).execute()?.as_slice(), &[-1, 2]);

        let mask = Tensor::vector([true, false])?;
        assert_eq!((!&mask).execute()?.as_slice(), &[false, true]);
        assert_eq!((&mask | true).execute()?.as_slice(), &[true, true]);
        Ok(())
    }

    #[test]
    fn compound_assignment() -> Result<(), TensorError> {
        let mut a = Tensor::vector([1.0, 2.0])?;
        let b = Tensor::vector([0.5, 0.5])?;
        a += &b;
        a *= 2.0;
        a -= &b * 4.0;
        assert_eq!(a.as_slice(), &[1.0, 3.0]);

        let mut m = Tensor::matrix([[1, 2], [3, 4]])?;
        let mut t = m.view_mut().transposed();
        t += identity::<i32, 2>([2, 2]);
        t %= 3;
        assert_eq!(m.as_slice(), &[2, 2, 0, 2]);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn mismatched_operands_panic() {
        let a = Tensor::<i32, 1>::zeros([2], CpuAllocator);
        let b = Tensor::<i32, 1>::zeros([3], CpuAllocator);
        if let (Ok(a), Ok(b)) = (a, b) {
            let _ = &a + &b;
        }
    }

    #[test]
    #[should_panic]
    fn mismatched_assignment_panics() {
        if let (Ok(mut a), Ok(b)) = (
            Tensor::<i32, 1>::zeros([2], CpuAllocator),
            Tensor::<i32, 1>::zeros([3], CpuAllocator),
        ) {
            a += &b;
        }
    }
}
