//! The shared interface of tensors, views and lazy expressions.
//!
//! [`TensorLike`] needs only a shape and a per-coordinate accessor; reductions, lazy
//! sub-expressions and materialization come for free. [`TensorLikeMut`] adds writable
//! access and the in-place operations built on it.

use std::ops::{Add, Mul};

use crate::{
    allocator::CpuAllocator,
    expr::{Fixed, Sliced},
    index::IndexVector,
    shape::{equal_shapes, Shape},
    slice::SliceLike,
    tensor::{Tensor, TensorError},
};

/// A value with a shape of rank `N` that yields one value per coordinate.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{Tensor, TensorLike};
///
/// let m = Tensor::matrix([[1, 2, 3], [4, 5, 6]]).unwrap();
/// assert_eq!(m.rows(), 2);
/// assert_eq!(m.sum(), 21);
/// assert_eq!(m.row(1).unwrap().execute().unwrap().as_slice(), &[4, 5, 6]);
/// ```
pub trait TensorLike<const N: usize> {
    /// The element type yielded by [`TensorLike::access`].
    type Value;

    /// Returns the shape.
    fn shape(&self) -> Shape<N>;

    /// Returns the value at a coordinate.
    ///
    /// The coordinate must lie inside [`TensorLike::shape`]; out-of-range coordinates
    /// may panic or alias other elements depending on the implementation.
    fn access(&self, index: IndexVector<N>) -> Self::Value;

    /// Returns the value at a coordinate given as an array.
    #[inline]
    fn at(&self, index: [usize; N]) -> Self::Value {
        self.access(IndexVector(index))
    }

    /// The extent of one axis.
    fn size(&self, axis: usize) -> usize {
        self.shape().size(axis)
    }

    /// The extent of the first axis.
    fn rows(&self) -> usize
    where
        Self: Sized,
    {
        self.shape().rows()
    }

    /// The extent of the second axis.
    fn cols(&self) -> usize
    where
        Self: Sized,
    {
        self.shape().cols()
    }

    /// The number of coordinates.
    fn total_size(&self) -> usize {
        self.shape().total_size()
    }

    /// Whether the expression holds no coordinates.
    fn is_empty(&self) -> bool {
        self.shape().is_empty()
    }

    /// Left-folds every value in row-major order.
    ///
    /// The first value seeds the accumulator; an empty expression folds to
    /// `Value::default()`.
    fn fold<F>(&self, mut f: F) -> Self::Value
    where
        Self: Sized,
        Self::Value: Default,
        F: FnMut(Self::Value, Self::Value) -> Self::Value,
    {
        let mut acc: Option<Self::Value> = None;
        self.shape().for_each(|index| {
            let value = self.access(index);
            acc = Some(match acc.take() {
                Some(prev) => f(prev, value),
                None => value,
            });
        });
        acc.unwrap_or_default()
    }

    /// Sum of all values, `Value::default()` when empty.
    fn sum(&self) -> Self::Value
    where
        Self: Sized,
        Self::Value: Default + Add<Output = Self::Value>,
    {
        self.fold(|a, b| a + b)
    }

    /// Product of all values, `Value::default()` when empty.
    fn product(&self) -> Self::Value
    where
        Self: Sized,
        Self::Value: Default + Mul<Output = Self::Value>,
    {
        self.fold(|a, b| a * b)
    }

    /// Whether any value is true. Stops at the first true value.
    fn any_true(&self) -> bool
    where
        Self::Value: Into<bool>,
    {
        !self.shape().for_each_while(|index| !self.access(index).into())
    }

    /// Whether every value is true. Stops at the first false value.
    fn all_true(&self) -> bool
    where
        Self::Value: Into<bool>,
    {
        self.shape().for_each_while(|index| self.access(index).into())
    }

    /// The coordinate of the first smallest value, or the zero coordinate when empty.
    fn argmin(&self) -> IndexVector<N>
    where
        Self::Value: PartialOrd,
    {
        self.arg_best(|candidate, best| candidate < best)
    }

    /// The coordinate of the first largest value, or the zero coordinate when empty.
    fn argmax(&self) -> IndexVector<N>
    where
        Self::Value: PartialOrd,
    {
        self.arg_best(|candidate, best| candidate > best)
    }

    #[doc(hidden)]
    fn arg_best(&self, better: fn(&Self::Value, &Self::Value) -> bool) -> IndexVector<N> {
        let mut best: Option<(IndexVector<N>, Self::Value)> = None;
        self.shape().for_each(|index| {
            let value = self.access(index);
            let replace = match &best {
                Some((_, current)) => better(&value, current),
                None => true,
            };
            if replace {
                best = Some((index, value));
            }
        });
        best.map(|(index, _)| index).unwrap_or_default()
    }

    /// Materializes the expression into a new tensor.
    ///
    /// This is the point where a lazy expression is evaluated, once per coordinate.
    fn execute(&self) -> Result<Tensor<Self::Value, N>, TensorError>
    where
        Self::Value: Clone + Default,
    {
        Tensor::from_expr(self, CpuAllocator)
    }

    /// A lazy view with one axis pinned to `index`, of rank `M = N - 1`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if the axis or index is out of range.
    fn fix<const M: usize>(&self, axis: usize, index: usize) -> Result<Fixed<&Self, N, M>, TensorError>
    where
        Self: Sized,
    {
        Fixed::new(self, axis, index)
    }

    /// A lazy view of row `i` of a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `i` is not a valid row.
    fn row(&self, i: usize) -> Result<Fixed<&Self, N, 1>, TensorError>
    where
        Self: Sized,
    {
        Fixed::new(self, 0, i)
    }

    /// A lazy view of column `j` of a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `j` is not a valid column.
    fn col(&self, j: usize) -> Result<Fixed<&Self, N, 1>, TensorError>
    where
        Self: Sized,
    {
        Fixed::new(self, 1, j)
    }

    /// A lazy view restricting one axis to a slice.
    ///
    /// # Errors
    ///
    /// See [`Shape::bind`].
    fn slice<S: SliceLike>(&self, axis: usize, slice: S) -> Result<Sliced<&Self, N>, TensorError>
    where
        Self: Sized,
    {
        Sliced::new(self, axis, &slice)
    }

    /// A lazy view of the leading square block of a matrix.
    fn linear(&self) -> Sliced<&Self, N>
    where
        Self: Sized,
    {
        let shape = self.shape();
        Sliced::leading_square(self, shape)
    }
}

/// A [`TensorLike`] whose values can be written in place.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{Tensor, TensorLike, TensorLikeMut};
///
/// let mut m = Tensor::matrix([[1, 2], [3, 4]]).unwrap();
/// m.transpose_in_place().unwrap();
/// m.row_mut(0).unwrap().fill(0);
/// assert_eq!(m.as_slice(), &[0, 0, 2, 4]);
/// ```
pub trait TensorLikeMut<const N: usize>: TensorLike<N> {
    /// Returns a mutable reference to the value at a coordinate.
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut Self::Value;

    /// Returns a mutable reference to the value at a coordinate given as an array.
    #[inline]
    fn at_mut(&mut self, index: [usize; N]) -> &mut Self::Value {
        self.access_mut(IndexVector(index))
    }

    /// Copies every value of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the shapes differ. Nothing is written in
    /// that case.
    fn assign<E>(&mut self, other: E) -> Result<(), TensorError>
    where
        Self: Sized,
        E: TensorLike<N, Value = Self::Value>,
    {
        let shape = equal_shapes(&self.shape(), &other.shape())?;
        shape.for_each(|index| *self.access_mut(index) = other.access(index));
        Ok(())
    }

    /// Writes `value` to every coordinate.
    fn fill(&mut self, value: Self::Value)
    where
        Self::Value: Clone,
    {
        self.shape()
            .for_each(|index| *self.access_mut(index) = value.clone());
    }

    /// Writes values from a flat list in row-major order.
    ///
    /// Only `min(values.len(), total_size())` values are written.
    fn assign_values(&mut self, values: &[Self::Value])
    where
        Self::Value: Clone,
    {
        let mut source = values.iter();
        self.shape().for_each_while(|index| match source.next() {
            Some(value) => {
                *self.access_mut(index) = value.clone();
                true
            }
            None => false,
        });
    }

    /// Writes a matrix from a list of rows, clipped to the common extent.
    fn assign_rows(&mut self, rows: &[&[Self::Value]])
    where
        Self: Sized,
        Self::Value: Clone,
    {
        const { assert!(N == 2, "assign_rows needs a matrix") };
        let (nrows, ncols) = (self.rows(), self.cols());
        for (i, row) in rows.iter().enumerate().take(nrows) {
            for (j, value) in row.iter().enumerate().take(ncols) {
                let mut index = IndexVector::<N>::default();
                index[0] = i;
                index[1] = j;
                *self.access_mut(index) = value.clone();
            }
        }
    }

    /// Exchanges every value with the matching value of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
    fn swap_in_place<E>(&mut self, other: &mut E) -> Result<(), TensorError>
    where
        Self: Sized,
        E: TensorLikeMut<N, Value = Self::Value>,
    {
        let shape = equal_shapes(&self.shape(), &other.shape())?;
        shape.for_each(|index| std::mem::swap(self.access_mut(index), other.access_mut(index)));
        Ok(())
    }

    /// Exchanges rows `i` and `j` of a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if a row is out of range.
    fn swap_rows_in_place(&mut self, i: usize, j: usize) -> Result<(), TensorError>
    where
        Self: Sized,
    {
        self.swap_lines(0, i, j)
    }

    /// Exchanges columns `i` and `j` of a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if a column is out of range.
    fn swap_cols_in_place(&mut self, i: usize, j: usize) -> Result<(), TensorError>
    where
        Self: Sized,
    {
        self.swap_lines(1, i, j)
    }

    #[doc(hidden)]
    fn swap_lines(&mut self, axis: usize, i: usize, j: usize) -> Result<(), TensorError>
    where
        Self: Sized,
    {
        const { assert!(N == 2, "row and column swaps need a matrix") };
        let len = self.size(axis);
        for k in [i, j] {
            if k >= len {
                return Err(TensorError::index_out_of_bounds(k, len));
            }
        }
        if i == j {
            return Ok(());
        }
        let other = 1 - axis;
        for k in 0..self.size(other) {
            let mut a = IndexVector::<N>::default();
            a[axis] = i;
            a[other] = k;
            let mut b = a;
            b[axis] = j;
            let va = self.access(a);
            let vb = self.access(b);
            *self.access_mut(a) = vb;
            *self.access_mut(b) = va;
        }
        Ok(())
    }

    /// Transposes a square matrix in place.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the matrix is not square.
    fn transpose_in_place(&mut self) -> Result<(), TensorError>
    where
        Self: Sized,
    {
        const { assert!(N == 2, "transpose_in_place needs a matrix") };
        let shape = self.shape();
        let n = equal_shapes(&shape.take::<1>([0])?, &shape.take::<1>([1])?)?.size(0);
        for i in 0..n {
            for j in (i + 1)..n {
                let mut a = IndexVector::<N>::default();
                a[0] = i;
                a[1] = j;
                let mut b = IndexVector::<N>::default();
                b[0] = j;
                b[1] = i;
                let va = self.access(a);
                let vb = self.access(b);
                *self.access_mut(a) = vb;
                *self.access_mut(b) = va;
            }
        }
        Ok(())
    }

    /// A writable view with one axis pinned to `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if the axis or index is out of range.
    fn fix_mut<const M: usize>(
        &mut self,
        axis: usize,
        index: usize,
    ) -> Result<Fixed<&mut Self, N, M>, TensorError>
    where
        Self: Sized,
    {
        Fixed::new(self, axis, index)
    }

    /// A writable view of row `i`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `i` is not a valid row.
    fn row_mut(&mut self, i: usize) -> Result<Fixed<&mut Self, N, 1>, TensorError>
    where
        Self: Sized,
    {
        Fixed::new(self, 0, i)
    }

    /// A writable view of column `j`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `j` is not a valid column.
    fn col_mut(&mut self, j: usize) -> Result<Fixed<&mut Self, N, 1>, TensorError>
    where
        Self: Sized,
    {
        Fixed::new(self, 1, j)
    }

    /// A writable view restricting one axis to a slice.
    ///
    /// # Errors
    ///
    /// See [`Shape::bind`].
    fn slice_mut<S: SliceLike>(
        &mut self,
        axis: usize,
        slice: S,
    ) -> Result<Sliced<&mut Self, N>, TensorError>
    where
        Self: Sized,
    {
        Sliced::new(self, axis, &slice)
    }

    /// A writable view of the leading square block of a matrix.
    fn linear_mut(&mut self) -> Sliced<&mut Self, N>
    where
        Self: Sized,
    {
        let shape = self.shape();
        Sliced::leading_square(self, shape)
    }
}

impl<E: TensorLike<N> + ?Sized, const N: usize> TensorLike<N> for &E {
    type Value = E::Value;

    #[inline]
    fn shape(&self) -> Shape<N> {
        (**self).shape()
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> Self::Value {
        (**self).access(index)
    }
}

impl<E: TensorLike<N> + ?Sized, const N: usize> TensorLike<N> for &mut E {
    type Value = E::Value;

    #[inline]
    fn shape(&self) -> Shape<N> {
        (**self).shape()
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> Self::Value {
        (**self).access(index)
    }
}

impl<E: TensorLikeMut<N> + ?Sized, const N: usize> TensorLikeMut<N> for &mut E {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut Self::Value {
        (**self).access_mut(index)
    }
}

impl<E: TensorLike<N> + ?Sized, const N: usize> TensorLike<N> for Box<E> {
    type Value = E::Value;

    #[inline]
    fn shape(&self) -> Shape<N> {
        (**self).shape()
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> Self::Value {
        (**self).access(index)
    }
}

impl<E: TensorLikeMut<N> + ?Sized, const N: usize> TensorLikeMut<N> for Box<E> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut Self::Value {
        (**self).access_mut(index)
    }
}
