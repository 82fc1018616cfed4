use std::ops::{Index, IndexMut};

use num_traits::{AsPrimitive, Zero};
use rand::{
    distr::{Distribution, StandardUniform},
    Rng,
};
use thiserror::Error;

use crate::{
    allocator::{CpuAllocator, TensorAllocator, TensorAllocatorError},
    index::IndexVector,
    shape::{Dim, Shape},
    storage::TensorStorage,
    tensor_like::{TensorLike, TensorLikeMut},
    view::{TensorView, TensorViewMut},
};

/// Error type for tensor operations.
///
/// This enum reports failures of tensor creation, shape manipulation and lazy expression
/// construction.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// A buffer holds a different number of values than its shape's total size.
    ///
    /// `from_shape_vec([2, 3], ..)` with five values and adopting raw parts of the wrong
    /// length both end here. Values are never padded or dropped to fit.
    #[error("Shape holds {expected} values, data has {actual}")]
    InvalidShape {
        /// Total size of the shape
        expected: usize,
        /// Length of the data
        actual: usize,
    },

    /// Two shapes that must agree differ on some axis.
    ///
    /// Elementwise expressions, assignment and the square-matrix checks of the
    /// decompositions all require equal shapes. Shapes are never broadcast or truncated.
    ///
    /// # Recommended Actions
    /// - Compare both shapes with `TensorLike::shape`
    /// - Slice or resize one operand explicitly before combining
    #[error("Shapes differ: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Extents of the first shape
        expected: Vec<usize>,
        /// Extents of the second shape
        actual: Vec<usize>,
    },

    /// A row, column, axis or coordinate lies past the end of its range.
    #[error("Index {index} is past an extent of {size}")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Extent it was checked against
        size: usize,
    },

    /// An argument is invalid for the requested operation.
    ///
    /// # Examples
    /// - Resizing an axis whose extent is fixed
    /// - Dropping the same axis twice
    /// - A static slice running past the end of an axis
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The heap buffer behind a large tensor could not be obtained.
    #[error("Allocation failed: {0}")]
    StorageError(#[from] TensorAllocatorError),
}

impl TensorError {
    /// A [`TensorError::InvalidShape`] for a shape of `expected` values.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// A [`TensorError::IndexOutOfBounds`].
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a ShapeMismatch error from two lists of extents.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

/// A data structure to represent a multi-dimensional tensor.
///
/// The values are stored contiguously in row-major order. The shape records, per axis,
/// whether the extent is fixed or may change on resize.
///
/// # Attributes
///
/// * `storage` - The storage of the tensor.
/// * `shape` - The shape of the tensor.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{CpuAllocator, Tensor, TensorLike};
///
/// let data: Vec<u8> = vec![1, 2, 3, 4];
/// let t = Tensor::<u8, 2>::from_shape_vec([2, 2], data, CpuAllocator).unwrap();
/// assert_eq!(t.shape().sizes(), [2, 2]);
/// assert_eq!(t[[1, 0]], 3);
/// ```
pub struct Tensor<T, const N: usize, A: TensorAllocator = CpuAllocator> {
    storage: TensorStorage<T, A>,
    shape: Shape<N>,
}

impl<T, const N: usize, A: TensorAllocator> Tensor<T, N, A> {
    /// Get the data of the tensor as a slice, in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Get the data of the tensor as a mutable slice, in row-major order.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Consumes the tensor and returns the underlying vector.
    pub fn into_vec(self) -> Vec<T> {
        self.storage.into_vec()
    }

    /// Returns the underlying storage.
    #[inline]
    pub fn storage(&self) -> &TensorStorage<T, A> {
        &self.storage
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns a reference to the element at the given index, or `None` if out of bounds.
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        if !self.shape.contains(&index) {
            return None;
        }
        self.storage.as_slice().get(self.shape.linearize(&index))
    }

    /// Returns a mutable reference to the element at the given index, or `None` if out
    /// of bounds.
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        if !self.shape.contains(&index) {
            return None;
        }
        let offset = self.shape.linearize(&index);
        self.storage.as_mut_slice().get_mut(offset)
    }

    /// Returns a strided view over the whole tensor.
    pub fn view(&self) -> TensorView<'_, T, N> {
        TensorView::contiguous(self.storage.as_slice(), self.shape)
    }

    /// Returns a writable strided view over the whole tensor.
    pub fn view_mut(&mut self) -> TensorViewMut<'_, T, N> {
        let shape = self.shape;
        TensorViewMut::contiguous(self.storage.as_mut_slice(), shape)
    }
}

impl<T, const N: usize, A> Tensor<T, N, A>
where
    T: Clone + Default,
    A: TensorAllocator,
{
    /// Creates a new `Tensor` with the given shape and data.
    ///
    /// # Arguments
    ///
    /// * `shape` - The shape of the tensor, either a [`Shape`] or a plain array of
    ///   extents (all dynamic).
    /// * `data` - The values in row-major order.
    /// * `alloc` - The allocator used for large buffers.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an
    /// error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_tensor::{CpuAllocator, Tensor, TensorLike};
    ///
    /// let t = Tensor::<u8, 2>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator).unwrap();
    /// assert_eq!(t.shape().sizes(), [2, 2]);
    /// ```
    pub fn from_shape_vec(shape: impl Into<Shape<N>>, data: Vec<T>, alloc: A) -> Result<Self, TensorError> {
        let shape = shape.into();
        let numel = shape.total_size();
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        let storage = TensorStorage::from_vec(data, alloc)?;
        Ok(Self { storage, shape })
    }

    /// Creates a new `Tensor` with the given shape and slice of data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor, an
    /// error is returned.
    pub fn from_shape_slice(shape: impl Into<Shape<N>>, data: &[T], alloc: A) -> Result<Self, TensorError> {
        Self::from_shape_vec(shape, data.to_vec(), alloc)
    }

    /// Creates a new `Tensor` that takes ownership of externally allocated memory.
    ///
    /// Small buffers are copied into inline storage and released immediately; large
    /// buffers are adopted without copying.
    ///
    /// # Safety
    ///
    /// See [`TensorStorage::from_raw_parts`]; `len` must equal the shape's total size.
    pub unsafe fn from_raw_parts(
        shape: impl Into<Shape<N>>,
        data: *mut T,
        len: usize,
        alloc: A,
    ) -> Result<Self, TensorError> {
        let shape = shape.into();
        if shape.total_size() != len {
            return Err(TensorError::invalid_shape(shape.total_size(), len));
        }
        let storage = TensorStorage::from_raw_parts(data, len, alloc)?;
        Ok(Self { storage, shape })
    }

    /// Creates a new `Tensor` with the given shape, filled with `value`.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_tensor::{CpuAllocator, Tensor};
    ///
    /// let t = Tensor::<u8, 3>::from_shape_val([2, 1, 3], 2, CpuAllocator).unwrap();
    /// assert_eq!(t.as_slice(), vec![2, 2, 2, 2, 2, 2]);
    /// ```
    pub fn from_shape_val(shape: impl Into<Shape<N>>, value: T, alloc: A) -> Result<Self, TensorError> {
        let shape = shape.into();
        let storage = TensorStorage::with_len(shape.total_size(), value, alloc)?;
        Ok(Self { storage, shape })
    }

    /// Create a new `Tensor` with the given shape and a function to generate the data.
    ///
    /// The function `f` is called with the index of each element in row-major order.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_tensor::{CpuAllocator, Tensor};
    ///
    /// let t = Tensor::<u8, 2>::from_shape_fn([2, 2], CpuAllocator, |[i, j]| (i * 2 + j) as u8).unwrap();
    /// assert_eq!(t.as_slice(), vec![0, 1, 2, 3]);
    /// ```
    pub fn from_shape_fn<F>(shape: impl Into<Shape<N>>, alloc: A, mut f: F) -> Result<Self, TensorError>
    where
        F: FnMut([usize; N]) -> T,
    {
        let shape = shape.into();
        let mut data = Vec::with_capacity(shape.total_size());
        shape.for_each(|index| data.push(f(index.into_array())));
        Self::from_shape_vec(shape, data, alloc)
    }

    /// Creates a new `Tensor` filled with zeros.
    pub fn zeros(shape: impl Into<Shape<N>>, alloc: A) -> Result<Self, TensorError>
    where
        T: Zero,
    {
        Self::from_shape_val(shape, T::zero(), alloc)
    }

    /// Evaluates an expression into a new tensor of the same shape.
    pub fn from_expr<E>(expr: &E, alloc: A) -> Result<Self, TensorError>
    where
        E: TensorLike<N, Value = T> + ?Sized,
    {
        let shape = expr.shape();
        let mut data = Vec::with_capacity(shape.total_size());
        shape.for_each(|index| data.push(expr.access(index)));
        Self::from_shape_vec(shape, data, alloc)
    }

    /// Builds a tensor of `shape` from an expression that may have another shape.
    ///
    /// Dynamic axes of `shape` take the expression's extent. Fixed axes keep theirs; on
    /// those the common region is copied and the rest is default-filled.
    pub fn convert_from<E>(shape: impl Into<Shape<N>>, expr: &E, alloc: A) -> Result<Self, TensorError>
    where
        E: TensorLike<N, Value = T> + ?Sized,
    {
        let mut shape = shape.into();
        let source = expr.shape();
        let mut sizes = shape.sizes();
        for (k, size) in sizes.iter_mut().enumerate() {
            if !shape.is_fixed(k) {
                *size = source.size(k);
            }
        }
        shape.resize(sizes)?;
        let mut out = Self::from_shape_val(shape, T::default(), alloc)?;
        let common = shape.elementwise_min(&source);
        let storage = out.storage.as_mut_slice();
        common.for_each(|index| storage[shape.linearize(&index)] = expr.access(index));
        Ok(out)
    }

    /// Creates a tensor of uniformly distributed random values.
    ///
    /// Floats are drawn from `[0, 1)`, integers from their whole range.
    pub fn from_random<R>(shape: impl Into<Shape<N>>, rng: &mut R, alloc: A) -> Result<Self, TensorError>
    where
        R: Rng + ?Sized,
        StandardUniform: Distribution<T>,
    {
        Self::from_shape_fn(shape, alloc, |_| rng.random())
    }

    /// Resizes every axis, keeping the values of the common region.
    ///
    /// New elements are default-filled.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidArgument`] if a fixed axis would change extent.
    pub fn resize(&mut self, sizes: [usize; N]) -> Result<(), TensorError> {
        let mut shape = self.shape;
        shape.resize(sizes)?;
        self.on_resize(shape)
    }

    /// Resizes to the extents of another shape.
    ///
    /// # Errors
    ///
    /// Same as [`Tensor::resize`].
    pub fn resize_like(&mut self, other: &Shape<N>) -> Result<(), TensorError> {
        self.resize(other.sizes())
    }

    /// Resizes only the dynamic axes, in axis order.
    ///
    /// # Errors
    ///
    /// See [`Shape::resize_dynamic`].
    pub fn resize_dynamic(&mut self, sizes: &[usize]) -> Result<(), TensorError> {
        let mut shape = self.shape;
        shape.resize_dynamic(sizes)?;
        self.on_resize(shape)
    }

    fn on_resize(&mut self, shape: Shape<N>) -> Result<(), TensorError> {
        let old = self.shape;
        if old.sizes() == shape.sizes() {
            self.shape = shape;
            return Ok(());
        }
        // row-major prefix is preserved when only the leading axis changes
        if old.sizes().iter().skip(1).eq(shape.sizes().iter().skip(1)) {
            self.storage.resize(shape.total_size())?;
            self.shape = shape;
            return Ok(());
        }
        let mut data = vec![T::default(); shape.total_size()];
        let values = self.storage.as_slice();
        old.elementwise_min(&shape).for_each(|index| {
            data[shape.linearize(&index)] = values[old.linearize(&index)].clone();
        });
        self.storage = TensorStorage::from_vec(data, self.storage.alloc().clone())?;
        self.shape = shape;
        Ok(())
    }

    /// Apply a function to each element of the tensor, eagerly.
    pub fn map<U, F>(&self, f: F) -> Result<Tensor<U, N, A>, TensorError>
    where
        U: Clone + Default,
        F: Fn(&T) -> U,
    {
        let data = self.as_slice().iter().map(f).collect();
        Tensor::from_shape_vec(self.shape, data, self.storage.alloc().clone())
    }

    /// Cast the tensor to a new type, eagerly.
    pub fn cast<U>(&self) -> Result<Tensor<U, N, A>, TensorError>
    where
        T: AsPrimitive<U>,
        U: Copy + Default + 'static,
    {
        self.map(|value| value.as_())
    }

    /// Replaces the tensor with an expression computed from itself.
    ///
    /// The expression is fully evaluated before any value is written, so it may read any
    /// element of the tensor regardless of the order of the writes.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the expression's shape differs.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_tensor::{expr::transpose, Tensor, TensorLike};
    ///
    /// let mut m = Tensor::matrix([[1, 2], [3, 4]]).unwrap();
    /// m.update(|m| Box::new(m + transpose(m))).unwrap();
    /// assert_eq!(m.as_slice(), &[2, 5, 5, 8]);
    /// ```
    pub fn update<F>(&mut self, f: F) -> Result<(), TensorError>
    where
        F: for<'x> FnOnce(&'x Self) -> Box<dyn TensorLike<N, Value = T> + 'x>,
    {
        let computed = {
            let expr = f(self);
            Tensor::<T, N>::from_expr(&*expr, CpuAllocator)?
        };
        self.assign(&computed)
    }
}

impl<T: Clone + Default> Tensor<T, 1, CpuAllocator> {
    /// Creates a vector with a fixed length from an array literal.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_tensor::{Tensor, TensorLike};
    ///
    /// let v = Tensor::vector([1.0, 2.0, 3.0]).unwrap();
    /// assert!(v.shape().is_static());
    /// ```
    pub fn vector<const K: usize>(values: [T; K]) -> Result<Self, TensorError> {
        Self::from_shape_vec(Shape::fixed([K]), values.to_vec(), CpuAllocator)
    }
}

impl<T: Clone + Default> Tensor<T, 2, CpuAllocator> {
    /// Creates a matrix with fixed extents from nested array literals, one per row.
    pub fn matrix<const R: usize, const C: usize>(rows: [[T; C]; R]) -> Result<Self, TensorError> {
        let data = rows.iter().flat_map(|row| row.iter().cloned()).collect();
        Self::from_shape_vec(Shape::fixed([R, C]), data, CpuAllocator)
    }

    /// Stacks vectors of equal length as the rows of a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the vectors differ in length.
    pub fn from_rows<E: TensorLike<1, Value = T>>(rows: &[E]) -> Result<Self, TensorError> {
        let cols = rows.first().map_or(0, |row| row.size(0));
        for row in rows {
            if row.size(0) != cols {
                return Err(TensorError::shape_mismatch(&[cols], &[row.size(0)]));
            }
        }
        Self::from_shape_fn([rows.len(), cols], CpuAllocator, |[i, j]| rows[i].at([j]))
    }

    /// Stacks vectors of equal length as the columns of a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::ShapeMismatch`] if the vectors differ in length.
    pub fn from_cols<E: TensorLike<1, Value = T>>(cols: &[E]) -> Result<Self, TensorError> {
        let rows = cols.first().map_or(0, |col| col.size(0));
        for col in cols {
            if col.size(0) != rows {
                return Err(TensorError::shape_mismatch(&[rows], &[col.size(0)]));
            }
        }
        Self::from_shape_fn([rows, cols.len()], CpuAllocator, |[i, j]| cols[j].at([i]))
    }
}

impl<T, A> Tensor<T, 1, A>
where
    T: Clone + Default,
    A: TensorAllocator,
{
    /// Returns a copy of the vector with `value` added at the end.
    pub fn append(&self, value: T) -> Result<Self, TensorError> {
        let len = self.numel() + 1;
        let dim = if self.shape.is_fixed(0) {
            Dim::Fixed(len)
        } else {
            Dim::Dynamic(len)
        };
        let mut data = self.as_slice().to_vec();
        data.push(value);
        Self::from_shape_vec(Shape::new([dim]), data, self.storage.alloc().clone())
    }

    /// Adds `value` at the end of a vector with a dynamic length.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidArgument`] if the length is fixed.
    pub fn push(&mut self, value: T) -> Result<(), TensorError> {
        let len = self.numel();
        self.resize([len + 1])?;
        self.storage.as_mut_slice()[len] = value;
        Ok(())
    }

    /// Sorts the values in ascending order. Incomparable values keep their relative order.
    pub fn sort_in_place(&mut self)
    where
        T: PartialOrd,
    {
        self.storage
            .as_mut_slice()
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    }
}

impl<T: Clone, const N: usize, A: TensorAllocator> TensorLike<N> for Tensor<T, N, A> {
    type Value = T;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> T {
        debug_assert!(self.shape.contains(&index), "index {index:?} outside {:?}", self.shape.sizes());
        self.storage.as_slice()[self.shape.linearize(&index)].clone()
    }
}

impl<T: Clone, const N: usize, A: TensorAllocator> TensorLikeMut<N> for Tensor<T, N, A> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut T {
        debug_assert!(self.shape.contains(&index), "index {index:?} outside {:?}", self.shape.sizes());
        let offset = self.shape.linearize(&index);
        &mut self.storage.as_mut_slice()[offset]
    }
}

impl<T, const N: usize, A: TensorAllocator> Index<[usize; N]> for Tensor<T, N, A> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        assert!(self.shape.contains(&index), "index {index:?} outside {:?}", self.shape.sizes());
        &self.storage.as_slice()[self.shape.linearize(&index)]
    }
}

impl<T, const N: usize, A: TensorAllocator> IndexMut<[usize; N]> for Tensor<T, N, A> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        assert!(self.shape.contains(&index), "index {index:?} outside {:?}", self.shape.sizes());
        let offset = self.shape.linearize(&index);
        &mut self.storage.as_mut_slice()[offset]
    }
}

impl<T, const N: usize, A> Default for Tensor<T, N, A>
where
    T: Default,
    A: TensorAllocator + Default,
{
    /// An empty tensor; a rank-0 tensor holds a single default value.
    fn default() -> Self {
        let storage = if N == 0 {
            TensorStorage::scalar(T::default(), A::default())
        } else {
            TensorStorage::new(A::default())
        };
        Self {
            storage,
            shape: Shape::default(),
        }
    }
}

impl<T, const N: usize, A> Clone for Tensor<T, N, A>
where
    T: Clone + Default,
    A: TensorAllocator,
{
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            shape: self.shape,
        }
    }
}

impl<T: std::fmt::Debug, const N: usize, A: TensorAllocator> std::fmt::Debug for Tensor<T, N, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.as_slice())
            .finish()
    }
}

impl<T: PartialEq, const N: usize, A: TensorAllocator> PartialEq for Tensor<T, N, A> {
    /// Tensors are equal when their extents and values match; fixed flags are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.shape.sizes() == other.shape.sizes() && self.as_slice() == other.as_slice()
    }
}

impl<T, const N: usize, A> std::fmt::Display for Tensor<T, N, A>
where
    T: std::fmt::Display,
    A: TensorAllocator,
{
    /// Writes nested brackets with one innermost row per line and values right-aligned
    /// to a common width. A precision such as `{:.3}` applies to every value.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cells: Vec<String> = self
            .as_slice()
            .iter()
            .map(|v| match f.precision() {
                Some(p) => format!("{v:.p$}"),
                None => v.to_string(),
            })
            .collect();
        if N == 0 {
            return f.write_str(cells.first().map_or("", String::as_str));
        }
        if cells.is_empty() {
            return write!(f, "{}{}", "[".repeat(N), "]".repeat(N));
        }

        let width = cells.iter().map(String::len).max().unwrap_or(0);
        let sizes = self.shape.sizes();
        let mut out = String::new();
        let mut cells = cells.iter();
        self.shape.for_each(|index| {
            let index = index.into_array();
            let opening = index.iter().rev().take_while(|&&i| i == 0).count();
            let closing = index
                .iter()
                .zip(sizes.iter())
                .rev()
                .take_while(|&(&i, &size)| i + 1 == size)
                .count();
            out.push_str(&"[".repeat(opening));
            if let Some(cell) = cells.next() {
                out.push_str(&format!("{cell:>width$}"));
            }
            out.push_str(&"]".repeat(closing));
            match closing {
                c if c == N => {}
                0 => out.push_str(", "),
                c => {
                    out.push(',');
                    out.push_str(&"\n".repeat(c));
                    out.push_str(&" ".repeat(N - c));
                }
            }
        });
        f.write_str(&out)
    }
}
