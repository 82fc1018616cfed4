use crate::{
    allocator::CpuAllocator,
    index::IndexVector,
    shape::Shape,
    tensor::{Tensor, TensorError},
    tensor_like::{TensorLike, TensorLikeMut},
};

/// A non-owning view into tensor data.
///
/// `TensorView` reads from a borrowed slice through an offset and per-axis signed
/// strides ("skips"). Negative or exchanged skips express reversed or transposed
/// layouts without copying.
///
/// # Lifetime
///
/// The view borrows the data for its lifetime `'a`, ensuring the underlying values
/// remain valid while the view exists.
///
/// # Examples
///
/// Viewing every other value of a buffer as a 2x2 matrix:
///
/// ```rust
/// use strata_tensor::{view::TensorView, TensorLike};
///
/// let data = [1, 0, 2, 0, 3, 0, 4, 0];
/// let view = TensorView::from_parts(&data, 0, [2, 2], [4, 2]).unwrap();
/// assert_eq!(view.at([1, 0]), 3);
/// assert_eq!(view.transposed().to_tensor().unwrap().as_slice(), &[1, 3, 2, 4]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TensorView<'a, T, const N: usize> {
    data: &'a [T],
    offset: usize,
    shape: Shape<N>,
    skips: [isize; N],
}

/// A writable, non-owning view into tensor data.
///
/// The mutable counterpart of [`TensorView`], with the same addressing rules.
#[derive(Debug)]
pub struct TensorViewMut<'a, T, const N: usize> {
    data: &'a mut [T],
    offset: usize,
    shape: Shape<N>,
    skips: [isize; N],
}

/// Checks that every coordinate of `shape` maps inside `len` values.
fn check_layout<const N: usize>(
    len: usize,
    offset: usize,
    shape: &Shape<N>,
    skips: &[isize; N],
) -> Result<(), TensorError> {
    if shape.is_empty() {
        return Ok(());
    }
    let (mut lowest, mut highest) = (offset as isize, offset as isize);
    for (size, skip) in shape.sizes().iter().zip(skips.iter()) {
        let reach = (*size as isize - 1) * skip;
        if reach < 0 {
            lowest += reach;
        } else {
            highest += reach;
        }
    }
    if lowest < 0 {
        return Err(TensorError::InvalidArgument(format!(
            "view reaches {lowest} before the start of the data"
        )));
    }
    if highest as usize >= len {
        return Err(TensorError::index_out_of_bounds(highest as usize, len));
    }
    Ok(())
}

#[inline]
fn locate<const N: usize>(offset: usize, skips: &[isize; N], index: &IndexVector<N>) -> usize {
    let mut position = offset as isize;
    for (i, skip) in index.iter().zip(skips.iter()) {
        position += *i as isize * skip;
    }
    position as usize
}

impl<'a, T, const N: usize> TensorView<'a, T, N> {
    /// Creates a view from its parts.
    ///
    /// # Arguments
    ///
    /// * `data` - The viewed values.
    /// * `offset` - The position of the zero coordinate in `data`.
    /// * `shape` - The extents of the view.
    /// * `skips` - The signed distance in `data` between neighbours along each axis.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate of the view falls outside `data`.
    pub fn from_parts(
        data: &'a [T],
        offset: usize,
        shape: impl Into<Shape<N>>,
        skips: [isize; N],
    ) -> Result<Self, TensorError> {
        let shape = shape.into();
        check_layout(data.len(), offset, &shape, &skips)?;
        Ok(Self {
            data,
            offset,
            shape,
            skips,
        })
    }

    /// A row-major view over contiguous values whose length matches the shape.
    pub(crate) fn contiguous(data: &'a [T], shape: Shape<N>) -> Self {
        Self {
            data,
            offset: 0,
            shape,
            skips: shape.skips(),
        }
    }

    /// Returns the per-axis skips.
    pub fn skips(&self) -> [isize; N] {
        self.skips
    }

    /// Returns the same values with `axis` traversed in reverse.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `axis` is out of range.
    pub fn flipped(mut self, axis: usize) -> Result<Self, TensorError> {
        if axis >= N {
            return Err(TensorError::index_out_of_bounds(axis, N));
        }
        let size = self.shape.size(axis);
        if size > 0 {
            self.offset = (self.offset as isize + (size as isize - 1) * self.skips[axis]) as usize;
        }
        self.skips[axis] = -self.skips[axis];
        Ok(self)
    }

    /// Copies the viewed values into a new contiguous tensor.
    pub fn to_tensor(&self) -> Result<Tensor<T, N>, TensorError>
    where
        T: Clone + Default,
    {
        Tensor::from_expr(self, CpuAllocator)
    }
}

impl<T> TensorView<'_, T, 2> {
    /// Returns the view with its two axes exchanged.
    pub fn transposed(mut self) -> Self {
        self.shape = self.shape.swapped(0, 1);
        self.skips.swap(0, 1);
        self
    }
}

impl<T: Clone, const N: usize> TensorLike<N> for TensorView<'_, T, N> {
    type Value = T;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> T {
        self.data[locate(self.offset, &self.skips, &index)].clone()
    }
}

impl<'a, T, const N: usize> TensorViewMut<'a, T, N> {
    /// Creates a writable view from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate of the view falls outside `data`.
    pub fn from_parts(
        data: &'a mut [T],
        offset: usize,
        shape: impl Into<Shape<N>>,
        skips: [isize; N],
    ) -> Result<Self, TensorError> {
        let shape = shape.into();
        check_layout(data.len(), offset, &shape, &skips)?;
        Ok(Self {
            data,
            offset,
            shape,
            skips,
        })
    }

    pub(crate) fn contiguous(data: &'a mut [T], shape: Shape<N>) -> Self {
        Self {
            data,
            offset: 0,
            shape,
            skips: shape.skips(),
        }
    }

    /// Returns a read-only view of the same values.
    pub fn as_view(&self) -> TensorView<'_, T, N> {
        TensorView {
            data: self.data,
            offset: self.offset,
            shape: self.shape,
            skips: self.skips,
        }
    }

    /// Returns the same values with `axis` traversed in reverse.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if `axis` is out of range.
    pub fn flipped(mut self, axis: usize) -> Result<Self, TensorError> {
        if axis >= N {
            return Err(TensorError::index_out_of_bounds(axis, N));
        }
        let size = self.shape.size(axis);
        if size > 0 {
            self.offset = (self.offset as isize + (size as isize - 1) * self.skips[axis]) as usize;
        }
        self.skips[axis] = -self.skips[axis];
        Ok(self)
    }
}

impl<T> TensorViewMut<'_, T, 2> {
    /// Returns the view with its two axes exchanged.
    pub fn transposed(mut self) -> Self {
        self.shape = self.shape.swapped(0, 1);
        self.skips.swap(0, 1);
        self
    }
}

impl<T: Clone, const N: usize> TensorLike<N> for TensorViewMut<'_, T, N> {
    type Value = T;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> T {
        self.data[locate(self.offset, &self.skips, &index)].clone()
    }
}

impl<T: Clone, const N: usize> TensorLikeMut<N> for TensorViewMut<'_, T, N> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut T {
        &mut self.data[locate(self.offset, &self.skips, &index)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_view() -> Result<(), TensorError> {
        let data: Vec<u8> = (0..12).collect();
        let view = TensorView::from_parts(&data, 1, [2, 3], [6, 2])?;
        assert_eq!(view.to_tensor()?.as_slice(), &[1, 3, 5, 7, 9, 11]);
        assert_eq!(view.at([1, 1]), 9);
        Ok(())
    }

    #[test]
    fn out_of_range_layout() {
        let data = [0u8; 6];
        assert!(TensorView::from_parts(&data, 0, [2, 3], [3, 1]).is_ok());
        assert!(TensorView::from_parts(&data, 1, [2, 3], [3, 1]).is_err());
        assert!(TensorView::from_parts(&data, 0, [2, 3], [-3, 1]).is_err());
        assert!(TensorView::from_parts(&data, 3, [2, 3], [-3, 1]).is_ok());
        assert!(TensorView::from_parts(&data, 9, [0, 3], [3, 1]).is_ok());
    }

    #[test]
    fn transposed_and_flipped() -> Result<(), TensorError> {
        let m = Tensor::matrix([[1, 2, 3], [4, 5, 6]])?;
        let t = m.view().transposed();
        assert_eq!(t.shape().sizes(), [3, 2]);
        assert_eq!(t.to_tensor()?.as_slice(), &[1, 4, 2, 5, 3, 6]);
        let f = m.view().flipped(1)?;
        assert_eq!(f.to_tensor()?.as_slice(), &[3, 2, 1, 6, 5, 4]);
        let ff = m.view().flipped(0)?.flipped(1)?;
        assert_eq!(ff.to_tensor()?.as_slice(), &[6, 5, 4, 3, 2, 1]);
        assert_eq!(ff.skips(), [-3, -1]);
        assert!(m.view().flipped(2).is_err());
        Ok(())
    }

    #[test]
    fn write_through_view() -> Result<(), TensorError> {
        let mut m = Tensor::<i32, 2>::zeros([2, 2], CpuAllocator)?;
        {
            let mut t = m.view_mut().transposed();
            t.assign_values(&[1, 2, 3, 4]);
            assert_eq!(t.as_view().at([0, 1]), 2);
        }
        assert_eq!(m.as_slice(), &[1, 3, 2, 4]);

        let mut data = [0; 4];
        let mut reversed = TensorViewMut::from_parts(&mut data, 0, [4], [1])?.flipped(0)?;
        reversed.assign_values(&[1, 2, 3, 4]);
        assert_eq!(data, [4, 3, 2, 1]);
        Ok(())
    }

    #[test]
    fn views_combine_with_expressions() -> Result<(), TensorError> {
        let a = Tensor::vector([1, 2, 3])?;
        let b = Tensor::vector([10, 20, 30])?;
        let sum = a.view() + b.view().flipped(0)?;
        assert_eq!(sum.execute()?.as_slice(), &[31, 22, 13]);
        Ok(())
    }
}
