//! Tensor shapes with a per-axis fixed or dynamic extent.
//!
//! The rank of a [`Shape`] is a const generic, so rank mismatches are compile errors.
//! Each axis additionally records whether its extent is *fixed* (known when the value was
//! built, e.g. from a literal `[[T; C]; R]`) or *dynamic* (free to change on resize).
//! Fixed axes refuse to resize to a different extent, and [`equal_shapes`] merges two
//! shapes into the most fixed combination of both.

use crate::{index::IndexVector, slice::SliceLike, TensorError};

/// The extent of one axis when building a [`Shape`] axis by axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim {
    /// An extent that never changes.
    Fixed(usize),
    /// An extent resolved at runtime, with its current value.
    Dynamic(usize),
}

/// Computes the strides for a row-major (C-contiguous) layout.
///
/// The rightmost dimension has stride 1 and each dimension's stride is the product of
/// all dimensions to its right.
///
/// # Examples
///
/// ```rust
/// use strata_tensor::shape::get_strides_from_shape;
///
/// assert_eq!(get_strides_from_shape([2, 3]), [3, 1]);
/// assert_eq!(get_strides_from_shape([2, 3, 4]), [12, 4, 1]);
/// ```
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// The per-axis extents of a tensor of rank `N`.
///
/// # Examples
///
/// ```rust
/// use strata_tensor::{Dim, Shape};
///
/// let shape = Shape::new([Dim::Dynamic(0), Dim::Fixed(3)]);
/// assert_eq!(shape.sizes(), [0, 3]);
/// assert_eq!(shape.dynamic_rank(), 1);
///
/// let mut shape = shape;
/// shape.resize([4, 3]).unwrap();
/// assert_eq!(shape.total_size(), 12);
/// assert!(shape.resize([4, 2]).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape<const N: usize> {
    sizes: [usize; N],
    fixed: [bool; N],
}

impl<const N: usize> Default for Shape<N> {
    fn default() -> Self {
        Self::dynamic([0; N])
    }
}

impl<const N: usize> From<[usize; N]> for Shape<N> {
    /// Shapes built from plain arrays are dynamic on every axis.
    fn from(sizes: [usize; N]) -> Self {
        Self::dynamic(sizes)
    }
}

impl<const N: usize> Shape<N> {
    /// Creates a shape from per-axis extents.
    pub fn new(dims: [Dim; N]) -> Self {
        let mut sizes = [0; N];
        let mut fixed = [false; N];
        for (k, dim) in dims.iter().enumerate() {
            match *dim {
                Dim::Fixed(size) => {
                    sizes[k] = size;
                    fixed[k] = true;
                }
                Dim::Dynamic(size) => sizes[k] = size,
            }
        }
        Self { sizes, fixed }
    }

    /// Creates a shape whose axes are all fixed.
    pub fn fixed(sizes: [usize; N]) -> Self {
        Self {
            sizes,
            fixed: [true; N],
        }
    }

    /// Creates a shape whose axes are all dynamic.
    pub fn dynamic(sizes: [usize; N]) -> Self {
        Self {
            sizes,
            fixed: [false; N],
        }
    }

    /// The number of axes.
    #[inline]
    pub const fn rank(&self) -> usize {
        N
    }

    /// The number of dynamic axes.
    pub fn dynamic_rank(&self) -> usize {
        self.fixed.iter().filter(|fixed| !**fixed).count()
    }

    /// Whether every axis is fixed.
    pub fn is_static(&self) -> bool {
        self.fixed.iter().all(|fixed| *fixed)
    }

    /// Whether the given axis is fixed.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= N`.
    #[inline]
    pub fn is_fixed(&self, axis: usize) -> bool {
        self.fixed[axis]
    }

    /// The extents of all axes.
    #[inline]
    pub fn sizes(&self) -> [usize; N] {
        self.sizes
    }

    /// The extent of one axis.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= N`.
    #[inline]
    pub fn size(&self, axis: usize) -> usize {
        self.sizes[axis]
    }

    /// The extent of the first axis.
    #[inline]
    pub fn rows(&self) -> usize {
        const { assert!(N >= 1, "rows() needs at least one axis") };
        self.sizes[0]
    }

    /// The extent of the second axis.
    #[inline]
    pub fn cols(&self) -> usize {
        const { assert!(N >= 2, "cols() needs at least two axes") };
        self.sizes[1]
    }

    /// The number of coordinates, i.e. the product of all extents.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Whether the shape holds no coordinates.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_size() == 0
    }

    /// Row-major strides of a contiguous layout.
    pub fn strides(&self) -> [usize; N] {
        get_strides_from_shape(self.sizes)
    }

    /// Row-major strides as signed skips, the form used by strided views.
    pub fn skips(&self) -> [isize; N] {
        self.strides().map(|stride| stride as isize)
    }

    /// Maps a coordinate to its row-major offset.
    ///
    /// The coordinate is not bounds-checked; see [`Shape::contains`].
    #[inline]
    pub fn linearize(&self, index: &[usize; N]) -> usize {
        let mut offset = 0;
        for k in 0..N {
            offset = self.sizes[k] * offset + index[k];
        }
        offset
    }

    /// Maps a row-major offset back to its coordinate.
    pub fn delinearize(&self, mut offset: usize) -> IndexVector<N> {
        let mut index = IndexVector::<N>::default();
        for k in (0..N).rev() {
            let size = self.sizes[k].max(1);
            index[k] = offset % size;
            offset /= size;
        }
        index
    }

    /// Whether a coordinate lies inside the shape.
    pub fn contains(&self, index: &[usize; N]) -> bool {
        index.iter().zip(self.sizes.iter()).all(|(i, size)| i < size)
    }

    /// Resizes every axis.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidArgument`] if a fixed axis would change extent.
    /// The shape is left untouched in that case.
    pub fn resize(&mut self, sizes: [usize; N]) -> Result<(), TensorError> {
        for k in 0..N {
            if self.fixed[k] && self.sizes[k] != sizes[k] {
                return Err(TensorError::InvalidArgument(format!(
                    "cannot resize fixed axis {k} from {} to {}",
                    self.sizes[k], sizes[k]
                )));
            }
        }
        self.sizes = sizes;
        Ok(())
    }

    /// Resizes a single axis.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] for an invalid axis and
    /// [`TensorError::InvalidArgument`] if a fixed axis would change extent.
    pub fn resize_axis(&mut self, axis: usize, size: usize) -> Result<(), TensorError> {
        if axis >= N {
            return Err(TensorError::index_out_of_bounds(axis, N));
        }
        let mut sizes = self.sizes;
        sizes[axis] = size;
        self.resize(sizes)
    }

    /// Resizes only the dynamic axes, in axis order.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidArgument`] unless exactly one size is given per
    /// dynamic axis.
    pub fn resize_dynamic(&mut self, sizes: &[usize]) -> Result<(), TensorError> {
        if sizes.len() != self.dynamic_rank() {
            return Err(TensorError::InvalidArgument(format!(
                "expected {} dynamic sizes, got {}",
                self.dynamic_rank(),
                sizes.len()
            )));
        }
        let mut next = sizes.iter();
        for k in 0..N {
            if !self.fixed[k] {
                if let Some(size) = next.next() {
                    self.sizes[k] = *size;
                }
            }
        }
        Ok(())
    }

    /// Resizes to the extents of another shape.
    ///
    /// # Errors
    ///
    /// Same as [`Shape::resize`].
    pub fn resize_like(&mut self, other: &Shape<N>) -> Result<(), TensorError> {
        self.resize(other.sizes)
    }

    /// Selects axes by position, keeping each axis' fixed flag.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if an axis is out of range.
    pub fn take<const M: usize>(&self, axes: [usize; M]) -> Result<Shape<M>, TensorError> {
        let mut sizes = [0; M];
        let mut fixed = [false; M];
        for (k, &axis) in axes.iter().enumerate() {
            if axis >= N {
                return Err(TensorError::index_out_of_bounds(axis, N));
            }
            sizes[k] = self.sizes[axis];
            fixed[k] = self.fixed[axis];
        }
        Ok(Shape { sizes, fixed })
    }

    /// Removes axes by position, keeping the rest in order.
    ///
    /// The output rank `M` must equal `N - K`, which is checked at compile time.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] for an axis out of range and
    /// [`TensorError::InvalidArgument`] when an axis is listed twice.
    pub fn drop<const K: usize, const M: usize>(
        &self,
        axes: [usize; K],
    ) -> Result<Shape<M>, TensorError> {
        const { assert!(M + K == N, "dropping K axes from rank N leaves rank N - K") };
        let mut dropped = [false; N];
        for &axis in axes.iter() {
            if axis >= N {
                return Err(TensorError::index_out_of_bounds(axis, N));
            }
            if dropped[axis] {
                return Err(TensorError::InvalidArgument(format!(
                    "axis {axis} dropped twice"
                )));
            }
            dropped[axis] = true;
        }
        let mut sizes = [0; M];
        let mut fixed = [false; M];
        let kept = (0..N).filter(|k| !dropped[*k]);
        for (slot, k) in kept.enumerate() {
            sizes[slot] = self.sizes[k];
            fixed[slot] = self.fixed[k];
        }
        Ok(Shape { sizes, fixed })
    }

    /// Concatenates the axes of two shapes.
    ///
    /// The output rank `O` must equal `N + M`, which is checked at compile time.
    pub fn append<const M: usize, const O: usize>(&self, other: &Shape<M>) -> Shape<O> {
        const { assert!(N + M == O, "appending ranks N and M gives rank N + M") };
        let mut sizes = [0; O];
        let mut fixed = [false; O];
        sizes[..N].copy_from_slice(&self.sizes);
        sizes[N..].copy_from_slice(&other.sizes);
        fixed[..N].copy_from_slice(&self.fixed);
        fixed[N..].copy_from_slice(&other.fixed);
        Shape { sizes, fixed }
    }

    /// Exchanges two axes.
    ///
    /// # Panics
    ///
    /// Panics if either axis is out of range.
    pub fn swapped(&self, a: usize, b: usize) -> Shape<N> {
        let mut out = *self;
        out.sizes.swap(a, b);
        out.fixed.swap(a, b);
        out
    }

    /// Adds two shapes axis by axis. An axis stays fixed only if both inputs fix it.
    pub fn plus(&self, other: &Shape<N>) -> Shape<N> {
        let mut out = *self;
        for k in 0..N {
            out.sizes[k] += other.sizes[k];
            out.fixed[k] &= other.fixed[k];
        }
        out
    }

    /// Applies a slice to one axis.
    ///
    /// A slice with a compile-time extent makes the axis fixed; otherwise the axis is
    /// fixed only when it was fixed before and the slice bounds are static.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] for an invalid axis and
    /// [`TensorError::InvalidArgument`] when a compile-time extent runs past the axis.
    pub fn bind<S: SliceLike>(&self, axis: usize, slice: &S) -> Result<Shape<N>, TensorError> {
        if axis >= N {
            return Err(TensorError::index_out_of_bounds(axis, N));
        }
        let mut out = *self;
        let size = self.sizes[axis];
        match slice.static_extent() {
            Some(extent) => {
                if slice.start() + extent > size {
                    return Err(TensorError::InvalidArgument(format!(
                        "slice [{}, {}) runs past axis {axis} of extent {size}",
                        slice.start(),
                        slice.start() + extent
                    )));
                }
                out.sizes[axis] = extent;
                out.fixed[axis] = true;
            }
            None => {
                out.sizes[axis] = slice.extent(size);
                out.fixed[axis] = self.fixed[axis] && slice.is_static();
            }
        }
        Ok(out)
    }

    /// Axis-wise minimum. An axis is fixed when both inputs fix it.
    pub fn elementwise_min(&self, other: &Shape<N>) -> Shape<N> {
        self.combine(other, usize::min)
    }

    /// Axis-wise maximum. An axis is fixed when both inputs fix it.
    pub fn elementwise_max(&self, other: &Shape<N>) -> Shape<N> {
        self.combine(other, usize::max)
    }

    fn combine(&self, other: &Shape<N>, f: fn(usize, usize) -> usize) -> Shape<N> {
        let mut out = *self;
        for k in 0..N {
            out.sizes[k] = f(self.sizes[k], other.sizes[k]);
            out.fixed[k] = self.fixed[k] && other.fixed[k];
        }
        out
    }

    /// Visits every coordinate in row-major order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(IndexVector<N>),
    {
        self.for_each_while(|index| {
            f(index);
            true
        });
    }

    /// Visits coordinates in row-major order until `f` returns `false`.
    ///
    /// # Returns
    ///
    /// `true` if every coordinate was visited, `false` if `f` stopped the walk early.
    pub fn for_each_while<F>(&self, mut f: F) -> bool
    where
        F: FnMut(IndexVector<N>) -> bool,
    {
        if self.is_empty() {
            return true;
        }
        let mut index = IndexVector::<N>::default();
        match self.sizes.as_slice() {
            [len] => {
                for i in 0..*len {
                    index.as_mut_slice()[0] = i;
                    if !f(index) {
                        return false;
                    }
                }
                true
            }
            [rows, cols] => {
                for i in 0..*rows {
                    for j in 0..*cols {
                        let slots = index.as_mut_slice();
                        slots[0] = i;
                        slots[1] = j;
                        if !f(index) {
                            return false;
                        }
                    }
                }
                true
            }
            _ => loop {
                if !f(index) {
                    return false;
                }
                if index.increment_in_place(&self.sizes) {
                    return true;
                }
            },
        }
    }
}

/// Checks that two shapes agree on every axis and merges them.
///
/// Ranks are checked at compile time. Extents are runtime values even on fixed axes, so
/// two fixed shapes that disagree are only reported here, never by the compiler. The
/// merged shape fixes an axis when either input fixes it.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] when any extent differs.
pub fn equal_shapes<const N: usize>(a: &Shape<N>, b: &Shape<N>) -> Result<Shape<N>, TensorError> {
    if a.sizes != b.sizes {
        return Err(TensorError::shape_mismatch(&a.sizes, &b.sizes));
    }
    let mut out = *a;
    for k in 0..N {
        out.fixed[k] = a.fixed[k] || b.fixed[k];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::{Slice, SliceToEnd, StaticSlice, TO_END};

    #[test]
    fn sizes_and_skips() {
        let shape = Shape::fixed([2, 3, 4]);
        assert_eq!(shape.total_size(), 24);
        assert_eq!(shape.strides(), [12, 4, 1]);
        assert_eq!(shape.skips(), [12, 4, 1]);
        assert_eq!(shape.linearize(&[1, 2, 3]), 23);
        assert_eq!(shape.delinearize(23), IndexVector([1, 2, 3]));
        assert!(shape.contains(&[1, 2, 3]));
        assert!(!shape.contains(&[2, 0, 0]));
    }

    #[test]
    fn dynamic_defaults_to_zero() {
        let shape = Shape::new([Dim::Dynamic(0), Dim::Fixed(3)]);
        assert_eq!(shape.sizes(), [0, 3]);
        assert!(shape.is_empty());
        assert!(!shape.is_static());
        assert_eq!(shape.dynamic_rank(), 1);
    }

    #[test]
    fn resize_respects_fixed_axes() -> Result<(), TensorError> {
        let mut shape = Shape::new([Dim::Dynamic(0), Dim::Fixed(3)]);
        shape.resize([5, 3])?;
        assert_eq!(shape.sizes(), [5, 3]);
        assert!(matches!(
            shape.resize([5, 4]),
            Err(TensorError::InvalidArgument(_))
        ));
        assert_eq!(shape.sizes(), [5, 3]);
        shape.resize_dynamic(&[7])?;
        assert_eq!(shape.sizes(), [7, 3]);
        assert!(shape.resize_dynamic(&[1, 2]).is_err());
        shape.resize_axis(0, 2)?;
        assert_eq!(shape.sizes(), [2, 3]);
        assert!(shape.resize_axis(1, 1).is_err());
        Ok(())
    }

    #[test]
    fn take_append_round_trip() -> Result<(), TensorError> {
        let shape = Shape::new([Dim::Fixed(2), Dim::Dynamic(3), Dim::Fixed(4)]);
        let front: Shape<1> = shape.take([0])?;
        let back: Shape<2> = shape.take([1, 2])?;
        let joined: Shape<3> = front.append(&back);
        assert_eq!(joined, shape);
        let rest: Shape<2> = shape.drop([1])?;
        assert_eq!(rest, Shape::fixed([2, 4]));
        assert!(shape.drop::<2, 1>([0, 0]).is_err());
        assert!(shape.take([3]).is_err());
        Ok(())
    }

    #[test]
    fn plus_propagates_dynamic() {
        let a = Shape::fixed([2, 3]);
        let b = Shape::fixed([4, 5]);
        assert_eq!(a.plus(&b), Shape::fixed([6, 8]));
        let c = Shape::new([Dim::Dynamic(1), Dim::Fixed(1)]);
        let sum = a.plus(&c);
        assert_eq!(sum.sizes(), [3, 4]);
        assert!(!sum.is_fixed(0));
        assert!(sum.is_fixed(1));
        let d: Shape<4> = a.append(&b);
        assert_eq!(d.sizes(), [2, 3, 4, 5]);
    }

    #[test]
    fn bind_slices() -> Result<(), TensorError> {
        let shape = Shape::fixed([4, 6]);
        let a = shape.bind(1, &StaticSlice::<1, 3>)?;
        assert_eq!(a, Shape::fixed([4, 2]));
        let b = shape.bind(1, &Slice::new(2, 10))?;
        assert_eq!(b.sizes(), [4, 4]);
        assert!(!b.is_fixed(1));
        let c = shape.bind(0, &StaticSlice::<1, TO_END>)?;
        assert_eq!(c, Shape::fixed([3, 6]));
        let d = shape.bind(0, &SliceToEnd::new(9))?;
        assert_eq!(d.sizes(), [0, 6]);
        assert!(shape.bind(0, &StaticSlice::<2, 7>).is_err());
        assert!(shape.bind(2, &Slice::full()).is_err());
        Ok(())
    }

    #[test]
    fn for_each_row_major() {
        let shape = Shape::fixed([2, 3]);
        let mut visited = Vec::new();
        shape.for_each(|index| visited.push(index.into_array()));
        assert_eq!(
            visited,
            vec![[0, 0], [0, 1], [0, 2], [1, 0], [1, 1], [1, 2]]
        );
    }

    #[test]
    fn for_each_higher_rank_and_early_stop() {
        let shape = Shape::fixed([2, 2, 2]);
        let mut count = 0;
        shape.for_each(|_| count += 1);
        assert_eq!(count, 8);

        let mut seen = Vec::new();
        let completed = shape.for_each_while(|index| {
            seen.push(index);
            index != IndexVector([0, 1, 1])
        });
        assert!(!completed);
        assert_eq!(seen.len(), 4);

        let empty = Shape::dynamic([0, 3]);
        assert!(empty.for_each_while(|_| false));

        let scalar = Shape::<0>::fixed([]);
        let mut visits = 0;
        scalar.for_each(|_| visits += 1);
        assert_eq!(visits, 1);
    }

    #[test]
    fn equal_shapes_merges() -> Result<(), TensorError> {
        let a = Shape::new([Dim::Fixed(2), Dim::Dynamic(3)]);
        let b = Shape::new([Dim::Dynamic(2), Dim::Fixed(3)]);
        let merged = equal_shapes(&a, &b)?;
        assert!(merged.is_static());
        let c = Shape::dynamic([2, 4]);
        assert!(matches!(
            equal_shapes(&a, &c),
            Err(TensorError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            equal_shapes(&Shape::fixed([3, 3]), &Shape::fixed([3, 4])),
            Err(TensorError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn min_max() {
        let a = Shape::fixed([2, 5]);
        let b = Shape::dynamic([3, 1]);
        assert_eq!(a.elementwise_min(&b).sizes(), [2, 1]);
        assert_eq!(a.elementwise_max(&b).sizes(), [3, 5]);
        assert!(!a.elementwise_min(&b).is_fixed(0));
        assert!(a.elementwise_max(&a).is_static());
    }
}
