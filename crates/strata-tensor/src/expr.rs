//! Lazy expression nodes.
//!
//! Every node implements [`TensorLike`] and evaluates on access; nothing is computed until
//! [`TensorLike::execute`] or an assignment walks the shape. Operands are captured by
//! value: pass `t` to move a tensor into the expression, or `&t` to borrow it so later
//! writes to `t` are observed by the expression.
//!
//! Nodes that only re-index their operand ([`Fixed`], [`Sliced`], [`Transpose`],
//! [`Diag`]) are writable whenever the operand is.

use std::ops::Mul;

use num_traits::{AsPrimitive, One, Zero};

use crate::{
    index::IndexVector,
    shape::{equal_shapes, Dim, Shape},
    slice::SliceLike,
    tensor::TensorError,
    tensor_like::{TensorLike, TensorLikeMut},
};

/// A shape paired with a function from coordinates to values.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{expr::Lambda, TensorLike};
///
/// let grid = Lambda::new([2, 3], |index: strata_tensor::IndexVector<2>| index[0] * 10 + index[1]);
/// assert_eq!(grid.at([1, 2]), 12);
/// ```
#[derive(Clone, Copy)]
pub struct Lambda<F, const N: usize> {
    shape: Shape<N>,
    func: F,
}

impl<F, const N: usize> Lambda<F, N> {
    /// Creates an expression evaluating `func` over `shape`.
    pub fn new(shape: impl Into<Shape<N>>, func: F) -> Self {
        Self {
            shape: shape.into(),
            func,
        }
    }
}

impl<F, V, const N: usize> TensorLike<N> for Lambda<F, N>
where
    F: Fn(IndexVector<N>) -> V,
{
    type Value = V;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> V {
        (self.func)(index)
    }
}

/// Applies a function to every value of an expression.
#[derive(Clone, Copy)]
pub struct Map<E, F, const N: usize> {
    inner: E,
    func: F,
}

impl<E, F, V, const N: usize> TensorLike<N> for Map<E, F, N>
where
    E: TensorLike<N>,
    F: Fn(E::Value) -> V,
{
    type Value = V;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.inner.shape()
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> V {
        (self.func)(self.inner.access(index))
    }
}

/// Combines two expressions of equal shape value by value.
#[derive(Clone, Copy)]
pub struct Zip<A, B, F, const N: usize> {
    lhs: A,
    rhs: B,
    func: F,
    shape: Shape<N>,
}

impl<A, B, F, V, const N: usize> TensorLike<N> for Zip<A, B, F, N>
where
    A: TensorLike<N>,
    B: TensorLike<N>,
    F: Fn(A::Value, B::Value) -> V,
{
    type Value = V;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> V {
        (self.func)(self.lhs.access(index), self.rhs.access(index))
    }
}

/// Combines every value of an expression with one scalar.
#[derive(Clone, Copy)]
pub struct ScalarOp<E, S, F, const N: usize> {
    inner: E,
    scalar: S,
    func: F,
}

impl<E, S, F, const N: usize> ScalarOp<E, S, F, N> {
    /// Creates the node; `func` receives the expression value first and the scalar second.
    pub fn new(inner: E, scalar: S, func: F) -> Self {
        Self {
            inner,
            scalar,
            func,
        }
    }
}

impl<E, S, F, V, const N: usize> TensorLike<N> for ScalarOp<E, S, F, N>
where
    E: TensorLike<N>,
    S: Clone,
    F: Fn(E::Value, S) -> V,
{
    type Value = V;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.inner.shape()
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> V {
        (self.func)(self.inner.access(index), self.scalar.clone())
    }
}

/// A rank `N` view of a rank `R = N + 1` expression with one axis pinned.
#[derive(Clone, Copy)]
pub struct Fixed<E, const R: usize, const N: usize> {
    inner: E,
    axis: usize,
    index: usize,
    shape: Shape<N>,
}

impl<E: TensorLike<R>, const R: usize, const N: usize> Fixed<E, R, N> {
    /// Pins `axis` of `inner` to `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::IndexOutOfBounds`] if the axis or index is out of range.
    pub fn new(inner: E, axis: usize, index: usize) -> Result<Self, TensorError> {
        let outer = inner.shape();
        if axis >= R {
            return Err(TensorError::index_out_of_bounds(axis, R));
        }
        if index >= outer.size(axis) {
            return Err(TensorError::index_out_of_bounds(index, outer.size(axis)));
        }
        let shape = outer.drop::<1, N>([axis])?;
        Ok(Self {
            inner,
            axis,
            index,
            shape,
        })
    }

    #[inline]
    fn expand(&self, index: IndexVector<N>) -> IndexVector<R> {
        let mut full = IndexVector::<R>::default();
        let mut source = index.iter();
        for (k, slot) in full.iter_mut().enumerate() {
            *slot = if k == self.axis {
                self.index
            } else {
                source.next().copied().unwrap_or_default()
            };
        }
        full
    }
}

impl<E: TensorLike<R>, const R: usize, const N: usize> TensorLike<N> for Fixed<E, R, N> {
    type Value = E::Value;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> E::Value {
        self.inner.access(self.expand(index))
    }
}

impl<E: TensorLikeMut<R>, const R: usize, const N: usize> TensorLikeMut<N> for Fixed<E, R, N> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut E::Value {
        let full = self.expand(index);
        self.inner.access_mut(full)
    }
}

/// A rectangular sub-block of an expression.
#[derive(Clone, Copy)]
pub struct Sliced<E, const N: usize> {
    inner: E,
    offset: [usize; N],
    shape: Shape<N>,
}

impl<E: TensorLike<N>, const N: usize> Sliced<E, N> {
    /// Restricts `axis` of `inner` to `slice`.
    ///
    /// # Errors
    ///
    /// See [`Shape::bind`].
    pub fn new<S: SliceLike>(inner: E, axis: usize, slice: &S) -> Result<Self, TensorError> {
        let shape = inner.shape().bind(axis, slice)?;
        let mut offset = [0; N];
        offset[axis] = slice.start();
        Ok(Self {
            inner,
            offset,
            shape,
        })
    }

    pub(crate) fn leading_square(inner: E, outer: Shape<N>) -> Self {
        const { assert!(N == 2, "the leading square block needs a matrix") };
        let n = outer.rows().min(outer.cols());
        let dim = if outer.is_static() {
            Dim::Fixed(n)
        } else {
            Dim::Dynamic(n)
        };
        Self {
            inner,
            offset: [0; N],
            shape: Shape::new([dim; N]),
        }
    }

    #[inline]
    fn source(&self, index: IndexVector<N>) -> IndexVector<N> {
        let mut source = index;
        for (slot, offset) in source.iter_mut().zip(self.offset.iter()) {
            *slot += offset;
        }
        source
    }
}

impl<E: TensorLike<N>, const N: usize> TensorLike<N> for Sliced<E, N> {
    type Value = E::Value;

    #[inline]
    fn shape(&self) -> Shape<N> {
        self.shape
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> E::Value {
        self.inner.access(self.source(index))
    }
}

impl<E: TensorLikeMut<N>, const N: usize> TensorLikeMut<N> for Sliced<E, N> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<N>) -> &mut E::Value {
        let source = self.source(index);
        self.inner.access_mut(source)
    }
}

/// A matrix with its two axes exchanged, or passed through unchanged.
#[derive(Clone, Copy)]
pub struct Transpose<E> {
    inner: E,
    swap: bool,
}

impl<E> Transpose<E> {
    #[inline]
    fn source(&self, index: IndexVector<2>) -> IndexVector<2> {
        if self.swap {
            IndexVector([index[1], index[0]])
        } else {
            index
        }
    }
}

impl<E: TensorLike<2>> TensorLike<2> for Transpose<E> {
    type Value = E::Value;

    fn shape(&self) -> Shape<2> {
        let shape = self.inner.shape();
        if self.swap {
            shape.swapped(0, 1)
        } else {
            shape
        }
    }

    #[inline]
    fn access(&self, index: IndexVector<2>) -> E::Value {
        self.inner.access(self.source(index))
    }
}

impl<E: TensorLikeMut<2>> TensorLikeMut<2> for Transpose<E> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<2>) -> &mut E::Value {
        let source = self.source(index);
        self.inner.access_mut(source)
    }
}

/// The main diagonal of a matrix, of length `min(rows, cols)`.
#[derive(Clone, Copy)]
pub struct Diag<E> {
    inner: E,
}

impl<E: TensorLike<2>> TensorLike<1> for Diag<E> {
    type Value = E::Value;

    fn shape(&self) -> Shape<1> {
        let shape = self.inner.shape();
        let n = shape.rows().min(shape.cols());
        if shape.is_static() {
            Shape::fixed([n])
        } else {
            Shape::dynamic([n])
        }
    }

    #[inline]
    fn access(&self, index: IndexVector<1>) -> E::Value {
        self.inner.access(IndexVector([index[0], index[0]]))
    }
}

impl<E: TensorLikeMut<2>> TensorLikeMut<1> for Diag<E> {
    #[inline]
    fn access_mut(&mut self, index: IndexVector<1>) -> &mut E::Value {
        self.inner.access_mut(IndexVector([index[0], index[0]]))
    }
}

/// The tensor product of a rank `M` and a rank `K` expression, of rank `N = M + K`.
#[derive(Clone, Copy)]
pub struct Outer<A, B, const M: usize, const K: usize, const N: usize> {
    lhs: A,
    rhs: B,
}

impl<A, B, const M: usize, const K: usize, const N: usize> TensorLike<N> for Outer<A, B, M, K, N>
where
    A: TensorLike<M>,
    B: TensorLike<K>,
    A::Value: Mul<B::Value>,
{
    type Value = <A::Value as Mul<B::Value>>::Output;

    fn shape(&self) -> Shape<N> {
        self.lhs.shape().append(&self.rhs.shape())
    }

    #[inline]
    fn access(&self, index: IndexVector<N>) -> Self::Value {
        let mut a = IndexVector::<M>::default();
        let mut b = IndexVector::<K>::default();
        a.copy_from_slice(&index[..M]);
        b.copy_from_slice(&index[M..]);
        self.lhs.access(a) * self.rhs.access(b)
    }
}

/// Lazily applies `func` to every value of `expr`.
pub fn map<E, F, V, const N: usize>(expr: E, func: F) -> Map<E, F, N>
where
    E: TensorLike<N>,
    F: Fn(E::Value) -> V,
{
    Map { inner: expr, func }
}

/// Lazily combines two expressions of equal shape.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{expr::zip, Tensor, TensorLike};
///
/// let a = Tensor::vector([1, 2, 3]).unwrap();
/// let b = Tensor::vector([10, 20, 30]).unwrap();
/// let c = zip(&a, &b, |x, y| x * y).unwrap();
/// assert_eq!(c.sum(), 140);
/// ```
pub fn zip<A, B, F, V, const N: usize>(lhs: A, rhs: B, func: F) -> Result<Zip<A, B, F, N>, TensorError>
where
    A: TensorLike<N>,
    B: TensorLike<N>,
    F: Fn(A::Value, B::Value) -> V,
{
    let shape = equal_shapes(&lhs.shape(), &rhs.shape())?;
    Ok(Zip {
        lhs,
        rhs,
        func,
        shape,
    })
}

/// Lazily converts every value with an `as` cast.
pub fn cast<U, E, const N: usize>(expr: E) -> Map<E, fn(E::Value) -> U, N>
where
    E: TensorLike<N>,
    E::Value: AsPrimitive<U>,
    U: Copy + 'static,
{
    Map {
        inner: expr,
        func: |value| value.as_(),
    }
}

/// Lazily transposes a matrix.
///
/// Vectors need no transposition and are passed around as they are.
pub fn transpose<E: TensorLike<2>>(expr: E) -> Transpose<E> {
    Transpose {
        inner: expr,
        swap: true,
    }
}

/// Lazily transposes a matrix when `cond` holds.
pub fn transpose_if<E: TensorLike<2>>(cond: bool, expr: E) -> Transpose<E> {
    Transpose {
        inner: expr,
        swap: cond,
    }
}

/// The main diagonal of a matrix.
pub fn diag<E: TensorLike<2>>(expr: E) -> Diag<E> {
    Diag { inner: expr }
}

/// The tensor product of two expressions.
///
/// # Example
///
/// ```rust
/// use strata_tensor::{expr::outer, Tensor, TensorLike};
///
/// let a = Tensor::vector([1, 2]).unwrap();
/// let b = Tensor::vector([3, 4, 5]).unwrap();
/// let ab = outer::<_, _, 1, 1, 2>(&a, &b);
/// assert_eq!(ab.shape().sizes(), [2, 3]);
/// assert_eq!(ab.at([1, 2]), 10);
/// ```
pub fn outer<A, B, const M: usize, const K: usize, const N: usize>(lhs: A, rhs: B) -> Outer<A, B, M, K, N>
where
    A: TensorLike<M>,
    B: TensorLike<K>,
    A::Value: Mul<B::Value>,
{
    const { assert!(M + K == N, "the tensor product of ranks M and K has rank M + K") };
    Outer { lhs, rhs }
}

/// One where every coordinate component is equal, zero elsewhere.
pub fn identity<T: Zero + One, const N: usize>(shape: impl Into<Shape<N>>) -> Lambda<fn(IndexVector<N>) -> T, N> {
    let func: fn(IndexVector<N>) -> T = |index| {
        if index.windows(2).all(|pair| pair[0] == pair[1]) {
            T::one()
        } else {
            T::zero()
        }
    };
    Lambda::new(shape, func)
}

/// The `i`-th standard basis vector of length `n`.
pub fn unit_vector<T: Zero + One>(n: usize, i: usize) -> Lambda<impl Fn(IndexVector<1>) -> T + Clone, 1> {
    Lambda::new([n], move |index: IndexVector<1>| {
        if index[0] == i {
            T::one()
        } else {
            T::zero()
        }
    })
}

/// The elementwise minimum of two expressions.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn minimum<A, B, const N: usize>(
    lhs: A,
    rhs: B,
) -> Result<Zip<A, B, fn(A::Value, A::Value) -> A::Value, N>, TensorError>
where
    A: TensorLike<N>,
    B: TensorLike<N, Value = A::Value>,
    A::Value: PartialOrd,
{
    let func: fn(A::Value, A::Value) -> A::Value = |a, b| if b < a { b } else { a };
    zip(lhs, rhs, func)
}

/// The elementwise maximum of two expressions.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if the shapes differ.
pub fn maximum<A, B, const N: usize>(
    lhs: A,
    rhs: B,
) -> Result<Zip<A, B, fn(A::Value, A::Value) -> A::Value, N>, TensorError>
where
    A: TensorLike<N>,
    B: TensorLike<N, Value = A::Value>,
    A::Value: PartialOrd,
{
    let func: fn(A::Value, A::Value) -> A::Value = |a, b| if b > a { b } else { a };
    zip(lhs, rhs, func)
}
