//! Singular value decomposition by bidiagonalization and Givens sweeps.
//!
//! [`DecompSVD`] never reorders its storage. The diagonalization leaves singular values in
//! whatever order the sweep produced, and a sort permutation maps the descending order
//! used by every accessor onto the stored diagonal.

use std::cmp::Ordering;

use strata_tensor::{
    equal_shapes,
    expr::{Fixed, Lambda},
    CpuAllocator, IndexVector, Shape, Tensor, TensorLike,
};

use crate::{
    error::LinalgError,
    ortho::{GivensCriteria, OrthoHelper},
    scalar::Real,
};

/// The default rank threshold, `16 · min_inv`.
///
/// Singular values at or above it count towards the rank. It only discards values that
/// are numerically zero; pass a larger threshold to truncate small singular values.
pub fn default_threshold<T: Real>() -> T {
    T::from_usize(16) * T::min_inv()
}

/// The decomposition `A = U S V` of a matrix of any shape.
///
/// `U` (rows × rows) and `V` (cols × cols) are orthogonal and `S` (rows × cols) is
/// diagonal with non-negative values in descending order. The columns of `U` are the
/// left singular vectors and the rows of `V` the right ones.
///
/// # Example
///
/// ```rust
/// use strata_linalg::svd::DecompSVD;
/// use strata_tensor::Tensor;
///
/// let a = Tensor::matrix([[3.0f64, 0.0], [0.0, -4.0], [0.0, 0.0]]).unwrap();
/// let svd = DecompSVD::new(&a).unwrap();
/// assert_eq!(svd.size(), 2);
/// assert!((svd.singular_value(0) - 4.0).abs() < 1e-12);
/// assert!((svd.singular_value(1) - 3.0).abs() < 1e-12);
/// assert_eq!(svd.rank(1e-9), 2);
/// ```
pub struct DecompSVD<T: Real> {
    helper: OrthoHelper<T>,
    sort: Vec<usize>,
    iterations: usize,
}

impl<T: Real> DecompSVD<T> {
    /// Decomposes a matrix with both singular vector sets and the default sweep criteria.
    ///
    /// # Errors
    ///
    /// Returns [`LinalgError::DidNotConverge`] if the Givens sweep gives up.
    pub fn new<E>(expr: &E) -> Result<Self, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        Self::with_options(expr, true, true, &GivensCriteria::default())
    }

    /// Decomposes a matrix, accumulating only the requested singular vectors.
    ///
    /// Singular values alone need neither `U` nor `V`. Queries that read a disabled
    /// factor return [`LinalgError::InvalidArgument`].
    ///
    /// # Errors
    ///
    /// Returns [`LinalgError::DidNotConverge`] if the Givens sweep gives up.
    pub fn with_options<E>(
        expr: &E,
        enable_u: bool,
        enable_v: bool,
        criteria: &GivensCriteria<T>,
    ) -> Result<Self, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        let mut helper = OrthoHelper::new(expr, enable_u, enable_v)?;
        let iterations = helper.diagonalize(criteria)?;
        let x = helper.matrix_x();
        let mut sort: Vec<usize> = (0..helper.rows().min(helper.cols())).collect();
        sort.sort_by(|a, b| x[[*b, *b]].partial_cmp(&x[[*a, *a]]).unwrap_or(Ordering::Equal));
        log::debug!(
            "SVD of {}x{} converged after {} sweeps",
            helper.rows(),
            helper.cols(),
            iterations
        );
        Ok(Self {
            helper,
            sort,
            iterations,
        })
    }

    /// The number of singular values, `min(rows, cols)`.
    pub fn size(&self) -> usize {
        self.sort.len()
    }

    /// Number of rows of the input.
    pub fn rows(&self) -> usize {
        self.helper.rows()
    }

    /// Number of columns of the input.
    pub fn cols(&self) -> usize {
        self.helper.cols()
    }

    /// Number of Givens sweeps the diagonalization took.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Maps a sorted position to its slot in storage; positions past the singular values
    /// map to themselves.
    #[inline]
    fn slot(&self, i: usize) -> usize {
        self.sort.get(i).copied().unwrap_or(i)
    }

    fn require(&self, u: bool, v: bool) -> Result<(), LinalgError> {
        let missing = |name| LinalgError::InvalidArgument(format!("{name} was not accumulated"));
        if u && self.helper.coeffs_u().is_empty() && self.rows() > 0 {
            return Err(missing("U"));
        }
        if v && self.helper.coeffs_v().is_empty() && self.cols() > 0 {
            return Err(missing("V"));
        }
        Ok(())
    }

    /// The `i`-th largest singular value.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.size()`.
    pub fn singular_value(&self, i: usize) -> T {
        let k = self.sort[i];
        self.helper.matrix_x()[[k, k]]
    }

    /// The singular values in descending order.
    pub fn vector_s(&self) -> Lambda<impl Fn(IndexVector<1>) -> T + '_, 1> {
        Lambda::new([self.size()], move |index: IndexVector<1>| {
            self.singular_value(index[0])
        })
    }

    /// The diagonal factor `S`, with the shape of the input.
    pub fn matrix_s(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        Lambda::new(self.helper.matrix_x().shape(), move |index: IndexVector<2>| {
            if index[0] == index[1] {
                self.singular_value(index[0])
            } else {
                T::zero()
            }
        })
    }

    /// The left singular vector of the `i`-th singular value, column `i` of `U`.
    ///
    /// Indices from `size()` up to `rows()` give the remaining columns of `U`, which span
    /// the left null space.
    ///
    /// # Errors
    ///
    /// Fails if `U` was not accumulated or `i >= rows()`.
    pub fn singular_vector_u(&self, i: usize) -> Result<Fixed<&Tensor<T, 2>, 2, 1>, LinalgError> {
        self.require(true, false)?;
        Ok(Fixed::new(self.helper.coeffs_u(), 0, self.slot(i))?)
    }

    /// The right singular vector of the `i`-th singular value, row `i` of `V`.
    ///
    /// # Errors
    ///
    /// Fails if `V` was not accumulated or `i >= cols()`.
    pub fn singular_vector_v(&self, i: usize) -> Result<Fixed<&Tensor<T, 2>, 2, 1>, LinalgError> {
        self.require(false, true)?;
        Ok(Fixed::new(self.helper.coeffs_v(), 1, self.slot(i))?)
    }

    /// The left factor `U`, or an empty matrix when it was not accumulated.
    pub fn matrix_u(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        let uc = self.helper.coeffs_u();
        Lambda::new(uc.shape(), move |index: IndexVector<2>| {
            uc[[self.slot(index[1]), index[0]]]
        })
    }

    /// The right factor `V`, or an empty matrix when it was not accumulated.
    pub fn matrix_v(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        let vc = self.helper.coeffs_v();
        Lambda::new(vc.shape(), move |index: IndexVector<2>| {
            vc[[index[1], self.slot(index[0])]]
        })
    }

    /// The number of singular values at or above `thresh`.
    ///
    /// A threshold of zero counts every singular value.
    pub fn rank(&self, thresh: T) -> usize {
        (0..self.size())
            .find(|i| !(self.singular_value(*i) >= thresh))
            .unwrap_or(self.size())
    }

    /// The ratio of the largest singular value to the smallest one counted by
    /// [`Self::rank`].
    ///
    /// With a zero threshold a rank-deficient matrix gives infinity, as does a matrix of
    /// rank zero.
    pub fn condition_number(&self, thresh: T) -> T {
        match self.rank(thresh) {
            0 => T::infinity(),
            r if self.singular_value(r - 1) <= T::zero() => T::infinity(),
            r => self.singular_value(0) / self.singular_value(r - 1),
        }
    }

    /// The columns of `U` past the rank, a basis of the left null space.
    ///
    /// # Errors
    ///
    /// Fails if `U` was not accumulated.
    pub fn null_matrix_u(&self, thresh: T) -> Result<Lambda<impl Fn(IndexVector<2>) -> T + '_, 2>, LinalgError> {
        self.require(true, false)?;
        let rank = self.rank(thresh);
        let rows = self.rows();
        let uc = self.helper.coeffs_u();
        Ok(Lambda::new([rows, rows - rank], move |index: IndexVector<2>| {
            uc[[self.slot(rank + index[1]), index[0]]]
        }))
    }

    /// The rows of `V` past the rank, a basis of the null space.
    ///
    /// # Errors
    ///
    /// Fails if `V` was not accumulated.
    pub fn null_matrix_v(&self, thresh: T) -> Result<Lambda<impl Fn(IndexVector<2>) -> T + '_, 2>, LinalgError> {
        self.require(false, true)?;
        let rank = self.rank(thresh);
        let cols = self.cols();
        let vc = self.helper.coeffs_v();
        Ok(Lambda::new([cols - rank, cols], move |index: IndexVector<2>| {
            vc[[index[1], self.slot(rank + index[0])]]
        }))
    }

    /// The orthogonal matrix nearest to the input, `U S' V` with every singular value
    /// replaced by one.
    ///
    /// # Errors
    ///
    /// Fails if `U` or `V` was not accumulated.
    pub fn orthogonalize(&self) -> Result<Tensor<T, 2>, LinalgError> {
        self.require(true, true)?;
        let (uc, vc) = (self.helper.coeffs_u(), self.helper.coeffs_v());
        let size = self.size();
        Ok(Tensor::from_shape_fn([self.rows(), self.cols()], CpuAllocator, |index| {
            (0..size).fold(T::zero(), |acc, k| {
                let s = self.sort[k];
                acc + uc[[s, index[0]]] * vc[[index[1], s]]
            })
        })?)
    }

    /// The product of the singular values counted by [`Self::rank`].
    pub fn pseudo_determinant(&self, thresh: T) -> T {
        (0..self.rank(thresh)).fold(T::one(), |acc, i| acc * self.singular_value(i))
    }

    /// The Moore-Penrose pseudo-inverse, of shape cols × rows.
    ///
    /// Singular values below `thresh` are dropped instead of inverted.
    ///
    /// # Errors
    ///
    /// Fails if `U` or `V` was not accumulated.
    pub fn pseudo_inverse(&self, thresh: T) -> Result<Tensor<T, 2>, LinalgError> {
        self.require(true, true)?;
        let (uc, vc) = (self.helper.coeffs_u(), self.helper.coeffs_v());
        let rank = self.rank(thresh);
        Ok(Tensor::from_shape_fn([self.cols(), self.rows()], CpuAllocator, |index| {
            (0..rank).fold(T::zero(), |acc, k| {
                let s = self.sort[k];
                acc + vc[[index[0], s]] * uc[[s, index[1]]] / self.singular_value(k)
            })
        })?)
    }

    /// The minimum-norm least-squares solution of `A X = B`.
    ///
    /// Only the singular values counted by [`Self::rank`] take part.
    ///
    /// # Errors
    ///
    /// Fails if `U` or `V` was not accumulated, or if `B` does not have as many rows as
    /// `A`.
    pub fn solve<E>(&self, rhs: &E, thresh: T) -> Result<Tensor<T, 2>, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        self.require(true, true)?;
        let (xshape, bshape) = (self.helper.matrix_x().shape(), rhs.shape());
        equal_shapes(&xshape.take::<1>([0])?, &bshape.take::<1>([0])?)?;
        let shape: Shape<2> = xshape.take::<1>([1])?.append(&bshape.take::<1>([1])?);
        let mut out = Tensor::from_shape_val(shape, T::zero(), CpuAllocator)?;
        let mut x = vec![T::zero(); self.cols()];
        let mut w = Vec::with_capacity(self.size());
        for j in 0..bshape.cols() {
            self.solve_column(|m| rhs.at([m, j]), thresh, &mut w, &mut x);
            for (i, v) in x.iter().enumerate() {
                out[[i, j]] = *v;
            }
        }
        Ok(out)
    }

    /// The minimum-norm least-squares solution of `A x = b`.
    ///
    /// # Errors
    ///
    /// Fails if `U` or `V` was not accumulated, or if `b` does not have as many entries as
    /// `A` has rows.
    pub fn solve_vector<E>(&self, rhs: &E, thresh: T) -> Result<Tensor<T, 1>, LinalgError>
    where
        E: TensorLike<1, Value = T> + ?Sized,
    {
        self.require(true, true)?;
        let xshape = self.helper.matrix_x().shape();
        equal_shapes(&xshape.take::<1>([0])?, &rhs.shape())?;
        let mut x = vec![T::zero(); self.cols()];
        let mut w = Vec::with_capacity(self.size());
        self.solve_column(|m| rhs.at([m]), thresh, &mut w, &mut x);
        Ok(Tensor::from_shape_vec(xshape.take::<1>([1])?, x, CpuAllocator)?)
    }

    fn solve_column(&self, b: impl Fn(usize) -> T, thresh: T, w: &mut Vec<T>, x: &mut [T]) {
        let (uc, vc) = (self.helper.coeffs_u(), self.helper.coeffs_v());
        let rank = self.rank(thresh);
        w.clear();
        for k in 0..rank {
            let s = self.sort[k];
            let proj = (0..self.rows()).fold(T::zero(), |acc, m| acc + uc[[s, m]] * b(m));
            w.push(proj / self.singular_value(k));
        }
        for (j, xj) in x.iter_mut().enumerate() {
            *xj = w
                .iter()
                .enumerate()
                .fold(T::zero(), |acc, (k, wk)| acc + vc[[j, self.sort[k]]] * *wk);
        }
    }
}

/// The orthogonal matrix nearest to `expr` in the Frobenius norm.
///
/// # Errors
///
/// Returns [`LinalgError::DidNotConverge`] if the underlying SVD gives up.
pub fn orthogonalize<E, T>(expr: &E) -> Result<Tensor<T, 2>, LinalgError>
where
    E: TensorLike<2, Value = T> + ?Sized,
    T: Real,
{
    DecompSVD::new(expr)?.orthogonalize()
}

/// The Moore-Penrose pseudo-inverse of `expr`, dropping numerically zero singular values.
///
/// # Errors
///
/// Returns [`LinalgError::DidNotConverge`] if the underlying SVD gives up.
///
/// # Example
///
/// ```rust
/// use strata_linalg::svd::pseudo_inverse;
/// use strata_tensor::{Tensor, TensorLike};
///
/// let a = Tensor::matrix([[2.0f64, 0.0], [0.0, 0.0]]).unwrap();
/// let p = pseudo_inverse(&a).unwrap();
/// assert!((p.at([0, 0]) - 0.5).abs() < 1e-12);
/// assert_eq!(p.at([1, 1]), 0.0);
/// ```
pub fn pseudo_inverse<E, T>(expr: &E) -> Result<Tensor<T, 2>, LinalgError>
where
    E: TensorLike<2, Value = T> + ?Sized,
    T: Real,
{
    DecompSVD::new(expr)?.pseudo_inverse(default_threshold())
}
