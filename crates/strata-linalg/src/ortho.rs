//! Householder reflections and Givens rotations with accumulated orthogonal factors.
//!
//! [`OrthoHelper`] owns a working copy `X` of a matrix `A` and, optionally, the products of
//! every transform applied from the left (`Uc`) and from the right (`Vc`), so that at all
//! times
//!
//! ```text
//! X = Uc A Vc,    A = Ucᵀ X Vcᵀ = matrix_u() · X · matrix_v()
//! ```
//!
//! QR, LQ, bidiagonalization and the SVD are all sequences of these transforms.

use strata_tensor::{
    expr::{identity, transpose, Transpose},
    CpuAllocator, Tensor, TensorError, TensorLike,
};

use crate::{
    error::LinalgError,
    length::{slice_length, slice_normalize},
    scalar::Real,
};

/// Which side of the matrix a transform acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// From the left, mixing rows. Accumulates into `U`.
    U,
    /// From the right, mixing columns. Accumulates into `V`.
    V,
}

/// The default off-diagonal threshold of the Givens sweep, `32ε`.
pub fn default_threshold<T: Real>() -> T {
    T::from_usize(32) * T::eps()
}

/// Stopping rule of the Givens sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GivensCriteria<T> {
    /// Maximum number of sweeps before giving up.
    pub max_iterations: usize,
    /// Superdiagonal entries at or below this magnitude, relative to the largest entry of
    /// the bidiagonal, count as zero.
    pub threshold: T,
}

impl<T: Real> Default for GivensCriteria<T> {
    fn default() -> Self {
        Self {
            max_iterations: 4096,
            threshold: default_threshold(),
        }
    }
}

/// The stable rotation `(c, s)` with `c f + s g = ±√(f² + g²)` and `c g - s f = 0`.
fn givens<T: Real>(f: T, g: T) -> (T, T) {
    if g == T::zero() {
        (T::one(), T::zero())
    } else if f == T::zero() {
        (T::zero(), g.sign())
    } else {
        let r = f.hypot(g);
        (f.abs() / r, f.sign() * g / r)
    }
}

/// Applies `I - 2 w wᵀ` to the entries `at(0) .. at(w.len() - 1)` of a matrix.
fn reflect_line<T: Real>(m: &mut Tensor<T, 2>, w: &[T], at: impl Fn(usize) -> [usize; 2]) {
    let dot = w
        .iter()
        .enumerate()
        .fold(T::zero(), |acc, (k, wk)| acc + *wk * m[at(k)]);
    if dot == T::zero() {
        return;
    }
    let scale = dot + dot;
    for (k, wk) in w.iter().enumerate() {
        let slot = &mut m[at(k)];
        *slot = *slot - scale * *wk;
    }
}

/// Rotates the pair of entries `at(line, k0)`, `at(line, k1)` on every line.
fn rotate_lines<T: Real>(
    m: &mut Tensor<T, 2>,
    (c, s): (T, T),
    (k0, k1): (usize, usize),
    lines: usize,
    at: impl Fn(usize, usize) -> [usize; 2],
) {
    for line in 0..lines {
        let (i0, i1) = (at(line, k0), at(line, k1));
        let (a0, a1) = (m[i0], m[i1]);
        m[i0] = c * a0 + s * a1;
        m[i1] = c * a1 - s * a0;
    }
}

/// Working matrix plus accumulated left and right orthogonal transforms.
pub struct OrthoHelper<T: Real> {
    x: Tensor<T, 2>,
    u: Tensor<T, 2>,
    v: Tensor<T, 2>,
    enable_u: bool,
    enable_v: bool,
    work: Vec<T>,
}

impl<T: Real> OrthoHelper<T> {
    /// Copies `expr` into a new helper.
    ///
    /// Enabled accumulators start as identities: `U` is rows × rows and `V` is
    /// cols × cols. Disabled ones stay empty and are never updated.
    ///
    /// # Errors
    ///
    /// Fails only if a tensor cannot be allocated.
    pub fn new<E>(expr: &E, enable_u: bool, enable_v: bool) -> Result<Self, TensorError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        let x = Tensor::from_expr(expr, CpuAllocator)?;
        let shape = x.shape();
        let square = |axis: usize| -> Result<Tensor<T, 2>, TensorError> {
            identity::<T, 2>(shape.take([axis, axis])?).execute()
        };
        let u = if enable_u { square(0)? } else { Tensor::default() };
        let v = if enable_v { square(1)? } else { Tensor::default() };
        let work = Vec::with_capacity(shape.rows().max(shape.cols()));
        Ok(Self {
            x,
            u,
            v,
            enable_u,
            enable_v,
            work,
        })
    }

    /// Number of rows of the working matrix.
    pub fn rows(&self) -> usize {
        self.x.rows()
    }

    /// Number of columns of the working matrix.
    pub fn cols(&self) -> usize {
        self.x.cols()
    }

    /// The transformed working matrix `X`.
    pub fn matrix_x(&self) -> &Tensor<T, 2> {
        &self.x
    }

    /// The left orthogonal factor, or an empty matrix when `U` is disabled.
    pub fn matrix_u(&self) -> Transpose<&Tensor<T, 2>> {
        transpose(&self.u)
    }

    /// The right orthogonal factor, or an empty matrix when `V` is disabled.
    pub fn matrix_v(&self) -> Transpose<&Tensor<T, 2>> {
        transpose(&self.v)
    }

    /// The accumulated left transforms `Uc`, the transpose of [`Self::matrix_u`].
    pub(crate) fn coeffs_u(&self) -> &Tensor<T, 2> {
        &self.u
    }

    /// The accumulated right transforms `Vc`, the transpose of [`Self::matrix_v`].
    pub(crate) fn coeffs_v(&self) -> &Tensor<T, 2> {
        &self.v
    }

    /// Reflects so that `X(i, j)` absorbs the rest of its column below (side `U`) or of
    /// its row to the right (side `V`), leaving zeros there.
    ///
    /// Does nothing when there is nothing below or to the right to eliminate.
    pub fn reflect_householder(&mut self, side: Side, i: usize, j: usize) {
        let (rows, cols) = (self.rows(), self.cols());
        let (len, lead, lines) = match side {
            Side::U if i + 1 < rows && j < cols => (rows - i, j, j + 1..cols),
            Side::V if i < rows && j + 1 < cols => (cols - j, i, i + 1..rows),
            _ => return,
        };
        // Position `k` along the reflected stretch of `line`.
        let at = move |line: usize, k: usize| match side {
            Side::U => [i + k, line],
            Side::V => [line, j + k],
        };

        let Self {
            x,
            u,
            v,
            enable_u,
            enable_v,
            work,
        } = self;
        work.clear();
        for k in 0..len {
            work.push(x[at(lead, k)]);
            x[at(lead, k)] = T::zero();
        }
        let head = -slice_length(work) * work[0].sign();
        x[at(lead, 0)] = head;
        work[0] = work[0] - head;
        slice_normalize(work);

        for line in lines {
            reflect_line(x, work, |k| at(line, k));
        }
        let (acc, lines) = match side {
            Side::U if *enable_u => (u, rows),
            Side::V if *enable_v => (v, cols),
            _ => return,
        };
        for line in 0..lines {
            reflect_line(acc, work, |k| at(line, k));
        }
    }

    /// Rotates rows (side `U`) or columns (side `V`) `k0` and `k1` so that the pair
    /// `(f, g)` would map to `(±√(f² + g²), 0)`.
    ///
    /// Does nothing when an index is out of range.
    pub fn rotate_givens(&mut self, side: Side, k0: usize, k1: usize, f: T, g: T) {
        let (rows, cols) = (self.rows(), self.cols());
        let limit = match side {
            Side::U => rows,
            Side::V => cols,
        };
        if k0 >= limit || k1 >= limit {
            return;
        }
        let cs = givens(f, g);
        match side {
            Side::U => {
                rotate_lines(&mut self.x, cs, (k0, k1), cols, |line, k| [k, line]);
                if self.enable_u {
                    rotate_lines(&mut self.u, cs, (k0, k1), rows, |line, k| [k, line]);
                }
            }
            Side::V => {
                rotate_lines(&mut self.x, cs, (k0, k1), rows, |line, k| [line, k]);
                if self.enable_v {
                    rotate_lines(&mut self.v, cs, (k0, k1), cols, |line, k| [line, k]);
                }
            }
        }
    }

    /// Reduces `X` to upper triangular form from the left, as in QR.
    pub fn upper_triangularize(&mut self) {
        for k in 0..self.rows().min(self.cols()) {
            self.reflect_householder(Side::U, k, k);
        }
    }

    /// Reduces `X` to lower triangular form from the right, as in LQ.
    pub fn lower_triangularize(&mut self) {
        for k in 0..self.rows().min(self.cols()) {
            self.reflect_householder(Side::V, k, k);
        }
    }

    /// Reduces `X` to upper bidiagonal form, alternating sides.
    pub fn upper_bidiagonalize(&mut self) {
        for k in 0..self.rows().min(self.cols()) {
            self.reflect_householder(Side::U, k, k);
            self.reflect_householder(Side::V, k, k + 1);
        }
    }

    /// Reduces `X` to lower bidiagonal form, alternating sides.
    pub fn lower_bidiagonalize(&mut self) {
        for k in 0..self.rows().min(self.cols()) {
            self.reflect_householder(Side::V, k, k);
            self.reflect_householder(Side::U, k + 1, k);
        }
    }

    /// Reduces `X` to tridiagonal form, alternating sides.
    pub fn tridiagonalize(&mut self) {
        for k in 0..self.rows().min(self.cols()) {
            self.reflect_householder(Side::V, k, k + 1);
            self.reflect_householder(Side::U, k + 1, k);
        }
    }

    /// Reduces `X` to a diagonal of non-negative values.
    ///
    /// Tall and square matrices are upper bidiagonalized, wide ones lower bidiagonalized,
    /// then the bidiagonal is swept with Givens rotations until every superdiagonal entry
    /// falls below the threshold. Off-diagonal entries are then set to exactly zero and the
    /// signs of the diagonal are moved into `U`.
    ///
    /// Returns the number of sweeps.
    ///
    /// # Errors
    ///
    /// Returns [`LinalgError::DidNotConverge`] if the sweep needs more than
    /// `criteria.max_iterations` iterations.
    pub fn diagonalize(&mut self, criteria: &GivensCriteria<T>) -> Result<usize, LinalgError> {
        let transposed = self.rows() < self.cols();
        if transposed {
            self.lower_bidiagonalize();
        } else {
            self.upper_bidiagonalize();
        }
        let iterations = self.sweep(transposed, criteria)?;

        let (rows, cols) = (self.rows(), self.cols());
        for i in 0..rows {
            for j in 0..cols {
                if i == j {
                    continue;
                }
                self.x[[i, j]] = T::zero();
            }
        }
        for i in 0..rows.min(cols) {
            let d = self.x[[i, i]];
            if d >= T::zero() {
                continue;
            }
            if self.enable_u {
                for k in 0..rows {
                    self.u[[i, k]] = -self.u[[i, k]];
                }
            }
            self.x[[i, i]] = -d;
        }
        Ok(iterations)
    }

    /// Entry `(i, j)` of the bidiagonal, stored in `X` or in its transpose.
    #[inline]
    fn y(&self, transposed: bool, i: usize, j: usize) -> T {
        if transposed {
            self.x[[j, i]]
        } else {
            self.x[[i, j]]
        }
    }

    #[inline]
    fn y_mut(&mut self, transposed: bool, i: usize, j: usize) -> &mut T {
        if transposed {
            &mut self.x[[j, i]]
        } else {
            &mut self.x[[i, j]]
        }
    }

    /// Implicit-shift QR sweeps over the upper bidiagonal `Y`.
    fn sweep(&mut self, transposed: bool, criteria: &GivensCriteria<T>) -> Result<usize, LinalgError> {
        let n = self.rows().min(self.cols());
        if n == 0 {
            return Ok(0);
        }
        // Rotations mixing rows and columns of Y.
        let (row_side, col_side) = if transposed {
            (Side::V, Side::U)
        } else {
            (Side::U, Side::V)
        };

        let mut factor = self.y(transposed, n - 1, n - 1).abs();
        for k in 0..n - 1 {
            factor = factor
                .max(self.y(transposed, k, k).abs())
                .max(self.y(transposed, k, k + 1).abs());
        }
        let sixteen = T::from_usize(16);
        if factor > T::zero() {
            let small = factor <= sixteen * T::min_inv();
            let inv = factor.recip();
            for k in 0..n {
                for j in [k, k + 1] {
                    if j < n {
                        let y = self.y_mut(transposed, k, j);
                        *y = if small { *y / factor } else { *y * inv };
                    }
                }
            }
        }

        let thresh2 = criteria.threshold * criteria.threshold;
        let sqr = |v: T| v * v;
        let two = T::one() + T::one();
        let mut iterations = 0;
        loop {
            let (mut s, mut t) = (0, 1);
            while s + 1 < n && sqr(self.y(transposed, s, s + 1)) < thresh2 {
                s += 1;
                t += 1;
            }
            while t + 1 < n && sqr(self.y(transposed, t, t + 1)) > thresh2 {
                t += 1;
            }
            if t == n {
                break;
            }
            if iterations >= criteria.max_iterations {
                log::warn!(
                    "Givens sweep did not converge in {} iterations, active block [{}, {}]",
                    iterations,
                    s,
                    t
                );
                return Err(LinalgError::DidNotConverge { iterations });
            }
            iterations += 1;
            log::debug!("Givens sweep {}: active block [{}, {}]", iterations, s, t);

            // Wilkinson shift from the trailing 2x2 block of YᵀY.
            let y0 = if s + 1 < t {
                self.y(transposed, t - 2, t - 1)
            } else {
                T::zero()
            };
            let y1 = self.y(transposed, t - 1, t);
            let z0 = self.y(transposed, t - 1, t - 1);
            let z1 = self.y(transposed, t, t);
            let g00 = sqr(y0) + sqr(z0);
            let g11 = sqr(y1) + sqr(z1);
            let g01 = sqr(z0) * sqr(y1);
            let b = (g00 + g11) / two;
            let c = g00 * g11 - g01;
            let d = (sqr(b) - c).max(T::zero());
            let lambda0 = b + d.sqrt().copysign(b);
            let lambda1 = c / lambda0;
            let shift = if (lambda0 - g11).abs() < (lambda1 - g11).abs() {
                lambda0
            } else {
                lambda1
            };

            let head = self.y(transposed, s, s);
            let mut f = sqr(head) - shift;
            let mut g = head * self.y(transposed, s, s + 1);
            for k in s..t {
                self.rotate_givens(col_side, k, k + 1, f, g);
                if k != s {
                    *self.y_mut(transposed, k - 1, k + 1) = T::zero();
                }
                f = self.y(transposed, k, k);
                g = self.y(transposed, k + 1, k);
                self.rotate_givens(row_side, k, k + 1, f, g);
                *self.y_mut(transposed, k + 1, k) = T::zero();
                if k + 1 != t {
                    f = self.y(transposed, k, k + 1);
                    g = self.y(transposed, k, k + 2);
                }
            }
        }
        log::debug!("Givens sweep converged in {} iterations", iterations);

        for k in 0..n {
            let y = self.y_mut(transposed, k, k);
            *y = *y * factor;
        }
        Ok(iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometric::{is_near, is_near_unitary};
    use strata_tensor::{expr::transpose, product::matmul};

    fn reconstruct(h: &OrthoHelper<f64>) -> Result<Tensor<f64, 2>, TensorError> {
        matmul(&matmul(&h.matrix_u(), h.matrix_x())?, &h.matrix_v())
    }

    fn sample() -> Result<Tensor<f64, 2>, TensorError> {
        Tensor::matrix([
            [4.0, 1.0, -2.0],
            [1.0, 2.0, 0.5],
            [-2.0, 0.5, 3.0],
            [0.25, -1.0, 1.5],
        ])
    }

    #[test]
    fn givens_coefficients() {
        let (c, s) = givens(3.0f64, 4.0);
        assert_eq!((c, s), (0.6, 0.8));
        assert!((c * 4.0 - s * 3.0).abs() < 1e-15);
        assert_eq!(givens(-2.0f64, 0.0), (1.0, 0.0));
        assert_eq!(givens(0.0f64, -2.0), (0.0, -1.0));
    }

    #[test]
    fn upper_triangularize_tall() -> Result<(), LinalgError> {
        let a = sample()?;
        let mut h = OrthoHelper::new(&a, true, false)?;
        h.upper_triangularize();
        let r = h.matrix_x();
        for i in 0..r.rows() {
            for j in 0..i.min(r.cols()) {
                assert_eq!(r[[i, j]], 0.0);
            }
        }
        assert!(is_near_unitary(&h.matrix_u(), 1e-12)?);
        assert!(is_near(&matmul(&h.matrix_u(), r)?, &a, 1e-12)?);
        assert_eq!(h.matrix_v().shape().sizes(), [0, 0]);
        Ok(())
    }

    #[test]
    fn lower_triangularize_wide() -> Result<(), LinalgError> {
        let a = sample()?;
        let at = transpose(&a).execute()?;
        let mut h = OrthoHelper::new(&at, false, true)?;
        h.lower_triangularize();
        let l = h.matrix_x();
        for i in 0..l.rows() {
            for j in (i + 1)..l.cols() {
                assert_eq!(l[[i, j]], 0.0);
            }
        }
        assert!(is_near(&matmul(l, &h.matrix_v())?, &at, 1e-12)?);
        Ok(())
    }

    #[test]
    fn bidiagonal_forms() -> Result<(), LinalgError> {
        let a = sample()?;
        let mut h = OrthoHelper::new(&a, true, true)?;
        h.upper_bidiagonalize();
        let b = h.matrix_x();
        for i in 0..b.rows() {
            for j in 0..b.cols() {
                if j != i && j != i + 1 {
                    assert_eq!(b[[i, j]], 0.0, "({i}, {j})");
                }
            }
        }
        assert!(is_near(&reconstruct(&h)?, &a, 1e-12)?);

        let sym = Tensor::matrix([
            [4.0, 1.0, 2.0, 0.5],
            [1.0, 3.0, 0.0, 1.0],
            [2.0, 0.0, 2.0, -1.0],
            [0.5, 1.0, -1.0, 1.0],
        ])?;
        let mut h = OrthoHelper::new(&sym, true, true)?;
        h.tridiagonalize();
        let t = h.matrix_x();
        for i in 0..4usize {
            for j in 0..4usize {
                if i.abs_diff(j) > 1 {
                    assert_eq!(t[[i, j]], 0.0, "({i}, {j})");
                }
            }
        }
        assert!(is_near(&reconstruct(&h)?, &sym, 1e-12)?);
        Ok(())
    }

    #[test]
    fn diagonalize_tall_and_wide() -> Result<(), LinalgError> {
        let a = sample()?;
        for m in [a.clone(), transpose(&a).execute()?] {
            let mut h = OrthoHelper::new(&m, true, true)?;
            h.diagonalize(&GivensCriteria::default())?;
            let x = h.matrix_x();
            for i in 0..x.rows() {
                for j in 0..x.cols() {
                    if i == j {
                        assert!(x[[i, j]] >= 0.0);
                    } else {
                        assert_eq!(x[[i, j]], 0.0);
                    }
                }
            }
            assert!(is_near_unitary(&h.matrix_u(), 1e-12)?);
            assert!(is_near_unitary(&h.matrix_v(), 1e-12)?);
            assert!(is_near(&reconstruct(&h)?, &m, 1e-12)?);
        }
        Ok(())
    }

    #[test]
    fn diagonalize_without_accumulators() -> Result<(), LinalgError> {
        let a = Tensor::matrix([[-3.0f64, 0.0], [0.0, 2.0]])?;
        let mut h = OrthoHelper::new(&a, false, false)?;
        h.diagonalize(&GivensCriteria::default())?;
        let expected = Tensor::matrix([[3.0, 0.0], [0.0, 2.0]])?;
        assert!(is_near(h.matrix_x(), &expected, 1e-12)?);

        let mut h = OrthoHelper::new(&a, true, false)?;
        h.diagonalize(&GivensCriteria::default())?;
        assert!(is_near(&matmul(&h.matrix_u(), h.matrix_x())?, &a, 1e-12)?);
        Ok(())
    }

    #[test]
    fn diagonalize_gives_up() -> Result<(), LinalgError> {
        let _ = env_logger::builder().is_test(true).try_init();
        let a = sample()?;
        let mut h = OrthoHelper::new(&a, true, true)?;
        let criteria = GivensCriteria {
            max_iterations: 0,
            threshold: default_threshold(),
        };
        assert_eq!(
            h.diagonalize(&criteria),
            Err(LinalgError::DidNotConverge { iterations: 0 })
        );
        Ok(())
    }

    #[test]
    fn zero_and_empty_matrices() -> Result<(), LinalgError> {
        let zero = Tensor::<f64, 2>::zeros([3, 2], CpuAllocator)?;
        let mut h = OrthoHelper::new(&zero, true, true)?;
        assert_eq!(h.diagonalize(&GivensCriteria::default())?, 0);
        assert!(h.matrix_x().as_slice().iter().all(|v| *v == 0.0));

        let empty = Tensor::<f64, 2>::zeros([0, 3], CpuAllocator)?;
        let mut h = OrthoHelper::new(&empty, true, true)?;
        assert_eq!(h.diagonalize(&GivensCriteria::default())?, 0);
        Ok(())
    }
}
