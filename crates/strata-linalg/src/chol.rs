//! Pivoted Cholesky decomposition of symmetric positive (semi-)definite matrices.

use strata_tensor::{
    equal_shapes,
    expr::{identity, transpose, Lambda, Transpose},
    CpuAllocator, IndexVector, Shape, Tensor, TensorLike, TensorLikeMut,
};

use crate::{
    error::{ensure_square, LinalgError},
    scalar::Real,
};

/// The decomposition `A = P L Lᵀ Pᵀ` with `L` lower triangular and `P` a permutation.
///
/// Pivots are chosen by largest remaining diagonal. A pivot that is not significantly
/// above zero, relative to the first one, ends the factorization: the remaining block is
/// left at zero and [`DecompChol::rank`] reports the truncated rank. This is how
/// positive semi-definite input is handled.
///
/// # Example
///
/// ```rust
/// use strata_linalg::chol::DecompChol;
/// use strata_tensor::Tensor;
///
/// let a = Tensor::matrix([[4.0f64, 2.0], [2.0, 10.0]]).unwrap();
/// let chol = DecompChol::new(&a).unwrap();
/// assert!((chol.determinant() - 36.0).abs() < 1e-12);
/// assert_eq!(chol.pivots(), &[1, 0]);
/// ```
pub struct DecompChol<T: Real> {
    /// Upper triangular factor `R = Lᵀ`.
    coeffs: Tensor<T, 2>,
    pivots: Vec<usize>,
    rank: usize,
}

impl<T: Real> DecompChol<T> {
    /// Factors a square matrix. Only the upper triangle is read after pivoting.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch for non-square input and
    /// [`LinalgError::NonPositiveDefinite`] when a pivot square root is not finite.
    pub fn new<E>(expr: &E) -> Result<Self, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        let mut a = Tensor::from_expr(expr, CpuAllocator)?;
        let n = a.rows();
        ensure_square(n, a.cols())?;
        let mut pivots: Vec<usize> = (0..n).collect();
        let mut rank = n;
        let mut eps = T::min_inv();
        for k in 0..n {
            let mut l = k;
            for i in (k + 1)..n {
                if a[[i, i]].abs() > a[[l, l]].abs() {
                    l = i;
                }
            }
            if l != k {
                a.swap_rows_in_place(k, l)?;
                a.swap_cols_in_place(k, l)?;
                pivots.swap(k, l);
            }
            if k == 0 {
                eps = a[[0, 0]].abs() * T::eps();
            }
            if !(a[[k, k]].abs() > eps) {
                log::debug!("Cholesky stopped early at rank {} of {}", k, n);
                for i in k..n {
                    for j in i..n {
                        a[[i, j]] = T::zero();
                    }
                }
                rank = k;
                break;
            }
            let coeff = a[[k, k]].sqrt();
            a[[k, k]] = coeff;
            if !(coeff.is_finite() && coeff.abs() > eps) {
                return Err(LinalgError::NonPositiveDefinite(k));
            }
            for j in (k + 1)..n {
                a[[k, j]] = a[[k, j]] / coeff;
            }
            for j in (k + 1)..n {
                for i in (k + 1)..=j {
                    a[[i, j]] = a[[i, j]] - a[[k, j]] * a[[k, i]];
                    a[[j, i]] = a[[i, j]];
                }
            }
        }
        for j in 0..n {
            for i in (j + 1)..n {
                a[[i, j]] = T::zero();
            }
        }
        Ok(Self {
            coeffs: a,
            pivots,
            rank,
        })
    }

    /// The order of the matrix.
    pub fn size(&self) -> usize {
        self.pivots.len()
    }

    /// Number of pivots taken before the factorization stopped.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The pivot order: row `k` of the factored matrix is row `pivots()[k]` of the input.
    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// The permutation matrix `P`.
    pub fn matrix_p(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        permutation(self.coeffs.shape(), &self.pivots)
    }

    /// The lower triangular factor `L`.
    pub fn matrix_l(&self) -> Transpose<&Tensor<T, 2>> {
        transpose(&self.coeffs)
    }

    /// Solves `A X = B`.
    ///
    /// After an early stop the zero pivots are skipped, which yields one solution of a
    /// consistent semi-definite system.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch if `B` does not have as many rows as `A`.
    pub fn solve<E>(&self, rhs: &E) -> Result<Tensor<T, 2>, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        let (ashape, bshape) = (self.coeffs.shape(), rhs.shape());
        equal_shapes(&ashape.take::<1>([0])?, &bshape.take::<1>([0])?)?;
        let shape: Shape<2> = ashape.take::<1>([1])?.append(&bshape.take::<1>([1])?);
        let mut out = Tensor::from_shape_val(shape, T::zero(), CpuAllocator)?;
        let mut y = vec![T::zero(); self.size()];
        for j in 0..bshape.cols() {
            self.solve_column(|i| rhs.at([i, j]), &mut y);
            for (i, p) in self.pivots.iter().enumerate() {
                out[[*p, j]] = y[i];
            }
        }
        Ok(out)
    }

    /// Solves `A x = b` for a single vector.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch if `b` does not have as many entries as `A` has rows.
    pub fn solve_vector<E>(&self, rhs: &E) -> Result<Tensor<T, 1>, LinalgError>
    where
        E: TensorLike<1, Value = T> + ?Sized,
    {
        equal_shapes(&self.coeffs.shape().take::<1>([0])?, &rhs.shape())?;
        let mut y = vec![T::zero(); self.size()];
        self.solve_column(|i| rhs.at([i]), &mut y);
        let mut out = Tensor::from_shape_val(self.coeffs.shape().take::<1>([1])?, T::zero(), CpuAllocator)?;
        for (i, p) in self.pivots.iter().enumerate() {
            out[[*p]] = y[i];
        }
        Ok(out)
    }

    /// Forward substitution with `Rᵀ`, then back substitution with `R`, in pivoted order.
    fn solve_column(&self, b: impl Fn(usize) -> T, y: &mut [T]) {
        let r = &self.coeffs;
        let n = y.len();
        for i in 0..n {
            let mut value = b(self.pivots[i]);
            for k in 0..i {
                value = value - r[[k, i]] * y[k];
            }
            let denom = r[[i, i]];
            y[i] = if denom != T::zero() { value / denom } else { value };
        }
        for i in (0..n).rev() {
            let mut value = y[i];
            for k in (i + 1)..n {
                value = value - r[[i, k]] * y[k];
            }
            let denom = r[[i, i]];
            y[i] = if denom != T::zero() { value / denom } else { value };
        }
    }

    /// The inverse matrix, `solve(I)`.
    ///
    /// # Errors
    ///
    /// Fails only if the output cannot be allocated.
    pub fn inverse(&self) -> Result<Tensor<T, 2>, LinalgError> {
        self.solve(&identity::<T, 2>(self.coeffs.shape()))
    }

    /// The determinant, the squared product of the diagonal of `L`.
    pub fn determinant(&self) -> T {
        let product = (0..self.size()).fold(T::one(), |acc, i| acc * self.coeffs[[i, i]]);
        product * product
    }
}

/// The permutation matrix with a one at `(pivots[j], j)` for every column `j`.
pub(crate) fn permutation<T: Real>(
    shape: Shape<2>,
    pivots: &[usize],
) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
    Lambda::new(shape, move |index: IndexVector<2>| {
        if pivots[index[1]] == index[0] {
            T::one()
        } else {
            T::zero()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometric::{is_near, is_near_identity};
    use rand::{rngs::StdRng, SeedableRng};
    use strata_tensor::{
        product::{matmul, matvec},
        TensorError,
    };

    fn random_spd(n: usize, seed: u64) -> Result<Tensor<f64, 2>, TensorError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let m = Tensor::<f64, 2>::from_random([n, n], &mut rng, CpuAllocator)?;
        let gram = matmul(&m, &transpose(&m))?;
        (&gram + &identity::<f64, 2>([n, n])).execute()
    }

    #[test]
    fn round_trip() -> Result<(), LinalgError> {
        for (n, seed) in [(1, 1), (3, 2), (6, 3)] {
            let a = random_spd(n, seed)?;
            let chol = DecompChol::new(&a)?;
            assert_eq!(chol.rank(), n);
            let (p, l) = (chol.matrix_p(), chol.matrix_l());
            let pt = transpose(&p);
            let lt = transpose(&l);
            let back = matmul(&matmul(&matmul(&p, &l)?, &lt)?, &pt)?;
            assert!(is_near(&back, &a, 1e-10)?);
            for i in 0..n {
                for j in (i + 1)..n {
                    assert_eq!(l.at([i, j]), 0.0);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn solve_and_inverse() -> Result<(), LinalgError> {
        let a = random_spd(4, 7)?;
        let chol = DecompChol::new(&a)?;
        let b = Tensor::matrix([[1.0, 0.0], [2.0, -1.0], [0.5, 3.0], [-2.0, 1.0]])?;
        let x = chol.solve(&b)?;
        assert!(is_near(&matmul(&a, &x)?, &b, 1e-10)?);

        let v = Tensor::vector([1.0, -1.0, 2.0, 0.0])?;
        let xv = chol.solve_vector(&v)?;
        assert!(is_near(&matvec(&a, &xv)?, &v, 1e-10)?);

        let inv = chol.inverse()?;
        assert!(is_near_identity(&matmul(&a, &inv)?, 1e-10));
        assert!(chol.solve(&Tensor::<f64, 2>::zeros([3, 1], CpuAllocator)?).is_err());
        Ok(())
    }

    #[test]
    fn determinant_and_pivots() -> Result<(), LinalgError> {
        let a = Tensor::matrix([[1.0f64, 0.0, 0.0], [0.0, 9.0, 0.0], [0.0, 0.0, 4.0]])?;
        let chol = DecompChol::new(&a)?;
        assert_eq!(chol.pivots(), &[1, 2, 0]);
        assert_eq!(chol.determinant(), 36.0);
        Ok(())
    }

    #[test]
    fn zero_matrix_is_semi_definite() -> Result<(), LinalgError> {
        let zero = Tensor::<f32, 2>::zeros([3, 3], CpuAllocator)?;
        let chol = DecompChol::new(&zero)?;
        assert_eq!(chol.rank(), 0);
        assert!(is_near_identity(&chol.matrix_p(), 0.0));
        assert!(chol.matrix_l().execute()?.as_slice().iter().all(|v| *v == 0.0));
        assert_eq!(chol.determinant(), 0.0);
        Ok(())
    }

    #[test]
    fn semi_definite_solve_skips_zero_pivots() -> Result<(), LinalgError> {
        let _ = env_logger::builder().is_test(true).try_init();
        // Rank one: v vᵀ with v = (1, 2, 2).
        let a = Tensor::matrix([[1.0f64, 2.0, 2.0], [2.0, 4.0, 4.0], [2.0, 4.0, 4.0]])?;
        let chol = DecompChol::new(&a)?;
        assert_eq!(chol.rank(), 1);

        let b = Tensor::vector([3.0, 6.0, 6.0])?;
        let x = chol.solve_vector(&b)?;
        assert!(x.as_slice().iter().all(|v| v.is_finite()));
        assert!(is_near(&matvec(&a, &x)?, &b, 1e-12)?);
        Ok(())
    }

    #[test]
    fn rejects_indefinite_and_rectangular() -> Result<(), LinalgError> {
        let indefinite = Tensor::matrix([[1.0f64, 0.0], [0.0, -4.0]])?;
        assert_eq!(
            DecompChol::new(&indefinite).err(),
            Some(LinalgError::NonPositiveDefinite(0))
        );
        let rect = Tensor::<f64, 2>::zeros([2, 3], CpuAllocator)?;
        assert!(matches!(
            DecompChol::new(&rect),
            Err(LinalgError::TensorError(TensorError::ShapeMismatch { .. }))
        ));
        Ok(())
    }
}
