//! LU decomposition with partial pivoting, and the free `inverse`/`determinant`.

use strata_tensor::{
    equal_shapes,
    expr::{identity, Fixed, Lambda},
    product::dot,
    CpuAllocator, IndexVector, Shape, Tensor, TensorLike, TensorLikeMut,
};

use crate::{
    chol::permutation,
    error::{ensure_square, LinalgError},
    geometric::cross,
    scalar::Real,
};

/// The decomposition `A = P L U` of a square matrix.
///
/// `L` is unit lower triangular and `U` upper triangular; both are stored packed in one
/// coefficient matrix.
pub struct DecompLU<T: Real> {
    coeffs: Tensor<T, 2>,
    pivots: Vec<usize>,
    sign: T,
}

impl<T: Real> DecompLU<T> {
    /// Factors a square matrix, pivoting on the largest magnitude of each column.
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch for non-square input and [`LinalgError::SingularMatrix`]
    /// when a pivot is not above [`Real::min_inv`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use strata_linalg::lu::DecompLU;
    /// use strata_tensor::Tensor;
    ///
    /// let a = Tensor::matrix([[0.0f64, 2.0], [4.0, 1.0]]).unwrap();
    /// let lu = DecompLU::new(&a).unwrap();
    /// assert_eq!(lu.pivots(), &[1, 0]);
    /// assert_eq!(lu.determinant(), -8.0);
    /// ```
    pub fn new<E>(expr: &E) -> Result<Self, LinalgError>
    where
        E: TensorLike<2, Value = T> + ?Sized,
    {
        let mut a = Tensor::from_expr(expr, CpuAllocator)?;
        let n = a.rows();
        ensure_square(n, a.cols())?;
        let mut pivots: Vec<usize> = (0..n).collect();
        let mut sign = T::one();
        for j in 0..n {
            let mut k = j;
            for i in (j + 1)..n {
                if a[[i, j]].abs() > a[[k, j]].abs() {
                    k = i;
                }
            }
            if k != j {
                a.swap_rows_in_place(j, k)?;
                pivots.swap(j, k);
                sign = -sign;
            }
            if !(a[[j, j]].abs() > T::min_inv()) {
                return Err(LinalgError::SingularMatrix(j));
            }
            let denom = a[[j, j]].recip();
            for i in (j + 1)..n {
                a[[i, j]] = a[[i, j]] * denom;
                let factor = a[[i, j]];
                for k in (j + 1)..n {
                    a[[i, k]] = a[[i, k]] - factor * a[[j, k]];
                }
            }
        }
        Ok(Self {
            coeffs: a,
            pivots,
            sign,
        })
    }

    /// The order of the matrix.
    pub fn size(&self) -> usize {
        self.pivots.len()
    }

    /// Row `k` of `L U` is row `pivots()[k]` of the input.
    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// `-1` after an odd number of row exchanges, `1` otherwise.
    pub fn sign(&self) -> T {
        self.sign
    }

    /// The permutation matrix `P`.
    pub fn matrix_p(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        permutation(self.coeffs.shape(), &self.pivots)
    }

    /// The unit lower triangular factor `L`.
    pub fn matrix_l(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        Lambda::new(self.coeffs.shape(), move |index: IndexVector<2>| {
            let (i, j) = (index[0], index[1]);
            match i.cmp(&j) {
                std::cmp::Ordering::Greater => self.coeffs[[i, j]],
                std::cmp::Ordering::Equal => T::one(),
                std::cmp::Ordering::Less => T::zero(),
            }
        })
    }

    /// The upper triangular factor `U`.
    pub fn matrix_u(&self) -> Lambda<impl Fn(IndexVector<2>) -> T + '_, 2> {
        Lambda::new(self.coeffs.shape(), move |index: IndexVector<2>| {
            if index[0] <= index[1] {
                self.coeffs[[index[0], index[1]]]
            } else {
                T::zero()
            }
        })
    }

    /// Solves `A X = B`.
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
        let mut x = vec![T::zero(); self.size()];
        for j in 0..bshape.cols() {
            self.solve_column(|i| rhs.at([i, j]), &mut x);
            for (i, v) in x.iter().enumerate() {
                out[[i, j]] = *v;
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
        let shape = equal_shapes(&self.coeffs.shape().take::<1>([0])?, &rhs.shape())?;
        let mut x = vec![T::zero(); self.size()];
        self.solve_column(|i| rhs.at([i]), &mut x);
        Ok(Tensor::from_shape_vec(shape, x, CpuAllocator)?)
    }

    fn solve_column(&self, b: impl Fn(usize) -> T, x: &mut [T]) {
        let a = &self.coeffs;
        let n = x.len();
        for i in 0..n {
            let mut value = b(self.pivots[i]);
            for k in 0..i {
                value = value - a[[i, k]] * x[k];
            }
            x[i] = value;
        }
        for i in (0..n).rev() {
            let mut value = x[i];
            for k in (i + 1)..n {
                value = value - a[[i, k]] * x[k];
            }
            x[i] = value / a[[i, i]];
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

    /// The determinant, the signed product of the diagonal of `U`.
    pub fn determinant(&self) -> T {
        (0..self.size()).fold(self.sign, |acc, i| acc * self.coeffs[[i, i]])
    }
}

/// The inverse of a square matrix, through [`DecompLU`].
///
/// # Errors
///
/// Returns a shape mismatch for non-square input and [`LinalgError::SingularMatrix`] for
/// a singular one.
pub fn inverse<E, T>(expr: &E) -> Result<Tensor<T, 2>, LinalgError>
where
    E: TensorLike<2, Value = T> + ?Sized,
    T: Real,
{
    DecompLU::new(expr)?.inverse()
}

/// The determinant of a square matrix.
///
/// Orders up to three use the closed-form expansions; larger matrices go through
/// [`DecompLU`], and a singular one has determinant zero.
///
/// # Errors
///
/// Returns a shape mismatch for non-square input.
///
/// # Example
///
/// ```rust
/// use strata_linalg::lu::determinant;
/// use strata_tensor::Tensor;
///
/// let a = Tensor::matrix([[2.0f64, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]]).unwrap();
/// assert_eq!(determinant(&a).unwrap(), 24.0);
/// ```
pub fn determinant<E, T>(expr: &E) -> Result<T, LinalgError>
where
    E: TensorLike<2, Value = T> + ?Sized,
    T: Real,
{
    let shape = expr.shape();
    ensure_square(shape.rows(), shape.cols())?;
    match shape.rows() {
        0 => Ok(T::one()),
        1 => Ok(expr.at([0, 0])),
        2 => Ok(expr.at([0, 0]) * expr.at([1, 1]) - expr.at([0, 1]) * expr.at([1, 0])),
        3 => {
            let row = |i| Fixed::<_, 2, 1>::new(expr, 0, i);
            let normal = cross(&row(1)?, &row(2)?)?;
            Ok(dot(&row(0)?, &normal)?)
        }
        _ => match DecompLU::new(expr) {
            Ok(lu) => Ok(lu.determinant()),
            Err(LinalgError::SingularMatrix(_)) => Ok(T::zero()),
            Err(err) => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometric::{is_near, is_near_identity};
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use strata_tensor::{
        product::{matmul, matvec},
        TensorError,
    };

    fn sample() -> Result<Tensor<f64, 2>, TensorError> {
        Tensor::matrix([
            [1.0, 0.0, -3.0, -5.0],
            [7.0, 2.0, -1.0, -1.0],
            [-4.0, -3.0, 0.0, 0.0],
            [8.0, 5.0, 2.0, 1.0],
        ])
    }

    #[test]
    fn determinant_and_inverse() -> Result<(), LinalgError> {
        let x = sample()?;
        let lu = DecompLU::new(&x)?;
        assert_relative_eq!(lu.determinant(), -96.0, epsilon = 1e-10);
        assert_relative_eq!(determinant(&x)?, -96.0, epsilon = 1e-10);
        assert!(is_near_identity(&matmul(&x, &lu.inverse()?)?, 1e-10));
        Ok(())
    }

    #[test]
    fn single_precision_sample() -> Result<(), LinalgError> {
        let x = Tensor::matrix([
            [1.0f32, 0.0, -3.0, -5.0],
            [7.0, 2.0, -1.0, -1.0],
            [-4.0, -3.0, 0.0, 0.0],
            [8.0, 5.0, 2.0, 1.0],
        ])?;
        let lu = DecompLU::new(&x)?;
        assert_relative_eq!(lu.determinant(), -96.0, epsilon = 1e-3);
        assert!(is_near_identity(&matmul(&x, &lu.inverse()?)?, 1e-5));
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<(), LinalgError> {
        let mut rng = StdRng::seed_from_u64(11);
        for n in [1, 2, 5, 8] {
            let x = Tensor::<f64, 2>::from_random([n, n], &mut rng, CpuAllocator)?;
            let lu = DecompLU::new(&x)?;
            let back = matmul(&matmul(&lu.matrix_p(), &lu.matrix_l())?, &lu.matrix_u())?;
            assert!(is_near(&back, &x, 1e-12)?);
            for i in 0..n {
                assert_eq!(lu.matrix_l().at([i, i]), 1.0);
            }
        }
        Ok(())
    }

    #[test]
    fn solve_vector_and_matrix() -> Result<(), LinalgError> {
        let x = sample()?;
        let lu = DecompLU::new(&x)?;
        let b = Tensor::vector([1.0, 2.0, 3.0, 4.0])?;
        let v = lu.solve_vector(&b)?;
        assert!(is_near(&matvec(&x, &v)?, &b, 1e-12)?);

        let rhs = Tensor::matrix([[1.0, 0.0], [0.0, 1.0], [2.0, 2.0], [-1.0, 3.0]])?;
        let m = lu.solve(&rhs)?;
        assert!(is_near(&matmul(&x, &m)?, &rhs, 1e-12)?);
        assert!(lu.solve_vector(&Tensor::vector([1.0, 2.0])?).is_err());
        Ok(())
    }

    #[test]
    fn inverse_twice_is_identity() -> Result<(), LinalgError> {
        let x = sample()?;
        assert!(is_near(&inverse(&inverse(&x)?)?, &x, 1e-10)?);
        Ok(())
    }

    #[test]
    fn singular_matrix() -> Result<(), LinalgError> {
        let x = Tensor::matrix([
            [1.0f64, 2.0, 3.0, 4.0],
            [2.0, 4.0, 6.0, 8.0],
            [0.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0, 0.0],
        ])?;
        assert!(matches!(
            DecompLU::new(&x),
            Err(LinalgError::SingularMatrix(_))
        ));
        assert_eq!(determinant(&x)?, 0.0);
        assert!(inverse(&x).is_err());
        Ok(())
    }

    #[test]
    fn small_closed_forms() -> Result<(), LinalgError> {
        assert_eq!(determinant(&Tensor::<f64, 2>::zeros([0, 0], CpuAllocator)?)?, 1.0);
        assert_eq!(determinant(&Tensor::matrix([[-3.0f64]])?)?, -3.0);
        assert_eq!(determinant(&Tensor::matrix([[1.0f64, 2.0], [3.0, 4.0]])?)?, -2.0);
        let m3 = Tensor::matrix([[2.0f64, -1.0, 0.0], [1.0, 3.0, 2.0], [0.0, 1.0, 1.0]])?;
        assert_eq!(determinant(&m3)?, 3.0);
        assert_relative_eq!(DecompLU::new(&m3)?.determinant(), 3.0, epsilon = 1e-12);
        assert!(determinant(&Tensor::<f64, 2>::zeros([2, 3], CpuAllocator)?).is_err());
        Ok(())
    }
}
