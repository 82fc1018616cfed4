use std::ops::{Deref, DerefMut};

/// A multi-dimensional coordinate with a rank fixed at compile time.
///
/// Ordering is lexicographic, most significant axis first, which is also the order in
/// which [`crate::Shape::for_each`] visits coordinates.
///
/// # Example
///
/// ```rust
/// use strata_tensor::IndexVector;
///
/// let mut index = IndexVector([0, 2]);
/// assert!(!index.increment_in_place(&[2, 3]));
/// assert_eq!(index, IndexVector([1, 0]));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexVector<const N: usize>(pub [usize; N]);

impl<const N: usize> IndexVector<N> {
    /// The number of components.
    pub const RANK: usize = N;

    /// Returns the coordinate as a plain array.
    #[inline]
    pub fn into_array(self) -> [usize; N] {
        self.0
    }

    /// Advances the coordinate like an odometer.
    ///
    /// The last axis is incremented first. A component that reaches its limit wraps to
    /// zero and carries into the previous axis.
    ///
    /// # Arguments
    ///
    /// * `limit` - The exclusive upper bound of every component.
    ///
    /// # Returns
    ///
    /// `true` when the carry ran off the most significant axis, meaning every coordinate
    /// below `limit` has been visited and the index wrapped back to all zeros.
    pub fn increment_in_place(&mut self, limit: &[usize; N]) -> bool {
        for k in (0..N).rev() {
            self.0[k] += 1;
            if self.0[k] >= limit[k] {
                self.0[k] = 0;
            } else {
                return false;
            }
        }
        true
    }
}

impl<const N: usize> Default for IndexVector<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> Deref for IndexVector<N> {
    type Target = [usize; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for IndexVector<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> From<[usize; N]> for IndexVector<N> {
    fn from(value: [usize; N]) -> Self {
        Self(value)
    }
}

impl From<IndexVector<1>> for usize {
    fn from(value: IndexVector<1>) -> Self {
        value.0[0]
    }
}

impl From<usize> for IndexVector<1> {
    fn from(value: usize) -> Self {
        Self([value])
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Computes the binomial coefficient `n` choose `k`.
///
/// Returns 0 when `k > n` and saturates at `usize::MAX` when the coefficient does not fit.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result = 1usize;
    for i in 0..k {
        // result * (n - i) is divisible by i + 1; cancel the common factor first.
        let g = gcd(result, i + 1);
        let factor = (n - i) / ((i + 1) / g);
        match (result / g).checked_mul(factor) {
            Some(next) => result = next,
            None => return usize::MAX,
        }
    }
    result
}

/// Maps a linear index to the `i`-th `K`-combination of `{0, .., N - 1}`.
///
/// Combinations are numbered in lexicographic order, so `combination::<5, 3>(0)` is
/// `[0, 1, 2]` and `combination::<5, 3>(9)` is `[2, 3, 4]`.
///
/// # Arguments
///
/// * `i` - The linear index, expected in `0..binomial(N, K)`.
pub fn combination<const N: usize, const K: usize>(i: usize) -> IndexVector<K> {
    const { assert!(K <= N, "a combination cannot pick more elements than the set holds") };
    let mut index = IndexVector::<K>::default();
    if K == 0 {
        return index;
    }
    let mut n = 0;
    let mut skipped = 0;
    for k in 0..K - 1 {
        loop {
            let count = binomial(N - 1 - n, K - 1 - k);
            if skipped + count <= i {
                skipped += count;
                n += 1;
            } else {
                break;
            }
        }
        index[k] = n;
        n += 1;
    }
    index[K - 1] = if K > 1 { index[K - 2] + 1 + i - skipped } else { i };
    index
}

/// Returns the finite sequence of every `K`-combination of `{0, .., N - 1}`.
///
/// The iterator is `Clone`, so a saved copy restarts the sequence.
pub fn combinations<const N: usize, const K: usize>() -> Combinations<N, K> {
    Combinations {
        next: 0,
        count: binomial(N, K),
    }
}

/// Iterator over all `K`-combinations of `{0, .., N - 1}` in lexicographic order.
#[derive(Clone, Debug)]
pub struct Combinations<const N: usize, const K: usize> {
    next: usize,
    count: usize,
}

impl<const N: usize, const K: usize> Iterator for Combinations<N, K> {
    type Item = IndexVector<K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let item = combination::<N, K>(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl<const N: usize, const K: usize> ExactSizeIterator for Combinations<N, K> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_wraps_row_major() {
        let limit = [2, 3];
        let mut index = IndexVector([0, 0]);
        let mut visited = vec![index];
        while !index.increment_in_place(&limit) {
            visited.push(index);
        }
        assert_eq!(
            visited,
            vec![
                IndexVector([0, 0]),
                IndexVector([0, 1]),
                IndexVector([0, 2]),
                IndexVector([1, 0]),
                IndexVector([1, 1]),
                IndexVector([1, 2]),
            ]
        );
        assert_eq!(index, IndexVector([0, 0]));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(IndexVector([0, 5]) < IndexVector([1, 0]));
        assert!(IndexVector([1, 2, 3]) < IndexVector([1, 2, 4]));
        assert_eq!(usize::from(IndexVector([7])), 7);
    }

    #[test]
    fn binomial_small() {
        assert_eq!(binomial(5, 3), 10);
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(3, 4), 0);
        assert_eq!(binomial(10, 5), 252);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn binomial_large() {
        assert_eq!(binomial(67, 33), 14226520737620288370);
        assert_eq!(binomial(67, 34), 14226520737620288370);
        assert_eq!(binomial(100, 50), usize::MAX);
        assert_eq!(binomial(usize::MAX, 1), usize::MAX);
        assert_eq!(binomial(usize::MAX, usize::MAX), 1);
    }

    #[test]
    fn combination_five_choose_three() {
        let expected = [
            [0, 1, 2],
            [0, 1, 3],
            [0, 1, 4],
            [0, 2, 3],
            [0, 2, 4],
            [0, 3, 4],
            [1, 2, 3],
            [1, 2, 4],
            [1, 3, 4],
            [2, 3, 4],
        ];
        for (i, e) in expected.iter().enumerate() {
            assert_eq!(combination::<5, 3>(i), IndexVector(*e));
        }
    }

    #[test]
    fn combinations_restartable() {
        let all = combinations::<4, 2>();
        assert_eq!(all.len(), 6);
        let first: Vec<_> = all.clone().collect();
        let second: Vec<_> = all.collect();
        assert_eq!(first, second);
        assert_eq!(first[0], IndexVector([0, 1]));
        assert_eq!(first[5], IndexVector([2, 3]));
        assert_eq!(combinations::<3, 1>().map(|c| c[0]).collect::<Vec<_>>(), [0, 1, 2]);
    }
}
