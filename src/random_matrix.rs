//! Generation of random matrices and activation tensors for tests and benchmarks.

use crate::svd::SVDData;
use crate::types::{FactorScalar, Result, Scalar};
use ndarray::{Array, Array2, Array4};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

pub trait RandomMatrix
where
    Self: FactorScalar,
{
    /// Generate a random Gaussian matrix.
    ///
    /// # Arguments
    ///
    /// * `dimension`: Tuple (rows, cols) specifying the number of rows and columns.
    /// * `rng`: The random number generator to use.
    fn random_gaussian<R: Rng>(dimension: (usize, usize), rng: &mut R) -> Array2<Self> {
        Array2::from_shape_simple_fn(dimension, || sample_standard_normal(rng))
    }

    /// Generate a random activation tensor of shape `[batch, channels, height, width]`
    /// with standard normal entries.
    fn random_activations<R: Rng>(
        dimension: (usize, usize, usize, usize),
        rng: &mut R,
    ) -> Array4<Self> {
        Array4::from_shape_simple_fn(dimension, || sample_standard_normal(rng))
    }

    /// Generate a random matrix with orthonormal rows or columns.
    ///
    /// If m > n then the returned matrix has orthonormal columns. If n > m
    /// the returned matrix has orthonormal rows.
    fn random_orthogonal_matrix<R: Rng>(dimension: (usize, usize), rng: &mut R) -> Result<Array2<Self>> {
        let (m, n) = dimension;
        let tall = if n > m { (n, m) } else { (m, n) };

        let u = SVDData::compute(&Self::random_gaussian(tall, rng))?.u;

        if n > m {
            Ok(u.reversed_axes())
        } else {
            Ok(u)
        }
    }

    /// Generate a random approximate low-rank matrix.
    ///
    /// The singular values are logarithmically distributed between
    /// `sigma_min` and `sigma_max`.
    ///
    /// # Arguments
    ///
    /// * `dimension`: Tuple (rows, cols) specifying the number of rows and columns.
    /// * `sigma_max`: Maximum singular value.
    /// * `sigma_min`: Minimum singular value.
    /// * `rng`: The random number generator to use.
    fn random_approximate_low_rank_matrix<R: Rng>(
        dimension: (usize, usize),
        sigma_max: f64,
        sigma_min: f64,
        rng: &mut R,
    ) -> Result<Array2<Self>> {
        assert!(
            sigma_min < sigma_max,
            "`sigma_min` must be smaller than `sigma_max`"
        );
        assert!(sigma_min > 0.0, "`sigma_min` must be positive.");

        let min_dim = std::cmp::min(dimension.0, dimension.1);

        let u = Self::random_orthogonal_matrix((dimension.0, min_dim), rng)?;
        let vt = Self::random_orthogonal_matrix((min_dim, dimension.1), rng)?;
        let singvals = Array::geomspace(sigma_min, sigma_max, min_dim)
            .unwrap_or_else(|| Array::from_elem(min_dim, sigma_max))
            .mapv(<Self as Scalar>::real);

        Ok(SVDData { u, s: singvals, vt }.to_mat())
    }
}

fn sample_standard_normal<T: FactorScalar, R: Rng>(rng: &mut R) -> T {
    let value: f64 = StandardNormal.sample(rng);
    <T as Scalar>::real(value)
}

impl RandomMatrix for f32 {}
impl RandomMatrix for f64 {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::RelDiff;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_orthogonal_matrix_thin_and_thick() {
        let mut rng = StdRng::seed_from_u64(3);

        let thin = f64::random_orthogonal_matrix((30, 5), &mut rng).unwrap();
        assert_eq!(thin.dim(), (30, 5));
        assert!(thin.t().dot(&thin).rel_diff(&Array2::eye(5)).unwrap() < 1E-12);

        let thick = f64::random_orthogonal_matrix((5, 30), &mut rng).unwrap();
        assert_eq!(thick.dim(), (5, 30));
        assert!(thick.dot(&thick.t()).rel_diff(&Array2::eye(5)).unwrap() < 1E-12);
    }

    #[test]
    fn test_low_rank_matrix_singular_values() {
        let mut rng = StdRng::seed_from_u64(4);
        let mat = f64::random_approximate_low_rank_matrix((20, 10), 1.0, 1E-3, &mut rng).unwrap();

        let svd = SVDData::compute(&mat).unwrap();

        assert!((svd.s[0] - 1.0).abs() < 1E-10);
        assert!((svd.s[9] - 1E-3).abs() < 1E-10);
    }

    #[test]
    fn test_activations_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let act = f32::random_activations((2, 3, 5, 7), &mut rng);

        assert_eq!(act.dim(), (2, 3, 5, 7));
    }
}
