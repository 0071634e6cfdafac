//! Data-aware low rank factorization of linear operators.
//!
//! Given sample inputs $X$ and outputs $Y$ of a linear operator $W$, the
//! routines in this crate replace $W$ by a product $W_aW_b$ of lower
//! intermediate dimension, chosen to minimize the error on $XW_aW_b$ rather
//! than the distance to $W$ itself. [factorize_matrix] handles plain matrices,
//! [factorize_conv2d] reduces 2d convolutions to the same problem.
//!
//! All routines borrow their inputs immutably and allocate fresh outputs. No
//! gradients are tracked or propagated through any of the operations.

pub mod conv2d;
pub mod factorize;
pub mod helpers;
pub mod lstsq;
pub mod operator;
pub mod prelude;
pub mod random_matrix;
pub mod solution;
pub mod svd;
pub mod traits;
pub mod types;

use types::{FactorizeError, Result};

/// Target intermediate dimension of a factorization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RankSpec {
    /// Absolute rank.
    Absolute(usize),
    /// Fraction in (0, 1) of the input dimension or the current rank of the
    /// operator, whichever is smaller.
    Fraction(f64),
}

impl RankSpec {
    /// Resolve to an absolute rank.
    ///
    /// A fraction `f` resolves to `floor(f * min(input_dim, current_rank))`.
    /// Fails if the fraction lies outside (0, 1) or the resolved rank is 0.
    pub fn resolve(self, input_dim: usize, current_rank: usize) -> Result<usize> {
        let rank = match self {
            RankSpec::Absolute(rank) => rank,
            RankSpec::Fraction(fraction) => {
                if !(fraction > 0.0 && fraction < 1.0) {
                    return Err(FactorizeError::InvalidRank(format!(
                        "rank fraction must lie in (0, 1), got {}",
                        fraction
                    )));
                }
                (fraction * std::cmp::min(input_dim, current_rank) as f64).floor() as usize
            }
        };

        if rank == 0 {
            return Err(FactorizeError::InvalidRank(format!(
                "{:?} resolves to rank 0 for input dimension {} and current rank {}",
                self, input_dim, current_rank
            )));
        }
        Ok(rank)
    }
}

impl From<usize> for RankSpec {
    fn from(rank: usize) -> Self {
        RankSpec::Absolute(rank)
    }
}

impl From<f64> for RankSpec {
    /// Values below 1 are fractions, anything else is truncated to an absolute rank.
    fn from(rank: f64) -> Self {
        if rank < 1.0 {
            RankSpec::Fraction(rank)
        } else {
            RankSpec::Absolute(rank as usize)
        }
    }
}

pub use conv2d::{factorize_conv2d, Conv2dParams, PaddingMode};
pub use factorize::{factorize_matrix, FactorizeOptions};
pub use operator::Operator;
pub use solution::LowRankSolution;
pub use types::FactorScalar;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_rank() {
        assert_eq!(RankSpec::Absolute(3).resolve(8, 4).unwrap(), 3);
        assert_eq!(RankSpec::from(5usize).resolve(8, 4).unwrap(), 5);
    }

    #[test]
    fn test_resolve_fraction_uses_smaller_dimension() {
        assert_eq!(RankSpec::Fraction(0.5).resolve(8, 4).unwrap(), 2);
        assert_eq!(RankSpec::Fraction(0.5).resolve(6, 10).unwrap(), 3);
        // Truncation, not rounding.
        assert_eq!(RankSpec::Fraction(0.7).resolve(10, 10).unwrap(), 7);
        assert_eq!(RankSpec::Fraction(0.99).resolve(3, 3).unwrap(), 2);
    }

    #[test]
    fn test_rank_from_float() {
        assert_eq!(RankSpec::from(0.25), RankSpec::Fraction(0.25));
        assert_eq!(RankSpec::from(4.0), RankSpec::Absolute(4));
    }

    #[test]
    fn test_resolve_invalid_ranks() {
        for spec in [
            RankSpec::Absolute(0),
            RankSpec::Fraction(0.0),
            RankSpec::Fraction(1.5),
            RankSpec::Fraction(f64::NAN),
            RankSpec::Fraction(0.1),
        ]
        .iter()
        {
            assert!(matches!(
                spec.resolve(4, 4),
                Err(FactorizeError::InvalidRank(_))
            ));
        }
    }
}
