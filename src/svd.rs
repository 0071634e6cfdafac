//! Define an SVD container and truncation tools.

use crate::types::{FactorScalar, FactorizeError, Result, Scalar};
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix2, Zip};
use ndarray_linalg::{JobSvd, SVDDCInto};

pub struct SVDData<A: Scalar> {
    /// The U matrix
    pub u: Array2<A>,
    /// The array of singular values
    pub s: Array1<A::Real>,
    /// The vt matrix
    pub vt: Array2<A>,
}

impl<A: FactorScalar> SVDData<A> {
    /// Compute the thin SVD of `arr` with the divide and conquer driver.
    pub fn compute<S: Data<Elem = A>>(arr: &ArrayBase<S, Ix2>) -> Result<SVDData<A>> {
        let (u, s, vt) = arr.to_owned().svddc_into(JobSvd::Some)?;

        match (u, vt) {
            (Some(u), Some(vt)) => Ok(SVDData { u, s, vt }),
            _ => Err(FactorizeError::SvdError),
        }
    }

    /// Number of singular triplets held by the container.
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Keep only the `max_rank` dominant singular triplets.
    pub fn compress_rank(self, max_rank: usize) -> SVDData<A> {
        let k = max_rank.min(self.s.len());

        SVDData {
            u: self.u.slice_move(s![.., ..k]),
            s: self.s.slice_move(s![..k]),
            vt: self.vt.slice_move(s![..k, ..]),
        }
    }

    /// The represented matrix `U diag(s) Vt`.
    pub fn to_mat(&self) -> Array2<A> {
        let s_col = self.s.view().insert_axis(Axis(1));

        self.u.dot(&(&self.vt * &s_col))
    }

    /// Split into factors `(U sqrt(S), sqrt(S) Vt)` whose product is the
    /// represented matrix.
    ///
    /// Both factors carry the same share of the singular values, which keeps
    /// their column and row norms comparable for the subsequent solves.
    pub fn into_balanced_factors(self) -> (Array2<A>, Array2<A>) {
        let (mut u, s, mut vt) = (self.u, self.s, self.vt);
        let s_sqrt = s.mapv(Scalar::sqrt);

        Zip::from(u.axis_iter_mut(Axis(1)))
            .and(s_sqrt.view())
            .for_each(|mut col, &s_elem| col.map_inplace(|item| *item *= s_elem));
        Zip::from(vt.axis_iter_mut(Axis(0)))
            .and(s_sqrt.view())
            .for_each(|mut row, &s_elem| row.map_inplace(|item| *item *= s_elem));

        (u, vt)
    }
}
