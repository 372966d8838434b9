//! Row-normalized cell-by-feature proportions.

use crate::common::*;

/// Row-stochastic cell-by-feature matrix
#[derive(Clone, Debug)]
pub struct FeatureMatrix {
    /// n x m; rows sum to one except for `zero_rows`
    pub data: Mat,
    /// rows whose raw counts summed to zero; kept as all-zero
    pub zero_rows: Vec<usize>,
}

impl FeatureMatrix {
    pub fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.data.ncols()
    }
}

/// Divide each row of a count matrix by its sum.
///
/// A row with zero total cannot be normalized; it stays all-zero and is
/// listed in `zero_rows` instead of turning into NaN.
pub fn normalize_features(counts: &Mat) -> FeatureMatrix {
    let (data, zero_rows) = counts.sum_to_one_rows();

    if !zero_rows.is_empty() {
        warn!(
            "{} cell(s) with zero total count left unnormalized",
            zero_rows.len()
        );
    }

    FeatureMatrix { data, zero_rows }
}
