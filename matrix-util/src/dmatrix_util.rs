use crate::traits::RowOps;
pub use nalgebra::DMatrix;
use nalgebra::RealField;
use num_traits::Float;

impl<T> RowOps for DMatrix<T>
where
    T: RealField + Float,
{
    type Mat = Self;

    fn sum_to_one_rows_inplace(&mut self) -> Vec<usize> {
        let mut zero_rows = vec![];
        for (i, mut row) in self.row_iter_mut().enumerate() {
            let denom = row.sum();
            if denom > T::zero() {
                row /= denom;
            } else {
                row.fill(T::zero());
                zero_rows.push(i);
            }
        }
        zero_rows
    }

    fn sum_to_one_rows(&self) -> (Self, Vec<usize>) {
        let mut ret = self.clone();
        let zero_rows = ret.sum_to_one_rows_inplace();
        (ret, zero_rows)
    }

    fn argmax_rows(&self) -> Vec<usize> {
        self.row_iter()
            .map(|row| {
                let mut best = 0;
                let mut best_val = <T as Float>::neg_infinity();
                for (k, &x) in row.iter().enumerate() {
                    if x > best_val {
                        best = k;
                        best_val = x;
                    }
                }
                best
            })
            .collect()
    }
}

/// Select a subset of rows, in the given order
pub fn select_rows(xx: &DMatrix<f32>, rows: &[usize]) -> DMatrix<f32> {
    DMatrix::from_fn(rows.len(), xx.ncols(), |i, j| xx[(rows[i], j)])
}

/// Column-wise minimum and maximum; `None` for an empty matrix
pub fn column_ranges(xx: &DMatrix<f32>) -> Option<Vec<(f32, f32)>> {
    if xx.nrows() == 0 {
        return None;
    }
    Some(
        xx.column_iter()
            .map(|col| (col.min(), col.max()))
            .collect(),
    )
}
