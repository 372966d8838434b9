use crate::common_io::Delimiter;

/// A matrix with row and column names attached
pub struct MatWithNames<T> {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub mat: T,
}

/// Read and write matrices from and to delimited text files
pub trait IoOps {
    type Mat;

    /// Read a numeric table whose first column holds row names and
    /// whose header line holds column names.
    fn read_named(file: &str, delim: impl Into<Delimiter>) -> anyhow::Result<MatWithNames<Self::Mat>>;

    fn from_tsv_named(tsv_file: &str) -> anyhow::Result<MatWithNames<Self::Mat>> {
        Self::read_named(tsv_file, "\t")
    }

    /// Write with a header line and a leading row-name column
    fn write_named(
        &self,
        file: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
        row_name_header: &str,
    ) -> anyhow::Result<()>;
}

/// Row-wise operations
pub trait RowOps {
    type Mat;

    /// Divide each row by its sum. Rows summing to zero are left as
    /// zeros and their indices are returned.
    fn sum_to_one_rows_inplace(&mut self) -> Vec<usize>;

    fn sum_to_one_rows(&self) -> (Self::Mat, Vec<usize>);

    /// Column index of the largest entry in each row (first one on ties)
    fn argmax_rows(&self) -> Vec<usize>;
}
