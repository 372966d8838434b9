use crate::common_io::{read_delimited_table, write_lines, Delimiter};
use crate::traits::*;
pub use nalgebra::DMatrix;

use std::fmt::{Debug, Display};
use std::str::FromStr;

impl<T> IoOps for DMatrix<T>
where
    T: nalgebra::Scalar + FromStr + Display + Copy + Send,
    <T as FromStr>::Err: Debug,
{
    type Mat = Self;

    fn read_named(file: &str, delim: impl Into<Delimiter>) -> anyhow::Result<MatWithNames<Self>> {
        let table = read_delimited_table(file, delim)?;

        if table.header.is_empty() {
            return Err(anyhow::anyhow!("empty header in {}", file));
        }

        let cols: Vec<Box<str>> = table.header[1..].to_vec();
        let ncols = cols.len();
        let nrows = table.num_rows();

        let mut rows = Vec::with_capacity(nrows);
        let mut data = Vec::with_capacity(nrows * ncols);

        for (i, words) in table.rows.into_iter().enumerate() {
            let mut words = words.into_iter();
            let name = words
                .next()
                .ok_or_else(|| anyhow::anyhow!("missing row name at row {} of {}", i, file))?;
            rows.push(name);
            for w in words {
                let x = w.parse::<T>().map_err(|e| {
                    anyhow::anyhow!("failed to parse '{}' at row {} of {}: {:?}", w, i, file, e)
                })?;
                data.push(x);
            }
        }

        Ok(MatWithNames {
            rows,
            cols,
            mat: DMatrix::<T>::from_row_iterator(nrows, ncols, data),
        })
    }

    fn write_named(
        &self,
        file: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
        row_name_header: &str,
    ) -> anyhow::Result<()> {
        if row_names.len() != self.nrows() {
            return Err(anyhow::anyhow!(
                "{} row names for {} rows",
                row_names.len(),
                self.nrows()
            ));
        }
        if column_names.len() != self.ncols() {
            return Err(anyhow::anyhow!(
                "{} column names for {} columns",
                column_names.len(),
                self.ncols()
            ));
        }

        let mut lines = Vec::with_capacity(self.nrows() + 1);

        let header = std::iter::once(row_name_header.to_string())
            .chain(column_names.iter().map(|c| c.to_string()))
            .collect::<Vec<_>>()
            .join("\t");
        lines.push(header);

        for (name, row) in row_names.iter().zip(self.row_iter()) {
            let line = std::iter::once(name.to_string())
                .chain(row.iter().map(|x| format!("{}", x)))
                .collect::<Vec<_>>()
                .join("\t");
            lines.push(line);
        }

        write_lines(&lines, file)
    }
}
