//! Per-sample input tables: coordinates, distance edges and counts.
//!
//! All three tables are tab-separated with a header line and a `sample`
//! column, so one set of files can hold several tissue samples.
//!
//! ```text
//! coordinates: sample  cell  x  y
//! edges:       sample  src   tgt  distance
//! counts:      sample  cell  <feature_1> ... <feature_m>
//! ```

use crate::common::*;
use matrix_util::common_io::{read_delimited_table, write_lines};

/// A raw edge between two cells, indexed by dense sample position
#[derive(Clone, Debug, PartialEq)]
pub struct RawEdge {
    pub src: usize,
    pub tgt: usize,
    pub distance: f32,
}

/// Raw tables of one tissue sample, aligned to one cell ordering
#[derive(Clone, Debug)]
pub struct SampleTables {
    pub sample: Box<str>,
    /// cell keys; position = dense index
    pub cells: Vec<Box<str>>,
    /// n x 2 raw coordinates
    pub coordinates: Mat,
    pub edges: Vec<RawEdge>,
    /// n x m raw counts
    pub counts: Mat,
    pub feature_names: Vec<Box<str>>,
}

impl SampleTables {
    /// Assemble and check shapes
    pub fn new(
        sample: Box<str>,
        cells: Vec<Box<str>>,
        coordinates: Mat,
        edges: Vec<RawEdge>,
        counts: Mat,
        feature_names: Vec<Box<str>>,
    ) -> anyhow::Result<Self> {
        let nn = cells.len();

        if coordinates.nrows() != nn || coordinates.ncols() != 2 {
            return Err(anyhow::anyhow!(
                "coordinates are {} x {}, expected {} x 2",
                coordinates.nrows(),
                coordinates.ncols(),
                nn
            ));
        }

        if counts.nrows() != nn {
            return Err(anyhow::anyhow!(
                "count matrix has {} rows for {} cells",
                counts.nrows(),
                nn
            ));
        }

        if counts.ncols() != feature_names.len() {
            return Err(anyhow::anyhow!(
                "count matrix has {} columns for {} feature names",
                counts.ncols(),
                feature_names.len()
            ));
        }

        if counts.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(anyhow::anyhow!("counts must be finite and non-negative"));
        }

        if let Some(e) = edges.iter().find(|e| e.src >= nn || e.tgt >= nn) {
            return Err(anyhow::anyhow!(
                "edge ({}, {}) out of range for {} cells",
                e.src,
                e.tgt,
                nn
            ));
        }

        Ok(Self {
            sample,
            cells,
            coordinates,
            edges,
            counts,
            feature_names,
        })
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Read one sample out of the three tables
    ///
    /// * `coord_file` - `sample cell x y`
    /// * `edge_file` - `sample src tgt distance`
    /// * `count_file` - `sample cell <features...>`
    /// * `sample` - which sample to keep
    pub fn read(
        coord_file: &str,
        edge_file: &str,
        count_file: &str,
        sample: &str,
    ) -> anyhow::Result<Self> {
        ///////////////////////////////////////////
        // coordinates define the cell ordering //
        ///////////////////////////////////////////

        info!("Reading coordinate file: {}", coord_file);
        let table = read_delimited_table(coord_file, "\t")?;
        let (s_col, c_col) = (table.column_index("sample")?, table.column_index("cell")?);
        let (x_col, y_col) = (table.column_index("x")?, table.column_index("y")?);

        let mut cells = vec![];
        let mut xy = vec![];
        for row in table.rows.iter().filter(|r| r[s_col].as_ref() == sample) {
            cells.push(row[c_col].clone());
            xy.push(parse_f32(&row[x_col], coord_file)?);
            xy.push(parse_f32(&row[y_col], coord_file)?);
        }

        if cells.is_empty() {
            return Err(anyhow::anyhow!(
                "sample '{}' not found in {}",
                sample,
                coord_file
            ));
        }

        let nn = cells.len();
        let coordinates = Mat::from_row_slice(nn, 2, &xy);

        let mut cell_index: HashMap<Box<str>, usize> = HashMap::default();
        for (i, c) in cells.iter().enumerate() {
            if cell_index.insert(c.clone(), i).is_some() {
                return Err(anyhow::anyhow!("duplicate cell '{}' in {}", c, coord_file));
            }
        }

        let lookup = |c: &str, file: &str| -> anyhow::Result<usize> {
            cell_index.get(c).copied().ok_or_else(|| {
                anyhow::anyhow!("cell '{}' in {} has no coordinates", c, file)
            })
        };

        ////////////////////////////////////
        // edges resolved by the same map //
        ////////////////////////////////////

        info!("Reading edge file: {}", edge_file);
        let table = read_delimited_table(edge_file, "\t")?;
        let s_col = table.column_index("sample")?;
        let (src_col, tgt_col) = (table.column_index("src")?, table.column_index("tgt")?);
        let d_col = table.column_index("distance")?;

        let edges = table
            .rows
            .iter()
            .filter(|r| r[s_col].as_ref() == sample)
            .map(|r| {
                Ok(RawEdge {
                    src: lookup(&r[src_col], edge_file)?,
                    tgt: lookup(&r[tgt_col], edge_file)?,
                    distance: parse_f32(&r[d_col], edge_file)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        ///////////////////////////////////////
        // counts re-ordered to match cells //
        ///////////////////////////////////////

        info!("Reading count file: {}", count_file);
        let table = read_delimited_table(count_file, "\t")?;
        let (s_col, c_col) = (table.column_index("sample")?, table.column_index("cell")?);
        let feature_cols: Vec<usize> = (0..table.header.len())
            .filter(|&j| j != s_col && j != c_col)
            .collect();
        let feature_names: Vec<Box<str>> = feature_cols
            .iter()
            .map(|&j| table.header[j].clone())
            .collect();

        let mm = feature_cols.len();
        let mut counts = Mat::zeros(nn, mm);
        let mut seen = vec![false; nn];

        for row in table.rows.iter().filter(|r| r[s_col].as_ref() == sample) {
            let i = lookup(&row[c_col], count_file)?;
            if seen[i] {
                return Err(anyhow::anyhow!(
                    "duplicate cell '{}' in {}",
                    row[c_col],
                    count_file
                ));
            }
            seen[i] = true;
            for (k, &j) in feature_cols.iter().enumerate() {
                counts[(i, k)] = parse_f32(&row[j], count_file)?;
            }
        }

        if let Some(i) = seen.iter().position(|s| !s) {
            return Err(anyhow::anyhow!(
                "cell '{}' has no counts in {}",
                cells[i],
                count_file
            ));
        }

        info!(
            "sample {}: {} cells, {} edges, {} features",
            sample,
            nn,
            edges.len(),
            mm
        );

        Self::new(
            Box::from(sample),
            cells,
            coordinates,
            edges,
            counts,
            feature_names,
        )
    }

    /// Write the three tables in the format `read` expects
    pub fn write(&self, coord_file: &str, edge_file: &str, count_file: &str) -> anyhow::Result<()> {
        let ss = &self.sample;

        let mut lines = vec!["sample\tcell\tx\ty".to_string()];
        for (i, c) in self.cells.iter().enumerate() {
            lines.push(format!(
                "{}\t{}\t{}\t{}",
                ss,
                c,
                self.coordinates[(i, 0)],
                self.coordinates[(i, 1)]
            ));
        }
        write_lines(&lines, coord_file)?;

        let mut lines = vec!["sample\tsrc\ttgt\tdistance".to_string()];
        for e in self.edges.iter() {
            lines.push(format!(
                "{}\t{}\t{}\t{}",
                ss, self.cells[e.src], self.cells[e.tgt], e.distance
            ));
        }
        write_lines(&lines, edge_file)?;

        let header = ["sample", "cell"]
            .into_iter()
            .map(String::from)
            .chain(self.feature_names.iter().map(|f| f.to_string()))
            .collect::<Vec<_>>()
            .join("\t");
        let mut lines = vec![header];
        for (c, row) in self.cells.iter().zip(self.counts.row_iter()) {
            let line = [ss.to_string(), c.to_string()]
                .into_iter()
                .chain(row.iter().map(|x| x.to_string()))
                .collect::<Vec<_>>()
                .join("\t");
            lines.push(line);
        }
        write_lines(&lines, count_file)?;

        info!("wrote {}, {}, {}", coord_file, edge_file, count_file);
        Ok(())
    }
}

fn parse_f32(word: &str, file: &str) -> anyhow::Result<f32> {
    word.trim()
        .parse::<f32>()
        .map_err(|e| anyhow::anyhow!("cannot parse '{}' in {}: {}", word, file, e))
}
