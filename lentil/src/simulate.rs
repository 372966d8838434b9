use crate::common::*;
use crate::input::{RawEdge, SampleTables};
use crate::pipeline::topic_names;
use crate::topic_model::{DictionaryLayout, ModelEntry, ModelManifest};

use matrix_util::common_io::mkdir;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, Poisson};
use std::path::Path;

/// Sample name used in simulated tables
pub const SIM_SAMPLE: &str = "sim";

#[derive(Clone, Debug)]
pub struct SimArgs {
    /// lattice rows
    pub rows: usize,
    /// lattice columns
    pub cols: usize,
    /// number of vertical stripe domains (= true K)
    pub n_domains: usize,
    pub n_features: usize,
    /// expected total count per cell
    pub depth: f32,
    /// loading mass spread uniformly over all topics
    pub noise: f32,
    pub rseed: u64,
}

pub struct SimOut {
    pub tables: SampleTables,
    /// n x K true loadings
    pub loading: Mat,
    /// m x K true feature profiles (columns sum to one)
    pub dictionary: Mat,
}

impl SimArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rows < 1 || self.cols < 1 {
            return Err(anyhow::anyhow!("empty lattice {} x {}", self.rows, self.cols));
        }
        if self.n_domains < 1 || self.n_domains > self.cols {
            return Err(anyhow::anyhow!(
                "need 1 ≤ domains ≤ columns, got {} domains for {} columns",
                self.n_domains,
                self.cols
            ));
        }
        if self.n_features < 1 {
            return Err(anyhow::anyhow!("need at least one feature"));
        }
        if !(self.depth.is_finite() && self.depth > 0.0) {
            return Err(anyhow::anyhow!("depth must be positive, got {}", self.depth));
        }
        if !(0.0..=1.0).contains(&self.noise) {
            return Err(anyhow::anyhow!("noise must be in [0, 1], got {}", self.noise));
        }
        Ok(())
    }
}

/// Simulate a tissue lattice with stripe domains
///
/// ```text
/// domain(r, c) = c * K / cols
/// W(i,k)       = (1 - noise) * [k = domain(i)] + noise / K
/// beta(k,.)    ~ normalized Gamma(1, 1)
/// Y(i,f)       ~ Poisson( depth * sum_k W(i,k) * beta(k,f) )
/// ```
///
/// Edges join 4-neighbours in both directions with distance 1.
pub fn generate_spatial_topic_data(args: &SimArgs) -> anyhow::Result<SimOut> {
    args.validate()?;

    let (rows, cols) = (args.rows, args.cols);
    let nn = rows * cols;
    let kk = args.n_domains;
    let mm = args.n_features;

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.rseed);

    // 1. feature profiles
    let rgamma = Gamma::new(1.0_f32, 1.0_f32)?;
    let mut beta_km = Mat::from_fn(kk, mm, |_, _| rgamma.sample(&mut rng));
    beta_km.sum_to_one_rows_inplace();

    // 2. stripe loadings
    let background = args.noise / kk as f32;
    let mut loading = Mat::from_element(nn, kk, background);
    for i in 0..nn {
        let k = (i % cols) * kk / cols;
        loading[(i, k)] += 1.0 - args.noise;
    }
    info!("simulated {} cells in {} stripe domains", nn, kk);

    // 3. Poisson counts
    let lambda = (&loading * &beta_km) * args.depth;
    let counts = lambda.map(|l| match Poisson::new(l) {
        Ok(rpois) => rpois.sample(&mut rng),
        Err(_) => 0.0,
    });

    // 4. lattice geometry
    let cells: Vec<Box<str>> = (0..nn)
        .map(|i| format!("cell_{}", i).into_boxed_str())
        .collect();

    let coordinates = Mat::from_fn(nn, 2, |i, j| {
        if j == 0 {
            (i % cols) as f32
        } else {
            (i / cols) as f32
        }
    });

    let mut edges = vec![];
    for r in 0..rows {
        for c in 0..cols {
            let i = r * cols + c;
            let mut neighbours = vec![];
            if c + 1 < cols {
                neighbours.push(i + 1);
            }
            if r + 1 < rows {
                neighbours.push(i + cols);
            }
            for j in neighbours {
                edges.push(RawEdge {
                    src: i,
                    tgt: j,
                    distance: 1.0,
                });
                edges.push(RawEdge {
                    src: j,
                    tgt: i,
                    distance: 1.0,
                });
            }
        }
    }

    let feature_names: Vec<Box<str>> = (0..mm)
        .map(|f| format!("f_{}", f).into_boxed_str())
        .collect();

    let tables = SampleTables::new(
        SIM_SAMPLE.into(),
        cells,
        coordinates,
        edges,
        counts,
        feature_names,
    )?;

    Ok(SimOut {
        tables,
        loading,
        dictionary: beta_km.transpose(),
    })
}

/// Output files of [`write_simulation`]
pub struct SimFiles {
    pub coord_file: Box<str>,
    pub edge_file: Box<str>,
    pub count_file: Box<str>,
    pub manifest_file: Box<str>,
}

/// Write the sample tables, the true parameters, and a manifest that
/// evaluates the truth as if it were a fitted model
///
/// * `{out}.coord.tsv.gz`, `{out}.edges.tsv.gz`, `{out}.counts.tsv.gz`
/// * `{out}.truth.loading.tsv.gz`, `{out}.truth.dictionary.tsv.gz`
/// * `{out}.manifest.json`
pub fn write_simulation(sim: &SimOut, out: &str) -> anyhow::Result<SimFiles> {
    mkdir(out)?;

    let files = SimFiles {
        coord_file: format!("{}.coord.tsv.gz", out).into(),
        edge_file: format!("{}.edges.tsv.gz", out).into(),
        count_file: format!("{}.counts.tsv.gz", out).into(),
        manifest_file: format!("{}.manifest.json", out).into(),
    };

    sim.tables
        .write(&files.coord_file, &files.edge_file, &files.count_file)?;

    let topics = topic_names(sim.loading.ncols());

    let loading_file = format!("{}.truth.loading.tsv.gz", out);
    sim.loading
        .write_named(&loading_file, &sim.tables.cells, &topics, "cell")?;

    let dict_file = format!("{}.truth.dictionary.tsv.gz", out);
    sim.dictionary
        .write_named(&dict_file, &sim.tables.feature_names, &topics, "feature")?;

    // the manifest sits next to the tables; refer to them by file name
    let local_name = |file: &str| -> String {
        Path::new(file)
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string())
    };

    let manifest = ModelManifest {
        models: vec![ModelEntry {
            name: "truth".to_string(),
            loading: local_name(&loading_file),
            dictionary: Some(local_name(&dict_file)),
            dictionary_layout: DictionaryLayout::FeatureByTopic,
            fit_seconds: Some(0.0),
        }],
    };
    manifest.to_json_file(&files.manifest_file)?;

    info!(
        "wrote simulated sample:\n{},\n{},\n{},\n{}",
        files.coord_file, files.edge_file, files.count_file, files.manifest_file
    );

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn args() -> SimArgs {
        SimArgs {
            rows: 4,
            cols: 6,
            n_domains: 3,
            n_features: 5,
            depth: 100.0,
            noise: 0.1,
            rseed: 7,
        }
    }

    #[test]
    fn lattice_shapes_and_domains() {
        let sim = generate_spatial_topic_data(&args()).unwrap();
        let tables = &sim.tables;

        assert_eq!(tables.num_cells(), 24);
        assert_eq!(tables.counts.ncols(), 5);
        // 4 x 5 horizontal + 3 x 6 vertical pairs, both directions
        assert_eq!(tables.edges.len(), 2 * (4 * 5 + 3 * 6));

        assert_eq!(sim.loading.argmax_rows()[0], 0);
        assert_eq!(sim.loading.argmax_rows()[2], 1);
        assert_eq!(sim.loading.argmax_rows()[11], 2);

        for row in sim.loading.row_iter() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
        }
        for col in sim.dictionary.column_iter() {
            assert_abs_diff_eq!(col.sum(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn same_seed_same_counts() {
        let a = generate_spatial_topic_data(&args()).unwrap();
        let b = generate_spatial_topic_data(&args()).unwrap();
        assert_eq!(a.tables.counts, b.tables.counts);
    }

    #[test]
    fn invalid_arguments() {
        let mut bad = args();
        bad.n_domains = 7;
        assert!(generate_spatial_topic_data(&bad).is_err());

        let mut bad = args();
        bad.noise = 1.5;
        assert!(generate_spatial_topic_data(&bad).is_err());

        let mut bad = args();
        bad.depth = 0.0;
        assert!(generate_spatial_topic_data(&bad).is_err());
    }
}
