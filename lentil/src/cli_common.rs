use clap::Args;

use lentil::coordinates::CoordinateScaling;
use lentil::edge_weight::DistanceSource;
use lentil::input::SampleTables;
use lentil::metrics::DEFAULT_PAS_THRESHOLD;
use lentil::pipeline::PipelineParams;
use lentil::scope::Rectangle;

/// Input tables and scope construction shared by subcommands
#[derive(Args, Debug, Clone)]
pub struct ScopeCliArgs {
    #[arg(
        long,
        short = 'x',
        required = true,
        help = "Coordinate table",
        long_help = "Coordinate table (tab-separated, `.gz` accepted).\n\
		     Header: sample  cell  x  y"
    )]
    pub coord_file: Box<str>,

    #[arg(
        long,
        short = 'e',
        required = true,
        help = "Edge table",
        long_help = "Distance edge table (tab-separated, `.gz` accepted).\n\
		     Header: sample  src  tgt  distance\n\
		     `src` and `tgt` are cell names of the same sample."
    )]
    pub edge_file: Box<str>,

    #[arg(
        long,
        short = 'c',
        required = true,
        help = "Count table",
        long_help = "Cell-by-feature count table (tab-separated, `.gz` accepted).\n\
		     Header: sample  cell  <feature_1> ... <feature_m>"
    )]
    pub count_file: Box<str>,

    #[arg(long, short, required = true, help = "Sample to analyze")]
    pub sample: Box<str>,

    #[arg(
        long,
        default_value_t = 1.0,
        help = "Kernel bandwidth φ",
        long_help = "Bandwidth φ of the edge weight kernel exp(-d^2/φ).\n\
		     Larger values decay more slowly."
    )]
    pub phi: f32,

    #[arg(
        long,
        value_delimiter(','),
        allow_negative_numbers = true,
        help = "Region min_x,max_x,min_y,max_y",
        long_help = "Keep only cells strictly inside this rectangle\n\
		     of normalized coordinates: min_x,max_x,min_y,max_y.\n\
		     Default: the whole unit square (no subsetting)."
    )]
    pub region: Option<Vec<f32>>,

    #[arg(long, value_enum, default_value_t = CoordinateScaling::Diagonal,
          help = "Coordinate normalization")]
    pub scaling: CoordinateScaling,

    #[arg(long, value_enum, default_value_t = DistanceSource::Recorded,
          help = "Distances used for edge weights")]
    pub distance_source: DistanceSource,
}

impl ScopeCliArgs {
    pub fn read_tables(&self) -> anyhow::Result<SampleTables> {
        SampleTables::read(&self.coord_file, &self.edge_file, &self.count_file, &self.sample)
    }

    pub fn region(&self) -> anyhow::Result<Rectangle> {
        match self.region.as_deref() {
            None => Ok(Rectangle::unit()),
            Some(&[min_x, max_x, min_y, max_y]) => Ok(Rectangle::new(min_x, max_x, min_y, max_y)),
            Some(v) => Err(anyhow::anyhow!("region needs 4 values, got {}", v.len())),
        }
    }

    /// Parameters with `K` and threshold supplied by the subcommand
    pub fn pipeline_params(
        &self,
        n_topics: usize,
        pas_threshold: Option<f32>,
    ) -> anyhow::Result<PipelineParams> {
        let params = PipelineParams {
            phi: self.phi,
            n_topics,
            region: self.region()?,
            scaling: self.scaling,
            distance_source: self.distance_source,
            pas_threshold: pas_threshold.unwrap_or(DEFAULT_PAS_THRESHOLD),
        };
        params.validate()?;
        Ok(params)
    }
}
