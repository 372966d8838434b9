use clap::Args;
use lentil::simulate::*;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 30, help = "Lattice rows")]
    pub rows: usize,

    #[arg(long, default_value_t = 40, help = "Lattice columns")]
    pub cols: usize,

    #[arg(
        long,
        short = 'k',
        default_value_t = 4,
        help = "Number of stripe domains (true K)"
    )]
    pub n_domains: usize,

    #[arg(long, short = 'm', default_value_t = 50, help = "Number of features")]
    pub n_features: usize,

    #[arg(long, default_value_t = 500.0, help = "Expected count per cell")]
    pub depth: f32,

    #[arg(
        long,
        default_value_t = 0.1,
        help = "Loading noise",
        long_help = "Fraction of each cell's loading spread uniformly\n\
		     over all topics instead of its own domain."
    )]
    pub noise: f32,

    #[arg(long, default_value_t = 42, help = "Random seed")]
    pub rseed: u64,

    #[arg(
        long,
        short,
        required = true,
        help = "Output header",
        long_help = "Output header for results:\n\
		     - {out}.coord.tsv.gz, {out}.edges.tsv.gz, {out}.counts.tsv.gz\n\
		     - {out}.truth.loading.tsv.gz, {out}.truth.dictionary.tsv.gz\n\
		     - {out}.manifest.json\n"
    )]
    pub out: Box<str>,

    #[arg(long, short, help = "Enable verbose logging (sets RUST_LOG=info)")]
    pub verbose: bool,
}

pub fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let sim = generate_spatial_topic_data(&SimArgs {
        rows: args.rows,
        cols: args.cols,
        n_domains: args.n_domains,
        n_features: args.n_features,
        depth: args.depth,
        noise: args.noise,
        rseed: args.rseed,
    })?;

    write_simulation(&sim, &args.out)?;
    Ok(())
}
