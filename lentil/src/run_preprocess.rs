use crate::cli_common::*;

use clap::Args;
use lentil::common::*;
use lentil::pipeline::{prepare_scope, write_scope};

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    #[command(flatten)]
    pub scope: ScopeCliArgs,

    #[arg(
        long,
        short,
        required = true,
        help = "Output header",
        long_help = "Output header for results:\n\
		     - {out}.scope.coord.tsv.gz\n\
		     - {out}.scope.edges.tsv.gz\n\
		     - {out}.scope.features.tsv.gz\n"
    )]
    pub out: Box<str>,

    #[arg(long, short, help = "Enable verbose logging (sets RUST_LOG=info)")]
    pub verbose: bool,
}

/// Build the (subsetted) scope and write it out for external fitters
pub fn run_preprocess(args: &PreprocessArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    // K does not matter before any model is fit
    let params = args.scope.pipeline_params(1, None)?;
    let tables = args.scope.read_tables()?;

    let scope = prepare_scope(&tables, &params)?;
    let features = scope.normalized_features();

    if scope.is_empty() {
        warn!("no cells left in scope; writing empty tables");
    }

    write_scope(&scope, &features, &args.out)?;
    Ok(())
}
