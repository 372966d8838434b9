use crate::cli_common::*;

use clap::Args;
use lentil::common::*;
use lentil::pipeline::{run_pipeline, write_outputs};
use lentil::topic_model::{ModelManifest, TopicModel};

use std::path::Path;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub scope: ScopeCliArgs,

    #[arg(
        long,
        short,
        required = true,
        help = "Model manifest (JSON)",
        long_help = "JSON manifest of precomputed topic model outputs:\n\
		     {\"models\": [{\"name\": ..., \"loading\": ..., \"dictionary\": ...,\n\
		                   \"dictionary_layout\": \"feature_by_topic\"|\"topic_by_feature\",\n\
		                   \"fit_seconds\": ...}]}\n\
		     Relative paths are resolved against the manifest's directory."
    )]
    pub manifest: Box<str>,

    #[arg(long, short = 'k', required = true, help = "Number of topics K")]
    pub n_topics: usize,

    #[arg(
        long,
        help = "Abnormality threshold",
        long_help = "A cell is abnormal when the fraction of its neighbours\n\
		     assigned to another topic exceeds this value. Default 0.5."
    )]
    pub pas_threshold: Option<f32>,

    #[arg(
        long,
        short,
        required = true,
        help = "Output header",
        long_help = "Output header for results:\n\
		     - {out}.summary.json\n\
		     - {out}.{model}.local.tsv.gz\n\
		     - {out}.{model}.loading.tsv.gz\n\
		     - {out}.{model}.dictionary.tsv.gz\n\
		     - {out}.scope.{coord,edges,features}.tsv.gz\n"
    )]
    pub out: Box<str>,

    #[arg(long, short, help = "Enable verbose logging (sets RUST_LOG=info)")]
    pub verbose: bool,
}

/// Score every model in the manifest on one sample
pub fn run_evaluate(args: &EvaluateArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let params = args
        .scope
        .pipeline_params(args.n_topics, args.pas_threshold)?;

    let manifest = ModelManifest::from_json_file(&args.manifest)?;
    let base_dir = Path::new(args.manifest.as_ref()).parent();
    let models = manifest.precomputed_models(base_dir);
    info!("{} model(s) listed in {}", models.len(), args.manifest);

    let tables = args.scope.read_tables()?;

    let model_refs: Vec<&dyn TopicModel> = models.iter().map(|m| m as &dyn TopicModel).collect();
    let output = run_pipeline(&tables, &params, &model_refs)?;

    write_outputs(&output, &params, &args.out)?;
    Ok(())
}
