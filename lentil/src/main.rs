mod cli_common;
mod run_evaluate;
mod run_preprocess;
mod run_simulate;

use clap::{Parser, Subcommand};
use log::info;
use run_evaluate::*;
use run_preprocess::*;
use run_simulate::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Latent-topic EvaluatioN of TIssue Layouts\n\
		  Scores topic models of spatial omics data by how spatially\n\
		  coherent their cell loadings are: Moran's I, domain\n\
		  compactness (CHAOS) and boundary abnormality (PAS).",
    term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Build the spatial scope for external topic models",
        long_about = "Normalize coordinates, weight edges, optionally restrict\n\
		      to a rectangular region, and write the scope's coordinates,\n\
		      weighted edges and row-normalized features."
    )]
    Preprocess(PreprocessArgs),

    #[command(
        about = "Compute spatial coherence metrics of topic models",
        long_about = "Read precomputed loadings listed in a manifest, align them\n\
		      to the scope and compute Moran's I, CHAOS and PAS per model."
    )]
    Evaluate(EvaluateArgs),

    /// simulate a lattice sample with stripe domains
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Preprocess(args) => {
            run_preprocess(args)?;
        }
        Commands::Evaluate(args) => {
            run_evaluate(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    info!("Done");
    Ok(())
}
