//! otmesh: builds the gene to MeSH crosswalk from Open Targets snapshots

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use otmesh::pipeline::{self, Stage};
use otmesh::Config;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "otmesh")]
#[command(author, version, about = "Crosswalk of Open Targets gene-disease associations to MeSH")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the complete pipeline up to the Entrez-keyed final table
    Run {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Write the outputs here instead of the configured output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Build the disease to MeSH crosswalk only
    Crosswalk {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Write the outputs here instead of the configured output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otmesh=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (config_path, output_dir, stage) = match cli.command {
        Commands::Run { config, output_dir } => (config, output_dir, Stage::Full),
        Commands::Crosswalk { config, output_dir } => (config, output_dir, Stage::Crosswalk),
    };

    let mut config = match Config::from_file(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };
    if let Some(output_dir) = output_dir {
        config.set_output_dir(output_dir);
    }

    match pipeline::run(&config, stage) {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
