mod build;
mod feeds;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "supfeed-cli")]
#[command(about = "Supplier catalog to marketplace feed builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch supplier catalogs and rebuild their feeds.
    Build {
        /// Build only the supplier with this slug (disabled suppliers included).
        #[arg(long)]
        supplier: Option<String>,
        /// Build and validate, but write nothing.
        #[arg(long)]
        dry_run: bool,
        /// Write a feed even when the catalog yielded no offers.
        #[arg(long)]
        allow_empty: bool,
        /// Print per-supplier results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check an existing feed file.
    Validate {
        file: PathBuf,
    },
    /// Combine several feeds into one, first offer per id wins.
    Merge {
        #[arg(long)]
        output: PathBuf,
        /// Supplier name written into the merged feed's metadata.
        #[arg(long, default_value = "Combined")]
        name: String,
        #[arg(long, default_value_t = 1)]
        build_hour: u8,
        #[arg(required = true)]
        feeds: Vec<PathBuf>,
    },
    /// Print the retail price computed for a raw dealer price.
    Price {
        raw: String,
        /// Use this supplier's pricing table instead of the shared one.
        #[arg(long)]
        supplier: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = supfeed_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            supplier,
            dry_run,
            allow_empty,
            json,
        } => {
            let options = build::BuildOptions {
                supplier,
                dry_run,
                allow_empty,
                json,
            };
            build::run_build(&config, &options).await?;
        }
        Commands::Validate { file } => feeds::run_validate(&config, &file)?,
        Commands::Merge {
            output,
            name,
            build_hour,
            feeds: inputs,
        } => feeds::run_merge(&config, &inputs, &output, &name, build_hour)?,
        Commands::Price { raw, supplier } => {
            feeds::run_price(&config, &raw, supplier.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_support;
