use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rise_object::Settings;

mod cli;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload an object described by a TOML spec file
    Apply {
        /// Path to the object spec
        spec: PathBuf,
        /// Previously applied spec; only changed attributes are updated
        #[arg(long)]
        previous: Option<PathBuf>,
    },
    /// Show the current state of an object
    Show {
        /// Object id: <bucket>/<key> or s3://<bucket>/<key>
        id: String,
        /// Request stored checksums of this algorithm
        #[arg(long)]
        checksum_algorithm: Option<String>,
    },
    /// List versions and delete markers in a bucket
    #[command(visible_alias = "ls")]
    Versions {
        bucket: String,
        /// Only list keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Delete the object described by a spec file
    Delete {
        /// Path to the object spec
        spec: PathBuf,
    },
    /// Delete every version and delete marker of a key, or of a whole bucket
    Purge {
        bucket: String,
        /// Only purge this exact key
        #[arg(long)]
        key: Option<String>,
        /// Bypass governance retention and clear legal holds
        #[arg(long)]
        force: bool,
        /// Report success even if some versions could not be deleted
        #[arg(long)]
        ignore_errors: bool,
    },
    /// Print the spec of an existing object
    Import {
        /// Object id: <bucket>/<key> or s3://<bucket>/<key>
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load settings")?;
    let context = cli::Context::from_settings(&settings).await;

    match &cli.command {
        Commands::Apply { spec, previous } => {
            cli::object::apply(&context, spec, previous.as_deref()).await
        }
        Commands::Show {
            id,
            checksum_algorithm,
        } => cli::object::show(&context, id, checksum_algorithm.as_deref()).await,
        Commands::Versions { bucket, prefix } => {
            cli::versions::list(&context, bucket, prefix.as_deref()).await
        }
        Commands::Delete { spec } => cli::object::delete(&context, spec).await,
        Commands::Purge {
            bucket,
            key,
            force,
            ignore_errors,
        } => cli::versions::purge(&context, bucket, key.as_deref(), *force, *ignore_errors).await,
        Commands::Import { id } => cli::object::import(&context, id).await,
    }
}
