//! anifeed CLI
//!
//! Local and scheduler entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anifeed::{
    error::Result,
    models::Config,
    pipeline::{self, RunOptions},
    services::MediaMirror,
    storage,
};
use clap::{Parser, Subcommand};

/// anifeed - tracker listing to Atom feed
#[derive(Parser, Debug)]
#[command(
    name = "anifeed",
    version,
    about = "Crawls the tracker listing, mirrors artwork and publishes an Atom feed"
)]
struct Cli {
    /// Path to the configuration file (config.toml is used when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl, build the feed and publish it
    Run {
        /// Also write the feed to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the upload to object storage
        #[arg(long)]
        no_upload: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Check the configured credentials
    Login,

    /// Mirror a single asset and print its public URL
    Mirror {
        /// Source asset URL
        url: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// An explicit `--config` must exist and parse. The default path may be
/// absent, in which case built-in defaults and the environment apply.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("anifeed starting...");
    let config = load_config(cli.config.as_deref())?;
    let source = cli
        .config
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    log::info!("Loaded configuration from {}", source.display());

    match cli.command {
        Command::Run { output, no_upload } => {
            let options = RunOptions {
                output,
                upload: !no_upload,
            };
            let report = pipeline::run_pipeline(&config, &options).await?;
            log::info!("Published {} items.", report.outcome.feed.len());
        }

        Command::Validate => {
            log::info!("Configuration is valid.");
            log::debug!("{:#?}", config);
        }

        Command::Login => {
            pipeline::login(&config).await?;
            log::info!("Credentials accepted for {}.", config.credentials.username);
        }

        Command::Mirror { url } => {
            let session = pipeline::login(&config).await?;
            let store = storage::open(&config.storage).await?;
            let mirror = MediaMirror::new(Arc::new(session), store, &config.storage);

            let asset = mirror.mirror(&url).await?;
            println!("{}", asset.public_url);
        }
    }

    Ok(())
}
