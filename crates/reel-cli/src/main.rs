//! Reel CLI
//!
//! Command-line interface for the movie catalog.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use reel_core::{Config, MemoryStore, MovieProvider};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Reel - movie catalog")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a movie
    Add {
        /// Movie title (must be unique)
        #[arg(short, long)]
        title: String,
        /// Genre
        #[arg(short, long)]
        genre: String,
        /// Release year
        #[arg(short, long, allow_negative_numbers = true)]
        year: i64,
    },
    /// Update a movie
    #[command(alias = "edit")]
    Update {
        /// Movie ID
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New genre
        #[arg(short, long)]
        genre: Option<String>,
        /// New release year
        #[arg(short, long, allow_negative_numbers = true)]
        year: Option<i64>,
    },
    /// Delete a movie
    #[command(alias = "rm")]
    Delete {
        /// Movie ID
        id: String,
    },
    /// List all movies
    #[command(alias = "ls")]
    List,
    /// Count movies with a given title
    Count {
        /// Exact title to match
        title: String,
    },
    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_cli_override(cli.config.as_ref())?;
    init_logging(&config);

    if let Commands::Config = cli.command {
        return commands::config::show(&config, cli.config.as_ref(), &output);
    }

    let store_path = config.store_path();
    let store = MemoryStore::load(&store_path)
        .with_context(|| format!("Failed to load store from {:?}", store_path))?;
    debug!("Loaded store from {:?}", store_path);
    let provider = MovieProvider::from_config(Arc::new(store.clone()), &config);

    let writes = matches!(
        cli.command,
        Commands::Add { .. } | Commands::Update { .. } | Commands::Delete { .. }
    );

    match cli.command {
        Commands::Add { title, genre, year } => {
            commands::movie::add(&provider, title, genre, year, &output).await?;
        }
        Commands::Update {
            id,
            title,
            genre,
            year,
        } => {
            commands::movie::update(&provider, id, title, genre, year, &output).await?;
        }
        Commands::Delete { id } => {
            commands::movie::delete(&provider, id, &output).await?;
        }
        Commands::List => {
            commands::movie::list(&provider, &output).await?;
        }
        Commands::Count { title } => {
            commands::movie::count(&provider, title, &output).await?;
        }
        Commands::Config => unreachable!(), // Handled above
    }

    if writes {
        store
            .save(&store_path)
            .with_context(|| format!("Failed to save store to {:?}", store_path))?;
        debug!("Saved store to {:?}", store_path);
    }

    Ok(())
}

/// Initialize stderr logging
///
/// RUST_LOG wins when set; otherwise the configured log level applies to
/// the reel crates.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "reel_core={},reel_cli={}",
            config.log_level, config.log_level
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
