//! Dimscan CLI - find images by pixel dimension across a directory tree.
//!
//! Dimscan walks a directory, reads every image's width and height from its
//! header, and reports which images have a side at (or under) a target
//! dimension. Results are written as CSV reports.
//!
//! # Usage
//!
//! ```bash
//! # Scan the current directory for images with a side <= 330px
//! dimscan scan
//!
//! # Exact match on 512px with 8 workers
//! dimscan scan ./photos --dimension 512 --mode exact --workers 8
//!
//! # Run the HTTP front-end
//! dimscan serve --port 5001
//!
//! # View configuration
//! dimscan config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Dimscan - find images by pixel dimension across a directory tree.
#[derive(Parser, Debug)]
#[command(name = "dimscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a directory and write CSV reports
    Scan(cli::scan::ScanArgs),

    /// Serve the scan job API over HTTP
    Serve(cli::serve::ServeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match dimscan_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `dimscan config path`."
            );
            dimscan_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Dimscan v{}", dimscan_core::VERSION);

    match cli.command {
        Commands::Scan(args) => cli::scan::execute(args, config).await,
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
