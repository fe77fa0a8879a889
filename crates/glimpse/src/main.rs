//! Glimpse CLI - image captioning web service.
//!
//! Glimpse captions uploaded images with a CNN backbone and a greedy word
//! decoder, and keeps a small table of user accounts.
//!
//! # Usage
//!
//! ```bash
//! # Run the HTTP API
//! glimpse serve --port 5000
//!
//! # Caption a local file
//! glimpse caption dog.jpg
//!
//! # Check model artifacts
//! glimpse models list
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Glimpse - image captioning web service.
#[derive(Parser, Debug)]
#[command(name = "glimpse")]
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
    /// Run the captioning and account HTTP API
    Serve(cli::serve::ServeArgs),

    /// Caption a single local image and print the result
    Caption(cli::caption::CaptionArgs),

    /// Inspect model artifacts
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match glimpse_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `glimpse config path`."
            );
            glimpse_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Glimpse v{}", glimpse_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Caption(args) => cli::caption::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config).await,
    }
}
