//! livesync CLI - live reload for CSS and JS assets.
//!
//! Provides commands for:
//! - `serve`: Seed the companion snippet, then watch and broadcast changes
//! - `seed`: Only copy the companion snippet into the site

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{SeedArgs, ServeArgs};
use output::Output;

/// livesync - push CSS/JS changes to connected browsers.
#[derive(Parser)]
#[command(name = "livesync", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the site and broadcast asset changes over WebSocket.
    Serve(ServeArgs),
    /// Copy the companion snippet into the site and exit.
    Seed(SeedArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Serve(args) => args.verbose,
        Commands::Seed(args) => args.verbose,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve(args) => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(args.execute())
        }
        Commands::Seed(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
