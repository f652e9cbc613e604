mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "holo", about = "Holographic microscopy reconstruction tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a hologram to an amplitude, phase or spectrum image
    Reconstruct(commands::reconstruct::ReconstructArgs),
    /// Search a depth range for the sharpest focus
    Autofocus(commands::autofocus::AutofocusArgs),
    /// Export a multi-page TIFF depth stack
    Stack(commands::stack::StackArgs),
    /// Locate the off-axis sideband of a hologram
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Print or save a default reconstruction config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Reconstruct(args) => commands::reconstruct::run(args),
        Commands::Autofocus(args) => commands::autofocus::run(args),
        Commands::Stack(args) => commands::stack::run(args),
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
