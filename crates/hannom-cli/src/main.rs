//! CLI application for ordering and cropping Han-Nom text boxes.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, crop, drawing, order};

/// Han-Nom page digitizer - order, edit and crop text boxes
#[derive(Parser)]
#[command(name = "hannom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print boxes in reading order
    Order(order::OrderArgs),

    /// Cut the patch under every box out of a page image
    Crop(crop::CropArgs),

    /// Build an editor drawing from detected boxes
    Drawing(drawing::DrawingArgs),

    /// Crop patches for many pages
    Batch(batch::BatchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Order(args) => order::run(args, cli.config.as_deref()).await,
        Commands::Crop(args) => crop::run(args, cli.config.as_deref()).await,
        Commands::Drawing(args) => drawing::run(args, cli.config.as_deref()).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}
