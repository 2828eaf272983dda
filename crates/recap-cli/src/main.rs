//! `recap` turns receipt photos and recognized receipt text into expense
//! records kept in a local JSON ledger.

mod commands;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::{batch, config, extract, scan};

/// Receipt capture - Extract vendor, date, total and card digits from receipts
#[derive(Parser)]
#[command(name = "recap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract receipt fields from recognized text
    Extract(extract::ExtractArgs),

    /// Extract fields from many receipts
    Batch(batch::BatchArgs),

    /// Capture a receipt image, review its fields and save it
    Scan(scan::ScanArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

impl Commands {
    async fn run(self, config_path: Option<&str>) -> anyhow::Result<()> {
        match self {
            Commands::Extract(args) => extract::run(args, config_path).await,
            Commands::Batch(args) => batch::run(args, config_path).await,
            Commands::Scan(args) => scan::run(args, config_path).await,
            Commands::Config(args) => config::run(args, config_path),
        }
    }
}

fn verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Log to stderr so stdout stays clean for extracted output.
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(verbosity(verbose).into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    cli.command.run(cli.config.as_deref()).await
}
