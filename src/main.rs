//! Inventory Differ - structural diff and classification of inventory snapshots
//!
//! Compares two JSON inventory snapshots, classifies every change by
//! category, severity and significance, and serves the same engine over HTTP.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Re-export from library
pub use inventory_differ::*;

mod cli;

/// Inventory Differ - snapshot diff and classification engine
#[derive(Parser)]
#[command(name = "inventory-differ")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Rules document (YAML)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Service settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SnapshotArgs {
    /// Previous snapshot (JSON)
    previous: PathBuf,

    /// Current snapshot (JSON)
    current: PathBuf,

    /// Entity the snapshots belong to
    #[arg(long, default_value = "")]
    entity: String,

    /// Identifier of the previous snapshot
    #[arg(long, default_value = "")]
    previous_id: String,

    /// Identifier of the current snapshot
    #[arg(long, default_value = "")]
    current_id: String,

    /// Only keep significant changes
    #[arg(short, long)]
    significant_only: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl SnapshotArgs {
    fn options(&self) -> cli::diff::DiffOptions<'_> {
        cli::diff::DiffOptions {
            previous: &self.previous,
            current: &self.current,
            subject: DiffSubject::new(&self.entity, &self.previous_id, &self.current_id),
            significant_only: self.significant_only,
            json: self.json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two snapshots and classify the changes
    Diff(SnapshotArgs),

    /// Diff two snapshots and report analytics
    Analyze {
        #[command(flatten)]
        snapshots: SnapshotArgs,

        /// Number of most changed paths to show (0 = all)
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Manage classification rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind, overrides the settings file
        #[arg(short, long)]
        listen: Option<String>,

        /// Reload rules when the rules file changes
        #[arg(short, long)]
        watch: bool,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Print the active rule document
    Show,

    /// Validate a rules file without loading it
    Validate {
        /// Rules file to check
        file: PathBuf,
    },

    /// Show limits, categories and severity levels in effect
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = cli::CommandContext::new(cli.settings.as_deref(), cli.rules.clone())?;

    match cli.command {
        Commands::Diff(snapshots) => {
            cli::diff::run(&ctx, snapshots.options()).await?;
        }
        Commands::Analyze { snapshots, top } => {
            cli::diff::analyze(&ctx, snapshots.options(), top).await?;
        }
        Commands::Rules { action } => match action {
            RulesAction::Show => cli::rules::show(&ctx).await?,
            RulesAction::Validate { file } => cli::rules::validate(&file).await?,
            RulesAction::Stats { json } => cli::rules::stats(&ctx, json).await?,
        },
        Commands::Serve { listen, watch } => {
            cli::serve::run(&ctx, listen, watch).await?;
        }
    }

    Ok(())
}
