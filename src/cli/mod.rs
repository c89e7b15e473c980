//! CLI module for update-overlay
//!
//! Runs the update engine from the command line and renders its overlays
//! as text or JSON.

mod commands;
mod output;

use clap::{Parser, Subcommand};

pub use output::{print_error, OutputFormat};

/// update-overlay - store listing update checks
#[derive(Parser, Debug)]
#[command(name = "update-overlay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[command(flatten)]
    pub output: OutputOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output formatting options
#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Output in JSON format (for machine parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl OutputOptions {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare the running version with the store and show the overlays
    Check(commands::check::CheckArgs),

    /// Show caller-controlled prompts plus the what's-new check
    Manual(commands::check::ManualArgs),

    /// Fetch a store listing and show what can be extracted from it
    Inspect(commands::inspect::InspectArgs),

    /// Open the store listing for the platform
    Open(commands::inspect::OpenArgs),

    /// Persisted update state
    State {
        #[command(subcommand)]
        command: commands::state::StateCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output.format();
    let quiet = cli.output.quiet;

    match cli.command {
        Commands::Check(args) => commands::check::run_auto(args, format, quiet).await,
        Commands::Manual(args) => commands::check::run_manual(args, format, quiet).await,
        Commands::Inspect(args) => commands::inspect::inspect(args, format).await,
        Commands::Open(args) => commands::inspect::open(args, quiet).await,
        Commands::State { command } => commands::state::run(command, format, quiet).await,
        Commands::Config { command } => commands::config::run(command, format, quiet).await,
    }
}
