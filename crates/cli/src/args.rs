//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// costcat-sync: keep AWS cost categories in sync with organization account tags
#[derive(Parser, Debug)]
#[command(name = "costcat-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile cost categories with the organization once
    Run(RunArgs),

    /// Show the digests and cost categories the organization would produce
    Plan(PlanArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Build cost categories without publishing or storing digests
    #[arg(long)]
    pub dry_run: bool,

    /// Provisioning lifecycle event (JSON) to acknowledge before running
    #[arg(long)]
    pub event: Option<PathBuf>,

    /// Log stream name reported back with lifecycle acknowledgments
    #[arg(long, env = "AWS_LAMBDA_LOG_STREAM_NAME", default_value = "costcat-sync")]
    pub log_stream_name: String,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Read the organization from a JSON snapshot instead of AWS
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
