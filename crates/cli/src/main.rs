//! costcat-sync CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;

use args::{Cli, Commands, LogFormat};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config init` must work without a readable configuration
    let app_config = match cli.command {
        Commands::Config(_) => None,
        _ => Some(AppConfig::load(cli.config.as_deref())?),
    };

    // Initialize logging: flags win over the config file
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| app_config.as_ref().map(|c| c.general.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_format = match (cli.log_format, &app_config) {
        (Some(format), _) => format,
        (None, Some(config)) => config.log_format()?,
        (None, None) => LogFormat::Text,
    };
    init_logging(&log_level, log_format)?;

    // Execute command
    match (cli.command, app_config) {
        (Commands::Run(args), Some(config)) => commands::run::execute(args, config).await,
        (Commands::Plan(args), Some(config)) => commands::plan::execute(args, config).await,
        (Commands::Config(args), _) => commands::config::execute(args).await,
        (_, None) => anyhow::bail!("Configuration was not loaded"),
    }
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
