//! medrag CLI entry point.

use anyhow::Result;
use clap::Parser;
use medrag::cli::{commands, Cli, Commands};
use medrag::config::Settings;
use medrag::openai;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // The API key may come from a .env file
    openai::load_env_file(None);

    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(std::path::PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("medrag={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match &cli.command {
        Commands::Serve { host, port, error_mode } => {
            commands::run_serve(host.clone(), *port, *error_mode, settings).await?;
        }

        Commands::Ask { query, k } => {
            commands::run_ask(query, *k, settings).await?;
        }

        Commands::Search { query, k } => {
            commands::run_search(query, *k, settings).await?;
        }

        Commands::Index { source } => {
            commands::run_index(*source, settings).await?;
        }

        Commands::Check { sample } => {
            commands::run_check(*sample, &settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
