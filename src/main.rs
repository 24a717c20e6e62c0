//! gfo - caching download proxy for web fonts
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use gfo::cli::{commands, Cli, Commands};
use gfo::config::{ConfigManager, LogConfig};
use gfo::error::{GfoError, GfoResult};
use gfo::{logging, AppContext};
use std::process::ExitCode;
use tracing::{debug, error, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_client_error() {
                warn!("{}", e);
            } else {
                error!("{}", e);
            }

            eprintln!("{} {}", style("Error:").red().bold(), e.public_message());
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 3 for not found, 2 for other caller mistakes, 1 for everything else
fn exit_code(e: &GfoError) -> u8 {
    match e.status_code() {
        404 => 3,
        400..=499 => 2,
        _ => 1,
    }
}

async fn run() -> GfoResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Config commands manage the file themselves and must work without one
    if let Commands::Config(args) = cli.command {
        logging::init(&LogConfig::default(), cli.verbose)?;
        return commands::config(args, &config_manager).await;
    }

    let config = match config_manager.load().await {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init(&LogConfig::default(), cli.verbose);
            return Err(e);
        }
    };
    logging::init(&config.log, cli.verbose)?;
    debug!("Using configuration from {}", config_manager.path().display());

    // Prestart wipes the cache, so it runs before the cache is opened
    if let Commands::Prestart = cli.command {
        return commands::prestart(&config).await;
    }

    let ctx = AppContext::init(config).await?;

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Prestart => unreachable!("Prestart handled above"),
        Commands::Css(args) => commands::css(args, &ctx).await,
        Commands::Css2(args) => commands::css2(args, &ctx).await,
        Commands::Font(args) => commands::font(args, &ctx).await,
        Commands::Cache(args) => commands::cache(args, &ctx).await,
        Commands::Worker(args) => commands::worker(args, &ctx).await,
    }
}
