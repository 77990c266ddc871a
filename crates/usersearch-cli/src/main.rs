//! usersearch - incremental user directory search with a local cache.
//!
//! The binary is the hosting environment for `usersearch-core`: it loads
//! configuration, opens the session (which loads the deny-list), runs one
//! command, and suspends the session on the way out.

mod cli;
mod commands;
mod interactive;
#[cfg(test)]
mod test_support;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use usersearch_core::{Config, SearchSession};

use cli::{Cli, Command};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the filter; without it the default is `warn`, or
/// `debug` with `--verbose`. The returned guard must be held until exit so
/// buffered file logs are flushed.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = Config::load_file()?;
    let mut config = file_config.clone();
    config.apply_process_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    // Needs no session, so it works even when the store cannot be opened.
    if let Command::Config { save } = cli.command {
        let save_to = if save { Some(Config::config_path()?) } else { None };
        return commands::config(&config, &file_config, save_to.as_deref());
    }

    let session = SearchSession::open(&config)
        .await
        .context("Failed to open search session")?;
    info!(
        deny_list = session.deny_list().len(),
        source = ?session.deny_list().source(),
        "Session opened"
    );

    let result = match cli.command {
        Command::Search { text, page, all, avatars } => {
            commands::search(&session, &text, page, all, avatars).await
        }
        Command::Saved { text, page } => commands::saved(&session, &text, page).await,
        Command::Avatar { url, output } => commands::avatar(&session, &url, output.as_deref()).await,
        Command::Stats => commands::stats(&session, &config).await,
        Command::Deny { action } => commands::deny(&session, &action),
        Command::Config { .. } => Ok(()),
        // Suspends on every exit path, including I/O failures.
        Command::Interactive => return interactive::run(&session).await,
    };

    // The process is about to go away: persist the deny-list even if the
    // command failed.
    if let Err(e) = session.suspend() {
        error!(error = %e, "Failed to save deny-list");
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;
    info!("usersearch starting");

    let result = run(cli).await;
    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }
    result
}
