//! Simulador CLI - command-line client for the investment simulator API

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use simulador_http::ClientError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "simulador")]
#[command(about = "Client for the investment simulator API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the session file, configuration and logs
    #[arg(short = 'd', long, global = true, env = "SIMULADOR_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data_dir>/config.json when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("simulador")
    });
    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;

    debug!(data_dir = %data_dir.display(), "Starting simulador CLI");

    let command = cli.command.execute(data_dir, cli.config);

    // Execute command with optional timeout
    let outcome = if cli.timeout == 0 {
        command.await
    } else {
        match tokio::time::timeout(Duration::from_secs(cli.timeout), command).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = outcome {
        match e.downcast_ref::<ClientError>() {
            Some(client_err) => error!(
                status = ?client_err.status(),
                session_lost = client_err.is_session_lost(),
                "Command failed: {e:#}"
            ),
            None => error!("Command failed: {e:#}"),
        }
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
