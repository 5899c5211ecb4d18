//! Keystone admin CLI - staff access to the admin API

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use keystone_admin_client::ClientError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "keystone-admin")]
#[command(about = "Staff access to the Keystone admin API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Data directory for credentials and logs
    #[arg(short = 'd', long, global = true, env = "KEYSTONE_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to keystone-admin.toml in the usual places)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
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

    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;

    debug!(data_dir = %data_dir.display(), "Starting keystone-admin");

    let run = cli.command.execute(data_dir, cli.config);
    let outcome = if cli.timeout == 0 {
        run.await
    } else {
        match tokio::time::timeout(Duration::from_secs(cli.timeout), run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = outcome {
        error!("Command failed: {e:#}");
        if e
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_auth_expired)
        {
            eprintln!("Not signed in. Run `keystone-admin login` first.");
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
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
