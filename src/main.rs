//! DICOM Bridge CLI application
//!
//! Command-line interface for validating DICOM files and forwarding them to a
//! DICOM router.

use std::process;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use dicom_bridge::cli::{
    handle_config, handle_send, handle_validate, Cli, Commands, CommandStatus, ConfigAction,
    ConfigArgs,
};
use dicom_bridge::config::{AppConfig, LoggingConfig};
use dicom_bridge::errors::Result;
use dicom_bridge::logging::{audit_writer, crate_directive, crate_filter};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(CommandStatus::Success) => {}
        Ok(status) => process::exit(status.exit_code()),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(CommandStatus::from_error(&e).exit_code());
        }
    }
}

/// Main application logic
async fn run() -> Result<CommandStatus> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // `config init` must work even when the target file is missing or broken
    let config = match &cli.command {
        Commands::Config(ConfigArgs {
            action: ConfigAction::Init { .. },
        }) => AppConfig::default(),
        _ => AppConfig::load(cli.global.config.clone()).await?,
    };

    let _audit_guard = init_logging(&cli, &config.logging)?;

    info!("DICOM Bridge v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Validate(args) => {
            info!("Executing validate command");
            handle_validate(args, &config).await
        }
        Commands::Send(args) => {
            info!("Executing send command");
            handle_send(args, &config).await
        }
        Commands::Config(args) => handle_config(args, &config, cli.global.config).await,
    }
}

/// Initialize console and audit logging
///
/// The console level comes from CLI flags, falling back to the configured
/// level. The audit log keeps its own level. Returns the guard that flushes
/// the audit log on drop.
fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| logging.level.clone());

    let console_filter = EnvFilter::from_default_env().add_directive(crate_directive(&level)?);

    // Logs go to stderr so stdout stays machine readable
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_filter(console_filter);

    let (audit, guard, audit_error) = match audit_writer(logging) {
        Ok(Some((writer, guard))) => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(crate_filter(&logging.file_level)?);
            (Some(layer), Some(guard), None)
        }
        Ok(None) => (None, None, None),
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(audit)
        .init();

    if let Some(e) = audit_error {
        warn!("Audit log disabled: {}", e);
    }

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }

    Ok(guard)
}
