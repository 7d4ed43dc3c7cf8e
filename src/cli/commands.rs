//! Command handlers for the DICOM bridge CLI
//!
//! Each handler prints its result to stdout as JSON, using the field names
//! the desktop UI consumes, and returns a [`CommandStatus`] that becomes the
//! process exit code.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::app::{Bridge, DimseTransport, TracingLog, TransferOutcome, TransferRequest};
use crate::cli::args::{ConfigAction, ConfigArgs, SendArgs, ValidateArgs};
use crate::config::AppConfig;
use crate::constants::exit;
use crate::errors::{AppError, Result};

/// How a command ended, as seen by the calling shell or UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Failed; running it again unchanged will fail again
    Failed,
    /// Failed on a timeout or network error; a later retry may succeed
    Retryable,
}

impl CommandStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            CommandStatus::Success => exit::SUCCESS,
            CommandStatus::Failed => exit::FAILURE,
            CommandStatus::Retryable => exit::RETRYABLE,
        }
    }

    /// Status for an error that stopped a command before it produced a result
    pub fn from_error(error: &AppError) -> Self {
        if error.is_recoverable() {
            CommandStatus::Retryable
        } else {
            CommandStatus::Failed
        }
    }

    fn from_outcome(outcome: &TransferOutcome) -> Self {
        match (outcome.success, outcome.retryable) {
            (true, _) => CommandStatus::Success,
            (false, true) => CommandStatus::Retryable,
            (false, false) => CommandStatus::Failed,
        }
    }
}

/// Build the production pipeline from `config`
pub fn build_bridge(config: &AppConfig) -> Bridge<DimseTransport> {
    let runtime = config.to_runtime_config();
    let transport = DimseTransport::new(runtime.transfer.max_pdu_length)
        .with_io_timeout(runtime.transfer.reply_timeout);
    Bridge::new(runtime, transport, Arc::new(TracingLog))
}

/// Handle the validate command
pub async fn handle_validate(args: ValidateArgs, config: &AppConfig) -> Result<CommandStatus> {
    let bridge = build_bridge(config);

    let Some(file) = bridge.select_file(args.file) else {
        println!("No file selected.");
        return Ok(CommandStatus::Success);
    };

    let result = bridge.validate_file(&file).await;
    print_json(&result)?;
    Ok(if result.is_valid {
        CommandStatus::Success
    } else {
        CommandStatus::Failed
    })
}

/// Handle the send command
pub async fn handle_send(args: SendArgs, config: &AppConfig) -> Result<CommandStatus> {
    let bridge = build_bridge(config);

    let Some(file) = bridge.select_file(args.file) else {
        println!("No file selected.");
        return Ok(CommandStatus::Success);
    };

    let mut router = config.router.clone();
    args.router.apply(&mut router);

    let request = TransferRequest::new(file, router, args.accession, args.description);
    let outcome = bridge.send_transfer(&request).await;

    print_json(&outcome)?;
    Ok(CommandStatus::from_outcome(&outcome))
}

/// Handle config management commands
pub async fn handle_config(
    args: ConfigArgs,
    config: &AppConfig,
    config_path: Option<PathBuf>,
) -> Result<CommandStatus> {
    match args.action {
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => AppConfig::get_default_config_path()?,
            };

            if AppConfig::write_default_config(&path, force).await? {
                info!("Created configuration file at {}", path.display());
                println!("Created default configuration file:");
                println!("   {}", path.display());
            } else {
                println!(
                    "Configuration file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Ok(CommandStatus::Success)
        }
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
            Ok(CommandStatus::Success)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::generic(format!("Failed to render result: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
