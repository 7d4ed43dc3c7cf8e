//! Error types for DICOM Bridge
//!
//! Each pipeline stage owns an error enum describing the ways it can fail.
//! [`AppError`] wraps all of them so the transfer pipeline can catch any
//! stage failure and hand it to the result reporter as one type.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// File validation errors
///
/// Every variant ends up as `isValid = false`, but the kinds stay
/// distinguishable so a missing tool is not mistaken for a corrupt file.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Extension is not `.dcm`
    #[error("File does not have a .dcm extension.")]
    WrongExtension { path: PathBuf },

    /// Dump tool ran and rejected the content
    #[error("File content is not a valid DICOM format.")]
    InvalidContent { path: PathBuf, detail: String },

    /// Dump tool could not be started at all
    #[error("DICOM validation tool '{tool}' could not be started: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Dump tool did not finish in time
    #[error(
        "File content is not a valid DICOM format (validation timed out after {}).",
        describe_timeout(.timeout)
    )]
    Timeout { timeout: Duration },
}

/// Working-copy staging errors
#[derive(Error, Debug)]
pub enum StagingError {
    /// Source file could not be read
    #[error("Failed to read source file {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temporary directory rejected the copy
    #[error("Failed to create working copy in {dir}: {source}")]
    TempDirUnwritable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// External tool invocation errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// Process could not be spawned
    #[error("Failed to start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the process or reading its output failed
    #[error("I/O error while running '{tool}': {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited unsuccessfully
    #[error("'{tool}' exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Process exceeded its deadline and was killed
    #[error("'{tool}' timed out after {}", describe_timeout(.timeout))]
    Timeout { tool: String, timeout: Duration },
}

/// Association and store request errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// Connection, association or socket failure
    #[error("{0}")]
    Network(String),

    /// No reply within the deadline
    #[error("C-STORE request timed out after {}", describe_timeout(.timeout))]
    Timeout { timeout: Duration },

    /// Reply arrived but no status could be read from it
    #[error("Malformed C-STORE reply: {reason}")]
    MalformedReply { reason: String },

    /// Peer accepted the association but not our presentation context
    #[error("Router did not accept a presentation context for {context}")]
    Rejected { context: String },

    /// Working copy could not be prepared as a store request
    #[error("Cannot prepare DICOM data set: {reason}")]
    Dataset { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Config file could not be read or written
    #[error("Configuration file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether trying the same transfer again could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transfer(TransferError::Timeout { .. })
                | AppError::Transfer(TransferError::Network(_))
                | AppError::Tool(ToolError::Timeout { .. })
                | AppError::Validation(ValidationError::Timeout { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Staging(_) => "staging",
            AppError::Tool(_) => "tooling",
            AppError::Transfer(TransferError::Timeout { .. }) => "timeout",
            AppError::Transfer(TransferError::MalformedReply { .. }) => "malformed-reply",
            AppError::Transfer(_) => "network",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Render a deadline for messages: whole seconds, or milliseconds below one second
pub fn describe_timeout(timeout: &Duration) -> String {
    match timeout.as_secs() {
        0 => format!("{} milliseconds", timeout.as_millis()),
        1 => "1 second".to_string(),
        secs => format!("{} seconds", secs),
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Staging result type alias
pub type StagingResult<T> = std::result::Result<T, StagingError>;

/// Tool result type alias
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
