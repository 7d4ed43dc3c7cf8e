//! DICOM file validation
//!
//! A file passes when it carries a `.dcm` extension (any case) and `dcmdump`
//! can parse it within the validation deadline. The extension check runs
//! first and never touches the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app::log::TransferLog;
use crate::app::models::ValidationResult;
use crate::app::tools::ToolCommand;
use crate::constants::files;
use crate::errors::{ToolError, ValidationError};

/// Message reported for a file that passed both checks
pub const VALID_MESSAGE: &str = "File is a valid DICOM file with .dcm extension.";

/// Format validator backed by `dcmdump`
pub struct Validator {
    dcmdump: PathBuf,
    timeout: Duration,
    log: Arc<dyn TransferLog>,
}

impl Validator {
    pub fn new(dcmdump: impl Into<PathBuf>, timeout: Duration, log: Arc<dyn TransferLog>) -> Self {
        Self {
            dcmdump: dcmdump.into(),
            timeout,
            log,
        }
    }

    /// Validate `path`, folding every failure into the result value
    pub async fn validate(&self, path: &Path) -> ValidationResult {
        match self.check(path).await {
            Ok(()) => ValidationResult::valid(VALID_MESSAGE),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }

    /// Validate `path`, keeping the failure kind
    ///
    /// # Errors
    ///
    /// - `WrongExtension` without running any tool
    /// - `InvalidContent` when `dcmdump` exits non-zero
    /// - `ToolUnavailable` when `dcmdump` cannot be started
    /// - `Timeout` when `dcmdump` exceeds the deadline
    pub async fn check(&self, path: &Path) -> Result<(), ValidationError> {
        if !has_dicom_extension(path) {
            return Err(ValidationError::WrongExtension {
                path: path.to_path_buf(),
            });
        }

        let command = ToolCommand::new(&self.dcmdump)
            .arg(path)
            .timeout(self.timeout);

        self.log.info(&format!(
            "Running DICOM content validation: {}",
            command.display()
        ));

        match command.run().await {
            Ok(_) => {
                self.log.info(&format!(
                    "{} successfully processed {}",
                    command.tool_name(),
                    path.display()
                ));
                Ok(())
            }
            Err(e) => {
                self.log.warn(&format!(
                    "{} failed for {}: {}",
                    command.tool_name(),
                    path.display(),
                    e
                ));
                Err(self.classify(path, e))
            }
        }
    }

    fn classify(&self, path: &Path, error: ToolError) -> ValidationError {
        match error {
            ToolError::Failed { stderr, .. } => {
                self.log.debug(&format!("dcmdump stderr: {}", stderr));
                ValidationError::InvalidContent {
                    path: path.to_path_buf(),
                    detail: stderr,
                }
            }
            ToolError::Timeout { timeout, .. } => ValidationError::Timeout { timeout },
            ToolError::Spawn { tool, source } | ToolError::Io { tool, source } => {
                ValidationError::ToolUnavailable { tool, source }
            }
        }
    }
}

/// Case-insensitive `.dcm` extension check
pub fn has_dicom_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(files::DICOM_EXTENSION))
        .unwrap_or(false)
}
