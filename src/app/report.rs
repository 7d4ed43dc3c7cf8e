//! Folding stage results into a [`TransferOutcome`]
//!
//! Every failure the pipeline can hit passes through here, so the caller only
//! ever sees `{ success, message }`.

use crate::app::log::TransferLog;
use crate::app::models::TransferOutcome;
use crate::app::transfer::StatusCode;
use crate::errors::{AppError, ToolError};

/// Outcome for a status the router replied with
pub fn status_outcome(status: StatusCode, log: &dyn TransferLog) -> TransferOutcome {
    if status.is_success() {
        log.success(&format!("DICOM C-STORE successful! Status Code: {}", status));
        TransferOutcome::stored()
    } else {
        let message = format!("C-STORE Failed: {} - {}", status, status.description());
        log.error(&message);
        TransferOutcome::failure(message)
    }
}

/// Outcome for a failed stage
pub fn error_outcome(error: &AppError, log: &dyn TransferLog) -> TransferOutcome {
    let message = failure_message(error);
    log.error(&format!("[{}] {}", error.category(), message));
    TransferOutcome::failure(message).retryable(error.is_recoverable())
}

/// User facing text for a failed stage
///
/// dcmodify failures show the tool's own stderr; everything else is a
/// processing or network error.
pub fn failure_message(error: &AppError) -> String {
    match error {
        AppError::Tool(ToolError::Failed { stderr, .. }) if !stderr.is_empty() => {
            format!("DCMTK Error: {}", stderr)
        }
        AppError::Tool(e) => format!("DCMTK Error: {}", e),
        AppError::Validation(e) => e.to_string(),
        e => format!("DICOM Processing/Network Error: {}", e),
    }
}
