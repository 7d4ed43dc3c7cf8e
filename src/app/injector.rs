//! Accession number and study description injection via `dcmodify`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app::log::TransferLog;
use crate::app::models::StudyTags;
use crate::app::tools::ToolCommand;
use crate::constants::{tags, tools};
use crate::errors::ToolResult;

/// Rewrites the two study tags of a working copy in place
pub struct TagInjector {
    dcmodify: PathBuf,
    timeout: Duration,
    log: Arc<dyn TransferLog>,
}

impl TagInjector {
    pub fn new(dcmodify: impl Into<PathBuf>, timeout: Duration, log: Arc<dyn TransferLog>) -> Self {
        Self {
            dcmodify: dcmodify.into(),
            timeout,
            log,
        }
    }

    /// Build the `dcmodify` invocation for `copy`
    ///
    /// `-nb` keeps dcmodify from leaving a `.bak` file next to the copy.
    pub fn command(&self, copy: &Path, study: &StudyTags) -> ToolCommand {
        ToolCommand::new(&self.dcmodify)
            .arg(tools::NO_BACKUP_FLAG)
            .arg(tools::MODIFY_FLAG)
            .arg(format!("{}={}", tags::ACCESSION_NUMBER, study.accession_number))
            .arg(tools::MODIFY_FLAG)
            .arg(format!("{}={}", tags::STUDY_DESCRIPTION, study.study_description))
            .arg(copy)
            .timeout(self.timeout)
    }

    /// Stamp `study` into the file at `copy`
    ///
    /// `study` must already be sanitized. Only the working copy is touched.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Failed` carrying dcmodify's stderr when it exits
    /// non-zero, and the spawn/timeout variants when it cannot run.
    pub async fn inject(&self, copy: &Path, study: &StudyTags) -> ToolResult<()> {
        let command = self.command(copy, study);
        self.log
            .info(&format!("Executing dcmtk command: {}", command.display()));

        command.run().await?;

        self.log.info("dcmodify successfully injected tags.");
        Ok(())
    }
}
