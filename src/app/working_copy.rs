//! Disposable working copies of source files
//!
//! Tag injection edits files in place, so it always runs against a private
//! copy. Each copy lives alone in its own directory created with owner-only
//! permissions, and the copy file itself is owner read/write only. A
//! [`WorkingCopy`] deletes both when it is released; if it is dropped without
//! being released (panic, cancelled future) they are still removed, just
//! without a log line.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::{TempDir, TempPath};
use tokio::io::AsyncWriteExt;

use crate::app::log::TransferLog;
use crate::constants::files;
use crate::errors::{StagingError, StagingResult};

/// A uniquely named copy of a source file, owned by one transfer
#[derive(Debug)]
pub struct WorkingCopy {
    // Declared before `dir` so the file is removed before its directory
    path: TempPath,
    dir: TempDir,
}

impl WorkingCopy {
    /// Copy `source` into a fresh private directory under `parent`
    ///
    /// The file name combines a millisecond timestamp with random characters
    /// so concurrent transfers started in the same millisecond cannot collide.
    ///
    /// # Errors
    ///
    /// - `SourceUnreadable` if `source` cannot be opened
    /// - `TempDirUnwritable` if the directory or copy cannot be created or written
    pub async fn stage_in(source: &Path, parent: &Path) -> StagingResult<Self> {
        let mut reader = tokio::fs::File::open(source)
            .await
            .map_err(|source_err| StagingError::SourceUnreadable {
                path: source.to_path_buf(),
                source: source_err,
            })?;

        let unwritable = |source: std::io::Error| StagingError::TempDirUnwritable {
            dir: parent.to_path_buf(),
            source,
        };

        let dir = tempfile::Builder::new()
            .prefix(files::WORKING_COPY_PREFIX)
            .tempdir_in(parent)
            .map_err(unwritable)?;

        let prefix = format!(
            "{}{}-",
            files::WORKING_COPY_PREFIX,
            Utc::now().timestamp_millis()
        );
        let (file, path) = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(files::WORKING_COPY_SUFFIX)
            .rand_bytes(files::WORKING_COPY_RANDOM_LEN)
            .tempfile_in(dir.path())
            .map_err(unwritable)?
            .into_parts();

        // Writing through the handle tempfile opened keeps its owner-only mode
        let mut writer = tokio::fs::File::from_std(file);
        tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(unwritable)?;
        writer.flush().await.map_err(unwritable)?;

        Ok(Self { path, dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the copy and its directory
    ///
    /// Consumes the copy, so it can be released at most once. A failed
    /// deletion is logged as a warning and otherwise ignored.
    pub fn release(self, log: &dyn TransferLog) {
        let Self { path, dir } = self;
        let file: PathBuf = path.to_path_buf();
        match path.close() {
            Ok(()) => log.info(&format!("Cleaned up temporary file: {}", file.display())),
            Err(e) => log.warn(&format!(
                "Failed to clean up temporary file: {}: {}",
                file.display(),
                e
            )),
        }

        let dir_path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            log.warn(&format!(
                "Failed to remove working directory: {}: {}",
                dir_path.display(),
                e
            ));
        }
    }
}
