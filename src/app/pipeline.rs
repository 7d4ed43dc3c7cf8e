//! The transfer pipeline behind the two UI operations
//!
//! [`Bridge`] runs validate, sanitize, stage, inject, send and release
//! strictly in that order for one request. Every failure is folded into a
//! [`TransferOutcome`] before it leaves `send_transfer`, and the working copy
//! is released on every path that created one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::injector::TagInjector;
use crate::app::log::TransferLog;
use crate::app::models::{
    RouterConfig, StudyTags, TransferOutcome, TransferRequest, ValidationResult,
};
use crate::app::report;
use crate::app::sanitize::sanitize;
use crate::app::tools::ToolsConfig;
use crate::app::transfer::{StoreTransport, TransferClient, TransferConfig};
use crate::app::validator::Validator;
use crate::app::working_copy::WorkingCopy;
use crate::errors::AppError;

/// Everything a [`Bridge`] needs besides its transport and log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Router used when a caller does not bring its own
    pub router: RouterConfig,
    pub tools: ToolsConfig,
    pub transfer: TransferConfig,
}

/// Entry point for validating and sending files
pub struct Bridge<T> {
    config: BridgeConfig,
    validator: Validator,
    injector: TagInjector,
    client: TransferClient<T>,
    log: Arc<dyn TransferLog>,
}

impl<T: StoreTransport> Bridge<T> {
    pub fn new(config: BridgeConfig, transport: T, log: Arc<dyn TransferLog>) -> Self {
        let validator = Validator::new(
            config.tools.dcmdump.clone(),
            config.tools.validation_timeout,
            log.clone(),
        );
        let injector = TagInjector::new(
            config.tools.dcmodify.clone(),
            config.tools.modify_timeout,
            log.clone(),
        );
        let client = TransferClient::new(transport, config.transfer.reply_timeout, log.clone());

        Self {
            config,
            validator,
            injector,
            client,
            log,
        }
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    /// Treat a cancelled or empty picker result as "nothing to do"
    pub fn select_file(&self, picked: Option<PathBuf>) -> Option<PathBuf> {
        match picked {
            Some(path) if !path.as_os_str().is_empty() => {
                self.log.info(&format!("File selected: {}", path.display()));
                Some(path)
            }
            _ => {
                self.log.debug("No file selected.");
                None
            }
        }
    }

    pub async fn validate_file(&self, path: &Path) -> ValidationResult {
        self.validator.validate(path).await
    }

    /// Run the full pipeline for `request`
    ///
    /// Never fails: every error ends up in the returned outcome's message.
    pub async fn send_transfer(&self, request: &TransferRequest) -> TransferOutcome {
        self.log.info(&format!(
            "Transfer requested for {} to {}",
            request.source_path.display(),
            request.router
        ));

        if let Err(e) = request.router.validate() {
            return report::error_outcome(&AppError::from(e), self.log.as_ref());
        }

        if let Err(e) = self.validator.check(&request.source_path).await {
            return report::error_outcome(&AppError::from(e), self.log.as_ref());
        }

        let study = StudyTags {
            accession_number: sanitize(Some(&request.accession_number)),
            study_description: sanitize(Some(&request.study_description)),
        };
        self.log.debug(&format!(
            "Sanitized tags: accession '{}', description '{}'",
            study.accession_number, study.study_description
        ));

        let temp_dir = &self.config.transfer.temp_dir;
        let copy = match WorkingCopy::stage_in(&request.source_path, temp_dir).await {
            Ok(copy) => copy,
            Err(e) => return report::error_outcome(&AppError::from(e), self.log.as_ref()),
        };
        self.log
            .info(&format!("Created working copy: {}", copy.path().display()));

        let outcome = self.inject_and_send(&copy, &study, &request.router).await;

        copy.release(self.log.as_ref());
        outcome
    }

    async fn inject_and_send(
        &self,
        copy: &WorkingCopy,
        study: &StudyTags,
        router: &RouterConfig,
    ) -> TransferOutcome {
        if let Err(e) = self.injector.inject(copy.path(), study).await {
            return report::error_outcome(&AppError::from(e), self.log.as_ref());
        }

        self.client.send(copy.path(), router).await
    }
}
