//! C-STORE transfer to the remote router
//!
//! The module is organized into specialized components:
//! - `command`: C-STORE command set encoding and status extraction
//! - `status`: status code categories and rendering
//! - `dimse`: the production transport over the DICOM upper layer
//!
//! [`TransferClient`] owns the reply deadline. It races the transport's
//! association/store/reply exchange against a timer; whichever finishes
//! first decides the outcome and the other is dropped.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app::log::TransferLog;
use crate::app::models::{RouterConfig, TransferOutcome};
use crate::app::report;
use crate::constants::transfer;
use crate::errors::{AppError, TransferError, TransferResult};

pub mod command;
pub mod dimse;
pub mod status;

pub use command::extract_status;
pub use dimse::DimseTransport;
pub use status::StatusCode;

#[cfg(test)]
mod tests;

/// Runtime settings for the store exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Deadline covering association, store and reply
    pub reply_timeout: Duration,
    /// Directory working copies are staged in
    pub temp_dir: PathBuf,
    pub max_pdu_length: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            reply_timeout: transfer::REPLY_TIMEOUT,
            temp_dir: std::env::temp_dir(),
            max_pdu_length: transfer::DEFAULT_MAX_PDU_LENGTH,
        }
    }
}

/// Raw reply of one store exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReply {
    /// Command set bytes of the C-STORE-RSP
    pub command: Vec<u8>,
    /// Whether the association was released cleanly after the reply
    pub released: bool,
}

/// Sends one file as one store request and returns the peer's reply
///
/// Implementations open and close their own association per call. Dropping
/// the returned future must tear the association down promptly, without
/// waiting on the peer, on any tokio runtime flavor.
pub trait StoreTransport: Send + Sync {
    fn store(
        &self,
        file: &Path,
        router: &RouterConfig,
    ) -> impl Future<Output = TransferResult<StoreReply>> + Send;
}

/// Drives one store exchange under a deadline
pub struct TransferClient<T> {
    transport: T,
    reply_timeout: Duration,
    log: Arc<dyn TransferLog>,
}

impl<T: StoreTransport> TransferClient<T> {
    pub fn new(transport: T, reply_timeout: Duration, log: Arc<dyn TransferLog>) -> Self {
        Self {
            transport,
            reply_timeout,
            log,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `file` and report the outcome
    pub async fn send(&self, file: &Path, router: &RouterConfig) -> TransferOutcome {
        match self.exchange(file, router).await {
            Ok(status) => report::status_outcome(status, self.log.as_ref()),
            Err(e) => report::error_outcome(&AppError::from(e), self.log.as_ref()),
        }
    }

    /// Send `file` and return the status the router answered with
    ///
    /// # Errors
    ///
    /// - `Timeout` when no reply arrived within the deadline
    /// - `Network` for connection and association failures
    /// - `MalformedReply` when the reply carries no readable status
    pub async fn exchange(&self, file: &Path, router: &RouterConfig) -> TransferResult<StatusCode> {
        self.log
            .info(&format!("Starting C-STORE request for file: {}", file.display()));
        self.log.debug(&format!("Target: {}", router));

        let reply = tokio::select! {
            reply = self.transport.store(file, router) => reply,
            _ = tokio::time::sleep(self.reply_timeout) => {
                // The transport future is dropped with this branch, closing its socket
                self.log.debug("DICOM association closed.");
                return Err(TransferError::Timeout {
                    timeout: self.reply_timeout,
                });
            }
        }?;

        if reply.released {
            self.log.debug("DICOM association closed.");
        } else {
            self.log
                .debug("DICOM association closed without orderly release.");
        }

        extract_status(&reply.command)
    }
}
