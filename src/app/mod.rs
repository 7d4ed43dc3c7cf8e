//! Core application logic for the DICOM bridge
//!
//! This module contains the transfer pipeline and its components: format
//! validation, metadata sanitizing, working-copy staging, tag injection via
//! DCMTK, and the C-STORE client.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dicom_bridge::app::{Bridge, BridgeConfig, DimseTransport, TracingLog, TransferRequest};
//!
//! # async fn example() {
//! let config = BridgeConfig::default();
//! let router = config.router.clone();
//! let bridge = Bridge::new(config, DimseTransport::default(), Arc::new(TracingLog));
//!
//! let request = TransferRequest::new("/data/study.dcm", router, "A1234", "Chest CT");
//! let outcome = bridge.send_transfer(&request).await;
//! println!("{}: {}", outcome.success, outcome.message);
//! # }
//! ```

pub mod injector;
pub mod log;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sanitize;
pub mod tools;
pub mod transfer;
pub mod validator;
pub mod working_copy;

// Re-export main public API
pub use injector::TagInjector;
pub use log::{LogLevel, MemoryLog, TracingLog, TransferLog};
pub use models::{RouterConfig, StudyTags, TransferOutcome, TransferRequest, ValidationResult};
pub use pipeline::{Bridge, BridgeConfig};
pub use sanitize::sanitize;
pub use tools::{ToolCommand, ToolOutput, ToolsConfig};
pub use transfer::{
    DimseTransport, StatusCode, StoreReply, StoreTransport, TransferClient, TransferConfig,
};
pub use validator::Validator;
pub use working_copy::WorkingCopy;
