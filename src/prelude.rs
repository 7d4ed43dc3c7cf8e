//! Prelude module for the DICOM Bridge library
//!
//! Re-exports the items needed to embed the transfer pipeline with a single
//! `use dicom_bridge::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dicom_bridge::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let bridge = Bridge::new(
//!         config.to_runtime_config(),
//!         DimseTransport::default(),
//!         Arc::new(TracingLog),
//!     );
//!
//!     let request = TransferRequest::new("/data/study.dcm", config.router, "A1234", "Chest CT");
//!     let outcome = bridge.send_transfer(&request).await;
//!     println!("{}", outcome.message);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline and its collaborators
pub use crate::app::{
    Bridge, BridgeConfig, DimseTransport, LogLevel, MemoryLog, StoreReply, StoreTransport,
    TracingLog, TransferLog,
};

// Data types
pub use crate::app::{RouterConfig, TransferOutcome, TransferRequest, ValidationResult};

// Configuration
pub use crate::config::AppConfig;
