//! DICOM Bridge Library
//!
//! Validates local DICOM files, stamps the accession number and study
//! description into a private working copy, and sends that copy to a remote
//! DICOM router with a C-STORE request under a reply deadline.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
