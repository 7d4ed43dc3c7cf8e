//! Application constants for DICOM Bridge
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names for router overrides
pub mod env {
    /// Router host or IP address
    pub const ROUTER_IP: &str = "DICOM_BRIDGE_ROUTER_IP";

    /// Router DICOM port
    pub const ROUTER_PORT: &str = "DICOM_BRIDGE_ROUTER_PORT";

    /// Router (called) AE title
    pub const ROUTER_AE: &str = "DICOM_BRIDGE_ROUTER_AE";

    /// Local (calling) AE title
    pub const MY_AE: &str = "DICOM_BRIDGE_MY_AE";
}

/// Router endpoint defaults
pub mod router {
    /// Default router host
    pub const DEFAULT_IP: &str = "127.0.0.1";

    /// Conventional DICOM port
    pub const DEFAULT_PORT: u16 = 11112;

    /// Default called AE title
    pub const DEFAULT_ROUTER_AE: &str = "DCMROUTER";

    /// Default calling AE title
    pub const DEFAULT_MY_AE: &str = "DICOM_BRIDGE";

    /// DICOM AE titles are at most 16 characters
    pub const MAX_AE_TITLE_LENGTH: usize = 16;
}

/// External DCMTK tool settings
pub mod tools {
    use super::Duration;

    /// Format dump tool
    pub const DCMDUMP: &str = "dcmdump";

    /// Metadata editing tool
    pub const DCMODIFY: &str = "dcmodify";

    /// Upper bound for a content validation run
    pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

    /// Upper bound for a tag injection run
    pub const MODIFY_TIMEOUT: Duration = Duration::from_secs(60);

    /// dcmodify flag that suppresses the `.bak` file
    pub const NO_BACKUP_FLAG: &str = "-nb";

    /// dcmodify flag for modify-or-insert
    pub const MODIFY_FLAG: &str = "-m";
}

/// DICOM attributes injected into the working copy
pub mod tags {
    /// Accession Number (0008,0050)
    pub const ACCESSION_NUMBER: &str = "(0008,0050)";

    /// Study Description (0008,1030)
    pub const STUDY_DESCRIPTION: &str = "(0008,1030)";
}

/// File naming and working copies
pub mod files {
    /// Required source file extension (compared case-insensitively)
    pub const DICOM_EXTENSION: &str = "dcm";

    /// Working copy name prefix
    pub const WORKING_COPY_PREFIX: &str = "dicom-bridge-";

    /// Working copy name suffix
    pub const WORKING_COPY_SUFFIX: &str = ".dcm";

    /// Random characters appended after the timestamp
    pub const WORKING_COPY_RANDOM_LEN: usize = 8;
}

/// C-STORE transfer settings
pub mod transfer {
    use super::Duration;

    /// Deadline for association, store request and reply together
    pub const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum PDU length we advertise and fall back to
    pub const DEFAULT_MAX_PDU_LENGTH: u32 = 16_384;

    /// Bytes of PDV item header inside a P-DATA-TF PDU
    pub const PDV_HEADER_LEN: u32 = 6;

    /// C-STORE message ID; one request per association
    pub const MESSAGE_ID: u16 = 1;

    /// Outcome message for status 0x0000
    pub const SUCCESS_MESSAGE: &str = "DICOM successfully stored on Router.";
}

/// Logging constants
pub mod logging {
    /// Default console log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Default audit log level, independent of the console
    pub const DEFAULT_FILE_LEVEL: &str = "debug";

    /// Audit log directory under the app data dir
    pub const LOG_DIR_NAME: &str = "logs";

    /// Audit log files are named `<prefix>.<date>.<suffix>`
    pub const FILE_PREFIX: &str = "dicom-bridge";

    pub const FILE_SUFFIX: &str = "log";

    /// Daily audit files kept before the oldest is deleted
    pub const MAX_LOG_FILES: usize = 14;

    /// Prefix the original logger used for success events
    pub const SUCCESS_PREFIX: &str = "SUCCESS: ";
}

/// Process exit codes
pub mod exit {
    pub const SUCCESS: i32 = 0;

    pub const FAILURE: i32 = 1;

    /// sysexits `EX_TEMPFAIL`: the failure was temporary, try again later
    pub const RETRYABLE: i32 = 75;
}

/// Configuration file locations
pub mod config {
    /// Project-local config file name
    pub const LOCAL_FILE_NAME: &str = "dicom-bridge.toml";

    /// Directory under the user config dir
    pub const APP_DIR_NAME: &str = "dicom-bridge";

    /// File name under the app config dir
    pub const FILE_NAME: &str = "config.toml";
}

// Re-export commonly used constants for convenience
pub use transfer::{REPLY_TIMEOUT, SUCCESS_MESSAGE};
pub use tools::VALIDATION_TIMEOUT;
