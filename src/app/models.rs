//! Data structures shared across the transfer pipeline
//!
//! The outward facing types serialize with the field names the desktop UI
//! expects (`isValid`, `success`, `message`).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{router, transfer};
use crate::errors::{ConfigError, ConfigResult};

/// Remote endpoint plus the two association identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Router host name or IP address
    pub router_ip: String,
    /// Router DICOM port
    pub router_port: u16,
    /// Called AE title
    pub router_ae: String,
    /// Calling AE title
    pub my_ae: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            router_ip: router::DEFAULT_IP.to_string(),
            router_port: router::DEFAULT_PORT,
            router_ae: router::DEFAULT_ROUTER_AE.to_string(),
            my_ae: router::DEFAULT_MY_AE.to_string(),
        }
    }
}

impl RouterConfig {
    /// `host:port` socket address
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.router_ip, self.router_port)
    }

    /// `AE@host:port` form understood by the DICOM upper layer client
    pub fn ae_address(&self) -> String {
        format!("{}@{}", self.router_ae, self.socket_address())
    }

    /// Reject values that can never form a usable association
    pub fn validate(&self) -> ConfigResult<()> {
        if self.router_ip.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "router_ip".to_string(),
                value: self.router_ip.clone(),
                reason: "Router address must not be empty".to_string(),
            });
        }

        if self.router_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "router_port".to_string(),
                value: "0".to_string(),
                reason: "Router port must be between 1 and 65535".to_string(),
            });
        }

        for (field, value) in [("router_ae", &self.router_ae), ("my_ae", &self.my_ae)] {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.len() > router::MAX_AE_TITLE_LENGTH {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: format!(
                        "AE titles must be 1 to {} characters",
                        router::MAX_AE_TITLE_LENGTH
                    ),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{} | Source: {}",
            self.router_ae, self.router_ip, self.router_port, self.my_ae
        )
    }
}

/// One user-initiated transfer
///
/// Built once per transfer and only ever borrowed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub source_path: PathBuf,
    pub router: RouterConfig,
    pub accession_number: String,
    pub study_description: String,
}

impl TransferRequest {
    pub fn new(
        source_path: impl Into<PathBuf>,
        router: RouterConfig,
        accession_number: impl Into<String>,
        study_description: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            router,
            accession_number: accession_number.into(),
            study_description: study_description.into(),
        }
    }
}

/// Outcome of checking a candidate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// The only result a transfer ever reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub success: bool,
    pub message: String,
    /// Failure that sending again later may fix; omitted from JSON when false
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl TransferOutcome {
    /// Router stored the file
    pub fn stored() -> Self {
        Self {
            success: true,
            message: transfer::SUCCESS_MESSAGE.to_string(),
            retryable: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Clinical fields stamped into the working copy, already sanitized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyTags {
    pub accession_number: String,
    pub study_description: String,
}
