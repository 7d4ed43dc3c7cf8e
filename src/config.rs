//! Configuration management for the DICOM bridge
//!
//! This module provides unified configuration management with multi-source
//! loading, a commented default file, and zero-config defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{BridgeConfig, RouterConfig, ToolsConfig, TransferConfig};
use crate::constants::{config, env, logging, router, tools, transfer};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Router endpoint and AE titles
    pub router: RouterConfig,
    /// DCMTK tool settings
    pub tools: ToolsConfigToml,
    /// C-STORE settings
    pub transfer: TransferConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfigToml {
    /// dcmdump binary, looked up on PATH when not absolute
    pub dcmdump: PathBuf,
    /// dcmodify binary, looked up on PATH when not absolute
    pub dcmodify: PathBuf,
    /// Validation deadline in seconds
    pub validation_timeout_secs: u64,
    /// Tag injection deadline in seconds
    pub modify_timeout_secs: u64,
}

impl Default for ToolsConfigToml {
    fn default() -> Self {
        Self {
            dcmdump: PathBuf::from(tools::DCMDUMP),
            dcmodify: PathBuf::from(tools::DCMODIFY),
            validation_timeout_secs: tools::VALIDATION_TIMEOUT.as_secs(),
            modify_timeout_secs: tools::MODIFY_TIMEOUT.as_secs(),
        }
    }
}

/// TOML-friendly transfer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfigToml {
    /// Reply deadline in seconds
    pub reply_timeout_secs: u64,
    /// Working copy directory (None = platform temp dir)
    pub temp_dir: Option<PathBuf>,
    /// Maximum PDU length proposed to the router
    pub max_pdu_length: u32,
}

impl Default for TransferConfigToml {
    fn default() -> Self {
        Self {
            reply_timeout_secs: transfer::REPLY_TIMEOUT.as_secs(),
            temp_dir: None,
            max_pdu_length: transfer::DEFAULT_MAX_PDU_LENGTH,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console log level
    pub level: String,
    /// Keep the rotating audit log
    pub file_logging: bool,
    /// Audit log directory (None = `<user data dir>/dicom-bridge/logs`)
    pub log_dir: Option<PathBuf>,
    /// Audit log level, independent of the console level
    pub file_level: String,
    /// Daily audit files kept before the oldest is deleted
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            file_logging: true,
            log_dir: None,
            file_level: logging::DEFAULT_FILE_LEVEL.to_string(),
            max_log_files: logging::MAX_LOG_FILES,
        }
    }
}

impl LoggingConfig {
    /// Directory the audit log is written to, if one can be determined
    pub fn log_directory(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join(config::APP_DIR_NAME).join(logging::LOG_DIR_NAME))
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (field, level) in [
            ("logging.level", &self.level),
            ("logging.file_level", &self.file_level),
        ] {
            if level.parse::<tracing::Level>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: level.clone(),
                    reason: "Expected one of error, warn, info, debug, trace".to_string(),
                });
            }
        }

        if !self.file_logging {
            return Ok(());
        }

        if self.log_directory().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_dir".to_string(),
                value: String::new(),
                reason: "No user data directory on this system; set log_dir or disable file_logging"
                    .to_string(),
            });
        }

        if self.max_log_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "logging.max_log_files".to_string(),
                value: "0".to_string(),
                reason: "Keep at least one audit log file".to_string(),
            });
        }

        Ok(())
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> BridgeConfig {
        BridgeConfig {
            router: self.router.clone(),
            tools: self.tools.to_runtime_config(),
            transfer: self.transfer.to_runtime_config(),
        }
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// CLI flags are applied on top by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match config_file_override {
            Some(ref path) => Some(path.clone()),
            None => Self::find_config_file(),
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(ConfigError::NotFound { path }.into());
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Apply router overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ip) = lookup(env::ROUTER_IP) {
            debug!("Router IP overridden by {}", env::ROUTER_IP);
            self.router.router_ip = ip;
        }

        if let Some(port) = lookup(env::ROUTER_PORT) {
            self.router.router_port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: env::ROUTER_PORT.to_string(),
                value: port.clone(),
                reason: "Expected a port number".to_string(),
            })?;
        }

        if let Some(ae) = lookup(env::ROUTER_AE) {
            self.router.router_ae = ae;
        }

        if let Some(ae) = lookup(env::MY_AE) {
            self.router.my_ae = ae;
        }

        Ok(())
    }

    /// Check values that would otherwise only fail mid-transfer
    pub fn validate(&self) -> Result<()> {
        self.router.validate()?;
        self.logging.validate()?;

        for (field, secs) in [
            ("tools.validation_timeout_secs", self.tools.validation_timeout_secs),
            ("tools.modify_timeout_secs", self.tools.modify_timeout_secs),
            ("transfer.reply_timeout_secs", self.transfer.reply_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: secs.to_string(),
                    reason: "Timeouts must be at least one second".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Write the commented default config to `path`
    ///
    /// Returns `false` when the file already existed and `force` was not set.
    pub async fn write_default_config(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }

        info!("Creating default configuration file...");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ConfigError::from)?;
            }
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(ConfigError::from)?;

        info!("Wrote configuration file: {}", path.display());
        Ok(true)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::generic(format!("Failed to serialize configuration: {}", e)))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(config::LOCAL_FILE_NAME)];
        if let Ok(user) = Self::get_default_config_path() {
            search_paths.push(user);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        debug!("No config file found in standard locations");
        None
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join(config::APP_DIR_NAME).join(config::FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::from)?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# DICOM Bridge Configuration
# You can customize any of these settings to suit your needs.
# Router settings can also be set with {ip_env}, {port_env},
# {ae_env} and {my_ae_env}.

[router]
router_ip = "{ip}"
router_port = {port}
# Called AE title (max {ae_len} characters)
router_ae = "{router_ae}"
# Calling AE title (max {ae_len} characters)
my_ae = "{my_ae}"

[tools]
# DCMTK binaries (looked up on PATH unless absolute)
dcmdump = "{dcmdump}"
dcmodify = "{dcmodify}"
validation_timeout_secs = {validation_timeout}
modify_timeout_secs = {modify_timeout}

[transfer]
# Seconds to wait for the router's C-STORE reply
reply_timeout_secs = {reply_timeout}
max_pdu_length = {max_pdu}
# temp_dir = "/path/to/scratch"  # Defaults to the system temp directory

[logging]
level = "{level}"  # error, warn, info, debug, trace
# Daily audit log, kept for {max_files} days
file_logging = true
file_level = "{file_level}"
max_log_files = {max_files}
# log_dir = "/path/to/logs"  # Defaults to the user data directory
"#,
            ip_env = env::ROUTER_IP,
            port_env = env::ROUTER_PORT,
            ae_env = env::ROUTER_AE,
            my_ae_env = env::MY_AE,
            ip = router::DEFAULT_IP,
            port = router::DEFAULT_PORT,
            ae_len = router::MAX_AE_TITLE_LENGTH,
            router_ae = router::DEFAULT_ROUTER_AE,
            my_ae = router::DEFAULT_MY_AE,
            dcmdump = tools::DCMDUMP,
            dcmodify = tools::DCMODIFY,
            validation_timeout = tools::VALIDATION_TIMEOUT.as_secs(),
            modify_timeout = tools::MODIFY_TIMEOUT.as_secs(),
            reply_timeout = transfer::REPLY_TIMEOUT.as_secs(),
            max_pdu = transfer::DEFAULT_MAX_PDU_LENGTH,
            level = logging::DEFAULT_LOG_LEVEL,
            file_level = logging::DEFAULT_FILE_LEVEL,
            max_files = logging::MAX_LOG_FILES,
        )
    }
}

impl ToolsConfigToml {
    /// Convert to runtime ToolsConfig
    pub fn to_runtime_config(&self) -> ToolsConfig {
        ToolsConfig {
            dcmdump: self.dcmdump.clone(),
            dcmodify: self.dcmodify.clone(),
            validation_timeout: Duration::from_secs(self.validation_timeout_secs),
            modify_timeout: Duration::from_secs(self.modify_timeout_secs),
        }
    }
}

impl TransferConfigToml {
    /// Convert to runtime TransferConfig
    pub fn to_runtime_config(&self) -> TransferConfig {
        TransferConfig {
            reply_timeout: Duration::from_secs(self.reply_timeout_secs),
            temp_dir: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            max_pdu_length: self.max_pdu_length,
        }
    }
}
