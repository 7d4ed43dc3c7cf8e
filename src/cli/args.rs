//! Command-line argument parsing for the DICOM bridge
//!
//! This module defines the CLI structure using clap derive macros: file
//! validation, sending a file to the router, and config file management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::RouterConfig;

/// DICOM Bridge - validate, tag and forward DICOM files to a router
#[derive(Parser, Debug)]
#[command(
    name = "dicom_bridge",
    version,
    about = "Validate, tag and forward local DICOM files to a DICOM router",
    long_about = "Checks that a file is a readable DICOM file, stamps the accession number and
study description into a private working copy with DCMTK's dcmodify, and sends
that copy to a DICOM router with a C-STORE request. The working copy is always
removed afterwards."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - only errors are logged
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that a file is a valid DICOM file
    Validate(ValidateArgs),

    /// Tag a working copy of a file and send it to the router
    Send(SendArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the validate command
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// DICOM file to check
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Arguments for the send command
#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// DICOM file to send
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Accession number stamped into (0008,0050)
    #[arg(short, long, default_value = "")]
    pub accession: String,

    /// Study description stamped into (0008,1030)
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Router overrides
    #[command(flatten)]
    pub router: RouterArgs,
}

/// Per-invocation router overrides
#[derive(Args, Debug, Clone, Default)]
pub struct RouterArgs {
    /// Router host name or IP address
    #[arg(long, value_name = "HOST")]
    pub router_ip: Option<String>,

    /// Router DICOM port
    #[arg(long, value_name = "PORT")]
    pub router_port: Option<u16>,

    /// Called AE title
    #[arg(long, value_name = "AE")]
    pub router_ae: Option<String>,

    /// Calling AE title
    #[arg(long, value_name = "AE")]
    pub my_ae: Option<String>,
}

/// Arguments for config management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    ///
    /// `None` means the configured level applies.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl RouterArgs {
    /// Overlay the flags that were given onto `router`
    pub fn apply(&self, router: &mut RouterConfig) {
        if let Some(ip) = &self.router_ip {
            router.router_ip = ip.clone();
        }
        if let Some(port) = self.router_port {
            router.router_port = port;
        }
        if let Some(ae) = &self.router_ae {
            router.router_ae = ae.clone();
        }
        if let Some(ae) = &self.my_ae {
            router.my_ae = ae.clone();
        }
    }
}
