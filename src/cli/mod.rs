//! Command-line interface components
//!
//! This module contains CLI-specific code for the DICOM bridge application:
//! argument parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{
    Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs, RouterArgs, SendArgs, ValidateArgs,
};
pub use commands::{build_bridge, handle_config, handle_send, handle_validate, CommandStatus};
