//! External DCMTK tool invocation
//!
//! Tools are always started from an argument vector, never through a shell,
//! so argument values cannot be reinterpreted as shell syntax. A deadline can
//! be attached; when it fires the process is killed.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::constants::tools;
use crate::errors::{ToolError, ToolResult};

/// Where the DCMTK binaries live and how long they may run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    pub dcmdump: PathBuf,
    pub dcmodify: PathBuf,
    pub validation_timeout: Duration,
    pub modify_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            dcmdump: PathBuf::from(tools::DCMDUMP),
            dcmodify: PathBuf::from(tools::DCMODIFY),
            validation_timeout: tools::VALIDATION_TIMEOUT,
            modify_timeout: tools::MODIFY_TIMEOUT,
        }
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Standard output, empty when it was discarded
    pub stdout: String,
    pub stderr: String,
}

/// A single external tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    capture_stdout: bool,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            timeout: None,
            capture_stdout: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Kill the process if it runs longer than `limit`
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Keep standard output instead of discarding it
    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    /// Short tool name for messages (`/opt/dcmtk/bin/dcmdump` -> `dcmdump`)
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }

    /// Rendering of the invocation for log lines
    pub fn display(&self) -> String {
        let mut rendered = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            rendered.push(' ');
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                rendered.push('"');
                rendered.push_str(&arg);
                rendered.push('"');
            } else {
                rendered.push_str(&arg);
            }
        }
        rendered
    }

    /// Run to completion
    ///
    /// # Errors
    ///
    /// - `ToolError::Spawn` if the program cannot be started
    /// - `ToolError::Timeout` if the deadline elapsed (the process is killed)
    /// - `ToolError::Failed` if it exited non-zero, carrying its stderr
    pub async fn run(&self) -> ToolResult<ToolOutput> {
        let tool = self.tool_name();

        let stdout = if self.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        // Dropping this future on timeout drops the child, which kills it
        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output,
                Err(_) => {
                    return Err(ToolError::Timeout {
                        tool,
                        timeout: limit,
                    });
                }
            },
            None => wait.await,
        }
        .map_err(|source| ToolError::Io {
            tool: tool.clone(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                status: output.status,
                stderr,
            });
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}
