//! Logging capability handed to the transfer pipeline
//!
//! The pipeline never reaches for a global logger. It receives an
//! implementation of [`TransferLog`] at construction; [`TracingLog`] is the
//! production one and forwards every event to `tracing`.

use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::constants::logging::SUCCESS_PREFIX;

/// Severity of a pipeline event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Success,
}

/// Sink for leveled pipeline events
///
/// Implementations must not fail the caller; delivery is best effort.
pub trait TransferLog: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn success(&self, message: &str) {
        self.log(LogLevel::Success, message);
    }
}

/// Forwards pipeline events to the active `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl TransferLog for TracingLog {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
            LogLevel::Success => info!("{}{}", SUCCESS_PREFIX, message),
        }
    }
}

/// Keeps every event in memory; handy for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryLog {
    events: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events in arrival order
    pub fn events(&self) -> Vec<(LogLevel, String)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether any event at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.events()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl TransferLog for MemoryLog {
    fn log(&self, level: LogLevel, message: &str) {
        // A poisoned lock still holds usable data
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push((level, message.to_string()));
    }
}
