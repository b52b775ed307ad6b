//! Per-run step log.
//!
//! Every saga step emits exactly one entry per event: appended to the run's
//! own ordered sequence and pushed to the live hub in the same call. Entries
//! are never mutated after emission.

use chrono::{DateTime, Utc};
use common::ProcessId;
use serde::{Deserialize, Serialize};

use crate::hub::LogHub;

/// Severity of a step log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One entry in a saga run's ordered step log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub step: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<ProcessId>,
}

/// Collects a run's entries and forwards each to the hub as it is emitted.
pub struct StepRecorder {
    process_id: ProcessId,
    entries: Vec<StepLogEntry>,
    hub: LogHub,
}

impl StepRecorder {
    /// Creates a recorder for one saga run.
    pub fn new(process_id: ProcessId, hub: LogHub) -> Self {
        Self {
            process_id,
            entries: Vec::new(),
            hub,
        }
    }

    /// Emits an info entry.
    pub async fn info(&mut self, step: &str, message: impl Into<String>) {
        self.emit(LogLevel::Info, step, message.into()).await;
    }

    /// Emits a success entry.
    pub async fn success(&mut self, step: &str, message: impl Into<String>) {
        self.emit(LogLevel::Success, step, message.into()).await;
    }

    /// Emits a warning entry.
    pub async fn warning(&mut self, step: &str, message: impl Into<String>) {
        self.emit(LogLevel::Warning, step, message.into()).await;
    }

    /// Emits an error entry.
    pub async fn error(&mut self, step: &str, message: impl Into<String>) {
        self.emit(LogLevel::Error, step, message.into()).await;
    }

    async fn emit(&mut self, level: LogLevel, step: &str, message: String) {
        match level {
            LogLevel::Error => tracing::error!(step, process_id = %self.process_id, "{message}"),
            LogLevel::Warning => tracing::warn!(step, process_id = %self.process_id, "{message}"),
            _ => tracing::info!(step, process_id = %self.process_id, "{message}"),
        }

        let entry = StepLogEntry {
            timestamp: Utc::now(),
            level,
            step: step.to_string(),
            message,
            process_id: Some(self.process_id.clone()),
        };
        self.entries.push(entry.clone());
        self.hub.publish(entry).await;
    }

    /// The entries emitted so far, in order.
    pub fn entries(&self) -> &[StepLogEntry] {
        &self.entries
    }

    /// Consumes the recorder, returning the run's ordered log.
    pub fn into_entries(self) -> Vec<StepLogEntry> {
        self.entries
    }
}
