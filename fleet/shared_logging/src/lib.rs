#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON logging for field agents.
//!
//! Every record is one JSON object per line. Records emitted from inside an
//! agent loop carry the agent identifier and the simulation tick so that the
//! logs of a whole fleet can be merged and sorted afterwards.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Module emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Short dotted event name, e.g. `tick.completed`.
    pub message: String,
    /// Agent that produced the record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<u32>,
    /// Simulation tick the record belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u32>,
    /// Arbitrary JSON payload for counters and identifiers.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record with no agent or tick attached.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            agent: None,
            tick: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attaches the emitting agent.
    #[must_use]
    pub fn with_agent(mut self, agent: u32) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Attaches the simulation tick.
    #[must_use]
    pub fn with_tick(mut self, tick: u32) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Replaces the metadata map with the fields of a JSON object.
    ///
    /// Non-object values are ignored.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &serde_json::Value) -> Self {
        if let Some(obj) = metadata.as_object() {
            self.metadata = obj.clone();
        }
        self
    }
}

/// Thread-safe JSON logger with append-only semantics.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the desired path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Writes a log record as a JSON line.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Reads every record written so far, skipping lines that do not parse.
    pub fn records(&self) -> Result<Vec<LogRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("reading log file {}", self.path.display()))?;
        let mut out = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str::<LogRecord>(&line) {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Returns the underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("agent.log")).unwrap();
        logger
            .log(&LogRecord::new("coordination", LogLevel::Info, "tick.completed"))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"tick.completed\""));
        assert!(!content.contains("\"agent\""));
    }

    #[test]
    fn agent_and_tick_survive_a_read_back() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("nested/agent.log")).unwrap();
        let record = LogRecord::new("coordination", LogLevel::Debug, "task.claimed")
            .with_agent(42)
            .with_tick(7)
            .with_metadata(&serde_json::json!({ "task": 900 }));
        logger.log(&record).unwrap();

        let records = logger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent, Some(42));
        assert_eq!(records[0].tick, Some(7));
        assert_eq!(records[0].metadata["task"], 900);
    }
}
