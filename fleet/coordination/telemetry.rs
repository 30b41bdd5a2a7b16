use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use fleet_world::EntityId;
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord};
use uuid::Uuid;

/// Builder for coordination telemetry sinks.
pub struct CoordinationTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    agent: Option<EntityId>,
}

impl CoordinationTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            agent: None,
        }
    }

    /// Sets the log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Tags every record with an agent id.
    #[must_use]
    pub const fn agent(mut self, agent: EntityId) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<CoordinationTelemetry> {
        CoordinationTelemetry::new(self.module, self.log_path, self.agent)
    }
}

/// Telemetry handle shared by one agent's coordination components.
///
/// Without a log path every call is a no-op.
#[derive(Clone)]
pub struct CoordinationTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for CoordinationTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinationTelemetry")
            .field("module", &self.inner.module)
            .field("session", &self.inner.session)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    agent: Option<EntityId>,
    session: Uuid,
    logger: Option<JsonLogger>,
}

impl CoordinationTelemetry {
    fn new(module: String, log_path: Option<PathBuf>, agent: Option<EntityId>) -> Result<Self> {
        let logger = if let Some(path) = log_path {
            Some(JsonLogger::new(path)?)
        } else {
            None
        };
        Ok(Self {
            inner: Arc::new(TelemetryInner {
                module,
                agent,
                session: Uuid::new_v4(),
                logger,
            }),
        })
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> CoordinationTelemetryBuilder {
        CoordinationTelemetryBuilder::new(module)
    }

    /// Session id shared by every record of this run.
    #[must_use]
    pub fn session(&self) -> Uuid {
        self.inner.session
    }

    /// Logs structured metadata for a tick.
    pub fn log(&self, level: LogLevel, tick: u32, message: &str, metadata: Value) -> Result<()> {
        let Some(logger) = &self.inner.logger else {
            return Ok(());
        };
        let mut record = LogRecord::new(&self.inner.module, level, message).with_tick(tick);
        if let Some(agent) = self.inner.agent {
            record = record.with_agent(agent.value());
        }
        if let Some(obj) = metadata.as_object() {
            record.metadata = obj.clone();
        }
        record
            .metadata
            .insert("session".into(), Value::String(self.inner.session.to_string()));
        logger.log(&record)
    }
}
