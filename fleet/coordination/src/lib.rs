#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Fleet coordination: merges perception with peer reports, runs the
//! claim/drop auction over the replicated task table, and composes the
//! outbound report, one tick at a time.

/// Startup configuration.
#[path = "../config.rs"]
pub mod config;

/// Error types.
#[path = "../error.rs"]
pub mod error;

/// Per-agent coordination state.
#[path = "../state.rs"]
pub mod state;

/// Merging perception and peer facts into belief.
#[path = "../synchronizer.rs"]
pub mod synchronizer;

/// Outbound report composition.
#[path = "../reporter.rs"]
pub mod reporter;

/// Task table and the claim/drop auction.
#[path = "../tasks.rs"]
pub mod tasks;

/// Task importance scoring.
#[path = "../scoring.rs"]
pub mod scoring;

/// Telemetry builder for coordination runs.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Agent runtime driving one tick end to end.
#[path = "../main.rs"]
pub mod runtime;

pub use config::{
    AgentConfig, ChannelConfig, ClassWeights, CoordinationConfig, FirePriority, ScoringConfig,
    SectorConfig,
};
pub use error::CoordinationError;
pub use reporter::compose_message;
pub use runtime::{
    AgentRuntime, AgentRuntimeBuilder, Command, PolicyContext, PursuitPolicy, RolePolicy,
    TickOutcome,
};
pub use scoring::{classify, importance, TaskClass};
pub use state::{CoordinationState, FleetRole, KnownFacts};
pub use synchronizer::{decode_heard, merge, MergeOptions, MergeReport};
pub use tasks::{
    allocate, claim_task, drop_task, evaluate_drop, is_victim, refresh_tasks, select_task,
    task_candidates, DropReason, TaskTable,
};
pub use telemetry::{CoordinationTelemetry, CoordinationTelemetryBuilder};
