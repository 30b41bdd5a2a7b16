use fleet_world::EntityId;
use thiserror::Error;

/// Errors raised while partitioning the map or handing out sectors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SectorError {
    /// The graph has no locations.
    #[error("cannot sectorize an empty graph")]
    EmptyGraph,
    /// Zero sectors were requested.
    #[error("sector count must be positive")]
    ZeroDivisions,
    /// An agent rank is outside `1..=agents`.
    #[error("rank {rank} out of range for {agents} agents")]
    RankOutOfRange {
        /// Offending rank.
        rank: usize,
        /// Number of agents sharing the map.
        agents: usize,
    },
    /// The agent is not among the peers being ranked.
    #[error("agent {0} is not part of the roster")]
    UnknownAgent(EntityId),
}

/// A path must hold at least its start.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("a path needs at least one location")]
pub struct EmptyPath;
