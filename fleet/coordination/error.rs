use fleet_pathing::SectorError;
use fleet_world::WorldError;
use thiserror::Error;

/// Errors raised while preparing an agent for a run.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Sector computation or assignment failed.
    #[error(transparent)]
    Sector(#[from] SectorError),
    /// The location graph is inconsistent.
    #[error(transparent)]
    World(#[from] WorldError),
}
