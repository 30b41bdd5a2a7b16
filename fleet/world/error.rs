use thiserror::Error;

use crate::geometry::EntityId;

/// Errors raised while assembling the location graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// Two locations share an identifier.
    #[error("location {0} declared twice")]
    DuplicateLocation(EntityId),
    /// A lookup referenced a location that does not exist.
    #[error("unknown location {0}")]
    UnknownLocation(EntityId),
    /// A location lists a neighbour that is not part of the graph.
    #[error("location {location} lists missing neighbour {neighbour}")]
    DanglingNeighbour {
        /// Location holding the bad reference.
        location: EntityId,
        /// Referenced identifier.
        neighbour: EntityId,
    },
}
