#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Fleet world module: the map graph and what an agent believes about it.

/// Identifiers and planar geometry.
#[path = "../geometry.rs"]
pub mod geometry;

/// Locations and the undirected location graph.
#[path = "../graph.rs"]
pub mod graph;

/// Humans, blockades, and building fire state.
#[path = "../entity.rs"]
pub mod entity;

/// Belief store and per-tick perception input.
#[path = "../belief.rs"]
pub mod belief;

/// Error types.
#[path = "../error.rs"]
pub mod error;

pub use belief::{BeliefStore, HeardMessage, Perception};
pub use entity::{Blockade, Building, Entity, Fieryness, Human, HumanRole};
pub use error::WorldError;
pub use geometry::{EntityId, Point};
pub use graph::{Adjacency, Location, LocationGraph, LocationKind};
