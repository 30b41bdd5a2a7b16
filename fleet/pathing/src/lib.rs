#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Fleet pathing: search over the location graph and its static partition.
//!
//! Search never falls back on its own. A `None` result is a normal outcome
//! and callers pick their own fallback, usually [`random_walk`].

/// Search results.
#[path = "../path.rs"]
pub mod path;

/// Breadth-first and A* search.
#[path = "../search.rs"]
pub mod search;

/// Rolling memory of transitions that failed.
#[path = "../blocked.rs"]
pub mod blocked;

/// Random-walk fallback.
#[path = "../walk.rs"]
pub mod walk;

/// Static partition of the map among same-role agents.
#[path = "../sectors.rs"]
pub mod sectors;

/// Error types.
#[path = "../error.rs"]
pub mod error;

pub use blocked::BlockedTransitions;
pub use error::{EmptyPath, SectorError};
pub use path::Path;
pub use search::Router;
pub use sectors::{factorize, suggested_division_count, Sector, Sectorization};
pub use walk::random_walk;
