use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::WorldError,
    geometry::{EntityId, Point},
};

/// Kind of map location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// Enterable structure that can burn.
    Building,
    /// Traversable road segment that can host blockades.
    Road,
    /// Building where victims are delivered and tanks refilled.
    Refuge,
}

impl LocationKind {
    /// Buildings and refuges are both structures.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::Building | Self::Refuge)
    }
}

/// Node of the location graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Identifier.
    pub id: EntityId,
    /// Building, road or refuge.
    pub kind: LocationKind,
    /// Geometric centre.
    pub center: Point,
    /// Directly connected locations.
    pub neighbours: Vec<EntityId>,
    /// Outline, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Vec<Point>>,
}

impl Location {
    /// Creates a location without footprint.
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        kind: LocationKind,
        center: Point,
        neighbours: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            center,
            neighbours: neighbours.into_iter().map(EntityId).collect(),
            footprint: None,
        }
    }

    /// Attaches an outline.
    #[must_use]
    pub fn with_footprint(mut self, footprint: Vec<Point>) -> Self {
        self.footprint = Some(footprint);
        self
    }
}

/// Read-only neighbourhood view used by search.
pub trait Adjacency {
    /// Whether `id` is part of this view.
    fn contains(&self, id: EntityId) -> bool;
    /// Neighbours of `id` inside this view; empty when absent.
    fn neighbours(&self, id: EntityId) -> &[EntityId];
}

/// Undirected adjacency over all map locations.
///
/// Edges are symmetric: if a declares b, b is linked back to a even when its
/// own declaration omitted it. Neighbour lists are sorted and deduplicated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationGraph {
    locations: IndexMap<EntityId, Location>,
}

impl LocationGraph {
    /// Validates and builds a graph from location declarations.
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Result<Self, WorldError> {
        let mut map: IndexMap<EntityId, Location> = IndexMap::new();
        for location in locations {
            if map.contains_key(&location.id) {
                return Err(WorldError::DuplicateLocation(location.id));
            }
            map.insert(location.id, location);
        }
        let mut edges = Vec::new();
        for location in map.values() {
            for neighbour in &location.neighbours {
                if !map.contains_key(neighbour) {
                    return Err(WorldError::DanglingNeighbour {
                        location: location.id,
                        neighbour: *neighbour,
                    });
                }
                if *neighbour != location.id {
                    edges.push((location.id, *neighbour));
                }
            }
        }
        let mut sets: IndexMap<EntityId, BTreeSet<EntityId>> =
            map.keys().map(|id| (*id, BTreeSet::new())).collect();
        for (a, b) in edges {
            if let Some(set) = sets.get_mut(&a) {
                set.insert(b);
            }
            if let Some(set) = sets.get_mut(&b) {
                set.insert(a);
            }
        }
        for (id, location) in &mut map {
            location.neighbours = sets
                .get(id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
        }
        map.sort_keys();
        tracing::debug!(locations = map.len(), "location graph built");
        Ok(Self { locations: map })
    }

    /// Builds a `cols` x `rows` lattice of roads, 4-connected, `spacing` apart.
    ///
    /// Identifiers run row-major from 1.
    pub fn lattice(cols: u32, rows: u32, spacing: i32) -> Result<Self, WorldError> {
        let mut locations = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                let id = row * cols + col + 1;
                let mut neighbours = Vec::new();
                if col + 1 < cols {
                    neighbours.push(id + 1);
                }
                if row + 1 < rows {
                    neighbours.push(id + cols);
                }
                let (x, y) = (
                    i32::try_from(col).unwrap_or(i32::MAX).saturating_mul(spacing),
                    i32::try_from(row).unwrap_or(i32::MAX).saturating_mul(spacing),
                );
                locations.push(Location::new(
                    id,
                    LocationKind::Road,
                    Point::new(x, y),
                    neighbours,
                ));
            }
        }
        Self::new(locations)
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the graph has no locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Looks up a location.
    #[must_use]
    pub fn location(&self, id: EntityId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Looks up a location, failing when absent.
    pub fn require(&self, id: EntityId) -> Result<&Location, WorldError> {
        self.location(id).ok_or(WorldError::UnknownLocation(id))
    }

    /// All locations in ascending id order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// All identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.locations.keys().copied()
    }

    /// Centre of a location.
    #[must_use]
    pub fn center(&self, id: EntityId) -> Option<Point> {
        self.location(id).map(|location| location.center)
    }

    /// Straight-line distance between two location centres.
    #[must_use]
    pub fn distance(&self, a: EntityId, b: EntityId) -> Option<f64> {
        Some(self.center(a)?.distance(self.center(b)?))
    }

    /// Kind of a location.
    #[must_use]
    pub fn kind(&self, id: EntityId) -> Option<LocationKind> {
        self.location(id).map(|location| location.kind)
    }

    /// Locations of the given kind.
    pub fn of_kind(&self, kind: LocationKind) -> impl Iterator<Item = &Location> {
        self.locations.values().filter(move |l| l.kind == kind)
    }

    /// Roads directly adjacent to a structure.
    #[must_use]
    pub fn entrances(&self, structure: EntityId) -> Vec<EntityId> {
        self.neighbours(structure)
            .iter()
            .copied()
            .filter(|id| self.kind(*id) == Some(LocationKind::Road))
            .collect()
    }

    /// Whether `road` is the entrance of some structure.
    #[must_use]
    pub fn is_entrance(&self, road: EntityId) -> bool {
        self.kind(road) == Some(LocationKind::Road)
            && self
                .neighbours(road)
                .iter()
                .any(|id| self.kind(*id).is_some_and(LocationKind::is_structure))
    }
}

impl Adjacency for LocationGraph {
    fn contains(&self, id: EntityId) -> bool {
        self.locations.contains_key(&id)
    }

    fn neighbours(&self, id: EntityId) -> &[EntityId] {
        self.locations
            .get(&id)
            .map_or(&[], |location| location.neighbours.as_slice())
    }
}
