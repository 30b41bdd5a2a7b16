use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    entity::{Blockade, Building, Entity, Human},
    geometry::EntityId,
};

/// An agent's local, possibly stale snapshot of every entity it knows about.
///
/// Resolved entities are removed rather than flagged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeliefStore {
    entities: IndexMap<EntityId, Entity>,
}

impl BeliefStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of believed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is believed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether an entity is believed to exist.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Raw lookup.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Replaces the snapshot of an entity, returning the previous one.
    pub fn upsert(&mut self, entity: impl Into<Entity>) -> Option<Entity> {
        let entity = entity.into();
        self.entities.insert(entity.id(), entity)
    }

    /// Forgets an entity.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.shift_remove(&id)
    }

    /// Looks up a human.
    #[must_use]
    pub fn human(&self, id: EntityId) -> Option<&Human> {
        match self.entities.get(&id) {
            Some(Entity::Human(human)) => Some(human),
            _ => None,
        }
    }

    /// Mutable human lookup.
    pub fn human_mut(&mut self, id: EntityId) -> Option<&mut Human> {
        match self.entities.get_mut(&id) {
            Some(Entity::Human(human)) => Some(human),
            _ => None,
        }
    }

    /// Looks up a blockade.
    #[must_use]
    pub fn blockade(&self, id: EntityId) -> Option<&Blockade> {
        match self.entities.get(&id) {
            Some(Entity::Blockade(blockade)) => Some(blockade),
            _ => None,
        }
    }

    /// Looks up a building.
    #[must_use]
    pub fn building(&self, id: EntityId) -> Option<&Building> {
        match self.entities.get(&id) {
            Some(Entity::Building(building)) => Some(building),
            _ => None,
        }
    }

    /// Mutable building lookup.
    pub fn building_mut(&mut self, id: EntityId) -> Option<&mut Building> {
        match self.entities.get_mut(&id) {
            Some(Entity::Building(building)) => Some(building),
            _ => None,
        }
    }

    /// Every believed entity in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Believed humans.
    pub fn humans(&self) -> impl Iterator<Item = &Human> {
        self.entities.values().filter_map(|entity| match entity {
            Entity::Human(human) => Some(human),
            _ => None,
        })
    }

    /// Believed blockades.
    pub fn blockades(&self) -> impl Iterator<Item = &Blockade> {
        self.entities.values().filter_map(|entity| match entity {
            Entity::Blockade(blockade) => Some(blockade),
            _ => None,
        })
    }

    /// Believed buildings.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.entities.values().filter_map(|entity| match entity {
            Entity::Building(building) => Some(building),
            _ => None,
        })
    }

    /// Blockades believed to sit on `road`.
    pub fn blockades_on(&self, road: EntityId) -> impl Iterator<Item = &Blockade> {
        self.blockades().filter(move |blockade| blockade.road == road)
    }
}

/// Everything an agent sensed directly during one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Perception {
    /// Simulation tick.
    pub tick: u32,
    /// Location the agent stands in.
    pub position: EntityId,
    /// Entities in sensing range, fully described.
    pub entities: Vec<Entity>,
}

impl Perception {
    /// Creates a perception at a position.
    #[must_use]
    pub fn new(tick: u32, position: EntityId) -> Self {
        Self {
            tick,
            position,
            entities: Vec::new(),
        }
    }

    /// Adds a perceived entity.
    #[must_use]
    pub fn with(mut self, entity: impl Into<Entity>) -> Self {
        self.entities.push(entity.into());
        self
    }

    /// Identifiers perceived this tick.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<EntityId> {
        self.entities.iter().map(Entity::id).collect()
    }
}

/// Raw payload heard from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeardMessage {
    /// Speaking agent.
    pub sender: EntityId,
    /// Channel it was heard on; zero for direct voice.
    pub channel: u8,
    /// Undecoded bytes.
    pub payload: Vec<u8>,
}
