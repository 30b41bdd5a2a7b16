use fleet_world::EntityId;
use serde::{Deserialize, Serialize};

use crate::error::EmptyPath;

/// Ordered locations from a start to a goal, start included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EntityId>", into = "Vec<EntityId>")]
pub struct Path(Vec<EntityId>);

impl TryFrom<Vec<EntityId>> for Path {
    type Error = EmptyPath;

    fn try_from(steps: Vec<EntityId>) -> Result<Self, Self::Error> {
        Self::new(steps).ok_or(EmptyPath)
    }
}

impl From<Path> for Vec<EntityId> {
    fn from(path: Path) -> Self {
        path.0
    }
}

impl Path {
    /// Wraps a non-empty sequence.
    #[must_use]
    pub fn new(steps: Vec<EntityId>) -> Option<Self> {
        (!steps.is_empty()).then_some(Self(steps))
    }

    /// Zero-hop path standing at `start`.
    #[must_use]
    pub fn at(start: EntityId) -> Self {
        Self(vec![start])
    }

    pub(crate) fn push(&mut self, id: EntityId) {
        self.0.push(id);
    }

    /// First location.
    #[must_use]
    pub fn start(&self) -> EntityId {
        self.0[0]
    }

    /// Last location.
    #[must_use]
    pub fn goal(&self) -> EntityId {
        self.0[self.0.len() - 1]
    }

    /// Number of moves.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.0.len() - 1
    }

    /// Location after the start, if any.
    #[must_use]
    pub fn next_step(&self) -> Option<EntityId> {
        self.0.get(1).copied()
    }

    /// Whether the path passes through `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains(&id)
    }

    /// Borrowed steps.
    #[must_use]
    pub fn steps(&self) -> &[EntityId] {
        &self.0
    }

    /// Owned steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<EntityId> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_step_list_is_rejected() {
        assert_eq!(Path::try_from(Vec::new()), Err(EmptyPath));
        assert!(serde_json::from_str::<Path>("[]").is_err());
    }

    #[test]
    fn serializes_as_plain_step_list() {
        let path = Path::new(vec![EntityId(3), EntityId(4)]).unwrap();
        let encoded = serde_json::to_string(&path).unwrap();
        assert_eq!(encoded, "[3,4]");
        let decoded: Path = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.hops(), 1);
        assert_eq!(decoded.start(), EntityId(3));
    }
}
