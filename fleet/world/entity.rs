use serde::{Deserialize, Serialize};

use crate::geometry::{EntityId, Point};

/// What a human is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanRole {
    /// Medical-rescue unit.
    Rescue,
    /// Fire-suppression unit.
    Suppression,
    /// Debris-clearing unit.
    Clearing,
    /// Civilian.
    Civilian,
}

impl HumanRole {
    /// Wire code of the role.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Rescue => 0,
            Self::Suppression => 1,
            Self::Clearing => 2,
            Self::Civilian => 3,
        }
    }

    /// Parses a wire code; unknown codes map to civilians.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Rescue,
            1 => Self::Suppression,
            2 => Self::Clearing,
            _ => Self::Civilian,
        }
    }
}

/// A person on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Human {
    /// Identifier.
    pub id: EntityId,
    /// Role.
    pub role: HumanRole,
    /// Location the human stands in.
    pub position: EntityId,
    /// Remaining health points.
    pub hp: u16,
    /// Health lost per tick.
    pub damage: u16,
    /// Burial depth; zero when free.
    pub buriedness: u16,
}

impl Human {
    /// Whether the human still has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether the human is trapped under debris.
    #[must_use]
    pub const fn is_buried(&self) -> bool {
        self.buriedness > 0
    }

    /// Ticks this human survives at the current damage rate.
    #[must_use]
    pub fn ticks_to_live(&self) -> Option<u32> {
        (self.damage > 0).then(|| u32::from(self.hp) / u32::from(self.damage))
    }
}

/// Debris obstructing a road.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockade {
    /// Identifier.
    pub id: EntityId,
    /// Hosting road.
    pub road: EntityId,
    /// Centre of the debris.
    pub location: Point,
    /// Work needed to clear it.
    pub repair_cost: u32,
    /// Outline, when perceived directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Vec<Point>>,
}

/// Fire state of a building.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Fieryness {
    /// Never burned.
    #[default]
    Unburnt,
    /// Warming up.
    Heating,
    /// Burning.
    Burning,
    /// Fully ablaze.
    Inferno,
    /// Extinguished, damaged by water only.
    WaterDamage,
    /// Extinguished after minor fire damage.
    Minor,
    /// Extinguished after moderate fire damage.
    Moderate,
    /// Extinguished after severe fire damage.
    Severe,
    /// Burned down completely.
    BurntOut,
}

impl Fieryness {
    /// Numeric intensity code, 0..=8.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parses an intensity code; out-of-range values are treated as burnt out.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Unburnt,
            1 => Self::Heating,
            2 => Self::Burning,
            3 => Self::Inferno,
            4 => Self::WaterDamage,
            5 => Self::Minor,
            6 => Self::Moderate,
            7 => Self::Severe,
            _ => Self::BurntOut,
        }
    }

    /// Heating, burning or inferno.
    #[must_use]
    pub const fn is_on_fire(self) -> bool {
        matches!(self, Self::Heating | Self::Burning | Self::Inferno)
    }
}

/// Believed state of a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Identifier.
    pub id: EntityId,
    /// Fire state.
    pub fieryness: Fieryness,
    /// Ground area in square metres.
    pub ground_area: u32,
    /// Number of floors.
    pub floors: u8,
}

impl Building {
    /// Total floor area.
    #[must_use]
    pub fn total_area(&self) -> u64 {
        u64::from(self.ground_area) * u64::from(self.floors.max(1))
    }
}

/// Anything with a belief lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    /// A person.
    Human(Human),
    /// Debris.
    Blockade(Blockade),
    /// A building fire state.
    Building(Building),
}

impl Entity {
    /// Identifier of the wrapped entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Human(human) => human.id,
            Self::Blockade(blockade) => blockade.id,
            Self::Building(building) => building.id,
        }
    }
}

impl From<Human> for Entity {
    fn from(value: Human) -> Self {
        Self::Human(value)
    }
}

impl From<Blockade> for Entity {
    fn from(value: Blockade) -> Self {
        Self::Blockade(value)
    }
}

impl From<Building> for Entity {
    fn from(value: Building) -> Self {
        Self::Building(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fieryness_codes_cover_the_scale() {
        for code in 0..=8 {
            assert_eq!(Fieryness::from_code(code).code(), code);
        }
        assert_eq!(Fieryness::from_code(200), Fieryness::BurntOut);
        assert!(Fieryness::Inferno.is_on_fire());
        assert!(!Fieryness::WaterDamage.is_on_fire());
    }

    #[test]
    fn role_codes_round_trip() {
        for role in [
            HumanRole::Rescue,
            HumanRole::Suppression,
            HumanRole::Clearing,
            HumanRole::Civilian,
        ] {
            assert_eq!(HumanRole::from_code(role.code()), role);
        }
    }

    #[test]
    fn ticks_to_live_needs_damage() {
        let mut human = Human {
            id: EntityId(1),
            role: HumanRole::Civilian,
            position: EntityId(2),
            hp: 1000,
            damage: 0,
            buriedness: 30,
        };
        assert_eq!(human.ticks_to_live(), None);
        human.damage = 10;
        assert_eq!(human.ticks_to_live(), Some(100));
    }
}
