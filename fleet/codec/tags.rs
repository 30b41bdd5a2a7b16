use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Record tag. The numeric value is the wire byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tag {
    /// Building on fire.
    Fire = 1,
    /// Blockade sighted.
    Blockade = 2,
    /// Victim sighted.
    Victim = 3,
    /// Sender claims a task.
    TaskPickup = 4,
    /// Sender releases a task.
    TaskDrop = 5,
    /// Blockade removed.
    BlockadeCleared = 6,
    /// Victim died.
    VictimDied = 7,
    /// Victim unburied.
    VictimRescued = 8,
    /// Fire put out.
    FireExtinguished = 9,
    /// Building burned down.
    BuildingBurnt = 10,
    /// Road in front of a building cleared.
    EntranceCleared = 11,
}

impl Tag {
    /// Every tag, in wire order.
    pub const ALL: [Self; 11] = [
        Self::Fire,
        Self::Blockade,
        Self::Victim,
        Self::TaskPickup,
        Self::TaskDrop,
        Self::BlockadeCleared,
        Self::VictimDied,
        Self::VictimRescued,
        Self::FireExtinguished,
        Self::BuildingBurnt,
        Self::EntranceCleared,
    ];

    /// Wire byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Looks up a wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Fire,
            2 => Self::Blockade,
            3 => Self::Victim,
            4 => Self::TaskPickup,
            5 => Self::TaskDrop,
            6 => Self::BlockadeCleared,
            7 => Self::VictimDied,
            8 => Self::VictimRescued,
            9 => Self::FireExtinguished,
            10 => Self::BuildingBurnt,
            11 => Self::EntranceCleared,
            _ => return None,
        })
    }

    /// Declared payload length, independent of content.
    #[must_use]
    pub const fn payload_len(self) -> usize {
        match self {
            // building, ground area, floors, intensity
            Self::Fire => 4 + 4 + 1 + 1,
            // id, road, x, y, repair cost
            Self::Blockade => 4 * 5,
            // id, position, hp, damage, buriedness, role
            Self::Victim => 4 + 4 + 2 + 2 + 2 + 1,
            Self::TaskPickup
            | Self::TaskDrop
            | Self::BlockadeCleared
            | Self::VictimDied
            | Self::VictimRescued
            | Self::FireExtinguished
            | Self::BuildingBurnt
            | Self::EntranceCleared => 4,
        }
    }

    /// Tag byte plus payload.
    #[must_use]
    pub const fn record_len(self) -> usize {
        1 + self.payload_len()
    }
}

impl TryFrom<u8> for Tag {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(CodecError::UnknownTag(value))
    }
}
