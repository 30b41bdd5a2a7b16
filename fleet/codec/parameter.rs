use fleet_world::{EntityId, Fieryness, HumanRole, Point};
use serde::{Deserialize, Serialize};

use crate::{error::CodecError, tags::Tag};

/// One typed fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    /// A building is burning.
    Fire {
        /// Building.
        building: EntityId,
        /// Ground area.
        ground_area: u32,
        /// Floor count.
        floors: u8,
        /// Current fire state.
        intensity: Fieryness,
    },
    /// A blockade obstructs a road.
    Blockade {
        /// Blockade.
        id: EntityId,
        /// Hosting road.
        road: EntityId,
        /// Centre of the debris.
        location: Point,
        /// Remaining repair cost.
        repair_cost: u32,
    },
    /// A human needs help.
    Victim {
        /// Human.
        id: EntityId,
        /// Location of the human.
        position: EntityId,
        /// Health.
        hp: u16,
        /// Damage rate.
        damage: u16,
        /// Burial depth.
        buriedness: u16,
        /// Role of the human.
        role: HumanRole,
    },
    /// The sender claims a task.
    TaskPickup(EntityId),
    /// The sender releases a task.
    TaskDrop(EntityId),
    /// A blockade is gone.
    BlockadeCleared(EntityId),
    /// A victim died.
    VictimDied(EntityId),
    /// A victim was unburied.
    VictimRescued(EntityId),
    /// A fire was put out.
    FireExtinguished(EntityId),
    /// A building burned down.
    BuildingBurnt(EntityId),
    /// The road in front of a building was cleared.
    EntranceCleared(EntityId),
    /// A civilian shouted; the receiver has to infer where.
    DistressShout {
        /// What the shout says.
        distress: Distress,
    },
}

/// The two things a civilian can shout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distress {
    /// Hurt but free ("Ouch").
    Hurt,
    /// Buried under rubble ("Help").
    Buried,
}

impl Distress {
    /// Wire literal.
    #[must_use]
    pub const fn literal(self) -> &'static [u8] {
        match self {
            Self::Hurt => b"Ouch",
            Self::Buried => b"Help",
        }
    }

    /// Shout spelled by exactly `bytes`.
    #[must_use]
    pub fn from_literal(bytes: &[u8]) -> Option<Self> {
        [Self::Hurt, Self::Buried]
            .into_iter()
            .find(|distress| distress.literal() == bytes)
    }

    /// Whether the shouter is buried.
    #[must_use]
    pub const fn is_buried(self) -> bool {
        matches!(self, Self::Buried)
    }

    /// Whether the shouter reports damage.
    #[must_use]
    pub const fn is_hurt(self) -> bool {
        matches!(self, Self::Hurt)
    }
}

/// Outbound priority band; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterClass {
    /// Newly sighted fire, blockade or victim.
    Hazard,
    /// A known hazard changed state.
    StateChange,
    /// Task claim bookkeeping.
    Bookkeeping,
}

impl Parameter {
    /// Record tag; shouts have none.
    #[must_use]
    pub const fn tag(&self) -> Option<Tag> {
        Some(match self {
            Self::Fire { .. } => Tag::Fire,
            Self::Blockade { .. } => Tag::Blockade,
            Self::Victim { .. } => Tag::Victim,
            Self::TaskPickup(_) => Tag::TaskPickup,
            Self::TaskDrop(_) => Tag::TaskDrop,
            Self::BlockadeCleared(_) => Tag::BlockadeCleared,
            Self::VictimDied(_) => Tag::VictimDied,
            Self::VictimRescued(_) => Tag::VictimRescued,
            Self::FireExtinguished(_) => Tag::FireExtinguished,
            Self::BuildingBurnt(_) => Tag::BuildingBurnt,
            Self::EntranceCleared(_) => Tag::EntranceCleared,
            Self::DistressShout { .. } => return None,
        })
    }

    /// Entity the fact is about, if any.
    #[must_use]
    pub const fn subject(&self) -> Option<EntityId> {
        match self {
            Self::Fire { building, .. } => Some(*building),
            Self::Blockade { id, .. } | Self::Victim { id, .. } => Some(*id),
            Self::TaskPickup(id)
            | Self::TaskDrop(id)
            | Self::BlockadeCleared(id)
            | Self::VictimDied(id)
            | Self::VictimRescued(id)
            | Self::FireExtinguished(id)
            | Self::BuildingBurnt(id)
            | Self::EntranceCleared(id) => Some(*id),
            Self::DistressShout { .. } => None,
        }
    }

    /// Priority band used when the channel budget is tight.
    #[must_use]
    pub const fn class(&self) -> ParameterClass {
        match self {
            Self::Fire { .. }
            | Self::Blockade { .. }
            | Self::Victim { .. }
            | Self::DistressShout { .. } => ParameterClass::Hazard,
            Self::TaskPickup(_) | Self::TaskDrop(_) => ParameterClass::Bookkeeping,
            _ => ParameterClass::StateChange,
        }
    }

    /// Encoded size as a tagged record; zero for shouts.
    #[must_use]
    pub const fn record_len(&self) -> usize {
        match self.tag() {
            Some(tag) => tag.record_len(),
            None => 0,
        }
    }

    /// Bare shout literal, for shouts only.
    #[must_use]
    pub const fn shout_literal(&self) -> Option<&'static [u8]> {
        match self {
            Self::DistressShout { distress } => Some(distress.literal()),
            _ => None,
        }
    }

    /// Recognises a whole buffer that is exactly a shout literal.
    #[must_use]
    pub fn from_shout(bytes: &[u8]) -> Option<Self> {
        Distress::from_literal(bytes).map(|distress| Self::DistressShout { distress })
    }

    /// Appends tag and payload; shouts write nothing.
    pub fn write_record(&self, out: &mut Vec<u8>) {
        let Some(tag) = self.tag() else {
            return;
        };
        out.push(tag.byte());
        match self {
            Self::Fire {
                building,
                ground_area,
                floors,
                intensity,
            } => {
                out.extend_from_slice(&building.0.to_be_bytes());
                out.extend_from_slice(&ground_area.to_be_bytes());
                out.push(*floors);
                out.push(intensity.code());
            }
            Self::Blockade {
                id,
                road,
                location,
                repair_cost,
            } => {
                out.extend_from_slice(&id.0.to_be_bytes());
                out.extend_from_slice(&road.0.to_be_bytes());
                out.extend_from_slice(&location.x.to_be_bytes());
                out.extend_from_slice(&location.y.to_be_bytes());
                out.extend_from_slice(&repair_cost.to_be_bytes());
            }
            Self::Victim {
                id,
                position,
                hp,
                damage,
                buriedness,
                role,
            } => {
                out.extend_from_slice(&id.0.to_be_bytes());
                out.extend_from_slice(&position.0.to_be_bytes());
                out.extend_from_slice(&hp.to_be_bytes());
                out.extend_from_slice(&damage.to_be_bytes());
                out.extend_from_slice(&buriedness.to_be_bytes());
                out.push(role.code());
            }
            Self::TaskPickup(id)
            | Self::TaskDrop(id)
            | Self::BlockadeCleared(id)
            | Self::VictimDied(id)
            | Self::VictimRescued(id)
            | Self::FireExtinguished(id)
            | Self::BuildingBurnt(id)
            | Self::EntranceCleared(id) => out.extend_from_slice(&id.0.to_be_bytes()),
            Self::DistressShout { .. } => {}
        }
    }

    /// Decodes the record at the start of `bytes`.
    ///
    /// Returns the parameter and the number of bytes consumed.
    pub fn read_record(bytes: &[u8]) -> Result<(Self, usize), CodecError> {
        let (&byte, rest) = bytes.split_first().ok_or(CodecError::UnknownTag(0))?;
        let tag = Tag::try_from(byte)?;
        let needed = tag.payload_len();
        if rest.len() < needed {
            return Err(CodecError::Truncated {
                tag: byte,
                needed,
                available: rest.len(),
            });
        }
        let mut reader = Reader::new(&rest[..needed]);
        let parameter = match tag {
            Tag::Fire => Self::Fire {
                building: reader.id(),
                ground_area: reader.u32(),
                floors: reader.u8(),
                intensity: Fieryness::from_code(reader.u8()),
            },
            Tag::Blockade => Self::Blockade {
                id: reader.id(),
                road: reader.id(),
                location: Point::new(reader.i32(), reader.i32()),
                repair_cost: reader.u32(),
            },
            Tag::Victim => Self::Victim {
                id: reader.id(),
                position: reader.id(),
                hp: reader.u16(),
                damage: reader.u16(),
                buriedness: reader.u16(),
                role: HumanRole::from_code(reader.u8()),
            },
            Tag::TaskPickup => Self::TaskPickup(reader.id()),
            Tag::TaskDrop => Self::TaskDrop(reader.id()),
            Tag::BlockadeCleared => Self::BlockadeCleared(reader.id()),
            Tag::VictimDied => Self::VictimDied(reader.id()),
            Tag::VictimRescued => Self::VictimRescued(reader.id()),
            Tag::FireExtinguished => Self::FireExtinguished(reader.id()),
            Tag::BuildingBurnt => Self::BuildingBurnt(reader.id()),
            Tag::EntranceCleared => Self::EntranceCleared(reader.id()),
        };
        Ok((parameter, tag.record_len()))
    }
}

/// Big-endian reader over a payload whose length was already checked.
struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0; N];
        if let Some(slice) = self.bytes.get(self.at..self.at + N) {
            out.copy_from_slice(slice);
        }
        self.at += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take())
    }

    fn id(&mut self) -> EntityId {
        EntityId(self.u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blockade_record_layout_is_big_endian() {
        let mut out = Vec::new();
        Parameter::Blockade {
            id: EntityId(0x0102_0304),
            road: EntityId(7),
            location: Point::new(-1, 2),
            repair_cost: 9,
        }
        .write_record(&mut out);
        assert_eq!(out.len(), Tag::Blockade.record_len());
        assert_eq!(&out[..5], &[2, 1, 2, 3, 4]);
        assert_eq!(&out[9..13], &(-1_i32).to_be_bytes());
    }

    #[test]
    fn truncated_record_reports_shortfall() {
        let err = Parameter::read_record(&[Tag::Victim.byte(), 0, 0]).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                tag: 3,
                needed: 15,
                available: 2
            }
        );
    }

    #[test]
    fn shouts_are_recognised_by_exact_match() {
        assert_eq!(
            Parameter::from_shout(b"Help"),
            Some(Parameter::DistressShout {
                distress: Distress::Buried
            })
        );
        assert_eq!(Distress::from_literal(b"Ouch"), Some(Distress::Hurt));
        assert!(Parameter::from_shout(b"Help!").is_none());
        assert!(Parameter::from_shout(b"ouch").is_none());
    }

    #[test]
    fn classes_order_hazards_first() {
        assert!(
            Parameter::Fire {
                building: EntityId(1),
                ground_area: 1,
                floors: 1,
                intensity: Fieryness::Burning,
            }
            .class()
                < Parameter::VictimDied(EntityId(1)).class()
        );
        assert_eq!(
            Parameter::TaskDrop(EntityId(1)).class(),
            ParameterClass::Bookkeeping
        );
    }
}
