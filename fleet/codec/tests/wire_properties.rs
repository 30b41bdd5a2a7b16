use fleet_codec::{Distress, Message, Parameter};
use fleet_world::{EntityId, Fieryness, HumanRole, Point};
use proptest::prelude::*;

fn id() -> impl Strategy<Value = EntityId> {
    any::<u32>().prop_map(EntityId)
}

fn parameter() -> impl Strategy<Value = Parameter> {
    prop_oneof![
        (id(), any::<u32>(), any::<u8>(), 0u8..=8).prop_map(|(building, ground_area, floors, f)| {
            Parameter::Fire {
                building,
                ground_area,
                floors,
                intensity: Fieryness::from_code(f),
            }
        }),
        (id(), id(), any::<i32>(), any::<i32>(), any::<u32>()).prop_map(
            |(id, road, x, y, repair_cost)| Parameter::Blockade {
                id,
                road,
                location: Point::new(x, y),
                repair_cost,
            }
        ),
        (id(), id(), any::<u16>(), any::<u16>(), any::<u16>(), 0u8..=3).prop_map(
            |(id, position, hp, damage, buriedness, role)| Parameter::Victim {
                id,
                position,
                hp,
                damage,
                buriedness,
                role: HumanRole::from_code(role),
            }
        ),
        (0u8..8, id()).prop_map(|(kind, id)| match kind {
            0 => Parameter::TaskPickup(id),
            1 => Parameter::TaskDrop(id),
            2 => Parameter::BlockadeCleared(id),
            3 => Parameter::VictimDied(id),
            4 => Parameter::VictimRescued(id),
            5 => Parameter::FireExtinguished(id),
            6 => Parameter::BuildingBurnt(id),
            _ => Parameter::EntranceCleared(id),
        }),
    ]
}

fn shout() -> impl Strategy<Value = Parameter> {
    prop_oneof![Just(Distress::Hurt), Just(Distress::Buried)]
        .prop_map(|distress| Parameter::DistressShout { distress })
}

proptest! {
    #[test]
    fn encoded_messages_decode_to_the_same_parameters(
        parameters in prop::collection::vec(parameter(), 0..24)
    ) {
        let message: Message = parameters.into_iter().collect();
        let bytes = message.encode();
        prop_assert_eq!(bytes.len(), message.size());
        prop_assert_eq!(Message::decode(&bytes), message);
    }

    #[test]
    fn any_record_boundary_prefix_decodes_to_that_prefix(
        parameters in prop::collection::vec(parameter(), 1..16),
        cut in any::<prop::sample::Index>(),
    ) {
        let keep = cut.index(parameters.len() + 1);
        let message: Message = parameters.iter().cloned().collect();
        let bytes = message.encode();
        let boundary: usize = parameters[..keep].iter().map(Parameter::record_len).sum();
        let decoded = Message::decode(&bytes[..boundary]);
        prop_assert_eq!(decoded.parameters(), &parameters[..keep]);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let decoded = Message::decode(&bytes);
        prop_assert!(decoded.size() <= bytes.len().max(4));
    }

    #[test]
    fn lone_shout_round_trips(shout in shout()) {
        let message = Message::from_iter([shout]);
        let bytes = message.encode();
        prop_assert_eq!(bytes.len(), 4);
        prop_assert_eq!(Message::decode(&bytes), message);
    }

    #[test]
    fn shouts_among_records_are_left_out(
        records in prop::collection::vec(parameter(), 1..8),
        shouts in prop::collection::vec((shout(), any::<prop::sample::Index>()), 1..4),
    ) {
        let mut parameters = records.clone();
        for (shout, at) in shouts {
            parameters.insert(at.index(parameters.len() + 1), shout);
        }
        let message: Message = parameters.into_iter().collect();
        let bytes = message.encode();
        prop_assert_eq!(bytes.len(), message.size());
        let decoded = Message::decode(&bytes);
        prop_assert_eq!(decoded.parameters(), records.as_slice());
    }
}
