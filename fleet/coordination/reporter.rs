use fleet_codec::{Message, Parameter};
use fleet_world::{EntityId, Fieryness, LocationGraph};

use crate::{
    state::{CoordinationState, FleetRole},
    tasks::is_victim,
};

/// What admitting a fact does to the known sets.
#[derive(Debug, Clone, Copy)]
enum Effect {
    KnowFire(EntityId),
    KnowBlockade(EntityId),
    KnowVictim(EntityId),
    ForgetFire(EntityId),
    ForgetBlockade(EntityId),
    ForgetVictim(EntityId),
    ClearEntrance(EntityId),
    None,
}

/// Builds this tick's outbound report under a byte budget.
///
/// New hazards come first, then state changes of known hazards, then task
/// bookkeeping. Facts are admitted greedily; a fact that does not fit is
/// left unreported (not marked known, or kept queued) and offered again
/// next tick.
pub fn compose_message(
    state: &mut CoordinationState,
    graph: &LocationGraph,
    budget: usize,
) -> Message {
    let mut candidates = hazards(state, graph);
    candidates.extend(state_changes(state, graph));
    candidates.extend(
        std::mem::take(&mut state.outbox)
            .into_iter()
            .map(|parameter| (parameter, Effect::None)),
    );

    let mut message = Message::new();
    let mut used = 0;
    let mut deferred = 0;
    for (parameter, effect) in candidates {
        let len = parameter.record_len();
        if used + len > budget {
            deferred += 1;
            if matches!(parameter, Parameter::TaskPickup(_) | Parameter::TaskDrop(_)) {
                state.outbox.push(parameter);
            }
            continue;
        }
        used += len;
        apply(state, effect);
        message.push(parameter);
    }
    if deferred > 0 {
        tracing::debug!(agent = %state.agent, budget, deferred, "report over budget");
    }
    message
}

fn hazards(state: &CoordinationState, graph: &LocationGraph) -> Vec<(Parameter, Effect)> {
    let mut out = Vec::new();
    for building in state.belief.buildings() {
        if building.fieryness.is_on_fire() && !state.known.fires.contains(&building.id) {
            out.push((
                Parameter::Fire {
                    building: building.id,
                    ground_area: building.ground_area,
                    floors: building.floors,
                    intensity: building.fieryness,
                },
                Effect::KnowFire(building.id),
            ));
        }
    }
    for blockade in state.belief.blockades() {
        if !state.known.blockades.contains(&blockade.id) {
            out.push((
                Parameter::Blockade {
                    id: blockade.id,
                    road: blockade.road,
                    location: blockade.location,
                    repair_cost: blockade.repair_cost,
                },
                Effect::KnowBlockade(blockade.id),
            ));
        }
    }
    for human in state.belief.humans() {
        if human.id != state.agent
            && is_victim(graph, human)
            && !state.known.victims.contains(&human.id)
        {
            out.push((
                Parameter::Victim {
                    id: human.id,
                    position: human.position,
                    hp: human.hp,
                    damage: human.damage,
                    buriedness: human.buriedness,
                    role: human.role,
                },
                Effect::KnowVictim(human.id),
            ));
        }
    }
    out
}

fn state_changes(
    state: &mut CoordinationState,
    graph: &LocationGraph,
) -> Vec<(Parameter, Effect)> {
    let mut out = Vec::new();
    let mut settled = Vec::new();
    for &id in &state.known.fires {
        let Some(building) = state.belief.building(id) else {
            continue;
        };
        match building.fieryness {
            Fieryness::Heating | Fieryness::Burning | Fieryness::Inferno => {}
            Fieryness::BurntOut => {
                out.push((Parameter::BuildingBurnt(id), Effect::ForgetFire(id)));
            }
            Fieryness::WaterDamage
            | Fieryness::Minor
            | Fieryness::Moderate
            | Fieryness::Severe => {
                out.push((Parameter::FireExtinguished(id), Effect::ForgetFire(id)));
            }
            Fieryness::Unburnt => settled.push(id),
        }
    }
    for id in settled {
        state.known.fires.remove(&id);
    }
    for &id in &state.known.blockades {
        if !state.belief.contains(id) {
            out.push((Parameter::BlockadeCleared(id), Effect::ForgetBlockade(id)));
        }
    }
    for &id in &state.known.victims {
        let Some(human) = state.belief.human(id) else {
            continue;
        };
        if human.hp == 0 {
            out.push((Parameter::VictimDied(id), Effect::ForgetVictim(id)));
        } else if !is_victim(graph, human) {
            out.push((Parameter::VictimRescued(id), Effect::ForgetVictim(id)));
        }
    }
    let here = state.position;
    if state.role == FleetRole::Clearing
        && state.pending_entrances.contains(&here)
        && state.belief.blockades_on(here).next().is_none()
    {
        out.push((Parameter::EntranceCleared(here), Effect::ClearEntrance(here)));
    }
    out
}

fn apply(state: &mut CoordinationState, effect: Effect) {
    match effect {
        Effect::KnowFire(id) => {
            state.known.fires.insert(id);
        }
        Effect::KnowBlockade(id) => {
            state.known.blockades.insert(id);
        }
        Effect::KnowVictim(id) => {
            state.known.victims.insert(id);
        }
        Effect::ForgetFire(id) => {
            state.known.fires.remove(&id);
        }
        Effect::ForgetBlockade(id) => {
            state.known.blockades.remove(&id);
        }
        Effect::ForgetVictim(id) => {
            state.known.victims.remove(&id);
        }
        Effect::ClearEntrance(id) => {
            state.pending_entrances.remove(&id);
            state.cleared_entrances.insert(id);
        }
        Effect::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_codec::Tag;
    use fleet_world::{Blockade, Building, Human, HumanRole, Location, LocationKind, Point};

    fn graph() -> LocationGraph {
        LocationGraph::new(vec![
            Location::new(1, LocationKind::Road, Point::new(0, 0), [2, 3]),
            Location::new(2, LocationKind::Building, Point::new(0, 10), []),
            Location::new(3, LocationKind::Road, Point::new(10, 0), []),
        ])
        .unwrap()
    }

    fn state(role: FleetRole) -> CoordinationState {
        CoordinationState::new(EntityId(900), role, EntityId(1), 15)
    }

    fn burning(id: u32) -> Building {
        Building {
            id: EntityId(id),
            fieryness: Fieryness::Burning,
            ground_area: 80,
            floors: 2,
        }
    }

    #[test]
    fn new_fire_is_reported_once_and_becomes_known() {
        let graph = graph();
        let mut state = state(FleetRole::Suppression);
        state.belief.upsert(burning(2));

        let message = compose_message(&mut state, &graph, 256);
        assert_eq!(message.len(), 1);
        assert!(matches!(
            message.parameters()[0],
            Parameter::Fire {
                building,
                intensity: Fieryness::Burning,
                ..
            } if building == EntityId(2)
        ));
        assert!(state.known.fires.contains(&EntityId(2)));

        assert!(compose_message(&mut state, &graph, 256).is_empty());
    }

    #[test]
    fn resolved_hazards_are_announced() {
        let graph = graph();
        let mut state = state(FleetRole::Suppression);
        let mut building = burning(2);
        building.fieryness = Fieryness::Moderate;
        state.belief.upsert(building);
        state.known.fires.insert(EntityId(2));
        state.known.blockades.insert(EntityId(40));
        state.belief.upsert(Human {
            id: EntityId(50),
            role: HumanRole::Civilian,
            position: EntityId(2),
            hp: 0,
            damage: 0,
            buriedness: 3,
        });
        state.known.victims.insert(EntityId(50));

        let message = compose_message(&mut state, &graph, 256);
        assert_eq!(
            message.parameters(),
            &[
                Parameter::FireExtinguished(EntityId(2)),
                Parameter::BlockadeCleared(EntityId(40)),
                Parameter::VictimDied(EntityId(50)),
            ]
        );
        assert!(state.known.fires.is_empty());
        assert!(state.known.blockades.is_empty());
        assert!(state.known.victims.is_empty());
    }

    #[test]
    fn hazards_win_the_budget_and_the_rest_waits() {
        let graph = graph();
        let mut state = state(FleetRole::Clearing);
        state.belief.upsert(Blockade {
            id: EntityId(40),
            road: EntityId(3),
            location: Point::new(10, 0),
            repair_cost: 12,
            footprint: None,
        });
        state.belief.upsert(burning(2));
        state.queue(Parameter::TaskPickup(EntityId(40)));

        let budget = Tag::Fire.record_len() + Tag::TaskPickup.record_len();
        let message = compose_message(&mut state, &graph, budget);
        assert_eq!(message.len(), 2);
        assert!(matches!(message.parameters()[1], Parameter::TaskPickup(_)));
        assert!(state.known.fires.contains(&EntityId(2)));
        assert!(!state.known.blockades.contains(&EntityId(40)));

        let next = compose_message(&mut state, &graph, 256);
        assert_eq!(next.len(), 1);
        assert!(state.known.blockades.contains(&EntityId(40)));
    }

    #[test]
    fn deferred_bookkeeping_stays_queued() {
        let graph = graph();
        let mut state = state(FleetRole::Clearing);
        state.queue(Parameter::TaskDrop(EntityId(7)));
        assert!(compose_message(&mut state, &graph, 3).is_empty());
        assert_eq!(state.outbox, vec![Parameter::TaskDrop(EntityId(7))]);
    }

    #[test]
    fn never_reports_itself_as_victim() {
        let graph = graph();
        let mut state = state(FleetRole::Rescue);
        state.belief.upsert(Human {
            id: EntityId(900),
            role: HumanRole::Rescue,
            position: EntityId(1),
            hp: 100,
            damage: 1,
            buriedness: 10,
        });
        assert!(compose_message(&mut state, &graph, 256).is_empty());
    }

    #[test]
    fn sheltering_civilian_is_reported_once_and_then_rescued() {
        let graph = graph();
        let mut state = state(FleetRole::Rescue);
        state.belief.upsert(Human {
            id: EntityId(50),
            role: HumanRole::Civilian,
            position: EntityId(2),
            hp: 9_000,
            damage: 0,
            buriedness: 0,
        });

        let tags: Vec<Vec<Tag>> = (0..4)
            .map(|_| {
                compose_message(&mut state, &graph, 256)
                    .parameters()
                    .iter()
                    .filter_map(Parameter::tag)
                    .collect()
            })
            .collect();
        assert_eq!(tags, vec![vec![Tag::Victim], vec![], vec![], vec![]]);
        assert!(state.known.victims.contains(&EntityId(50)));

        if let Some(civilian) = state.belief.human_mut(EntityId(50)) {
            civilian.position = EntityId(1);
        }
        let message = compose_message(&mut state, &graph, 256);
        assert_eq!(message.parameters(), &[Parameter::VictimRescued(EntityId(50))]);
        assert!(compose_message(&mut state, &graph, 256).is_empty());
    }

    #[test]
    fn standing_on_a_clear_pending_entrance_reports_it() {
        let graph = graph();
        let mut state = state(FleetRole::Clearing);
        state.pending_entrances.insert(EntityId(1));
        let message = compose_message(&mut state, &graph, 256);
        assert_eq!(message.parameters(), &[Parameter::EntranceCleared(EntityId(1))]);
        assert!(state.cleared_entrances.contains(&EntityId(1)));
        assert!(state.pending_entrances.is_empty());
    }
}
