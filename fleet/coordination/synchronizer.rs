use std::collections::BTreeSet;

use fleet_codec::{Message, Parameter};
use fleet_world::{
    Blockade, Building, EntityId, Fieryness, HeardMessage, Human, HumanRole, Perception,
};
use serde::Serialize;

use crate::{config::AgentConfig, state::CoordinationState};

/// Health assumed for a civilian known only from its shout.
const SHOUT_HP: u16 = 10_000;

/// Switches for merge behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Whether a buried civilian's shout creates a belief.
    pub merge_distress_shouts: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            merge_distress_shouts: true,
        }
    }
}

impl From<&AgentConfig> for MergeOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            merge_distress_shouts: config.merge_distress_shouts,
        }
    }
}

/// What a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Entities overwritten by perception.
    pub perceived: usize,
    /// Peer facts applied.
    pub applied: usize,
    /// Peer facts ignored because perception covered their subject.
    pub overridden: usize,
    /// Blockades pruned from the agent's own location.
    pub pruned: usize,
}

/// Decodes every heard payload, keeping the sender.
#[must_use]
pub fn decode_heard(heard: &[HeardMessage]) -> Vec<(EntityId, Message)> {
    heard
        .iter()
        .map(|h| (h.sender, Message::decode(&h.payload)))
        .collect()
}

/// Folds this tick's perception and peer facts into the agent's belief.
///
/// Perception overwrites belief. Peer facts only touch entities that were
/// not perceived this tick. Blockades believed at the agent's own location
/// that it did not see are removed last.
pub fn merge(
    state: &mut CoordinationState,
    perception: &Perception,
    heard: &[(EntityId, Message)],
    options: MergeOptions,
) -> MergeReport {
    let mut report = MergeReport::default();
    state.position = perception.position;
    for entity in &perception.entities {
        state.belief.upsert(entity.clone());
        report.perceived += 1;
    }
    let perceived = perception.ids();

    for (sender, message) in heard {
        if *sender == state.agent {
            continue;
        }
        for parameter in message.parameters() {
            let covered = match parameter {
                Parameter::TaskPickup(_) | Parameter::TaskDrop(_) => false,
                Parameter::DistressShout { .. } => perceived.contains(sender),
                other => other.subject().is_some_and(|id| perceived.contains(&id)),
            };
            if covered {
                report.overridden += 1;
                continue;
            }
            if apply(state, *sender, parameter, options) {
                report.applied += 1;
            }
        }
    }

    report.pruned = prune_unseen_blockades(state, &perceived);
    tracing::debug!(
        agent = %state.agent,
        tick = perception.tick,
        perceived = report.perceived,
        applied = report.applied,
        overridden = report.overridden,
        pruned = report.pruned,
        "belief merged"
    );
    report
}

fn apply(
    state: &mut CoordinationState,
    sender: EntityId,
    parameter: &Parameter,
    options: MergeOptions,
) -> bool {
    match *parameter {
        Parameter::Fire {
            building,
            ground_area,
            floors,
            intensity,
        } => {
            state.belief.upsert(Building {
                id: building,
                fieryness: intensity,
                ground_area,
                floors,
            });
            state.known.fires.insert(building);
        }
        Parameter::Blockade {
            id,
            road,
            location,
            repair_cost,
        } => {
            let footprint = state
                .belief
                .blockade(id)
                .and_then(|existing| existing.footprint.clone());
            state.belief.upsert(Blockade {
                id,
                road,
                location,
                repair_cost,
                footprint,
            });
            state.known.blockades.insert(id);
        }
        Parameter::Victim {
            id,
            position,
            hp,
            damage,
            buriedness,
            role,
        } => {
            if id == state.agent {
                return false;
            }
            state.belief.upsert(Human {
                id,
                role,
                position,
                hp,
                damage,
                buriedness,
            });
            state.known.victims.insert(id);
        }
        Parameter::BlockadeCleared(id) => {
            if state.belief.blockade(id).is_some() {
                state.belief.remove(id);
            }
            state.known.blockades.remove(&id);
        }
        Parameter::VictimDied(id) => {
            if let Some(human) = state.belief.human_mut(id) {
                human.hp = 0;
            }
            state.known.victims.remove(&id);
        }
        Parameter::VictimRescued(id) => {
            if let Some(human) = state.belief.human_mut(id) {
                human.buriedness = 0;
            }
            state.known.victims.remove(&id);
        }
        Parameter::FireExtinguished(id) => {
            if let Some(building) = state.belief.building_mut(id) {
                building.fieryness = Fieryness::WaterDamage;
            }
            state.known.fires.remove(&id);
        }
        Parameter::BuildingBurnt(id) => {
            if let Some(building) = state.belief.building_mut(id) {
                building.fieryness = Fieryness::BurntOut;
            }
            state.known.fires.remove(&id);
        }
        Parameter::EntranceCleared(road) => {
            state.cleared_entrances.insert(road);
            state.pending_entrances.remove(&road);
        }
        Parameter::TaskPickup(task) => {
            if !state.tasks.contains(task) {
                tracing::trace!(%sender, %task, "pickup for unknown task ignored");
                return false;
            }
            state.tasks.claim(sender, task);
        }
        Parameter::TaskDrop(task) => {
            state.tasks.release(sender, task);
        }
        Parameter::DistressShout { distress } => {
            if !(options.merge_distress_shouts && distress.is_buried())
                || state.belief.contains(sender)
            {
                return false;
            }
            state.belief.upsert(Human {
                id: sender,
                role: HumanRole::Civilian,
                position: state.position,
                hp: SHOUT_HP,
                damage: 0,
                buriedness: 1,
            });
        }
    }
    true
}

/// Drops blockades believed at the agent's own location that it did not
/// see this tick; standing there, it would have.
fn prune_unseen_blockades(state: &mut CoordinationState, perceived: &BTreeSet<EntityId>) -> usize {
    let stale: Vec<EntityId> = state
        .belief
        .blockades_on(state.position)
        .map(|blockade| blockade.id)
        .filter(|id| !perceived.contains(id))
        .collect();
    for id in &stale {
        state.belief.remove(*id);
    }
    stale.len()
}
