use fleet_pathing::Sector;
use fleet_world::{Adjacency, EntityId, Fieryness, LocationGraph, LocationKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AgentConfig, ClassWeights, FirePriority, ScoringConfig},
    state::CoordinationState,
};

/// Kind of task, which picks its weights and urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    /// A believed blockade.
    Blockade,
    /// A believed victim.
    Victim,
    /// A burning building.
    Fire,
    /// A building entrance still to be cleared.
    Entrance,
    /// A refuge entrance still to be cleared.
    Refuge,
}

/// Class of `task` and the location it has to be worked at.
#[must_use]
pub fn classify(
    state: &CoordinationState,
    graph: &LocationGraph,
    task: EntityId,
) -> Option<(TaskClass, EntityId)> {
    if let Some(blockade) = state.belief.blockade(task) {
        return Some((TaskClass::Blockade, blockade.road));
    }
    if let Some(human) = state.belief.human(task) {
        return Some((TaskClass::Victim, human.position));
    }
    if let Some(building) = state.belief.building(task) {
        return building
            .fieryness
            .is_on_fire()
            .then_some((TaskClass::Fire, task));
    }
    if state.pending_entrances.contains(&task) {
        let fronts_refuge = graph
            .neighbours(task)
            .iter()
            .any(|id| graph.kind(*id) == Some(LocationKind::Refuge));
        let class = if fronts_refuge {
            TaskClass::Refuge
        } else {
            TaskClass::Entrance
        };
        return Some((class, task));
    }
    None
}

const fn weights(scoring: &ScoringConfig, class: TaskClass) -> ClassWeights {
    match class {
        TaskClass::Blockade => scoring.blockade,
        TaskClass::Victim => scoring.victim,
        TaskClass::Fire => scoring.fire,
        TaskClass::Entrance => scoring.entrance,
        TaskClass::Refuge => scoring.refuge,
    }
}

const fn fire_urgency(table: &FirePriority, fieryness: Fieryness) -> f64 {
    match fieryness {
        Fieryness::Heating => table.heating,
        Fieryness::Burning => table.burning,
        Fieryness::Inferno => table.inferno,
        _ => 0.0,
    }
}

/// Importance of `task` for this agent; `None` when the task cannot be
/// located.
///
/// `base + urgency_weight * urgency - distance / distance_divisor`, plus
/// location and sector bonuses, minus a penalty per ineffective attempt.
#[must_use]
pub fn importance(
    state: &CoordinationState,
    graph: &LocationGraph,
    sector: Option<&Sector>,
    scoring: &ScoringConfig,
    agent: &AgentConfig,
    task: EntityId,
) -> Option<f64> {
    let (class, location) = classify(state, graph, task)?;
    let distance = graph.distance(state.position, location)?;
    let weights = weights(scoring, class);

    let urgency = match class {
        TaskClass::Blockade => state
            .belief
            .blockade(task)
            .map_or(0.0, |blockade| f64::from(blockade.repair_cost)),
        TaskClass::Victim => state
            .belief
            .human(task)
            .map_or(0.0, |human| 200.0 - f64::from(human.buriedness)),
        TaskClass::Fire => state.belief.building(task).map_or(0.0, |building| {
            fire_urgency(&scoring.fire_priority, building.fieryness)
        }),
        TaskClass::Entrance | TaskClass::Refuge => 1.0,
    };

    let mut score =
        weights.base + weights.urgency_weight * urgency - distance / weights.distance_divisor;

    let same_location = location == state.position;
    let on_entrance = graph.is_entrance(location);
    if same_location {
        score += scoring.same_location_bonus;
    }
    if on_entrance {
        score += scoring.entrance_bonus;
    }
    if same_location && on_entrance {
        score += scoring.same_location_entrance_bonus;
    }
    if sector.is_some_and(|sector| sector.contains(location)) {
        score += scoring.sector_bonus;
    }
    if class == TaskClass::Victim {
        let savable = state
            .belief
            .human(task)
            .and_then(fleet_world::Human::ticks_to_live)
            .map_or(true, |ttl| f64::from(ttl) >= distance / f64::from(agent.travel_speed));
        if savable {
            score += scoring.savable_bonus;
        }
    }
    let attempts = state.attempts.get(&task).copied().unwrap_or(0);
    score -= f64::from(attempts) * scoring.ineffective_penalty;
    Some(score)
}
