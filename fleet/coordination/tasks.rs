use std::collections::BTreeSet;

use fleet_codec::Parameter;
use fleet_pathing::Sector;
use fleet_world::{EntityId, Human, HumanRole, LocationGraph, LocationKind};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    config::CoordinationConfig,
    scoring::importance,
    state::{CoordinationState, FleetRole},
};

static NO_CLAIMANTS: BTreeSet<EntityId> = BTreeSet::new();

/// Replicated record of which agents claim which task.
///
/// Every agent keeps its own copy; copies converge through pickup and drop
/// reports, never through locking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskTable {
    entries: IndexMap<EntityId, BTreeSet<EntityId>>,
}

impl TaskTable {
    /// Adds a task with no claimants; returns whether it was new.
    pub fn ensure(&mut self, task: EntityId) -> bool {
        if self.entries.contains_key(&task) {
            return false;
        }
        self.entries.insert(task, BTreeSet::new());
        true
    }

    /// Keeps only the listed tasks; returns how many were pruned.
    pub fn retain(&mut self, live: &BTreeSet<EntityId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|task, _| live.contains(task));
        before - self.entries.len()
    }

    /// Whether a task is tracked.
    #[must_use]
    pub fn contains(&self, task: EntityId) -> bool {
        self.entries.contains_key(&task)
    }

    /// Current claimants of a task.
    #[must_use]
    pub fn claimants(&self, task: EntityId) -> &BTreeSet<EntityId> {
        self.entries.get(&task).unwrap_or(&NO_CLAIMANTS)
    }

    /// Moves `agent` onto `task`, removing it from every other entry.
    ///
    /// Returns `false`, leaving the agent unassigned, if the task is unknown.
    pub fn claim(&mut self, agent: EntityId, task: EntityId) -> bool {
        self.release_all(agent);
        match self.entries.get_mut(&task) {
            Some(claimants) => {
                claimants.insert(agent);
                true
            }
            None => false,
        }
    }

    /// Removes `agent` from one task.
    pub fn release(&mut self, agent: EntityId, task: EntityId) -> bool {
        self.entries
            .get_mut(&task)
            .is_some_and(|claimants| claimants.remove(&agent))
    }

    /// Removes `agent` from every task.
    pub fn release_all(&mut self, agent: EntityId) {
        for claimants in self.entries.values_mut() {
            claimants.remove(&agent);
        }
    }

    /// Claimants of `task` with an identifier below `agent`.
    #[must_use]
    pub fn lower_claimants(&self, task: EntityId, agent: EntityId) -> usize {
        self.claimants(task).range(..agent).count()
    }

    /// Task `agent` currently appears on, if any.
    #[must_use]
    pub fn claimed_by(&self, agent: EntityId) -> Option<EntityId> {
        self.entries
            .iter()
            .find(|(_, claimants)| claimants.contains(&agent))
            .map(|(task, _)| *task)
    }

    /// Tracked tasks in discovery order.
    pub fn tasks(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.keys().copied()
    }

    /// Number of tracked tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no task is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a claim was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The task left belief.
    Vanished,
    /// The agent could not make progress towards it.
    Blocked,
    /// Enough lower-id peers claim it.
    Contested,
}

/// Alive, and buried or a civilian inside a non-refuge building.
#[must_use]
pub fn is_victim(graph: &LocationGraph, human: &Human) -> bool {
    human.is_alive()
        && (human.is_buried()
            || (human.role == HumanRole::Civilian
                && graph.kind(human.position) == Some(LocationKind::Building)))
}

/// Task identifiers this agent's role competes for, from current belief.
#[must_use]
pub fn task_candidates(state: &CoordinationState, graph: &LocationGraph) -> BTreeSet<EntityId> {
    match state.role {
        FleetRole::Clearing => state
            .belief
            .blockades()
            .map(|blockade| blockade.id)
            .chain(
                state
                    .pending_entrances
                    .difference(&state.cleared_entrances)
                    .copied(),
            )
            .collect(),
        FleetRole::Rescue => state
            .belief
            .humans()
            .filter(|human| human.id != state.agent && is_victim(graph, human))
            .map(|human| human.id)
            .collect(),
        FleetRole::Suppression => state
            .belief
            .buildings()
            .filter(|building| building.fieryness.is_on_fire())
            .map(|building| building.id)
            .collect(),
    }
}

/// Syncs the task table with belief: stale entries go, new ones arrive
/// unclaimed.
pub fn refresh_tasks(state: &mut CoordinationState, graph: &LocationGraph) {
    let live = task_candidates(state, graph);
    let pruned = state.tasks.retain(&live);
    let mut added = 0;
    for task in live {
        if state.tasks.ensure(task) {
            added += 1;
        }
    }
    tracing::trace!(
        agent = %state.agent,
        pruned,
        added,
        total = state.tasks.len(),
        "tasks refreshed"
    );
}

/// Decides whether the current claim has to go.
#[must_use]
pub fn evaluate_drop(state: &CoordinationState, config: &CoordinationConfig) -> Option<DropReason> {
    let target = state.target?;
    if !state.tasks.contains(target) {
        return Some(DropReason::Vanished);
    }
    if state.stationary_ticks > config.agent.blocked_retry_ticks {
        return Some(DropReason::Blocked);
    }
    if state.tasks.lower_claimants(target, state.agent) >= config.agent.max_lower_claimants {
        return Some(DropReason::Contested);
    }
    None
}

/// Releases the current claim and queues a drop report, so peers stop
/// counting this agent as a claimant.
pub fn drop_task(state: &mut CoordinationState, reason: DropReason) -> Option<EntityId> {
    let target = state.target.take()?;
    state.tasks.release(state.agent, target);
    state.dropped = Some(target);
    state.last_announced = None;
    if reason == DropReason::Blocked {
        state.note_ineffective(target);
        state.stationary_ticks = 0;
    }
    state.queue(Parameter::TaskDrop(target));
    tracing::debug!(agent = %state.agent, task = %target, ?reason, "task dropped");
    Some(target)
}

/// Highest-scoring claimable task above the floor; ties go to the lower id.
///
/// Tasks dropped this tick and tasks already held by enough lower-id peers
/// are skipped.
#[must_use]
pub fn select_task(
    state: &CoordinationState,
    graph: &LocationGraph,
    sector: Option<&Sector>,
    config: &CoordinationConfig,
) -> Option<EntityId> {
    let mut best: Option<(EntityId, f64)> = None;
    for task in state.tasks.tasks() {
        if state.dropped == Some(task)
            || state.tasks.lower_claimants(task, state.agent) >= config.agent.max_lower_claimants
        {
            continue;
        }
        let Some(score) = importance(state, graph, sector, &config.scoring, &config.agent, task)
        else {
            continue;
        };
        if score <= config.scoring.floor {
            continue;
        }
        best = match best {
            Some((held, held_score))
                if held_score.total_cmp(&score).then(task.cmp(&held)).is_gt() =>
            {
                Some((held, held_score))
            }
            _ => Some((task, score)),
        };
    }
    best.map(|(task, _)| task)
}

/// Makes `task` this agent's claim and queues the pickup report.
pub fn claim_task(state: &mut CoordinationState, task: EntityId) {
    if state.target == Some(task) {
        return;
    }
    state.tasks.claim(state.agent, task);
    state.target = Some(task);
    state.stationary_ticks = 0;
    announce(state, task);
    tracing::debug!(agent = %state.agent, %task, "task claimed");
}

fn announce(state: &mut CoordinationState, task: EntityId) {
    let pickup = Parameter::TaskPickup(task);
    if !state.outbox.contains(&pickup) {
        state.queue(pickup);
    }
    state.last_announced = Some(state.tick);
}

/// One auction round: drop if needed, pick the best task, and re-announce a
/// standing claim once per interval.
pub fn allocate(
    state: &mut CoordinationState,
    graph: &LocationGraph,
    sector: Option<&Sector>,
    config: &CoordinationConfig,
) -> Option<EntityId> {
    if let Some(reason) = evaluate_drop(state, config) {
        drop_task(state, reason);
    }
    if let Some(task) = select_task(state, graph, sector, config) {
        claim_task(state, task);
    }
    if let Some(task) = state.target {
        let due = state.last_announced.map_or(true, |last| {
            state.tick.saturating_sub(last) >= config.agent.reannounce_interval
        });
        if due {
            announce(state, task);
        }
    }
    state.target
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_world::{Blockade, Point};

    fn graph() -> LocationGraph {
        LocationGraph::lattice(4, 1, 1_000).unwrap()
    }

    fn blockade(id: u32, road: u32, repair_cost: u32) -> Blockade {
        Blockade {
            id: EntityId(id),
            road: EntityId(road),
            location: Point::default(),
            repair_cost,
            footprint: None,
        }
    }

    fn clearing(agent: u32) -> CoordinationState {
        CoordinationState::new(EntityId(agent), FleetRole::Clearing, EntityId(1), 15)
    }

    #[test]
    fn claim_moves_agent_between_tasks() {
        let mut table = TaskTable::default();
        table.ensure(EntityId(1));
        table.ensure(EntityId(2));
        assert!(table.claim(EntityId(9), EntityId(1)));
        assert!(table.claim(EntityId(9), EntityId(2)));
        assert!(table.claimants(EntityId(1)).is_empty());
        assert_eq!(table.claimed_by(EntityId(9)), Some(EntityId(2)));
        assert!(!table.claim(EntityId(9), EntityId(3)));
        assert_eq!(table.claimed_by(EntityId(9)), None);
    }

    #[test]
    fn refresh_prunes_and_adds() {
        let graph = graph();
        let mut state = clearing(5);
        state.tasks.ensure(EntityId(77));
        state.belief.upsert(blockade(10, 2, 5));
        state.pending_entrances.insert(EntityId(3));
        state.cleared_entrances.insert(EntityId(3));
        refresh_tasks(&mut state, &graph);
        assert!(!state.tasks.contains(EntityId(77)));
        assert!(state.tasks.contains(EntityId(10)));
        assert!(!state.tasks.contains(EntityId(3)));
    }

    #[test]
    fn selection_prefers_score_then_lower_id() {
        let graph = graph();
        let config = CoordinationConfig::default();
        let mut state = clearing(5);
        state.belief.upsert(blockade(11, 3, 50));
        state.belief.upsert(blockade(10, 3, 50));
        state.belief.upsert(blockade(12, 4, 10));
        refresh_tasks(&mut state, &graph);
        assert_eq!(select_task(&state, &graph, None, &config), Some(EntityId(10)));
    }

    #[test]
    fn selection_skips_tasks_held_by_lower_ids() {
        let graph = graph();
        let config = CoordinationConfig::default();
        let mut state = clearing(5);
        state.belief.upsert(blockade(10, 2, 50));
        state.belief.upsert(blockade(11, 3, 5));
        refresh_tasks(&mut state, &graph);
        state.tasks.claim(EntityId(2), EntityId(10));
        assert_eq!(select_task(&state, &graph, None, &config), Some(EntityId(11)));

        state.tasks.claim(EntityId(8), EntityId(11));
        assert_eq!(select_task(&state, &graph, None, &config), Some(EntityId(11)));
    }

    #[test]
    fn allocate_claims_and_queues_pickup_once() {
        let graph = graph();
        let config = CoordinationConfig::default();
        let mut state = clearing(5);
        state.belief.upsert(blockade(10, 2, 50));
        refresh_tasks(&mut state, &graph);
        assert_eq!(allocate(&mut state, &graph, None, &config), Some(EntityId(10)));
        assert_eq!(state.outbox, vec![Parameter::TaskPickup(EntityId(10))]);
        assert!(state.tasks.claimants(EntityId(10)).contains(&EntityId(5)));

        state.outbox.clear();
        state.tick = 1;
        allocate(&mut state, &graph, None, &config);
        assert!(state.outbox.is_empty());

        state.tick = config.agent.reannounce_interval;
        allocate(&mut state, &graph, None, &config);
        assert_eq!(state.outbox, vec![Parameter::TaskPickup(EntityId(10))]);
    }

    #[test]
    fn contested_claim_is_dropped_and_reported() {
        let graph = graph();
        let config = CoordinationConfig::default();
        let mut state = clearing(5);
        state.belief.upsert(blockade(10, 2, 50));
        refresh_tasks(&mut state, &graph);
        allocate(&mut state, &graph, None, &config);
        state.outbox.clear();

        state.tasks.claim(EntityId(3), EntityId(10));
        assert_eq!(evaluate_drop(&state, &config), Some(DropReason::Contested));
        assert_eq!(allocate(&mut state, &graph, None, &config), None);
        assert_eq!(state.outbox, vec![Parameter::TaskDrop(EntityId(10))]);
        assert_eq!(state.dropped, Some(EntityId(10)));
    }

    #[test]
    fn being_stuck_drops_with_a_penalty() {
        let graph = graph();
        let config = CoordinationConfig::default();
        let mut state = clearing(5);
        state.belief.upsert(blockade(10, 4, 50));
        refresh_tasks(&mut state, &graph);
        allocate(&mut state, &graph, None, &config);
        state.stationary_ticks = config.agent.blocked_retry_ticks + 1;
        assert_eq!(evaluate_drop(&state, &config), Some(DropReason::Blocked));
        drop_task(&mut state, DropReason::Blocked);
        assert_eq!(state.attempts.get(&EntityId(10)), Some(&1));
        assert_eq!(state.stationary_ticks, 0);
    }

    #[test]
    fn vanished_task_drop_is_reported() {
        let graph = graph();
        let config = CoordinationConfig::default();
        let mut state = clearing(5);
        state.belief.upsert(blockade(10, 2, 50));
        refresh_tasks(&mut state, &graph);
        allocate(&mut state, &graph, None, &config);
        state.outbox.clear();

        state.belief.remove(EntityId(10));
        refresh_tasks(&mut state, &graph);
        assert_eq!(allocate(&mut state, &graph, None, &config), None);
        assert_eq!(state.outbox, vec![Parameter::TaskDrop(EntityId(10))]);
        assert_eq!(state.attempts.get(&EntityId(10)), None);
    }

    #[test]
    fn victims_are_alive_and_buried_or_sheltering_civilians() {
        let graph = fleet_world::LocationGraph::new(vec![
            fleet_world::Location::new(1, LocationKind::Road, Point::new(0, 0), [2, 3]),
            fleet_world::Location::new(2, LocationKind::Building, Point::new(0, 9), []),
            fleet_world::Location::new(3, LocationKind::Refuge, Point::new(9, 0), []),
        ])
        .unwrap();
        let mut human = Human {
            id: EntityId(50),
            role: HumanRole::Civilian,
            position: EntityId(2),
            hp: 100,
            damage: 0,
            buriedness: 0,
        };
        assert!(is_victim(&graph, &human));
        human.position = EntityId(3);
        assert!(!is_victim(&graph, &human));
        human.buriedness = 5;
        assert!(is_victim(&graph, &human));
        human.hp = 0;
        assert!(!is_victim(&graph, &human));
    }
}
