use std::collections::{BTreeMap, BTreeSet};

use fleet_codec::Parameter;
use fleet_pathing::BlockedTransitions;
use fleet_world::{BeliefStore, EntityId, HumanRole};
use serde::{Deserialize, Serialize};

use crate::tasks::TaskTable;

/// Which kind of work an agent competes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetRole {
    /// Clears blockades and building entrances.
    Clearing,
    /// Digs out and carries victims.
    Rescue,
    /// Fights fires.
    Suppression,
}

impl FleetRole {
    /// Human role an agent of this kind has on the map.
    #[must_use]
    pub const fn human_role(self) -> HumanRole {
        match self {
            Self::Clearing => HumanRole::Clearing,
            Self::Rescue => HumanRole::Rescue,
            Self::Suppression => HumanRole::Suppression,
        }
    }
}

/// Facts the team is believed to already share.
///
/// An entity enters a set when this agent reports it (or hears it) and
/// leaves when its resolution is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFacts {
    /// Buildings known to be burning.
    pub fires: BTreeSet<EntityId>,
    /// Blockades known to exist.
    pub blockades: BTreeSet<EntityId>,
    /// Humans known to need help.
    pub victims: BTreeSet<EntityId>,
}

/// Everything the coordination core keeps between ticks for one agent.
#[derive(Debug, Clone)]
pub struct CoordinationState {
    /// This agent.
    pub agent: EntityId,
    /// Kind of work this agent competes for.
    pub role: FleetRole,
    /// Current simulation tick.
    pub tick: u32,
    /// Location the agent stands in.
    pub position: EntityId,
    /// Local belief.
    pub belief: BeliefStore,
    /// Facts already shared with the team.
    pub known: KnownFacts,
    /// Replicated claim table.
    pub tasks: TaskTable,
    /// Task currently claimed.
    pub target: Option<EntityId>,
    /// Task released during this tick; never re-picked in the same tick.
    pub dropped: Option<EntityId>,
    /// Entrances this agent still has to clear.
    pub pending_entrances: BTreeSet<EntityId>,
    /// Entrances reported cleared by anyone.
    pub cleared_entrances: BTreeSet<EntityId>,
    /// Ineffective attempts per task.
    pub attempts: BTreeMap<EntityId, u32>,
    /// Transitions that recently failed.
    pub blocked: BlockedTransitions,
    /// Consecutive ticks spent moving without changing location.
    pub stationary_ticks: u32,
    /// First hop of the last issued move, if the last command was a move.
    pub planned_step: Option<(EntityId, EntityId)>,
    /// Task bookkeeping waiting for the next report.
    pub outbox: Vec<Parameter>,
    /// Tick the current claim was last announced.
    pub last_announced: Option<u32>,
}

impl CoordinationState {
    /// Fresh state for an agent standing at `position`.
    #[must_use]
    pub fn new(agent: EntityId, role: FleetRole, position: EntityId, blocked_window: u32) -> Self {
        Self {
            agent,
            role,
            tick: 0,
            position,
            belief: BeliefStore::new(),
            known: KnownFacts::default(),
            tasks: TaskTable::default(),
            target: None,
            dropped: None,
            pending_entrances: BTreeSet::new(),
            cleared_entrances: BTreeSet::new(),
            attempts: BTreeMap::new(),
            blocked: BlockedTransitions::new(blocked_window),
            stationary_ticks: 0,
            planned_step: None,
            outbox: Vec::new(),
            last_announced: None,
        }
    }

    /// Opens a new tick: detects lack of progress and ages blocked memory.
    ///
    /// `position` is where perception says the agent now stands.
    pub fn begin_tick(&mut self, tick: u32, position: EntityId) {
        self.tick = tick;
        self.dropped = None;
        match self.planned_step.take() {
            Some((from, next)) if position == self.position => {
                self.stationary_ticks += 1;
                self.blocked.record(tick, from, next);
            }
            _ => self.stationary_ticks = 0,
        }
        self.blocked.advance(tick);
        self.position = position;
    }

    /// Remembers that the last move was along `from -> next`.
    pub fn note_move(&mut self, from: EntityId, next: EntityId) {
        self.planned_step = Some((from, next));
    }

    /// Counts an attempt on `task` that changed nothing.
    pub fn note_ineffective(&mut self, task: EntityId) {
        *self.attempts.entry(task).or_default() += 1;
    }

    /// Queues a task bookkeeping fact for the next report.
    pub fn queue(&mut self, parameter: Parameter) {
        self.outbox.push(parameter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standing_still_after_a_move_counts_and_blocks() {
        let mut state = CoordinationState::new(EntityId(1), FleetRole::Rescue, EntityId(10), 5);
        state.note_move(EntityId(10), EntityId(11));
        state.begin_tick(2, EntityId(10));
        assert_eq!(state.stationary_ticks, 1);
        assert!(state.blocked.is_blocked(EntityId(10), EntityId(11)));

        state.note_move(EntityId(10), EntityId(11));
        state.begin_tick(3, EntityId(11));
        assert_eq!(state.stationary_ticks, 0);
        assert_eq!(state.position, EntityId(11));
    }

    #[test]
    fn resting_never_counts_as_stuck() {
        let mut state = CoordinationState::new(EntityId(1), FleetRole::Rescue, EntityId(10), 5);
        state.begin_tick(2, EntityId(10));
        state.begin_tick(3, EntityId(10));
        assert_eq!(state.stationary_ticks, 0);
        assert!(state.blocked.is_empty());
    }
}
