use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
};

use fleet_world::{Adjacency, EntityId, LocationGraph};
use rand::{seq::SliceRandom, Rng};

use crate::{blocked::BlockedTransitions, path::Path, sectors::Sector};

/// Path search over the location graph, optionally restricted to a sector
/// and optionally avoiding recently blocked transitions.
#[derive(Debug, Clone, Copy)]
pub struct Router<'a> {
    graph: &'a LocationGraph,
    scope: Option<&'a Sector>,
    blocked: Option<&'a BlockedTransitions>,
}

impl<'a> Router<'a> {
    /// Unrestricted search over the whole graph.
    #[must_use]
    pub const fn new(graph: &'a LocationGraph) -> Self {
        Self {
            graph,
            scope: None,
            blocked: None,
        }
    }

    /// Restricts search to the induced sub-graph of a sector.
    #[must_use]
    pub const fn within(mut self, sector: &'a Sector) -> Self {
        self.scope = Some(sector);
        self
    }

    /// Treats remembered blocked transitions as missing edges.
    #[must_use]
    pub const fn avoiding(mut self, blocked: &'a BlockedTransitions) -> Self {
        self.blocked = Some(blocked);
        self
    }

    fn contains(&self, id: EntityId) -> bool {
        match self.scope {
            Some(sector) => sector.contains(id),
            None => self.graph.contains(id),
        }
    }

    fn neighbours(&self, id: EntityId) -> &'a [EntityId] {
        match self.scope {
            Some(sector) => sector.neighbours(id),
            None => self.graph.neighbours(id),
        }
    }

    fn passable(&self, from: EntityId, to: EntityId) -> bool {
        self.blocked
            .map_or(true, |blocked| !blocked.is_blocked(from, to))
    }

    /// Fewest-hops path from `start` to the nearest of `goals`.
    ///
    /// Neighbour order is shuffled with `rng` so equally short routes are
    /// picked differently from call to call.
    pub fn breadth_first<R: Rng + ?Sized>(
        &self,
        start: EntityId,
        goals: &[EntityId],
        rng: &mut R,
    ) -> Option<Path> {
        if !self.contains(start) {
            return None;
        }
        let goals: HashSet<EntityId> = goals.iter().copied().collect();
        if goals.contains(&start) {
            return Some(Path::at(start));
        }
        let mut parents: HashMap<EntityId, EntityId> = HashMap::new();
        let mut frontier = VecDeque::from([start]);
        let mut order = Vec::new();
        while let Some(current) = frontier.pop_front() {
            order.clear();
            order.extend_from_slice(self.neighbours(current));
            order.shuffle(rng);
            for &next in &order {
                if next == start || parents.contains_key(&next) || !self.passable(current, next)
                {
                    continue;
                }
                parents.insert(next, current);
                if goals.contains(&next) {
                    return rebuild(&parents, start, next);
                }
                frontier.push_back(next);
            }
        }
        tracing::trace!(%start, goals = goals.len(), "no path");
        None
    }

    /// Shortest path by accumulated centre-to-centre distance.
    ///
    /// The heuristic is the straight-line distance to the nearest goal.
    #[must_use]
    pub fn a_star(&self, start: EntityId, goals: &[EntityId]) -> Option<Path> {
        if !self.contains(start) {
            return None;
        }
        let targets: Vec<_> = goals
            .iter()
            .filter_map(|id| self.graph.center(*id).map(|center| (*id, center)))
            .collect();
        let heuristic = |id: EntityId| {
            self.graph.center(id).map_or(0.0, |here| {
                targets
                    .iter()
                    .map(|(_, goal)| here.distance(*goal))
                    .fold(f64::INFINITY, f64::min)
            })
        };
        let mut best: HashMap<EntityId, f64> = HashMap::from([(start, 0.0)]);
        let mut parents: HashMap<EntityId, EntityId> = HashMap::new();
        let mut closed: HashSet<EntityId> = HashSet::new();
        let mut open = BinaryHeap::from([Frontier {
            estimate: heuristic(start),
            cost: 0.0,
            id: start,
        }]);
        while let Some(Frontier { cost, id, .. }) = open.pop() {
            if !closed.insert(id) {
                continue;
            }
            if targets.iter().any(|(goal, _)| *goal == id) {
                return rebuild(&parents, start, id);
            }
            for &next in self.neighbours(id) {
                if closed.contains(&next) || !self.passable(id, next) {
                    continue;
                }
                let step = self.graph.distance(id, next).unwrap_or(0.0);
                let candidate = cost + step;
                if best.get(&next).is_some_and(|known| *known <= candidate) {
                    continue;
                }
                best.insert(next, candidate);
                parents.insert(next, id);
                open.push(Frontier {
                    estimate: candidate + heuristic(next),
                    cost: candidate,
                    id: next,
                });
            }
        }
        None
    }
}

fn rebuild(
    parents: &HashMap<EntityId, EntityId>,
    start: EntityId,
    goal: EntityId,
) -> Option<Path> {
    let mut steps = vec![goal];
    let mut current = goal;
    while current != start {
        match parents.get(&current) {
            Some(parent) => {
                current = *parent;
                steps.push(current);
            }
            None => break,
        }
    }
    steps.reverse();
    Path::new(steps)
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    estimate: f64,
    cost: f64,
    id: EntityId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // Min-heap on estimate, then on id for determinism.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.id.cmp(&self.id))
    }
}
