use std::collections::BTreeSet;

use fleet_world::{Adjacency, EntityId};
use rand::{seq::IteratorRandom, Rng};

use crate::path::Path;

/// Short wander from `start` that never revisits a location and never
/// enters one listed in `avoid`.
///
/// Stops early when boxed in; the result always holds at least `start`.
pub fn random_walk<A, R>(
    graph: &A,
    start: EntityId,
    length: usize,
    avoid: &BTreeSet<EntityId>,
    rng: &mut R,
) -> Path
where
    A: Adjacency + ?Sized,
    R: Rng + ?Sized,
{
    let mut path = Path::at(start);
    let mut visited = BTreeSet::from([start]);
    let mut current = start;
    while path.hops() < length {
        let Some(next) = graph
            .neighbours(current)
            .iter()
            .copied()
            .filter(|id| !visited.contains(id) && !avoid.contains(id))
            .choose(rng)
        else {
            break;
        };
        visited.insert(next);
        path.push(next);
        current = next;
    }
    path
}
