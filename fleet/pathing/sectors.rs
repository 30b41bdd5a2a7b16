use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fleet_world::{Adjacency, EntityId, LocationGraph};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::SectorError;

/// Splits `n` into `(small, large)` with `small * large == n`, `small` being
/// the largest divisor not above `sqrt(n)`.
#[must_use]
pub fn factorize(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let root = (1..=n).take_while(|d| *d <= n / *d).count();
    let small = (1..=root).rev().find(|d| n % d == 0).unwrap_or(1);
    (small, n / small)
}

/// Sector count for a team of `agents`: half the team, nudged down when
/// that lands on a prime above three so the grid does not degenerate into
/// a single strip.
#[must_use]
pub fn suggested_division_count(agents: usize) -> usize {
    let count = (agents / 2).max(1);
    if count > 3 && is_prime(count) {
        count - 1
    } else {
        count
    }
}

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

/// One static region of the map.
#[derive(Debug, Clone, Serialize)]
pub struct Sector {
    index: usize,
    adjacency: BTreeMap<EntityId, Vec<EntityId>>,
}

impl Sector {
    /// Position of this sector in the partition.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Whether the sector holds no location.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Member locations in ascending order.
    pub fn locations(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.adjacency.keys().copied()
    }
}

impl Adjacency for Sector {
    fn contains(&self, id: EntityId) -> bool {
        self.adjacency.contains_key(&id)
    }

    fn neighbours(&self, id: EntityId) -> &[EntityId] {
        self.adjacency.get(&id).map_or(&[], Vec::as_slice)
    }
}

/// Complete, disjoint partition of the location graph.
#[derive(Debug, Clone, Serialize)]
pub struct Sectorization {
    sectors: Vec<Sector>,
    owner: IndexMap<EntityId, usize>,
}

impl Sectorization {
    /// Partitions `graph` into roughly `divisions` contiguous regions.
    ///
    /// The bounding box is cut into a grid shaped like the map; each cell
    /// keeps its largest connected piece and the leftover pieces are handed,
    /// whole, to the smallest adjacent sector. Cells that end up empty are
    /// dropped, so fewer sectors than requested may come back.
    pub fn compute(graph: &LocationGraph, divisions: usize) -> Result<Self, SectorError> {
        if divisions == 0 {
            return Err(SectorError::ZeroDivisions);
        }
        if graph.is_empty() {
            return Err(SectorError::EmptyGraph);
        }
        let cells = grid_cells(graph, divisions);

        let mut members: Vec<BTreeSet<EntityId>> = Vec::new();
        let mut owner: IndexMap<EntityId, usize> = IndexMap::new();
        let mut orphans: VecDeque<BTreeSet<EntityId>> = VecDeque::new();
        for cell in cells.into_values() {
            let mut components = components_within(graph, &cell);
            let Some(native) = largest(&components) else {
                continue;
            };
            let index = members.len();
            let native = components.remove(native);
            for id in &native {
                owner.insert(*id, index);
            }
            members.push(native);
            orphans.extend(components);
        }

        while !orphans.is_empty() {
            let mut progressed = false;
            for _ in 0..orphans.len() {
                let Some(orphan) = orphans.pop_front() else {
                    break;
                };
                let target = orphan
                    .iter()
                    .flat_map(|id| graph.neighbours(*id))
                    .filter_map(|id| owner.get(id).copied())
                    .min_by_key(|index| (members[*index].len(), *index));
                match target {
                    Some(index) => {
                        tracing::trace!(sector = index, size = orphan.len(), "orphan reassigned");
                        for id in &orphan {
                            owner.insert(*id, index);
                        }
                        members[index].extend(orphan);
                        progressed = true;
                    }
                    None => orphans.push_back(orphan),
                }
            }
            if !progressed {
                // Nothing left touches an owned location: the graph is
                // disconnected. Hand one piece to the smallest sector.
                if let (Some(orphan), Some(index)) = (
                    orphans.pop_front(),
                    (0..members.len()).min_by_key(|index| (members[*index].len(), *index)),
                ) {
                    tracing::warn!(sector = index, size = orphan.len(), "detached orphan");
                    for id in &orphan {
                        owner.insert(*id, index);
                    }
                    members[index].extend(orphan);
                }
            }
        }

        let sectors = members
            .into_iter()
            .enumerate()
            .map(|(index, set)| Sector {
                index,
                adjacency: set
                    .iter()
                    .map(|id| {
                        let inside = graph
                            .neighbours(*id)
                            .iter()
                            .copied()
                            .filter(|n| set.contains(n))
                            .collect();
                        (*id, inside)
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        owner.sort_keys();
        tracing::debug!(requested = divisions, built = sectors.len(), "map sectorized");
        Ok(Self { sectors, owner })
    }

    /// Number of sectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Whether the partition is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// All sectors, by index.
    #[must_use]
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Sector by index.
    #[must_use]
    pub fn sector(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    /// Index of the sector holding a location.
    #[must_use]
    pub fn sector_of(&self, location: EntityId) -> Option<usize> {
        self.owner.get(&location).copied()
    }

    /// Sector index for the agent of 1-based `rank` among `agents` peers.
    ///
    /// The first ranks get one sector each; any further agents are spread
    /// over sectors in proportion to their share of locations.
    pub fn index_for_rank(&self, rank: usize, agents: usize) -> Result<usize, SectorError> {
        if rank == 0 || rank > agents {
            return Err(SectorError::RankOutOfRange { rank, agents });
        }
        let count = self.sectors.len();
        if rank <= count {
            return Ok(rank - 1);
        }
        let position = rank - count;
        let extra = agents - count;
        let total: usize = self.sectors.iter().map(Sector::len).sum();
        let mut cumulative = 0;
        for sector in &self.sectors {
            cumulative += sector.len();
            if position * total <= cumulative * extra {
                return Ok(sector.index);
            }
        }
        Ok(count - 1)
    }

    /// Sector owned by `agent`, ranking the roster by ascending id.
    pub fn assign(&self, agent: EntityId, roster: &[EntityId]) -> Result<&Sector, SectorError> {
        let ranked: BTreeSet<EntityId> = roster.iter().copied().collect();
        let rank = ranked
            .iter()
            .position(|id| *id == agent)
            .ok_or(SectorError::UnknownAgent(agent))?
            + 1;
        let index = self.index_for_rank(rank, ranked.len())?;
        self.sectors
            .get(index)
            .ok_or(SectorError::RankOutOfRange {
                rank,
                agents: ranked.len(),
            })
    }
}

/// Buckets location ids into grid cells keyed by row-major cell index.
fn grid_cells(graph: &LocationGraph, divisions: usize) -> BTreeMap<usize, BTreeSet<EntityId>> {
    let centers: Vec<_> = graph.locations().map(|l| (l.id, l.center)).collect();
    let min_x = centers.iter().map(|(_, c)| c.x).min().unwrap_or(0);
    let max_x = centers.iter().map(|(_, c)| c.x).max().unwrap_or(0);
    let min_y = centers.iter().map(|(_, c)| c.y).min().unwrap_or(0);
    let max_y = centers.iter().map(|(_, c)| c.y).max().unwrap_or(0);
    let width = i64::from(max_x) - i64::from(min_x);
    let height = i64::from(max_y) - i64::from(min_y);
    let (small, large) = factorize(divisions);
    let (cols, rows) = if width < height {
        (small, large)
    } else {
        (large, small)
    };

    let bucket = |offset: i64, extent: i64, parts: usize| -> usize {
        if extent <= 0 {
            return 0;
        }
        let parts_i = i64::try_from(parts).unwrap_or(i64::MAX);
        let raw = (offset * parts_i / extent).clamp(0, parts_i - 1);
        usize::try_from(raw).unwrap_or(0)
    };

    let mut cells: BTreeMap<usize, BTreeSet<EntityId>> = BTreeMap::new();
    for (id, center) in centers {
        let col = bucket(i64::from(center.x) - i64::from(min_x), width, cols);
        let row = bucket(i64::from(center.y) - i64::from(min_y), height, rows);
        cells.entry(row * cols + col).or_default().insert(id);
    }
    cells
}

/// Connected pieces of `cell`, discovered in ascending id order.
fn components_within(graph: &LocationGraph, cell: &BTreeSet<EntityId>) -> Vec<BTreeSet<EntityId>> {
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();
    for &seed in cell {
        if !seen.insert(seed) {
            continue;
        }
        let mut component = BTreeSet::from([seed]);
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            for &next in graph.neighbours(current) {
                if cell.contains(&next) && seen.insert(next) {
                    component.insert(next);
                    queue.push_back(next);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Index of the biggest component; the earliest wins ties.
fn largest(components: &[BTreeSet<EntityId>]) -> Option<usize> {
    components
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, component)| component.len())
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_world::{Location, LocationKind, Point};

    #[test]
    fn factorization_prefers_square_grids() {
        assert_eq!(factorize(6), (2, 3));
        assert_eq!(factorize(9), (3, 3));
        assert_eq!(factorize(7), (1, 7));
        assert_eq!(factorize(1), (1, 1));
        assert_eq!(factorize(12), (3, 4));
        assert_eq!(factorize(16), (4, 4));
    }

    #[test]
    fn division_heuristic_avoids_large_primes() {
        assert_eq!(suggested_division_count(1), 1);
        assert_eq!(suggested_division_count(6), 3);
        assert_eq!(suggested_division_count(10), 4);
        assert_eq!(suggested_division_count(14), 6);
        assert_eq!(suggested_division_count(24), 12);
    }

    #[test]
    fn eighteen_locations_split_into_six_threes() {
        let graph = LocationGraph::lattice(9, 2, 10).unwrap();
        let partition = Sectorization::compute(&graph, 6).unwrap();
        assert_eq!(partition.len(), 6);
        for sector in partition.sectors() {
            assert_eq!(sector.len(), 3);
        }
        assert_eq!(partition.sector_of(EntityId(1)), Some(0));
        assert_eq!(partition.sector_of(EntityId(18)), Some(5));
    }

    #[test]
    fn induced_adjacency_stays_inside() {
        let graph = LocationGraph::lattice(9, 2, 10).unwrap();
        let partition = Sectorization::compute(&graph, 6).unwrap();
        let first = partition.sector(0).unwrap();
        assert_eq!(first.neighbours(EntityId(3)), &[EntityId(2)]);
        assert!(first.neighbours(EntityId(4)).is_empty());
    }

    #[test]
    fn orphans_join_the_smallest_adjacent_sector() {
        // Two cells side by side. Location 3 sits in the left cell but only
        // connects to the right one, so it is an orphan.
        let graph = LocationGraph::new(vec![
            Location::new(1, LocationKind::Road, Point::new(0, 0), [2]),
            Location::new(2, LocationKind::Road, Point::new(0, 10), []),
            Location::new(3, LocationKind::Building, Point::new(10, 5), [4]),
            Location::new(4, LocationKind::Road, Point::new(30, 0), [5]),
            Location::new(5, LocationKind::Road, Point::new(30, 10), []),
        ])
        .unwrap();
        let partition = Sectorization::compute(&graph, 2).unwrap();
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.sector_of(EntityId(3)), partition.sector_of(EntityId(4)));
        let total: usize = partition.sectors().iter().map(Sector::len).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn disconnected_graph_is_still_covered() {
        let graph = LocationGraph::new(vec![
            Location::new(1, LocationKind::Road, Point::new(0, 0), [2]),
            Location::new(2, LocationKind::Road, Point::new(5, 0), []),
            Location::new(3, LocationKind::Road, Point::new(8, 0), []),
        ])
        .unwrap();
        let partition = Sectorization::compute(&graph, 1).unwrap();
        assert_eq!(partition.sector(0).unwrap().len(), 3);
    }

    #[test]
    fn extra_agents_share_sectors_by_size() {
        let graph = LocationGraph::lattice(9, 2, 10).unwrap();
        let partition = Sectorization::compute(&graph, 2).unwrap();
        assert_eq!(partition.index_for_rank(1, 4), Ok(0));
        assert_eq!(partition.index_for_rank(2, 4), Ok(1));
        // Left sector holds 8 locations, right 10: the larger one absorbs
        // both extra agents.
        assert_eq!(partition.sector(0).unwrap().len(), 8);
        assert_eq!(partition.index_for_rank(3, 4), Ok(1));
        assert_eq!(partition.index_for_rank(4, 4), Ok(1));
        assert_eq!(partition.index_for_rank(3, 6), Ok(0));
        assert_eq!(
            partition.index_for_rank(5, 4),
            Err(SectorError::RankOutOfRange { rank: 5, agents: 4 })
        );
    }

    #[test]
    fn assignment_ranks_by_ascending_id() {
        let graph = LocationGraph::lattice(9, 2, 10).unwrap();
        let partition = Sectorization::compute(&graph, 6).unwrap();
        let roster = [EntityId(40), EntityId(7), EntityId(19)];
        assert_eq!(partition.assign(EntityId(7), &roster).unwrap().index(), 0);
        assert_eq!(partition.assign(EntityId(40), &roster).unwrap().index(), 2);
        assert_eq!(
            partition.assign(EntityId(1), &roster).unwrap_err(),
            SectorError::UnknownAgent(EntityId(1))
        );
    }
}
