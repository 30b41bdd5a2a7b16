use std::collections::BTreeSet;

use fleet_world::EntityId;

#[derive(Debug, Clone, Default)]
struct Slot {
    tick: u32,
    edges: BTreeSet<(EntityId, EntityId)>,
}

/// Directed edges through which movement recently failed.
///
/// One slot per tick in a ring of `window` slots; an entry recorded at tick
/// `t` is forgotten once the clock reaches `t + window`.
#[derive(Debug, Clone)]
pub struct BlockedTransitions {
    window: u32,
    now: u32,
    slots: Vec<Slot>,
}

impl BlockedTransitions {
    /// Creates an empty memory spanning `window` ticks (at least one).
    #[must_use]
    pub fn new(window: u32) -> Self {
        let window = window.max(1);
        Self {
            window,
            now: 0,
            slots: vec![Slot::default(); window as usize],
        }
    }

    /// Length of the memory in ticks.
    #[must_use]
    pub const fn window(&self) -> u32 {
        self.window
    }

    const fn is_live(&self, slot: &Slot) -> bool {
        slot.tick <= self.now && self.now - slot.tick < self.window
    }

    /// Moves the clock forward, forgetting entries that aged out.
    pub fn advance(&mut self, tick: u32) {
        self.now = self.now.max(tick);
        let (now, window) = (self.now, self.window);
        for slot in &mut self.slots {
            if !slot.edges.is_empty() && now - slot.tick.min(now) >= window {
                slot.edges.clear();
            }
        }
    }

    /// Remembers that moving `from` -> `to` failed at `tick`.
    pub fn record(&mut self, tick: u32, from: EntityId, to: EntityId) {
        self.advance(tick);
        let index = (tick % self.window) as usize;
        let slot = &mut self.slots[index];
        if slot.tick != tick {
            slot.tick = tick;
            slot.edges.clear();
        }
        slot.edges.insert((from, to));
        tracing::debug!(%from, %to, tick, "transition marked blocked");
    }

    /// Whether `from` -> `to` is currently considered impassable.
    #[must_use]
    pub fn is_blocked(&self, from: EntityId, to: EntityId) -> bool {
        self.slots
            .iter()
            .any(|slot| self.is_live(slot) && slot.edges.contains(&(from, to)))
    }

    /// Live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| self.is_live(slot))
            .map(|slot| slot.edges.len())
            .sum()
    }

    /// Whether nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
