use std::{
    collections::BTreeSet,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use fleet_pathing::{
    random_walk, suggested_division_count, Path as Route, Router, Sector, Sectorization,
};
use fleet_world::{Adjacency, EntityId, HeardMessage, LocationGraph, Perception, Point};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde_json::json;
use shared_logging::LogLevel;
use shared_radio::{RadioPublisher, Transmission};

use crate::{
    config::CoordinationConfig,
    error::CoordinationError,
    reporter::compose_message,
    scoring::{classify, TaskClass},
    state::{CoordinationState, FleetRole},
    synchronizer::{decode_heard, merge, MergeOptions},
    tasks::{allocate, refresh_tasks},
    telemetry::CoordinationTelemetry,
};

/// The single action an agent takes in a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Walk along a route; the first step is the current location.
    Move(Route),
    /// Dig out a buried human.
    Rescue(EntityId),
    /// Pick up a human.
    Load(EntityId),
    /// Put down whoever is carried.
    Unload,
    /// Work on a blockade.
    Clear(EntityId),
    /// Spray water on a building.
    Extinguish {
        /// Target building.
        building: EntityId,
        /// Water to use.
        water: u32,
    },
    /// Stay put.
    Rest,
    /// Say something on a channel.
    Speak {
        /// Channel index.
        channel: u8,
        /// Raw payload.
        payload: Vec<u8>,
    },
    /// Nothing this tick.
    None,
}

impl Command {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Rescue(_) => "rescue",
            Self::Load(_) => "load",
            Self::Unload => "unload",
            Self::Clear(_) => "clear",
            Self::Extinguish { .. } => "extinguish",
            Self::Rest => "rest",
            Self::Speak { .. } => "speak",
            Self::None => "none",
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Tick that was processed.
    pub tick: u32,
    /// Action to perform.
    pub command: Command,
    /// Task claimed after the auction round.
    pub target: Option<EntityId>,
    /// Encoded report, if there was anything to say.
    pub outbound: Option<Vec<u8>>,
}

/// Read-only view handed to a role policy.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// Coordination state after merge and allocation.
    pub state: &'a CoordinationState,
    /// Full map.
    pub graph: &'a LocationGraph,
    /// Sector assigned to this agent, if any.
    pub sector: Option<&'a Sector>,
    /// Startup configuration.
    pub config: &'a CoordinationConfig,
}

impl PolicyContext<'_> {
    /// Fewest-hops route to any of `goals`, avoiding remembered blocked
    /// transitions.
    pub fn route_to<R: Rng + ?Sized>(&self, goals: &[EntityId], rng: &mut R) -> Option<Route> {
        Router::new(self.graph)
            .avoiding(&self.state.blocked)
            .breadth_first(self.state.position, goals, rng)
    }

    /// Like [`Self::route_to`] but confined to the agent's sector.
    pub fn route_within_sector<R: Rng + ?Sized>(
        &self,
        goals: &[EntityId],
        rng: &mut R,
    ) -> Option<Route> {
        let sector = self.sector?;
        Router::new(self.graph)
            .within(sector)
            .avoiding(&self.state.blocked)
            .breadth_first(self.state.position, goals, rng)
    }

    /// Short random walk that stays out of burning buildings.
    pub fn wander<R: Rng + ?Sized>(&self, rng: &mut R) -> Route {
        let burning: BTreeSet<EntityId> = self
            .state
            .belief
            .buildings()
            .filter(|building| building.fieryness.is_on_fire())
            .map(|building| building.id)
            .collect();
        random_walk(
            self.graph,
            self.state.position,
            self.config.agent.random_walk_length,
            &burning,
            rng,
        )
    }
}

/// Role-specific behaviour layered over the coordination core.
pub trait RolePolicy: Send {
    /// Chooses this tick's command.
    fn select_behavior(&mut self, ctx: &PolicyContext<'_>) -> Command;
}

/// Minimal policy: walk to the claimed task and work on it, wander otherwise.
#[derive(Debug, Clone)]
pub struct PursuitPolicy {
    rng: SmallRng,
}

impl PursuitPolicy {
    /// Creates the policy with its own seeded generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn wander(&mut self, ctx: &PolicyContext<'_>) -> Command {
        let walk = ctx.wander(&mut self.rng);
        if walk.hops() == 0 {
            Command::Rest
        } else {
            Command::Move(walk)
        }
    }
}

impl RolePolicy for PursuitPolicy {
    fn select_behavior(&mut self, ctx: &PolicyContext<'_>) -> Command {
        let state = ctx.state;
        let Some(target) = state.target else {
            return self.wander(ctx);
        };
        let Some((class, location)) = classify(state, ctx.graph, target) else {
            return self.wander(ctx);
        };
        let here = state.position;
        let in_reach = match class {
            TaskClass::Blockade => {
                let center = ctx.graph.center(here).unwrap_or_default();
                location == here
                    || state.belief.blockade(target).is_some_and(|blockade| {
                        within(center, blockade.location, ctx.config.agent.clear_range)
                    })
            }
            TaskClass::Fire => location == here || ctx.graph.neighbours(location).contains(&here),
            _ => location == here,
        };
        if in_reach {
            return match class {
                TaskClass::Blockade => Command::Clear(target),
                TaskClass::Victim => match state.belief.human(target) {
                    Some(human) if human.is_buried() => Command::Rescue(target),
                    _ => Command::Load(target),
                },
                TaskClass::Fire => Command::Extinguish {
                    building: target,
                    water: ctx.config.agent.tank_capacity,
                },
                TaskClass::Entrance | TaskClass::Refuge => Command::Rest,
            };
        }
        let goals: Vec<EntityId> = match class {
            TaskClass::Fire if !ctx.graph.neighbours(location).is_empty() => {
                ctx.graph.neighbours(location).to_vec()
            }
            _ => vec![location],
        };
        match ctx.route_to(&goals, &mut self.rng) {
            Some(route) if route.hops() > 0 => Command::Move(route),
            _ => self.wander(ctx),
        }
    }
}

fn within(a: Point, b: Point, range: u32) -> bool {
    a.distance(b) <= f64::from(range)
}

/// Runs the coordination core for one agent, tick after tick.
pub struct AgentRuntime {
    state: CoordinationState,
    graph: Arc<LocationGraph>,
    sector: Option<Sector>,
    config: CoordinationConfig,
    policy: Box<dyn RolePolicy>,
    radio: Option<Arc<dyn RadioPublisher>>,
    telemetry: Option<CoordinationTelemetry>,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent", &self.state.agent)
            .field("role", &self.state.role)
            .field("tick", &self.state.tick)
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Returns a builder.
    #[must_use]
    pub fn builder(agent: EntityId, role: FleetRole) -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new(agent, role)
    }

    /// Processes one tick: merge, auction, policy, report.
    ///
    /// Never fails; radio and telemetry trouble is logged and skipped.
    pub fn tick(&mut self, perception: &Perception, heard: &[HeardMessage]) -> TickOutcome {
        let started = Instant::now();
        let tick = perception.tick;
        self.state.begin_tick(tick, perception.position);

        let decoded = decode_heard(heard);
        let report = merge(
            &mut self.state,
            perception,
            &decoded,
            MergeOptions::from(&self.config.agent),
        );
        refresh_tasks(&mut self.state, &self.graph);
        let target = allocate(
            &mut self.state,
            &self.graph,
            self.sector.as_ref(),
            &self.config,
        );

        let over_budget = self
            .config
            .agent
            .tick_budget_ms
            .is_some_and(|ms| started.elapsed() >= Duration::from_millis(ms));
        let command = if over_budget {
            tracing::warn!(agent = %self.state.agent, tick, "tick budget exhausted");
            Command::None
        } else {
            let ctx = PolicyContext {
                state: &self.state,
                graph: &self.graph,
                sector: self.sector.as_ref(),
                config: &self.config,
            };
            self.policy.select_behavior(&ctx)
        };
        if let Command::Move(route) = &command {
            if let Some(next) = route.next_step() {
                self.state.note_move(route.start(), next);
            }
        }

        let outbound = self.compose(tick);
        if let Some(telemetry) = &self.telemetry {
            let logged = telemetry.log(
                LogLevel::Info,
                tick,
                "tick.completed",
                json!({
                    "command": command.kind(),
                    "target": target.map(EntityId::value),
                    "merge": report,
                    "tasks": self.state.tasks.len(),
                    "outbound_bytes": outbound.as_ref().map_or(0, Vec::len),
                }),
            );
            if let Err(err) = logged {
                tracing::warn!(%err, "telemetry write failed");
            }
        }
        TickOutcome {
            tick,
            command,
            target,
            outbound,
        }
    }

    fn compose(&mut self, tick: u32) -> Option<Vec<u8>> {
        let channel = self.config.channel.subscribe?;
        let budget = self.config.channel.max_payload_bytes;
        let payload = compose_message(&mut self.state, &self.graph, budget).encode_within(budget);
        if payload.is_empty() {
            return None;
        }
        if let Some(radio) = &self.radio {
            let sent = radio.transmit(Transmission {
                sender: self.state.agent.value(),
                channel,
                tick,
                payload: payload.clone(),
            });
            if let Err(err) = sent {
                tracing::warn!(%err, "radio transmit failed");
            }
        }
        Some(payload)
    }

    /// Coordination state.
    #[must_use]
    pub const fn state(&self) -> &CoordinationState {
        &self.state
    }

    /// Assigned sector, if any.
    #[must_use]
    pub const fn sector(&self) -> Option<&Sector> {
        self.sector.as_ref()
    }

    /// Startup configuration.
    #[must_use]
    pub const fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Telemetry handle, if any.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&CoordinationTelemetry> {
        self.telemetry.as_ref()
    }
}

/// Builder for `AgentRuntime`.
pub struct AgentRuntimeBuilder {
    agent: EntityId,
    role: FleetRole,
    position: Option<EntityId>,
    graph: Option<Arc<LocationGraph>>,
    config: CoordinationConfig,
    roster: Vec<EntityId>,
    policy: Option<Box<dyn RolePolicy>>,
    radio: Option<Arc<dyn RadioPublisher>>,
    telemetry: Option<CoordinationTelemetry>,
    seed: u64,
}

impl AgentRuntimeBuilder {
    fn new(agent: EntityId, role: FleetRole) -> Self {
        Self {
            agent,
            role,
            position: None,
            graph: None,
            config: CoordinationConfig::default(),
            roster: Vec::new(),
            policy: None,
            radio: None,
            telemetry: None,
            seed: 0,
        }
    }

    /// Sets the map.
    #[must_use]
    pub fn graph(mut self, graph: Arc<LocationGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Sets the starting location.
    #[must_use]
    pub const fn position(mut self, position: EntityId) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: CoordinationConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the configuration from a TOML file.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = CoordinationConfig::load(path).context("loading coordination config")?;
        Ok(self)
    }

    /// Same-role peers sharing the map, this agent included; enables
    /// sectorization.
    #[must_use]
    pub fn roster(mut self, roster: impl IntoIterator<Item = EntityId>) -> Self {
        self.roster = roster.into_iter().collect();
        self
    }

    /// Overrides the role policy.
    #[must_use]
    pub fn policy(mut self, policy: impl RolePolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Publishes reports on this radio.
    #[must_use]
    pub fn radio(mut self, radio: Arc<dyn RadioPublisher>) -> Self {
        self.radio = Some(radio);
        self
    }

    /// Sets telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CoordinationTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Seeds the default policy.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the runtime, computing this agent's sector if a roster is set.
    pub fn build(self) -> Result<AgentRuntime> {
        let graph = self.graph.context("a location graph is required")?;
        let position = self.position.context("a starting position is required")?;
        self.config.validate()?;
        graph.require(position).map_err(CoordinationError::from)?;
        let sector = sector_for(&graph, &self.config, self.agent, &self.roster)
            .context("assigning sector")?;

        let mut state = CoordinationState::new(
            self.agent,
            self.role,
            position,
            self.config.agent.blocked_memory_ticks,
        );
        if self.role == FleetRole::Clearing {
            state.pending_entrances = entrances_to_clear(&graph, sector.as_ref());
        }
        let policy = self.policy.unwrap_or_else(|| {
            Box::new(PursuitPolicy::new(
                self.seed ^ u64::from(self.agent.value()),
            ))
        });
        tracing::debug!(
            agent = %self.agent,
            role = ?self.role,
            sector = sector.as_ref().map(Sector::index),
            "runtime built"
        );
        Ok(AgentRuntime {
            state,
            graph,
            sector,
            config: self.config,
            policy,
            radio: self.radio,
            telemetry: self.telemetry,
        })
    }
}

fn sector_for(
    graph: &LocationGraph,
    config: &CoordinationConfig,
    agent: EntityId,
    roster: &[EntityId],
) -> Result<Option<Sector>, CoordinationError> {
    if roster.is_empty() {
        return Ok(None);
    }
    let mut roster = roster.to_vec();
    if !roster.contains(&agent) {
        roster.push(agent);
    }
    let divisions = config
        .sectors
        .divisions
        .unwrap_or_else(|| suggested_division_count(roster.len()));
    let partition = Sectorization::compute(graph, divisions)?;
    Ok(Some(partition.assign(agent, &roster)?.clone()))
}

fn entrances_to_clear(graph: &LocationGraph, sector: Option<&Sector>) -> BTreeSet<EntityId> {
    graph
        .locations()
        .filter(|location| location.kind.is_structure())
        .filter(|location| sector.map_or(true, |sector| sector.contains(location.id)))
        .flat_map(|location| graph.entrances(location.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_world::{Blockade, Location, LocationKind};
    use shared_radio::{ChannelSpec, MemoryRadio, RadioSubscriber};
    use tempfile::tempdir;

    fn road_line(n: u32) -> Arc<LocationGraph> {
        Arc::new(LocationGraph::lattice(n, 1, 1_000).unwrap())
    }

    fn blockade(id: u32, road: u32) -> Blockade {
        Blockade {
            id: EntityId(id),
            road: EntityId(road),
            location: Point::new(i32::try_from(road - 1).unwrap() * 1_000, 0),
            repair_cost: 40,
            footprint: None,
        }
    }

    #[test]
    fn builder_requires_graph_and_position() {
        let err = AgentRuntime::builder(EntityId(1), FleetRole::Clearing)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("location graph"));

        let err = AgentRuntime::builder(EntityId(1), FleetRole::Clearing)
            .graph(road_line(3))
            .position(EntityId(99))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unknown location"));
    }

    #[test]
    fn roster_yields_a_sector() {
        let runtime = AgentRuntime::builder(EntityId(30), FleetRole::Rescue)
            .graph(Arc::new(LocationGraph::lattice(9, 2, 10).unwrap()))
            .position(EntityId(1))
            .roster([EntityId(10), EntityId(20), EntityId(30), EntityId(40)])
            .build()
            .unwrap();
        let sector = runtime.sector().unwrap();
        assert_eq!(sector.index(), 1);
        assert!(!sector.is_empty());
    }

    #[test]
    fn clearing_agent_walks_to_and_clears_a_blockade() {
        let graph = road_line(4);
        let mut config = CoordinationConfig::default();
        config.agent.clear_range = 100;
        let mut runtime = AgentRuntime::builder(EntityId(7), FleetRole::Clearing)
            .graph(Arc::clone(&graph))
            .position(EntityId(1))
            .config(config)
            .build()
            .unwrap();

        let mut position = EntityId(1);
        let mut commands = Vec::new();
        for tick in 1..=4 {
            let perception = Perception::new(tick, position).with(blockade(50, 4));
            let outcome = runtime.tick(&perception, &[]);
            if tick == 1 {
                assert_eq!(outcome.target, Some(EntityId(50)));
                let report = fleet_codec::Message::decode(&outcome.outbound.unwrap());
                assert!(report
                    .parameters()
                    .contains(&fleet_codec::Parameter::TaskPickup(EntityId(50))));
            }
            if let Command::Move(route) = &outcome.command {
                position = route.next_step().unwrap();
            }
            commands.push(outcome.command);
        }
        assert!(matches!(commands[0], Command::Move(_)));
        assert_eq!(commands[3], Command::Clear(EntityId(50)));
    }

    #[test]
    fn exhausted_budget_emits_no_command() {
        let mut config = CoordinationConfig::default();
        config.agent.tick_budget_ms = Some(0);
        let mut runtime = AgentRuntime::builder(EntityId(7), FleetRole::Clearing)
            .graph(road_line(3))
            .position(EntityId(1))
            .config(config)
            .build()
            .unwrap();
        let outcome = runtime.tick(&Perception::new(1, EntityId(1)).with(blockade(50, 3)), &[]);
        assert_eq!(outcome.command, Command::None);
        assert_eq!(outcome.target, Some(EntityId(50)));
    }

    #[test]
    fn stuck_agent_drops_its_task_and_remembers_the_edge() {
        let mut config = CoordinationConfig::default();
        config.agent.clear_range = 100;
        let mut runtime = AgentRuntime::builder(EntityId(7), FleetRole::Clearing)
            .graph(road_line(3))
            .position(EntityId(1))
            .config(config)
            .build()
            .unwrap();
        let retry = runtime.config().agent.blocked_retry_ticks;
        let mut last = None;
        for tick in 1..=retry + 2 {
            let perception = Perception::new(tick, EntityId(1)).with(blockade(50, 3));
            last = Some(runtime.tick(&perception, &[]));
        }
        let state = runtime.state();
        assert_eq!(state.attempts.get(&EntityId(50)), Some(&1));
        assert!(state.blocked.is_blocked(EntityId(1), EntityId(2)));
        assert_eq!(last.unwrap().target, None);
    }

    #[test]
    fn reports_go_out_on_the_radio() {
        let radio = Arc::new(MemoryRadio::new(vec![ChannelSpec::reliable(64)], 1));
        let mut runtime = AgentRuntime::builder(EntityId(7), FleetRole::Rescue)
            .graph(road_line(3))
            .position(EntityId(1))
            .radio(radio.clone())
            .build()
            .unwrap();
        runtime.tick(&Perception::new(1, EntityId(1)).with(blockade(50, 3)), &[]);
        radio.advance();
        let heard = radio.receive(8, &[0]);
        assert_eq!(heard.len(), 1);
        assert_eq!(heard[0].sender, 7);
    }

    #[test]
    fn ticks_are_logged_when_telemetry_is_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.log");
        let telemetry = CoordinationTelemetry::builder("coordination")
            .log_path(&path)
            .agent(EntityId(7))
            .build()
            .unwrap();
        let mut runtime = AgentRuntime::builder(EntityId(7), FleetRole::Suppression)
            .graph(road_line(3))
            .position(EntityId(2))
            .telemetry(telemetry)
            .build()
            .unwrap();
        runtime.tick(&Perception::new(1, EntityId(2)), &[]);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("tick.completed"));
        assert!(content.contains("\"agent\":7"));
    }

    #[test]
    fn clearing_agents_get_entrances_from_their_sector() {
        let graph = Arc::new(
            LocationGraph::new(vec![
                Location::new(1, LocationKind::Road, Point::new(0, 0), [2, 3]),
                Location::new(2, LocationKind::Refuge, Point::new(0, 10), []),
                Location::new(3, LocationKind::Road, Point::new(10, 0), []),
            ])
            .unwrap(),
        );
        let runtime = AgentRuntime::builder(EntityId(7), FleetRole::Clearing)
            .graph(graph)
            .position(EntityId(3))
            .build()
            .unwrap();
        assert_eq!(
            runtime.state().pending_entrances,
            BTreeSet::from([EntityId(1)])
        );
    }
}
