use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoordinationError;

/// Everything an agent reads once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Radio channel limits.
    pub channel: ChannelConfig,
    /// Agent capabilities and protocol timings.
    pub agent: AgentConfig,
    /// Map partition settings.
    pub sectors: SectorConfig,
    /// Task importance coefficients.
    pub scoring: ScoringConfig,
}

impl CoordinationConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading coordination config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), CoordinationError> {
        let invalid = |msg: String| Err(CoordinationError::InvalidConfig(msg));
        if self.channel.count == 0 {
            return invalid("channel.count must be at least 1".into());
        }
        if let Some(channel) = self.channel.subscribe {
            if channel >= self.channel.count {
                return invalid(format!(
                    "channel.subscribe {channel} is outside 0..{}",
                    self.channel.count
                ));
            }
        }
        if self.agent.blocked_memory_ticks == 0 {
            return invalid("agent.blocked_memory_ticks must be at least 1".into());
        }
        if self.agent.max_lower_claimants == 0 {
            return invalid("agent.max_lower_claimants must be at least 1".into());
        }
        if self.agent.travel_speed == 0 {
            return invalid("agent.travel_speed must be positive".into());
        }
        if self.sectors.divisions == Some(0) {
            return invalid("sectors.divisions must be positive".into());
        }
        for (name, weights) in self.scoring.classes() {
            if weights.distance_divisor.is_nan() || weights.distance_divisor <= 0.0 {
                return invalid(format!("scoring.{name}.distance_divisor must be positive"));
            }
        }
        Ok(())
    }
}

/// Radio channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Number of channels.
    pub count: u8,
    /// Per-tick payload ceiling of the channel the agent speaks on.
    pub max_payload_bytes: usize,
    /// Channel to listen and speak on; `None` keeps the agent silent.
    pub subscribe: Option<u8>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            count: 1,
            max_payload_bytes: 256,
            subscribe: Some(0),
        }
    }
}

/// Capabilities and protocol timings of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Distance within which debris can be cleared.
    pub clear_range: u32,
    /// Repair cost removed per clear action.
    pub repair_rate: u32,
    /// Water carried by a full tank.
    pub tank_capacity: u32,
    /// Distance covered per tick while moving.
    pub travel_speed: u32,
    /// Ticks without progress before the current task is dropped.
    pub blocked_retry_ticks: u32,
    /// Ticks a failed transition is remembered.
    pub blocked_memory_ticks: u32,
    /// Hops of the random-walk fallback.
    pub random_walk_length: usize,
    /// Lower-id claimants on a task that make this agent back off.
    pub max_lower_claimants: usize,
    /// Ticks between repeated announcements of the current claim.
    pub reannounce_interval: u32,
    /// Whether buried-civilian shouts create beliefs.
    pub merge_distress_shouts: bool,
    /// Wall-clock allowance for one tick; `None` disables the check.
    pub tick_budget_ms: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            clear_range: 10_000,
            repair_rate: 10,
            tank_capacity: 15_000,
            travel_speed: 30_000,
            blocked_retry_ticks: 3,
            blocked_memory_ticks: 15,
            random_walk_length: 5,
            max_lower_claimants: 1,
            reannounce_interval: 5,
            merge_distress_shouts: true,
            tick_budget_ms: Some(500),
        }
    }
}

/// Map partition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SectorConfig {
    /// Explicit sector count; derived from the roster size when absent.
    pub divisions: Option<usize>,
}

/// Coefficients of one task class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    /// Constant benefit.
    pub base: f64,
    /// Multiplier of the class urgency.
    pub urgency_weight: f64,
    /// Distance units per point of score lost.
    pub distance_divisor: f64,
}

impl ClassWeights {
    /// Creates a weight set.
    #[must_use]
    pub const fn new(base: f64, urgency_weight: f64, distance_divisor: f64) -> Self {
        Self {
            base,
            urgency_weight,
            distance_divisor,
        }
    }
}

/// Urgency of each burning state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirePriority {
    /// Warming up.
    pub heating: f64,
    /// Burning.
    pub burning: f64,
    /// Fully ablaze.
    pub inferno: f64,
}

impl Default for FirePriority {
    fn default() -> Self {
        Self {
            heating: 0.3,
            burning: 0.8,
            inferno: 0.7,
        }
    }
}

/// Every coefficient of the task importance function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Debris on a road; urgency is the repair cost.
    pub blockade: ClassWeights,
    /// Trapped or hurt human; urgency is `200 - buriedness`.
    pub victim: ClassWeights,
    /// Burning building; urgency comes from `fire_priority`.
    pub fire: ClassWeights,
    /// Uncleared building entrance; urgency is 1.
    pub entrance: ClassWeights,
    /// Uncleared refuge entrance; urgency is 1.
    pub refuge: ClassWeights,
    /// Fire urgency table.
    pub fire_priority: FirePriority,
    /// Task sits where the agent stands.
    pub same_location_bonus: f64,
    /// Task sits on a building entrance.
    pub entrance_bonus: f64,
    /// Both of the above.
    pub same_location_entrance_bonus: f64,
    /// Task lies inside the agent's sector.
    pub sector_bonus: f64,
    /// Victim can be reached before it dies.
    pub savable_bonus: f64,
    /// Subtracted once per earlier attempt that had no effect.
    pub ineffective_penalty: f64,
    /// Tasks scoring at or below this are never chosen.
    pub floor: f64,
}

impl ScoringConfig {
    /// Named class weights, for validation and reporting.
    #[must_use]
    pub fn classes(&self) -> [(&'static str, ClassWeights); 5] {
        [
            ("blockade", self.blockade),
            ("victim", self.victim),
            ("fire", self.fire),
            ("entrance", self.entrance),
            ("refuge", self.refuge),
        ]
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            blockade: ClassWeights::new(0.0, 1.0, 500.0),
            victim: ClassWeights::new(5.5, 0.025, 20_000.0),
            fire: ClassWeights::new(0.0, 10.0, 50_000.0),
            entrance: ClassWeights::new(20.0, 0.0, 500.0),
            refuge: ClassWeights::new(60.0, 0.0, 500.0),
            fire_priority: FirePriority::default(),
            same_location_bonus: 5.0,
            entrance_bonus: 40.0,
            same_location_entrance_bonus: 100.0,
            sector_bonus: 5.0,
            savable_bonus: 2.0,
            ineffective_penalty: 10.0,
            floor: -1.0e9,
        }
    }
}
