//! Tunable simulation parameters.
//!
//! Every number the simulation loop consults lives here with a default that
//! matches the shipped game feel. Values are playtested, not derived, so a
//! front-end is free to override them from JSON.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BASE_CREW_CAPACITY, BIG_COIN_CHANCE, BIG_COIN_MULTIPLIER, BULLET_HIT_RADIUS, BULLET_OFFSET_X,
    BULLET_OFFSET_Y, BULLET_SPEED, CARAVAN_EDGE_MARGIN_X, CARAVAN_EDGE_MARGIN_Y,
    CARAVAN_FOLLOW_FACTOR, COIN_THRESHOLD, COLLATERAL_GOLD_PENALTY, COOK_DRAIN_FACTOR,
    EFFICIENCY_DRAIN_FACTOR, ENCOUNTER_RADIUS, FOOD_DRAIN_RATE, FRAME_MS, HAVEN_PROGRESS,
    INTERACTION_RANGE, LOTTERY_MIN_TURNS, LOTTERY_SPIN_MS, LOTTERY_TICK_SOUND_MS,
    MOVING_DRAIN_FACTOR, MYSTERY_BOX_THRESHOLD, NPC_CULL_X, NPC_SPEED_MAX, NPC_SPEED_MIN,
    PERSON_THRESHOLD, PICKUP_RADIUS, PLAYER_SPEED, PLAYER_START_X, PLAYER_START_Y,
    PROGRESS_DIVISOR, RECRUIT_CUTOFF_PROGRESS, RECRUIT_REWARD, REMOUNT_RANGE, REPLACEMENT_BOUNTY,
    ROAD_BOTTOM, ROAD_TOP, SCROLL_SPEED, SCROLL_WRAP, SMALL_COIN_VALUE, SPAWN_CUTOFF_PROGRESS,
    SPAWN_INTERVAL_MS, SPAWN_LANE_PADDING, SPAWN_OFFSET_X, SPEED_UPGRADE_FACTOR,
    STARVATION_FOOD_RESET, UPGRADED_CREW_CAPACITY, WALKER_FOLLOW_FACTOR, WALKER_SPEED_FACTOR,
    WAYSTATION_BAND_MAX, WAYSTATION_BAND_MIN, WORLD_HEIGHT, WORLD_WIDTH,
};

/// Errors raised when tuning invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value:.3})")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("{field} bounds inverted (min {min:.2} > max {max:.2})")]
    InvertedBounds {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("spawn thresholds must be ascending within 0..=1")]
    SpawnThresholdOrder,
    #[error("crew capacity {base} exceeds upgraded capacity {upgraded}")]
    CrewCapacity { base: usize, upgraded: usize },
}

/// World rectangle and road lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub road_top: f32,
    pub road_bottom: f32,
    /// Horizontal keep-out distance between the caravan and the world edges.
    pub caravan_margin_x: f32,
    /// Vertical keep-out distance between the caravan and the road edges.
    pub caravan_margin_y: f32,
    pub start_x: f32,
    pub start_y: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            road_top: ROAD_TOP,
            road_bottom: ROAD_BOTTOM,
            caravan_margin_x: CARAVAN_EDGE_MARGIN_X,
            caravan_margin_y: CARAVAN_EDGE_MARGIN_Y,
            start_x: PLAYER_START_X,
            start_y: PLAYER_START_Y,
        }
    }
}

/// Movement, scroll and progress rates. Per-frame values assume a
/// `frame_ms` reference frame; longer frames scale linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub frame_ms: f32,
    pub player_speed: f32,
    pub walker_speed_factor: f32,
    pub scroll_speed: f32,
    pub scroll_wrap: f32,
    /// Scroll units per progress point.
    pub progress_divisor: f32,
    pub caravan_follow: f32,
    pub walker_follow: f32,
    pub speed_upgrade_factor: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            frame_ms: FRAME_MS,
            player_speed: PLAYER_SPEED,
            walker_speed_factor: WALKER_SPEED_FACTOR,
            scroll_speed: SCROLL_SPEED,
            scroll_wrap: SCROLL_WRAP,
            progress_divisor: PROGRESS_DIVISOR,
            caravan_follow: CARAVAN_FOLLOW_FACTOR,
            walker_follow: WALKER_FOLLOW_FACTOR,
            speed_upgrade_factor: SPEED_UPGRADE_FACTOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    pub drain_rate: f32,
    pub moving_factor: f32,
    pub cook_factor: f32,
    pub efficiency_factor: f32,
    pub starvation_reset: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            drain_rate: FOOD_DRAIN_RATE,
            moving_factor: MOVING_DRAIN_FACTOR,
            cook_factor: COOK_DRAIN_FACTOR,
            efficiency_factor: EFFICIENCY_DRAIN_FACTOR,
            starvation_reset: STARVATION_FOOD_RESET,
        }
    }
}

/// Collision radii (axis-aligned half-widths) and interaction ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub pickup_radius: f32,
    pub encounter_radius: f32,
    pub bullet_hit_radius: f32,
    pub interaction_range: f32,
    pub remount_range: f32,
    pub cull_x: f32,
    pub bullet_speed: f32,
    pub bullet_offset_x: f32,
    pub bullet_offset_y: f32,
    pub collateral_penalty: u32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            pickup_radius: PICKUP_RADIUS,
            encounter_radius: ENCOUNTER_RADIUS,
            bullet_hit_radius: BULLET_HIT_RADIUS,
            interaction_range: INTERACTION_RANGE,
            remount_range: REMOUNT_RANGE,
            cull_x: NPC_CULL_X,
            bullet_speed: BULLET_SPEED,
            bullet_offset_x: BULLET_OFFSET_X,
            bullet_offset_y: BULLET_OFFSET_Y,
            collateral_penalty: COLLATERAL_GOLD_PENALTY,
        }
    }
}

/// Spawn director partition and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub interval_ms: f32,
    /// Regular spawning stops once progress reaches this value.
    pub cutoff_progress: f32,
    /// Recruitable travelers stop appearing once progress reaches this value.
    pub recruit_cutoff_progress: f32,
    pub mystery_threshold: f32,
    pub coin_threshold: f32,
    pub person_threshold: f32,
    pub big_coin_chance: f32,
    pub small_coin_value: u32,
    pub big_coin_multiplier: u32,
    pub waystation_min: f32,
    pub waystation_max: f32,
    pub haven_progress: f32,
    pub offset_x: f32,
    pub lane_padding: f32,
    pub npc_speed_min: f32,
    pub npc_speed_max: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interval_ms: SPAWN_INTERVAL_MS,
            cutoff_progress: SPAWN_CUTOFF_PROGRESS,
            recruit_cutoff_progress: RECRUIT_CUTOFF_PROGRESS,
            mystery_threshold: MYSTERY_BOX_THRESHOLD,
            coin_threshold: COIN_THRESHOLD,
            person_threshold: PERSON_THRESHOLD,
            big_coin_chance: BIG_COIN_CHANCE,
            small_coin_value: SMALL_COIN_VALUE,
            big_coin_multiplier: BIG_COIN_MULTIPLIER,
            waystation_min: WAYSTATION_BAND_MIN,
            waystation_max: WAYSTATION_BAND_MAX,
            haven_progress: HAVEN_PROGRESS,
            offset_x: SPAWN_OFFSET_X,
            lane_padding: SPAWN_LANE_PADDING,
            npc_speed_min: NPC_SPEED_MIN,
            npc_speed_max: NPC_SPEED_MAX,
        }
    }
}

impl SpawnConfig {
    #[must_use]
    pub fn big_coin_value(&self) -> u32 {
        self.small_coin_value.saturating_mul(self.big_coin_multiplier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewConfig {
    pub base_capacity: usize,
    pub upgraded_capacity: usize,
    pub recruit_reward: u32,
    pub replacement_bounty: u32,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            base_capacity: BASE_CREW_CAPACITY,
            upgraded_capacity: UPGRADED_CREW_CAPACITY,
            recruit_reward: RECRUIT_REWARD,
            replacement_bounty: REPLACEMENT_BOUNTY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    pub spin_ms: f32,
    pub tick_sound_ms: f32,
    pub min_turns: u32,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            spin_ms: LOTTERY_SPIN_MS,
            tick_sound_ms: LOTTERY_TICK_SOUND_MS,
            min_turns: LOTTERY_MIN_TURNS,
        }
    }
}

/// Full tuning surface consumed by the simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub collision: CollisionConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
    #[serde(default)]
    pub crew: CrewConfig,
    #[serde(default)]
    pub lottery: LotteryConfig,
}

impl TuningConfig {
    /// Parse a tuning document, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_world()?;
        self.validate_rates()?;
        self.validate_spawn()?;
        if self.crew.base_capacity > self.crew.upgraded_capacity {
            return Err(ConfigError::CrewCapacity {
                base: self.crew.base_capacity,
                upgraded: self.crew.upgraded_capacity,
            });
        }
        positive("lottery.spin_ms", self.lottery.spin_ms)?;
        Ok(())
    }

    fn validate_world(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        positive("world.width", world.width)?;
        positive("world.height", world.height)?;
        if world.road_top >= world.road_bottom {
            return Err(ConfigError::InvertedBounds {
                field: "world.road",
                min: world.road_top,
                max: world.road_bottom,
            });
        }
        if world.road_bottom > world.height || world.road_top < 0.0 {
            return Err(ConfigError::RangeViolation {
                field: "world.road_bottom",
                min: 0.0,
                max: world.height,
                value: world.road_bottom,
            });
        }
        Ok(())
    }

    fn validate_rates(&self) -> Result<(), ConfigError> {
        positive("movement.frame_ms", self.movement.frame_ms)?;
        positive("movement.player_speed", self.movement.player_speed)?;
        positive("movement.scroll_speed", self.movement.scroll_speed)?;
        positive("movement.scroll_wrap", self.movement.scroll_wrap)?;
        positive("movement.progress_divisor", self.movement.progress_divisor)?;
        positive("food.drain_rate", self.food.drain_rate)?;
        unit_range("movement.caravan_follow", self.movement.caravan_follow)?;
        unit_range("movement.walker_follow", self.movement.walker_follow)?;
        if !(0.0..=crate::constants::FOOD_MAX).contains(&self.food.starvation_reset)
            || self.food.starvation_reset <= 0.0
        {
            return Err(ConfigError::RangeViolation {
                field: "food.starvation_reset",
                min: 0.0,
                max: crate::constants::FOOD_MAX,
                value: self.food.starvation_reset,
            });
        }
        Ok(())
    }

    fn validate_spawn(&self) -> Result<(), ConfigError> {
        let spawn = &self.spawn;
        positive("spawn.interval_ms", spawn.interval_ms)?;
        let ordered = 0.0 <= spawn.mystery_threshold
            && spawn.mystery_threshold <= spawn.coin_threshold
            && spawn.coin_threshold <= spawn.person_threshold
            && spawn.person_threshold <= 1.0;
        if !ordered {
            return Err(ConfigError::SpawnThresholdOrder);
        }
        unit_range("spawn.big_coin_chance", spawn.big_coin_chance)?;
        if spawn.npc_speed_min > spawn.npc_speed_max {
            return Err(ConfigError::InvertedBounds {
                field: "spawn.npc_speed",
                min: spawn.npc_speed_min,
                max: spawn.npc_speed_max,
            });
        }
        if spawn.waystation_min > spawn.waystation_max {
            return Err(ConfigError::InvertedBounds {
                field: "spawn.waystation",
                min: spawn.waystation_min,
                max: spawn.waystation_max,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn unit_range(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min: 0.0,
            max: 1.0,
            value,
        })
    }
}
