//! Centralized balance and tuning constants for the caravan engine.
//!
//! These are the defaults behind [`crate::config::TuningConfig`]. Front-ends
//! may override any of them through configuration; the engine itself only
//! reads the values from the config it was built with.

// World geometry -----------------------------------------------------------
pub(crate) const WORLD_WIDTH: f32 = 1_200.0;
pub(crate) const WORLD_HEIGHT: f32 = 600.0;
pub(crate) const ROAD_TOP: f32 = 150.0;
pub(crate) const ROAD_BOTTOM: f32 = 450.0;
pub(crate) const CARAVAN_EDGE_MARGIN_X: f32 = 50.0;
pub(crate) const CARAVAN_EDGE_MARGIN_Y: f32 = 20.0;
pub(crate) const PLAYER_START_X: f32 = 200.0;
pub(crate) const PLAYER_START_Y: f32 = 300.0;

// Movement -----------------------------------------------------------------
pub(crate) const PLAYER_SPEED: f32 = 5.0;
pub(crate) const WALKER_SPEED_FACTOR: f32 = 1.2;
pub(crate) const SCROLL_SPEED: f32 = 2.5;
pub(crate) const SCROLL_WRAP: f32 = 100.0;
pub(crate) const PROGRESS_DIVISOR: f32 = 80.0;
pub(crate) const CARAVAN_FOLLOW_FACTOR: f32 = 0.1;
pub(crate) const WALKER_FOLLOW_FACTOR: f32 = 0.15;
pub(crate) const SPEED_UPGRADE_FACTOR: f32 = 1.4;
pub(crate) const FRAME_MS: f32 = 16.0;

// Food ---------------------------------------------------------------------
pub(crate) const FOOD_MAX: f32 = 100.0;
pub(crate) const FOOD_DRAIN_RATE: f32 = 0.05;
pub(crate) const MOVING_DRAIN_FACTOR: f32 = 2.0;
pub(crate) const COOK_DRAIN_FACTOR: f32 = 0.8;
pub(crate) const EFFICIENCY_DRAIN_FACTOR: f32 = 0.75;
pub(crate) const STARVATION_FOOD_RESET: f32 = 50.0;
pub(crate) const MAX_LIVES: u8 = 3;

// Collisions and interaction ----------------------------------------------
pub(crate) const PICKUP_RADIUS: f32 = 35.0;
pub(crate) const ENCOUNTER_RADIUS: f32 = 45.0;
pub(crate) const BULLET_HIT_RADIUS: f32 = 30.0;
pub(crate) const INTERACTION_RANGE: f32 = 60.0;
pub(crate) const REMOUNT_RANGE: f32 = 80.0;
pub(crate) const NPC_CULL_X: f32 = -150.0;

// Bullets ------------------------------------------------------------------
pub(crate) const BULLET_SPEED: f32 = 12.0;
pub(crate) const BULLET_OFFSET_X: f32 = 10.0;
pub(crate) const BULLET_OFFSET_Y: f32 = -8.0;
pub(crate) const COLLATERAL_GOLD_PENALTY: u32 = 5;

// Spawning -----------------------------------------------------------------
pub(crate) const SPAWN_INTERVAL_MS: f32 = 1_000.0;
pub(crate) const SPAWN_CUTOFF_PROGRESS: f32 = 95.0;
pub(crate) const RECRUIT_CUTOFF_PROGRESS: f32 = 90.0;
pub(crate) const MYSTERY_BOX_THRESHOLD: f32 = 0.12;
pub(crate) const COIN_THRESHOLD: f32 = 0.28;
pub(crate) const PERSON_THRESHOLD: f32 = 0.55;
pub(crate) const BIG_COIN_CHANCE: f32 = 0.1;
pub(crate) const SMALL_COIN_VALUE: u32 = 5;
pub(crate) const BIG_COIN_MULTIPLIER: u32 = 5;
pub(crate) const WAYSTATION_BAND_MIN: f32 = 45.0;
pub(crate) const WAYSTATION_BAND_MAX: f32 = 55.0;
pub(crate) const HAVEN_PROGRESS: f32 = 95.0;
pub(crate) const SPAWN_OFFSET_X: f32 = 100.0;
pub(crate) const SPAWN_LANE_PADDING: f32 = 40.0;
pub(crate) const NPC_SPEED_MIN: f32 = 0.5;
pub(crate) const NPC_SPEED_MAX: f32 = 1.0;

// Crew ---------------------------------------------------------------------
pub(crate) const BASE_CREW_CAPACITY: usize = 3;
pub(crate) const UPGRADED_CREW_CAPACITY: usize = 5;
pub(crate) const RECRUIT_REWARD: u32 = 20;
pub(crate) const REPLACEMENT_BOUNTY: u32 = 50;

// Lottery ------------------------------------------------------------------
pub(crate) const LOTTERY_SPIN_MS: f32 = 4_000.0;
pub(crate) const LOTTERY_TICK_SOUND_MS: f32 = 150.0;
pub(crate) const LOTTERY_MIN_TURNS: u32 = 5;

// Notifications ------------------------------------------------------------
pub(crate) const TOAST_LIFETIME_MS: f32 = 5_000.0;

// Scoring ------------------------------------------------------------------
pub(crate) const SCORE_REPUTATION_WEIGHT: u32 = 2;

// Audio --------------------------------------------------------------------
pub(crate) const BGM_STEP_MS: f32 = 220.0;
pub(crate) const BGM_KICK_EVERY: u32 = 4;
pub(crate) const BGM_BASE_GAIN: f32 = 0.6;
pub(crate) const BGM_GAIN_SCALE: f32 = 0.15;
pub(crate) const BGM_FADE_IN_SECS: f32 = 3.0;
pub(crate) const AMBIENT_BASE_GAIN: f32 = 0.6;
pub(crate) const AMBIENT_GAIN_SCALE: f32 = 0.2;
pub(crate) const AMBIENT_FADE_IN_SECS: f32 = 2.0;
pub(crate) const AUDIO_FADE_OUT_SECS: f32 = 1.0;
pub(crate) const DEFAULT_VOLUME: f32 = 0.5;
