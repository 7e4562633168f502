//! World state and the per-frame simulation step.
//!
//! [`World::tick`] is a plain transition over owned state: given the
//! resources, flags, input and elapsed time it moves entities, drains food,
//! resolves at most one caravan contact and reports what happened.
pub mod collision;
pub mod event;
pub mod input;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::TuningConfig;
use crate::constants::FOOD_MAX;
use crate::data::EncounterCatalog;
use crate::resources::{FlagSet, Passenger, ResourceState};
use crate::rng::RngBundle;
use crate::spawn::{CoinSize, Npc, NpcKind, SpawnDirector};

pub use collision::Contact;
pub use event::{EventId, EventSeverity, SimEvent, SimEventKind, TickReport};
pub use input::{InputState, Key};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Who the player is steering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    Caravan,
    OnFoot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Bullet {
    #[must_use]
    pub const fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }
}

/// Result of pressing the mount key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountChange {
    Dismounted,
    Remounted,
    /// The walker is too far from the caravan to climb back on.
    TooFar,
}

/// Borrowed collaborators a tick reads and writes.
#[derive(Debug)]
pub struct TickContext<'a> {
    pub tuning: &'a TuningConfig,
    pub catalog: &'a EncounterCatalog,
    pub resources: &'a mut ResourceState,
    pub flags: &'a FlagSet,
    pub rng: &'a RngBundle,
    pub input: &'a InputState,
    pub pointer_follow: bool,
}

/// Positions and transient entities of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub caravan: Position,
    pub walker: Position,
    pub mode: ControlMode,
    pub npcs: Vec<Npc>,
    pub bullets: Vec<Bullet>,
    pub scroll_offset: f32,
    spawn_timer_ms: f32,
    next_id: u32,
    ticks: u64,
}

impl World {
    #[must_use]
    pub fn new(tuning: &TuningConfig) -> Self {
        let start = Position::new(tuning.world.start_x, tuning.world.start_y);
        Self {
            caravan: start,
            walker: start,
            mode: ControlMode::Caravan,
            npcs: Vec::new(),
            bullets: Vec::new(),
            scroll_offset: 0.0,
            spawn_timer_ms: 0.0,
            next_id: 1,
            ticks: 0,
        }
    }

    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub const fn spawn_timer_ms(&self) -> f32 {
        self.spawn_timer_ms
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Insert an NPC built outside the spawn director (scripted runs, tests).
    pub fn insert_npc(&mut self, x: f32, y: f32, kind: NpcKind) -> u32 {
        let id = self.allocate_id();
        self.npcs.push(Npc {
            id,
            x,
            y,
            kind,
            speed_multiplier: 1.0,
        });
        id
    }

    /// Advance the world by `dt_ms`. Per-frame rates are scaled by
    /// `dt_ms / frame_ms`.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, dt_ms: f32) -> TickReport {
        self.ticks = self.ticks.saturating_add(1);
        let mut report = TickReport::new(self.ticks);
        let scale = (dt_ms / ctx.tuning.movement.frame_ms).max(0.0);
        match self.mode {
            ControlMode::Caravan => self.tick_caravan(ctx, dt_ms, scale, &mut report),
            ControlMode::OnFoot => self.tick_on_foot(ctx, scale, &mut report),
        }
        report
    }

    fn tick_caravan(
        &mut self,
        ctx: &mut TickContext<'_>,
        dt_ms: f32,
        scale: f32,
        report: &mut TickReport,
    ) {
        let tuning = ctx.tuning;
        let speed = ctx.resources.caravan_speed(ctx.flags, &tuning.movement);
        let follow = ctx.pointer_follow.then(|| ctx.input.pointer()).flatten();
        self.caravan = steer(
            self.caravan,
            ctx.input,
            follow,
            speed * scale,
            tuning.movement.caravan_follow * scale,
        );
        let world = &tuning.world;
        self.caravan.x = self
            .caravan
            .x
            .clamp(world.caravan_margin_x, world.width - world.caravan_margin_x);
        self.caravan.y = self.caravan.y.clamp(
            world.road_top + world.caravan_margin_y,
            world.road_bottom - world.caravan_margin_y,
        );

        let moving = ctx.input.is_steering() || ctx.pointer_follow;
        if self.drain_food(ctx, moving, scale, report) {
            return;
        }

        let vehicle_speed = ctx.resources.vehicle.speed_multiplier();
        let scroll = tuning.movement.scroll_speed * vehicle_speed * scale;
        self.scroll_offset = (self.scroll_offset + scroll) % tuning.movement.scroll_wrap;
        let before = ctx.resources.progress;
        ctx.resources.progress =
            (before + scroll / tuning.movement.progress_divisor).min(100.0);
        report.distance = ctx.resources.progress - before;

        let cull_x = tuning.collision.cull_x;
        for npc in &mut self.npcs {
            npc.x -= scroll * npc.speed_multiplier;
        }
        self.npcs.retain(|npc| npc.x > cull_x);

        self.resolve_contact(ctx, report);
        self.advance_spawner(ctx, dt_ms, report);
    }

    /// Returns `true` when the run just ended by starvation.
    fn drain_food(
        &mut self,
        ctx: &mut TickContext<'_>,
        moving: bool,
        scale: f32,
        report: &mut TickReport,
    ) -> bool {
        let food_cfg = &ctx.tuning.food;
        let base = if moving {
            food_cfg.drain_rate * food_cfg.moving_factor
        } else {
            food_cfg.drain_rate
        };
        let drain = base * ctx.resources.drain_multiplier(ctx.flags, food_cfg) * scale;
        let before = ctx.resources.food;
        ctx.resources.food = (before - drain).max(0.0);
        report.food_consumed = before - ctx.resources.food;
        if ctx.resources.food > 0.0 {
            return false;
        }
        if ctx.resources.lives > 1 {
            ctx.resources.lives -= 1;
            ctx.resources.food = food_cfg.starvation_reset.min(FOOD_MAX);
            debug!("starved: {} lives left", ctx.resources.lives);
            report.push(SimEventKind::LifeLost {
                lives_left: ctx.resources.lives,
            });
            false
        } else {
            ctx.resources.lives = 0;
            report.push(SimEventKind::Starved);
            true
        }
    }

    fn resolve_contact(&mut self, ctx: &mut TickContext<'_>, report: &mut TickReport) {
        let Some(contact) = collision::caravan_contact(&self.npcs, self.caravan, &ctx.tuning.collision)
        else {
            return;
        };
        match contact {
            Contact::Coin { index, size } => {
                self.npcs.remove(index);
                let value = match size {
                    CoinSize::Small => ctx.tuning.spawn.small_coin_value,
                    CoinSize::Big => ctx.tuning.spawn.big_coin_value(),
                };
                ctx.resources.earn_gold(value);
                report.push(SimEventKind::CoinCollected { size, value });
            }
            Contact::MysteryBox { index } => {
                self.npcs.remove(index);
                report.push(SimEventKind::MysteryBoxOpened);
            }
            Contact::Encounter { index, encounter } => {
                self.npcs.remove(index);
                debug!("caravan ran into {encounter}");
                report.push(SimEventKind::EncounterTriggered { encounter });
            }
        }
    }

    fn advance_spawner(&mut self, ctx: &TickContext<'_>, dt_ms: f32, report: &mut TickReport) {
        let spawn_cfg = &ctx.tuning.spawn;
        self.spawn_timer_ms += dt_ms;
        if self.spawn_timer_ms <= spawn_cfg.interval_ms {
            return;
        }
        self.spawn_timer_ms = 0.0;
        let progress = ctx.resources.progress;
        let director = SpawnDirector::new(spawn_cfg, &ctx.tuning.world, ctx.catalog);
        let npc = if progress < spawn_cfg.cutoff_progress {
            let id = self.allocate_id();
            director.spawn(progress, id, &mut *ctx.rng.spawn())
        } else if self.npcs.iter().any(Npc::is_haven) {
            return;
        } else {
            let id = self.allocate_id();
            director.spawn_haven(id, &mut *ctx.rng.spawn())
        };
        report.push(SimEventKind::Spawned {
            npc_id: npc.id,
            kind: npc.kind.as_str(),
        });
        self.npcs.push(npc);
    }

    fn tick_on_foot(&mut self, ctx: &mut TickContext<'_>, scale: f32, report: &mut TickReport) {
        let tuning = ctx.tuning;
        let speed = ResourceState::walker_speed(&tuning.movement);
        let follow = ctx.pointer_follow.then(|| ctx.input.pointer()).flatten();
        self.walker = steer(
            self.walker,
            ctx.input,
            follow,
            speed * scale,
            tuning.movement.walker_follow * scale,
        );
        self.walker.x = self.walker.x.clamp(0.0, tuning.world.width);
        self.walker.y = self.walker.y.clamp(0.0, tuning.world.height);

        let (width, height) = (tuning.world.width, tuning.world.height);
        for bullet in &mut self.bullets {
            bullet.x += bullet.vx * scale;
            bullet.y += bullet.vy * scale;
        }
        self.bullets
            .retain(|b| b.x > 0.0 && b.x < width && b.y > 0.0 && b.y < height);

        let radius = tuning.collision.bullet_hit_radius;
        if let Some((bullet_idx, npc_idx)) = collision::bullet_hit(&self.bullets, &self.npcs, radius)
        {
            self.bullets.remove(bullet_idx);
            let npc = self.npcs.remove(npc_idx);
            let penalty = ctx.resources.spend_gold(tuning.collision.collateral_penalty);
            report.push(SimEventKind::BulletHit {
                npc_id: npc.id,
                penalty,
            });
        }
    }

    /// Fire from the walker. Only possible on foot.
    pub fn fire(&mut self, tuning: &TuningConfig) -> bool {
        if self.mode != ControlMode::OnFoot {
            return false;
        }
        let id = self.allocate_id();
        self.bullets.push(Bullet {
            id,
            x: self.walker.x + tuning.collision.bullet_offset_x,
            y: self.walker.y + tuning.collision.bullet_offset_y,
            vx: tuning.collision.bullet_speed,
            vy: 0.0,
        });
        true
    }

    /// Toggle between steering the caravan and walking.
    pub fn toggle_mount(&mut self, tuning: &TuningConfig) -> MountChange {
        match self.mode {
            ControlMode::Caravan => {
                self.mode = ControlMode::OnFoot;
                self.walker = self.caravan;
                self.bullets.clear();
                MountChange::Dismounted
            }
            ControlMode::OnFoot => {
                if self.walker.distance(self.caravan) < tuning.collision.remount_range {
                    self.mode = ControlMode::Caravan;
                    self.bullets.clear();
                    MountChange::Remounted
                } else {
                    MountChange::TooFar
                }
            }
        }
    }

    /// Remove and return the first traveler within horizontal `range` of
    /// the caravan.
    pub fn take_recruit(&mut self, range: f32) -> Option<Passenger> {
        let caravan_x = self.caravan.x;
        let index = self.npcs.iter().position(|npc| {
            matches!(npc.kind, NpcKind::Person { .. }) && (npc.x - caravan_x).abs() < range
        })?;
        match self.npcs.remove(index).kind {
            NpcKind::Person { passenger } => Some(passenger),
            _ => None,
        }
    }

    /// Clear the road for a new journey.
    pub fn begin_journey(&mut self) {
        self.npcs.clear();
        self.spawn_timer_ms = 0.0;
    }
}

fn steer(
    from: Position,
    input: &InputState,
    follow: Option<(f32, f32)>,
    step: f32,
    follow_factor: f32,
) -> Position {
    if let Some((tx, ty)) = follow {
        let factor = follow_factor.min(1.0);
        return Position::new(from.x + (tx - from.x) * factor, from.y + (ty - from.y) * factor);
    }
    let (dx, dy) = input.direction();
    Position::new(from.x + dx * step, from.y + dy * step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EncounterId;
    use crate::resources::{Flag, PassengerType};
    use crate::vehicle::VehicleType;

    struct Rig {
        tuning: TuningConfig,
        catalog: EncounterCatalog,
        resources: ResourceState,
        flags: FlagSet,
        rng: RngBundle,
        input: InputState,
        world: World,
    }

    impl Rig {
        fn new() -> Self {
            let tuning = TuningConfig::default();
            let world = World::new(&tuning);
            Self {
                tuning,
                catalog: EncounterCatalog::builtin().unwrap(),
                resources: ResourceState::initial(),
                flags: FlagSet::new(),
                rng: RngBundle::from_user_seed(9),
                input: InputState::default(),
                world,
            }
        }

        fn tick(&mut self) -> TickReport {
            let mut ctx = TickContext {
                tuning: &self.tuning,
                catalog: &self.catalog,
                resources: &mut self.resources,
                flags: &self.flags,
                rng: &self.rng,
                input: &self.input,
                pointer_follow: false,
            };
            self.world.tick(&mut ctx, 16.0)
        }
    }

    #[test]
    fn idle_tick_drains_base_rate_and_scrolls() {
        let mut rig = Rig::new();
        let report = rig.tick();
        assert!((rig.resources.food - 99.95).abs() < 1e-4);
        assert!((report.food_consumed - 0.05).abs() < 1e-4);
        assert!((rig.resources.progress - 2.5 / 80.0).abs() < 1e-6);
        assert!((rig.world.scroll_offset - 2.5).abs() < 1e-6);
    }

    #[test]
    fn moving_doubles_drain_and_clamps_to_road() {
        let mut rig = Rig::new();
        rig.input.press(Key::Up);
        for _ in 0..100 {
            rig.tick();
        }
        assert!((rig.world.caravan.y - 170.0).abs() < 1e-4);
        assert!((rig.resources.food - 90.0).abs() < 1e-3);
    }

    #[test]
    fn starvation_costs_a_life_then_ends_run() {
        let mut rig = Rig::new();
        rig.resources.food = 0.04;
        let report = rig.tick();
        assert_eq!(rig.resources.lives, 2);
        assert!((rig.resources.food - 50.0).abs() < f32::EPSILON);
        assert!(matches!(
            report.events[0].kind,
            SimEventKind::LifeLost { lives_left: 2 }
        ));

        rig.resources.lives = 1;
        rig.resources.food = 0.04;
        let progress = rig.resources.progress;
        let report = rig.tick();
        assert!(report.starved());
        assert_eq!(rig.resources.lives, 0);
        assert!((rig.resources.progress - progress).abs() < f32::EPSILON);
    }

    #[test]
    fn one_contact_per_tick_coin_first() {
        let mut rig = Rig::new();
        let (x, y) = (rig.world.caravan.x + 2.5, rig.world.caravan.y);
        rig.world.insert_npc(
            x,
            y,
            NpcKind::Trader {
                encounter: EncounterId::FoodCart,
            },
        );
        rig.world.insert_npc(
            x,
            y,
            NpcKind::Coin {
                size: CoinSize::Big,
            },
        );
        let first = rig.tick();
        assert!(first.kinds().any(|k| matches!(
            k,
            SimEventKind::CoinCollected { value: 25, .. }
        )));
        assert!(!first
            .kinds()
            .any(|k| matches!(k, SimEventKind::EncounterTriggered { .. })));
        assert_eq!(rig.resources.gold, 57);
        let second = rig.tick();
        assert!(second.kinds().any(|k| matches!(
            k,
            SimEventKind::EncounterTriggered {
                encounter: EncounterId::FoodCart
            }
        )));
    }

    #[test]
    fn npcs_scroll_and_cull() {
        let mut rig = Rig::new();
        rig.world.insert_npc(-148.0, 160.0, NpcKind::MysteryBox);
        rig.tick();
        assert!(rig.world.npcs.is_empty());
    }

    #[test]
    fn spawner_fires_after_interval() {
        let mut rig = Rig::new();
        let mut spawned = 0;
        for _ in 0..63 {
            spawned += rig
                .tick()
                .kinds()
                .filter(|k| matches!(k, SimEventKind::Spawned { .. }))
                .count();
        }
        assert_eq!(spawned, 1);
    }

    #[test]
    fn new_journey_restarts_spawn_clock() {
        let mut rig = Rig::new();
        for _ in 0..40 {
            rig.tick();
        }
        assert!(rig.world.spawn_timer_ms() > 0.0);
        rig.world.begin_journey();
        assert!(rig.world.spawn_timer_ms().abs() < f32::EPSILON);
        let spawned: usize = (0..62)
            .map(|_| {
                rig.tick()
                    .kinds()
                    .filter(|k| matches!(k, SimEventKind::Spawned { .. }))
                    .count()
            })
            .sum();
        assert_eq!(spawned, 0);
    }

    #[test]
    fn haven_spawns_once_late_in_journey() {
        let mut rig = Rig::new();
        rig.resources.progress = 96.0;
        rig.world.caravan.y = 430.0;
        for _ in 0..200 {
            rig.tick();
            rig.world.caravan.y = 430.0;
        }
        let havens = rig.world.npcs.iter().filter(|n| n.is_haven()).count();
        assert_eq!(havens, 1);
        assert!(rig.world.npcs.iter().all(Npc::is_haven));
    }

    #[test]
    fn on_foot_freezes_world_and_shots_cost_gold() {
        let mut rig = Rig::new();
        assert_eq!(
            rig.world.toggle_mount(&rig.tuning),
            MountChange::Dismounted
        );
        let npc_x = rig.world.walker.x + 40.0;
        rig.world.insert_npc(
            npc_x,
            rig.world.walker.y - 8.0,
            NpcKind::Person {
                passenger: Passenger::traveler(5, PassengerType::Guard),
            },
        );
        assert!(rig.world.fire(&rig.tuning));
        let report = rig.tick();
        assert!(report.kinds().any(|k| matches!(
            k,
            SimEventKind::BulletHit { penalty: 5, .. }
        )));
        assert_eq!(rig.resources.gold, 27);
        assert!((rig.resources.food - 100.0).abs() < f32::EPSILON);
        assert!(rig.resources.progress.abs() < f32::EPSILON);
        assert!(rig.world.bullets.is_empty());
    }

    #[test]
    fn remount_needs_proximity() {
        let mut rig = Rig::new();
        rig.world.toggle_mount(&rig.tuning);
        rig.world.walker.x += 100.0;
        assert_eq!(rig.world.toggle_mount(&rig.tuning), MountChange::TooFar);
        rig.world.walker.x -= 30.0;
        assert_eq!(rig.world.toggle_mount(&rig.tuning), MountChange::Remounted);
        assert!(!rig.world.fire(&rig.tuning));
    }

    #[test]
    fn vehicle_and_upgrade_shape_speed() {
        let mut rig = Rig::new();
        rig.resources.vehicle = VehicleType::Bike;
        rig.flags.set(Flag::SpeedUpgrade);
        rig.input.press(Key::Right);
        let x = rig.world.caravan.x;
        rig.tick();
        assert!((rig.world.caravan.x - x - 9.8).abs() < 1e-4);
        assert!((rig.resources.progress - 3.5 / 80.0).abs() < 1e-6);
    }

    #[test]
    fn recruit_takes_nearest_traveler_by_column() {
        let mut rig = Rig::new();
        let x = rig.world.caravan.x + 50.0;
        rig.world.insert_npc(
            x,
            160.0,
            NpcKind::Person {
                passenger: Passenger::traveler(3, PassengerType::Scholar),
            },
        );
        let recruit = rig.world.take_recruit(60.0).unwrap();
        assert_eq!(recruit.kind, PassengerType::Scholar);
        assert!(rig.world.take_recruit(60.0).is_none());
    }
}
