//! Spawn director: decides what appears at the right edge of the road.
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{SpawnConfig, WorldConfig};
use crate::data::{EncounterCatalog, EncounterId};
use crate::resources::{Passenger, PassengerType};
use crate::rng::pick_index;
use crate::sim::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSize {
    Small,
    Big,
}

/// What an NPC is and what touching it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NpcKind {
    Trader { encounter: EncounterId },
    Coin { size: CoinSize },
    MysteryBox,
    Person { passenger: Passenger },
    Haven,
}

impl NpcKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trader { .. } => "trader",
            Self::Coin { .. } => "coin",
            Self::MysteryBox => "mystery_box",
            Self::Person { .. } => "person",
            Self::Haven => "haven",
        }
    }
}

/// A transient entity scrolling toward the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: NpcKind,
    pub speed_multiplier: f32,
}

impl Npc {
    #[must_use]
    pub const fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    /// Encounter raised when the caravan runs into this NPC.
    #[must_use]
    pub const fn encounter(&self) -> Option<EncounterId> {
        match &self.kind {
            NpcKind::Trader { encounter } => Some(*encounter),
            NpcKind::Haven => Some(EncounterId::HavenCheckpoint),
            NpcKind::Coin { .. } | NpcKind::MysteryBox | NpcKind::Person { .. } => None,
        }
    }

    /// Only traders and travelers can be hit by the walker's shots.
    #[must_use]
    pub const fn is_shootable(&self) -> bool {
        matches!(self.kind, NpcKind::Trader { .. } | NpcKind::Person { .. })
    }

    #[must_use]
    pub const fn is_haven(&self) -> bool {
        matches!(self.kind, NpcKind::Haven)
    }

    /// Render footprint in world units.
    #[must_use]
    pub const fn size(&self) -> f32 {
        match self.kind {
            NpcKind::Coin { .. } | NpcKind::MysteryBox => 32.0,
            _ => 48.0,
        }
    }
}

/// Borrowing view over the tuning and catalog the director needs.
#[derive(Debug, Clone, Copy)]
pub struct SpawnDirector<'a> {
    spawn: &'a SpawnConfig,
    world: &'a WorldConfig,
    catalog: &'a EncounterCatalog,
}

impl<'a> SpawnDirector<'a> {
    #[must_use]
    pub const fn new(
        spawn: &'a SpawnConfig,
        world: &'a WorldConfig,
        catalog: &'a EncounterCatalog,
    ) -> Self {
        Self {
            spawn,
            world,
            catalog,
        }
    }

    /// Decide the kind of the next NPC from a single partition draw.
    pub fn choose_kind<R: Rng + ?Sized>(&self, progress: f32, id: u32, rng: &mut R) -> NpcKind {
        let roll = rng.r#gen::<f32>();
        if roll < self.spawn.mystery_threshold {
            return NpcKind::MysteryBox;
        }
        if roll < self.spawn.coin_threshold {
            let size = if rng.r#gen::<f32>() < self.spawn.big_coin_chance {
                CoinSize::Big
            } else {
                CoinSize::Small
            };
            return NpcKind::Coin { size };
        }
        if roll < self.spawn.person_threshold && progress < self.spawn.recruit_cutoff_progress {
            let idx = pick_index(rng, PassengerType::ALL.len()).unwrap_or(0);
            let kind = PassengerType::ALL[idx];
            return NpcKind::Person {
                passenger: Passenger::traveler(id, kind),
            };
        }
        self.encounter_kind(progress, rng)
    }

    fn encounter_kind<R: Rng + ?Sized>(&self, progress: f32, rng: &mut R) -> NpcKind {
        let pool: Vec<EncounterId> = self.catalog.spawn_pool().map(|e| e.id).collect();
        let mut encounter = pick_index(rng, pool.len())
            .map_or(EncounterId::Waystation, |idx| pool[idx]);
        if (self.spawn.waystation_min..=self.spawn.waystation_max).contains(&progress) {
            encounter = EncounterId::Waystation;
        }
        if progress >= self.spawn.haven_progress {
            return NpcKind::Haven;
        }
        NpcKind::Trader { encounter }
    }

    /// Build a fully placed NPC just beyond the right world edge.
    pub fn spawn<R: Rng + ?Sized>(&self, progress: f32, id: u32, rng: &mut R) -> Npc {
        let kind = self.choose_kind(progress, id, rng);
        let npc = self.place(kind, id, rng);
        debug!(
            "spawned {} #{} at y={:.1} (progress {:.1})",
            npc.kind.as_str(),
            npc.id,
            npc.y,
            progress
        );
        npc
    }

    /// Place the haven checkpoint regardless of the partition draw.
    pub fn spawn_haven<R: Rng + ?Sized>(&self, id: u32, rng: &mut R) -> Npc {
        let npc = self.place(NpcKind::Haven, id, rng);
        debug!("spawned haven #{} at y={:.1}", npc.id, npc.y);
        npc
    }

    fn place<R: Rng + ?Sized>(&self, kind: NpcKind, id: u32, rng: &mut R) -> Npc {
        let lane = self.world.road_bottom - self.world.road_top - self.spawn.lane_padding;
        let y = self.world.road_top + rng.r#gen::<f32>() * lane.max(0.0);
        let span = self.spawn.npc_speed_max - self.spawn.npc_speed_min;
        let speed_multiplier = self.spawn.npc_speed_min + rng.r#gen::<f32>() * span;
        Npc {
            id,
            x: self.world.width + self.spawn.offset_x,
            y,
            kind,
            speed_multiplier,
        }
    }
}
