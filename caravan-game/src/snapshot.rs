//! Read-only per-frame view handed to renderers.
use serde::Serialize;

use crate::data::{EncounterId, LotteryReward};
use crate::encounters::{ActiveEncounter, ChoiceGate, EncounterPhase, Resolution};
use crate::lottery::{LotteryWheel, WheelPhase};
use crate::notifications::Toast;
use crate::resources::{Flag, Passenger};
use crate::settings::{PlayerSettings, Theme};
use crate::sim::{Bullet, ControlMode, Position};
use crate::spawn::Npc;
use crate::state::GameStatus;
use crate::vehicle::VehicleType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceView {
    /// Key that picks this choice.
    pub ordinal: usize,
    pub id: String,
    pub text: String,
    pub enabled: bool,
    pub gate: ChoiceGate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterView {
    pub id: EncounterId,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub choices: Vec<ChoiceView>,
    pub resolution: Option<Resolution>,
}

impl EncounterView {
    #[must_use]
    pub fn new(active: &ActiveEncounter, gates: &[ChoiceGate]) -> Self {
        let encounter = active.encounter();
        let choices = encounter
            .choices
            .iter()
            .zip(gates)
            .enumerate()
            .map(|(idx, (choice, gate))| ChoiceView {
                ordinal: idx + 1,
                id: choice.id.clone(),
                text: choice.text.clone(),
                enabled: gate.is_available(),
                gate: *gate,
            })
            .collect();
        let resolution = match active.phase() {
            EncounterPhase::Resolved(resolution) => Some(resolution.clone()),
            EncounterPhase::Unresolved => None,
        };
        Self {
            id: encounter.id,
            title: encounter.title.clone(),
            description: encounter.description.clone(),
            icon: encounter.icon.clone(),
            choices,
            resolution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotteryView {
    pub rewards: Vec<LotteryReward>,
    pub rotation: u32,
    pub phase: WheelPhase,
    pub can_close: bool,
    pub landed: Option<LotteryReward>,
}

impl LotteryView {
    #[must_use]
    pub fn new(wheel: &LotteryWheel, rewards: &[LotteryReward]) -> Self {
        Self {
            rewards: rewards.to_vec(),
            rotation: wheel.rotation(),
            phase: wheel.phase(),
            can_close: wheel.can_close(),
            landed: wheel.landed().and_then(|idx| rewards.get(idx).cloned()),
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub status: GameStatus,
    pub mode: ControlMode,
    pub caravan: Position,
    pub walker: Position,
    pub npcs: Vec<Npc>,
    pub bullets: Vec<Bullet>,
    pub scroll_offset: f32,
    pub progress: f32,
    pub food: f32,
    pub gold: u32,
    pub reputation: u32,
    pub lives: u8,
    pub journey_count: u32,
    pub passengers: Vec<Passenger>,
    pub capacity: usize,
    pub vehicle: VehicleType,
    pub flags: Vec<Flag>,
    pub encounter: Option<EncounterView>,
    pub lottery: Option<LotteryView>,
    pub toasts: Vec<Toast>,
    pub settings: PlayerSettings,
    pub theme: Theme,
}
