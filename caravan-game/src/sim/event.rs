//! Structured outcomes emitted by a simulation tick.
//!
//! The tick never touches audio, notifications or the status machine
//! directly; it reports what happened and the session reacts.
use serde::Serialize;

use crate::data::EncounterId;
use crate::spawn::CoinSize;

/// Stable identifier: tick counter plus sequence within the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventId {
    pub tick: u64,
    pub seq: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEventKind {
    CoinCollected { size: CoinSize, value: u32 },
    MysteryBoxOpened,
    EncounterTriggered { encounter: EncounterId },
    LifeLost { lives_left: u8 },
    Starved,
    BulletHit { npc_id: u32, penalty: u32 },
    Spawned { npc_id: u32, kind: &'static str },
}

impl SimEventKind {
    #[must_use]
    pub const fn severity(&self) -> EventSeverity {
        match self {
            Self::LifeLost { .. } | Self::BulletHit { .. } => EventSeverity::Warning,
            Self::Starved => EventSeverity::Critical,
            _ => EventSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimEvent {
    pub id: EventId,
    pub severity: EventSeverity,
    #[serde(flatten)]
    pub kind: SimEventKind,
}

/// Everything one tick produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<SimEvent>,
    pub food_consumed: f32,
    pub distance: f32,
}

impl TickReport {
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    pub fn push(&mut self, kind: SimEventKind) {
        let seq = u16::try_from(self.events.len()).unwrap_or(u16::MAX);
        self.events.push(SimEvent {
            id: EventId {
                tick: self.tick,
                seq,
            },
            severity: kind.severity(),
            kind,
        });
    }

    pub fn kinds(&self) -> impl Iterator<Item = &SimEventKind> + '_ {
        self.events.iter().map(|event| &event.kind)
    }

    #[must_use]
    pub fn starved(&self) -> bool {
        self.kinds().any(|kind| matches!(kind, SimEventKind::Starved))
    }
}
