//! Top-level game status machine.
//!
//! Every overlay, modal and terminal state is one variant of [`GameStatus`];
//! input handlers request transitions through [`StatusMachine::apply`] and an
//! illegal request is rejected instead of silently corrupting state.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Playing,
    Paused,
    Settings,
    Encounter,
    Lottery,
    VehicleSelect,
    GameOver,
    Victory,
    Exited,
}

impl GameStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Settings => "settings",
            Self::Encounter => "encounter",
            Self::Lottery => "lottery",
            Self::VehicleSelect => "vehicle_select",
            Self::GameOver => "gameover",
            Self::Victory => "victory",
            Self::Exited => "exit",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Victory | Self::Exited)
    }

    /// Modal states hold exclusive input focus.
    #[must_use]
    pub const fn is_modal(self) -> bool {
        matches!(self, Self::Encounter | Self::Lottery | Self::VehicleSelect)
    }

    /// Whether the simulation loop may mutate the world.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    Pause,
    Resume,
    OpenSettings,
    CloseSettings,
    OpenEncounter,
    CloseEncounter,
    OpenLottery,
    CloseLottery,
    OpenHangar,
    CloseHangar,
    Starve,
    EndJourney,
    Abandon,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {event:?} while {from}")]
pub struct TransitionError {
    pub from: GameStatus,
    pub event: StatusEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusMachine {
    status: GameStatus,
}

impl StatusMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: GameStatus::Playing,
        }
    }

    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// Target status for `event` from `from`, if legal.
    #[must_use]
    pub const fn target(from: GameStatus, event: StatusEvent) -> Option<GameStatus> {
        use GameStatus as S;
        use StatusEvent as E;
        let next = match (from, event) {
            (S::Playing, E::Pause) => S::Paused,
            (S::Paused, E::Resume) => S::Playing,
            (S::Paused, E::Abandon) => S::Exited,
            (S::Playing, E::OpenSettings) => S::Settings,
            (S::Settings, E::CloseSettings) => S::Playing,
            (S::Playing, E::OpenEncounter) => S::Encounter,
            (S::Encounter, E::CloseEncounter) => S::Playing,
            (S::Encounter, E::EndJourney) => S::Victory,
            (S::Playing, E::OpenLottery) => S::Lottery,
            (S::Lottery, E::CloseLottery) => S::Playing,
            (S::Playing, E::OpenHangar) => S::VehicleSelect,
            (S::VehicleSelect, E::CloseHangar) => S::Playing,
            (S::Playing, E::Starve) => S::GameOver,
            (S::GameOver | S::Victory | S::Exited, E::Restart) => S::Playing,
            _ => return None,
        };
        Some(next)
    }

    /// Apply a transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `event` is not legal from the
    /// current status; the status is left unchanged.
    pub fn apply(&mut self, event: StatusEvent) -> Result<GameStatus, TransitionError> {
        let from = self.status;
        let next = Self::target(from, event).ok_or(TransitionError { from, event })?;
        self.status = next;
        Ok(next)
    }

    #[must_use]
    pub const fn can(&self, event: StatusEvent) -> bool {
        Self::target(self.status, event).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_round_trip() {
        let mut machine = StatusMachine::new();
        assert_eq!(machine.apply(StatusEvent::Pause), Ok(GameStatus::Paused));
        assert_eq!(machine.apply(StatusEvent::Resume), Ok(GameStatus::Playing));
    }

    #[test]
    fn cannot_open_two_modals() {
        let mut machine = StatusMachine::new();
        machine.apply(StatusEvent::OpenEncounter).unwrap();
        let err = machine.apply(StatusEvent::OpenLottery).unwrap_err();
        assert_eq!(err.from, GameStatus::Encounter);
        assert_eq!(machine.status(), GameStatus::Encounter);
    }

    #[test]
    fn terminal_states_only_restart() {
        let mut machine = StatusMachine::new();
        machine.apply(StatusEvent::Starve).unwrap();
        assert!(machine.status().is_terminal());
        for event in [
            StatusEvent::Pause,
            StatusEvent::OpenEncounter,
            StatusEvent::Abandon,
            StatusEvent::Resume,
        ] {
            assert!(!machine.can(event));
        }
        assert_eq!(machine.apply(StatusEvent::Restart), Ok(GameStatus::Playing));
    }

    #[test]
    fn abandon_requires_pause() {
        let mut machine = StatusMachine::new();
        assert!(machine.apply(StatusEvent::Abandon).is_err());
        machine.apply(StatusEvent::Pause).unwrap();
        assert_eq!(machine.apply(StatusEvent::Abandon), Ok(GameStatus::Exited));
    }

    #[test]
    fn victory_only_from_encounter() {
        let mut machine = StatusMachine::new();
        assert!(machine.apply(StatusEvent::EndJourney).is_err());
        machine.apply(StatusEvent::OpenEncounter).unwrap();
        assert_eq!(
            machine.apply(StatusEvent::EndJourney),
            Ok(GameStatus::Victory)
        );
        assert_eq!(GameStatus::Victory.to_string(), "victory");
    }
}
