//! Caravan Game Engine
//!
//! Platform-agnostic core logic for the Caravan real-time survival game.
//! This crate owns the simulation, encounters, mini-games and run reporting;
//! rendering, windowing and audio output belong to the front-end.

pub mod audio;
pub mod config;
pub mod constants;
pub mod data;
pub mod encounters;
pub mod lottery;
pub mod notifications;
pub mod numbers;
pub mod report;
pub mod resources;
pub mod rng;
pub mod session;
pub mod settings;
pub mod sim;
pub mod snapshot;
pub mod spawn;
pub mod state;
pub mod vehicle;

// Re-export commonly used types
pub use audio::{AudioBackend, AudioSubsystem, RecordingBackend, SoundCue, Synth, Tone};
pub use config::{ConfigError, TuningConfig};
pub use data::{CatalogError, Choice, ChoiceAction, Encounter, EncounterCatalog, EncounterId};
pub use encounters::{ActiveEncounter, ChoiceGate, EncounterPhase, Resolution};
pub use lottery::LotteryWheel;
pub use notifications::{Notifier, Toast};
pub use report::{
    EndType, MemorySink, SessionReport, SessionSink, SessionStats, SinkError, VictoryType,
};
pub use resources::{Flag, FlagSet, Passenger, PassengerType, ResourceState};
pub use rng::RngBundle;
pub use session::GameSession;
pub use settings::PlayerSettings;
pub use sim::{ControlMode, Key, SimEventKind, TickReport, World};
pub use snapshot::FrameSnapshot;
pub use spawn::{Npc, NpcKind};
pub use state::{GameStatus, StatusEvent, StatusMachine, TransitionError};
pub use vehicle::{PurchaseOutcome, VehicleType};

use anyhow::Context;
use thiserror::Error;

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the encounter catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_catalog(&self) -> Result<EncounterCatalog, Self::Error>;

    /// Load balance tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the tuning cannot be read or fails validation.
    fn load_tuning(&self) -> Result<TuningConfig, Self::Error>;
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("tuning JSON is malformed: {0}")]
    TuningParse(#[from] serde_json::Error),
    #[error(transparent)]
    Tuning(#[from] ConfigError),
}

/// Loader for the compiled-in catalog and default tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

impl DataLoader for BuiltinLoader {
    type Error = LoadError;

    fn load_catalog(&self) -> Result<EncounterCatalog, Self::Error> {
        Ok(EncounterCatalog::builtin()?)
    }

    fn load_tuning(&self) -> Result<TuningConfig, Self::Error> {
        Ok(TuningConfig::default())
    }
}

/// Loader over JSON documents; a missing tuning document means defaults.
#[derive(Debug, Clone, Default)]
pub struct JsonLoader {
    pub catalog: Option<String>,
    pub tuning: Option<String>,
}

impl DataLoader for JsonLoader {
    type Error = LoadError;

    fn load_catalog(&self) -> Result<EncounterCatalog, Self::Error> {
        match &self.catalog {
            Some(json) => Ok(EncounterCatalog::load(json)?),
            None => Ok(EncounterCatalog::builtin()?),
        }
    }

    fn load_tuning(&self) -> Result<TuningConfig, Self::Error> {
        let tuning = match &self.tuning {
            Some(json) => TuningConfig::from_json(json)?,
            None => TuningConfig::default(),
        };
        tuning.validate()?;
        Ok(tuning)
    }
}

/// Main game engine for creating sessions
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: SessionSink + Clone + 'static,
{
    data_loader: L,
    sink: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: SessionSink + Clone + 'static,
{
    /// Create a new engine with the provided data loader and report sink
    pub const fn new(data_loader: L, sink: S) -> Self {
        Self { data_loader, sink }
    }

    /// Start a session wired to this engine's sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or tuning cannot be loaded.
    pub fn create_session(&self, player: &str, seed: u64) -> Result<GameSession, L::Error> {
        let catalog = self.data_loader.load_catalog()?;
        let tuning = self.data_loader.load_tuning()?;
        Ok(GameSession::new(player, seed, tuning, catalog).with_sink(Box::new(self.sink.clone())))
    }

    /// Start a session with a front-end's persisted player settings.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the settings JSON is malformed.
    pub fn create_session_with_settings(
        &self,
        player: &str,
        seed: u64,
        settings_json: &str,
    ) -> Result<GameSession, anyhow::Error> {
        let settings =
            PlayerSettings::from_json(settings_json).context("malformed player settings")?;
        let session = self.create_session(player, seed)?;
        Ok(session.with_settings(settings))
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_sessions_report_to_shared_sink() {
        let engine = GameEngine::new(BuiltinLoader, MemorySink::new());
        let mut session = engine.create_session("Ada", 5).unwrap();
        session.toggle_pause();
        assert!(session.abandon());
        assert_eq!(engine.sink().len(), 1);
        assert_eq!(engine.sink().last().unwrap().player, "Ada");
    }

    #[test]
    fn json_loader_rejects_bad_tuning() {
        let loader = JsonLoader {
            catalog: None,
            tuning: Some(r#"{"food":{"drain_rate":-1.0}}"#.to_string()),
        };
        let engine = GameEngine::new(loader, MemorySink::new());
        let err = engine.create_session("Ada", 1).unwrap_err();
        assert!(matches!(err, LoadError::Tuning(_)));
    }

    #[test]
    fn persisted_settings_are_applied_and_clamped() {
        let engine = GameEngine::new(BuiltinLoader, MemorySink::new());
        let session = engine
            .create_session_with_settings(
                "Ada",
                2,
                r#"{"music_volume":1.7,"pointer_follow":true}"#,
            )
            .unwrap();
        assert!((session.settings().music_volume - 1.0).abs() < f32::EPSILON);
        assert!(session.settings().pointer_follow);

        let err = engine
            .create_session_with_settings("Ada", 2, "{not json")
            .unwrap_err();
        assert!(err.to_string().contains("malformed player settings"));
    }

    #[test]
    fn json_loader_defaults_when_empty() {
        let loader = JsonLoader::default();
        assert!(loader.load_catalog().is_ok());
        assert_eq!(loader.load_tuning().unwrap(), TuningConfig::default());
    }
}
