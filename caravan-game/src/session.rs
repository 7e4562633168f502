//! A single run: input interpretation, the frame driver and terminal reporting.
//!
//! [`GameSession`] owns every piece of mutable run state. Front-ends feed it
//! raw input and elapsed time and read back a [`FrameSnapshot`]; they never
//! reach into the world directly.
use log::{debug, info, warn};

use crate::audio::{AudioBackend, AudioSubsystem, SoundCue};
use crate::config::TuningConfig;
use crate::data::{ChoiceAction, EncounterCatalog, EncounterId};
use crate::encounters::{
    ActiveEncounter, Resolution, crew_trade_encounter, pick_trade_encounter,
    remove_random_passenger, replace_random_passenger,
};
use crate::lottery::LotteryWheel;
use crate::notifications::{Notifier, Toasts};
use crate::report::{EndType, SessionReport, SessionSink, SessionStats};
use crate::resources::{FlagSet, ResourceState};
use crate::rng::RngBundle;
use crate::settings::PlayerSettings;
use crate::sim::{
    ControlMode, InputState, Key, MountChange, SimEventKind, TickContext, TickReport, World,
};
use crate::snapshot::{EncounterView, FrameSnapshot, LotteryView};
use crate::state::{GameStatus, StatusEvent, StatusMachine};
use crate::vehicle::{self, PurchaseOutcome, VehicleType};

pub struct GameSession {
    player: String,
    tuning: TuningConfig,
    catalog: EncounterCatalog,
    rng: RngBundle,
    machine: StatusMachine,
    world: World,
    resources: ResourceState,
    flags: FlagSet,
    input: InputState,
    encounter: Option<ActiveEncounter>,
    lottery: Option<LotteryWheel>,
    settings: PlayerSettings,
    audio: AudioSubsystem,
    parked_audio: Option<Box<dyn AudioBackend>>,
    toasts: Toasts,
    stats: SessionStats,
    notifier: Option<Box<dyn Notifier>>,
    sink: Option<Box<dyn SessionSink>>,
    report: Option<SessionReport>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("player", &self.player)
            .field("seed", &self.rng.seed())
            .field("status", &self.machine.status())
            .field("resources", &self.resources)
            .field("flags", &self.flags)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Start a run in the `Playing` state.
    #[must_use]
    pub fn new(player: &str, seed: u64, tuning: TuningConfig, catalog: EncounterCatalog) -> Self {
        let world = World::new(&tuning);
        let mut session = Self {
            player: player.to_string(),
            tuning,
            catalog,
            rng: RngBundle::from_user_seed(seed),
            machine: StatusMachine::new(),
            world,
            resources: ResourceState::initial(),
            flags: FlagSet::new(),
            input: InputState::default(),
            encounter: None,
            lottery: None,
            settings: PlayerSettings::default(),
            audio: AudioSubsystem::detached(),
            parked_audio: None,
            toasts: Toasts::new(),
            stats: SessionStats::default(),
            notifier: None,
            sink: None,
            report: None,
        };
        info!("session started for {player} with seed {seed}");
        session.notify(format!("Welcome {player}! Game started."));
        session
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn SessionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings.normalized();
        self
    }

    /// Attach an output device and start the background loops.
    pub fn attach_audio(&mut self, backend: Box<dyn AudioBackend>) {
        self.parked_audio = None;
        self.audio.init(backend, &self.settings);
    }

    // Accessors ------------------------------------------------------------

    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.machine.status()
    }

    #[must_use]
    pub const fn resources(&self) -> &ResourceState {
        &self.resources
    }

    /// Direct resource access for scripted scenarios.
    pub fn resources_mut(&mut self) -> &mut ResourceState {
        &mut self.resources
    }

    #[must_use]
    pub const fn flags(&self) -> &FlagSet {
        &self.flags
    }

    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for scripted scenarios.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub const fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    #[must_use]
    pub const fn catalog(&self) -> &EncounterCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    #[must_use]
    pub const fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    #[must_use]
    pub const fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    #[must_use]
    pub const fn active_encounter(&self) -> Option<&ActiveEncounter> {
        self.encounter.as_ref()
    }

    #[must_use]
    pub const fn lottery(&self) -> Option<&LotteryWheel> {
        self.lottery.as_ref()
    }

    /// The report delivered at the last terminal transition.
    #[must_use]
    pub const fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        ResourceState::capacity(&self.flags, &self.tuning.crew)
    }

    #[must_use]
    pub const fn audio(&self) -> &AudioSubsystem {
        &self.audio
    }

    // Input ----------------------------------------------------------------

    /// Raw DOM-style key name. Unknown keys are ignored.
    pub fn key_down(&mut self, name: &str) {
        match name.parse::<Key>() {
            Ok(key) => self.press(key),
            Err(()) => debug!("ignored key `{name}`"),
        }
    }

    pub fn key_up(&mut self, name: &str) {
        if let Ok(key) = name.parse::<Key>() {
            self.input.release(key);
        }
    }

    /// Interpret one key press against the current status.
    pub fn press(&mut self, key: Key) {
        let status = self.status();
        let on_caravan = self.world.mode == ControlMode::Caravan;
        match key {
            Key::Escape => self.escape(),
            Key::Space
                if matches!(
                    status,
                    GameStatus::Playing | GameStatus::Paused | GameStatus::Settings
                ) =>
            {
                self.escape();
            }
            Key::Settings if matches!(status, GameStatus::Playing | GameStatus::Settings) => {
                let event = if status == GameStatus::Settings {
                    StatusEvent::CloseSettings
                } else {
                    StatusEvent::OpenSettings
                };
                if self.transition(event) {
                    self.cue(SoundCue::Select);
                }
            }
            Key::CrewTrade if status == GameStatus::Playing && on_caravan => {
                let encounter = crew_trade_encounter(&self.resources, &self.catalog);
                if self.open_encounter(ActiveEncounter::new(encounter)) {
                    self.cue(SoundCue::Select);
                }
            }
            Key::CrewTrade
                if status == GameStatus::Encounter
                    && self
                        .encounter
                        .as_ref()
                        .is_some_and(|active| active.id() == EncounterId::PassengerTrade) =>
            {
                self.close_encounter();
                self.cue(SoundCue::Select);
            }
            Key::Hangar if status == GameStatus::Playing && on_caravan => {
                if self.transition(StatusEvent::OpenHangar) {
                    self.cue(SoundCue::Select);
                }
            }
            Key::Trade if status == GameStatus::Playing && on_caravan => {
                let picked = pick_trade_encounter(&self.catalog, &mut *self.rng.encounter());
                if let Some(encounter) = picked
                    && self.open_encounter(ActiveEncounter::new(encounter))
                {
                    self.cue(SoundCue::Confirm);
                }
            }
            Key::Mount if status == GameStatus::Playing => {
                match self.world.toggle_mount(&self.tuning) {
                    MountChange::Dismounted => self.cue(SoundCue::Onboard),
                    MountChange::Remounted => self.cue(SoundCue::Confirm),
                    MountChange::TooFar => debug!("walker too far to remount"),
                }
            }
            Key::Recruit if status == GameStatus::Playing && on_caravan => self.recruit(),
            Key::Digit(n) if status == GameStatus::Encounter => {
                self.select_choice(usize::from(n));
            }
            Key::Space | Key::Enter if status == GameStatus::Encounter => {
                self.acknowledge();
            }
            key if key.is_movement() => self.input.press(key),
            other => debug!("key {other:?} ignored while {status}"),
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.input.set_pointer(x, y);
    }

    /// Fire a shot from the walker.
    pub fn pointer_down(&mut self) -> bool {
        if self.status() != GameStatus::Playing || !self.world.fire(&self.tuning) {
            return false;
        }
        self.stats.bullets_shot += 1;
        self.cue(SoundCue::Shoot);
        true
    }

    // Overlays -------------------------------------------------------------

    fn escape(&mut self) {
        let event = match self.status() {
            GameStatus::Settings => StatusEvent::CloseSettings,
            GameStatus::VehicleSelect => StatusEvent::CloseHangar,
            GameStatus::Playing => StatusEvent::Pause,
            GameStatus::Paused => StatusEvent::Resume,
            other => {
                debug!("escape ignored while {other}");
                return;
            }
        };
        if self.transition(event) {
            self.input.clear();
            self.cue(SoundCue::Select);
        }
    }

    /// Flip between `Playing` and `Paused`.
    pub fn toggle_pause(&mut self) -> bool {
        let event = match self.status() {
            GameStatus::Playing => StatusEvent::Pause,
            GameStatus::Paused => StatusEvent::Resume,
            other => {
                debug!("pause ignored while {other}");
                return false;
            }
        };
        let changed = self.transition(event);
        if changed {
            self.input.clear();
            self.cue(SoundCue::Select);
        }
        changed
    }

    /// Leave the run from the pause menu.
    pub fn abandon(&mut self) -> bool {
        if !self.transition(StatusEvent::Abandon) {
            return false;
        }
        self.finish(EndType::Exit);
        true
    }

    /// Close whichever closable overlay is open.
    pub fn close_modal(&mut self) -> bool {
        let event = match self.status() {
            GameStatus::Settings => StatusEvent::CloseSettings,
            GameStatus::VehicleSelect => StatusEvent::CloseHangar,
            GameStatus::Lottery => {
                if self.lottery.as_ref().is_some_and(|wheel| !wheel.can_close()) {
                    debug!("lottery cannot close mid-spin");
                    return false;
                }
                StatusEvent::CloseLottery
            }
            other => {
                debug!("nothing to close while {other}");
                return false;
            }
        };
        let closed = self.transition(event);
        if closed {
            self.lottery = None;
            self.cue(SoundCue::Select);
        }
        closed
    }

    pub fn set_settings(&mut self, settings: PlayerSettings) {
        self.settings = settings.normalized();
        self.audio.apply_settings(&self.settings);
    }

    // Encounters -----------------------------------------------------------

    /// Raise a catalog encounter by id.
    pub fn open_catalog_encounter(&mut self, id: EncounterId) -> bool {
        let Some(encounter) = self.catalog.get(id).cloned() else {
            debug!("encounter {id} not in catalog");
            return false;
        };
        self.open_encounter(ActiveEncounter::new(encounter))
    }

    fn open_encounter(&mut self, active: ActiveEncounter) -> bool {
        if !self.transition(StatusEvent::OpenEncounter) {
            return false;
        }
        debug!("encounter {} opened", active.id());
        self.stats.encounters_triggered += 1;
        self.input.clear();
        self.encounter = Some(active);
        true
    }

    /// Pick the choice at a 1-based ordinal. Gated or out-of-range picks are
    /// no-ops.
    pub fn select_choice(&mut self, ordinal: usize) -> bool {
        if self.status() != GameStatus::Encounter {
            return false;
        }
        let Some(active) = self.encounter.as_mut() else {
            return false;
        };
        let applied = match active.choose(ordinal, &mut self.resources, &mut self.flags) {
            Ok(resolution) => resolution.applied,
            Err(err) => {
                debug!("choice rejected: {err}");
                return false;
            }
        };
        self.stats.choices_made += 1;
        self.stats.earn(applied.gold_earned());
        self.stats.spend(applied.gold_spent());
        self.cue(SoundCue::Money);
        true
    }

    /// Dismiss a resolved encounter and run its action.
    pub fn acknowledge(&mut self) -> bool {
        if self.status() != GameStatus::Encounter
            || !self.encounter.as_ref().is_some_and(ActiveEncounter::is_resolved)
        {
            return false;
        }
        self.cue(SoundCue::Confirm);
        self.close_encounter();
        true
    }

    fn close_encounter(&mut self) {
        let Some(active) = self.encounter.take() else {
            return;
        };
        let (resolution, recruit) = active.finish();
        match resolution.as_ref().and_then(|r: &Resolution| r.action) {
            Some(ChoiceAction::ContinueJourney) => {
                self.resources.journey_count += 1;
                self.resources.progress = 0.0;
                self.world.begin_journey();
                info!("journey {} begins", self.resources.journey_count);
            }
            Some(ChoiceAction::EndJourney) => {
                if self.transition(StatusEvent::EndJourney) {
                    self.cue(SoundCue::Victory);
                    self.finish(EndType::Victory);
                }
                return;
            }
            Some(ChoiceAction::RemovePassenger) => {
                if let Some(gone) =
                    remove_random_passenger(&mut self.resources, &mut *self.rng.crew())
                {
                    debug!("{} left the caravan", gone.kind);
                }
            }
            Some(ChoiceAction::ReplacePassenger) => {
                if let Some(recruit) = recruit {
                    replace_random_passenger(&mut self.resources, recruit, &mut *self.rng.crew());
                    self.stats.passengers_onboarded += 1;
                }
            }
            None => {}
        }
        self.transition(StatusEvent::CloseEncounter);
    }

    fn recruit(&mut self) {
        let Some(recruit) = self.world.take_recruit(self.tuning.collision.interaction_range)
        else {
            return;
        };
        if self.resources.passengers.len() < self.capacity() {
            let reward = self.tuning.crew.recruit_reward;
            debug!("{} recruited", recruit.kind);
            self.resources.passengers.push(recruit);
            self.resources.earn_gold(reward);
            self.stats.earn(reward);
            self.stats.passengers_onboarded += 1;
            self.cue(SoundCue::Onboard);
            self.cue(SoundCue::Coin);
            self.notify(format!("Passenger onboarded! +{reward} gold."));
        } else {
            let active = ActiveEncounter::replacement(recruit, &self.tuning.crew);
            if self.open_encounter(active) {
                self.cue(SoundCue::Select);
            }
        }
    }

    // Mini-games -----------------------------------------------------------

    /// Buy or switch vehicles in the hangar.
    pub fn select_vehicle(&mut self, vehicle: VehicleType) -> Option<PurchaseOutcome> {
        if self.status() != GameStatus::VehicleSelect {
            return None;
        }
        let outcome = vehicle::select_vehicle(&mut self.resources, vehicle);
        match outcome {
            PurchaseOutcome::Purchased { cost } => {
                self.stats.spend(cost);
                self.stats.vehicle_changes += 1;
                self.cue(SoundCue::Confirm);
            }
            PurchaseOutcome::AlreadyOwned => self.cue(SoundCue::Select),
            PurchaseOutcome::Unaffordable { cost, gold } => {
                debug!("{vehicle} costs {cost}, only {gold} gold");
            }
        }
        if outcome.closes_hangar() {
            self.transition(StatusEvent::CloseHangar);
        }
        Some(outcome)
    }

    pub fn spin_lottery(&mut self) -> bool {
        if self.status() != GameStatus::Lottery {
            return false;
        }
        let Some(wheel) = self.lottery.as_mut() else {
            return false;
        };
        let started = wheel.spin(&self.tuning.lottery, &mut *self.rng.lottery());
        if started {
            self.cue(SoundCue::Confirm);
        }
        started
    }

    /// Trade the landed reward for gold and return to the road.
    pub fn claim_lottery(&mut self) -> Option<u32> {
        if self.status() != GameStatus::Lottery {
            return None;
        }
        let index = self.lottery.as_ref()?.landed()?;
        let value = self.catalog.lottery_rewards.get(index)?.trade_value();
        self.resources.earn_gold(value);
        self.stats.earn(value);
        self.lottery = None;
        self.transition(StatusEvent::CloseLottery);
        self.cue(SoundCue::Money);
        self.notify("Mystery traded!");
        Some(value)
    }

    // Lifecycle ------------------------------------------------------------

    /// Start over after a terminal state.
    pub fn restart(&mut self) -> bool {
        if !self.transition(StatusEvent::Restart) {
            return false;
        }
        self.resources = ResourceState::initial();
        self.flags = FlagSet::new();
        self.world = World::new(&self.tuning);
        self.input.clear();
        self.encounter = None;
        self.lottery = None;
        self.stats = SessionStats::default();
        self.report = None;
        self.toasts.clear();
        if let Some(backend) = self.parked_audio.take() {
            self.audio.init(backend, &self.settings);
        }
        info!("session restarted for {}", self.player);
        self.notify(format!("Welcome back {}!", self.player));
        true
    }

    /// Advance session time by `dt_ms`. The world only moves while playing;
    /// otherwise this just runs the clocks and returns `None`.
    pub fn frame(&mut self, dt_ms: f32) -> Option<TickReport> {
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        self.toasts.advance(dt_ms);
        self.audio.advance(dt_ms);
        if self.status() == GameStatus::Lottery {
            self.advance_lottery(dt_ms);
        }
        if !self.status().is_live() {
            return None;
        }

        let mut ctx = TickContext {
            tuning: &self.tuning,
            catalog: &self.catalog,
            resources: &mut self.resources,
            flags: &self.flags,
            rng: &self.rng,
            input: &self.input,
            pointer_follow: self.settings.pointer_follow,
        };
        let report = self.world.tick(&mut ctx, dt_ms);
        self.stats.food_consumed += report.food_consumed;
        self.stats.distance_traveled += report.distance;
        for event in &report.events {
            self.react(&event.kind);
        }
        Some(report)
    }

    fn advance_lottery(&mut self, dt_ms: f32) {
        let Some(wheel) = self.lottery.as_mut() else {
            return;
        };
        let progress = wheel.advance(dt_ms, &self.tuning.lottery);
        for _ in 0..progress.ticks {
            self.cue(SoundCue::Spin);
        }
        if let Some(index) = progress.landed {
            debug!("lottery landed on wedge {index}");
            self.cue(SoundCue::Win);
        }
    }

    fn react(&mut self, event: &SimEventKind) {
        match event {
            SimEventKind::CoinCollected { value, .. } => {
                self.stats.coins_collected += 1;
                self.stats.earn(*value);
                self.cue(SoundCue::Coin);
            }
            SimEventKind::MysteryBoxOpened => {
                self.stats.mystery_boxes_opened += 1;
                self.cue(SoundCue::Confirm);
                if self.transition(StatusEvent::OpenLottery) {
                    self.input.clear();
                    self.lottery = Some(LotteryWheel::new(self.catalog.lottery_rewards.len()));
                }
            }
            SimEventKind::EncounterTriggered { encounter } => {
                self.cue(SoundCue::Collision);
                self.open_catalog_encounter(*encounter);
            }
            SimEventKind::LifeLost { .. } => {
                self.stats.damages_taken += 1;
                self.cue(SoundCue::Hurt);
            }
            SimEventKind::Starved => {
                self.stats.damages_taken += 1;
                self.cue(SoundCue::GameOver);
                if self.transition(StatusEvent::Starve) {
                    self.finish(EndType::GameOver);
                }
            }
            SimEventKind::BulletHit { penalty, .. } => {
                self.stats.damages_taken += 1;
                self.stats.spend(*penalty);
                self.cue(SoundCue::Impact);
            }
            SimEventKind::Spawned { .. } => {}
        }
    }

    fn finish(&mut self, end_type: EndType) {
        self.parked_audio = self.audio.teardown();
        self.input.clear();
        let report = SessionReport::new(
            &self.player,
            self.rng.seed(),
            &self.resources,
            &self.stats,
            end_type,
        );
        info!(
            "run ended ({end_type}) score {} gold {} rep {}",
            report.score, report.gold, report.reputation
        );
        if let Some(sink) = self.sink.as_mut()
            && let Err(err) = sink.record(&report)
        {
            warn!("session report not delivered: {err}");
        }
        self.report = Some(report);
    }

    // Helpers --------------------------------------------------------------

    fn transition(&mut self, event: StatusEvent) -> bool {
        match self.machine.apply(event) {
            Ok(next) => {
                debug!("status -> {next}");
                true
            }
            Err(err) => {
                debug!("{err}");
                false
            }
        }
    }

    fn cue(&mut self, cue: SoundCue) {
        self.audio.trigger(cue, &mut *self.rng.audio());
    }

    fn notify(&mut self, message: impl Into<String>) {
        let toast = self.toasts.push(message).clone();
        if let Some(notifier) = self.notifier.as_mut() {
            notifier.notify(&toast);
        }
    }

    /// Immutable view for the renderer.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        let encounter = self.encounter.as_ref().map(|active| {
            let gates = active.gates(&self.resources, &self.flags);
            EncounterView::new(active, &gates)
        });
        let lottery = self
            .lottery
            .as_ref()
            .map(|wheel| LotteryView::new(wheel, &self.catalog.lottery_rewards));
        FrameSnapshot {
            status: self.status(),
            mode: self.world.mode,
            caravan: self.world.caravan,
            walker: self.world.walker,
            npcs: self.world.npcs.clone(),
            bullets: self.world.bullets.clone(),
            scroll_offset: self.world.scroll_offset,
            progress: self.resources.progress,
            food: self.resources.food,
            gold: self.resources.gold,
            reputation: self.resources.reputation,
            lives: self.resources.lives,
            journey_count: self.resources.journey_count,
            passengers: self.resources.passengers.to_vec(),
            capacity: self.capacity(),
            vehicle: self.resources.vehicle,
            flags: self.flags.iter().collect(),
            encounter,
            lottery,
            toasts: self.toasts.as_slice().to_vec(),
            settings: self.settings,
            theme: self.settings.theme,
        }
    }
}
