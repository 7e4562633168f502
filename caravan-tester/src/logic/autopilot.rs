//! Frame-by-frame driver that plays a session through a [`PlayerPolicy`].
use anyhow::{Result, bail};
use caravan_game::{
    ControlMode, EncounterId, GameSession, GameStatus, NpcKind, SessionReport, TickReport,
    VehicleType,
};
use log::debug;
use serde::Serialize;

use super::policy::{GameplayStrategy, PlayerPolicy};

/// Frame length the autopilot feeds the session.
pub const FRAME_MS: f32 = 16.0;

/// How far ahead a merchant the policy avoids counts as a threat.
const LOOKAHEAD_X: f32 = 260.0;
/// Vertical slack before the autopilot bothers steering.
const DEADBAND_Y: f32 = 4.0;
/// Gold a greedy run waits for before visiting the hangar.
const HANGAR_BUDGET: u32 = 100;
/// Frames an encounter may stay open before the run is declared stuck.
const STUCK_FRAMES: u32 = 600;

#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub frame: u32,
    pub encounter: EncounterId,
    pub choice_id: String,
    pub policy: &'static str,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub strategy: String,
    pub frames: u32,
    pub status: GameStatus,
    pub journeys: u32,
    pub progress: f32,
    pub gold: u32,
    pub reputation: u32,
    pub lives: u8,
    pub decisions: Vec<DecisionRecord>,
    pub report: Option<SessionReport>,
}

impl RunSummary {
    #[must_use]
    pub fn ended(&self) -> bool {
        self.status.is_terminal()
    }

    /// Last few decisions, newest first, for failure messages.
    #[must_use]
    pub fn decision_path(&self) -> String {
        if self.decisions.is_empty() {
            return "no decisions recorded".to_string();
        }
        self.decisions
            .iter()
            .rev()
            .take(3)
            .map(|entry| {
                format!(
                    "frame {} {} -> {} [{}] {}",
                    entry.frame,
                    entry.encounter,
                    entry.choice_id,
                    entry.policy,
                    entry.rationale.as_deref().unwrap_or("-")
                )
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Steer {
    Up,
    Down,
    Hold,
}

pub struct Autopilot {
    strategy: GameplayStrategy,
    policy: Box<dyn PlayerPolicy>,
    steering: Steer,
    frame: u32,
    encounter_frames: u32,
    decisions: Vec<DecisionRecord>,
}

impl Autopilot {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            strategy,
            policy: strategy.create_policy(seed),
            steering: Steer::Hold,
            frame: 0,
            encounter_frames: 0,
            decisions: Vec::new(),
        }
    }

    /// Play until the run ends or `frames` elapse. `observe` sees the
    /// session after every frame and may abort the run.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `observe`, or an error if an
    /// encounter cannot be resolved by the policy.
    pub fn run<F>(
        &mut self,
        session: &mut GameSession,
        frames: u32,
        mut observe: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&GameSession, Option<&TickReport>) -> Result<()>,
    {
        while self.frame < frames && !session.status().is_terminal() {
            self.step(session)?;
            let report = session.frame(FRAME_MS);
            self.frame += 1;
            observe(session, report.as_ref())?;
        }
        Ok(self.summary(session))
    }

    /// Issue this frame's input.
    ///
    /// # Errors
    ///
    /// Fails when an encounter has stayed open for too long.
    pub fn step(&mut self, session: &mut GameSession) -> Result<()> {
        if session.status() == GameStatus::Encounter {
            self.encounter_frames += 1;
            if self.encounter_frames > STUCK_FRAMES {
                bail!("encounter stuck open for {STUCK_FRAMES} frames");
            }
        } else {
            self.encounter_frames = 0;
        }
        if session.status() != GameStatus::Playing {
            // Overlays drop held keys.
            self.steering = Steer::Hold;
        }

        match session.status() {
            GameStatus::Playing => self.drive_road(session),
            GameStatus::Encounter => self.answer(session),
            GameStatus::Lottery => {
                let landed = session.lottery().is_some_and(|wheel| wheel.landed().is_some());
                if landed {
                    session.claim_lottery();
                } else {
                    session.spin_lottery();
                }
            }
            GameStatus::VehicleSelect => self.shop(session),
            GameStatus::Settings => {
                session.close_modal();
            }
            GameStatus::Paused => {
                session.toggle_pause();
            }
            GameStatus::GameOver | GameStatus::Victory | GameStatus::Exited => {}
        }
        Ok(())
    }

    #[must_use]
    pub fn summary(&self, session: &GameSession) -> RunSummary {
        let resources = session.resources();
        RunSummary {
            seed: session.seed(),
            strategy: self.strategy.label().to_string(),
            frames: self.frame,
            status: session.status(),
            journeys: resources.journey_count,
            progress: resources.progress,
            gold: resources.gold,
            reputation: resources.reputation,
            lives: resources.lives,
            decisions: self.decisions.clone(),
            report: session.report().cloned(),
        }
    }

    fn drive_road(&mut self, session: &mut GameSession) {
        if session.world().mode == ControlMode::OnFoot {
            session.key_down("c");
            return;
        }
        if self.strategy == GameplayStrategy::Greedy
            && session.resources().vehicle == VehicleType::Caravan
            && session.resources().gold >= HANGAR_BUDGET
        {
            self.set_steer(session, Steer::Hold);
            session.key_down("v");
            return;
        }
        if self.policy.recruits() && self.recruit_in_range(session) {
            session.key_down("e");
        }
        let steer = self.choose_steer(session);
        self.set_steer(session, steer);
    }

    fn recruit_in_range(&self, session: &GameSession) -> bool {
        let caravan = session.world().caravan;
        let range = session.tuning().collision.interaction_range;
        session.resources().passengers.len() < session.capacity()
            && session.world().npcs.iter().any(|npc| {
                matches!(npc.kind, NpcKind::Person { .. })
                    && (npc.x - caravan.x).abs() < range
            })
    }

    fn choose_steer(&self, session: &GameSession) -> Steer {
        let world = session.world();
        let tuning = session.tuning();
        let caravan = world.caravan;
        let lane = tuning.collision.encounter_radius + 24.0;

        let threat = world
            .npcs
            .iter()
            .filter(|npc| npc.encounter().is_some() && !self.policy.wants(npc))
            .filter(|npc| npc.x >= caravan.x && npc.x - caravan.x < LOOKAHEAD_X)
            .find(|npc| (npc.y - caravan.y).abs() < lane);
        if let Some(threat) = threat {
            let margin = tuning.world.caravan_margin_y;
            let room_above = caravan.y - tuning.world.road_top > margin;
            let room_below = tuning.world.road_bottom - caravan.y > margin;
            return match (threat.y >= caravan.y, room_above, room_below) {
                (true, true, _) | (false, _, false) => Steer::Up,
                _ => Steer::Down,
            };
        }

        let target = world
            .npcs
            .iter()
            .filter(|npc| self.policy.wants(npc) && npc.x + npc.size() >= caravan.x)
            .min_by(|a, b| a.x.total_cmp(&b.x));
        match target {
            Some(npc) if npc.y < caravan.y - DEADBAND_Y => Steer::Up,
            Some(npc) if npc.y > caravan.y + DEADBAND_Y => Steer::Down,
            _ => Steer::Hold,
        }
    }

    fn set_steer(&mut self, session: &mut GameSession, steer: Steer) {
        if steer == self.steering {
            return;
        }
        session.key_up("w");
        session.key_up("ArrowDown");
        match steer {
            Steer::Up => session.key_down("w"),
            Steer::Down => session.key_down("ArrowDown"),
            Steer::Hold => {}
        }
        self.steering = steer;
    }

    fn answer(&mut self, session: &mut GameSession) {
        let Some(active) = session.active_encounter() else {
            return;
        };
        if active.is_resolved() {
            session.acknowledge();
            return;
        }
        let id = active.id();
        let encounter = active.encounter().clone();
        let gates = active.gates(session.resources(), session.flags());
        match self.policy.pick_choice(session.resources(), &encounter, &gates) {
            Some(decision) => {
                let choice_id = encounter
                    .choices
                    .get(decision.choice_index)
                    .map(|choice| choice.id.clone())
                    .unwrap_or_default();
                debug!("{} picks {choice_id} at {id}", self.policy.name());
                if session.select_choice(decision.ordinal()) {
                    self.decisions.push(DecisionRecord {
                        frame: self.frame,
                        encounter: id,
                        choice_id,
                        policy: self.policy.name(),
                        rationale: decision.rationale,
                    });
                }
            }
            None if id == EncounterId::PassengerTrade => session.key_down("p"),
            None => debug!("{} found no open choice at {id}", self.policy.name()),
        }
    }

    fn shop(&mut self, session: &mut GameSession) {
        let gold = session.resources().gold;
        let current = session.resources().vehicle.cost();
        let pick = VehicleType::ALL
            .into_iter()
            .filter(|vehicle| vehicle.cost() > current && vehicle.cost() <= gold / 2)
            .max_by_key(|vehicle| vehicle.cost());
        match pick {
            Some(vehicle) => {
                session.select_vehicle(vehicle);
            }
            None => {
                session.close_modal();
            }
        }
        if session.status() == GameStatus::VehicleSelect {
            session.close_modal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_game::{BuiltinLoader, GameEngine, MemorySink};

    fn session(seed: u64) -> GameSession {
        GameEngine::new(BuiltinLoader, MemorySink::new())
            .create_session("Autopilot", seed)
            .unwrap()
    }

    #[test]
    fn runs_stop_at_the_frame_budget_or_the_end() {
        for strategy in GameplayStrategy::ALL {
            let mut session = session(3);
            let mut pilot = Autopilot::new(strategy, 3);
            let summary = pilot.run(&mut session, 500, |_, _| Ok(())).unwrap();
            assert!(summary.frames <= 500);
            assert_eq!(summary.strategy, strategy.label());
            if !summary.ended() {
                assert_eq!(summary.frames, 500);
            }
        }
    }

    #[test]
    fn observer_errors_abort_the_run() {
        let mut session = session(4);
        let mut pilot = Autopilot::new(GameplayStrategy::Cautious, 4);
        let err = pilot
            .run(&mut session, 100, |session, _| {
                if session.world().ticks() >= 10 {
                    bail!("enough");
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "enough");
    }

    #[test]
    fn encounters_get_answered_and_acknowledged() {
        let mut session = session(5);
        assert!(session.open_catalog_encounter(EncounterId::StrangeTraveler));
        let mut pilot = Autopilot::new(GameplayStrategy::Cautious, 5);
        pilot.step(&mut session).unwrap();
        assert!(session.active_encounter().unwrap().is_resolved());
        pilot.step(&mut session).unwrap();
        assert_eq!(session.status(), GameStatus::Playing);
        let summary = pilot.summary(&session);
        assert_eq!(summary.decisions.len(), 1);
        assert_eq!(summary.decisions[0].encounter, EncounterId::StrangeTraveler);
    }

    #[test]
    fn greedy_shops_once_it_can_afford_an_upgrade() {
        let mut session = session(6);
        session.resources_mut().gold = 120;
        let mut pilot = Autopilot::new(GameplayStrategy::Greedy, 6);
        pilot.step(&mut session).unwrap();
        assert_eq!(session.status(), GameStatus::VehicleSelect);
        pilot.step(&mut session).unwrap();
        assert_eq!(session.resources().vehicle, VehicleType::Bike);
        assert_eq!(session.resources().gold, 70);
        assert_eq!(session.status(), GameStatus::Playing);
    }
}
