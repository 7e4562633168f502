//! Named rule checks the tester runs per seed.
use anyhow::{Context, Result, bail, ensure};
use caravan_game::encounters::{ChoiceGate, choice_gate};
use caravan_game::lottery::LotteryWheel;
use caravan_game::spawn::CoinSize;
use caravan_game::{
    BuiltinLoader, EncounterCatalog, EncounterId, EndType, FlagSet, GameEngine, GameSession,
    GameStatus, MemorySink, NpcKind, Passenger, PassengerType, PurchaseOutcome, SimEventKind,
    TuningConfig, VehicleType,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::autopilot::{Autopilot, FRAME_MS};
use super::policy::GameplayStrategy;

/// Everything a scenario needs for one seed.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub frames: u32,
    pub strategies: Vec<GameplayStrategy>,
}

type ScenarioFn = fn(&ScenarioCtx) -> Result<String>;

#[derive(Clone, Copy)]
pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

impl TestScenario {
    /// Run for one seed; `Ok` carries a one-line summary.
    ///
    /// # Errors
    ///
    /// Returns the first violated expectation.
    pub fn run(&self, ctx: &ScenarioCtx) -> Result<String> {
        (self.run)(ctx).with_context(|| format!("{} (seed {})", self.name, ctx.seed))
    }
}

impl std::fmt::Debug for TestScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestScenario")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

const SCENARIOS: [TestScenario; 8] = [
    TestScenario {
        name: "smoke",
        description: "Session boots, greets, ticks, pauses and serializes",
        run: smoke,
    },
    TestScenario {
        name: "starvation-law",
        description: "Empty food costs a life and resets rations; the last life ends the run",
        run: starvation_law,
    },
    TestScenario {
        name: "collision-priority",
        description: "Pickups resolve before an encounter touched in the same tick",
        run: collision_priority,
    },
    TestScenario {
        name: "choice-gating",
        description: "Scholar choices stay locked without a scholar aboard",
        run: choice_gating,
    },
    TestScenario {
        name: "haven-victory",
        description: "The haven appears late in the journey and retiring there wins",
        run: haven_victory,
    },
    TestScenario {
        name: "vehicle-purchase",
        description: "Hangar charges once, refuses short purses and changes the next tick",
        run: vehicle_purchase,
    },
    TestScenario {
        name: "lottery-fairness",
        description: "Wheel wedges land evenly and claims pay the landed trade value",
        run: lottery_fairness,
    },
    TestScenario {
        name: "autopilot-run",
        description: "Policy-driven runs keep every resource in bounds",
        run: autopilot_run,
    },
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.name, s.description)).collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    SCENARIOS.iter().copied().find(|s| s.name == name)
}

#[must_use]
pub fn scenario_names() -> Vec<&'static str> {
    SCENARIOS.iter().map(|s| s.name).collect()
}

fn session(seed: u64) -> Result<GameSession> {
    GameEngine::new(BuiltinLoader, MemorySink::new())
        .create_session("Tester", seed)
        .context("creating session")
}

/// Resource bounds that must hold after every frame.
fn check_bounds(session: &GameSession) -> Result<()> {
    let resources = session.resources();
    ensure!(
        (0.0..=100.0).contains(&resources.food),
        "food out of range: {}",
        resources.food
    );
    ensure!(
        (0.0..=100.0).contains(&resources.progress),
        "progress out of range: {}",
        resources.progress
    );
    ensure!(resources.lives <= 3, "lives above max: {}", resources.lives);
    ensure!(
        resources.passengers.len() <= session.capacity(),
        "crew {} exceeds capacity {}",
        resources.passengers.len(),
        session.capacity()
    );
    Ok(())
}

fn smoke(ctx: &ScenarioCtx) -> Result<String> {
    let mut session = session(ctx.seed)?;
    ensure!(session.status() == GameStatus::Playing, "run did not start");
    let greeted = session
        .toasts()
        .as_slice()
        .iter()
        .any(|toast| toast.message == "Welcome Tester! Game started.");
    ensure!(greeted, "missing welcome toast");

    let mut ticks = 0;
    while ticks < 300 && session.status() == GameStatus::Playing {
        session.world_mut().npcs.clear();
        if session.frame(FRAME_MS).is_some() {
            ticks += 1;
        }
        check_bounds(&session)?;
    }
    ensure!(session.world().ticks() == 300, "world ticked {}", session.world().ticks());

    ensure!(session.toggle_pause(), "pause refused");
    let frozen = session.world().clone();
    let food = session.resources().food;
    for _ in 0..30 {
        ensure!(session.frame(FRAME_MS).is_none(), "paused frame ticked");
    }
    ensure!(session.world() == &frozen, "world moved while paused");
    ensure!(
        (session.resources().food - food).abs() < f32::EPSILON,
        "food drained while paused"
    );

    let snapshot = serde_json::to_value(session.snapshot()).context("serializing snapshot")?;
    ensure!(
        snapshot["status"] == "paused",
        "snapshot status {}",
        snapshot["status"]
    );
    ensure!(session.toggle_pause(), "resume refused");
    Ok(format!("{} ticks, food {:.2}", ticks, session.resources().food))
}

fn starvation_law(ctx: &ScenarioCtx) -> Result<String> {
    let mut session = session(ctx.seed)?;
    let reset = session.tuning().food.starvation_reset;

    let mut frames = 0;
    while session.resources().lives == 3 && frames < 5_000 {
        session.world_mut().npcs.clear();
        session.frame(FRAME_MS);
        frames += 1;
    }
    let resources = session.resources();
    ensure!(resources.lives == 2, "expected 2 lives, found {}", resources.lives);
    ensure!(
        (resources.food - reset).abs() < f32::EPSILON,
        "food reset to {} instead of {reset}",
        resources.food
    );
    ensure!(
        session.status() == GameStatus::Playing,
        "spare life ended the run"
    );

    session.resources_mut().lives = 1;
    session.resources_mut().food = 0.5;
    let mut last = 0;
    while session.status() == GameStatus::Playing && last < 200 {
        session.world_mut().npcs.clear();
        session.frame(FRAME_MS);
        last += 1;
    }
    ensure!(
        session.status() == GameStatus::GameOver,
        "last life did not end the run ({})",
        session.status()
    );
    ensure!(session.resources().lives == 0, "lives left after game over");
    ensure!(session.frame(FRAME_MS).is_none(), "world ticked after game over");
    let report = session.report().context("no report after game over")?;
    ensure!(report.end_type == EndType::GameOver, "report says {}", report.end_type);
    Ok(format!("first life lost after {frames} frames"))
}

fn collision_priority(ctx: &ScenarioCtx) -> Result<String> {
    let mut session = session(ctx.seed)?;
    session.world_mut().npcs.clear();
    let at = session.world().caravan;
    let scroll = session.tuning().movement.scroll_speed;
    let coin_value = session.tuning().spawn.small_coin_value;
    let gold = session.resources().gold;
    session.world_mut().insert_npc(
        at.x + scroll,
        at.y + 5.0,
        NpcKind::Trader {
            encounter: EncounterId::BanditToll,
        },
    );
    session.world_mut().insert_npc(
        at.x + scroll,
        at.y - 5.0,
        NpcKind::Coin {
            size: CoinSize::Small,
        },
    );

    let report = session.frame(FRAME_MS).context("first frame did not tick")?;
    let coin_first = report
        .kinds()
        .position(|kind| matches!(kind, SimEventKind::CoinCollected { .. }));
    let encounter_at = report
        .kinds()
        .position(|kind| matches!(kind, SimEventKind::EncounterTriggered { .. }));
    match (coin_first, encounter_at) {
        (None, _) => bail!("coin was not collected"),
        (Some(coin), Some(encounter)) if encounter < coin => {
            bail!("encounter resolved before the coin")
        }
        _ => {}
    }
    ensure!(
        session.resources().gold == gold + coin_value,
        "gold {} after the coin",
        session.resources().gold
    );

    if session.status() == GameStatus::Playing {
        session.frame(FRAME_MS);
    }
    ensure!(
        session.status() == GameStatus::Encounter,
        "trader never opened ({})",
        session.status()
    );
    Ok(format!("gold {}", session.resources().gold))
}

fn choice_gating(ctx: &ScenarioCtx) -> Result<String> {
    let catalog = EncounterCatalog::builtin().context("loading catalog")?;
    let flags = FlagSet::new();
    let mut session = session(ctx.seed)?;
    let crew = [PassengerType::Merchant, PassengerType::Cook, PassengerType::Guard];
    for (id, kind) in (1_u32..).zip(crew) {
        session
            .resources_mut()
            .passengers
            .push(Passenger::traveler(id, kind));
    }

    let mut gated = 0;
    for encounter in &catalog.encounters {
        for choice in &encounter.choices {
            if choice.required_passenger != Some(PassengerType::Scholar) {
                continue;
            }
            gated += 1;
            let gate = choice_gate(choice, session.resources(), &flags);
            ensure!(
                gate
                    == ChoiceGate::MissingPassenger {
                        kind: PassengerType::Scholar
                    },
                "{} / {} is {gate:?} without a scholar",
                encounter.id,
                choice.id
            );
        }
    }
    ensure!(gated > 0, "catalog has no scholar choices");

    ensure!(
        session.open_catalog_encounter(EncounterId::StrangeTraveler),
        "could not open the wanderer"
    );
    let ordinal = session
        .active_encounter()
        .context("no active encounter")?
        .encounter()
        .choices
        .iter()
        .position(|choice| choice.id == "scholar_advice")
        .context("wanderer lost its scholar choice")?
        + 1;
    let before = session.resources().clone();
    ensure!(!session.select_choice(ordinal), "locked choice was accepted");
    ensure!(session.resources() == &before, "locked choice changed resources");

    let scholar = Passenger::traveler(9, PassengerType::Scholar);
    session.resources_mut().passengers.push(scholar);
    ensure!(session.select_choice(ordinal), "scholar aboard but choice locked");
    Ok(format!("{gated} scholar choices gated"))
}

fn haven_victory(ctx: &ScenarioCtx) -> Result<String> {
    let engine = GameEngine::new(BuiltinLoader, MemorySink::new());
    let mut session = engine
        .create_session("Tester", ctx.seed)
        .context("creating session")?;
    let late = session.tuning().spawn.haven_progress + 1.0;
    session.resources_mut().progress = late;

    let mut frames = 0;
    while session.status() == GameStatus::Playing && frames < 3_000 {
        session.resources_mut().food = 100.0;
        if let Some(y) = session
            .world()
            .npcs
            .iter()
            .find(|npc| npc.is_haven())
            .map(|npc| npc.y)
        {
            session.world_mut().caravan.y = y;
        }
        session.world_mut().npcs.retain(|npc| npc.is_haven());
        session.frame(FRAME_MS);
        frames += 1;
    }
    let active = session.active_encounter().context("haven never reached")?;
    ensure!(
        active.id() == EncounterId::HavenCheckpoint,
        "reached {} instead of the haven",
        active.id()
    );
    let retire = active
        .encounter()
        .choices
        .iter()
        .position(|choice| choice.id == "retire_journey")
        .context("haven cannot retire")?
        + 1;
    ensure!(session.select_choice(retire), "retire refused");
    ensure!(session.acknowledge(), "acknowledge refused");
    ensure!(
        session.status() == GameStatus::Victory,
        "retiring left status {}",
        session.status()
    );

    let report = engine.sink().last().context("sink saw no report")?;
    ensure!(report.end_type == EndType::Victory, "report says {}", report.end_type);
    let victory = report.victory_type.context("victory without a title")?;
    ensure!(
        report.score == report.gold + report.reputation * 2,
        "score {} does not match gold {} rep {}",
        report.score,
        report.gold,
        report.reputation
    );
    Ok(format!("{victory} after {frames} frames"))
}

fn vehicle_purchase(ctx: &ScenarioCtx) -> Result<String> {
    let mut session = session(ctx.seed)?;
    let tuning: TuningConfig = session.tuning().clone();
    session.resources_mut().gold = 60;
    session.key_down("v");
    ensure!(
        session.status() == GameStatus::VehicleSelect,
        "hangar did not open"
    );
    let bought = session.select_vehicle(VehicleType::Bike);
    ensure!(
        bought == Some(PurchaseOutcome::Purchased { cost: 50 }),
        "bike purchase returned {bought:?}"
    );
    ensure!(session.resources().gold == 10, "gold {}", session.resources().gold);
    ensure!(session.status() == GameStatus::Playing, "hangar stayed open");

    session.world_mut().npcs.clear();
    session.key_down("d");
    session.frame(FRAME_MS);
    session.key_up("d");
    let bike = VehicleType::Bike;
    let drain = tuning.food.drain_rate * tuning.food.moving_factor * bike.food_multiplier();
    ensure!(
        (session.resources().food - (100.0 - drain)).abs() < 1e-4,
        "food {} after one bike tick",
        session.resources().food
    );
    let progress = tuning.movement.scroll_speed * bike.speed_multiplier()
        / tuning.movement.progress_divisor;
    ensure!(
        (session.resources().progress - progress).abs() < 1e-5,
        "progress {} after one bike tick",
        session.resources().progress
    );

    session.key_down("v");
    let refused = session.select_vehicle(VehicleType::Car);
    ensure!(
        matches!(refused, Some(PurchaseOutcome::Unaffordable { cost: 100, gold: 10 })),
        "car purchase returned {refused:?}"
    );
    ensure!(
        session.status() == GameStatus::VehicleSelect,
        "refusal closed the hangar"
    );
    let owned = session.select_vehicle(VehicleType::Bike);
    ensure!(
        owned == Some(PurchaseOutcome::AlreadyOwned),
        "re-picking the bike returned {owned:?}"
    );
    ensure!(session.resources().gold == 10, "owned pick charged gold");
    Ok("bike bought, car refused".to_string())
}

fn lottery_fairness(ctx: &ScenarioCtx) -> Result<String> {
    const SPINS: usize = 6_000;
    let tuning = TuningConfig::default();
    let catalog = EncounterCatalog::builtin().context("loading catalog")?;
    let wedges = catalog.lottery_rewards.len();
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let mut landed = vec![0_usize; wedges];
    for _ in 0..SPINS {
        let mut wheel = LotteryWheel::new(wedges);
        ensure!(wheel.spin(&tuning.lottery, &mut rng), "fresh wheel refused to spin");
        let progress = wheel.advance(tuning.lottery.spin_ms, &tuning.lottery);
        let index = progress.landed.context("spin did not land")?;
        landed[index] += 1;
    }
    let expected = SPINS / wedges;
    let slack = expected * 15 / 100;
    for (index, count) in landed.iter().enumerate() {
        ensure!(
            count.abs_diff(expected) <= slack,
            "wedge {index} landed {count} times (expected {expected} ± {slack})"
        );
    }

    let mut session = session(ctx.seed)?;
    session.world_mut().npcs.clear();
    let at = session.world().caravan;
    let scroll = session.tuning().movement.scroll_speed;
    session
        .world_mut()
        .insert_npc(at.x + scroll, at.y, NpcKind::MysteryBox);
    session.frame(FRAME_MS);
    ensure!(
        session.status() == GameStatus::Lottery,
        "mystery box opened {}",
        session.status()
    );
    ensure!(session.spin_lottery(), "session refused to spin");
    ensure!(!session.close_modal(), "wheel closed mid-spin");
    let mut frames = 0;
    while session.lottery().is_some_and(|wheel| wheel.landed().is_none()) && frames < 1_000 {
        session.frame(FRAME_MS);
        frames += 1;
    }
    let index = session
        .lottery()
        .and_then(|wheel| wheel.landed())
        .context("wheel never landed")?;
    let value = catalog.lottery_rewards[index].trade_value();
    let gold = session.resources().gold;
    let paid = session.claim_lottery();
    ensure!(paid == Some(value), "claim paid {paid:?}, expected {value}");
    ensure!(session.resources().gold == gold + value, "gold not credited");
    ensure!(session.status() == GameStatus::Playing, "wheel stayed open");
    Ok(format!("wedges {landed:?}"))
}

fn autopilot_run(ctx: &ScenarioCtx) -> Result<String> {
    let mut lines = Vec::new();
    for &strategy in &ctx.strategies {
        let mut session = session(ctx.seed)?;
        let mut pilot = Autopilot::new(strategy, ctx.seed);
        let mut last_progress = 0.0_f32;
        let mut last_journey = 1;
        let summary = pilot
            .run(&mut session, ctx.frames, |session, _| {
                check_bounds(session)?;
                let resources = session.resources();
                if resources.journey_count == last_journey {
                    ensure!(
                        resources.progress >= last_progress,
                        "progress fell from {last_progress} to {}",
                        resources.progress
                    );
                }
                last_progress = resources.progress;
                last_journey = resources.journey_count;
                Ok(())
            })
            .with_context(|| format!("{strategy} policy"))?;

        if summary.ended() {
            let report = summary
                .report
                .as_ref()
                .with_context(|| format!("{strategy} run ended without a report"))?;
            ensure!(
                report.score == report.gold + report.reputation * 2,
                "{strategy} score {} does not match",
                report.score
            );
            let expected = match summary.status {
                GameStatus::Victory => EndType::Victory,
                GameStatus::Exited => EndType::Exit,
                _ => EndType::GameOver,
            };
            ensure!(
                report.end_type == expected,
                "{strategy} ended {} but reported {}",
                summary.status,
                report.end_type
            );
        }
        lines.push(format!(
            "{strategy}: {} after {} frames, journey {}, gold {}, rep {} [{}]",
            summary.status,
            summary.frames,
            summary.journeys,
            summary.gold,
            summary.reputation,
            summary.decision_path()
        ));
    }
    Ok(lines.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(seed: u64) -> ScenarioCtx {
        ScenarioCtx {
            seed,
            frames: 1_500,
            strategies: GameplayStrategy::ALL.to_vec(),
        }
    }

    #[test]
    fn registry_lists_every_scenario_once() {
        let names = scenario_names();
        assert_eq!(names.len(), 8);
        for name in &names {
            assert!(get_scenario(name).is_some());
        }
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn deterministic_scenarios_pass() {
        for name in [
            "smoke",
            "collision-priority",
            "choice-gating",
            "vehicle-purchase",
        ] {
            let scenario = get_scenario(name).unwrap();
            for seed in [1, 1337] {
                scenario
                    .run(&ctx(seed))
                    .unwrap_or_else(|err| panic!("{err:#}"));
            }
        }
    }

    #[test]
    fn failures_name_the_scenario_and_seed() {
        let failing = TestScenario {
            name: "always-fails",
            description: "",
            run: |_| bail!("boom"),
        };
        let err = failing.run(&ctx(7)).unwrap_err();
        assert_eq!(format!("{err:#}"), "always-fails (seed 7): boom");
    }
}
