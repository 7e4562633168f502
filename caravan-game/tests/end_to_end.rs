use caravan_game::data::EncounterCatalog;
use caravan_game::encounters::EncounterPhase;
use caravan_game::spawn::SpawnDirector;
use caravan_game::{
    BuiltinLoader, EncounterId, EndType, GameEngine, GameSession, GameStatus, MemorySink,
    NpcKind, PurchaseOutcome, TuningConfig, VehicleType, VictoryType,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn engine() -> GameEngine<BuiltinLoader, MemorySink> {
    GameEngine::new(BuiltinLoader, MemorySink::new())
}

fn session(seed: u64) -> GameSession {
    engine().create_session("Tester", seed).unwrap()
}

#[test]
fn starvation_with_spare_lives_resets_food() {
    let mut session = session(11);
    assert!((session.resources().food - 100.0).abs() < f32::EPSILON);
    assert_eq!(session.resources().gold, 32);
    assert_eq!(session.resources().reputation, 0);
    assert_eq!(session.resources().lives, 3);

    let mut frames = 0;
    while session.resources().lives == 3 && frames < 5_000 {
        session.world_mut().npcs.clear();
        session.frame(16.0);
        frames += 1;
    }
    assert_eq!(session.resources().lives, 2);
    assert!((session.resources().food - 50.0).abs() < f32::EPSILON);
    assert_eq!(session.status(), GameStatus::Playing);
    assert_eq!(session.stats().damages_taken, 1);
    assert!(frames > 1_900 && frames < 2_100, "frames {frames}");
}

#[test]
fn ignoring_the_wanderer_changes_nothing() {
    let mut session = session(12);
    let before = session.resources().clone();
    assert!(session.open_catalog_encounter(EncounterId::StrangeTraveler));
    assert_eq!(session.status(), GameStatus::Encounter);

    let ordinal = session
        .active_encounter()
        .unwrap()
        .encounter()
        .choices
        .iter()
        .position(|choice| choice.id == "ignore_wanderer")
        .unwrap()
        + 1;
    assert!(session.select_choice(ordinal));
    assert_eq!(session.resources(), &before);
    match session.active_encounter().unwrap().phase() {
        EncounterPhase::Resolved(resolution) => {
            assert_eq!(
                resolution.consequence,
                "You save your rations but feel a chill in the air."
            );
            assert_eq!(resolution.action, None);
        }
        EncounterPhase::Unresolved => panic!("choice did not resolve"),
    }

    session.key_down(" ");
    assert_eq!(session.status(), GameStatus::Playing);
    assert_eq!(session.resources(), &before);
    assert_eq!(session.resources().journey_count, 1);
}

#[test]
fn haven_is_forced_late_in_journey() {
    let tuning = TuningConfig::default();
    let catalog = EncounterCatalog::builtin().unwrap();
    let director = SpawnDirector::new(&tuning.spawn, &tuning.world, &catalog);
    let mut rng = ChaCha20Rng::seed_from_u64(96);
    for id in 0..500 {
        let kind = director.choose_kind(96.0, id, &mut rng);
        assert!(
            !matches!(kind, NpcKind::Trader { .. } | NpcKind::Person { .. }),
            "unexpected {kind:?}"
        );
    }
}

#[test]
fn retiring_at_the_haven_wins() {
    let engine = engine();
    let mut session = engine.create_session("Tester", 13).unwrap();
    session.resources_mut().progress = 96.0;

    let mut frames = 0;
    while session.status() == GameStatus::Playing && frames < 3_000 {
        session.resources_mut().food = 100.0;
        if let Some(haven) = session.world().npcs.iter().find(|npc| npc.is_haven()) {
            let y = haven.y;
            session.world_mut().caravan.y = y;
        }
        session
            .world_mut()
            .npcs
            .retain(|npc| npc.is_haven());
        session.frame(16.0);
        frames += 1;
    }
    assert_eq!(session.status(), GameStatus::Encounter);
    let active = session.active_encounter().unwrap();
    assert_eq!(active.id(), EncounterId::HavenCheckpoint);
    let retire = active
        .encounter()
        .choices
        .iter()
        .position(|choice| choice.id == "retire_journey")
        .unwrap()
        + 1;

    assert!(session.select_choice(retire));
    assert!(session.acknowledge());
    assert_eq!(session.status(), GameStatus::Victory);

    let report = engine.sink().last().unwrap();
    assert_eq!(report.end_type, EndType::Victory);
    assert_eq!(report.victory_type, Some(VictoryType::Hero));
    assert_eq!(report.score, report.gold + report.reputation * 2);
}

#[test]
fn continuing_past_the_haven_starts_a_new_journey() {
    let mut session = session(14);
    session.resources_mut().progress = 97.0;
    session.world_mut().insert_npc(1_000.0, 300.0, NpcKind::Haven);
    assert!(session.open_catalog_encounter(EncounterId::HavenCheckpoint));
    assert!(session.select_choice(1));
    assert!(session.acknowledge());
    assert_eq!(session.status(), GameStatus::Playing);
    assert_eq!(session.resources().journey_count, 2);
    assert!(session.resources().progress.abs() < f32::EPSILON);
    assert!(session.world().npcs.is_empty());
}

#[test]
fn bike_purchase_changes_next_tick() {
    let mut session = session(15);
    session.resources_mut().gold = 60;
    session.key_down("v");
    assert_eq!(session.status(), GameStatus::VehicleSelect);
    assert_eq!(
        session.select_vehicle(VehicleType::Bike),
        Some(PurchaseOutcome::Purchased { cost: 50 })
    );
    assert_eq!(session.resources().gold, 10);
    assert_eq!(session.resources().vehicle, VehicleType::Bike);
    assert_eq!(session.status(), GameStatus::Playing);

    let x = session.world().caravan.x;
    session.key_down("d");
    session.frame(16.0);
    assert!((session.world().caravan.x - x - 7.0).abs() < 1e-4);
    // Moving doubles the 0.05 base; the bike scales it by 0.8.
    assert!((session.resources().food - (100.0 - 0.08)).abs() < 1e-4);
    assert!((session.resources().progress - 2.5 * 1.4 / 80.0).abs() < 1e-6);
}

#[test]
fn starvation_on_last_life_ends_the_run() {
    let engine = engine();
    let mut session = engine.create_session("Tester", 16).unwrap();
    session.resources_mut().lives = 1;
    session.resources_mut().food = 1.0;
    for _ in 0..40 {
        session.world_mut().npcs.clear();
        session.frame(16.0);
    }
    assert_eq!(session.status(), GameStatus::GameOver);
    assert_eq!(session.resources().lives, 0);
    assert!(session.frame(16.0).is_none());
    let report = engine.sink().last().unwrap();
    assert_eq!(report.end_type, EndType::GameOver);
    assert_eq!(report.victory_type, None);

    assert!(session.restart());
    assert_eq!(session.status(), GameStatus::Playing);
    assert_eq!(session.resources().lives, 3);
}

#[test]
fn identical_seed_and_input_replay_identically() {
    let script = ["d", "w", "e", "t", "1", "Enter", "p", "p", "c", "c"];
    let run = |seed: u64| {
        let mut session = session(seed);
        for frame in 0..1_500_u32 {
            if frame % 150 == 0 {
                let key = script[(frame / 150) as usize % script.len()];
                session.key_down(key);
            }
            if frame % 150 == 40 {
                session.key_up("d");
                session.key_up("w");
            }
            if session.status() == GameStatus::Encounter {
                for ordinal in 1..=4 {
                    if session.select_choice(ordinal) {
                        break;
                    }
                }
                session.acknowledge();
            }
            if session.status() == GameStatus::Lottery {
                session.spin_lottery();
                session.claim_lottery();
            }
            session.frame(16.0);
        }
        serde_json::to_string(&session.snapshot()).unwrap()
    };
    assert_eq!(run(2024), run(2024));
}
