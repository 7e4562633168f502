use std::collections::HashSet;

use caravan_game::data::{CatalogError, EncounterCatalog};
use caravan_game::{ChoiceAction, EncounterId, Flag, TuningConfig, VehicleType};
use serde_json::Value;

fn builtin() -> EncounterCatalog {
    EncounterCatalog::builtin().unwrap()
}

#[test]
fn builtin_catalog_round_trips_through_json() {
    let catalog = builtin();
    let json = serde_json::to_string(&catalog).unwrap();
    let reparsed = EncounterCatalog::load(&json).unwrap();
    assert_eq!(reparsed, catalog);
}

#[test]
fn reserved_checkpoints_stay_out_of_random_spawns() {
    let catalog = builtin();
    let pool: HashSet<EncounterId> = catalog.spawn_pool().map(|e| e.id).collect();
    assert!(!pool.contains(&EncounterId::Waystation));
    assert!(!pool.contains(&EncounterId::HavenCheckpoint));
    assert_eq!(pool.len(), catalog.encounters.len() - 2);
}

#[test]
fn trade_pool_matches_merchant_roster() {
    let pool: HashSet<EncounterId> = builtin().trade_pool().map(|e| e.id).collect();
    let expected: HashSet<EncounterId> = [
        EncounterId::Technomancer,
        EncounterId::SoulStitcher,
        EncounterId::ProvisionMaster,
        EncounterId::FoodProvisioner,
        EncounterId::TravelingArtisan,
        EncounterId::HungryMerchant,
    ]
    .into_iter()
    .collect();
    assert_eq!(pool, expected);
}

#[test]
fn haven_offers_loop_or_retire() {
    let catalog = builtin();
    let haven = catalog.get(EncounterId::HavenCheckpoint).unwrap();
    let actions: Vec<Option<ChoiceAction>> = haven.choices.iter().map(|c| c.action).collect();
    assert!(actions.contains(&Some(ChoiceAction::ContinueJourney)));
    assert!(actions.contains(&Some(ChoiceAction::EndJourney)));
}

#[test]
fn merchant_offers_are_never_flag_locked() {
    for encounter in &builtin().encounters {
        for choice in &encounter.choices {
            assert_eq!(
                choice.blocked_by_flag, None,
                "{} / {} locks itself",
                encounter.id, choice.id
            );
        }
    }
    let relic = builtin().get(EncounterId::CursedRelic).unwrap().clone();
    let open = relic.choices.iter().find(|c| c.id == "open_relic").unwrap();
    assert_eq!(open.set_flag, Some(Flag::CursedCaravan));
    assert_eq!(open.effects.gold_gain, 250);
}

#[test]
fn lottery_rewards_all_trade_for_gold() {
    let catalog = builtin();
    assert_eq!(catalog.lottery_rewards.len(), 6);
    for reward in &catalog.lottery_rewards {
        assert!(reward.trade_value() > 0, "{} pays nothing", reward.id);
    }
}

#[test]
fn catalog_json_uses_snake_case_ids() {
    let raw: Value =
        serde_json::from_str(include_str!("../assets/data/catalog.json")).unwrap();
    for entry in raw["encounters"].as_array().unwrap() {
        let id = entry["id"].as_str().unwrap();
        assert!(
            id.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
            "{id}"
        );
    }
}

#[test]
fn synthesized_encounters_are_rejected_in_data() {
    let json = r#"{
        "version": 1,
        "encounters": [
            { "id": "passenger_trade", "title": "T", "description": "D", "icon": "?",
              "choices": [ { "id": "a", "text": "A", "consequence": "C" } ] }
        ],
        "crew_trades": {
            "merchant": { "text": "m" }, "cook": { "text": "c" },
            "scholar": { "text": "s" }, "guard": { "text": "g" }
        },
        "lottery_rewards": [ { "id": "gold", "label": "G", "gold": 5 } ]
    }"#;
    let err = EncounterCatalog::load(json).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::ReservedEncounter(EncounterId::PassengerTrade)
    ));
}

#[test]
fn default_tuning_is_valid_and_partial_json_fills_defaults() {
    TuningConfig::default().validate().unwrap();
    let tuning = TuningConfig::from_json(r#"{"spawn":{"interval_ms":500.0}}"#).unwrap();
    assert!((tuning.spawn.interval_ms - 500.0).abs() < f32::EPSILON);
    assert_eq!(tuning.food, TuningConfig::default().food);
    tuning.validate().unwrap();
}

#[test]
fn vehicle_table_matches_hangar_prices() {
    let costs: Vec<(VehicleType, u32)> = VehicleType::ALL.iter().map(|v| (*v, v.cost())).collect();
    assert_eq!(
        costs,
        vec![
            (VehicleType::Caravan, 0),
            (VehicleType::Bike, 50),
            (VehicleType::Car, 100),
            (VehicleType::Truck, 200),
            (VehicleType::Train, 500),
        ]
    );
}
