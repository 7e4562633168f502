//! Encounter catalog, crew trade offers and lottery rewards.
//!
//! The catalog is plain data: the engine only ever reads it, and any
//! [`crate::DataLoader`] may swap in a different JSON document.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::resources::{Flag, PassengerType};

const BUILTIN_CATALOG: &str = include_str!("../assets/data/catalog.json");

/// Errors raised while loading or validating catalog data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("encounter `{0}` appears more than once")]
    DuplicateEncounter(EncounterId),
    #[error("encounter `{0}` is synthesized at runtime and cannot be listed in the catalog")]
    ReservedEncounter(EncounterId),
    #[error("required encounter `{0}` is missing")]
    MissingEncounter(EncounterId),
    #[error("encounter `{0}` has no choices")]
    NoChoices(EncounterId),
    #[error("encounter `{encounter}` repeats choice id `{choice}`")]
    DuplicateChoice {
        encounter: EncounterId,
        choice: String,
    },
    #[error("lottery needs at least one reward")]
    EmptyLottery,
    #[error("no encounter is eligible for random spawning")]
    EmptySpawnPool,
}

/// Closed set of encounter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterId {
    StrangeTraveler,
    FoodProvisioner,
    TravelingArtisan,
    Technomancer,
    SoulStitcher,
    ProvisionMaster,
    DesertMirage,
    KnightsVigil,
    WanderingLibrary,
    BlockyBanker,
    CursedRelic,
    AncientGolem,
    ShadyDealer,
    TravelingHerbalist,
    DiplomaticEnvoy,
    HungryMerchant,
    BanditToll,
    FoodCart,
    Waystation,
    HavenCheckpoint,
    /// Built from the current crew on demand.
    PassengerTrade,
    /// Offered when a recruit is found at full capacity.
    PassengerReplacement,
}

impl EncounterId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrangeTraveler => "strange_traveler",
            Self::FoodProvisioner => "food_provisioner",
            Self::TravelingArtisan => "traveling_artisan",
            Self::Technomancer => "technomancer",
            Self::SoulStitcher => "soul_stitcher",
            Self::ProvisionMaster => "provision_master",
            Self::DesertMirage => "desert_mirage",
            Self::KnightsVigil => "knights_vigil",
            Self::WanderingLibrary => "wandering_library",
            Self::BlockyBanker => "blocky_banker",
            Self::CursedRelic => "cursed_relic",
            Self::AncientGolem => "ancient_golem",
            Self::ShadyDealer => "shady_dealer",
            Self::TravelingHerbalist => "traveling_herbalist",
            Self::DiplomaticEnvoy => "diplomatic_envoy",
            Self::HungryMerchant => "hungry_merchant",
            Self::BanditToll => "bandit_toll",
            Self::FoodCart => "food_cart",
            Self::Waystation => "waystation",
            Self::HavenCheckpoint => "haven_checkpoint",
            Self::PassengerTrade => "passenger_trade",
            Self::PassengerReplacement => "passenger_replacement",
        }
    }

    /// Checkpoints are placed by progress, never drawn at random.
    #[must_use]
    pub const fn is_reserved_checkpoint(self) -> bool {
        matches!(self, Self::Waystation | Self::HavenCheckpoint)
    }

    #[must_use]
    pub const fn is_synthesized(self) -> bool {
        matches!(self, Self::PassengerTrade | Self::PassengerReplacement)
    }
}

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource costs and gains carried by a choice. Costs and gains on the
/// same resource are netted before clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceDelta {
    pub food_cost: u32,
    pub food_gain: u32,
    pub gold_cost: u32,
    pub gold_gain: u32,
    pub reputation_cost: u32,
    pub reputation_gain: u32,
}

impl ResourceDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub const fn gold(amount: u32) -> Self {
        Self {
            food_cost: 0,
            food_gain: 0,
            gold_cost: 0,
            gold_gain: amount,
            reputation_cost: 0,
            reputation_gain: 0,
        }
    }
}

/// Side effect executed when a resolved encounter is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceAction {
    ContinueJourney,
    EndJourney,
    RemovePassenger,
    ReplacePassenger,
}

/// Restores a life when the player's renown meets the threshold before the
/// choice's own costs apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeRestore {
    pub min_reputation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub consequence: String,
    #[serde(default)]
    pub effects: ResourceDelta,
    #[serde(default)]
    pub set_flag: Option<Flag>,
    #[serde(default)]
    pub required_passenger: Option<PassengerType>,
    #[serde(default)]
    pub requires_flag: Option<Flag>,
    #[serde(default)]
    pub blocked_by_flag: Option<Flag>,
    #[serde(default)]
    pub life_restore: Option<LifeRestore>,
    #[serde(default)]
    pub action: Option<ChoiceAction>,
}

impl Choice {
    /// Minimal choice with no effects or gating.
    #[must_use]
    pub fn plain(id: &str, text: &str, consequence: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            consequence: consequence.to_string(),
            effects: ResourceDelta::default(),
            set_flag: None,
            required_passenger: None,
            requires_flag: None,
            blocked_by_flag: None,
            life_restore: None,
            action: None,
        }
    }

    #[must_use]
    pub fn with_effects(mut self, effects: ResourceDelta) -> Self {
        self.effects = effects;
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: ChoiceAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
    /// Eligible for the trade hotkey.
    #[serde(default)]
    pub trade_pool: bool,
    pub choices: Vec<Choice>,
}

/// Offer a passenger of one type makes during a crew trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewTradeOffer {
    pub text: String,
    #[serde(default)]
    pub effects: ResourceDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewTrades {
    pub merchant: CrewTradeOffer,
    pub cook: CrewTradeOffer,
    pub scholar: CrewTradeOffer,
    pub guard: CrewTradeOffer,
}

impl CrewTrades {
    #[must_use]
    pub const fn offer(&self, kind: PassengerType) -> &CrewTradeOffer {
        match kind {
            PassengerType::Merchant => &self.merchant,
            PassengerType::Cook => &self.cook,
            PassengerType::Scholar => &self.scholar,
            PassengerType::Guard => &self.guard,
        }
    }
}

/// One wedge of the lottery wheel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryReward {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub gold: Option<u32>,
    #[serde(default)]
    pub food: Option<u32>,
    #[serde(default)]
    pub reputation: Option<u32>,
    #[serde(default)]
    pub lives: Option<u32>,
}

impl LotteryReward {
    /// Gold paid out when the reward is traded in. An explicit gold value
    /// wins; otherwise the reward kind maps to a fixed price.
    #[must_use]
    pub fn trade_value(&self) -> u32 {
        if let Some(gold) = self.gold {
            gold
        } else if self.food.is_some() {
            45
        } else if self.reputation.is_some() {
            35
        } else if self.lives.is_some() {
            100
        } else {
            25
        }
    }
}

/// Immutable catalog consumed by the spawn director and encounter machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterCatalog {
    #[serde(default)]
    pub version: u32,
    pub encounters: Vec<Encounter>,
    pub crew_trades: CrewTrades,
    pub lottery_rewards: Vec<LotteryReward>,
}

impl EncounterCatalog {
    /// Parse catalog JSON without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into catalog data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse and validate catalog JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if parsing or validation fails.
    pub fn load(json: &str) -> Result<Self, CatalogError> {
        let catalog = Self::from_json(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Catalog shipped with the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the embedded asset is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::load(BUILTIN_CATALOG)
    }

    /// Check structural invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for encounter in &self.encounters {
            if encounter.id.is_synthesized() {
                return Err(CatalogError::ReservedEncounter(encounter.id));
            }
            if !seen.insert(encounter.id) {
                return Err(CatalogError::DuplicateEncounter(encounter.id));
            }
            if encounter.choices.is_empty() {
                return Err(CatalogError::NoChoices(encounter.id));
            }
            let mut choice_ids = HashSet::new();
            for choice in &encounter.choices {
                if !choice_ids.insert(choice.id.as_str()) {
                    return Err(CatalogError::DuplicateChoice {
                        encounter: encounter.id,
                        choice: choice.id.clone(),
                    });
                }
            }
        }
        for required in [EncounterId::Waystation, EncounterId::HavenCheckpoint] {
            if !seen.contains(&required) {
                return Err(CatalogError::MissingEncounter(required));
            }
        }
        if self.spawn_pool().next().is_none() {
            return Err(CatalogError::EmptySpawnPool);
        }
        if self.lottery_rewards.is_empty() {
            return Err(CatalogError::EmptyLottery);
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: EncounterId) -> Option<&Encounter> {
        self.encounters.iter().find(|encounter| encounter.id == id)
    }

    /// Encounters eligible for uniform random spawning.
    pub fn spawn_pool(&self) -> impl Iterator<Item = &Encounter> + '_ {
        self.encounters
            .iter()
            .filter(|encounter| !encounter.id.is_reserved_checkpoint())
    }

    /// Encounters reachable through the trade hotkey.
    pub fn trade_pool(&self) -> impl Iterator<Item = &Encounter> + '_ {
        self.encounters.iter().filter(|encounter| encounter.trade_pool)
    }
}
