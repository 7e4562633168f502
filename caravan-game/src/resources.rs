//! Run-long resource model: vitals, economy, crew and story flags.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::config::{CrewConfig, FoodConfig, MovementConfig};
use crate::constants::{FOOD_MAX, MAX_LIVES};
use crate::data::ResourceDelta;
use crate::numbers::{clamp_i64_to_u32, u32_to_f32};
use crate::vehicle::VehicleType;

/// Crew roles a recruit can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerType {
    Merchant,
    Cook,
    Scholar,
    Guard,
}

impl PassengerType {
    pub const ALL: [Self; 4] = [Self::Merchant, Self::Cook, Self::Scholar, Self::Guard];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merchant => "merchant",
            Self::Cook => "cook",
            Self::Scholar => "scholar",
            Self::Guard => "guard",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Merchant => "Merchant",
            Self::Cook => "Cook",
            Self::Scholar => "Scholar",
            Self::Guard => "Guard",
        }
    }
}

impl fmt::Display for PassengerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassengerType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// A recruited crew member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: u32,
    pub name: String,
    pub kind: PassengerType,
    pub bonus_text: String,
}

impl Passenger {
    #[must_use]
    pub fn traveler(id: u32, kind: PassengerType) -> Self {
        Self {
            id,
            name: String::from("Traveler"),
            kind,
            bonus_text: String::from("Ready for hire"),
        }
    }
}

/// One-way story and upgrade flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    SpeedUpgrade,
    CapacityUpgrade,
    EfficiencyUpgrade,
    CursedCaravan,
    HelpedWanderer,
    BanditNotoriety,
    KnightBlessing,
    SecretMaps,
    GolemBlessing,
}

impl Flag {
    pub const ALL: [Self; 9] = [
        Self::SpeedUpgrade,
        Self::CapacityUpgrade,
        Self::EfficiencyUpgrade,
        Self::CursedCaravan,
        Self::HelpedWanderer,
        Self::BanditNotoriety,
        Self::KnightBlessing,
        Self::SecretMaps,
        Self::GolemBlessing,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpeedUpgrade => "speed_upgrade",
            Self::CapacityUpgrade => "capacity_upgrade",
            Self::EfficiencyUpgrade => "efficiency_upgrade",
            Self::CursedCaravan => "cursed_caravan",
            Self::HelpedWanderer => "helped_wanderer",
            Self::BanditNotoriety => "bandit_notoriety",
            Self::KnightBlessing => "knight_blessing",
            Self::SecretMaps => "secret_maps",
            Self::GolemBlessing => "golem_blessing",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|flag| flag.as_str() == s).ok_or(())
    }
}

/// Insert-only flag set. Flags are never cleared within a run; only a
/// restart builds a fresh set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the flag was newly set.
    pub fn set(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    #[must_use]
    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Amounts actually moved by a delta after clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AppliedDelta {
    pub food: f32,
    pub gold: i64,
    pub reputation: i64,
}

impl AppliedDelta {
    #[must_use]
    pub fn gold_spent(&self) -> u32 {
        clamp_i64_to_u32(-self.gold)
    }

    #[must_use]
    pub fn gold_earned(&self) -> u32 {
        clamp_i64_to_u32(self.gold)
    }
}

/// The mutable economic and vital state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub food: f32,
    pub gold: u32,
    pub reputation: u32,
    pub lives: u8,
    pub progress: f32,
    pub journey_count: u32,
    pub passengers: SmallVec<[Passenger; 5]>,
    pub vehicle: VehicleType,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::initial()
    }
}

impl ResourceState {
    /// Resources every run starts with.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            food: FOOD_MAX,
            gold: 32,
            reputation: 0,
            lives: MAX_LIVES,
            progress: 0.0,
            journey_count: 1,
            passengers: SmallVec::new(),
            vehicle: VehicleType::Caravan,
        }
    }

    /// Net a choice delta into the resources. Food is clamped to
    /// `[0, FOOD_MAX]`; gold and reputation are floored at zero.
    pub fn apply_delta(&mut self, delta: &ResourceDelta) -> AppliedDelta {
        let food_before = self.food;
        let gold_before = i64::from(self.gold);
        let reputation_before = i64::from(self.reputation);

        let food_net = u32_to_f32(delta.food_gain) - u32_to_f32(delta.food_cost);
        self.food = (self.food + food_net).clamp(0.0, FOOD_MAX);

        let gold = gold_before + i64::from(delta.gold_gain) - i64::from(delta.gold_cost);
        self.gold = clamp_i64_to_u32(gold);
        let reputation = reputation_before + i64::from(delta.reputation_gain)
            - i64::from(delta.reputation_cost);
        self.reputation = clamp_i64_to_u32(reputation);

        AppliedDelta {
            food: self.food - food_before,
            gold: i64::from(self.gold) - gold_before,
            reputation: i64::from(self.reputation) - reputation_before,
        }
    }

    /// Add gold from pickups and rewards.
    pub fn earn_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Remove gold, flooring at zero. Returns the amount actually removed.
    pub fn spend_gold(&mut self, amount: u32) -> u32 {
        let spent = amount.min(self.gold);
        self.gold -= spent;
        spent
    }

    /// Restore one life, capped at the starting maximum.
    pub fn restore_life(&mut self) -> bool {
        if self.lives < MAX_LIVES {
            self.lives += 1;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn has_passenger(&self, kind: PassengerType) -> bool {
        self.passengers.iter().any(|p| p.kind == kind)
    }

    /// Distinct passenger types in crew order.
    #[must_use]
    pub fn crew_types(&self) -> SmallVec<[PassengerType; 4]> {
        let mut kinds = SmallVec::new();
        for passenger in &self.passengers {
            if !kinds.contains(&passenger.kind) {
                kinds.push(passenger.kind);
            }
        }
        kinds
    }

    /// Crew capacity given the current flags.
    #[must_use]
    pub fn capacity(flags: &FlagSet, crew: &CrewConfig) -> usize {
        if flags.contains(Flag::CapacityUpgrade) {
            crew.upgraded_capacity
        } else {
            crew.base_capacity
        }
    }

    /// Per-frame food drain multiplier from vehicle, crew and upgrades.
    #[must_use]
    pub fn drain_multiplier(&self, flags: &FlagSet, food: &FoodConfig) -> f32 {
        let mut multiplier = self.vehicle.food_multiplier();
        if self.has_passenger(PassengerType::Cook) {
            multiplier *= food.cook_factor;
        }
        if flags.contains(Flag::EfficiencyUpgrade) {
            multiplier *= food.efficiency_factor;
        }
        multiplier
    }

    /// Caravan speed per reference frame.
    #[must_use]
    pub fn caravan_speed(&self, flags: &FlagSet, movement: &MovementConfig) -> f32 {
        let mut speed = movement.player_speed * self.vehicle.speed_multiplier();
        if flags.contains(Flag::SpeedUpgrade) {
            speed *= movement.speed_upgrade_factor;
        }
        speed
    }

    /// Walker speed per reference frame; vehicles and upgrades do not apply.
    #[must_use]
    pub fn walker_speed(movement: &MovementConfig) -> f32 {
        movement.player_speed * movement.walker_speed_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cook() -> Passenger {
        Passenger::traveler(1, PassengerType::Cook)
    }

    #[test]
    fn initial_resources_match_run_start() {
        let resources = ResourceState::initial();
        assert!((resources.food - 100.0).abs() < f32::EPSILON);
        assert_eq!(resources.gold, 32);
        assert_eq!(resources.reputation, 0);
        assert_eq!(resources.lives, 3);
        assert_eq!(resources.journey_count, 1);
        assert!(resources.passengers.is_empty());
    }

    #[test]
    fn deltas_clamp_food_and_floor_currencies() {
        let mut resources = ResourceState {
            food: 90.0,
            gold: 10,
            reputation: 5,
            ..ResourceState::initial()
        };
        let applied = resources.apply_delta(&ResourceDelta {
            food_gain: 50,
            gold_cost: 40,
            reputation_cost: 30,
            ..ResourceDelta::default()
        });
        assert!((resources.food - 100.0).abs() < f32::EPSILON);
        assert_eq!(resources.gold, 0);
        assert_eq!(resources.reputation, 0);
        assert_eq!(applied.gold, -10);
        assert_eq!(applied.gold_spent(), 10);
        assert!((applied.food - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cost_and_gain_on_same_currency_net_before_clamping() {
        let mut resources = ResourceState {
            reputation: 10,
            ..ResourceState::initial()
        };
        resources.apply_delta(&ResourceDelta {
            reputation_cost: 10,
            reputation_gain: 40,
            ..ResourceDelta::default()
        });
        assert_eq!(resources.reputation, 40);
    }

    #[test]
    fn drain_multipliers_compose() {
        let mut flags = FlagSet::new();
        let food = FoodConfig::default();
        let mut resources = ResourceState::initial();
        assert!((resources.drain_multiplier(&flags, &food) - 1.0).abs() < 1e-6);
        resources.passengers.push(cook());
        flags.set(Flag::EfficiencyUpgrade);
        assert!((resources.drain_multiplier(&flags, &food) - 0.6).abs() < 1e-6);
        resources.vehicle = VehicleType::Train;
        assert!((resources.drain_multiplier(&flags, &food) - 1.08).abs() < 1e-5);
    }

    #[test]
    fn capacity_grows_with_upgrade() {
        let mut flags = FlagSet::new();
        let crew = CrewConfig::default();
        assert_eq!(ResourceState::capacity(&flags, &crew), 3);
        assert!(flags.set(Flag::CapacityUpgrade));
        assert!(!flags.set(Flag::CapacityUpgrade));
        assert_eq!(ResourceState::capacity(&flags, &crew), 5);
    }

    #[test]
    fn lives_restore_caps_at_three() {
        let mut resources = ResourceState {
            lives: 2,
            ..ResourceState::initial()
        };
        assert!(resources.restore_life());
        assert!(!resources.restore_life());
        assert_eq!(resources.lives, 3);
    }

    #[test]
    fn speed_upgrade_only_scales_caravan() {
        let mut flags = FlagSet::new();
        let movement = MovementConfig::default();
        let resources = ResourceState {
            vehicle: VehicleType::Bike,
            ..ResourceState::initial()
        };
        assert!((resources.caravan_speed(&flags, &movement) - 7.0).abs() < 1e-5);
        flags.set(Flag::SpeedUpgrade);
        assert!((resources.caravan_speed(&flags, &movement) - 9.8).abs() < 1e-5);
        assert!((ResourceState::walker_speed(&movement) - 6.0).abs() < 1e-5);
    }

    #[test]
    fn crew_types_deduplicate_in_order() {
        let mut resources = ResourceState::initial();
        resources.passengers.push(Passenger::traveler(1, PassengerType::Guard));
        resources.passengers.push(cook());
        resources.passengers.push(Passenger::traveler(3, PassengerType::Guard));
        assert_eq!(
            resources.crew_types().as_slice(),
            &[PassengerType::Guard, PassengerType::Cook]
        );
        assert_eq!("scholar".parse::<PassengerType>(), Ok(PassengerType::Scholar));
        assert_eq!("secret_maps".parse::<Flag>(), Ok(Flag::SecretMaps));
    }
}
