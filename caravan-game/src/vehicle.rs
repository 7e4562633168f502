//! Vehicle roster and hangar purchases
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::resources::ResourceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Caravan,
    Bike,
    Car,
    Truck,
    Train,
}

/// Static hangar entry for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleSpec {
    pub vehicle: VehicleType,
    pub label: &'static str,
    pub description: &'static str,
    pub cost: u32,
    /// Scales caravan speed, scroll speed and progress gain.
    pub speed_multiplier: f32,
    /// Scales food drain.
    pub food_multiplier: f32,
}

impl VehicleType {
    pub const ALL: [Self; 5] = [Self::Caravan, Self::Bike, Self::Car, Self::Truck, Self::Train];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Caravan => "caravan",
            Self::Bike => "bike",
            Self::Car => "car",
            Self::Truck => "truck",
            Self::Train => "train",
        }
    }

    #[must_use]
    pub const fn spec(self) -> VehicleSpec {
        match self {
            Self::Caravan => VehicleSpec {
                vehicle: self,
                label: "Caravan",
                description: "The classic hauler. Balanced and reliable.",
                cost: 0,
                speed_multiplier: 1.0,
                food_multiplier: 1.0,
            },
            Self::Bike => VehicleSpec {
                vehicle: self,
                label: "Sand Bike",
                description: "Fast and nimble. Low consumption.",
                cost: 50,
                speed_multiplier: 1.4,
                food_multiplier: 0.8,
            },
            Self::Car => VehicleSpec {
                vehicle: self,
                label: "Wasteland Car",
                description: "A repurposed scout car.",
                cost: 100,
                speed_multiplier: 1.2,
                food_multiplier: 1.0,
            },
            Self::Truck => VehicleSpec {
                vehicle: self,
                label: "Heavy Truck",
                description: "Slower, but can carry a full crew.",
                cost: 200,
                speed_multiplier: 0.8,
                food_multiplier: 1.2,
            },
            Self::Train => VehicleSpec {
                vehicle: self,
                label: "Chunk Train",
                description: "Extremely fast but burns resources.",
                cost: 500,
                speed_multiplier: 1.6,
                food_multiplier: 1.8,
            },
        }
    }

    #[must_use]
    pub const fn cost(self) -> u32 {
        self.spec().cost
    }

    #[must_use]
    pub const fn speed_multiplier(self) -> f32 {
        self.spec().speed_multiplier
    }

    #[must_use]
    pub const fn food_multiplier(self) -> f32 {
        self.spec().food_multiplier
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|vehicle| vehicle.as_str() == s)
            .ok_or(())
    }
}

/// Full hangar listing in display order.
#[must_use]
pub fn hangar() -> [VehicleSpec; 5] {
    VehicleType::ALL.map(VehicleType::spec)
}

/// Outcome of picking a vehicle in the hangar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Gold was deducted and the vehicle swapped.
    Purchased { cost: u32 },
    /// The vehicle is already in use; nothing was charged.
    AlreadyOwned,
    /// Not enough gold; resources were left untouched.
    Unaffordable { cost: u32, gold: u32 },
}

impl PurchaseOutcome {
    /// Whether the hangar should close after this pick.
    #[must_use]
    pub const fn closes_hangar(self) -> bool {
        !matches!(self, Self::Unaffordable { .. })
    }
}

/// Attempt to switch to `vehicle`, charging its cost unless it is already owned.
pub fn select_vehicle(resources: &mut ResourceState, vehicle: VehicleType) -> PurchaseOutcome {
    if resources.vehicle == vehicle {
        return PurchaseOutcome::AlreadyOwned;
    }
    let cost = vehicle.cost();
    if resources.gold < cost {
        return PurchaseOutcome::Unaffordable {
            cost,
            gold: resources.gold,
        };
    }
    resources.gold -= cost;
    resources.vehicle = vehicle;
    PurchaseOutcome::Purchased { cost }
}
