//! Active encounter: choice gating, resolution and synthesized encounters.
use log::debug;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::config::CrewConfig;
use crate::data::{
    Choice, ChoiceAction, Encounter, EncounterCatalog, EncounterId, ResourceDelta,
};
use crate::resources::{AppliedDelta, Flag, FlagSet, Passenger, PassengerType, ResourceState};
use crate::rng::pick_index;

/// Why a choice cannot be picked right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ChoiceGate {
    Available,
    MissingPassenger { kind: PassengerType },
    MissingFlag { flag: Flag },
    BlockedByFlag { flag: Flag },
    EmptyCrew,
}

impl ChoiceGate {
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Evaluate a choice against the current crew and flags.
#[must_use]
pub fn choice_gate(choice: &Choice, resources: &ResourceState, flags: &FlagSet) -> ChoiceGate {
    if let Some(kind) = choice.required_passenger
        && !resources.has_passenger(kind)
    {
        return ChoiceGate::MissingPassenger { kind };
    }
    if let Some(flag) = choice.requires_flag
        && !flags.contains(flag)
    {
        return ChoiceGate::MissingFlag { flag };
    }
    if let Some(flag) = choice.blocked_by_flag
        && flags.contains(flag)
    {
        return ChoiceGate::BlockedByFlag { flag };
    }
    if choice.action == Some(ChoiceAction::RemovePassenger) && resources.passengers.is_empty() {
        return ChoiceGate::EmptyCrew;
    }
    ChoiceGate::Available
}

/// Rejected selection attempts. These never escape the session; they are
/// logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoiceError {
    #[error("encounter is already resolved")]
    AlreadyResolved,
    #[error("no choice at ordinal {0}")]
    OutOfRange(usize),
    #[error("choice `{id}` is unavailable: {gate:?}")]
    Unavailable { id: String, gate: ChoiceGate },
}

/// Outcome of a picked choice, shown until acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub choice_id: String,
    pub consequence: String,
    pub action: Option<ChoiceAction>,
    #[serde(skip)]
    pub applied: AppliedDelta,
    pub flag_set: Option<Flag>,
    pub life_restored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EncounterPhase {
    Unresolved,
    Resolved(Resolution),
}

/// An encounter currently holding focus.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEncounter {
    encounter: Encounter,
    phase: EncounterPhase,
    recruit: Option<Passenger>,
}

impl ActiveEncounter {
    #[must_use]
    pub const fn new(encounter: Encounter) -> Self {
        Self {
            encounter,
            phase: EncounterPhase::Unresolved,
            recruit: None,
        }
    }

    /// Replacement prompt carrying the recruit waiting to board.
    #[must_use]
    pub fn replacement(recruit: Passenger, crew: &CrewConfig) -> Self {
        Self {
            encounter: replacement_encounter(&recruit, crew.replacement_bounty),
            phase: EncounterPhase::Unresolved,
            recruit: Some(recruit),
        }
    }

    #[must_use]
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    #[must_use]
    pub const fn id(&self) -> EncounterId {
        self.encounter.id
    }

    #[must_use]
    pub const fn phase(&self) -> &EncounterPhase {
        &self.phase
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.phase, EncounterPhase::Resolved(_))
    }

    #[must_use]
    pub const fn recruit(&self) -> Option<&Passenger> {
        self.recruit.as_ref()
    }

    #[must_use]
    pub fn gates(&self, resources: &ResourceState, flags: &FlagSet) -> Vec<ChoiceGate> {
        self.encounter
            .choices
            .iter()
            .map(|choice| choice_gate(choice, resources, flags))
            .collect()
    }

    /// Pick the choice at a 1-based on-screen ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`ChoiceError`] when the encounter is already resolved, the
    /// ordinal is out of range, or the choice is gated.
    pub fn choose(
        &mut self,
        ordinal: usize,
        resources: &mut ResourceState,
        flags: &mut FlagSet,
    ) -> Result<&Resolution, ChoiceError> {
        if self.is_resolved() {
            return Err(ChoiceError::AlreadyResolved);
        }
        let index = ordinal
            .checked_sub(1)
            .filter(|idx| *idx < self.encounter.choices.len())
            .ok_or(ChoiceError::OutOfRange(ordinal))?;
        let choice = &self.encounter.choices[index];
        let gate = choice_gate(choice, resources, flags);
        if !gate.is_available() {
            return Err(ChoiceError::Unavailable {
                id: choice.id.clone(),
                gate,
            });
        }

        let restores_life = choice
            .life_restore
            .is_some_and(|restore| resources.reputation >= restore.min_reputation);
        let applied = resources.apply_delta(&choice.effects);
        let life_restored = restores_life && resources.restore_life();
        let flag_set = choice.set_flag.filter(|flag| flags.set(*flag));

        debug!(
            "{} resolved with {} (gold {:+}, rep {:+}, food {:+.1})",
            self.encounter.id, choice.id, applied.gold, applied.reputation, applied.food
        );
        self.phase = EncounterPhase::Resolved(Resolution {
            choice_id: choice.id.clone(),
            consequence: choice.consequence.clone(),
            action: choice.action,
            applied,
            flag_set,
            life_restored,
        });
        match &self.phase {
            EncounterPhase::Resolved(resolution) => Ok(resolution),
            EncounterPhase::Unresolved => Err(ChoiceError::AlreadyResolved),
        }
    }

    /// Consume the encounter, yielding the resolution (if any) and recruit.
    #[must_use]
    pub fn finish(self) -> (Option<Resolution>, Option<Passenger>) {
        let resolution = match self.phase {
            EncounterPhase::Resolved(resolution) => Some(resolution),
            EncounterPhase::Unresolved => None,
        };
        (resolution, self.recruit)
    }
}

/// Crew trade built from the current roster, one offer per passenger type.
#[must_use]
pub fn crew_trade_encounter(resources: &ResourceState, catalog: &EncounterCatalog) -> Encounter {
    let mut choices: Vec<Choice> = resources
        .crew_types()
        .into_iter()
        .map(|kind| {
            let offer = catalog.crew_trades.offer(kind);
            Choice::plain(&format!("trade_{kind}"), &offer.text, "Deal done.")
                .with_effects(offer.effects)
        })
        .collect();
    if choices.is_empty() {
        choices.push(Choice::plain(
            "no_pass",
            "Empty wagon...",
            "Nothing to trade.",
        ));
    }
    Encounter {
        id: EncounterId::PassengerTrade,
        title: String::from("CREW CARAVAN TRADE"),
        description: String::from("Your crew gathers. \"We have supplies to swap, Boss.\""),
        icon: String::from("🤝"),
        trade_pool: false,
        choices,
    }
}

/// Full-crew prompt: take the bounty and swap a passenger, or decline.
#[must_use]
pub fn replacement_encounter(recruit: &Passenger, bounty: u32) -> Encounter {
    Encounter {
        id: EncounterId::PassengerReplacement,
        title: String::from("CRITICAL REPLACEMENT"),
        description: format!(
            "The caravan is full, but this {} offers {bounty} GOLD to join.",
            recruit.kind.as_str().to_uppercase()
        ),
        icon: String::from("💰"),
        trade_pool: false,
        choices: vec![
            Choice::plain(
                "confirm_replacement",
                &format!("Accept Bounty ({bounty}G) & Replace"),
                "Replacement complete.",
            )
            .with_effects(ResourceDelta::gold(bounty))
            .with_action(ChoiceAction::ReplacePassenger),
            Choice::plain(
                "cancel_replacement",
                "No, my crew is family.",
                "The traveler wanders off.",
            ),
        ],
    }
}

/// Uniform pick from the trade pool.
pub fn pick_trade_encounter<R: Rng + ?Sized>(
    catalog: &EncounterCatalog,
    rng: &mut R,
) -> Option<Encounter> {
    let pool: Vec<&Encounter> = catalog.trade_pool().collect();
    pick_index(rng, pool.len()).map(|idx| pool[idx].clone())
}

/// Remove a random passenger; returns who left.
pub fn remove_random_passenger<R: Rng + ?Sized>(
    resources: &mut ResourceState,
    rng: &mut R,
) -> Option<Passenger> {
    let idx = pick_index(rng, resources.passengers.len())?;
    Some(resources.passengers.remove(idx))
}

/// Swap a random passenger for `recruit`. With an empty crew the recruit
/// simply boards.
pub fn replace_random_passenger<R: Rng + ?Sized>(
    resources: &mut ResourceState,
    recruit: Passenger,
    rng: &mut R,
) -> Option<Passenger> {
    let removed = remove_random_passenger(resources, rng);
    resources.passengers.push(recruit);
    removed
}
