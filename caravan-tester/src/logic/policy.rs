use std::fmt;
use std::str::FromStr;

use caravan_game::data::Encounter;
use caravan_game::{Choice, ChoiceGate, Npc, NpcKind, ResourceState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(choice_index: usize, rationale: Option<String>) -> Self {
        Self {
            choice_index,
            rationale,
        }
    }

    /// Key ordinal the session expects.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.choice_index + 1
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select an available choice for an active encounter. `None` means
    /// every choice is locked.
    fn pick_choice(
        &mut self,
        resources: &ResourceState,
        encounter: &Encounter,
        gates: &[ChoiceGate],
    ) -> Option<PolicyDecision>;

    /// Whether the caravan should steer into `npc`.
    fn wants(&self, npc: &Npc) -> bool;

    /// Whether to take on travelers met on the road.
    fn recruits(&self) -> bool {
        false
    }
}

/// Built-in driving strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Cautious,
    Greedy,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 3] = [Self::Cautious, Self::Greedy, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "cautious",
            Self::Greedy => "greedy",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Greedy => Box::new(GreedyPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown strategy `{0}` (expected cautious, greedy or random)")]
pub struct UnknownStrategy(pub String);

impl FromStr for GameplayStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label() == wanted)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Avoids merchants and picks the cheapest available option.
struct CautiousPolicy;

/// Chases everything on the road and maximizes gold and reputation.
struct GreedyPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "cautious"
    }

    fn pick_choice(
        &mut self,
        _resources: &ResourceState,
        encounter: &Encounter,
        gates: &[ChoiceGate],
    ) -> Option<PolicyDecision> {
        let (idx, risk) = available(encounter, gates)
            .map(|(idx, choice)| (idx, cautious_risk(choice)))
            .min_by_key(|(_, risk)| *risk)?;
        Some(PolicyDecision::new(idx, Some(format!("risk {risk}"))))
    }

    fn wants(&self, npc: &Npc) -> bool {
        matches!(
            npc.kind,
            NpcKind::Coin { .. } | NpcKind::MysteryBox | NpcKind::Haven
        )
    }
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn pick_choice(
        &mut self,
        resources: &ResourceState,
        encounter: &Encounter,
        gates: &[ChoiceGate],
    ) -> Option<PolicyDecision> {
        let (idx, reward) = available(encounter, gates)
            .map(|(idx, choice)| (idx, greedy_reward(choice, resources)))
            .max_by_key(|(_, reward)| *reward)?;
        Some(PolicyDecision::new(idx, Some(format!("reward {reward}"))))
    }

    fn wants(&self, npc: &Npc) -> bool {
        !matches!(npc.kind, NpcKind::Person { .. })
    }

    fn recruits(&self) -> bool {
        true
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn pick_choice(
        &mut self,
        _resources: &ResourceState,
        encounter: &Encounter,
        gates: &[ChoiceGate],
    ) -> Option<PolicyDecision> {
        let open: Vec<usize> = available(encounter, gates).map(|(idx, _)| idx).collect();
        if open.is_empty() {
            return None;
        }
        let idx = open[self.rng.gen_range(0..open.len())];
        Some(PolicyDecision::new(idx, None))
    }

    fn wants(&self, npc: &Npc) -> bool {
        !matches!(npc.kind, NpcKind::Trader { .. }) || npc.id % 2 == 0
    }

    fn recruits(&self) -> bool {
        true
    }
}

fn available<'a>(
    encounter: &'a Encounter,
    gates: &'a [ChoiceGate],
) -> impl Iterator<Item = (usize, &'a Choice)> + 'a {
    encounter
        .choices
        .iter()
        .zip(gates)
        .enumerate()
        .filter(|(_, (_, gate))| gate.is_available())
        .map(|(idx, (choice, _))| (idx, choice))
}

fn cautious_risk(choice: &Choice) -> i64 {
    let eff = &choice.effects;
    let mut risk = i64::from(eff.food_cost) * 4
        + i64::from(eff.gold_cost) * 2
        + i64::from(eff.reputation_cost) * 2;
    if choice.action.is_some() {
        // Crew changes and journey loops are left to the player.
        risk += 1_000;
    }
    risk
}

fn greedy_reward(choice: &Choice, resources: &ResourceState) -> i64 {
    let eff = &choice.effects;
    let mut reward = i64::from(eff.gold_gain) + i64::from(eff.reputation_gain) * 2
        - i64::from(eff.gold_cost)
        - i64::from(eff.reputation_cost) * 2;
    if resources.food < 40.0 {
        reward += i64::from(eff.food_gain) * 2 - i64::from(eff.food_cost) * 3;
    }
    if choice.life_restore.is_some() && resources.lives < 3 {
        reward += 50;
    }
    reward
}
