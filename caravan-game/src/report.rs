//! End-of-run summary and the leaderboard sink it is delivered to.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::constants::SCORE_REPUTATION_WEIGHT;
use crate::resources::ResourceState;

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub encounters_triggered: u32,
    pub choices_made: u32,
    pub coins_collected: u32,
    pub passengers_onboarded: u32,
    pub bullets_shot: u32,
    pub vehicle_changes: u32,
    pub mystery_boxes_opened: u32,
    /// Progress points covered across all journeys.
    pub distance_traveled: f32,
    pub food_consumed: f32,
    pub gold_spent: u32,
    pub gold_earned: u32,
    /// Lives lost plus collateral hits.
    pub damages_taken: u32,
}

impl SessionStats {
    pub fn earn(&mut self, amount: u32) {
        self.gold_earned = self.gold_earned.saturating_add(amount);
    }

    pub fn spend(&mut self, amount: u32) {
        self.gold_spent = self.gold_spent.saturating_add(amount);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndType {
    GameOver,
    Victory,
    Exit,
}

impl EndType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GameOver => "gameover",
            Self::Victory => "victory",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for EndType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryType {
    MerchantPrince,
    IronMonger,
    Hero,
    HumbleSurvivor,
}

impl VictoryType {
    /// Title carried by a report. Retiring at a haven always earns `Hero`;
    /// the other titles are presentation labels for end screens.
    #[must_use]
    pub const fn for_ending(end_type: EndType) -> Option<Self> {
        match end_type {
            EndType::Victory => Some(Self::Hero),
            EndType::GameOver | EndType::Exit => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MerchantPrince => "merchant_prince",
            Self::IronMonger => "iron_monger",
            Self::Hero => "hero",
            Self::HumbleSurvivor => "humble_survivor",
        }
    }
}

impl fmt::Display for VictoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `gold + reputation × 2`, saturating.
#[must_use]
pub const fn score(gold: u32, reputation: u32) -> u32 {
    gold.saturating_add(reputation.saturating_mul(SCORE_REPUTATION_WEIGHT))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub player: String,
    pub seed: u64,
    pub score: u32,
    pub gold: u32,
    pub reputation: u32,
    pub stats: SessionStats,
    pub resources: ResourceState,
    pub end_type: EndType,
    pub victory_type: Option<VictoryType>,
}

impl SessionReport {
    #[must_use]
    pub fn new(
        player: &str,
        seed: u64,
        resources: &ResourceState,
        stats: &SessionStats,
        end_type: EndType,
    ) -> Self {
        let victory_type = VictoryType::for_ending(end_type);
        Self {
            player: player.to_string(),
            seed,
            score: score(resources.gold, resources.reputation),
            gold: resources.gold,
            reputation: resources.reputation,
            stats: stats.clone(),
            resources: resources.clone(),
            end_type,
            victory_type,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("report rejected: {0}")]
    Rejected(String),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence/leaderboard collaborator notified on every terminal transition.
pub trait SessionSink {
    /// Deliver a finished run.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the report cannot be stored. The session
    /// logs the failure and carries on.
    fn record(&mut self, report: &SessionReport) -> Result<(), SinkError>;
}

/// In-memory sink; clones share one report list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Rc<RefCell<Vec<SessionReport>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<SessionReport> {
        self.reports.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<SessionReport> {
        self.reports.borrow().last().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl SessionSink for MemorySink {
    fn record(&mut self, report: &SessionReport) -> Result<(), SinkError> {
        self.reports.borrow_mut().push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victory_titles() {
        assert_eq!(
            VictoryType::for_ending(EndType::Victory),
            Some(VictoryType::Hero)
        );
        assert_eq!(VictoryType::for_ending(EndType::GameOver), None);
        assert_eq!(VictoryType::for_ending(EndType::Exit), None);
        assert_eq!(VictoryType::MerchantPrince.to_string(), "merchant_prince");
    }

    #[test]
    fn only_victories_carry_a_title() {
        let mut resources = ResourceState::initial();
        resources.reputation = 10;
        let stats = SessionStats::default();
        let lost = SessionReport::new("Ada", 1, &resources, &stats, EndType::GameOver);
        assert_eq!(lost.victory_type, None);
        assert_eq!(lost.score, 52);
        resources.gold = 900;
        let won = SessionReport::new("Ada", 1, &resources, &stats, EndType::Victory);
        assert_eq!(won.victory_type, Some(VictoryType::Hero));
    }

    #[test]
    fn memory_sink_clones_share_reports() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        let report = SessionReport::new(
            "Ada",
            3,
            &ResourceState::initial(),
            &SessionStats::default(),
            EndType::Exit,
        );
        writer.record(&report).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.last().unwrap().end_type, EndType::Exit);
    }

    #[test]
    fn report_serializes_end_type_lowercase() {
        let report = SessionReport::new(
            "Ada",
            3,
            &ResourceState::initial(),
            &SessionStats::default(),
            EndType::GameOver,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["end_type"], "gameover");
        assert!(json["victory_type"].is_null());
    }
}
