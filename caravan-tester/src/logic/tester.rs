use colored::Colorize;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::policy::GameplayStrategy;
use super::scenarios::{ScenarioCtx, TestScenario};

/// One seed that failed, with enough context to replay it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub seeds_run: usize,
    pub successful_seeds: usize,
    pub failures: Vec<SeedFailure>,
    pub notes: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Settings shared by every scenario in one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub frames: u32,
    pub strategies: Vec<GameplayStrategy>,
    pub verbose: bool,
}

pub struct LogicTester {
    options: RunOptions,
}

impl LogicTester {
    #[must_use]
    pub const fn new(options: RunOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn run_scenario(&self, scenario: &TestScenario, seeds: &[u64]) -> ScenarioResult {
        if self.options.verbose {
            println!("🧪 Testing scenario: {}", scenario.name.bright_white());
        }

        let mut failures = Vec::new();
        let mut notes = Vec::new();
        let mut performance_data = Vec::with_capacity(seeds.len());

        for &seed in seeds {
            let ctx = ScenarioCtx {
                seed,
                frames: self.options.frames,
                strategies: self.options.strategies.clone(),
            };
            let start_time = Instant::now();
            let outcome = scenario.run(&ctx);
            let duration = start_time.elapsed();
            performance_data.push(duration);

            match outcome {
                Ok(note) => {
                    debug!("{} seed {seed}: {note}", scenario.name);
                    if self.options.verbose {
                        println!("  ✅ seed {seed} passed ({duration:?}) {note}");
                    }
                    notes.push(format!("seed {seed}: {note}"));
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    if self.options.verbose {
                        println!("  ❌ seed {seed} failed: {}", message.clone().red());
                    }
                    failures.push(SeedFailure { seed, message });
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            passed: failures.is_empty(),
            seeds_run: seeds.len(),
            successful_seeds: seeds.len() - failures.len(),
            failures,
            notes,
            average_duration,
            performance_data,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u64>::deserialize(deserializer)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scenarios::get_scenario;

    fn tester() -> LogicTester {
        LogicTester::new(RunOptions {
            frames: 600,
            strategies: vec![GameplayStrategy::Cautious],
            verbose: false,
        })
    }

    #[test]
    fn results_count_every_seed() {
        let scenario = get_scenario("choice-gating").unwrap();
        let result = tester().run_scenario(&scenario, &[1, 2, 3]);
        assert!(result.passed, "{:?}", result.failures);
        assert_eq!(result.seeds_run, 3);
        assert_eq!(result.successful_seeds, 3);
        assert_eq!(result.performance_data.len(), 3);
        assert_eq!(result.notes.len(), 3);
    }

    #[test]
    fn result_json_round_trips_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "smoke".to_string(),
            passed: false,
            seeds_run: 1,
            successful_seeds: 0,
            failures: vec![SeedFailure {
                seed: 4,
                message: "boom".to_string(),
            }],
            notes: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["failures"][0]["seed"], 4);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.average_duration, Duration::from_millis(12));
    }
}
