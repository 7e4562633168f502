use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logic::{GameplayStrategy, ScenarioResult};

const DEFAULT_SEED: u64 = 1337;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Resolve seed tokens: plain integers or inclusive `a..b` / `a..=b` ranges.
/// Duplicates are dropped, order is kept, and an empty list means the
/// default seed.
pub fn resolve_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for token in tokens {
        let expanded: Vec<u64> = if let Some((start, end)) = token.split_once("..") {
            let end = end.strip_prefix('=').unwrap_or(end);
            let start: u64 = start
                .parse()
                .with_context(|| format!("bad range start in `{token}`"))?;
            let end: u64 = end
                .parse()
                .with_context(|| format!("bad range end in `{token}`"))?;
            if end < start {
                bail!("empty seed range `{token}`");
            }
            (start..=end).collect()
        } else {
            vec![
                token
                    .parse()
                    .with_context(|| format!("unrecognized seed token: {token}"))?,
            ]
        };
        for seed in expanded {
            if seen.insert(seed) {
                seeds.push(seed);
            }
        }
    }
    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

pub fn parse_strategies(arg: &str) -> Result<Vec<GameplayStrategy>> {
    let tokens = split_csv(arg);
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
        return Ok(GameplayStrategy::ALL.to_vec());
    }
    let mut strategies = Vec::new();
    for token in tokens {
        let strategy: GameplayStrategy = token.parse()?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    if strategies.is_empty() {
        bail!("no strategies selected");
    }
    Ok(strategies)
}

pub fn artifacts_dir(base: &Path, scenario: &str, seed: u64) -> PathBuf {
    let ts = Utc::now().format("%Y%m%dT%H%M%S");
    base.join(scenario)
        .join(format!("seed-{seed}"))
        .join(ts.to_string())
}

/// Write one `failure.json` per failing seed so the run can be replayed.
pub fn capture_failures(base: &Path, result: &ScenarioResult) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for failure in &result.failures {
        let dir = artifacts_dir(base, &result.scenario_name, failure.seed);
        fs::create_dir_all(&dir).context("creating artifacts dir")?;
        let payload = serde_json::json!({
            "scenario": result.scenario_name,
            "seed": failure.seed,
            "error": failure.message,
        });
        let path = dir.join("failure.json");
        fs::write(&path, serde_json::to_vec_pretty(&payload)?)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
