mod logic;
mod util;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{LogicTester, RunOptions, ScenarioResult, get_scenario, list_scenarios, scenario_names};
use util::{capture_failures, parse_strategies, resolve_seeds, split_csv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "caravan-tester", version)]
#[command(about = "Headless QA runs for the Caravan engine: scripted policies over many seeds")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers or ranges like `1..20`)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Frame budget for policy-driven runs
    #[arg(long, default_value_t = 6_000)]
    frames: u32,

    /// Policies for autopilot runs (cautious,greedy,random or `all`)
    #[arg(long, default_value = "all")]
    strategies: String,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for failure artifacts; nothing is written when unset
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seeds(&split_csv(&args.seeds))?;
    let strategies = parse_strategies(&args.strategies)?;
    info!(
        "running {} scenarios over {} seeds",
        scenarios.len(),
        seeds.len()
    );

    let tester = LogicTester::new(RunOptions {
        frames: args.frames,
        strategies,
        verbose: args.verbose,
    });
    let results = run_scenarios(&tester, &scenarios, &seeds);

    if let Some(base) = args.artifacts_dir.as_deref() {
        for result in results.iter().filter(|r| !r.passed) {
            match capture_failures(base, result) {
                Ok(paths) => {
                    for path in paths {
                        eprintln!("📁 Failure artifact: {}", path.display());
                    }
                }
                Err(err) => warn!("could not write artifacts: {err:#}"),
            }
        }
    }

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🐫 Caravan Automated Tester".bright_cyan().bold());
    println!("{}", "===========================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for name in scenario_names() {
            if !scenarios.iter().any(|s| s == name) {
                scenarios.push(name.to_string());
            }
        }
    }
    scenarios
}

fn run_scenarios(tester: &LogicTester, scenarios: &[String], seeds: &[u64]) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for name in scenarios {
        let Some(scenario) = get_scenario(name) else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            continue;
        };
        let result = tester.run_scenario(&scenario, seeds);
        let mark = if result.passed {
            "✅".green()
        } else {
            "❌".red()
        };
        println!(
            "{mark} {} - {}/{} seeds ({:?} avg)",
            name,
            result.successful_seeds,
            result.seeds_run,
            result.average_duration
        );
        results.push(result);
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let generated_at = Utc::now();

    match args.report {
        ReportFormat::Json => {
            logic::reports::generate_json_report(&mut output_target, results, generated_at)?;
        }
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Caravan Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(
                    &mut output_target,
                    results,
                    generated_at,
                )?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_every_scenario_once() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded.len(), scenario_names().len());
        assert_eq!(expanded[0], "smoke");
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["caravan-tester"]).unwrap();
        assert_eq!(args.scenarios, "smoke");
        assert_eq!(args.seeds, "1337");
        assert_eq!(args.frames, 6_000);
        assert_eq!(args.report, ReportFormat::Console);
        assert!(args.artifacts_dir.is_none());
    }

    #[test]
    fn report_format_rejects_unknown_values() {
        assert!(Args::try_parse_from(["caravan-tester", "--report", "csv"]).is_err());
        let args = Args::try_parse_from(["caravan-tester", "--report", "markdown"]).unwrap();
        assert_eq!(args.report, ReportFormat::Markdown);
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let tester = LogicTester::new(RunOptions {
            frames: 100,
            strategies: vec![logic::GameplayStrategy::Random],
            verbose: false,
        });
        let results = run_scenarios(&tester, &["missing".to_string()], &[1]);
        assert!(results.is_empty());
    }
}
