//! coherence-check: CLI entry point.
//!
//! Validates simulator result files against the coherence invariants.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use coherence_stats::checker::{check_batch, BatchReport, ValidationMode};
use coherence_stats::error::LoadError;
use coherence_stats::loader::{load_runs, LoadConfig};

#[derive(Parser)]
#[command(name = "coherence-check")]
#[command(about = "Check cache simulator statistics against coherence invariants")]
#[command(version)]
struct Cli {
    /// Directory of result files.
    #[arg(default_value = "./tests/out")]
    results: PathBuf,

    /// Invariant set to apply.
    #[arg(short, long, value_enum, default_value_t = ValidationMode::SingleCore)]
    mode: ValidationMode,

    /// Extension of result files.
    #[arg(long, default_value = "json")]
    ext: String,

    /// Print a JSON report instead of diagnostic lines.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = LoadConfig {
        dir: cli.results,
        extension: cli.ext,
    };

    let runs = match load_runs(&config) {
        Ok(runs) => runs,
        Err(e @ LoadError::NoInput { .. }) => {
            println!("{e}");
            std::process::exit(1);
        }
        other => other.with_context(|| format!("loading {}", config.dir.display()))?,
    };

    log::info!("checking {} runs in {} mode", runs.len(), cli.mode);
    let report = check_batch(&runs, cli.mode);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_pass() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &BatchReport) {
    for finding in &report.findings {
        println!("{finding}");
    }

    let summary = report.summary_line();
    if report.is_pass() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}
