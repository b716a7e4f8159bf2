//! coherence-summary: CLI entry point.
//!
//! Prints a comparison table of simulator runs.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use coherence_stats::error::LoadError;
use coherence_stats::loader::{load_runs, LoadConfig};
use coherence_stats::report::render_table;

#[derive(Parser)]
#[command(name = "coherence-summary")]
#[command(about = "Summarize cache simulator statistics as a table")]
#[command(version)]
struct Cli {
    /// Directory of result files.
    #[arg(default_value = "./out")]
    results: PathBuf,

    /// Extension of result files.
    #[arg(long, default_value = "json")]
    ext: String,
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

    let mut records = Vec::with_capacity(runs.len());
    for run in &runs {
        match &run.record {
            Ok(record) => records.push(record),
            Err(e) => eprintln!("{} skipping {e}", "Warning:".yellow()),
        }
    }

    print!("{}", render_table(records));
    Ok(())
}
