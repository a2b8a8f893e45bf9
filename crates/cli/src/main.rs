//! Homewrecker CLI
//!
//! Runs an arbitration pass against an in-memory array built from a JSON
//! scenario and prints the outcome as JSON.
//!
//! # Usage
//!
//! ```text
//! homewrecker run --scenario swap.json
//! homewrecker run --scenario swap.json --mini --config homewrecker.toml
//! ```
//!
//! Exit status is 0 when the array boots and 2 when arbitration refuses.

mod error;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use homewrecker_core::{DriveLocation, FruDescriptor, HomewreckerEvent, ServiceModeReason};
use homewrecker_engine::{Collaborators, Homewrecker, HomewreckerConfig, MiniVerdict, Verdict};
use serde::Serialize;

use crate::error::CliError;
use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "homewrecker", about = "System drive arbitration scenario runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the scenario's array and arbitrate it.
    Run {
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,
        /// Use the early boot path.
        #[arg(long)]
        mini: bool,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Full(Verdict),
    Mini(MiniVerdict),
}

impl Outcome {
    fn is_boot(&self) -> bool {
        match self {
            Outcome::Full(v) => v.is_boot(),
            Outcome::Mini(v) => v.is_boot(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    verdict: Outcome,
    events: Vec<HomewreckerEvent>,
    service_mode_requests: Vec<ServiceModeReason>,
    disconnected: Vec<DriveLocation>,
    published_descriptor: Option<FruDescriptor>,
}

fn run(scenario: PathBuf, mini: bool, config: Option<PathBuf>) -> Result<Report, CliError> {
    let config = match config {
        Some(path) => HomewreckerConfig::from_file(path)?,
        None => HomewreckerConfig::default(),
    };
    let scenario = Scenario::from_file(&scenario)?;
    let array = scenario.build(&config)?;

    let homewrecker = Homewrecker::new(Collaborators::from_backend(array.clone()), config);
    let verdict = if mini {
        Outcome::Mini(homewrecker.run_mini_arbitration()?)
    } else {
        Outcome::Full(homewrecker.run_full_arbitration()?)
    };

    Ok(Report {
        verdict,
        events: array.events(),
        service_mode_requests: array.service_mode_requests(),
        disconnected: array.disconnected(),
        published_descriptor: homewrecker.published_descriptor(),
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run {
            scenario,
            mini,
            config,
        } => run(scenario, mini, config),
    };

    match result {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if report.verdict.is_boot() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
