use std::path::PathBuf;

use anyhow::{Error, Result};
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error, to_data};
use crate::config::{PathOverrides, RuntimePaths};
use crate::coordinator::OperationCoordinator;
use crate::models::{CommandFailure, Envelope, RaceDate};
use crate::process::python::{normalize_scenario, run_evaluation};
use crate::utils::time::unix_timestamp_millis;

const COMMAND: &str = "evaluate";

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    #[arg(long, value_name = "DATE")]
    pub from: String,

    #[arg(long, value_name = "DATE")]
    pub to: String,

    #[arg(long)]
    pub scenario: Option<String>,

    /// Report path handed to the module (default: a fresh file in the temp dir).
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub fn run(args: &EvaluateArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let parse = |raw: &str| {
        RaceDate::parse(raw).map_err(|error| preflight_error(COMMAND, "date_invalid", format!("{error:#}")))
    };
    let from = parse(&args.from)?;
    let to = parse(&args.to)?;
    if from > to {
        return Err(preflight_error(
            COMMAND,
            "range_reversed",
            format!("start {from} is after end {to}"),
        ));
    }
    let scenario = normalize_scenario(args.scenario.as_deref());
    let report_path = args.output.clone().unwrap_or_else(|| {
        std::env::temp_dir().join(format!(
            "prediction_eval_{}_{}_{}.json",
            from.compact(),
            to.compact(),
            unix_timestamp_millis()
        ))
    });
    let config = load_config(COMMAND, runtime, overrides)?;

    let coordinator = OperationCoordinator::new();
    let handle = coordinator.begin();
    let evaluation = run_evaluation(&config.python, from, to, &scenario, &report_path, &handle);
    coordinator.finish(&handle);
    let evaluation = evaluation
        .map_err(|error| command_error(COMMAND, "evaluation_failed", "evaluation module could not run", &error))?;

    if !evaluation.outcome.success() {
        let envelope = Envelope::error(COMMAND, "evaluation_failed", "evaluation module reported failure")
            .with_meta("scenario", json!(scenario))
            .with_error_details(json!({ "exit_code": evaluation.exit_code }));
        return Err(Error::new(CommandFailure::runtime(envelope)));
    }

    let mut envelope = Envelope::ok(COMMAND, to_data(COMMAND, &evaluation)?)
        .with_meta("scenario", json!(scenario))
        .with_meta("from", json!(from.iso()))
        .with_meta("to", json!(to.iso()));
    if evaluation.summary.is_none() {
        envelope = envelope.with_warning(
            "report_missing",
            format!("no readable report at {}", report_path.display()),
        );
    }
    emit(&envelope);
    Ok(())
}
