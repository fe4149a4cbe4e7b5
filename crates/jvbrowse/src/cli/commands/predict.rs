use anyhow::{Error, Result};
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error, to_data};
use crate::config::{PathOverrides, RuntimePaths};
use crate::coordinator::OperationCoordinator;
use crate::models::{CommandFailure, Envelope, RaceDate};
use crate::process::python::{normalize_scenario, run_prediction_range};

const COMMAND: &str = "predict";

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    #[arg(long, value_name = "DATE")]
    pub date: String,

    /// Last day of a range starting at `--date`.
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Defaults to PRE.
    #[arg(long)]
    pub scenario: Option<String>,
}

pub fn run(args: &PredictArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let parse = |raw: &str| {
        RaceDate::parse(raw).map_err(|error| preflight_error(COMMAND, "date_invalid", format!("{error:#}")))
    };
    let from = parse(&args.date)?;
    let to = args.to.as_deref().map(parse).transpose()?;
    let scenario = normalize_scenario(args.scenario.as_deref());
    let config = load_config(COMMAND, runtime, overrides)?;

    let coordinator = OperationCoordinator::new();
    let handle = coordinator.begin();
    let tally = run_prediction_range(&config.python, from, to.unwrap_or(from), &scenario, &handle);
    coordinator.finish(&handle);
    let tally = tally
        .map_err(|error| command_error(COMMAND, "prediction_failed", "prediction module could not run", &error))?;

    if to.is_none() && tally.failed > 0 {
        let envelope = Envelope::error(COMMAND, "prediction_failed", "prediction module reported failure")
            .with_meta("scenario", json!(scenario))
            .with_error_details(json!({
                "date": from.iso(),
                "exit_code": tally.days.first().and_then(|day| day.exit_code),
            }));
        return Err(Error::new(CommandFailure::runtime(envelope)));
    }

    let mut envelope = Envelope::ok(COMMAND, to_data(COMMAND, &tally)?)
        .with_meta("scenario", json!(scenario))
        .with_meta("from", json!(from.iso()))
        .with_meta("to", json!(to.unwrap_or(from).iso()));
    if let Some(to) = to
        && from > to
    {
        envelope = envelope.with_warning("range_reversed", format!("start {from} is after end {to}"));
    }
    if tally.failed > 0 {
        envelope = envelope.with_warning(
            "prediction_days_failed",
            format!("{} / {} days succeeded", tally.succeeded, tally.days.len()),
        );
    }
    emit(&envelope);
    Ok(())
}
