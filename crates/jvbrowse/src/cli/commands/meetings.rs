use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error, to_data};
use crate::browse;
use crate::config::{PathOverrides, RuntimePaths};
use crate::models::{Envelope, RaceDate};

const COMMAND: &str = "meetings";

#[derive(Debug, Clone, Args)]
pub struct MeetingsArgs {
    /// `YYYYMMDD` or `YYYY-MM-DD`.
    #[arg(value_name = "DATE")]
    pub date: String,
}

pub fn run(args: &MeetingsArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let date = RaceDate::parse(&args.date)
        .map_err(|error| preflight_error(COMMAND, "date_invalid", format!("{error:#}")))?;
    let config = load_config(COMMAND, runtime, overrides)?;
    let meetings = browse::meetings(&config.stores, date)
        .map_err(|error| command_error(COMMAND, "store_unavailable", "failed to list meetings", &error))?;

    let race_count: usize = meetings.iter().map(|meeting| meeting.races.len()).sum();
    let mut envelope = Envelope::ok(COMMAND, to_data(COMMAND, &meetings)?)
        .with_meta("date", json!(date.iso()))
        .with_meta("meeting_count", json!(meetings.len()))
        .with_meta("race_count", json!(race_count));
    if meetings.is_empty() {
        envelope = envelope.with_warning("no_races", format!("no races found for {date}"));
    }
    emit(&envelope);
    Ok(())
}
