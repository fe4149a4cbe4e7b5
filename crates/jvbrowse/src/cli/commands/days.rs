use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, to_data};
use crate::browse;
use crate::config::{PathOverrides, RuntimePaths};
use crate::models::Envelope;
use crate::repository::races::DEFAULT_DAY_LIMIT;

const COMMAND: &str = "days";

#[derive(Debug, Clone, Args)]
pub struct DaysArgs {
    #[arg(long, default_value_t = DEFAULT_DAY_LIMIT)]
    pub limit: usize,
}

pub fn run(args: &DaysArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let config = load_config(COMMAND, runtime, overrides)?;
    let days = browse::race_days(&config.stores, args.limit)
        .map_err(|error| command_error(COMMAND, "store_unavailable", "failed to list race days", &error))?;

    let envelope = Envelope::ok(COMMAND, to_data(COMMAND, &days)?)
        .with_meta("day_count", json!(days.len()))
        .with_meta("limit", json!(args.limit));
    emit(&envelope);
    Ok(())
}
