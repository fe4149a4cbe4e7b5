use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error, to_data};
use crate::browse;
use crate::config::{PathOverrides, RuntimePaths};
use crate::models::{Envelope, RaceDate, RaceKey};

const COMMAND: &str = "card";

#[derive(Debug, Clone, Args)]
pub struct CardArgs {
    #[arg(value_name = "DATE")]
    pub date: String,

    /// Venue code, `5` or `05`.
    #[arg(value_name = "VENUE")]
    pub venue: String,

    #[arg(value_name = "RACE")]
    pub race: String,
}

impl CardArgs {
    pub fn race_key(&self) -> Result<RaceKey> {
        let date = RaceDate::parse(&self.date)?;
        RaceKey::new(date, &self.venue, &self.race)
    }
}

pub fn run(args: &CardArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let race = args
        .race_key()
        .map_err(|error| preflight_error(COMMAND, "race_key_invalid", format!("{error:#}")))?;
    let config = load_config(COMMAND, runtime, overrides)?;
    let card = browse::browse_race(&config.stores, &race)
        .map_err(|error| command_error(COMMAND, "store_unavailable", "failed to build race card", &error))?;

    let envelope = Envelope::ok(COMMAND, to_data(COMMAND, &card)?)
        .with_meta("race", json!(race.to_string()))
        .with_meta("entry_count", json!(card.entries.len()))
        .with_meta("failed_rows", json!(card.failures.len()))
        .with_warnings(card.warnings.iter().cloned());
    emit(&envelope);
    Ok(())
}
