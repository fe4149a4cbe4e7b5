use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, to_data};
use crate::config::{PathOverrides, RuntimePaths};
use crate::models::Envelope;
use crate::state::StateStore;

const COMMAND: &str = "state";

#[derive(Debug, Clone, Args)]
pub struct StateArgs {}

pub fn run(_args: &StateArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let config = load_config(COMMAND, runtime, overrides)?;
    let store = StateStore::new(&config.state_file);
    let state = store
        .load()
        .map_err(|error| command_error(COMMAND, "state_unreadable", "failed to read update state", &error))?;

    let envelope = Envelope::ok(COMMAND, to_data(COMMAND, &state)?)
        .with_meta("state_file", json!(store.path().display().to_string()))
        .with_meta("exists", json!(store.path().is_file()));
    emit(&envelope);
    Ok(())
}
