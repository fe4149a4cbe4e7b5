use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error, to_data};
use crate::browse;
use crate::config::{PathOverrides, RuntimePaths};
use crate::models::{Envelope, RaceDate};
use crate::utils::time::today_local;

const COMMAND: &str = "horse";

#[derive(Debug, Clone, Args)]
pub struct HorseArgs {
    /// Pedigree registration number (KettoNum).
    #[arg(value_name = "HORSE_ID")]
    pub horse_id: String,

    /// Name used for marks lookup when the registry has none.
    #[arg(long)]
    pub name: Option<String>,

    /// Reference day for the age column.
    #[arg(long, value_name = "DATE")]
    pub today: Option<String>,
}

pub fn run(args: &HorseArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    if args.horse_id.trim().is_empty() {
        return Err(preflight_error(COMMAND, "horse_id_missing", "horse id must not be blank"));
    }
    let today = match args.today.as_deref() {
        Some(raw) => RaceDate::parse(raw)
            .map_err(|error| preflight_error(COMMAND, "date_invalid", format!("{error:#}")))?
            .date(),
        None => today_local(),
    };
    let config = load_config(COMMAND, runtime, overrides)?;
    let detail = browse::horse_detail(&config.stores, &args.horse_id, args.name.as_deref(), today)
        .map_err(|error| command_error(COMMAND, "store_unavailable", "failed to load horse", &error))?;

    let envelope = Envelope::ok(COMMAND, to_data(COMMAND, &detail)?)
        .with_meta("horse_id", json!(detail.horse_id))
        .with_meta("history_count", json!(detail.history.len()))
        .with_warnings(detail.warnings.iter().cloned());
    emit(&envelope);
    Ok(())
}
