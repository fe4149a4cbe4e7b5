use anyhow::Result;
use clap::{Args, ValueEnum};
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error};
use crate::config::{PathOverrides, RuntimePaths};
use crate::discovery::{SchemaProbe, SqliteSchemaProbe, build_coalesce_expression};
use crate::models::Envelope;
use crate::sqlite::open_sqlite_connection;

const COMMAND: &str = "schema";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreChoice {
    Primary,
    Marks,
    Predictions,
}

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    #[arg(value_name = "TABLE")]
    pub table: String,

    #[arg(long, value_enum, default_value_t = StoreChoice::Primary)]
    pub store: StoreChoice,

    /// Candidate columns to fold into a projection, in preference order.
    #[arg(long = "candidate", value_name = "COLUMN")]
    pub candidates: Vec<String>,
}

pub fn run(args: &SchemaArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let config = load_config(COMMAND, runtime, overrides)?;
    let path = match args.store {
        StoreChoice::Primary => config.stores.database.clone(),
        StoreChoice::Marks => config.stores.marks_store.clone(),
        StoreChoice::Predictions => config.stores.predictions_store.clone(),
    }
    .ok_or_else(|| preflight_error(COMMAND, "store_not_configured", "store path is not configured"))?;

    let connection = open_sqlite_connection(&path)
        .map_err(|error| command_error(COMMAND, "store_unavailable", "failed to open store", &error))?;
    let probe = SqliteSchemaProbe::new(&connection);
    let exists = probe.table_exists(&args.table);
    let columns = probe.probe_columns(&args.table);

    let mut data = json!({
        "table": args.table,
        "exists": exists,
        "columns": columns.names(),
    });
    if !args.candidates.is_empty() {
        let candidates: Vec<&str> = args.candidates.iter().map(String::as_str).collect();
        data["expression"] = json!(build_coalesce_expression(&probe, &args.table, None, &candidates));
    }

    let mut envelope = Envelope::ok(COMMAND, data)
        .with_meta("store_path", json!(path.display().to_string()))
        .with_meta("column_count", json!(columns.names().len()));
    if !exists {
        envelope = envelope.with_warning("table_missing", format!("{} does not exist", args.table));
    }
    emit(&envelope);
    Ok(())
}
