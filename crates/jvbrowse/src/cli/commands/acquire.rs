use std::path::PathBuf;

use anyhow::{Error, Result};
use clap::Args;
use serde_json::json;

use super::{command_error, emit, load_config, preflight_error};
use crate::config::{PathOverrides, RuntimePaths};
use crate::coordinator::OperationCoordinator;
use crate::models::{CommandFailure, Envelope, RaceDate};
use crate::process::{AcquisitionMode, AcquisitionRequest, prepare_acquisition, run_process};
use crate::state::StateStore;
use crate::utils::time::now_local;

const COMMAND: &str = "acquire";
const STDERR_TAIL: usize = 20;

#[derive(Debug, Clone, Args)]
pub struct AcquireArgs {
    #[arg(value_enum, value_name = "MODE")]
    pub mode: AcquisitionMode,

    /// Meeting day written into the settings template before the run.
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Directory for rendered settings files (default: system temp dir).
    #[arg(long, value_name = "PATH")]
    pub scratch_dir: Option<PathBuf>,
}

pub fn run(args: &AcquireArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    let meeting_date = args
        .date
        .as_deref()
        .map(RaceDate::parse)
        .transpose()
        .map_err(|error| preflight_error(COMMAND, "date_invalid", format!("{error:#}")))?;
    let config = load_config(COMMAND, runtime, overrides)?;
    let request = AcquisitionRequest {
        mode: args.mode,
        meeting_date,
        scratch_dir: args
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("jvbrowse")),
    };

    let spec = prepare_acquisition(&config.tools, config.stores.database.as_deref(), &request)
        .map_err(|error| command_error(COMMAND, "acquisition_setup_failed", "failed to prepare acquisition", &error))?;

    let coordinator = OperationCoordinator::new();
    let handle = coordinator.begin();
    let outcome = run_process(&spec, &handle);
    coordinator.finish(&handle);
    let outcome = outcome
        .map_err(|error| command_error(COMMAND, "acquisition_failed", "acquisition tool could not run", &error))?;

    if !outcome.success() {
        let tail_start = outcome.stderr_lines.len().saturating_sub(STDERR_TAIL);
        let envelope = Envelope::error(COMMAND, "acquisition_failed", "acquisition tool reported failure")
            .with_meta("mode", json!(args.mode.as_str()))
            .with_error_details(json!({
                "exit_code": outcome.exit_code,
                "command": spec.display_command(),
                "stderr_tail": &outcome.stderr_lines[tail_start..],
            }));
        return Err(Error::new(CommandFailure::runtime(envelope)));
    }

    let mut envelope = Envelope::ok(
        COMMAND,
        json!({
            "mode": args.mode.as_str(),
            "command": spec.display_command(),
            "exit_code": outcome.exit_code,
            "stdout_lines": outcome.stdout_lines.len(),
            "stderr_lines": outcome.stderr_lines.len(),
        }),
    )
    .with_meta("state_file", json!(config.state_file.display().to_string()));

    match StateStore::new(&config.state_file).record_success(args.mode.source_label(), now_local()) {
        Ok(state) => envelope = envelope.with_meta("update_count", json!(state.update_count)),
        Err(error) => {
            log::warn!("update state not recorded: {error:#}");
            envelope = envelope.with_warning("state_not_recorded", format!("{error:#}"));
        }
    }
    emit(&envelope);
    Ok(())
}
