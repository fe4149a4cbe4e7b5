pub mod acquire;
pub mod card;
pub mod config;
pub mod days;
pub mod evaluate;
pub mod horse;
pub mod meetings;
pub mod predict;
pub mod schema;
pub mod state;

use anyhow::{Error, Result};
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{PathOverrides, ResolvedConfig, RuntimePaths, load_settings, resolve_config};
use crate::models::{CommandFailure, Envelope, FailureKind};
use crate::process::{PreflightError, ProcessCancelled};

/// Settings file plus command-line overrides, resolved to absolute paths.
pub fn load_config(
    command: &str,
    runtime: &RuntimePaths,
    overrides: &PathOverrides,
) -> Result<ResolvedConfig> {
    load_settings(&runtime.settings_file)
        .and_then(|settings| resolve_config(runtime, &settings, overrides))
        .map_err(|error| {
            command_error(
                command,
                "config_invalid",
                "failed to load settings",
                &error,
            )
        })
}

pub(crate) fn emit(envelope: &Envelope) {
    println!("{}", envelope.to_line());
}

pub(crate) fn to_data<T: Serialize>(command: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|error| {
        Error::new(CommandFailure::runtime(
            Envelope::error(command, "response_encode_failed", "failed to encode response")
                .with_error_details(json!({ "cause": error.to_string() })),
        ))
    })
}

/// Wraps `error` in an error envelope, classifying preflight and cancellation
/// failures by their typed cause.
pub(crate) fn command_error(command: &str, code: &str, message: &str, error: &Error) -> Error {
    let failure = if let Some(preflight) = error.downcast_ref::<PreflightError>() {
        CommandFailure::new(
            Envelope::error(command, "preflight_failed", preflight.to_string()).with_error_details(
                json!({
                    "item": preflight.item,
                    "path": preflight.path.as_ref().map(|path| path.display().to_string()),
                }),
            ),
            FailureKind::Preflight,
        )
    } else if let Some(cancelled) = error.downcast_ref::<ProcessCancelled>() {
        CommandFailure::new(
            Envelope::error(command, "cancelled", cancelled.to_string()),
            FailureKind::Cancelled,
        )
    } else if let Some(existing) = error.downcast_ref::<CommandFailure>() {
        existing.clone()
    } else {
        CommandFailure::runtime(
            Envelope::error(command, code, message).with_error_details(json!({ "cause": format!("{error:#}") })),
        )
    };
    Error::new(failure)
}

pub(crate) fn preflight_error(command: &str, code: &str, message: impl Into<String>) -> Error {
    Error::new(CommandFailure::preflight(Envelope::error(command, code, message)))
}
