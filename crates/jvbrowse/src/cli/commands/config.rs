use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use super::{command_error, emit, load_config};
use crate::config::{PathOverrides, RuntimePaths, settings_schema_json};
use crate::models::Envelope;

const COMMAND: &str = "config";

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Print the JSON schema of the settings file instead.
    #[arg(long, default_value_t = false)]
    pub schema: bool,
}

pub fn run(args: &ConfigArgs, runtime: &RuntimePaths, overrides: &PathOverrides) -> Result<()> {
    if args.schema {
        let schema = settings_schema_json()
            .and_then(|raw| Ok(serde_json::from_str::<Value>(&raw)?))
            .map_err(|error| command_error(COMMAND, "schema_render_failed", "failed to render schema", &error))?;
        emit(&Envelope::ok(COMMAND, json!({ "schema": schema })));
        return Ok(());
    }

    let config = load_config(COMMAND, runtime, overrides)?;
    let display = |path: Option<&std::path::Path>| path.map(|path| path.display().to_string());
    let tools = &config.tools;
    let data = json!({
        "settings_file": config.settings_file.display().to_string(),
        "settings_file_exists": config.settings_file.is_file(),
        "stores": {
            "database": display(config.stores.database.as_deref()),
            "marks": display(config.stores.marks_store.as_deref()),
            "predictions": display(config.stores.predictions_store.as_deref()),
        },
        "tools": {
            "default_executable": display(tools.default_executable.as_deref()),
            "normal_executable": display(tools.normal_executable.as_deref()),
            "realtime_executable": display(tools.realtime_executable.as_deref()),
            "diff_executable": display(tools.diff_executable.as_deref()),
            "setup_executable": display(tools.setup_executable.as_deref()),
            "normal_settings": display(tools.normal_settings.as_deref()),
            "realtime_settings": display(tools.realtime_settings.as_deref()),
            "diff_settings": display(tools.diff_settings.as_deref()),
            "setup_settings": display(tools.setup_settings.as_deref()),
        },
        "python": {
            "executable": config.python.executable.display().to_string(),
            "repo_root": display(config.python.repo_root.as_deref()),
        },
        "state_file": config.state_file.display().to_string(),
    });
    emit(&Envelope::ok(COMMAND, data));
    Ok(())
}
