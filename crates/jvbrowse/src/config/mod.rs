//! `appsettings.json` loading and path resolution.
//!
//! Relative paths in the settings file resolve against the directory holding
//! that file; paths given on the command line resolve against the working
//! directory. Both accept a leading `~`.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";
pub const DEFAULT_MARKS_DB_FILE: &str = "excel_data.db";
pub const DEFAULT_PREDICTIONS_DB_FILE: &str = "predictions.db";
pub const DEFAULT_STATE_FILE: &str = "LastUpdateState.json";
pub const DEFAULT_PYTHON: &str = "python";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppSettings {
    pub paths: PathSettings,
    pub automation: AutomationSettings,
    /// Marks store; defaults to `excel_data.db` beside the primary database.
    pub excel_db_path: Option<String>,
    /// Predictions store; defaults to `predictions.db` beside the primary database.
    pub predictions_db_path: Option<String>,
    /// Update-state file; defaults to `LastUpdateState.json` beside the settings file.
    pub state_file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", default)]
pub struct PathSettings {
    pub db_path: Option<String>,
    /// Default acquisition executable.
    pub jv_tool_path: Option<String>,
    pub jv_tool_diff_exe: Option<String>,
    pub jv_tool_real_exe: Option<String>,
    pub jv_tool_normal_exe: Option<String>,
    pub jv_tool_setup_exe: Option<String>,
    pub diff_setting: Option<String>,
    pub normal_setting: Option<String>,
    pub realtime_setting: Option<String>,
    pub setup_setting: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", default)]
pub struct AutomationSettings {
    pub python_executable: String,
    pub repo_root: Option<String>,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            python_executable: DEFAULT_PYTHON.to_string(),
            repo_root: None,
        }
    }
}

/// JSON schema of the settings file.
pub fn settings_schema_json() -> Result<String> {
    let schema = schemars::schema_for!(AppSettings);
    serde_json::to_string_pretty(&schema).context("failed to render settings schema")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub settings_file: PathBuf,
}

pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    settings_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let settings_file = match settings_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => cwd.join(DEFAULT_SETTINGS_FILE),
    };

    Ok(RuntimePaths {
        home_dir,
        cwd,
        settings_file,
    })
}

/// Reads the settings file; a missing file yields defaults.
pub fn load_settings(path: &Path) -> Result<AppSettings> {
    if !path.is_file() {
        log::info!("settings file not found at {}; using defaults", path.display());
        return Ok(AppSettings::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file: {}", path.display()))?;
    let raw = raw.trim_start_matches('\u{feff}');
    serde_json::from_str(raw)
        .with_context(|| format!("failed to parse settings file: {}", path.display()))
}

/// Command-line replacements for individual settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub database: Option<PathBuf>,
    pub marks_store: Option<PathBuf>,
    pub predictions_store: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorePaths {
    pub database: Option<PathBuf>,
    pub marks_store: Option<PathBuf>,
    pub predictions_store: Option<PathBuf>,
}

impl StorePaths {
    pub fn require_database(&self) -> Result<&Path> {
        self.database
            .as_deref()
            .context("no database configured; set Paths.DbPath or pass --db")
    }
}

/// Per-mode acquisition paths, still unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub default_executable: Option<PathBuf>,
    pub normal_executable: Option<PathBuf>,
    pub realtime_executable: Option<PathBuf>,
    pub diff_executable: Option<PathBuf>,
    pub setup_executable: Option<PathBuf>,
    pub normal_settings: Option<PathBuf>,
    pub realtime_settings: Option<PathBuf>,
    pub diff_settings: Option<PathBuf>,
    pub setup_settings: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonPaths {
    /// Bare command names such as `python` are left for `PATH` lookup.
    pub executable: PathBuf,
    pub repo_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub settings_file: PathBuf,
    pub stores: StorePaths,
    pub tools: ToolPaths,
    pub python: PythonPaths,
    pub state_file: PathBuf,
}

pub fn resolve_config(
    runtime: &RuntimePaths,
    settings: &AppSettings,
    overrides: &PathOverrides,
) -> Result<ResolvedConfig> {
    let settings_dir = runtime
        .settings_file
        .parent()
        .map_or_else(|| runtime.cwd.clone(), Path::to_path_buf);
    let from_settings = |value: &Option<String>| -> Result<Option<PathBuf>> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| resolve_user_path(Path::new(value), &runtime.home_dir, &settings_dir))
            .transpose()
    };
    let from_cli = |value: &Option<PathBuf>| -> Result<Option<PathBuf>> {
        value
            .as_deref()
            .map(|path| resolve_user_path(path, &runtime.home_dir, &runtime.cwd))
            .transpose()
    };

    let database = match from_cli(&overrides.database)? {
        Some(path) => Some(path),
        None => from_settings(&settings.paths.db_path)?,
    };
    let beside_database = |file: &str| database.as_ref().map(|db| sibling(db, file));
    let marks_store = match from_cli(&overrides.marks_store)? {
        Some(path) => Some(path),
        None => from_settings(&settings.excel_db_path)?.or_else(|| beside_database(DEFAULT_MARKS_DB_FILE)),
    };
    let predictions_store = match from_cli(&overrides.predictions_store)? {
        Some(path) => Some(path),
        None => from_settings(&settings.predictions_db_path)?
            .or_else(|| beside_database(DEFAULT_PREDICTIONS_DB_FILE)),
    };

    let paths = &settings.paths;
    let tools = ToolPaths {
        default_executable: from_settings(&paths.jv_tool_path)?,
        normal_executable: from_settings(&paths.jv_tool_normal_exe)?,
        realtime_executable: from_settings(&paths.jv_tool_real_exe)?,
        diff_executable: from_settings(&paths.jv_tool_diff_exe)?,
        setup_executable: from_settings(&paths.jv_tool_setup_exe)?,
        normal_settings: from_settings(&paths.normal_setting)?,
        realtime_settings: from_settings(&paths.realtime_setting)?,
        diff_settings: from_settings(&paths.diff_setting)?,
        setup_settings: from_settings(&paths.setup_setting)?,
    };

    let python_executable = settings.automation.python_executable.trim();
    let python = PythonPaths {
        executable: if python_executable.is_empty() {
            PathBuf::from(DEFAULT_PYTHON)
        } else if is_bare_command(python_executable) {
            PathBuf::from(python_executable)
        } else {
            resolve_user_path(Path::new(python_executable), &runtime.home_dir, &settings_dir)?
        },
        repo_root: from_settings(&settings.automation.repo_root)?,
    };

    let state_file = from_settings(&settings.state_file_path)?
        .unwrap_or_else(|| settings_dir.join(DEFAULT_STATE_FILE));

    Ok(ResolvedConfig {
        settings_file: runtime.settings_file.clone(),
        stores: StorePaths {
            database,
            marks_store,
            predictions_store,
        },
        tools,
        python,
        state_file,
    })
}

fn is_bare_command(value: &str) -> bool {
    !value.contains('/') && !value.contains('\\') && !value.starts_with('~')
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    path.parent()
        .map_or_else(|| PathBuf::from(file_name), |parent| parent.join(file_name))
}

pub fn resolve_user_path(path: &Path, home_dir: &Path, base_dir: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
