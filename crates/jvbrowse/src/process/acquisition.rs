use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use anyhow::{Error, Result};
use clap::ValueEnum;
use serde::Serialize;

use super::runner::ProcessSpec;
use super::template::write_rendered_settings;
use crate::config::ToolPaths;
use crate::models::RaceDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    Normal,
    Realtime,
    Diff,
    Setup,
}

impl AcquisitionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Realtime => "realtime",
            Self::Diff => "diff",
            Self::Setup => "setup",
        }
    }

    /// Value recorded as `LastUpdateSource` after a successful run.
    #[must_use]
    pub const fn source_label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Realtime => "REALTIME",
            Self::Diff => "DIFF",
            Self::Setup => "SETUP",
        }
    }

    fn executable(self, tools: &ToolPaths) -> Option<&Path> {
        let specific = match self {
            Self::Normal => tools.normal_executable.as_deref(),
            Self::Realtime => tools.realtime_executable.as_deref(),
            Self::Diff => tools.diff_executable.as_deref(),
            Self::Setup => tools.setup_executable.as_deref(),
        };
        specific.or(tools.default_executable.as_deref())
    }

    fn settings(self, tools: &ToolPaths) -> Option<&Path> {
        match self {
            Self::Normal => tools.normal_settings.as_deref(),
            Self::Realtime => tools.realtime_settings.as_deref(),
            Self::Diff => tools.diff_settings.as_deref(),
            Self::Setup => tools.setup_settings.as_deref(),
        }
    }
}

impl Display for AcquisitionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected before any process was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightError {
    pub item: &'static str,
    pub path: Option<PathBuf>,
}

impl PreflightError {
    fn not_configured(item: &'static str) -> Self {
        Self { item, path: None }
    }

    fn not_found(item: &'static str, path: &Path) -> Self {
        Self {
            item,
            path: Some(path.to_path_buf()),
        }
    }
}

impl Display for PreflightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} not found: {}", self.item, path.display()),
            None => write!(f, "{} is not configured", self.item),
        }
    }
}

impl std::error::Error for PreflightError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub mode: AcquisitionMode,
    /// Meeting day written into the settings template before the run.
    pub meeting_date: Option<RaceDate>,
    /// Where rendered templates go.
    pub scratch_dir: PathBuf,
}

/// Validates every path and builds `<tool> -s <settings> -d <db>` run from the
/// tool's own directory.
pub fn prepare_acquisition(
    tools: &ToolPaths,
    database: Option<&Path>,
    request: &AcquisitionRequest,
) -> Result<ProcessSpec> {
    let mode = request.mode;
    let executable = mode
        .executable(tools)
        .ok_or_else(|| preflight(PreflightError::not_configured("acquisition executable")))?;
    if !executable.is_file() {
        return Err(preflight(PreflightError::not_found("acquisition executable", executable)));
    }

    let settings = mode
        .settings(tools)
        .ok_or_else(|| preflight(PreflightError::not_configured("acquisition settings file")))?;
    if !settings.is_file() {
        return Err(preflight(PreflightError::not_found("acquisition settings file", settings)));
    }

    let database =
        database.ok_or_else(|| preflight(PreflightError::not_configured("database path")))?;
    let database_dir = database.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = database_dir
        && !dir.is_dir()
    {
        return Err(preflight(PreflightError::not_found("database directory", dir)));
    }

    let settings = match request.meeting_date {
        Some(date) => write_rendered_settings(settings, date, mode.as_str(), &request.scratch_dir)?,
        None => settings.to_path_buf(),
    };

    let mut spec = ProcessSpec::new(format!("acquire:{mode}"), executable).args([
        "-s".to_string(),
        settings.to_string_lossy().into_owned(),
        "-d".to_string(),
        database.to_string_lossy().into_owned(),
    ]);
    if let Some(dir) = executable.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        spec = spec.working_dir(dir);
    }
    Ok(spec)
}

fn preflight(error: PreflightError) -> Error {
    Error::new(error)
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
        std::fs::create_dir_all(&path).expect("temp dir should be creatable");
        path
    }

    fn request(mode: AcquisitionMode, scratch_dir: &Path) -> AcquisitionRequest {
        AcquisitionRequest {
            mode,
            meeting_date: None,
            scratch_dir: scratch_dir.to_path_buf(),
        }
    }

    #[test]
    fn missing_settings_file_fails_preflight() {
        let dir = unique_temp_dir("jvbrowse-acquire-preflight");
        let tool = dir.join("JVGet.exe");
        std::fs::write(&tool, b"").expect("tool stub should be written");
        let tools = ToolPaths {
            default_executable: Some(tool),
            diff_settings: Some(dir.join("missing.xml")),
            ..ToolPaths::default()
        };

        let error = prepare_acquisition(
            &tools,
            Some(&dir.join("ecore.db")),
            &request(AcquisitionMode::Diff, &dir),
        )
        .expect_err("missing settings must fail");
        let preflight = error
            .downcast_ref::<PreflightError>()
            .expect("error should be a preflight failure");
        assert_eq!(preflight.item, "acquisition settings file");
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn mode_specific_executable_and_tool_directory_are_used() {
        let dir = unique_temp_dir("jvbrowse-acquire-spec");
        let default_tool = dir.join("JVGet.exe");
        let setup_tool = dir.join("JVSetup.exe");
        let settings = dir.join("setup.xml");
        for file in [&default_tool, &setup_tool, &settings] {
            std::fs::write(file, b"<Settings/>").expect("fixture should be written");
        }
        let tools = ToolPaths {
            default_executable: Some(default_tool),
            setup_executable: Some(setup_tool.clone()),
            setup_settings: Some(settings.clone()),
            ..ToolPaths::default()
        };
        let database = dir.join("ecore.db");

        let spec = prepare_acquisition(&tools, Some(&database), &request(AcquisitionMode::Setup, &dir))
            .expect("preflight should pass");
        assert_eq!(spec.program, setup_tool);
        assert_eq!(spec.working_dir.as_deref(), Some(dir.as_path()));
        assert_eq!(
            spec.args,
            [
                "-s".to_string(),
                settings.to_string_lossy().into_owned(),
                "-d".to_string(),
                database.to_string_lossy().into_owned(),
            ]
        );
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn meeting_date_renders_a_fresh_settings_file() {
        let dir = unique_temp_dir("jvbrowse-acquire-template");
        let tool = dir.join("JVGet.exe");
        let settings = dir.join("normal.xml");
        std::fs::write(&tool, b"").expect("tool stub should be written");
        std::fs::write(&settings, "<KaisaiDateTime>old</KaisaiDateTime>")
            .expect("template should be written");
        let tools = ToolPaths {
            default_executable: Some(tool),
            normal_settings: Some(settings.clone()),
            ..ToolPaths::default()
        };
        let mut request = request(AcquisitionMode::Normal, &dir.join("scratch"));
        request.meeting_date = Some(RaceDate::parse("2025-09-06").expect("date should parse"));

        let spec = prepare_acquisition(&tools, Some(&dir.join("ecore.db")), &request)
            .expect("preflight should pass");
        let rendered = PathBuf::from(&spec.args[1]);
        assert_ne!(rendered, settings);
        assert_eq!(
            std::fs::read_to_string(rendered).expect("rendered file should exist"),
            "<KaisaiDateTime>2025-09-06T00:00:00+09:00</KaisaiDateTime>"
        );
        std::fs::remove_dir_all(dir).ok();
    }
}
