use std::path::{Path, PathBuf};

use anyhow::{Context, Error, Result};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use super::acquisition::PreflightError;
use super::runner::{ProcessOutcome, ProcessSpec, run_process};
use crate::config::PythonPaths;
use crate::coordinator::OperationHandle;
use crate::models::RaceDate;

pub const PREDICTION_MODULE: &str = "ml.predict_today";
pub const EVALUATION_MODULE: &str = "ml.evaluation.evaluate_predictions";
pub const DEFAULT_SCENARIO: &str = "PRE";

/// Report keys shown in the evaluation summary, in display order.
pub const EVALUATION_METRICS: &[(&str, &str)] = &[
    ("total_predictions", "予測総数"),
    ("invest_selections", "投資候補数"),
    ("joined_results", "結果突合数"),
    ("win_hits", "単勝的中数"),
    ("win_hit_rate", "単勝的中率"),
    ("win_roi", "単勝ROI"),
    ("place_hits", "複勝的中数"),
    ("place_hit_rate", "複勝的中率"),
];

/// Trimmed and upper-cased; blank means `PRE`.
#[must_use]
pub fn normalize_scenario(raw: Option<&str>) -> String {
    let scenario = raw.map(str::trim).unwrap_or_default().to_uppercase();
    if scenario.is_empty() {
        DEFAULT_SCENARIO.to_string()
    } else {
        scenario
    }
}

#[must_use]
pub fn prediction_arguments(date: RaceDate, scenario: &str) -> Vec<String> {
    vec![
        "--date".to_string(),
        date.iso(),
        "--scenario".to_string(),
        scenario.to_string(),
    ]
}

#[must_use]
pub fn evaluation_arguments(from: RaceDate, to: RaceDate, scenario: &str, output_json: &Path) -> Vec<String> {
    vec![
        "--date-from".to_string(),
        from.iso(),
        "--date-to".to_string(),
        to.iso(),
        "--scenario".to_string(),
        scenario.to_string(),
        "--output-json".to_string(),
        output_json.to_string_lossy().into_owned(),
    ]
}

/// `<python> -m <module> <args>` in the repository root with UTF-8 unbuffered output.
pub fn module_spec(python: &PythonPaths, module: &str, arguments: Vec<String>) -> Result<ProcessSpec> {
    let repo_root = python.repo_root.as_deref().ok_or_else(|| {
        Error::new(PreflightError {
            item: "python repository root",
            path: None,
        })
    })?;
    if !repo_root.is_dir() {
        return Err(Error::new(PreflightError {
            item: "python repository root",
            path: Some(repo_root.to_path_buf()),
        }));
    }

    Ok(ProcessSpec::new(module.to_string(), &python.executable)
        .arg("-m")
        .arg(module)
        .args(arguments)
        .working_dir(repo_root)
        .env("PYTHONIOENCODING", "utf-8")
        .env("PYTHONUNBUFFERED", "1"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayResult {
    pub date: RaceDate,
    pub exit_code: Option<i32>,
}

/// Per-day outcomes of a prediction range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangeTally {
    pub days: Vec<DayResult>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs the prediction module once per day from `from` through `to`.
///
/// A reversed range is not an error; it runs nothing and says so. A failing
/// day is counted and the loop moves on.
pub fn run_prediction_range(
    python: &PythonPaths,
    from: RaceDate,
    to: RaceDate,
    scenario: &str,
    handle: &OperationHandle,
) -> Result<RangeTally> {
    let mut tally = RangeTally::default();
    if from > to {
        warn!("prediction range start {from} is after end {to}; nothing to run");
        return Ok(tally);
    }

    let mut current = Some(from);
    while let Some(date) = current.filter(|date| *date <= to) {
        let spec = module_spec(python, PREDICTION_MODULE, prediction_arguments(date, scenario))?;
        let outcome = run_process(&spec, handle)?;
        if outcome.success() {
            tally.succeeded += 1;
        } else {
            tally.failed += 1;
        }
        tally.days.push(DayResult {
            date,
            exit_code: outcome.exit_code,
        });
        current = date.next_day();
    }
    info!(
        "prediction range finished: {} / {} days succeeded",
        tally.succeeded,
        tally.days.len()
    );
    Ok(tally)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricLine {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRun {
    pub exit_code: Option<i32>,
    pub report_path: PathBuf,
    pub summary: Option<Vec<MetricLine>>,
    #[serde(skip)]
    pub outcome: ProcessOutcome,
}

/// Runs the evaluation module and, when it succeeds, summarises its JSON report.
pub fn run_evaluation(
    python: &PythonPaths,
    from: RaceDate,
    to: RaceDate,
    scenario: &str,
    report_path: &Path,
    handle: &OperationHandle,
) -> Result<EvaluationRun> {
    let arguments = evaluation_arguments(from, to, scenario, report_path);
    let spec = module_spec(python, EVALUATION_MODULE, arguments)?;
    let outcome = run_process(&spec, handle)?;

    let summary = if outcome.success() {
        match read_evaluation_report(report_path) {
            Ok(report) => Some(summarize_evaluation(&report)),
            Err(error) => {
                warn!("evaluation report unusable: {error:#}");
                None
            }
        }
    } else {
        None
    };
    Ok(EvaluationRun {
        exit_code: outcome.exit_code,
        report_path: report_path.to_path_buf(),
        summary,
        outcome,
    })
}

pub fn read_evaluation_report(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("evaluation report not found: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse evaluation report: {}", path.display()))
}

/// Fixed-order metric lines; absent keys show `-`.
#[must_use]
pub fn summarize_evaluation(report: &Value) -> Vec<MetricLine> {
    EVALUATION_METRICS
        .iter()
        .map(|(key, label)| MetricLine {
            key: (*key).to_string(),
            label: (*label).to_string(),
            value: format_metric(key, report.get(*key).unwrap_or(&Value::Null)),
        })
        .collect()
}

/// Ratios ending in `_rate`/`_roi` as percentages with one decimal, whole
/// numbers plain, other numbers with up to three decimals.
#[must_use]
pub fn format_metric(key: &str, value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) if text.trim().is_empty() => "-".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            let Some(float) = number.as_f64() else {
                return number.to_string();
            };
            if key.ends_with("_rate") || key.ends_with("_roi") {
                format!("{:.1}%", float * 100.0)
            } else if float.fract() == 0.0 {
                format!("{float:.0}")
            } else {
                trim_decimals(&format!("{float:.3}"))
            }
        }
        other => other.to_string(),
    }
}

fn trim_decimals(text: &str) -> String {
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
