use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    acquire::AcquireArgs, card::CardArgs, config::ConfigArgs, days::DaysArgs,
    evaluate::EvaluateArgs, horse::HorseArgs, meetings::MeetingsArgs, predict::PredictArgs,
    schema::SchemaArgs, state::StateArgs,
};
use crate::config::PathOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "jvbrowse",
    version,
    about = "Schema-adaptive JRA-VAN race browser and acquisition runner"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// Settings file (default: ./appsettings.json).
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Primary JRA-VAN store, overriding Paths.DbPath.
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub marks_db: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub predictions_db: Option<PathBuf>,
}

impl RuntimeArgs {
    #[must_use]
    pub fn path_overrides(&self) -> PathOverrides {
        PathOverrides {
            database: self.db.clone(),
            marks_store: self.marks_db.clone(),
            predictions_store: self.predictions_db.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recent days that have races.
    Days(DaysArgs),
    /// Meetings and races held on one day.
    Meetings(MeetingsArgs),
    /// Merged race card for one race.
    Card(CardArgs),
    /// Profile, pedigree, record and past starts of one horse.
    Horse(HorseArgs),
    /// Probed columns of a table.
    Schema(SchemaArgs),
    /// Run the external acquisition tool.
    Acquire(AcquireArgs),
    /// Run the prediction module for a day or a range of days.
    Predict(PredictArgs),
    /// Run the evaluation module and summarise its report.
    Evaluate(EvaluateArgs),
    /// Show the last-update state.
    State(StateArgs),
    /// Show resolved paths or the settings schema.
    Config(ConfigArgs),
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Days(_) => "days",
            Self::Meetings(_) => "meetings",
            Self::Card(_) => "card",
            Self::Horse(_) => "horse",
            Self::Schema(_) => "schema",
            Self::Acquire(_) => "acquire",
            Self::Predict(_) => "predict",
            Self::Evaluate(_) => "evaluate",
            Self::State(_) => "state",
            Self::Config(_) => "config",
        }
    }
}
