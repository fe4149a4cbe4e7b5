//! Query objects over the JRA-VAN stores. Each method is one parameterized
//! query built from discovered columns and returns typed rows.

pub mod horses;
pub mod marks;
pub mod predictions;
pub mod races;

use anyhow::{Context, Result};
use rusqlite::{Connection, Params};

use crate::sqlite::text_at;

pub use horses::HorseRepository;
pub use marks::{MARK_FIELDS, MarkField, MarksRepository};
pub use predictions::{PREDICTIONS_SCHEMA, PredictionLoad, load_predictions_for_race};
pub use races::{RaceRepository, WinOdds};

pub const RACE_TABLE: &str = "N_RACE";
pub const ENTRY_TABLE: &str = "N_UMA_RACE";
pub const HORSE_TABLE: &str = "N_UMA";

pub const SADDLE_COLUMNS: &[&str] = &["Umaban", "UMABAN", "馬番"];
pub const HORSE_NAME_COLUMNS: &[&str] = &["Bamei", "UmaName", "UMANAME", "馬名"];
pub const JOCKEY_COLUMNS: &[&str] = &[
    "KisyuRyakusyo",
    "KisyuName",
    "KisyuNM",
    "KISYUNM",
    "騎手名",
    "騎手",
];
pub const WEIGHT_COLUMNS: &[&str] = &["Futan", "BurdenWeight", "斤量"];
pub const POST_POSITION_COLUMNS: &[&str] = &["Wakuban", "WakuNum", "枠番", "枠"];
pub const TRAINER_COLUMNS: &[&str] = &[
    "ChokyosiRyakusyo",
    "ChokyosiName",
    "ChokyoShiName",
    "ChokyosiNM",
    "Chokyosi",
    "調教師名",
    "調教師",
];
pub const OWNER_COLUMNS: &[&str] = &[
    "BanusiName",
    "BanushiName",
    "BannushiName",
    "Banushi",
    "Bannushi",
    "馬主名",
    "馬主",
];
pub const DAM_SIRE_COLUMNS: &[&str] = &["Ketto3InfoBamei2", "母父名"];
pub const RUNNING_STYLE_COLUMNS: &[&str] = &["KyakusituKubun"];
pub const TRACK_COLUMNS: &[&str] = &["TrackCD", "Course", "Track"];
pub const DISTANCE_COLUMNS: &[&str] = &["Kyori", "距離"];
pub const CLASS_COLUMNS: &[&str] = &["GradeCD", "RaceInfoKubun", "JyokenName"];
pub const POST_TIME_COLUMNS: &[&str] = &["HassoTime", "発走"];
pub const FINISH_COLUMNS: &[&str] = &["KakuteiJyuni"];
pub const PRIZE_COLUMNS: &[&str] = &["Honsyokin"];
pub const FIELD_SIZE_COLUMNS: &[&str] = &["DochakuTosu"];

/// Runs `sql` and reads the first `width` columns of every row as text.
pub(crate) fn query_text_rows<P: Params>(
    connection: &Connection,
    sql: &str,
    params: P,
    width: usize,
) -> Result<Vec<Vec<String>>> {
    let mut statement = connection
        .prepare(sql)
        .with_context(|| format!("failed to prepare query: {sql}"))?;
    let rows = statement
        .query_map(params, |row| {
            (0..width).map(|index| text_at(row, index)).collect::<rusqlite::Result<Vec<_>>>()
        })
        .with_context(|| format!("failed to execute query: {sql}"))?;
    rows.map(|row| row.context("failed to decode result row"))
        .collect()
}
