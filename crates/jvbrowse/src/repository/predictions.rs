use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

use super::query_text_rows;
use crate::discovery::{SchemaProbe, SqliteSchemaProbe};
use crate::merge::AuxiliaryIndex;
use crate::models::{EntryKey, Grade, RaceKey, SaddleNumber};
use crate::sqlite::AttachedDatabase;

/// Schema name the predictions store is attached under for the duration of one load.
pub const PREDICTIONS_SCHEMA: &str = "predictions_db";
pub const PREDICTIONS_TABLE: &str = "Predictions";

#[derive(Debug)]
pub enum PredictionLoad {
    Loaded(AuxiliaryIndex<EntryKey, Grade>),
    StoreMissing,
    TableMissing,
}

impl PredictionLoad {
    /// Grades by entry; empty unless the store was loaded.
    #[must_use]
    pub fn into_index(self) -> AuxiliaryIndex<EntryKey, Grade> {
        match self {
            Self::Loaded(index) => index,
            Self::StoreMissing | Self::TableMissing => AuxiliaryIndex::new(),
        }
    }
}

/// Attaches the predictions store, reads the grades for `race`, and detaches
/// again before returning.
///
/// When several rows share a key the most recently inserted one is kept.
/// Blank or unrecognised grades read as `E`.
pub fn load_predictions_for_race(
    connection: &Connection,
    store: &Path,
    race: &RaceKey,
) -> Result<PredictionLoad> {
    if !store.is_file() {
        info!("predictions store not found at {}", store.display());
        return Ok(PredictionLoad::StoreMissing);
    }

    let attached = AttachedDatabase::attach(connection, store, PREDICTIONS_SCHEMA)?;
    let probe = SqliteSchemaProbe::for_schema(connection, attached.schema());
    if !probe.table_exists(PREDICTIONS_TABLE) {
        debug!("{PREDICTIONS_TABLE} table missing in {}", store.display());
        return Ok(PredictionLoad::TableMissing);
    }

    let sql = format!(
        "SELECT Year, MonthDay, JyoCD, RaceNum, Umaban, RankGrade \
         FROM {}.{PREDICTIONS_TABLE} \
         WHERE Year = ?1 AND MonthDay = ?2 \
         AND CAST(JyoCD AS INTEGER) = ?3 AND CAST(RaceNum AS INTEGER) = ?4 \
         ORDER BY ROWID DESC",
        attached.schema()
    );
    let rows = query_text_rows(
        connection,
        &sql,
        rusqlite::params![
            race.year(),
            race.month_day(),
            i64::from(race.venue_number()),
            i64::from(race.race_number)
        ],
        6,
    )
    .with_context(|| format!("failed to read predictions for {race}"))?;

    let mut index = AuxiliaryIndex::new();
    for row in rows {
        let key = RaceKey::from_columns(&row[0], &row[1], &row[2], &row[3])
            .ok()
            .zip(SaddleNumber::parse(&row[4]));
        let Some((race_key, saddle)) = key else {
            debug!("skipping prediction row with unusable key: {row:?}");
            continue;
        };
        let grade = Grade::parse(&row[5]).unwrap_or(Grade::E);
        index.insert_first(EntryKey::new(race_key, saddle), grade);
    }
    Ok(PredictionLoad::Loaded(index))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::models::RaceDate;

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
        std::fs::create_dir_all(&path).expect("temp dir should be creatable");
        path
    }

    fn race() -> RaceKey {
        let date = RaceDate::parse("20250906").expect("date should parse");
        RaceKey::new(date, "05", "11").expect("race key should build")
    }

    #[test]
    fn latest_row_wins_and_blank_grade_reads_as_e() {
        let dir = unique_temp_dir("jvbrowse-predictions");
        let store = dir.join("predictions.db");
        Connection::open(&store)
            .expect("store should open")
            .execute_batch(
                "CREATE TABLE Predictions (Year TEXT, MonthDay TEXT, JyoCD TEXT, RaceNum TEXT, Umaban TEXT, RankGrade TEXT);
                 INSERT INTO Predictions VALUES ('2025', '0906', '05', '11', '03', 'B');
                 INSERT INTO Predictions VALUES ('2025', '0906', '5', '11', '3', 'a');
                 INSERT INTO Predictions VALUES ('2025', '0906', '05', '11', '04', NULL);
                 INSERT INTO Predictions VALUES ('2025', '0906', '05', '12', '01', 'S');",
            )
            .expect("fixture should apply");

        let main = Connection::open_in_memory().expect("main db should open");
        let index = load_predictions_for_race(&main, &store, &race())
            .expect("predictions should load")
            .into_index();

        let saddle = |value| SaddleNumber::new(value).expect("saddle should be valid");
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&EntryKey::new(race(), saddle(3))), Some(&Grade::A));
        assert_eq!(index.get(&EntryKey::new(race(), saddle(4))), Some(&Grade::E));
        assert_eq!(index.discarded(), 1);

        let attached: i64 = main
            .query_row("SELECT COUNT(*) FROM pragma_database_list WHERE name = ?1", [PREDICTIONS_SCHEMA], |row| row.get(0))
            .expect("database list should read");
        assert_eq!(attached, 0, "store should be detached after loading");
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_store_and_table_are_distinguished() {
        let main = Connection::open_in_memory().expect("main db should open");
        let dir = unique_temp_dir("jvbrowse-predictions-empty");

        let missing = load_predictions_for_race(&main, &dir.join("absent.db"), &race())
            .expect("missing store should not fail");
        assert!(matches!(missing, PredictionLoad::StoreMissing));

        let empty = dir.join("empty.db");
        Connection::open(&empty)
            .expect("store should open")
            .execute_batch("CREATE TABLE Other (x TEXT);")
            .expect("fixture should apply");
        let no_table = load_predictions_for_race(&main, &empty, &race())
            .expect("missing table should not fail");
        assert!(matches!(no_table, PredictionLoad::TableMissing));
        std::fs::remove_dir_all(dir).ok();
    }
}
