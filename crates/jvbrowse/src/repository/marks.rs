use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{Connection, params};

use super::query_text_rows;
use crate::derived::normalize_horse_name;
use crate::derived::odds::normalize_tenths;
use crate::discovery::{SchemaProbe, SqliteSchemaProbe, first_present_column};
use crate::models::{MarksRecord, RaceDate};
use crate::sqlite::{open_sqlite_connection, quote_identifier};

pub const MARKS_TABLE: &str = "HORSE_MARKS";

const NAME_COLUMNS: &[&str] = &["NormalizedHorseName", "HorseName"];
const RACE_ID_COLUMN: &str = "RaceId";

/// One display column of the marks store and the stored columns that feed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkField {
    pub label: &'static str,
    pub columns: &'static [&'static str],
    /// Tenths-encoded odds that need normalizing.
    pub odds: bool,
}

const fn field(label: &'static str, columns: &'static [&'static str]) -> MarkField {
    MarkField {
        label,
        columns,
        odds: false,
    }
}

const fn odds_field(label: &'static str, columns: &'static [&'static str]) -> MarkField {
    MarkField {
        label,
        columns,
        odds: true,
    }
}

pub const MARK_FIELDS: &[MarkField] = &[
    field("R印1", &["R_MARK1"]),
    field("R印2", &["R_MARK2"]),
    field("R印3", &["R_MARK3"]),
    field("馬印1", &["Mark1"]),
    field("馬印2", &["Mark2"]),
    field("馬印3", &["Mark3"]),
    field("馬印4", &["Mark4"]),
    field("馬印5", &["Mark5"]),
    field("馬印6", &["Mark6"]),
    field("馬印7", &["Mark7"]),
    field("馬印8", &["Mark8"]),
    field("前脚質", &["PREV_KYAKUSHITSU"]),
    field("前馬印1", &["PREV_MARK1"]),
    field("前馬印2", &["PREV_MARK2"]),
    field("前馬印3", &["PREV_MARK3"]),
    field("前馬印4", &["PREV_MARK4"]),
    field("前馬印5", &["PREV_MARK5"]),
    field("前馬印6", &["PREV_MARK6"]),
    field("前馬印7", &["PREV_MARK7"]),
    field("前馬印8", &["PREV_MARK8"]),
    field("前人気", &["PREV_NINKI"]),
    field("レースID", &["RaceId"]),
    field("距離", &["KYORI_M"]),
    field("ZI指数", &["ZI_INDEX"]),
    field("ZI順位", &["ZI_RANK"]),
    field("ZM", &["ZM_VALUE"]),
    field("加速", &["ACCEL_VAL"]),
    field("オリジナル", &["ORIGINAL_VAL"]),
    odds_field("単勝予想", &["TAN_ODDS", "TANSHO_ODDS"]),
    odds_field("複勝下限", &["FUKUSHO_ODDS_LOWER"]),
    odds_field("複勝上限", &["FUKUSHO_ODDS_UPPER"]),
    odds_field("複勝予想", &["FUKUSHO_ODDS"]),
    field("指数差1", &["INDEX_DIFF1"]),
    field("指数差2", &["INDEX_DIFF2"]),
    field("指数差4", &["INDEX_DIFF4"]),
    field("指数順位1", &["INDEX_RANK1"]),
    field("指数順位2", &["INDEX_RANK2"]),
    field("指数順位3", &["INDEX_RANK3"]),
    field("指数順位4", &["INDEX_RANK4"]),
    field("対戦マイニング", &["MATCHUP_MINING_VAL"]),
    field("対戦マイニング順位", &["MATCHUP_MINING_RANK"]),
    field("母父タイプ", &["DAMSIRE_TYPE_NAME"]),
];

/// Reader over the user-maintained marks store (`excel_data.db`).
pub struct MarksRepository {
    connection: Connection,
}

/// Resolved projection: which stored column backs each field, in `MARK_FIELDS` order.
struct MarksProjection {
    name_column: &'static str,
    has_race_id: bool,
    fields: Vec<(MarkField, Vec<&'static str>)>,
    order_by: String,
}

impl MarksProjection {
    fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["SourceDate", self.name_column];
        if self.has_race_id {
            columns.push(RACE_ID_COLUMN);
        }
        for (_, present) in &self.fields {
            for column in present {
                if !columns.contains(column) {
                    columns.push(column);
                }
            }
        }
        columns
    }
}

impl MarksRepository {
    /// Opens the store; a missing file is not an error, there are just no marks.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            info!("marks store not found at {}; continuing without marks", path.display());
            return Ok(None);
        }
        let connection = open_sqlite_connection(path)?;
        Ok(Some(Self { connection }))
    }

    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    fn projection(&self) -> Option<MarksProjection> {
        let probe = SqliteSchemaProbe::new(&self.connection);
        if !probe.table_exists(MARKS_TABLE) {
            debug!("{MARKS_TABLE} table not present in marks store");
            return None;
        }
        let columns = probe.probe_columns(MARKS_TABLE);
        if !columns.contains("SourceDate") {
            debug!("{MARKS_TABLE} has no SourceDate column");
            return None;
        }
        let name_column = first_present_column(&probe, MARKS_TABLE, NAME_COLUMNS)?;

        let fields = MARK_FIELDS
            .iter()
            .map(|field| {
                let present = field
                    .columns
                    .iter()
                    .copied()
                    .filter(|column| columns.contains(column))
                    .collect();
                (*field, present)
            })
            .collect();
        let order_by = if columns.contains("ImportedAt") {
            "SourceDate DESC, ImportedAt DESC".to_string()
        } else {
            "SourceDate DESC, ROWID DESC".to_string()
        };

        Some(MarksProjection {
            name_column,
            has_race_id: columns.contains(RACE_ID_COLUMN),
            fields,
            order_by,
        })
    }

    /// Every marks row for one horse, newest first.
    pub fn marks_for_horse(&self, horse_name: &str) -> Result<Vec<MarksRecord>> {
        let normalized = normalize_horse_name(horse_name);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let Some(projection) = self.projection() else {
            return Ok(Vec::new());
        };

        if projection.name_column == "NormalizedHorseName" {
            self.read(
                &projection,
                "NormalizedHorseName = ?1",
                params![normalized],
            )
        } else {
            let records = self.read(&projection, "1 = 1", params![])?;
            Ok(records
                .into_iter()
                .filter(|record| record.normalized_horse_name == normalized)
                .collect())
        }
    }

    /// Every marks row recorded for one meeting day, newest import first.
    pub fn marks_for_date(&self, date: RaceDate) -> Result<Vec<MarksRecord>> {
        let Some(projection) = self.projection() else {
            return Ok(Vec::new());
        };
        self.read(
            &projection,
            "SourceDate IN (?1, ?2)",
            params![date.compact(), date.iso()],
        )
    }

    fn read<P: rusqlite::Params>(
        &self,
        projection: &MarksProjection,
        filter: &str,
        params: P,
    ) -> Result<Vec<MarksRecord>> {
        let columns = projection.columns();
        let select = columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {select} FROM {MARKS_TABLE} WHERE {filter} ORDER BY {}",
            projection.order_by
        );
        let rows = query_text_rows(&self.connection, &sql, params, columns.len())
            .context("failed to read horse marks")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let by_column: BTreeMap<&str, &str> = columns
                    .iter()
                    .copied()
                    .zip(row.iter().map(String::as_str))
                    .collect();
                record_from_row(projection, &by_column)
            })
            .collect())
    }
}

fn record_from_row(projection: &MarksProjection, row: &BTreeMap<&str, &str>) -> MarksRecord {
    let value_of = |column: &str| row.get(column).map_or("", |value| value.trim());

    let mut values = BTreeMap::new();
    for (field, present) in &projection.fields {
        let raw = present
            .iter()
            .map(|column| value_of(column))
            .find(|value| !value.is_empty())
            .unwrap_or("");
        let value = if field.odds {
            normalize_tenths(raw)
        } else {
            raw.to_string()
        };
        values.insert(field.label.to_string(), value);
    }

    let race_id = Some(value_of(RACE_ID_COLUMN))
        .filter(|_| projection.has_race_id)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string);

    MarksRecord {
        source_date: normalize_source_date(value_of("SourceDate")),
        normalized_horse_name: normalize_horse_name(value_of(projection.name_column)),
        race_id,
        values,
    }
}

/// `2025-09-06` and `2025/09/06` both become `20250906`.
#[must_use]
pub fn normalize_source_date(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| *ch != '-' && *ch != '/')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(schema: &str) -> MarksRepository {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        connection.execute_batch(schema).expect("schema should apply");
        MarksRepository::from_connection(connection)
    }

    #[test]
    fn odds_fields_fall_back_and_normalize() {
        let repository = store(
            "CREATE TABLE HORSE_MARKS (SourceDate TEXT, NormalizedHorseName TEXT, ImportedAt TEXT,
                TANSHO_ODDS TEXT, FUKUSHO_ODDS_LOWER TEXT, Mark1 TEXT);
             INSERT INTO HORSE_MARKS VALUES ('2025-09-06', 'テストホース', '2025-09-05', '125', '30', '◎');",
        );
        let records = repository
            .marks_for_horse("テスト ホース")
            .expect("marks should load");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_date, "20250906");
        assert_eq!(record.values["単勝予想"], "12.5");
        assert_eq!(record.values["複勝下限"], "3");
        assert_eq!(record.values["馬印1"], "◎");
        assert_eq!(record.values["ZI指数"], "");
        assert_eq!(record.race_id, None);
    }

    #[test]
    fn rows_come_back_newest_first() {
        let repository = store(
            "CREATE TABLE HORSE_MARKS (SourceDate TEXT, NormalizedHorseName TEXT, ImportedAt TEXT, Mark1 TEXT);
             INSERT INTO HORSE_MARKS VALUES ('20250906', 'テストホース', '2025-09-05 10:00', 'old');
             INSERT INTO HORSE_MARKS VALUES ('20250906', 'テストホース', '2025-09-05 12:00', 'new');
             INSERT INTO HORSE_MARKS VALUES ('20250830', 'テストホース', '2025-08-29 12:00', 'prior');",
        );
        let marks: Vec<String> = repository
            .marks_for_horse("テストホース")
            .expect("marks should load")
            .into_iter()
            .map(|record| record.values["馬印1"].clone())
            .collect();
        assert_eq!(marks, ["new", "old", "prior"]);
    }

    #[test]
    fn meeting_query_matches_both_date_spellings() {
        let repository = store(
            "CREATE TABLE HORSE_MARKS (SourceDate TEXT, HorseName TEXT, RaceId TEXT);
             INSERT INTO HORSE_MARKS VALUES ('20250906', 'ホースA', '2025090605010101');
             INSERT INTO HORSE_MARKS VALUES ('2025-09-06', 'ホース B', '');
             INSERT INTO HORSE_MARKS VALUES ('20250907', 'ホースC', '');",
        );
        let date = RaceDate::parse("20250906").expect("date should parse");
        let records = repository.marks_for_date(date).expect("marks should load");

        let names: Vec<&str> = records
            .iter()
            .map(|record| record.normalized_horse_name.as_str())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"ホースA"));
        assert!(names.contains(&"ホースB"));
        assert!(records.iter().any(|record| record.race_id.as_deref() == Some("2025090605010101")));
    }

    #[test]
    fn missing_table_yields_no_marks() {
        let repository = store("CREATE TABLE OTHER (x TEXT);");
        assert!(repository.marks_for_horse("テストホース").expect("should not fail").is_empty());
    }

    #[test]
    fn missing_store_file_is_not_an_error() {
        let path = std::env::temp_dir().join("jvbrowse-no-such-marks.db");
        assert!(MarksRepository::open(&path).expect("open should not fail").is_none());
    }
}
