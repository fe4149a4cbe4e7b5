use std::collections::HashMap;

use anyhow::{Context, Result};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::{
    CLASS_COLUMNS, DAM_SIRE_COLUMNS, DISTANCE_COLUMNS, ENTRY_TABLE, FIELD_SIZE_COLUMNS,
    FINISH_COLUMNS, HORSE_NAME_COLUMNS, HORSE_TABLE, JOCKEY_COLUMNS, OWNER_COLUMNS,
    POST_POSITION_COLUMNS, POST_TIME_COLUMNS, PRIZE_COLUMNS, RACE_TABLE, RUNNING_STYLE_COLUMNS,
    SADDLE_COLUMNS, TRACK_COLUMNS, TRAINER_COLUMNS, WEIGHT_COLUMNS, query_text_rows,
};
use crate::derived::FinishPosition;
use crate::derived::codes::venue_name;
use crate::derived::odds::format_win_odds;
use crate::discovery::{
    SchemaProbe, SqliteSchemaProbe, build_coalesce_expression, race_name_expression,
};
use crate::merge::{AuxiliaryIndex, CareerSnapshot};
use crate::models::{
    EntryRow, Meeting, RaceDate, RaceKey, RaceListing, RaceSummary, SaddleNumber,
};

pub const NO_PREVIOUS_RACE: &str = "データなし";
pub const DEFAULT_DAY_LIMIT: usize = 365 * 3;

const SIMPLE_ODDS_TABLES: &[&str] = &["N_ODDS_TANPUKU", "S_ODDS_TANPUKU"];
const WIDE_ODDS_TABLE: &str = "NL_O1_ODDS_TANFUKUWAKU";
const WIDE_ODDS_SLOTS: usize = 28;

/// Same race, compared on `Year`/`MonthDay` text and numeric venue and race number.
const RACE_FILTER: &str = "Year = ?1 AND MonthDay = ?2 AND CAST(JyoCD AS INTEGER) = ?3 AND CAST(RaceNum AS INTEGER) = ?4";

/// Win odds for one race and the table they came from.
#[derive(Debug, Default)]
pub struct WinOdds {
    pub source: Option<&'static str>,
    pub by_saddle: AuxiliaryIndex<SaddleNumber, String>,
}

pub struct RaceRepository<'conn> {
    connection: &'conn Connection,
    probe: SqliteSchemaProbe<'conn>,
}

impl<'conn> RaceRepository<'conn> {
    #[must_use]
    pub fn new(connection: &'conn Connection) -> Self {
        Self {
            connection,
            probe: SqliteSchemaProbe::new(connection),
        }
    }

    #[must_use]
    pub fn probe(&self) -> &SqliteSchemaProbe<'conn> {
        &self.probe
    }

    fn coalesce(&self, table: &str, qualifier: Option<&str>, candidates: &[&str]) -> String {
        build_coalesce_expression(&self.probe, table, qualifier, candidates)
    }

    /// Distinct meeting days, newest first.
    pub fn race_days(&self, limit: usize) -> Result<Vec<RaceDate>> {
        if !self.probe.table_exists(RACE_TABLE) {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = query_text_rows(
            self.connection,
            "SELECT DISTINCT Year, MonthDay FROM N_RACE ORDER BY Year DESC, MonthDay DESC LIMIT ?1",
            params![limit],
            2,
        )
        .context("failed to list race days")?;

        Ok(rows
            .iter()
            .filter_map(|row| match RaceDate::from_parts(&row[0], &row[1]) {
                Ok(date) => Some(date),
                Err(error) => {
                    debug!("skipping malformed race day: {error:#}");
                    None
                }
            })
            .collect())
    }

    /// Venues running on `date`, each with its races in race-number order.
    pub fn meetings_for_date(&self, date: RaceDate) -> Result<Vec<Meeting>> {
        if !self.probe.table_exists(RACE_TABLE) {
            return Ok(Vec::new());
        }
        let name = race_name_expression(&self.probe, RACE_TABLE, None);
        let post_time = self.coalesce(RACE_TABLE, None, POST_TIME_COLUMNS);
        let sql = format!(
            "SELECT JyoCD, RaceNum, {name}, {post_time} FROM N_RACE \
             WHERE Year = ?1 AND MonthDay = ?2 \
             ORDER BY CAST(JyoCD AS INTEGER), CAST(RaceNum AS INTEGER)"
        );
        let rows = query_text_rows(
            self.connection,
            &sql,
            params![date.year(), date.month_day()],
            4,
        )
        .with_context(|| format!("failed to list races for {date}"))?;

        let mut meetings: Vec<Meeting> = Vec::new();
        for row in rows {
            let key = match RaceKey::new(date, &row[0], &row[1]) {
                Ok(key) => key,
                Err(error) => {
                    debug!("skipping malformed race row: {error:#}");
                    continue;
                }
            };
            let listing = RaceListing {
                name: row[2].trim().to_string(),
                post_time: row[3].trim().to_string(),
                key,
            };
            match meetings.last_mut() {
                Some(meeting) if meeting.venue_code == listing.key.venue_code => {
                    if meeting.races.iter().all(|race| race.key != listing.key) {
                        meeting.races.push(listing);
                    }
                }
                _ => meetings.push(Meeting {
                    venue_code: listing.key.venue_code.clone(),
                    venue_name: venue_name(&listing.key.venue_code).to_string(),
                    races: vec![listing],
                }),
            }
        }
        Ok(meetings)
    }

    /// Primary rows for one race, ordered by saddle number when the schema has one.
    pub fn entries_for_race(&self, race: &RaceKey) -> Result<Vec<EntryRow>> {
        if !self.probe.table_exists(ENTRY_TABLE) {
            return Ok(Vec::new());
        }
        let saddle = self.coalesce(ENTRY_TABLE, Some("U"), SADDLE_COLUMNS);
        let has_horse_table = self.probe.table_exists(HORSE_TABLE);
        let dam_sire = if has_horse_table {
            self.coalesce(HORSE_TABLE, Some("UM"), DAM_SIRE_COLUMNS)
        } else {
            "NULL".to_string()
        };
        let join = if has_horse_table {
            " LEFT JOIN N_UMA UM ON U.KettoNum = UM.KettoNum"
        } else {
            ""
        };
        let order = if saddle == "NULL" {
            "U.ROWID".to_string()
        } else {
            format!("CAST({saddle} AS INTEGER)")
        };

        let sql = format!(
            "SELECT {post}, {saddle}, {name}, {jockey}, {weight}, {trainer}, {owner}, {dam_sire}, \
             {horse_id}, {style} \
             FROM N_UMA_RACE U{join} \
             WHERE U.Year = ?1 AND U.MonthDay = ?2 \
             AND CAST(U.JyoCD AS INTEGER) = ?3 AND CAST(U.RaceNum AS INTEGER) = ?4 \
             ORDER BY {order}",
            post = self.coalesce(ENTRY_TABLE, Some("U"), POST_POSITION_COLUMNS),
            name = self.coalesce(ENTRY_TABLE, Some("U"), HORSE_NAME_COLUMNS),
            jockey = self.coalesce(ENTRY_TABLE, Some("U"), JOCKEY_COLUMNS),
            weight = self.coalesce(ENTRY_TABLE, Some("U"), WEIGHT_COLUMNS),
            trainer = self.coalesce(ENTRY_TABLE, Some("U"), TRAINER_COLUMNS),
            owner = self.coalesce(ENTRY_TABLE, Some("U"), OWNER_COLUMNS),
            horse_id = self.coalesce(ENTRY_TABLE, Some("U"), &["KettoNum"]),
            style = self.coalesce(ENTRY_TABLE, Some("U"), RUNNING_STYLE_COLUMNS),
        );

        let rows = query_text_rows(self.connection, &sql, race_params(race), 10)
            .with_context(|| format!("failed to load entries for {race}"))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut fields = row.into_iter();
                let mut next = || fields.next().unwrap_or_default();
                EntryRow {
                    post_position: next(),
                    saddle_number: next(),
                    horse_name: next(),
                    jockey: next(),
                    weight: next(),
                    trainer: next(),
                    owner: next(),
                    dam_sire: next(),
                    horse_id: next().trim().to_string(),
                    running_style_code: next(),
                }
            })
            .collect())
    }

    pub fn race_summary(&self, race: &RaceKey) -> Result<Option<RaceSummary>> {
        if !self.probe.table_exists(RACE_TABLE) {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {name}, {distance}, {track}, {class}, {post_time}, {kaiji}, {nichiji} \
             FROM N_RACE WHERE {RACE_FILTER} LIMIT 1",
            name = race_name_expression(&self.probe, RACE_TABLE, None),
            distance = self.coalesce(RACE_TABLE, None, DISTANCE_COLUMNS),
            track = self.coalesce(RACE_TABLE, None, TRACK_COLUMNS),
            class = self.coalesce(RACE_TABLE, None, CLASS_COLUMNS),
            post_time = self.coalesce(RACE_TABLE, None, POST_TIME_COLUMNS),
            kaiji = self.coalesce(RACE_TABLE, None, &["Kaiji"]),
            nichiji = self.coalesce(RACE_TABLE, None, &["Nichiji"]),
        );
        let rows = query_text_rows(self.connection, &sql, race_params(race), 7)
            .with_context(|| format!("failed to load race summary for {race}"))?;

        Ok(rows.into_iter().next().map(|row| {
            let mut fields = row.into_iter().map(|value| value.trim().to_string());
            let mut next = || fields.next().unwrap_or_default();
            RaceSummary {
                name: next(),
                distance: next(),
                track_code: next(),
                class_code: next(),
                post_time: next(),
                kaiji: next(),
                nichiji: next(),
            }
        }))
    }

    /// Win odds from the first table that has any for this race:
    /// `N_ODDS_TANPUKU`, then `S_ODDS_TANPUKU`, then the wide `NL_O1` layout.
    pub fn win_odds_for_race(&self, race: &RaceKey) -> Result<WinOdds> {
        for table in SIMPLE_ODDS_TABLES {
            let by_saddle = self.simple_win_odds(table, race)?;
            if !by_saddle.is_empty() {
                return Ok(WinOdds {
                    source: Some(table),
                    by_saddle,
                });
            }
        }

        let by_saddle = self.wide_win_odds(race)?;
        if by_saddle.is_empty() {
            return Ok(WinOdds::default());
        }
        Ok(WinOdds {
            source: Some(WIDE_ODDS_TABLE),
            by_saddle,
        })
    }

    fn simple_win_odds(&self, table: &str, race: &RaceKey) -> Result<AuxiliaryIndex<SaddleNumber, String>> {
        let mut index = AuxiliaryIndex::new();
        if !self.probe.table_exists(table)
            || !self.probe.has_column(table, "Umaban")
            || !self.probe.has_column(table, "TanOdds")
        {
            return Ok(index);
        }

        let sql = format!("SELECT Umaban, TanOdds FROM {table} WHERE {RACE_FILTER}");
        let rows = query_text_rows(self.connection, &sql, race_params(race), 2)
            .with_context(|| format!("failed to read win odds from {table}"))?;
        for row in rows {
            insert_odds(&mut index, &row[0], &row[1]);
        }
        Ok(index)
    }

    fn wide_win_odds(&self, race: &RaceKey) -> Result<AuxiliaryIndex<SaddleNumber, String>> {
        let mut index = AuxiliaryIndex::new();
        if !self.probe.table_exists(WIDE_ODDS_TABLE) {
            return Ok(index);
        }

        let columns = self.probe.probe_columns(WIDE_ODDS_TABLE);
        let slots: Vec<(String, String)> = (0..WIDE_ODDS_SLOTS)
            .map(|slot| {
                (
                    format!("OddsTansyoInfo{slot}Umaban"),
                    format!("OddsTansyoInfo{slot}Odds"),
                )
            })
            .filter(|(saddle, odds)| columns.contains(saddle) && columns.contains(odds))
            .collect();
        if slots.is_empty() {
            return Ok(index);
        }

        let projection = slots
            .iter()
            .map(|(saddle, odds)| format!("{saddle}, {odds}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {projection} FROM {WIDE_ODDS_TABLE} \
             WHERE idYear = ?1 AND idMonthDay = ?2 \
             AND CAST(idJyoCD AS INTEGER) = ?3 AND CAST(idRaceNum AS INTEGER) = ?4 LIMIT 1"
        );
        let rows = query_text_rows(self.connection, &sql, race_params(race), slots.len() * 2)
            .context("failed to read wide win-odds row")?;
        if let Some(row) = rows.first() {
            for pair in row.chunks(2) {
                if let [saddle, odds] = pair {
                    insert_odds(&mut index, saddle, odds);
                }
            }
        }
        Ok(index)
    }

    /// Latest start of `horse_id` before `before`, as `"{date} {venue} {n}R {finish}/{heads}"`.
    pub fn previous_race_result(&self, horse_id: &str, before: RaceDate) -> Result<String> {
        if horse_id.trim().is_empty() || !self.probe.table_exists(ENTRY_TABLE) {
            return Ok(NO_PREVIOUS_RACE.to_string());
        }
        let finish = self.coalesce(ENTRY_TABLE, None, FINISH_COLUMNS);
        let heads = self.coalesce(ENTRY_TABLE, None, FIELD_SIZE_COLUMNS);
        let sql = format!(
            "SELECT Year, MonthDay, JyoCD, RaceNum, {finish}, {heads} FROM N_UMA_RACE \
             WHERE KettoNum = ?1 AND (Year < ?2 OR (Year = ?2 AND MonthDay < ?3)) \
             ORDER BY Year DESC, MonthDay DESC, CAST(JyoCD AS INTEGER) DESC, CAST(RaceNum AS INTEGER) DESC LIMIT 1"
        );
        let rows = query_text_rows(
            self.connection,
            &sql,
            params![horse_id.trim(), before.year(), before.month_day()],
            6,
        )
        .with_context(|| format!("failed to load previous race for {horse_id}"))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(NO_PREVIOUS_RACE.to_string());
        };
        let [year, month_day, venue, race_number, finish_code, heads_raw] =
            <[String; 6]>::try_from(row).unwrap_or_default();
        if year.trim().is_empty() {
            return Ok(NO_PREVIOUS_RACE.to_string());
        }

        let heads = match heads_raw.trim().trim_start_matches('0') {
            "" => self.field_size(&year, &month_day, &venue, &race_number)?,
            count => count.to_string(),
        };
        let race_label = race_number
            .trim()
            .parse::<u32>()
            .map_or_else(|_| race_number.trim().to_string(), |value| value.to_string());
        let finish = match FinishPosition::classify(&finish_code) {
            FinishPosition::Placed(position) => position.to_string(),
            other => other.to_string(),
        };
        Ok(format!(
            "{}{} {} {}R {finish}/{heads}",
            year.trim(),
            month_day.trim(),
            venue_name(&venue),
            race_label,
        ))
    }

    fn field_size(&self, year: &str, month_day: &str, venue: &str, race_number: &str) -> Result<String> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM N_UMA_RACE WHERE Year = ?1 AND MonthDay = ?2 \
                 AND CAST(JyoCD AS INTEGER) = CAST(?3 AS INTEGER) AND CAST(RaceNum AS INTEGER) = CAST(?4 AS INTEGER)",
                params![year, month_day, venue, race_number],
                |row| row.get(0),
            )
            .optional()
            .context("failed to count field size")?
            .unwrap_or(0);
        Ok(count.to_string())
    }

    /// Career figures for each horse over starts strictly before the race day,
    /// gathered in one query.
    pub fn careers_before(&self, before: RaceDate, horse_ids: &[String]) -> Result<HashMap<String, CareerSnapshot>> {
        let mut careers: HashMap<String, CareerSnapshot> = HashMap::new();
        let ids: Vec<&str> = horse_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() || !self.probe.table_exists(ENTRY_TABLE) {
            return Ok(careers);
        }

        let finish = self.coalesce(ENTRY_TABLE, None, FINISH_COLUMNS);
        let prize = self.coalesce(ENTRY_TABLE, None, PRIZE_COLUMNS);
        let placeholders = (0..ids.len())
            .map(|index| format!("?{}", index + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT KettoNum, {finish}, {prize} FROM N_UMA_RACE \
             WHERE (Year < ?1 OR (Year = ?1 AND MonthDay < ?2)) AND KettoNum IN ({placeholders})"
        );
        let mut values = vec![before.year(), before.month_day()];
        values.extend(ids.iter().map(ToString::to_string));

        let rows = query_text_rows(self.connection, &sql, params_from_iter(values.iter()), 3)
            .context("failed to load career records")?;
        for row in rows {
            let finish = FinishPosition::classify(&row[1]);
            let snapshot = careers.entry(row[0].trim().to_string()).or_default();
            snapshot.stats.record_start(finish, &row[2]);
            snapshot.finishes.record(finish);
        }
        Ok(careers)
    }
}

fn race_params(race: &RaceKey) -> [rusqlite::types::Value; 4] {
    use rusqlite::types::Value;
    [
        Value::Text(race.year()),
        Value::Text(race.month_day()),
        Value::Integer(i64::from(race.venue_number())),
        Value::Integer(i64::from(race.race_number)),
    ]
}

fn insert_odds(index: &mut AuxiliaryIndex<SaddleNumber, String>, saddle: &str, odds: &str) {
    if let (Some(saddle), Some(odds)) = (SaddleNumber::parse(saddle), format_win_odds(odds)) {
        index.insert_first(saddle, odds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        connection
            .execute_batch(
                "CREATE TABLE N_RACE (Year TEXT, MonthDay TEXT, JyoCD TEXT, RaceNum TEXT, Hondai TEXT, HassoTime TEXT);
                 INSERT INTO N_RACE VALUES ('2025', '0906', '09', '02', '2歳未勝利', '1010');
                 INSERT INTO N_RACE VALUES ('2025', '0906', '05', '11', 'セントウルS', '1545');
                 INSERT INTO N_RACE VALUES ('2025', '0906', '5', '1', '2歳新馬', '0950');
                 INSERT INTO N_RACE VALUES ('2025', '0906', '05', '11', 'セントウルS', '1545');
                 INSERT INTO N_RACE VALUES ('2025', '0831', '10', '01', '', '0935');
                 INSERT INTO N_RACE VALUES ('2024', '1228', '06', '11', '有馬記念', '1525');
                 CREATE TABLE N_UMA_RACE (Year TEXT, MonthDay TEXT, JyoCD TEXT, RaceNum TEXT, KettoNum TEXT,
                    KakuteiJyuni TEXT, DochakuTosu TEXT);
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0831', '10', '01', '2022100001', '02', '');
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0831', '10', '01', '2022100002', '01', '');
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0831', '10', '01', '2022100003', 'H', '');
                 CREATE TABLE NL_O1_ODDS_TANFUKUWAKU (idYear TEXT, idMonthDay TEXT, idJyoCD TEXT, idRaceNum TEXT,
                    OddsTansyoInfo0Umaban TEXT, OddsTansyoInfo0Odds TEXT,
                    OddsTansyoInfo1Umaban TEXT, OddsTansyoInfo1Odds TEXT);
                 INSERT INTO NL_O1_ODDS_TANFUKUWAKU VALUES ('2025', '0906', '5', '11', '01', '0034', '2', '0125');",
            )
            .expect("fixture should apply");
        connection
    }

    fn date(raw: &str) -> RaceDate {
        RaceDate::parse(raw).expect("date should parse")
    }

    #[test]
    fn race_days_are_distinct_and_newest_first() {
        let connection = fixture();
        let repository = RaceRepository::new(&connection);
        let days = repository.race_days(2).expect("days should load");
        assert_eq!(days, [date("20250906"), date("20250831")]);
    }

    #[test]
    fn meetings_group_by_venue_in_race_order() {
        let connection = fixture();
        let repository = RaceRepository::new(&connection);
        let meetings = repository
            .meetings_for_date(date("20250906"))
            .expect("meetings should load");

        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].venue_name, "東京");
        let tokyo: Vec<(u8, &str)> = meetings[0]
            .races
            .iter()
            .map(|race| (race.key.race_number, race.name.as_str()))
            .collect();
        assert_eq!(tokyo, [(1, "2歳新馬"), (11, "セントウルS")]);
        assert_eq!(meetings[1].venue_name, "阪神");
        assert_eq!(meetings[1].races[0].post_time, "1010");
    }

    #[test]
    fn missing_race_table_lists_nothing() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        let repository = RaceRepository::new(&connection);
        assert!(repository.race_days(10).expect("days should load").is_empty());
        assert!(
            repository
                .meetings_for_date(date("20250906"))
                .expect("meetings should load")
                .is_empty()
        );
    }

    #[test]
    fn wide_odds_row_is_used_when_simple_tables_are_absent() {
        let connection = fixture();
        let repository = RaceRepository::new(&connection);
        let race = RaceKey::new(date("20250906"), "05", "11").expect("race key should build");
        let odds = repository.win_odds_for_race(&race).expect("odds should load");

        assert_eq!(odds.source, Some(WIDE_ODDS_TABLE));
        let saddle = |value| SaddleNumber::new(value).expect("saddle should be valid");
        assert_eq!(odds.by_saddle.get(&saddle(1)).map(String::as_str), Some("3.4"));
        assert_eq!(odds.by_saddle.get(&saddle(2)).map(String::as_str), Some("12.5"));
    }

    #[test]
    fn previous_race_counts_field_when_head_count_is_blank() {
        let connection = fixture();
        let repository = RaceRepository::new(&connection);
        let line = repository
            .previous_race_result("2022100001", date("20250906"))
            .expect("previous race should load");
        assert_eq!(line, "20250831 小倉 1R 2/3");

        let scratched = repository
            .previous_race_result("2022100003", date("20250906"))
            .expect("previous race should load");
        assert_eq!(scratched, "20250831 小倉 1R 取消/3");

        let none = repository
            .previous_race_result("2022100001", date("20250831"))
            .expect("previous race should load");
        assert_eq!(none, NO_PREVIOUS_RACE);
    }

    #[test]
    fn careers_only_count_earlier_days() {
        let connection = fixture();
        let repository = RaceRepository::new(&connection);
        let ids = vec!["2022100002".to_string(), " ".to_string()];

        let before_race = repository
            .careers_before(date("20250831"), &ids)
            .expect("careers should load");
        assert!(before_race.is_empty());

        let after_race = repository
            .careers_before(date("20250906"), &ids)
            .expect("careers should load");
        let career = after_race["2022100002"];
        assert_eq!(career.stats.starts, 1);
        assert_eq!(career.stats.wins, 1);
    }

    #[test]
    fn full_width_month_day_rows_are_skipped() {
        let connection = fixture();
        connection
            .execute_batch("INSERT INTO N_RACE VALUES ('2025', '０9', '05', '11', '全角', '1545');")
            .expect("full-width row should insert");
        let repository = RaceRepository::new(&connection);
        let days = repository.race_days(10).expect("days should load");
        assert_eq!(days, [date("20250906"), date("20250831"), date("20241228")]);
    }

    #[test]
    fn previous_race_field_size_ignores_code_padding() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        connection
            .execute_batch(
                "CREATE TABLE N_UMA_RACE (Year TEXT, MonthDay TEXT, JyoCD TEXT, RaceNum TEXT, KettoNum TEXT,
                    KakuteiJyuni TEXT, DochakuTosu TEXT);
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0824', '4', '3', '2022100009', '01', '');
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0824', '04', '03', '2022100010', '02', '');
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0824', '04', '3', '2022100011', '03', '');
                 INSERT INTO N_UMA_RACE VALUES ('2025', '0824', '04', '13', '2022100012', '01', '');",
            )
            .expect("fixture should apply");
        let repository = RaceRepository::new(&connection);
        let line = repository
            .previous_race_result("2022100009", date("20250906"))
            .expect("previous race should load");
        assert_eq!(line, "20250824 新潟 3R 1/3");
    }
}
