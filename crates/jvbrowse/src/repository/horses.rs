use anyhow::{Context, Result};
use log::warn;
use rusqlite::{Connection, params};
use time::Date;

use super::{
    DISTANCE_COLUMNS, ENTRY_TABLE, FINISH_COLUMNS, HORSE_TABLE, JOCKEY_COLUMNS, OWNER_COLUMNS,
    PRIZE_COLUMNS, RACE_TABLE, TRACK_COLUMNS, TRAINER_COLUMNS, WEIGHT_COLUMNS, query_text_rows,
};
use crate::derived::codes::{
    breed_name, coat_color_name, ground_condition_name, sex_name, track_name, venue_name,
};
use crate::derived::odds::{format_history_odds, format_popularity, format_prize};
use crate::derived::{FinishPosition, choose_preferred, compute_age};
use crate::discovery::{SchemaProbe, SqliteSchemaProbe, build_coalesce_expression, race_name_expression};
use crate::models::{Bloodline, CareerStats, HistoryRow, HorseProfile};

pub const HISTORY_LIMIT: usize = 120;
const BLOODLINE_VIEW: &str = "BLOODLINE_INFO_VIEW";
/// Placeholder for a pedigree name neither source carries.
pub const UNKNOWN_NAME: &str = "不明";

pub struct HorseRepository<'conn> {
    connection: &'conn Connection,
    probe: SqliteSchemaProbe<'conn>,
}

impl<'conn> HorseRepository<'conn> {
    #[must_use]
    pub fn new(connection: &'conn Connection) -> Self {
        Self {
            connection,
            probe: SqliteSchemaProbe::new(connection),
        }
    }

    fn coalesce(&self, table: &str, qualifier: Option<&str>, candidates: &[&str]) -> String {
        build_coalesce_expression(&self.probe, table, qualifier, candidates)
    }

    /// Registry record for one horse, with codes decoded and age as of `today`.
    pub fn profile(&self, horse_id: &str, today: Date) -> Result<Option<HorseProfile>> {
        if !self.probe.table_exists(HORSE_TABLE) {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {name}, {sex}, {birth}, {coat}, {breed}, {trainer}, {owner} \
             FROM N_UMA WHERE KettoNum = ?1 LIMIT 1",
            name = self.coalesce(HORSE_TABLE, None, &["Bamei", "UmaName", "馬名"]),
            sex = self.coalesce(HORSE_TABLE, None, &["SexCD"]),
            birth = self.coalesce(HORSE_TABLE, None, &["BirthDate"]),
            coat = self.coalesce(HORSE_TABLE, None, &["KeiroCD"]),
            breed = self.coalesce(HORSE_TABLE, None, &["HinsyuCD"]),
            trainer = self.coalesce(HORSE_TABLE, None, TRAINER_COLUMNS),
            owner = self.coalesce(HORSE_TABLE, None, OWNER_COLUMNS),
        );
        let rows = query_text_rows(self.connection, &sql, params![horse_id.trim()], 7)
            .with_context(|| format!("failed to load profile for {horse_id}"))?;

        Ok(rows.into_iter().next().map(|row| {
            let [name, sex, birth, coat, breed, trainer, owner] =
                <[String; 7]>::try_from(row).unwrap_or_default();
            HorseProfile {
                horse_id: horse_id.trim().to_string(),
                name: name.trim().to_string(),
                sex: sex_name(&sex).to_string(),
                age: compute_age(&birth, today).to_string(),
                birth_date: birth.trim().to_string(),
                coat_color: coat_color_name(&coat).to_string(),
                breed: breed_name(&breed).to_string(),
                trainer: trainer.trim().to_string(),
                owner: owner.trim().to_string(),
            }
        }))
    }

    /// Sire, dam and dam-sire. The bloodline view is preferred when present,
    /// the registry's pedigree columns fill whatever it leaves blank.
    pub fn bloodline(&self, horse_id: &str) -> Result<Bloodline> {
        let (view_sire, view_dam, view_dam_sire) = match self.bloodline_from_view(horse_id) {
            Ok(names) => names,
            Err(error) => {
                warn!("{BLOODLINE_VIEW} read failed for {horse_id}: {error:#}");
                (None, None, None)
            }
        };
        let (sire, dam, dam_sire) = self.bloodline_from_registry(horse_id)?;

        Ok(Bloodline {
            sire: choose_preferred(view_sire.as_deref(), sire.as_deref(), UNKNOWN_NAME),
            dam: choose_preferred(view_dam.as_deref(), dam.as_deref(), UNKNOWN_NAME),
            dam_sire: choose_preferred(view_dam_sire.as_deref(), dam_sire.as_deref(), UNKNOWN_NAME),
        })
    }

    fn bloodline_from_view(&self, horse_id: &str) -> Result<NamePair> {
        if !self.probe.table_exists(BLOODLINE_VIEW) {
            return Ok((None, None, None));
        }
        let sql = format!(
            "SELECT {sire}, {dam}, {dam_sire} FROM {BLOODLINE_VIEW} WHERE KettoNum = ?1 LIMIT 1",
            sire = self.coalesce(BLOODLINE_VIEW, None, &["ChichiBameiDetail", "ChichiBamei"]),
            dam = self.coalesce(BLOODLINE_VIEW, None, &["HahaBameiDetail", "HahaBamei"]),
            dam_sire = self.coalesce(
                BLOODLINE_VIEW,
                None,
                &["HahaChichiBameiDetail", "HahaChichiBamei"]
            ),
        );
        let rows = query_text_rows(self.connection, &sql, params![horse_id.trim()], 3)?;
        Ok(first_three(rows))
    }

    fn bloodline_from_registry(&self, horse_id: &str) -> Result<NamePair> {
        if !self.probe.table_exists(HORSE_TABLE) {
            return Ok((None, None, None));
        }
        let sql = format!(
            "SELECT {sire}, {dam}, {dam_sire}, {sire_side} FROM N_UMA WHERE KettoNum = ?1 LIMIT 1",
            sire = self.coalesce(HORSE_TABLE, None, &["Ketto3InfoBamei1"]),
            dam = self.coalesce(HORSE_TABLE, None, &["Ketto3InfoBamei2"]),
            dam_sire = self.coalesce(HORSE_TABLE, None, &["Ketto3InfoBamei5"]),
            sire_side = self.coalesce(HORSE_TABLE, None, &["Ketto3InfoBamei3"]),
        );
        let rows = query_text_rows(self.connection, &sql, params![horse_id.trim()], 4)
            .with_context(|| format!("failed to load pedigree for {horse_id}"))?;
        let Some(row) = rows.into_iter().next() else {
            return Ok((None, None, None));
        };
        let [sire, dam, dam_sire, sire_side] = <[String; 4]>::try_from(row).unwrap_or_default();
        let dam_sire = if dam_sire.trim().is_empty() {
            sire_side
        } else {
            dam_sire
        };
        Ok((non_blank(sire), non_blank(dam), non_blank(dam_sire)))
    }

    /// Past starts, newest first, capped at `limit`.
    pub fn history(&self, horse_id: &str, limit: usize) -> Result<Vec<HistoryRow>> {
        if !self.probe.table_exists(ENTRY_TABLE) {
            return Ok(Vec::new());
        }
        let has_race_table = self.probe.table_exists(RACE_TABLE);
        let (race_name, join) = if has_race_table {
            (
                race_name_expression(&self.probe, RACE_TABLE, Some("R")),
                " LEFT JOIN N_RACE R ON UR.Year = R.Year AND UR.MonthDay = R.MonthDay \
                 AND CAST(UR.JyoCD AS INTEGER) = CAST(R.JyoCD AS INTEGER) \
                 AND CAST(UR.RaceNum AS INTEGER) = CAST(R.RaceNum AS INTEGER)",
            )
        } else {
            ("NULL".to_string(), "")
        };
        let race_column = |candidates: &[&str]| {
            if has_race_table {
                self.coalesce(RACE_TABLE, Some("R"), candidates)
            } else {
                "NULL".to_string()
            }
        };
        let entry_column = |candidates: &[&str]| self.coalesce(ENTRY_TABLE, Some("UR"), candidates);

        let sql = format!(
            "SELECT UR.Year, UR.MonthDay, UR.JyoCD, UR.RaceNum, {race_name}, {finish}, {popularity}, \
             {odds}, {prize}, {jockey}, {weight}, {track}, {distance}, {ground}, {turf_ground}, \
             {dirt_ground}, \
             (SELECT COUNT(1) FROM N_UMA_RACE sub WHERE sub.Year = UR.Year AND sub.MonthDay = UR.MonthDay \
              AND CAST(sub.JyoCD AS INTEGER) = CAST(UR.JyoCD AS INTEGER) \
              AND CAST(sub.RaceNum AS INTEGER) = CAST(UR.RaceNum AS INTEGER)), \
             {time}, {time_diff}, {last_three}, {c1}, {c2}, {c3}, {c4} \
             FROM N_UMA_RACE UR{join} \
             WHERE UR.KettoNum = ?1 \
             ORDER BY UR.Year DESC, UR.MonthDay DESC, CAST(UR.JyoCD AS INTEGER) DESC, CAST(UR.RaceNum AS INTEGER) DESC \
             LIMIT ?2",
            finish = entry_column(FINISH_COLUMNS),
            popularity = entry_column(&["Ninki"]),
            odds = entry_column(&["Odds"]),
            prize = entry_column(PRIZE_COLUMNS),
            jockey = entry_column(JOCKEY_COLUMNS),
            weight = entry_column(WEIGHT_COLUMNS),
            track = race_column(TRACK_COLUMNS),
            distance = race_column(DISTANCE_COLUMNS),
            ground = race_column(&["BabaCD"]),
            turf_ground = race_column(&["SibaBabaCD"]),
            dirt_ground = race_column(&["DirtBabaCD"]),
            time = entry_column(&["Time", "RaceTime"]),
            time_diff = entry_column(&["TimeDiff"]),
            last_three = entry_column(&["HaronTimeL3"]),
            c1 = entry_column(&["Jyuni1c"]),
            c2 = entry_column(&["Jyuni2c"]),
            c3 = entry_column(&["Jyuni3c"]),
            c4 = entry_column(&["Jyuni4c"]),
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = query_text_rows(self.connection, &sql, params![horse_id.trim(), limit], 24)
            .with_context(|| format!("failed to load race history for {horse_id}"))?;
        Ok(rows.iter().map(|row| history_row(row)).collect())
    }

    /// Lifetime record over completed starts.
    pub fn career_stats(&self, horse_id: &str) -> Result<CareerStats> {
        let mut stats = CareerStats::default();
        if !self.probe.table_exists(ENTRY_TABLE) {
            return Ok(stats);
        }
        let sql = format!(
            "SELECT {finish}, {prize} FROM N_UMA_RACE WHERE KettoNum = ?1",
            finish = self.coalesce(ENTRY_TABLE, None, FINISH_COLUMNS),
            prize = self.coalesce(ENTRY_TABLE, None, PRIZE_COLUMNS),
        );
        let rows = query_text_rows(self.connection, &sql, params![horse_id.trim()], 2)
            .with_context(|| format!("failed to load career record for {horse_id}"))?;
        for row in rows {
            stats.record_start(FinishPosition::classify(&row[0]), &row[1]);
        }
        Ok(stats)
    }
}

type NamePair = (Option<String>, Option<String>, Option<String>);

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn first_three(rows: Vec<Vec<String>>) -> NamePair {
    let Some(row) = rows.into_iter().next() else {
        return (None, None, None);
    };
    let [first, second, third] = <[String; 3]>::try_from(row).unwrap_or_default();
    (non_blank(first), non_blank(second), non_blank(third))
}

fn history_row(row: &[String]) -> HistoryRow {
    let field = |index: usize| row.get(index).map_or("", |value| value.trim());

    let (year, month_day) = (field(0), field(1));
    let race_date = if month_day.len() == 4 && month_day.bytes().all(|byte| byte.is_ascii_digit()) {
        format!("{year}/{}/{}", &month_day[..2], &month_day[2..])
    } else {
        format!("{year}/{month_day}")
    };
    let race_number = field(3);
    let race = race_number
        .parse::<u32>()
        .map_or_else(|_| format!("{race_number}R"), |value| format!("{value}R"));

    let track_code = field(11);
    let ground_code = [field(13), turf_or_dirt(track_code, field(14), field(15))]
        .into_iter()
        .find(|code| !code.is_empty())
        .unwrap_or("");
    let corners = [field(20), field(21), field(22), field(23)].join("-");

    HistoryRow {
        race_date,
        venue: venue_name(field(2)).to_string(),
        race,
        race_name: field(4).to_string(),
        finish: FinishPosition::classify(field(5)).to_string(),
        popularity: format_popularity(field(6)),
        odds: format_history_odds(field(7)),
        prize: format_prize(field(8)),
        jockey: field(9).to_string(),
        weight: field(10).to_string(),
        track: track_name(track_code).to_string(),
        distance: field(12).to_string(),
        ground_condition: ground_condition_name(ground_code).to_string(),
        field_size: format!("{}頭", field(16)),
        race_time: field(17).to_string(),
        time_difference: field(18).to_string(),
        last_three_furlongs: field(19).to_string(),
        corner_positions: corners,
        marks: Default::default(),
        source_date: format!("{year}{month_day}"),
    }
}

/// Per-surface going: dirt courses (`2x`) read the dirt column, everything else the turf one.
fn turf_or_dirt<'a>(track_code: &str, turf: &'a str, dirt: &'a str) -> &'a str {
    if track_code.starts_with('2') { dirt } else { turf }
}
