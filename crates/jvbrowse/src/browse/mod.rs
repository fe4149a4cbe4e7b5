//! Browse actions: one store connection per action, every auxiliary index
//! built before the merge runs.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;
use time::Date;

use crate::config::StorePaths;
use crate::derived::codes::{track_name, venue_name};
use crate::derived::{format_post_time, format_rate};
use crate::merge::{
    MarksIndex, MarksScope, RaceCardSources, RowFailure, merge_race_card, overlay_history_marks,
};
use crate::models::{
    Bloodline, CareerStats, HistoryRow, HorseProfile, MarksRecord, Meeting, RaceCardEntry,
    RaceDate, RaceKey, RaceSummary,
};
use crate::repository::horses::HISTORY_LIMIT;
use crate::repository::{
    HorseRepository, MarksRepository, PredictionLoad, RaceRepository, load_predictions_for_race,
};
use crate::sqlite::open_sqlite_connection;

/// Warning code and message destined for the envelope.
pub type Warning = (String, String);

fn warning(code: &str, message: impl Into<String>) -> Warning {
    (code.to_string(), message.into())
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceCard {
    pub race: RaceKey,
    pub summary: Option<RaceSummary>,
    pub header: Vec<String>,
    pub odds_source: Option<&'static str>,
    pub entries: Vec<RaceCardEntry>,
    pub failures: Vec<RowFailure>,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub record: String,
    pub win_rate: String,
    pub top_two_rate: String,
    pub top_three_rate: String,
    pub total_prize: String,
}

impl From<&CareerStats> for StatsSummary {
    fn from(stats: &CareerStats) -> Self {
        Self {
            record: stats.record_text(),
            win_rate: format_rate(stats.win_rate()),
            top_two_rate: format_rate(stats.top_two_rate()),
            top_three_rate: format_rate(stats.top_three_rate()),
            total_prize: stats.total_prize_text(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HorseDetail {
    pub horse_id: String,
    pub horse_name: String,
    pub profile: Option<HorseProfile>,
    pub bloodline: Bloodline,
    pub stats: CareerStats,
    pub stats_summary: StatsSummary,
    pub history: Vec<HistoryRow>,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

pub fn race_days(stores: &StorePaths, limit: usize) -> Result<Vec<RaceDate>> {
    let connection = open_sqlite_connection(stores.require_database()?)?;
    RaceRepository::new(&connection).race_days(limit)
}

pub fn meetings(stores: &StorePaths, date: RaceDate) -> Result<Vec<Meeting>> {
    let connection = open_sqlite_connection(stores.require_database()?)?;
    RaceRepository::new(&connection).meetings_for_date(date)
}

/// Builds the full race card for `race`.
///
/// Only the primary store is mandatory. Every auxiliary source that cannot be
/// read becomes a warning and contributes blank fields.
pub fn browse_race(stores: &StorePaths, race: &RaceKey) -> Result<RaceCard> {
    let connection = open_sqlite_connection(stores.require_database()?)?;
    let repository = RaceRepository::new(&connection);
    let mut warnings = Vec::new();

    let summary = repository.race_summary(race)?;
    let rows = repository.entries_for_race(race)?;
    if rows.is_empty() {
        warnings.push(warning("no_entries", format!("no entries found for {race}")));
    }

    let mut sources = RaceCardSources::default();

    if let Some(store) = stores.predictions_store.as_deref() {
        match load_predictions_for_race(&connection, store, race) {
            Ok(PredictionLoad::Loaded(index)) => sources.predictions = index,
            Ok(PredictionLoad::StoreMissing) => {
                debug!("no predictions store; grades fall back to odds");
            }
            Ok(PredictionLoad::TableMissing) => warnings.push(warning(
                "predictions_table_missing",
                format!("Predictions table not found in {}", store.display()),
            )),
            Err(error) => {
                warn!("predictions unavailable: {error:#}");
                warnings.push(warning("predictions_unavailable", format!("{error:#}")));
            }
        }
    }

    let mut odds_source = None;
    match repository.win_odds_for_race(race) {
        Ok(odds) => {
            odds_source = odds.source;
            sources.win_odds = odds.by_saddle;
        }
        Err(error) => {
            warn!("win odds unavailable for {race}: {error:#}");
            warnings.push(warning("odds_unavailable", format!("{error:#}")));
        }
    }

    if let Some(store) = stores.marks_store.as_deref() {
        match load_marks(store, |marks| marks.marks_for_date(race.date)) {
            Ok(records) => sources.marks = MarksIndex::build(records, MarksScope::Meeting),
            Err(error) => {
                warn!("marks unavailable: {error:#}");
                warnings.push(warning("marks_unavailable", format!("{error:#}")));
            }
        }
    }

    let horse_ids: Vec<String> = rows
        .iter()
        .map(|row| row.horse_id.clone())
        .filter(|id| !id.is_empty())
        .collect();
    match repository.careers_before(race.date, &horse_ids) {
        Ok(careers) => sources.careers = careers,
        Err(error) => {
            warn!("career records unavailable: {error:#}");
            warnings.push(warning("career_unavailable", format!("{error:#}")));
        }
    }
    sources.previous_races = previous_races(&repository, &horse_ids, race.date);

    let outcome = merge_race_card(race, rows, &sources);
    let header = summary
        .as_ref()
        .map(|summary| format_race_header(race, summary))
        .unwrap_or_default();

    Ok(RaceCard {
        race: race.clone(),
        summary,
        header,
        odds_source,
        entries: outcome.entries,
        failures: outcome.failures,
        warnings,
    })
}

fn previous_races(repository: &RaceRepository<'_>, horse_ids: &[String], before: RaceDate) -> HashMap<String, String> {
    let mut lines = HashMap::new();
    for horse_id in horse_ids {
        match repository.previous_race_result(horse_id, before) {
            Ok(line) => {
                lines.insert(horse_id.clone(), line);
            }
            Err(error) => warn!("previous race lookup failed for {horse_id}: {error:#}"),
        }
    }
    lines
}

fn load_marks(
    store: &Path,
    read: impl FnOnce(&MarksRepository) -> Result<Vec<MarksRecord>>,
) -> Result<Vec<MarksRecord>> {
    match MarksRepository::open(store)? {
        Some(marks) => read(&marks),
        None => Ok(Vec::new()),
    }
}

/// Profile, pedigree, record and past starts of one horse, with that horse's
/// marks overlaid on each start.
pub fn horse_detail(
    stores: &StorePaths,
    horse_id: &str,
    horse_name: Option<&str>,
    today: Date,
) -> Result<HorseDetail> {
    let connection = open_sqlite_connection(stores.require_database()?)?;
    let repository = HorseRepository::new(&connection);
    let mut warnings = Vec::new();

    let profile = repository.profile(horse_id, today)?;
    if profile.is_none() {
        warnings.push(warning("profile_missing", format!("no registry record for {horse_id}")));
    }
    let horse_name = horse_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .or_else(|| profile.as_ref().map(|profile| profile.name.clone()))
        .unwrap_or_default();

    let bloodline = repository.bloodline(horse_id)?;
    let stats = repository.career_stats(horse_id)?;
    let mut history = repository.history(horse_id, HISTORY_LIMIT)?;

    if let Some(store) = stores.marks_store.as_deref()
        && !horse_name.is_empty()
    {
        match load_marks(store, |marks| marks.marks_for_horse(&horse_name)) {
            Ok(records) => {
                let index = MarksIndex::build(records, MarksScope::SingleHorse);
                overlay_history_marks(&mut history, &index, &horse_name);
            }
            Err(error) => {
                warn!("marks unavailable for {horse_name}: {error:#}");
                warnings.push(warning("marks_unavailable", format!("{error:#}")));
            }
        }
    }

    Ok(HorseDetail {
        horse_id: horse_id.trim().to_string(),
        horse_name,
        profile,
        bloodline,
        stats_summary: StatsSummary::from(&stats),
        stats,
        history,
        warnings,
    })
}

/// Three header lines: meeting and post time, race number and name, course.
#[must_use]
pub fn format_race_header(race: &RaceKey, summary: &RaceSummary) -> Vec<String> {
    let date = race.date.date();
    let meeting_line = format!(
        "{}年{:02}月{:02}日　第{}回{}競馬　{}日目　発送時刻　{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        strip_zeros(&summary.kaiji),
        venue_name(&race.venue_code),
        strip_zeros(&summary.nichiji),
        format_post_time(&summary.post_time),
    );
    let name_line = format!("{}R　（{}）", race.race_number, summary.name.trim());
    let course_line = format!(
        "（{}）{}ｍ",
        track_name(&summary.track_code),
        strip_zeros(&summary.distance)
    );
    vec![meeting_line, name_line, course_line]
}

fn strip_zeros(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.trim_start_matches('0') {
        "" if !trimmed.is_empty() => "0".to_string(),
        rest => rest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn race_header_uses_full_width_separators() {
        let race = RaceKey::new(
            RaceDate::parse("20250906").expect("date should parse"),
            "5",
            "11",
        )
        .expect("race key should build");
        let summary = RaceSummary {
            name: "秋風ステークス".to_string(),
            distance: "1600".to_string(),
            track_code: "11".to_string(),
            post_time: "1545".to_string(),
            kaiji: "04".to_string(),
            nichiji: "01".to_string(),
            ..RaceSummary::default()
        };

        assert_snapshot!(format_race_header(&race, &summary).join("\n"), @r"
        2025年09月06日　第4回東京競馬　1日目　発送時刻　15：45
        11R　（秋風ステークス）
        （芝・右）1600ｍ
        ");
    }

    #[test]
    fn stats_summary_marks_unknown_rates() {
        let summary = StatsSummary::from(&CareerStats::default());
        assert_eq!(summary.record, "0-0-0-0");
        assert_eq!(summary.win_rate, "-");
        assert_eq!(summary.total_prize, "0万円");
    }
}
