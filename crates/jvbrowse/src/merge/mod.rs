//! Joins primary race rows with auxiliary per-horse sources.
//!
//! Every auxiliary source is loaded into an [`AuxiliaryIndex`] before merging
//! starts. Rows are then overlaid one at a time; a row that cannot be merged
//! keeps its primary fields and gets blank auxiliary fields.

use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use log::warn;
use serde::Serialize;

use crate::derived::codes::running_style_name;
use crate::derived::odds::grade_from_display_odds;
use crate::derived::{format_rate, normalize_horse_name};
use crate::models::{
    CareerStats, EntryKey, EntryRow, FinishCounts, Grade, HistoryRow, MarksRecord, RaceCardEntry,
    RaceKey, SaddleNumber,
};

/// Map from lookup key to record where the first insertion under a key wins.
#[derive(Debug, Clone)]
pub struct AuxiliaryIndex<K, V> {
    entries: HashMap<K, V>,
    discarded: usize,
}

impl<K, V> Default for AuxiliaryIndex<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            discarded: 0,
        }
    }
}

impl<K: Eq + Hash, V> AuxiliaryIndex<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and drops `value` when `key` is already taken.
    pub fn insert_first(&mut self, key: K, value: V) -> bool {
        if self.entries.contains_key(&key) {
            self.discarded += 1;
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Probes `keys` in order and returns the first hit.
    pub fn lookup_first<'k>(&self, keys: impl IntoIterator<Item = &'k K>) -> Option<&V>
    where
        K: 'k,
    {
        keys.into_iter().find_map(|key| self.entries.get(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of insertions rejected because their key was occupied.
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

/// Builds an index in one pass, storing each record under every key `keys_for` yields.
pub fn load_auxiliary_index<R, K, I, F>(records: I, mut keys_for: F) -> AuxiliaryIndex<K, Rc<R>>
where
    I: IntoIterator<Item = R>,
    K: Eq + Hash,
    F: FnMut(&R) -> Vec<K>,
{
    let mut index = AuxiliaryIndex::new();
    for record in records {
        let keys = keys_for(&record);
        let shared = Rc::new(record);
        for key in keys {
            index.insert_first(key, Rc::clone(&shared));
        }
    }
    index
}

/// Alias keys a marks record can be found under, in lookup priority order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarksKey {
    DateAndHorse { source_date: String, horse: String },
    DateOnly { source_date: String },
    RaceIdAndHorse { race_id: String, horse: String },
}

/// Whether a marks index covers one horse or a whole meeting day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarksScope {
    /// All rows belong to one horse, so a date-only alias is safe.
    SingleHorse,
    /// Rows span many horses; a date-only alias would hand one horse's marks to another.
    Meeting,
}

#[derive(Debug, Clone, Default)]
pub struct MarksIndex {
    index: AuxiliaryIndex<MarksKey, Rc<MarksRecord>>,
}

impl MarksIndex {
    /// `records` must be ordered most-relevant first (newest `SourceDate`, then newest import).
    #[must_use]
    pub fn build(records: Vec<MarksRecord>, scope: MarksScope) -> Self {
        let index = load_auxiliary_index(records, |record| marks_keys(record, scope));
        Self { index }
    }

    #[must_use]
    pub fn lookup(&self, source_date: &str, horse_name: &str, race_id: Option<&str>) -> Option<&MarksRecord> {
        let horse = normalize_horse_name(horse_name);
        let mut keys = vec![
            MarksKey::DateAndHorse {
                source_date: source_date.to_string(),
                horse: horse.clone(),
            },
            MarksKey::DateOnly {
                source_date: source_date.to_string(),
            },
        ];
        if let Some(race_id) = race_id.filter(|value| !value.trim().is_empty()) {
            keys.push(MarksKey::RaceIdAndHorse {
                race_id: race_id.trim().to_string(),
                horse,
            });
        }
        self.index.lookup_first(&keys).map(Rc::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn marks_keys(record: &MarksRecord, scope: MarksScope) -> Vec<MarksKey> {
    let source_date = record.source_date.trim().to_string();
    if source_date.is_empty() {
        return Vec::new();
    }
    let horse = normalize_horse_name(&record.normalized_horse_name);

    let mut keys = vec![MarksKey::DateAndHorse {
        source_date: source_date.clone(),
        horse: horse.clone(),
    }];
    if scope == MarksScope::SingleHorse {
        keys.push(MarksKey::DateOnly { source_date });
    }
    if let Some(race_id) = record.race_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        keys.push(MarksKey::RaceIdAndHorse {
            race_id: race_id.to_string(),
            horse,
        });
    }
    keys
}

/// Per-horse career figures computed over races before the card's date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CareerSnapshot {
    pub stats: CareerStats,
    pub finishes: FinishCounts,
}

/// Every auxiliary lookup the race card needs, fully built.
#[derive(Debug, Default)]
pub struct RaceCardSources {
    pub predictions: AuxiliaryIndex<EntryKey, Grade>,
    pub win_odds: AuxiliaryIndex<SaddleNumber, String>,
    pub marks: MarksIndex,
    pub careers: HashMap<String, CareerSnapshot>,
    pub previous_races: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub horse_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub entries: Vec<RaceCardEntry>,
    pub failures: Vec<RowFailure>,
}

/// Overlays `sources` onto each primary row. A failing row is kept with blank
/// auxiliary fields and reported in [`MergeOutcome::failures`].
#[must_use]
pub fn merge_race_card(race: &RaceKey, rows: Vec<EntryRow>, sources: &RaceCardSources) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    for row in rows {
        match merge_entry(race, &row, sources) {
            Ok(entry) => outcome.entries.push(entry),
            Err(error) => {
                warn!("merge failed for `{}` in {race}: {error:#}", row.horse_name);
                outcome.failures.push(RowFailure {
                    horse_name: row.horse_name.clone(),
                    reason: format!("{error:#}"),
                });
                outcome.entries.push(primary_only(&row));
            }
        }
    }
    outcome
}

fn merge_entry(race: &RaceKey, row: &EntryRow, sources: &RaceCardSources) -> Result<RaceCardEntry> {
    let saddle = row
        .saddle()
        .ok_or_else(|| anyhow!("unusable saddle number `{}`", row.saddle_number))?;
    let key = EntryKey::new(race.clone(), saddle);

    let odds = sources.win_odds.get(&saddle).cloned().unwrap_or_default();
    let grade = sources
        .predictions
        .get(&key)
        .copied()
        .unwrap_or_else(|| grade_from_display_odds(&odds));

    let career = sources.careers.get(&row.horse_id).copied().unwrap_or_default();
    let marks = sources
        .marks
        .lookup(&race.date.compact(), &row.horse_name, None)
        .map(|record| record.values.clone())
        .unwrap_or_default();

    let mut entry = primary_only(row);
    entry.saddle_number = saddle.to_string();
    entry.grade = grade.to_string();
    entry.odds = odds;
    entry.win_rate = format_rate(career.stats.win_rate());
    entry.place_rate = format_rate(career.stats.top_three_rate());
    entry.finish_counts = career.finishes.text();
    entry.previous_race = sources
        .previous_races
        .get(&row.horse_id)
        .cloned()
        .unwrap_or_default();
    entry.marks = marks;
    Ok(entry)
}

fn primary_only(row: &EntryRow) -> RaceCardEntry {
    RaceCardEntry {
        post_position: row.post_position.trim().to_string(),
        saddle_number: row.saddle_number.trim().to_string(),
        horse_id: row.horse_id.clone(),
        horse_name: row.horse_name.trim().to_string(),
        jockey: row.jockey.trim().to_string(),
        weight: row.weight.trim().to_string(),
        trainer: row.trainer.trim().to_string(),
        owner: row.owner.trim().to_string(),
        dam_sire: row.dam_sire.trim().to_string(),
        running_style: running_style_name(&row.running_style_code).to_string(),
        ..RaceCardEntry::default()
    }
}

/// Attaches marks to each past start of one horse, matched on the start's date.
pub fn overlay_history_marks(rows: &mut [HistoryRow], index: &MarksIndex, horse_name: &str) {
    if index.is_empty() {
        return;
    }
    for row in rows.iter_mut() {
        if row.source_date.is_empty() {
            continue;
        }
        if let Some(record) = index.lookup(&row.source_date, horse_name, None) {
            row.marks = record.values.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::RaceDate;

    fn race() -> RaceKey {
        let date = RaceDate::parse("20250906").expect("date should parse");
        RaceKey::new(date, "05", "11").expect("race key should build")
    }

    fn entry(saddle: &str, name: &str) -> EntryRow {
        EntryRow {
            horse_id: format!("id-{saddle}"),
            horse_name: name.to_string(),
            saddle_number: saddle.to_string(),
            running_style_code: "2".to_string(),
            ..EntryRow::default()
        }
    }

    fn marks(source_date: &str, horse: &str, mark: &str) -> MarksRecord {
        MarksRecord {
            source_date: source_date.to_string(),
            normalized_horse_name: horse.to_string(),
            race_id: None,
            values: BTreeMap::from([("馬印1".to_string(), mark.to_string())]),
        }
    }

    #[test]
    fn first_insertion_under_a_key_wins() {
        let mut index = AuxiliaryIndex::new();
        assert!(index.insert_first("k", 1));
        assert!(!index.insert_first("k", 2));
        assert_eq!(index.get(&"k"), Some(&1));
        assert_eq!(index.discarded(), 1);
    }

    #[test]
    fn loaded_records_share_alias_keys_without_overwrite() {
        let index = load_auxiliary_index(vec![("a", 1), ("b", 2)], |(name, _)| {
            vec![name.to_string(), "shared".to_string()]
        });
        assert_eq!(index.get(&"shared".to_string()).map(|record| record.1), Some(1));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn marks_match_after_whitespace_normalization() {
        let index = MarksIndex::build(vec![marks("20250906", "テストホース", "◎")], MarksScope::Meeting);
        let hit = index
            .lookup("20250906", "テスト ホース", None)
            .expect("spaced name should match normalized key");
        assert_eq!(hit.values.get("馬印1").map(String::as_str), Some("◎"));
    }

    #[test]
    fn meeting_scope_has_no_date_only_alias() {
        let index = MarksIndex::build(vec![marks("20250906", "アルファ", "◎")], MarksScope::Meeting);
        assert!(index.lookup("20250906", "ベータ", None).is_none());

        let single = MarksIndex::build(vec![marks("20250906", "アルファ", "◎")], MarksScope::SingleHorse);
        assert!(single.lookup("20250906", "アルファ ", None).is_some());
        assert!(single.lookup("20250906", "別名", None).is_some());
    }

    #[test]
    fn marks_lookup_prefers_date_and_name_over_race_id() {
        let mut by_race_id = marks("20250830", "アルファ", "△");
        by_race_id.race_id = Some("R1".to_string());
        let index = MarksIndex::build(
            vec![by_race_id, marks("20250906", "アルファ", "◎")],
            MarksScope::Meeting,
        );

        let hit = index
            .lookup("20250906", "アルファ", Some("R1"))
            .expect("lookup should hit");
        assert_eq!(hit.values.get("馬印1").map(String::as_str), Some("◎"));
        let fallback = index
            .lookup("20250101", "アルファ", Some("R1"))
            .expect("race id alias should hit");
        assert_eq!(fallback.values.get("馬印1").map(String::as_str), Some("△"));
    }

    #[test]
    fn odds_drive_grade_when_no_prediction_exists() {
        let race = race();
        let rows: Vec<EntryRow> = (1..=8).map(|saddle| entry(&format!("{saddle:02}"), "馬")).collect();
        let mut sources = RaceCardSources::default();
        let third = SaddleNumber::new(3).expect("saddle should be valid");
        sources.win_odds.insert_first(third, "3.0".to_string());

        let outcome = merge_race_card(&race, rows, &sources);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.entries.len(), 8);
        let entry = &outcome.entries[2];
        assert_eq!(entry.saddle_number, "3");
        assert_eq!(entry.grade, "S");
        assert_eq!(entry.odds, "3.0");
        assert_eq!(entry.running_style, "先");
        assert_eq!(outcome.entries[0].grade, "E");
        assert_eq!(outcome.entries[0].win_rate, "-");
    }

    #[test]
    fn prediction_overrides_odds_grade() {
        let race = race();
        let saddle = SaddleNumber::new(1).expect("saddle should be valid");
        let mut sources = RaceCardSources::default();
        sources.win_odds.insert_first(saddle, "2.0".to_string());
        sources
            .predictions
            .insert_first(EntryKey::new(race.clone(), saddle), Grade::D);

        let outcome = merge_race_card(&race, vec![entry("1", "馬")], &sources);
        assert_eq!(outcome.entries[0].grade, "D");
    }

    #[test]
    fn bad_row_is_blanked_and_batch_continues() {
        let race = race();
        let mut sources = RaceCardSources::default();
        sources
            .win_odds
            .insert_first(SaddleNumber::new(2).expect("saddle should be valid"), "8.5".to_string());

        let outcome = merge_race_card(&race, vec![entry("", "壊れた行"), entry("02", "正常")], &sources);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].horse_name, "壊れた行");
        assert_eq!(outcome.entries[0].grade, "");
        assert_eq!(outcome.entries[0].odds, "");
        assert_eq!(outcome.entries[1].grade, "B");
    }

    #[test]
    fn history_rows_pick_up_marks_by_start_date() {
        let index = MarksIndex::build(vec![marks("20250830", "アルファ", "○")], MarksScope::SingleHorse);
        let mut rows = vec![
            HistoryRow {
                source_date: "20250830".to_string(),
                ..HistoryRow::default()
            },
            HistoryRow {
                source_date: "20250701".to_string(),
                ..HistoryRow::default()
            },
        ];
        overlay_history_marks(&mut rows, &index, "アルファ");
        assert_eq!(rows[0].marks.get("馬印1").map(String::as_str), Some("○"));
        assert!(rows[1].marks.is_empty());
    }
}
