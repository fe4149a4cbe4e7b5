use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HorseProfile {
    pub horse_id: String,
    pub name: String,
    pub sex: String,
    pub birth_date: String,
    pub age: String,
    pub coat_color: String,
    pub breed: String,
    pub trainer: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bloodline {
    pub sire: String,
    pub dam: String,
    pub dam_sire: String,
}

/// One past start of a horse, already rendered for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub race_date: String,
    pub venue: String,
    pub race: String,
    pub race_name: String,
    pub finish: String,
    pub popularity: String,
    pub odds: String,
    pub prize: String,
    pub jockey: String,
    pub weight: String,
    pub track: String,
    pub distance: String,
    pub ground_condition: String,
    pub field_size: String,
    pub race_time: String,
    pub time_difference: String,
    pub last_three_furlongs: String,
    pub corner_positions: String,
    pub marks: BTreeMap<String, String>,
    #[serde(skip)]
    pub source_date: String,
}

/// Aggregate record over completed starts (scratches and disqualifications excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CareerStats {
    pub starts: u32,
    pub wins: u32,
    pub top_two: u32,
    pub top_three: u32,
    pub total_prize_hundreds: i64,
}

/// Finishing-position tallies for 1st through 5th.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FinishCounts {
    pub counts: [u32; 5],
}

/// One row of the marks store, with values keyed by their display label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarksRecord {
    pub source_date: String,
    pub normalized_horse_name: String,
    pub race_id: Option<String>,
    pub values: BTreeMap<String, String>,
}
