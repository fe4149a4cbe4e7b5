use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

/// Calendar day of a meeting, stored the JRA-VAN way as `Year` + `MonthDay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RaceDate {
    date: Date,
}

impl RaceDate {
    /// Parses `YYYYMMDD`, `YYYY-MM-DD` or `YYYY/MM/DD`.
    pub fn parse(raw: &str) -> Result<Self> {
        let digits: String = raw
            .trim()
            .chars()
            .filter(|ch| *ch != '-' && *ch != '/')
            .collect();
        if digits.len() != 8 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            bail!("race date must be YYYYMMDD or YYYY-MM-DD: `{raw}`");
        }
        Self::from_parts(&digits[..4], &digits[4..])
    }

    pub fn from_parts(year: &str, month_day: &str) -> Result<Self> {
        let year = year.trim();
        let month_day = month_day.trim();
        let is_four_digits = |part: &str| part.len() == 4 && part.chars().all(|ch| ch.is_ascii_digit());
        if !is_four_digits(year) || !is_four_digits(month_day) {
            bail!("race date parts must be 4 digits each: `{year}` `{month_day}`");
        }
        let year_value: i32 = year
            .parse()
            .with_context(|| format!("invalid race year `{year}`"))?;
        let month_value: u8 = month_day[..2]
            .parse()
            .with_context(|| format!("invalid race month in `{month_day}`"))?;
        let day_value: u8 = month_day[2..]
            .parse()
            .with_context(|| format!("invalid race day in `{month_day}`"))?;
        let month = Month::try_from(month_value)
            .with_context(|| format!("invalid race month in `{month_day}`"))?;
        let date = Date::from_calendar_date(year_value, month, day_value)
            .with_context(|| format!("invalid race date `{year}{month_day}`"))?;
        Ok(Self { date })
    }

    #[must_use]
    pub const fn from_date(date: Date) -> Self {
        Self { date }
    }

    #[must_use]
    pub const fn date(self) -> Date {
        self.date
    }

    #[must_use]
    pub fn year(self) -> String {
        format!("{:04}", self.date.year())
    }

    #[must_use]
    pub fn month_day(self) -> String {
        format!("{:02}{:02}", u8::from(self.date.month()), self.date.day())
    }

    /// `YYYYMMDD`, the form used for `SourceDate` in the marks store.
    #[must_use]
    pub fn compact(self) -> String {
        format!("{}{}", self.year(), self.month_day())
    }

    #[must_use]
    pub fn iso(self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.date.year(),
            u8::from(self.date.month()),
            self.date.day()
        )
    }

    #[must_use]
    pub fn next_day(self) -> Option<Self> {
        self.date.next_day().map(Self::from_date)
    }
}

impl Display for RaceDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso())
    }
}

impl Serialize for RaceDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.iso())
    }
}

/// Identifies one race. Venue and race number are held canonically so that
/// `"5"`/`"05"` and `"1"`/`"01"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RaceKey {
    pub date: RaceDate,
    pub venue_code: String,
    pub race_number: u8,
}

impl RaceKey {
    pub fn new(date: RaceDate, venue_code: &str, race_number: &str) -> Result<Self> {
        Ok(Self {
            date,
            venue_code: canonical_venue_code(venue_code)?,
            race_number: parse_race_number(race_number)?,
        })
    }

    pub fn from_columns(year: &str, month_day: &str, venue_code: &str, race_number: &str) -> Result<Self> {
        Self::new(RaceDate::from_parts(year, month_day)?, venue_code, race_number)
    }

    #[must_use]
    pub fn year(&self) -> String {
        self.date.year()
    }

    #[must_use]
    pub fn month_day(&self) -> String {
        self.date.month_day()
    }

    /// Numeric venue for padding-insensitive comparisons against `JyoCD`.
    #[must_use]
    pub fn venue_number(&self) -> u8 {
        self.venue_code.parse().unwrap_or(0)
    }
}

impl Display for RaceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}R",
            self.date.compact(),
            self.venue_code,
            self.race_number
        )
    }
}

fn canonical_venue_code(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        bail!("venue code must be 1-2 digits: `{raw}`");
    }
    Ok(format!("{trimmed:0>2}"))
}

fn parse_race_number(raw: &str) -> Result<u8> {
    let trimmed = raw.trim();
    let value: u8 = trimmed
        .parse()
        .with_context(|| format!("race number must be numeric: `{raw}`"))?;
    if value == 0 {
        bail!("race number must be positive: `{raw}`");
    }
    Ok(value)
}

/// A horse's running number within one race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SaddleNumber(u8);

impl SaddleNumber {
    /// Accepts padded or unpadded digits; blanks and zero are not saddle numbers.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        match trimmed.parse::<u8>() {
            Ok(0) | Err(_) => None,
            Ok(value) => Some(Self(value)),
        }
    }

    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn padded(self) -> String {
        format!("{:02}", self.0)
    }
}

impl Display for SaddleNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Join key shared by the entry table, the odds tables and the predictions store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryKey {
    pub race: RaceKey,
    pub saddle: SaddleNumber,
}

impl EntryKey {
    #[must_use]
    pub const fn new(race: RaceKey, saddle: SaddleNumber) -> Self {
        Self { race, saddle }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "S" => Some(Self::S),
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "E" => Some(Self::E),
            _ => None,
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One horse's row as read from the primary entry table, before any merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryRow {
    pub horse_id: String,
    pub horse_name: String,
    pub jockey: String,
    pub weight: String,
    pub post_position: String,
    pub saddle_number: String,
    pub trainer: String,
    pub owner: String,
    pub dam_sire: String,
    pub running_style_code: String,
}

impl EntryRow {
    #[must_use]
    pub fn saddle(&self) -> Option<SaddleNumber> {
        SaddleNumber::parse(&self.saddle_number)
    }
}

/// Display-ready race-card row: primary fields plus everything merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RaceCardEntry {
    pub post_position: String,
    pub saddle_number: String,
    pub grade: String,
    pub horse_id: String,
    pub horse_name: String,
    pub jockey: String,
    pub weight: String,
    pub odds: String,
    pub win_rate: String,
    pub place_rate: String,
    pub trainer: String,
    pub owner: String,
    pub dam_sire: String,
    pub running_style: String,
    pub previous_race: String,
    pub finish_counts: String,
    pub marks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceListing {
    pub key: RaceKey,
    pub name: String,
    pub post_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meeting {
    pub venue_code: String,
    pub venue_name: String,
    pub races: Vec<RaceListing>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RaceSummary {
    pub name: String,
    pub distance: String,
    pub track_code: String,
    pub class_code: String,
    pub post_time: String,
    pub kaiji: String,
    pub nichiji: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_key_canonicalizes_padding() {
        let date = RaceDate::parse("20250906").expect("date should parse");
        let padded = RaceKey::new(date, "05", "01").expect("key should build");
        let unpadded = RaceKey::new(date, "5", "1").expect("key should build");

        assert_eq!(padded, unpadded);
        assert_eq!(padded.venue_code, "05");
        assert_eq!(padded.race_number, 1);
    }

    #[test]
    fn race_key_rejects_malformed_parts() {
        let date = RaceDate::parse("2025-09-06").expect("date should parse");
        assert!(RaceKey::new(date, "123", "1").is_err());
        assert!(RaceKey::new(date, "05", "0").is_err());
        assert!(RaceKey::new(date, "05", "x").is_err());
        assert!(RaceDate::parse("2025096").is_err());
        assert!(RaceDate::parse("20250231").is_err());
    }

    #[test]
    fn full_width_date_parts_are_rejected_not_sliced() {
        assert!(RaceDate::from_parts("2025", "０9").is_err());
        assert!(RaceDate::from_parts("２０2", "0906").is_err());
        assert!(RaceDate::from_parts("2025", "09０").is_err());
    }

    #[test]
    fn race_date_renders_storage_and_iso_forms() {
        let date = RaceDate::parse("2025/09/06").expect("date should parse");
        assert_eq!(date.year(), "2025");
        assert_eq!(date.month_day(), "0906");
        assert_eq!(date.compact(), "20250906");
        assert_eq!(date.iso(), "2025-09-06");
    }

    #[test]
    fn saddle_numbers_collide_only_on_value() {
        assert_eq!(SaddleNumber::parse("03"), SaddleNumber::parse(" 3"));
        assert_ne!(SaddleNumber::parse("13"), SaddleNumber::parse("3"));
        assert_eq!(SaddleNumber::parse("00"), None);
        assert_eq!(SaddleNumber::parse(""), None);
        assert_eq!(SaddleNumber::parse("3a"), None);
        assert_eq!(
            SaddleNumber::parse("7").map(SaddleNumber::padded).as_deref(),
            Some("07")
        );
    }

    #[test]
    fn grade_parse_is_case_insensitive() {
        assert_eq!(Grade::parse(" s "), Some(Grade::S));
        assert_eq!(Grade::parse("e"), Some(Grade::E));
        assert_eq!(Grade::parse("X"), None);
    }
}
