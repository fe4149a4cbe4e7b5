use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};
use time::{Date, Month};

pub const UNKNOWN_AGE: &str = "不明";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Age {
    Known(u32),
    Unknown,
}

impl Display for Age {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(years) => write!(f, "{years}"),
            Self::Unknown => f.write_str(UNKNOWN_AGE),
        }
    }
}

impl Serialize for Age {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Age in full years from a `YYYYMMDD` birth date, as of `today`.
///
/// Anything but eight digits forming a real calendar date, or a birth date
/// after `today`, yields [`Age::Unknown`].
#[must_use]
pub fn compute_age(birth_date: &str, today: Date) -> Age {
    let Some(birth) = parse_birth_date(birth_date) else {
        return Age::Unknown;
    };
    if birth > today {
        return Age::Unknown;
    }

    let mut years = today.year() - birth.year();
    if (u8::from(today.month()), today.day()) < (u8::from(birth.month()), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).map_or(Age::Unknown, Age::Known)
}

fn parse_birth_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    if trimmed.len() != 8 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let year: i32 = trimmed[..4].parse().ok()?;
    let month: u8 = trimmed[4..6].parse().ok()?;
    let day: u8 = trimmed[6..].parse().ok()?;
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
