//! Odds and prize-money normalization.
//!
//! JRA-VAN stores odds as tenths without a decimal point (`"030"` is 3.0) and
//! prize money in hundreds of yen. All-zero strings are "no value" placeholders.

use crate::models::Grade;

const ODDS_PLACEHOLDER: &str = "-";
const PRIZE_PLACEHOLDER: &str = "0";

fn is_digits(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|ch| ch.is_ascii_digit())
}

fn is_placeholder(raw: &str) -> bool {
    is_digits(raw) && raw.chars().all(|ch| ch == '0')
}

/// Parses a tenths-encoded odds field into its integer value; zero is not a price.
#[must_use]
pub fn parse_tenths(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if !is_digits(trimmed) {
        return None;
    }
    trimmed.parse::<u32>().ok().filter(|value| *value > 0)
}

/// Race-card win odds: always one decimal place (`"030"` -> `"3.0"`).
#[must_use]
pub fn format_win_odds(raw: &str) -> Option<String> {
    parse_tenths(raw).map(|tenths| format!("{}.{}", tenths / 10, tenths % 10))
}

/// Whole number when integral, one decimal otherwise (`"125"` -> `"12.5"`, `"30"` -> `"3"`).
///
/// Values that already carry a decimal point are reformatted rather than divided.
/// Blank input stays blank, all-zero placeholders become `"-"`, anything else
/// unparseable is returned trimmed.
#[must_use]
pub fn normalize_tenths(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if is_placeholder(trimmed) {
        return ODDS_PLACEHOLDER.to_string();
    }
    if let Some(tenths) = parse_tenths(trimmed) {
        return format_tenths_compact(tenths);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => format_decimal_compact(value),
        _ => trimmed.to_string(),
    }
}

fn format_tenths_compact(tenths: u32) -> String {
    if tenths % 10 == 0 {
        format!("{}", tenths / 10)
    } else {
        format!("{}.{}", tenths / 10, tenths % 10)
    }
}

fn format_decimal_compact(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// Race-history odds: placeholder or blank shows `"-"`.
#[must_use]
pub fn format_history_odds(raw: &str) -> String {
    let normalized = normalize_tenths(raw);
    if normalized.is_empty() {
        ODDS_PLACEHOLDER.to_string()
    } else {
        normalized
    }
}

/// Prize in hundreds of yen rendered as whole 万 (`"00012000"` -> `"120万"`).
#[must_use]
pub fn format_prize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return PRIZE_PLACEHOLDER.to_string();
    }
    match trimmed.parse::<u64>() {
        Ok(hundreds) if is_digits(trimmed) => format!("{}万", hundreds / 100),
        _ => trimmed.to_string(),
    }
}

#[must_use]
pub fn parse_prize_hundreds(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if is_digits(trimmed) {
        trimmed.parse::<i64>().unwrap_or(0)
    } else {
        0
    }
}

/// Popularity rank; `"00"` and blank mean not recorded.
#[must_use]
pub fn format_popularity(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        ODDS_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Heuristic grade used only when no prediction exists for the entry.
#[must_use]
pub fn grade_from_odds(odds: f64) -> Grade {
    if odds <= 3.0 {
        Grade::S
    } else if odds <= 5.0 {
        Grade::A
    } else if odds <= 10.0 {
        Grade::B
    } else {
        Grade::C
    }
}

/// Grade for a displayed odds string; unparseable or missing odds fall to `E`.
#[must_use]
pub fn grade_from_display_odds(display: &str) -> Grade {
    match display.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => grade_from_odds(value),
        _ => Grade::E,
    }
}
