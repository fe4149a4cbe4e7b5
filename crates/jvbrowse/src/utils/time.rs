use std::time::{SystemTime, UNIX_EPOCH};

use time::{Date, OffsetDateTime, UtcOffset};

const NANOS_PER_MILLI: i128 = 1_000_000;

#[must_use]
pub fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
        })
}

#[must_use]
pub fn format_unix_ms(timestamp_unix_ms: u64) -> String {
    let nanos = i128::from(timestamp_unix_ms)
        .checked_mul(NANOS_PER_MILLI)
        .unwrap_or(i128::MAX);
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    )
}

/// Local wall-clock time; falls back to UTC when the local offset cannot be determined.
#[must_use]
pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[must_use]
pub fn today_local() -> Date {
    now_local().date()
}

/// `YYYY-MM-DD HH:MM:SS`
#[must_use]
pub fn format_local_datetime(dt: OffsetDateTime) -> String {
    format!("{} {}", format_local_date(dt), format_local_time(dt))
}

/// `YYYY-MM-DD`
#[must_use]
pub fn format_local_date(dt: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        dt.year(),
        u8::from(dt.month()),
        dt.day()
    )
}

/// `HH:MM:SS`
#[must_use]
pub fn format_local_time(dt: OffsetDateTime) -> String {
    format!("{:02}:{:02}:{:02}", dt.hour(), dt.minute(), dt.second())
}

#[cfg(test)]
mod tests {
    use super::{format_local_datetime, format_unix_ms};
    use time::OffsetDateTime;

    #[test]
    fn formats_unix_ms_as_utc_iso() {
        assert_eq!(format_unix_ms(1_771_977_600_123), "2026-02-25T00:00:00.123Z");
    }

    #[test]
    fn formats_local_datetime_with_space_separator() {
        let dt = OffsetDateTime::from_unix_timestamp(1_757_116_800).expect("timestamp should convert");
        assert_eq!(format_local_datetime(dt), "2025-09-06 00:00:00");
    }
}
