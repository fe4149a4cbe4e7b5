use crate::derived::FinishPosition;
use crate::derived::odds::parse_prize_hundreds;
use crate::models::{CareerStats, FinishCounts};

impl CareerStats {
    /// Folds one past start into the record. Only placed finishes count.
    pub fn record_start(&mut self, finish: FinishPosition, prize_raw: &str) {
        let Some(position) = finish.position() else {
            return;
        };
        self.starts += 1;
        if position == 1 {
            self.wins += 1;
        }
        if position <= 2 {
            self.top_two += 1;
        }
        if position <= 3 {
            self.top_three += 1;
        }
        self.total_prize_hundreds += parse_prize_hundreds(prize_raw);
    }

    #[must_use]
    pub fn win_rate(&self) -> Option<f64> {
        rate(self.wins, self.starts)
    }

    #[must_use]
    pub fn top_two_rate(&self) -> Option<f64> {
        rate(self.top_two, self.starts)
    }

    #[must_use]
    pub fn top_three_rate(&self) -> Option<f64> {
        rate(self.top_three, self.starts)
    }

    /// `1着-2着-3着-着外`
    #[must_use]
    pub fn record_text(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.wins,
            self.top_two.saturating_sub(self.wins),
            self.top_three.saturating_sub(self.top_two),
            self.starts.saturating_sub(self.top_three)
        )
    }

    #[must_use]
    pub fn total_prize_text(&self) -> String {
        format!("{}万円", group_thousands(self.total_prize_hundreds / 100))
    }
}

impl FinishCounts {
    pub fn record(&mut self, finish: FinishPosition) {
        if let Some(position) = finish.position()
            && (1..=5).contains(&position)
        {
            let slot = usize::try_from(position - 1).unwrap_or(0);
            self.counts[slot] += 1;
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.counts
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("-")
    }
}

fn rate(numerator: u32, denominator: u32) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(f64::from(numerator) * 100.0 / f64::from(denominator))
    }
}

/// `"12.5%"`, or `"-"` when there is nothing to divide by.
#[must_use]
pub fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |value| format!("{value:.1}%"))
}

#[must_use]
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::{format_rate, group_thousands};
    use crate::derived::FinishPosition;
    use crate::models::{CareerStats, FinishCounts};

    #[test]
    fn career_record_splits_cumulative_counts() {
        let mut stats = CareerStats::default();
        for (code, prize) in [
            ("01", "00050000"),
            ("02", "00020000"),
            ("03", "00010000"),
            ("07", ""),
            ("H", "00099999"),
            ("", ""),
        ] {
            stats.record_start(FinishPosition::classify(code), prize);
        }

        assert_eq!(stats.starts, 4);
        assert_eq!(stats.record_text(), "1-1-1-1");
        assert_eq!(format_rate(stats.win_rate()), "25.0%");
        assert_eq!(format_rate(stats.top_two_rate()), "50.0%");
        assert_eq!(format_rate(stats.top_three_rate()), "75.0%");
        assert_eq!(stats.total_prize_text(), "800万円");
    }

    #[test]
    fn rates_without_starts_show_dash() {
        assert_eq!(format_rate(CareerStats::default().win_rate()), "-");
    }

    #[test]
    fn finish_counts_track_first_five_places() {
        let mut counts = FinishCounts::default();
        for code in ["01", "01", "03", "05", "06", "K"] {
            counts.record(FinishPosition::classify(code));
        }
        assert_eq!(counts.text(), "2-0-1-0-1");
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(12_345), "12,345");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-1_000), "-1,000");
    }
}
