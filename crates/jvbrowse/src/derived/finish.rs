use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

/// Classified finishing position (`KakuteiJyuni`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishPosition {
    Placed(u32),
    /// `H`: scratched before the start.
    Withdrawn,
    /// `K`: excluded by the stewards.
    Excluded,
    /// `A`-`D`: disqualified or demoted.
    Disqualified,
    Unknown,
}

impl FinishPosition {
    #[must_use]
    pub fn classify(code: &str) -> Self {
        let trimmed = code.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return match trimmed.parse::<u32>() {
                Ok(0) | Err(_) => Self::Unknown,
                Ok(position) => Self::Placed(position),
            };
        }
        match trimmed {
            "H" => Self::Withdrawn,
            "K" => Self::Excluded,
            "A" | "B" | "C" | "D" => Self::Disqualified,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn position(self) -> Option<u32> {
        match self {
            Self::Placed(position) => Some(position),
            _ => None,
        }
    }
}

impl Display for FinishPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed(position) => write!(f, "{position}着"),
            Self::Withdrawn => f.write_str("取消"),
            Self::Excluded => f.write_str("除外"),
            Self::Disqualified => f.write_str("失格"),
            Self::Unknown => f.write_str("-"),
        }
    }
}

impl Serialize for FinishPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
