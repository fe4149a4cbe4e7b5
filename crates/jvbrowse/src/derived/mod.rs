//! Display-only values derived from raw stored codes. Everything here is pure.

pub mod age;
pub mod codes;
pub mod finish;
pub mod odds;
pub mod stats;

pub use age::{Age, UNKNOWN_AGE, compute_age};
pub use finish::FinishPosition;
pub use stats::{format_rate, group_thousands};

/// Strips every whitespace character, including full-width spaces.
#[must_use]
pub fn normalize_horse_name(name: &str) -> String {
    name.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// First non-blank of `primary` and `secondary`, trimmed, else `fallback`.
#[must_use]
pub fn choose_preferred(primary: Option<&str>, secondary: Option<&str>, fallback: &str) -> String {
    [primary, secondary]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// `"1545"` or `"15:45"` -> `"15：45"`; other shapes pass through.
#[must_use]
pub fn format_post_time(raw: &str) -> String {
    let compact: String = raw.trim().chars().filter(|ch| *ch != ':').collect();
    if compact.chars().count() >= 4 && compact.is_ascii() {
        format!("{}：{}", &compact[..2], &compact[2..4])
    } else {
        raw.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{choose_preferred, format_post_time, normalize_horse_name};

    #[test]
    fn horse_names_lose_all_whitespace() {
        assert_eq!(normalize_horse_name("テスト ホース"), "テストホース");
        assert_eq!(normalize_horse_name(" テスト\u{3000}ホース\t"), "テストホース");
    }

    #[test]
    fn preferred_name_skips_blanks() {
        assert_eq!(choose_preferred(Some("  "), Some(" ディープ "), "不明"), "ディープ");
        assert_eq!(choose_preferred(None, None, "不明"), "不明");
    }

    #[test]
    fn post_time_uses_full_width_colon() {
        assert_eq!(format_post_time("1545"), "15：45");
        assert_eq!(format_post_time("09:50"), "09：50");
        assert_eq!(format_post_time(""), "");
    }
}
