//! Fixed code tables for JRA-VAN display values.
//!
//! Every lookup falls back to the trimmed input when the code is unknown, so a
//! new code issued upstream shows up raw instead of breaking the row.

const VENUES: &[(&str, &str)] = &[
    ("01", "札幌"),
    ("02", "函館"),
    ("03", "福島"),
    ("04", "新潟"),
    ("05", "東京"),
    ("06", "中山"),
    ("07", "中京"),
    ("08", "京都"),
    ("09", "阪神"),
    ("10", "小倉"),
    ("30", "門別"),
    ("31", "盛岡"),
    ("32", "水沢"),
    ("33", "浦和"),
    ("34", "船橋"),
    ("35", "大井"),
    ("36", "川崎"),
    ("37", "金沢"),
    ("38", "笠松"),
    ("39", "名古屋"),
    ("40", "園田"),
    ("41", "姫路"),
    ("42", "高知"),
    ("43", "佐賀"),
];

const COAT_COLORS: &[(&str, &str)] = &[
    ("01", "栗毛"),
    ("02", "栃栗毛"),
    ("03", "鹿毛"),
    ("04", "黒鹿毛"),
    ("05", "青鹿毛"),
    ("06", "青毛"),
    ("07", "芦毛"),
    ("08", "栗栗毛"),
    ("09", "白毛"),
];

const BREEDS: &[(&str, &str)] = &[
    ("1", "サラブレッド"),
    ("2", "アングロアラブ"),
    ("3", "アラブ"),
    ("4", "中半血"),
    ("5", "軽半血"),
    ("6", "重半血"),
];

const SEXES: &[(&str, &str)] = &[("1", "牡"), ("2", "牝"), ("3", "騸")];

const TRACKS: &[(&str, &str)] = &[
    ("11", "芝・右"),
    ("12", "芝・左"),
    ("13", "芝・直"),
    ("17", "芝・外"),
    ("18", "芝・内"),
    ("21", "ダ・右"),
    ("22", "ダ・左"),
    ("23", "ダ・直"),
    ("24", "ダ・外"),
    ("25", "ダ・内"),
    ("51", "障芝"),
    ("52", "障ダ"),
    ("53", "障芝ダ"),
    ("54", "障ダ芝"),
];

const GROUND_CONDITIONS: &[(&str, &str)] = &[
    ("1", "良"),
    ("2", "稍重"),
    ("3", "重"),
    ("4", "不良"),
    ("good", "良"),
    ("yielding", "稍重"),
    ("soft", "重"),
    ("heavy", "不良"),
];

const RUNNING_STYLES: &[(&str, &str)] = &[("1", "逃"), ("2", "先"), ("3", "差"), ("4", "追")];

fn lookup<'a>(table: &[(&str, &'static str)], code: &'a str) -> &'a str {
    let trimmed = code.trim();
    table
        .iter()
        .find(|(key, _)| *key == trimmed)
        .map_or(trimmed, |(_, label)| *label)
}

/// Two-digit codes are sometimes stored unpadded ("5" for Tokyo).
fn lookup_two_digit<'a>(table: &[(&str, &'static str)], code: &'a str) -> &'a str {
    let trimmed = code.trim();
    if trimmed.len() == 1 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        let padded = format!("0{trimmed}");
        if let Some((_, label)) = table.iter().find(|(key, _)| *key == padded) {
            return *label;
        }
    }
    lookup(table, trimmed)
}

#[must_use]
pub fn venue_name(code: &str) -> &str {
    lookup_two_digit(VENUES, code)
}

#[must_use]
pub fn coat_color_name(code: &str) -> &str {
    lookup_two_digit(COAT_COLORS, code)
}

#[must_use]
pub fn breed_name(code: &str) -> &str {
    lookup(BREEDS, code)
}

#[must_use]
pub fn sex_name(code: &str) -> &str {
    lookup(SEXES, code)
}

#[must_use]
pub fn track_name(code: &str) -> &str {
    lookup(TRACKS, code)
}

/// Accepts numeric JV codes, English labels, and Japanese labels (which pass through).
#[must_use]
pub fn ground_condition_name(code: &str) -> &str {
    let trimmed = code.trim();
    let lowered = trimmed.to_ascii_lowercase();
    GROUND_CONDITIONS
        .iter()
        .find(|(key, _)| *key == lowered)
        .map_or(trimmed, |(_, label)| *label)
}

#[must_use]
pub fn running_style_name(code: &str) -> &str {
    lookup(RUNNING_STYLES, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_codes_cover_central_and_local_tracks() {
        assert_eq!(venue_name("05"), "東京");
        assert_eq!(venue_name("5"), "東京");
        assert_eq!(venue_name("43"), "佐賀");
        assert_eq!(venue_name("99"), "99");
    }

    #[test]
    fn unknown_codes_pass_through_trimmed() {
        assert_eq!(coat_color_name(" 10 "), "10");
        assert_eq!(breed_name("7"), "7");
        assert_eq!(sex_name(""), "");
        assert_eq!(track_name("99"), "99");
        assert_eq!(running_style_name("9"), "9");
    }

    #[test]
    fn ground_condition_accepts_all_three_vocabularies() {
        assert_eq!(ground_condition_name("2"), "稍重");
        assert_eq!(ground_condition_name("Heavy"), "不良");
        assert_eq!(ground_condition_name("重"), "重");
    }

    #[test]
    fn fixed_tables_map_known_codes() {
        assert_eq!(coat_color_name("04"), "黒鹿毛");
        assert_eq!(breed_name("1"), "サラブレッド");
        assert_eq!(sex_name("3"), "騸");
        assert_eq!(track_name("24"), "ダ・外");
        assert_eq!(running_style_name("2"), "先");
    }
}
