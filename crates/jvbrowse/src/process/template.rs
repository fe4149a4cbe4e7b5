use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::models::RaceDate;
use crate::utils::time::unix_timestamp_millis;

fn kaisai_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?s)(<KaisaiDateTime>)(.*?)(</KaisaiDateTime>)")
            .expect("kaisai date regex should compile")
    })
}

/// Rewrites every `<KaisaiDateTime>` value to midnight JST on `date`.
#[must_use]
pub fn render_settings_template(template: &str, date: RaceDate) -> String {
    let value = format!("{}T00:00:00+09:00", date.iso());
    kaisai_regex()
        .replace_all(template, |captures: &regex::Captures<'_>| {
            format!("{}{value}{}", &captures[1], &captures[3])
        })
        .into_owned()
}

/// Renders `template_path` for `date` into a fresh file under `output_dir`.
pub fn write_rendered_settings(
    template_path: &Path,
    date: RaceDate,
    label: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let template = std::fs::read_to_string(template_path)
        .with_context(|| format!("failed to read settings template: {}", template_path.display()))?;
    let rendered = render_settings_template(&template, date);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let path = output_dir.join(format!(
        "jv_template_{label}_{}_{}.xml",
        date.compact(),
        unix_timestamp_millis()
    ));
    std::fs::write(&path, rendered)
        .with_context(|| format!("failed to write rendered settings: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn every_kaisai_value_is_replaced() {
        let template = "<Settings>\n  <KaisaiDateTime>2024-01-01T00:00:00+09:00</KaisaiDateTime>\n  <Other>x</Other>\n  <KaisaiDateTime></KaisaiDateTime>\n</Settings>";
        let date = RaceDate::parse("20250906").expect("date should parse");

        assert_snapshot!(render_settings_template(template, date), @r"
        <Settings>
          <KaisaiDateTime>2025-09-06T00:00:00+09:00</KaisaiDateTime>
          <Other>x</Other>
          <KaisaiDateTime>2025-09-06T00:00:00+09:00</KaisaiDateTime>
        </Settings>
        ");
    }

    #[test]
    fn template_without_tag_is_unchanged() {
        let date = RaceDate::parse("20250906").expect("date should parse");
        assert_eq!(render_settings_template("<Settings/>", date), "<Settings/>");
    }
}
