//! Runtime column discovery.
//!
//! JRA-VAN exports differ between tool vintages: the same field can be called
//! `Bamei`, `UmaName` or `馬名`. Queries are therefore built from candidate
//! lists resolved against the live schema instead of hard-coded column names.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rusqlite::Connection;

use crate::sqlite::{quote_identifier, sqlite_single_quoted};

/// Column names of one table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns {
    names: Vec<String>,
}

impl TableColumns {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        let wanted = column.to_lowercase();
        self.names.iter().any(|name| name.to_lowercase() == wanted)
    }

    /// Lower-cased names, for case-insensitive set comparisons.
    #[must_use]
    pub fn column_set(&self) -> BTreeSet<String> {
        self.names.iter().map(|name| name.to_lowercase()).collect()
    }
}

/// Schema metadata source injected into query builders.
pub trait SchemaProbe {
    /// Columns of `table`; empty when the table is missing or cannot be read.
    fn probe_columns(&self, table: &str) -> TableColumns;

    fn table_exists(&self, table: &str) -> bool;

    fn has_column(&self, table: &str, column: &str) -> bool {
        self.probe_columns(table).contains(column)
    }
}

/// [`SchemaProbe`] over a SQLite connection, reading each table's schema at most once.
pub struct SqliteSchemaProbe<'conn> {
    connection: &'conn Connection,
    schema: Option<String>,
    columns: RefCell<BTreeMap<String, TableColumns>>,
}

impl<'conn> SqliteSchemaProbe<'conn> {
    #[must_use]
    pub fn new(connection: &'conn Connection) -> Self {
        Self {
            connection,
            schema: None,
            columns: RefCell::new(BTreeMap::new()),
        }
    }

    /// Probes tables of an attached database instead of `main`.
    #[must_use]
    pub fn for_schema(connection: &'conn Connection, schema: &str) -> Self {
        Self {
            connection,
            schema: Some(schema.to_string()),
            columns: RefCell::new(BTreeMap::new()),
        }
    }

    fn read_columns(&self, table: &str) -> rusqlite::Result<Vec<String>> {
        let pragma = match &self.schema {
            Some(schema) => format!(
                "PRAGMA {}.table_info({})",
                quote_identifier(schema),
                sqlite_single_quoted(table)
            ),
            None => format!("PRAGMA table_info({})", sqlite_single_quoted(table)),
        };
        let mut statement = self.connection.prepare(&pragma)?;
        let rows = statement.query_map([], |row| row.get::<usize, String>(1))?;
        rows.collect()
    }

    fn master_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.sqlite_master", quote_identifier(schema)),
            None => "sqlite_master".to_string(),
        }
    }
}

impl SchemaProbe for SqliteSchemaProbe<'_> {
    fn probe_columns(&self, table: &str) -> TableColumns {
        let cache_key = table.to_lowercase();
        if let Some(cached) = self.columns.borrow().get(&cache_key) {
            return cached.clone();
        }

        let columns = match self.read_columns(table) {
            Ok(names) => TableColumns::new(names),
            Err(error) => {
                debug!("column probe failed for `{table}`: {error}");
                TableColumns::default()
            }
        };
        self.columns
            .borrow_mut()
            .insert(cache_key, columns.clone());
        columns
    }

    fn table_exists(&self, table: &str) -> bool {
        let sql = format!(
            "SELECT 1 FROM {} WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE LIMIT 1",
            self.master_table()
        );
        self.connection
            .query_row(&sql, [table], |_| Ok(()))
            .is_ok()
    }
}

/// One candidate column and whether the probed schema has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPresence {
    pub name: String,
    pub present: bool,
}

impl ColumnPresence {
    #[must_use]
    pub fn new(name: impl Into<String>, present: bool) -> Self {
        Self {
            name: name.into(),
            present,
        }
    }
}

/// Projection over the present candidates, in the order given.
///
/// No candidate present gives `NULL`, one gives a bare column reference, more
/// give `COALESCE(...)` so the leftmost non-null value wins per row.
#[must_use]
pub fn coalesce_expression(qualifier: Option<&str>, candidates: &[ColumnPresence]) -> String {
    let present: Vec<String> = candidates
        .iter()
        .filter(|candidate| candidate.present)
        .map(|candidate| qualified_column(qualifier, &candidate.name))
        .collect();

    match present.as_slice() {
        [] => "NULL".to_string(),
        [single] => single.clone(),
        many => format!("COALESCE({})", many.join(", ")),
    }
}

/// Resolves `candidates` against `table` and builds the projection.
#[must_use]
pub fn build_coalesce_expression(
    probe: &dyn SchemaProbe,
    table: &str,
    qualifier: Option<&str>,
    candidates: &[&str],
) -> String {
    let columns = probe.probe_columns(table);
    let presence: Vec<ColumnPresence> = candidates
        .iter()
        .map(|candidate| ColumnPresence::new(*candidate, columns.contains(candidate)))
        .collect();
    coalesce_expression(qualifier, &presence)
}

/// First candidate present in `table`, as the caller spelled it.
#[must_use]
pub fn first_present_column<'a>(
    probe: &dyn SchemaProbe,
    table: &str,
    candidates: &[&'a str],
) -> Option<&'a str> {
    let columns = probe.probe_columns(table);
    candidates
        .iter()
        .copied()
        .find(|candidate| columns.contains(candidate))
}

const RACE_NAME_FALLBACKS: &[&str] = &["RaceName", "RaceNameJ", "Racename", "レース名"];

/// Race title: `Hondai` joined with `Fukudai` when both exist, then the
/// alternate title columns, then the race number as text.
#[must_use]
pub fn race_name_expression(probe: &dyn SchemaProbe, table: &str, qualifier: Option<&str>) -> String {
    let columns = probe.probe_columns(table);
    let has_main = columns.contains("Hondai");
    let has_sub = columns.contains("Fukudai");

    if has_main && has_sub {
        let main = qualified_column(qualifier, "Hondai");
        let sub = qualified_column(qualifier, "Fukudai");
        return format!("COALESCE({main} || ' ' || {sub}, {main})");
    }
    if has_main {
        return qualified_column(qualifier, "Hondai");
    }
    if let Some(column) = RACE_NAME_FALLBACKS
        .iter()
        .find(|candidate| columns.contains(candidate))
    {
        return qualified_column(qualifier, column);
    }
    format!("CAST({} AS TEXT)", qualified_column(qualifier, "RaceNum"))
}

fn qualified_column(qualifier: Option<&str>, column: &str) -> String {
    match qualifier {
        Some(alias) if !alias.is_empty() => format!("{alias}.{}", quote_identifier(column)),
        _ => quote_identifier(column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    struct FixedProbe(BTreeMap<&'static str, Vec<&'static str>>);

    impl SchemaProbe for FixedProbe {
        fn probe_columns(&self, table: &str) -> TableColumns {
            self.0
                .get(table)
                .map(|names| TableColumns::new(names.iter().map(ToString::to_string).collect()))
                .unwrap_or_default()
        }

        fn table_exists(&self, table: &str) -> bool {
            self.0.contains_key(table)
        }
    }

    fn probe(table: &'static str, columns: &[&'static str]) -> FixedProbe {
        FixedProbe(BTreeMap::from([(table, columns.to_vec())]))
    }

    #[test]
    fn no_present_candidate_yields_null_marker() {
        let candidates = [
            ColumnPresence::new("Umaban", false),
            ColumnPresence::new("UMABAN", false),
        ];
        assert_eq!(coalesce_expression(Some("U"), &candidates), "NULL");
        assert_eq!(coalesce_expression(None, &[]), "NULL");
    }

    #[test]
    fn single_present_candidate_is_bare_reference() {
        let candidates = [
            ColumnPresence::new("Bamei", false),
            ColumnPresence::new("UmaName", true),
        ];
        assert_eq!(coalesce_expression(Some("U"), &candidates), "U.UmaName");
        assert_eq!(coalesce_expression(None, &candidates), "UmaName");
    }

    #[test]
    fn several_present_candidates_keep_caller_priority() {
        let probe = probe("N_UMA_RACE", &["KisyuName", "騎手", "kisyuryakusyo"]);
        let expression = build_coalesce_expression(
            &probe,
            "N_UMA_RACE",
            Some("U"),
            &["KisyuRyakusyo", "KisyuName", "KisyuNM", "騎手名", "騎手"],
        );
        assert_snapshot!(expression, @r#"COALESCE(U.KisyuRyakusyo, U.KisyuName, U."騎手")"#);
    }

    #[test]
    fn missing_table_degrades_to_null() {
        let probe = probe("N_RACE", &["Kyori"]);
        assert_eq!(
            build_coalesce_expression(&probe, "N_UMA", Some("UM"), &["Ketto3InfoBamei2"]),
            "NULL"
        );
        assert!(!probe.has_column("N_UMA", "Ketto3InfoBamei2"));
    }

    #[test]
    fn race_name_prefers_joined_titles() {
        let joined = probe("N_RACE", &["Hondai", "Fukudai", "RaceName"]);
        assert_snapshot!(
            race_name_expression(&joined, "N_RACE", None),
            @"COALESCE(Hondai || ' ' || Fukudai, Hondai)"
        );

        let alternate = probe("N_RACE", &["RaceNameJ"]);
        assert_eq!(race_name_expression(&alternate, "N_RACE", Some("R")), "R.RaceNameJ");

        let bare = probe("N_RACE", &["RaceNum"]);
        assert_eq!(race_name_expression(&bare, "N_RACE", None), "CAST(RaceNum AS TEXT)");
    }

    #[test]
    fn sqlite_probe_is_case_insensitive_and_tolerates_missing_tables() {
        let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
        connection
            .execute_batch("CREATE TABLE N_RACE (Year TEXT, MonthDay TEXT, Kyori TEXT);")
            .expect("schema should apply");
        let probe = SqliteSchemaProbe::new(&connection);

        assert!(probe.has_column("N_RACE", "kyori"));
        assert!(probe.has_column("n_race", "YEAR"));
        assert!(probe.table_exists("n_race"));
        assert!(probe.probe_columns("NO_SUCH_TABLE").is_empty());
        assert!(!probe.table_exists("NO_SUCH_TABLE"));
        assert_eq!(
            probe.probe_columns("N_RACE").column_set(),
            BTreeSet::from(["kyori".to_string(), "monthday".to_string(), "year".to_string()])
        );
    }
}
