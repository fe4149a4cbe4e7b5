use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

/// Opens an existing store read-only. A missing file is an error rather than
/// silently creating an empty database.
pub fn open_sqlite_connection(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("sqlite database not found: {}", path.display());
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )
    .with_context(|| format!("failed to open sqlite database: {}", path.display()))
}

/// `ATTACH` that is undone when the guard drops, even on early return.
pub struct AttachedDatabase<'conn> {
    connection: &'conn Connection,
    schema: String,
}

impl<'conn> AttachedDatabase<'conn> {
    pub fn attach(connection: &'conn Connection, path: &Path, schema: &str) -> Result<Self> {
        let path_text = path.to_string_lossy();
        let sql = format!(
            "ATTACH DATABASE {} AS {}",
            sqlite_single_quoted(&path_text),
            quote_identifier(schema)
        );
        connection
            .execute_batch(&sql)
            .with_context(|| format!("failed to attach {} as `{schema}`", path.display()))?;

        Ok(Self {
            connection,
            schema: schema.to_string(),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }
}

impl Drop for AttachedDatabase<'_> {
    fn drop(&mut self) {
        let sql = format!("DETACH DATABASE {}", quote_identifier(&self.schema));
        if let Err(error) = self.connection.execute_batch(&sql) {
            log::warn!("failed to detach `{}`: {error}", self.schema);
        }
    }
}

/// Reads any column as display text: NULL is empty, numbers are rendered
/// without a trailing `.0`, blobs are decoded lossily.
pub fn text_at(row: &Row<'_>, index: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(index)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{value:.0}")
            } else {
                value.to_string()
            }
        }
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}

#[must_use]
pub fn sqlite_single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Plain ASCII identifiers stay bare; anything else (including Japanese column
/// names) is double-quoted.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
