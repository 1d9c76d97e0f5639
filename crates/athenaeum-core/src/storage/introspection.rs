//! Schema introspection for the admin table dump
//!
//! Table and column names are never taken from user input directly: a
//! requested table must match a name enumerated from `sqlite_master`, and
//! columns come from `PRAGMA table_info`. Identifiers are quoted before
//! being placed into statement text.

use crate::error::{Error, Result};
use crate::storage::Database;
use serde::Serialize;
use sqlx::Row;

/// Rows shown per table in the overview dump
pub const DUMP_ROW_LIMIT: i64 = 100;

/// Rendered contents of one table
#[derive(Debug, Clone, Serialize)]
pub struct TableDump {
    pub table: String,
    pub columns: Vec<String>,
    /// Each value rendered as text; NULL becomes `"NULL"`
    pub rows: Vec<Vec<String>>,
}

impl TableDump {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// List user tables known to the store, in name order
pub async fn list_tables(db: &Database) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(db.pool())
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Resolve a caller-supplied table name against the enumerated tables
pub async fn resolve_table(db: &Database, requested: &str) -> Result<String> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(requested)
            .fetch_optional(db.pool())
            .await?;

    row.map(|(name,)| name)
        .ok_or_else(|| Error::InvalidInput(format!("Table '{}' does not exist", requested)))
}

/// Column names of a table, in declaration order
pub async fn table_columns(db: &Database, table: &str) -> Result<Vec<String>> {
    let table = resolve_table(db, table).await?;
    let sql = format!("PRAGMA table_info({})", quote_identifier(&table));
    let rows = sqlx::query(&sql).fetch_all(db.pool()).await?;

    Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
}

/// Rows of a table rendered as text; `limit` of `None` returns every row
pub async fn table_rows(db: &Database, table: &str, limit: Option<i64>) -> Result<TableDump> {
    let table = resolve_table(db, table).await?;
    let columns = table_columns(db, &table).await?;

    if columns.is_empty() {
        return Ok(TableDump {
            table,
            columns,
            rows: Vec::new(),
        });
    }

    let projection = columns
        .iter()
        .map(|column| format!("CAST({} AS TEXT)", quote_identifier(column)))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {} FROM {}", projection, quote_identifier(&table));
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql);
    if let Some(limit) = limit {
        query = query.bind(limit);
    }
    let rows = query.fetch_all(db.pool()).await?;

    let rendered = rows
        .iter()
        .map(|row| {
            (0..columns.len())
                .map(|index| {
                    row.try_get::<Option<String>, _>(index)
                        .map(|value| value.unwrap_or_else(|| "NULL".to_string()))
                })
                .collect::<std::result::Result<Vec<_>, _>>()
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(TableDump {
        table,
        columns,
        rows: rendered,
    })
}

/// Overview dump of every table, capped at [`DUMP_ROW_LIMIT`] rows each
pub async fn dump_all(db: &Database) -> Result<Vec<TableDump>> {
    let mut dumps = Vec::new();
    for table in list_tables(db).await? {
        dumps.push(table_rows(db, &table, Some(DUMP_ROW_LIMIT)).await?);
    }
    Ok(dumps)
}
