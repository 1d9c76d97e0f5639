//! Catalog search
//!
//! Item searches are read-only and return summaries that include the
//! credited authors and whether the item is reference-only. An item's
//! availability is derived from open borrowings rather than stored.

use crate::error::{Error, Result};
use crate::storage::{Database, UnitOfWork};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::fmt;
use std::str::FromStr;

/// Kinds of material the library holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    PrintBook,
    OnlineBook,
    Magazine,
    Journal,
    #[serde(rename = "CD")]
    Cd,
    Record,
}

impl ItemType {
    pub const ALL: [ItemType; 6] = [
        ItemType::PrintBook,
        ItemType::OnlineBook,
        ItemType::Magazine,
        ItemType::Journal,
        ItemType::Cd,
        ItemType::Record,
    ];

    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::PrintBook => "Print Book",
            ItemType::OnlineBook => "Online Book",
            ItemType::Magazine => "Magazine",
            ItemType::Journal => "Journal",
            ItemType::Cd => "CD",
            ItemType::Record => "Record",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Comma separated list of accepted names, for prompts and errors
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|t| format!("'{}'", t.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.trim()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Invalid item type. Type must be one of: {}",
                Self::valid_names()
            ))
        })
    }
}

/// Whether an item is currently out on loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorrowingStatus {
    Available,
    Borrowed,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Available => "Available",
            BorrowingStatus::Borrowed => "Borrowed",
        }
    }
}

/// One row of an item search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: i64,
    pub title: String,
    pub item_type: Option<ItemType>,
    pub status: BorrowingStatus,
    pub location: Option<String>,
    /// Credited authors joined with ", "
    pub authors: Option<String>,
    pub reference_only: bool,
}

impl ItemSummary {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let on_loan: bool = row.try_get("on_loan")?;
        let item_type: String = row.try_get("item_type")?;
        Ok(ItemSummary {
            id: row.try_get("item_id")?,
            title: row.try_get("title")?,
            item_type: ItemType::parse(&item_type),
            status: if on_loan {
                BorrowingStatus::Borrowed
            } else {
                BorrowingStatus::Available
            },
            location: row.try_get("location")?,
            authors: row.try_get("authors")?,
            reference_only: row.try_get("reference_only")?,
        })
    }
}

const FIND_ITEMS_SQL: &str = r#"
    SELECT i.item_id, i.title, i.item_type, i.location, i.reference_only,
           EXISTS (
               SELECT 1 FROM borrowings b
               WHERE b.item_id = i.item_id AND b.return_date IS NULL
           ) AS on_loan,
           GROUP_CONCAT(a.first_name || ' ' || a.last_name, ', ') AS authors
    FROM items i
    LEFT JOIN item_authors ia ON i.item_id = ia.item_id
    LEFT JOIN authors a ON ia.author_id = a.author_id
    WHERE i.title LIKE ? ESCAPE '\'
    GROUP BY i.item_id
    ORDER BY i.title, i.item_id
"#;

/// Build a LIKE pattern matching `needle` anywhere, with wildcards in the
/// needle itself taken literally
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// A title search that can be streamed any number of times
#[derive(Debug, Clone)]
pub struct ItemQuery {
    title: String,
}

impl ItemQuery {
    pub fn title_contains(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    /// Lazily stream matching items; each call re-runs the search
    pub fn stream<'a>(&'a self, db: &'a Database) -> impl Stream<Item = Result<ItemSummary>> + 'a {
        let pattern = contains_pattern(&self.title);
        try_stream! {
            let mut rows = sqlx::query(FIND_ITEMS_SQL).bind(pattern).fetch(db.pool());
            while let Some(row) = rows.try_next().await? {
                yield ItemSummary::from_row(&row)?;
            }
        }
    }
}

/// Case-insensitive title substring search
pub async fn find_items(db: &Database, title: &str) -> Result<Vec<ItemSummary>> {
    let query = ItemQuery::title_contains(title);
    query.stream(db).try_collect().await
}

/// Title of an existing item carrying `isbn`, if any. Presentation calls
/// this before a donation to decide whether to ask for confirmation.
pub async fn check_duplicate_isbn(db: &Database, isbn: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT title FROM items WHERE isbn = ? ORDER BY item_id LIMIT 1")
        .bind(isbn.trim())
        .fetch_optional(db.pool())
        .await?;

    Ok(row.map(|(title,)| title))
}

pub(crate) async fn existing_isbn_title(
    uow: &mut UnitOfWork,
    isbn: &str,
) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT title FROM items WHERE isbn = ? ORDER BY item_id LIMIT 1")
        .bind(isbn)
        .fetch_optional(uow.conn())
        .await?;

    Ok(row.map(|(title,)| title))
}
