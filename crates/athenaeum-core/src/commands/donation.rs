//! Item donations
//!
//! A donation adds a catalog item and records who gave it, both in one unit
//! of work. A matching ISBN is a soft conflict: the caller decides whether to
//! proceed before the transaction starts and passes that decision in.

use crate::clock;
use crate::commands::catalog::{self, ItemType};
use crate::commands::members;
use crate::error::{Error, Result, StoreError};
use crate::storage::{Database, UnitOfWork};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Description of a donated item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDonation {
    pub title: String,
    pub item_type: ItemType,
    pub genre: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub isbn: Option<String>,
    pub reference_only: bool,
}

impl NewDonation {
    pub fn new(title: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            title: title.into(),
            item_type,
            genre: None,
            publication_date: None,
            location: None,
            isbn: None,
            reference_only: false,
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn published(mut self, date: NaiveDate) -> Self {
        self.publication_date = Some(date);
        self
    }

    pub fn shelved_at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn reference_only(mut self) -> Self {
        self.reference_only = true;
        self
    }

    /// Trimmed ISBN, with blank treated as absent
    fn isbn(&self) -> Option<&str> {
        self.isbn.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn blank_to_none(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

async fn donate_in(
    uow: &mut UnitOfWork,
    member_id: i64,
    donation: &NewDonation,
    proceed_despite_duplicate: bool,
    today: NaiveDate,
) -> Result<i64> {
    members::require_active(uow, member_id, "donate items").await?;

    let title = donation.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Title cannot be empty".to_string()));
    }

    if let Some(isbn) = donation.isbn() {
        if let Some(existing_title) = catalog::existing_isbn_title(uow, isbn).await? {
            if !proceed_despite_duplicate {
                return Err(Error::DuplicateIsbn {
                    isbn: isbn.to_string(),
                    existing_title,
                });
            }
            warn!(isbn, existing = %existing_title, "Accepting donation with duplicate ISBN");
        }
    }

    let inserted = uow
        .insert(
            sqlx::query(
                r#"
                INSERT INTO items (title, item_type, genre, publication_date, location, isbn, reference_only)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(title)
            .bind(donation.item_type.as_str())
            .bind(blank_to_none(donation.genre.as_ref()))
            .bind(donation.publication_date)
            .bind(blank_to_none(donation.location.as_ref()))
            .bind(donation.isbn())
            .bind(donation.reference_only),
        )
        .await;
    let item_id = match inserted {
        Ok(id) => id,
        Err(StoreError::CheckViolation(message)) => {
            return Err(Error::InvalidInput(format!("Item rejected: {}", message)));
        }
        Err(err) => return Err(err.into()),
    };

    uow.insert(
        sqlx::query("INSERT INTO donations (member_id, item_id, donation_date) VALUES (?, ?, ?)")
            .bind(member_id)
            .bind(item_id)
            .bind(today),
    )
    .await?;

    Ok(item_id)
}

/// Add a donated item to the catalog and return its id.
///
/// When the ISBN already exists the donation is refused with
/// [`Error::DuplicateIsbn`] unless `proceed_despite_duplicate` is set.
pub async fn donate_item(
    db: &Database,
    member_id: i64,
    donation: &NewDonation,
    proceed_despite_duplicate: bool,
) -> Result<i64> {
    let today = clock::today();
    let item_id = db
        .run_in_transaction(async |uow| {
            donate_in(uow, member_id, donation, proceed_despite_duplicate, today).await
        })
        .await?;

    info!(member_id, item_id, title = %donation.title.trim(), "Item donated");
    Ok(item_id)
}
