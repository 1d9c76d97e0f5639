//! Provisioning of reference records
//!
//! Members, catalog items, authors, rooms, events and staff are created by
//! the library's back office rather than by the circulation desk. These
//! helpers give a fresh database its initial records and let tests build
//! fixtures with the same statements.

use crate::commands::catalog::ItemType;
use crate::commands::members::MemberStatus;
use crate::error::{Error, Result};
use crate::storage::Database;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub status: MemberStatus,
}

impl NewMember {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            status: MemberStatus::Active,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.status = MemberStatus::Inactive;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub social_room_id: i64,
    pub max_capacity: i64,
    pub description: Option<String>,
    pub recommended_audience: Option<String>,
}

impl NewEvent {
    pub fn new(
        name: impl Into<String>,
        date: NaiveDate,
        social_room_id: i64,
        max_capacity: i64,
    ) -> Self {
        Self {
            name: name.into(),
            date,
            time: None,
            social_room_id,
            max_capacity,
            description: None,
            recommended_audience: None,
        }
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn for_audience(mut self, audience: impl Into<String>) -> Self {
        self.recommended_audience = Some(audience.into());
        self
    }
}

/// Insert a member and return its id
pub async fn add_member(db: &Database, member: &NewMember) -> Result<i64> {
    let done = sqlx::query(
        "INSERT INTO members (first_name, last_name, email, status, joined_on) VALUES (?, ?, ?, ?, date('now'))",
    )
    .bind(&member.first_name)
    .bind(&member.last_name)
    .bind(&member.email)
    .bind(member.status.as_str())
    .execute(db.pool())
    .await?;

    Ok(done.last_insert_rowid())
}

/// Change a member's standing
pub async fn set_member_status(db: &Database, member_id: i64, status: MemberStatus) -> Result<()> {
    let done = sqlx::query("UPDATE members SET status = ? WHERE member_id = ?")
        .bind(status.as_str())
        .bind(member_id)
        .execute(db.pool())
        .await?;

    if done.rows_affected() == 0 {
        return Err(Error::MemberNotFound(member_id));
    }
    Ok(())
}

/// Insert a catalog item outside of a donation and return its id
pub async fn add_item(
    db: &Database,
    title: &str,
    item_type: ItemType,
    isbn: Option<&str>,
    reference_only: bool,
) -> Result<i64> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("Title cannot be empty".to_string()));
    }

    let done = sqlx::query("INSERT INTO items (title, item_type, isbn, reference_only) VALUES (?, ?, ?, ?)")
        .bind(title.trim())
        .bind(item_type.as_str())
        .bind(isbn)
        .bind(reference_only)
        .execute(db.pool())
        .await?;

    Ok(done.last_insert_rowid())
}

/// Insert an author and return its id
pub async fn add_author(db: &Database, first_name: &str, last_name: &str) -> Result<i64> {
    let done = sqlx::query("INSERT INTO authors (first_name, last_name) VALUES (?, ?)")
        .bind(first_name)
        .bind(last_name)
        .execute(db.pool())
        .await?;

    Ok(done.last_insert_rowid())
}

/// Credit an author on an item
pub async fn link_author(db: &Database, item_id: i64, author_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO item_authors (item_id, author_id) VALUES (?, ?)")
        .bind(item_id)
        .bind(author_id)
        .execute(db.pool())
        .await?;
    Ok(())
}

/// Insert a social room and return its id
pub async fn add_room(db: &Database, room_name: &str, capacity: i64) -> Result<i64> {
    let done = sqlx::query("INSERT INTO social_rooms (room_name, capacity) VALUES (?, ?)")
        .bind(room_name)
        .bind(capacity)
        .execute(db.pool())
        .await?;

    Ok(done.last_insert_rowid())
}

/// Insert an event with no attendees and return its id
pub async fn add_event(db: &Database, event: &NewEvent) -> Result<i64> {
    if event.max_capacity < 0 {
        return Err(Error::InvalidInput("Maximum capacity cannot be negative".to_string()));
    }

    let done = sqlx::query(
        r#"
        INSERT INTO events (name, event_date, event_time, social_room_id, max_capacity, description, recommended_audience)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.name)
    .bind(event.date)
    .bind(&event.time)
    .bind(event.social_room_id)
    .bind(event.max_capacity)
    .bind(&event.description)
    .bind(&event.recommended_audience)
    .execute(db.pool())
    .await?;

    Ok(done.last_insert_rowid())
}

/// Insert a staff member and return their id
pub async fn add_staff(
    db: &Database,
    first_name: &str,
    last_name: &str,
    position: &str,
) -> Result<i64> {
    let done = sqlx::query("INSERT INTO staff (first_name, last_name, position) VALUES (?, ?, ?)")
        .bind(first_name)
        .bind(last_name)
        .bind(position)
        .execute(db.pool())
        .await?;

    Ok(done.last_insert_rowid())
}

/// Record the late fee assessed on a borrowing; it is charged to the
/// member's balance when the item is returned
pub async fn assess_fine(db: &Database, borrowing_id: i64, amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidInput("Fine amount must be a non-negative number".to_string()));
    }

    let done = sqlx::query("UPDATE borrowings SET fine_amount = ? WHERE borrowing_id = ? AND return_date IS NULL")
        .bind(amount)
        .bind(borrowing_id)
        .execute(db.pool())
        .await?;

    if done.rows_affected() == 0 {
        return Err(Error::BorrowingNotOpen(borrowing_id));
    }
    Ok(())
}
