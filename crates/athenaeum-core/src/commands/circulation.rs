//! Borrowing and returning items
//!
//! Each operation runs as a single unit of work. Borrowing checks, in order:
//! member exists, member active, no outstanding fine, item exists, item not
//! reference-only, item not already out. The first failing check is the one
//! reported. An item is "out" when it has a borrowing with no return date.

use crate::clock;
use crate::commands::members;
use crate::error::{Error, Result, StoreError};
use crate::storage::{Database, UnitOfWork};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Length of a loan
pub const LOAN_PERIOD_DAYS: u64 = 7;

/// A loan of one item to one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrowing {
    pub id: i64,
    pub member_id: i64,
    pub item_id: i64,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub fine_amount: f64,
}

impl Borrowing {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// What happened when an item came back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub borrowing_id: i64,
    pub member_id: i64,
    pub return_date: NaiveDate,
    /// Fine added to the member's balance; 0 when none was assessed
    pub fine_applied: f64,
}

pub fn due_date_for(borrow_date: NaiveDate) -> NaiveDate {
    borrow_date
        .checked_add_days(Days::new(LOAN_PERIOD_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

async fn has_open_borrowing(uow: &mut UnitOfWork, item_id: i64) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT borrowing_id FROM borrowings WHERE item_id = ? AND return_date IS NULL LIMIT 1",
    )
    .bind(item_id)
    .fetch_optional(uow.conn())
    .await?;

    Ok(row.is_some())
}

async fn borrow_in(
    uow: &mut UnitOfWork,
    member_id: i64,
    item_id: i64,
    today: NaiveDate,
) -> Result<Borrowing> {
    members::require_active(uow, member_id, "borrow items").await?;

    let balance = members::fine_balance(uow, member_id).await?;
    if balance > 0.0 {
        tracing::debug!(member_id, balance, "Borrowing blocked by outstanding fine");
        return Err(Error::OutstandingFine { member_id, amount: balance });
    }

    let item: Option<(bool,)> = sqlx::query_as("SELECT reference_only FROM items WHERE item_id = ?")
        .bind(item_id)
        .fetch_optional(uow.conn())
        .await?;
    let (reference_only,) = item.ok_or(Error::ItemNotFound(item_id))?;

    if reference_only {
        return Err(Error::ItemReferenceOnly(item_id));
    }
    if has_open_borrowing(uow, item_id).await? {
        return Err(Error::ItemAlreadyBorrowed(item_id));
    }

    let due_date = due_date_for(today);
    let inserted = uow
        .insert(
            sqlx::query("INSERT INTO borrowings (member_id, item_id, borrow_date, due_date) VALUES (?, ?, ?, ?)")
                .bind(member_id)
                .bind(item_id)
                .bind(today)
                .bind(due_date),
        )
        .await;

    let id = match inserted {
        Ok(id) => id,
        // The open-loan index caught a loan the check above could not see
        Err(StoreError::UniqueViolation(_)) => return Err(Error::ItemAlreadyBorrowed(item_id)),
        Err(err) => return Err(err.into()),
    };

    Ok(Borrowing {
        id,
        member_id,
        item_id,
        borrow_date: today,
        due_date,
        return_date: None,
        fine_amount: 0.0,
    })
}

/// Lend `item_id` to `member_id` for [`LOAN_PERIOD_DAYS`] days
pub async fn borrow_item(db: &Database, member_id: i64, item_id: i64) -> Result<Borrowing> {
    let today = clock::today();
    let borrowing = db
        .run_in_transaction(async |uow| borrow_in(uow, member_id, item_id, today).await)
        .await?;

    info!(
        borrowing_id = borrowing.id,
        member_id,
        item_id,
        due_date = %borrowing.due_date,
        "Item borrowed"
    );
    Ok(borrowing)
}

async fn return_in(
    uow: &mut UnitOfWork,
    borrowing_id: i64,
    today: NaiveDate,
) -> Result<ReturnReceipt> {
    let closed = uow
        .execute(
            sqlx::query("UPDATE borrowings SET return_date = ? WHERE borrowing_id = ? AND return_date IS NULL")
                .bind(today)
                .bind(borrowing_id),
        )
        .await?;

    if closed == 0 {
        return Err(Error::BorrowingNotOpen(borrowing_id));
    }

    let (fine_amount, member_id): (f64, i64) =
        sqlx::query_as("SELECT fine_amount, member_id FROM borrowings WHERE borrowing_id = ?")
            .bind(borrowing_id)
            .fetch_one(uow.conn())
            .await?;

    if fine_amount > 0.0 {
        uow.execute(
            sqlx::query(
                r#"
                INSERT INTO fines (member_id, total_fine) VALUES (?, ?)
                ON CONFLICT(member_id) DO UPDATE SET total_fine = total_fine + excluded.total_fine
                "#,
            )
            .bind(member_id)
            .bind(fine_amount),
        )
        .await?;
    }

    Ok(ReturnReceipt {
        borrowing_id,
        member_id,
        return_date: today,
        fine_applied: fine_amount.max(0.0),
    })
}

/// Close an open borrowing and charge any fine assessed on it
pub async fn return_item(db: &Database, borrowing_id: i64) -> Result<ReturnReceipt> {
    let today = clock::today();
    let receipt = db
        .run_in_transaction(async |uow| return_in(uow, borrowing_id, today).await)
        .await?;

    info!(
        borrowing_id,
        member_id = receipt.member_id,
        fine_applied = receipt.fine_applied,
        "Item returned"
    );
    Ok(receipt)
}

/// Look up a borrowing by id
pub async fn get_borrowing(db: &Database, borrowing_id: i64) -> Result<Option<Borrowing>> {
    let row: Option<(i64, i64, i64, NaiveDate, NaiveDate, Option<NaiveDate>, f64)> = sqlx::query_as(
        r#"
        SELECT borrowing_id, member_id, item_id, borrow_date, due_date, return_date, fine_amount
        FROM borrowings WHERE borrowing_id = ?
        "#,
    )
    .bind(borrowing_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(
        |(id, member_id, item_id, borrow_date, due_date, return_date, fine_amount)| Borrowing {
            id,
            member_id,
            item_id,
            borrow_date,
            due_date,
            return_date,
            fine_amount,
        },
    ))
}
