//! Fine balances and payment
//!
//! A member's balance lives in a single `fines` row created the first time a
//! returned borrowing carries a fine. Paying clears the balance in full.

use crate::commands::members;
use crate::error::{Error, Result};
use crate::storage::{Database, UnitOfWork};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A returned borrowing that was charged a fine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinedBorrowing {
    pub borrowing_id: i64,
    pub title: String,
    pub due_date: NaiveDate,
    pub return_date: NaiveDate,
    pub fine_amount: f64,
}

/// Outstanding balance plus the borrowings that contributed fines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineStatement {
    pub member_id: i64,
    pub total: f64,
    /// Most recently returned first
    pub items: Vec<FinedBorrowing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub member_id: i64,
    pub amount_paid: f64,
}

/// Current balance and fine history for a member
pub async fn view_fines(db: &Database, member_id: i64) -> Result<FineStatement> {
    members::find_member(db, member_id).await?;

    let total: Option<(f64,)> = sqlx::query_as("SELECT total_fine FROM fines WHERE member_id = ?")
        .bind(member_id)
        .fetch_optional(db.pool())
        .await?;

    let rows: Vec<(i64, String, NaiveDate, NaiveDate, f64)> = sqlx::query_as(
        r#"
        SELECT b.borrowing_id, i.title, b.due_date, b.return_date, b.fine_amount
        FROM borrowings b
        JOIN items i ON b.item_id = i.item_id
        WHERE b.member_id = ? AND b.return_date IS NOT NULL AND b.fine_amount > 0
        ORDER BY b.return_date DESC, b.borrowing_id DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(db.pool())
    .await?;

    Ok(FineStatement {
        member_id,
        total: total.map(|(t,)| t).unwrap_or(0.0),
        items: rows
            .into_iter()
            .map(|(borrowing_id, title, due_date, return_date, fine_amount)| FinedBorrowing {
                borrowing_id,
                title,
                due_date,
                return_date,
                fine_amount,
            })
            .collect(),
    })
}

async fn pay_in(
    uow: &mut UnitOfWork,
    member_id: i64,
    verified_by_admin: bool,
) -> Result<PaymentReceipt> {
    let balance = members::fine_balance(uow, member_id).await?;
    if balance <= 0.0 {
        return Ok(PaymentReceipt {
            member_id,
            amount_paid: 0.0,
        });
    }
    if !verified_by_admin {
        return Err(Error::AdminAuthorizationRequired);
    }

    uow.execute(sqlx::query("UPDATE fines SET total_fine = 0 WHERE member_id = ?").bind(member_id))
        .await?;

    Ok(PaymentReceipt {
        member_id,
        amount_paid: balance,
    })
}

/// Clear a member's outstanding balance. The caller must already have
/// passed admin authentication and says so through `verified_by_admin`.
pub async fn pay_fine(
    db: &Database,
    member_id: i64,
    verified_by_admin: bool,
) -> Result<PaymentReceipt> {
    let receipt = db
        .run_in_transaction(async |uow| pay_in(uow, member_id, verified_by_admin).await)
        .await?;

    if receipt.amount_paid > 0.0 {
        info!(member_id, amount = receipt.amount_paid, "Fine paid");
    }
    Ok(receipt)
}

/// Outstanding balance for a member, 0 when none has been recorded
pub async fn outstanding_balance(db: &Database, member_id: i64) -> Result<f64> {
    let mut uow = db.begin().await?;
    let balance = members::fine_balance(&mut uow, member_id).await?;
    uow.rollback().await?;
    Ok(balance)
}
