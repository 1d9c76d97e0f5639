//! Member lookups and standing checks
//!
//! Members are provisioned outside the circulation desk; this module only
//! reads them and enforces the "must be Active" rule shared by borrowing,
//! donating, registering and volunteering.

use crate::error::{Error, Result};
use crate::storage::{Database, UnitOfWork};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Member standing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
}

impl MemberStatus {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "Active",
            MemberStatus::Inactive => "Inactive",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(MemberStatus::Active),
            "Inactive" => Some(MemberStatus::Inactive),
            _ => None,
        }
    }
}

/// A library member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub status: MemberStatus,
}

impl Member {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    fn from_row(row: &SqliteRow) -> Self {
        Member {
            id: row.get("member_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            // Unknown statuses are treated as inactive so they never pass the standing check
            status: MemberStatus::parse(row.get("status")).unwrap_or(MemberStatus::Inactive),
        }
    }
}

const SELECT_MEMBER: &str =
    "SELECT member_id, first_name, last_name, email, status FROM members WHERE member_id = ?";

/// Look up a member; used by the member login step
pub async fn find_member(db: &Database, member_id: i64) -> Result<Member> {
    let row = sqlx::query(SELECT_MEMBER)
        .bind(member_id)
        .fetch_optional(db.pool())
        .await?;

    row.map(|r| Member::from_row(&r))
        .ok_or(Error::MemberNotFound(member_id))
}

/// Fetch a member inside a unit of work
pub(crate) async fn load(uow: &mut UnitOfWork, member_id: i64) -> Result<Member> {
    let row = sqlx::query(SELECT_MEMBER)
        .bind(member_id)
        .fetch_optional(uow.conn())
        .await?;

    row.map(|r| Member::from_row(&r))
        .ok_or(Error::MemberNotFound(member_id))
}

/// Fetch a member and reject it unless Active. `action` completes the
/// sentence "Member N is inactive and cannot ...".
pub(crate) async fn require_active(
    uow: &mut UnitOfWork,
    member_id: i64,
    action: &'static str,
) -> Result<Member> {
    let member = load(uow, member_id).await?;
    if !member.is_active() {
        tracing::debug!(member_id, action, "Rejected inactive member");
        return Err(Error::MemberInactive { member_id, action });
    }
    Ok(member)
}

/// Outstanding fine balance for a member (0 when no fine row exists)
pub(crate) async fn fine_balance(uow: &mut UnitOfWork, member_id: i64) -> Result<f64> {
    let row: Option<(f64,)> = sqlx::query_as("SELECT total_fine FROM fines WHERE member_id = ?")
        .bind(member_id)
        .fetch_optional(uow.conn())
        .await?;

    Ok(row.map(|(total,)| total).unwrap_or(0.0))
}
