//! Librarian help desk

use crate::commands::members;
use crate::error::{Error, Result};
use crate::storage::Database;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Staff member a question was routed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarianContact {
    pub staff_id: i64,
    pub staff_name: String,
    pub staff_position: String,
}

/// Route a member's question to the first librarian on staff. Nothing is
/// written.
pub async fn ask_librarian(
    db: &Database,
    member_id: i64,
    question: &str,
) -> Result<LibrarianContact> {
    if question.trim().is_empty() {
        return Err(Error::InvalidInput("Question cannot be empty".to_string()));
    }

    members::find_member(db, member_id).await?;

    let row: Option<(i64, String, String, String)> = sqlx::query_as(
        r#"
        SELECT staff_id, first_name, last_name, position
        FROM staff
        WHERE position LIKE '%Librarian%'
        ORDER BY staff_id
        LIMIT 1
        "#,
    )
    .fetch_optional(db.pool())
    .await?;

    let (staff_id, first_name, last_name, staff_position) = row.ok_or(Error::NoLibrarianAvailable)?;
    let contact = LibrarianContact {
        staff_id,
        staff_name: format!("{} {}", first_name, last_name).trim().to_string(),
        staff_position,
    };

    info!(member_id, staff_id, "Question routed to librarian");
    Ok(contact)
}
