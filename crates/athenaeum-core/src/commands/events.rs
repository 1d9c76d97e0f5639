//! Library events: search, registration, cancellation and volunteering
//!
//! `events.current_attendees` is a maintained counter. It changes only in
//! the same unit of work that inserts or deletes the matching
//! `event_members` row. [`attendance_drift`] reports any event where the two
//! have diverged; it never repairs them.

use crate::clock;
use crate::commands::catalog::contains_pattern;
use crate::commands::members;
use crate::error::{Error, Result, StoreError};
use crate::storage::{Database, UnitOfWork};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{info, warn};

/// One row of an event search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub room_name: String,
    pub max_capacity: i64,
    pub current_attendees: i64,
    pub remaining_capacity: i64,
    pub description: Option<String>,
    pub recommended_audience: Option<String>,
}

impl EventSummary {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        let max_capacity: i64 = row.try_get("max_capacity")?;
        let current_attendees: i64 = row.try_get("current_attendees")?;
        Ok(EventSummary {
            id: row.try_get("event_id")?,
            name: row.try_get("name")?,
            date: row.try_get("event_date")?,
            time: row.try_get("event_time")?,
            room_name: row.try_get("room_name")?,
            max_capacity,
            current_attendees,
            remaining_capacity: max_capacity - current_attendees,
            description: row.try_get("description")?,
            recommended_audience: row.try_get("recommended_audience")?,
        })
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub event_id: i64,
    pub event_name: String,
    pub member_id: i64,
    pub registration_date: NaiveDate,
    /// Attendee count after this registration
    pub attendees: i64,
    pub max_capacity: i64,
}

/// Result of a successful cancellation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub event_id: i64,
    pub event_name: String,
    pub member_id: i64,
}

/// A member's volunteer sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerAssignment {
    pub event_id: i64,
    pub member_id: i64,
    pub role: String,
    pub volunteer_date: NaiveDate,
}

/// An event the member is registered for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRegistration {
    pub event_id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub registration_date: NaiveDate,
}

/// An event whose counter disagrees with its registrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceDrift {
    pub event_id: i64,
    pub name: String,
    pub recorded_attendees: i64,
    pub registered_members: i64,
}

struct EventRecord {
    name: String,
    date: NaiveDate,
    max_capacity: i64,
    current_attendees: i64,
}

async fn load_event(uow: &mut UnitOfWork, event_id: i64) -> Result<EventRecord> {
    let row: Option<(String, NaiveDate, i64, i64)> = sqlx::query_as(
        "SELECT name, event_date, max_capacity, current_attendees FROM events WHERE event_id = ?",
    )
    .bind(event_id)
    .fetch_optional(uow.conn())
    .await?;

    let (name, date, max_capacity, current_attendees) = row.ok_or(Error::EventNotFound(event_id))?;
    Ok(EventRecord {
        name,
        date,
        max_capacity,
        current_attendees,
    })
}

async fn is_registered(uow: &mut UnitOfWork, event_id: i64, member_id: i64) -> Result<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM event_members WHERE event_id = ? AND member_id = ?")
            .bind(event_id)
            .bind(member_id)
            .fetch_optional(uow.conn())
            .await?;

    Ok(row.is_some())
}

const FIND_EVENTS_SQL: &str = r#"
    SELECT e.event_id, e.name, e.event_date, e.event_time, sr.room_name,
           e.max_capacity, e.current_attendees, e.description, e.recommended_audience
    FROM events e
    JOIN social_rooms sr ON e.social_room_id = sr.social_room_id
    WHERE e.name LIKE ? ESCAPE '\'
    ORDER BY e.event_date, e.event_id
"#;

/// Substring search on event names
pub async fn find_events(db: &Database, name: &str) -> Result<Vec<EventSummary>> {
    let rows = sqlx::query(FIND_EVENTS_SQL)
        .bind(contains_pattern(name))
        .fetch_all(db.pool())
        .await?;

    rows.iter().map(EventSummary::from_row).collect()
}

async fn register_in(
    uow: &mut UnitOfWork,
    member_id: i64,
    event_id: i64,
    today: NaiveDate,
) -> Result<Registration> {
    let event = load_event(uow, event_id).await?;

    if event.current_attendees >= event.max_capacity {
        return Err(Error::EventFull {
            name: event.name,
            capacity: event.max_capacity,
        });
    }
    if event.date < today {
        return Err(Error::EventInPast(event.name));
    }

    members::require_active(uow, member_id, "register for events").await?;

    if is_registered(uow, event_id, member_id).await? {
        return Err(Error::AlreadyRegistered(event.name));
    }

    let inserted = uow
        .execute(
            sqlx::query("INSERT INTO event_members (event_id, member_id, registration_date) VALUES (?, ?, ?)")
                .bind(event_id)
                .bind(member_id)
                .bind(today),
        )
        .await;
    match inserted {
        Ok(_) => {}
        Err(StoreError::UniqueViolation(_)) => return Err(Error::AlreadyRegistered(event.name)),
        Err(err) => return Err(err.into()),
    }

    let bumped = uow
        .execute(
            sqlx::query("UPDATE events SET current_attendees = current_attendees + 1 WHERE event_id = ?")
                .bind(event_id),
        )
        .await;
    match bumped {
        Ok(_) => {}
        Err(StoreError::CheckViolation(_)) => {
            return Err(Error::EventFull {
                name: event.name,
                capacity: event.max_capacity,
            });
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Registration {
        event_id,
        event_name: event.name,
        member_id,
        registration_date: today,
        attendees: event.current_attendees + 1,
        max_capacity: event.max_capacity,
    })
}

/// Register a member for an upcoming event with free places
pub async fn register_for_event(
    db: &Database,
    member_id: i64,
    event_id: i64,
) -> Result<Registration> {
    let today = clock::today();
    let registration = db
        .run_in_transaction(async |uow| register_in(uow, member_id, event_id, today).await)
        .await?;

    info!(
        event_id,
        member_id,
        attendees = registration.attendees,
        max_capacity = registration.max_capacity,
        "Registered for event"
    );
    Ok(registration)
}

async fn cancel_in(
    uow: &mut UnitOfWork,
    member_id: i64,
    event_id: i64,
    today: NaiveDate,
) -> Result<Cancellation> {
    let event = load_event(uow, event_id).await?;

    if event.date < today {
        return Err(Error::EventInPast(event.name));
    }

    let removed = uow
        .execute(
            sqlx::query("DELETE FROM event_members WHERE event_id = ? AND member_id = ?")
                .bind(event_id)
                .bind(member_id),
        )
        .await?;
    if removed == 0 {
        return Err(Error::NotRegistered(event.name));
    }

    let lowered = uow
        .execute(
            sqlx::query("UPDATE events SET current_attendees = current_attendees - 1 WHERE event_id = ?")
                .bind(event_id),
        )
        .await;
    match lowered {
        Ok(_) => {}
        Err(StoreError::CheckViolation(_)) => {
            warn!(
                event_id,
                member_id,
                recorded_attendees = event.current_attendees,
                "Attendee counter out of step with registrations; cancellation rolled back"
            );
            return Err(Error::AttendanceOutOfStep(event.name));
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Cancellation {
        event_id,
        event_name: event.name,
        member_id,
    })
}

/// Withdraw a member's registration for an event that has not yet happened
pub async fn cancel_registration(
    db: &Database,
    member_id: i64,
    event_id: i64,
) -> Result<Cancellation> {
    let today = clock::today();
    let cancellation = db
        .run_in_transaction(async |uow| cancel_in(uow, member_id, event_id, today).await)
        .await?;

    info!(event_id, member_id, "Cancelled event registration");
    Ok(cancellation)
}

async fn volunteer_in(
    uow: &mut UnitOfWork,
    member_id: i64,
    event_id: i64,
    role: &str,
    today: NaiveDate,
) -> Result<VolunteerAssignment> {
    load_event(uow, event_id).await?;
    members::require_active(uow, member_id, "volunteer for events").await?;

    let role = role.trim();
    if role.is_empty() {
        return Err(Error::InvalidInput("Volunteer role cannot be empty".to_string()));
    }

    let inserted = uow
        .execute(
            sqlx::query(
                "INSERT INTO event_volunteers (event_id, member_id, volunteer_role, volunteer_date) VALUES (?, ?, ?, ?)",
            )
            .bind(event_id)
            .bind(member_id)
            .bind(role)
            .bind(today),
        )
        .await;
    match inserted {
        Ok(_) => {}
        Err(StoreError::UniqueViolation(_)) => return Err(Error::AlreadyVolunteering(event_id)),
        Err(err) => return Err(err.into()),
    }

    Ok(VolunteerAssignment {
        event_id,
        member_id,
        role: role.to_string(),
        volunteer_date: today,
    })
}

/// Sign a member up to help at an event in the given role
pub async fn volunteer_for_event(
    db: &Database,
    member_id: i64,
    event_id: i64,
    role: &str,
) -> Result<VolunteerAssignment> {
    let today = clock::today();
    let assignment = db
        .run_in_transaction(async |uow| volunteer_in(uow, member_id, event_id, role, today).await)
        .await?;

    info!(event_id, member_id, role = %assignment.role, "Volunteered for event");
    Ok(assignment)
}

/// Events a member is registered for, soonest first
pub async fn registered_events(db: &Database, member_id: i64) -> Result<Vec<EventRegistration>> {
    let rows: Vec<(i64, String, NaiveDate, Option<String>, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT e.event_id, e.name, e.event_date, e.event_time, em.registration_date
        FROM events e
        JOIN event_members em ON e.event_id = em.event_id
        WHERE em.member_id = ?
        ORDER BY e.event_date, e.event_id
        "#,
    )
    .bind(member_id)
    .fetch_all(db.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(|(event_id, name, date, time, registration_date)| EventRegistration {
            event_id,
            name,
            date,
            time,
            registration_date,
        })
        .collect())
}

/// Events whose maintained attendee counter differs from the live count
pub async fn attendance_drift(db: &Database) -> Result<Vec<AttendanceDrift>> {
    let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT e.event_id, e.name, e.current_attendees, COUNT(em.member_id) AS registered
        FROM events e
        LEFT JOIN event_members em ON e.event_id = em.event_id
        GROUP BY e.event_id
        HAVING e.current_attendees <> COUNT(em.member_id)
        ORDER BY e.event_id
        "#,
    )
    .fetch_all(db.pool())
    .await?;

    let drift: Vec<AttendanceDrift> = rows
        .into_iter()
        .map(|(event_id, name, recorded_attendees, registered_members)| AttendanceDrift {
            event_id,
            name,
            recorded_attendees,
            registered_members,
        })
        .collect();

    for event in &drift {
        warn!(
            event_id = event.event_id,
            recorded = event.recorded_attendees,
            registered = event.registered_members,
            "Attendee counter out of step with registrations"
        );
    }
    Ok(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::provision::{self, NewEvent, NewMember};
    use chrono::Days;

    struct Hall {
        db: Database,
        room: i64,
        member: i64,
    }

    async fn hall() -> Hall {
        let db = Database::in_memory().await.unwrap();
        let room = provision::add_room(&db, "Reading Room", 40).await.unwrap();
        let member = provision::add_member(&db, &NewMember::new("Ada", "Lovelace"))
            .await
            .unwrap();
        Hall { db, room, member }
    }

    fn days_from_today(days: i64) -> NaiveDate {
        let today = clock::today();
        if days >= 0 {
            today.checked_add_days(Days::new(days as u64)).unwrap()
        } else {
            today.checked_sub_days(Days::new(days.unsigned_abs())).unwrap()
        }
    }

    async fn event(h: &Hall, name: &str, offset_days: i64, capacity: i64) -> i64 {
        let new_event = NewEvent::new(name, days_from_today(offset_days), h.room, capacity);
        provision::add_event(&h.db, &new_event).await.unwrap()
    }

    async fn counter(db: &Database, event_id: i64) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT current_attendees FROM events WHERE event_id = ?")
            .bind(event_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn test_register_increments_attendees() {
        let h = hall().await;
        let event_id = event(&h, "Book Club", 3, 10).await;

        let registration = register_for_event(&h.db, h.member, event_id).await.unwrap();
        assert_eq!(registration.attendees, 1);
        assert_eq!(counter(&h.db, event_id).await, 1);

        let mine = registered_events(&h.db, h.member).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].event_id, event_id);
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let h = hall().await;
        let event_id = event(&h, "Book Club", 3, 10).await;
        register_for_event(&h.db, h.member, event_id).await.unwrap();

        let err = register_for_event(&h.db, h.member, event_id).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
        assert_eq!(counter(&h.db, event_id).await, 1);
    }

    #[tokio::test]
    async fn test_full_event_rejects_registration() {
        let h = hall().await;
        let event_id = event(&h, "Author Talk", 3, 2).await;
        for name in ["Alan", "Grace"] {
            let other = provision::add_member(&h.db, &NewMember::new(name, "Guest"))
                .await
                .unwrap();
            register_for_event(&h.db, other, event_id).await.unwrap();
        }

        let err = register_for_event(&h.db, h.member, event_id).await.unwrap_err();
        assert!(matches!(err, Error::EventFull { capacity: 2, .. }));
        assert!(err.to_string().contains("full capacity"));
        assert_eq!(counter(&h.db, event_id).await, 2);
    }

    #[tokio::test]
    async fn test_register_precedence() {
        let h = hall().await;

        let err = register_for_event(&h.db, h.member, 404).await.unwrap_err();
        assert!(matches!(err, Error::EventNotFound(404)));

        // Capacity is checked before the date
        let past_full = event(&h, "Yesterday's Talk", -1, 0).await;
        let err = register_for_event(&h.db, h.member, past_full).await.unwrap_err();
        assert!(matches!(err, Error::EventFull { .. }));

        // Date is checked before the member
        let past = event(&h, "Old Reading", -1, 5).await;
        let err = register_for_event(&h.db, 9999, past).await.unwrap_err();
        assert!(matches!(err, Error::EventInPast(_)));

        let upcoming = event(&h, "Story Time", 1, 5).await;
        let err = register_for_event(&h.db, 9999, upcoming).await.unwrap_err();
        assert!(matches!(err, Error::MemberNotFound(9999)));

        let inactive = provision::add_member(&h.db, &NewMember::new("Old", "Timer").inactive())
            .await
            .unwrap();
        let err = register_for_event(&h.db, inactive, upcoming).await.unwrap_err();
        assert!(matches!(err, Error::MemberInactive { .. }));
        assert_eq!(counter(&h.db, upcoming).await, 0);
    }

    #[tokio::test]
    async fn test_event_today_is_still_open() {
        let h = hall().await;
        let event_id = event(&h, "Today Only", 0, 5).await;

        register_for_event(&h.db, h.member, event_id).await.unwrap();
        cancel_registration(&h.db, h.member, event_id).await.unwrap();
        assert_eq!(counter(&h.db, event_id).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_decrements_and_removes() {
        let h = hall().await;
        let event_id = event(&h, "Book Club", 3, 10).await;
        register_for_event(&h.db, h.member, event_id).await.unwrap();

        let cancellation = cancel_registration(&h.db, h.member, event_id).await.unwrap();
        assert_eq!(cancellation.event_name, "Book Club");
        assert_eq!(counter(&h.db, event_id).await, 0);
        assert!(registered_events(&h.db, h.member).await.unwrap().is_empty());

        let err = cancel_registration(&h.db, h.member, event_id).await.unwrap_err();
        assert!(matches!(err, Error::NotRegistered(_)));
        assert_eq!(counter(&h.db, event_id).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_with_drifted_counter_is_an_input_error() {
        let h = hall().await;
        let event_id = event(&h, "Book Club", 3, 10).await;
        register_for_event(&h.db, h.member, event_id).await.unwrap();
        sqlx::query("UPDATE events SET current_attendees = 0 WHERE event_id = ?")
            .bind(event_id)
            .execute(h.db.pool())
            .await
            .unwrap();

        let err = cancel_registration(&h.db, h.member, event_id).await.unwrap_err();
        assert!(matches!(err, Error::AttendanceOutOfStep(_)));
        assert!(!err.is_fatal());
        assert_eq!(counter(&h.db, event_id).await, 0);
        assert_eq!(registered_events(&h.db, h.member).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_past_event_fails() {
        let h = hall().await;
        let event_id = event(&h, "Last Week", -7, 10).await;
        sqlx::query("INSERT INTO event_members (event_id, member_id, registration_date) VALUES (?, ?, ?)")
            .bind(event_id)
            .bind(h.member)
            .bind(days_from_today(-10))
            .execute(h.db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE events SET current_attendees = 1 WHERE event_id = ?")
            .bind(event_id)
            .execute(h.db.pool())
            .await
            .unwrap();

        let err = cancel_registration(&h.db, h.member, event_id).await.unwrap_err();
        assert!(matches!(err, Error::EventInPast(_)));
        assert_eq!(counter(&h.db, event_id).await, 1);
        assert_eq!(registered_events(&h.db, h.member).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_volunteer_once_per_event() {
        let h = hall().await;
        let event_id = event(&h, "Book Sale", 5, 50).await;

        let assignment = volunteer_for_event(&h.db, h.member, event_id, "  Usher ").await.unwrap();
        assert_eq!(assignment.role, "Usher");

        let err = volunteer_for_event(&h.db, h.member, event_id, "Cashier").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVolunteering(id) if id == event_id));
    }

    #[tokio::test]
    async fn test_volunteer_validation_order() {
        let h = hall().await;
        let event_id = event(&h, "Book Sale", 5, 50).await;

        let err = volunteer_for_event(&h.db, h.member, 404, "").await.unwrap_err();
        assert!(matches!(err, Error::EventNotFound(404)));

        let err = volunteer_for_event(&h.db, 9999, event_id, "").await.unwrap_err();
        assert!(matches!(err, Error::MemberNotFound(9999)));

        let inactive = provision::add_member(&h.db, &NewMember::new("Old", "Timer").inactive())
            .await
            .unwrap();
        let err = volunteer_for_event(&h.db, inactive, event_id, "").await.unwrap_err();
        assert!(matches!(err, Error::MemberInactive { .. }));

        let err = volunteer_for_event(&h.db, h.member, event_id, "   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_find_events_reports_remaining_capacity() {
        let h = hall().await;
        let event_id = event(&h, "Poetry Night", 2, 3).await;
        register_for_event(&h.db, h.member, event_id).await.unwrap();
        event(&h, "Chess Club", 2, 8).await;

        let found = find_events(&h.db, "poetry").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].room_name, "Reading Room");
        assert_eq!(found[0].remaining_capacity, 2);
    }

    #[tokio::test]
    async fn test_attendance_drift_detected_not_repaired() {
        let h = hall().await;
        let event_id = event(&h, "Film Night", 4, 10).await;
        register_for_event(&h.db, h.member, event_id).await.unwrap();
        assert!(attendance_drift(&h.db).await.unwrap().is_empty());

        sqlx::query("UPDATE events SET current_attendees = 3 WHERE event_id = ?")
            .bind(event_id)
            .execute(h.db.pool())
            .await
            .unwrap();

        let drift = attendance_drift(&h.db).await.unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].recorded_attendees, 3);
        assert_eq!(drift[0].registered_members, 1);
        assert_eq!(counter(&h.db, event_id).await, 3);
    }
}
