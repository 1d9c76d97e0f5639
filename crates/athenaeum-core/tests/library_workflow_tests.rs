//! End-to-end library workflows against a file-backed database

use athenaeum_core::commands::catalog::{self, BorrowingStatus, ItemType};
use athenaeum_core::commands::circulation;
use athenaeum_core::commands::donation::{self, NewDonation};
use athenaeum_core::commands::events;
use athenaeum_core::commands::fines;
use athenaeum_core::commands::provision::{self, NewEvent, NewMember};
use athenaeum_core::storage::{Database, introspection};
use athenaeum_core::{Error, Outcome, clock};
use chrono::Days;
use tempfile::TempDir;

/// Five members, ten items, three upcoming events in one room
struct Library {
    _dir: TempDir,
    db: Database,
}

async fn library() -> Library {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("library.db")).await.unwrap();

    for n in 1..=5 {
        provision::add_member(&db, &NewMember::new(format!("Member{}", n), "Reader"))
            .await
            .unwrap();
    }
    for n in 1..=10 {
        provision::add_item(&db, &format!("Volume {}", n), ItemType::PrintBook, None, false)
            .await
            .unwrap();
    }
    let room = provision::add_room(&db, "Community Hall", 30).await.unwrap();
    let next_week = clock::today().checked_add_days(Days::new(7)).unwrap();
    for (name, capacity) in [("Book Club", 10), ("Film Night", 20), ("Author Talk", 2)] {
        provision::add_event(&db, &NewEvent::new(name, next_week, room, capacity).at("18:00"))
            .await
            .unwrap();
    }

    Library { _dir: dir, db }
}

async fn attendees(db: &Database, event_id: i64) -> i64 {
    events::find_events(db, "")
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.id == event_id)
        .map(|e| e.current_attendees)
        .unwrap()
}

#[tokio::test]
async fn test_member_borrows_item_then_is_refused_a_second_copy() {
    let lib = library().await;

    let borrowing = circulation::borrow_item(&lib.db, 5, 10).await.unwrap();
    assert_eq!(borrowing.member_id, 5);
    assert_eq!(borrowing.item_id, 10);
    assert_eq!(
        borrowing.due_date,
        borrowing.borrow_date.checked_add_days(Days::new(7)).unwrap()
    );

    let outcome: Outcome<_> = circulation::borrow_item(&lib.db, 5, 10).await.into();
    match outcome {
        Outcome::InputError(message) => assert!(message.contains("already borrowed")),
        other => panic!("expected input error, got {:?}", other.is_success()),
    }

    let found = catalog::find_items(&lib.db, "Volume 10").await.unwrap();
    assert_eq!(found[0].status, BorrowingStatus::Borrowed);
}

#[tokio::test]
async fn test_outstanding_fine_blocks_every_borrow() {
    let lib = library().await;
    sqlx::query("INSERT INTO fines (member_id, total_fine) VALUES (5, 4.50)")
        .execute(lib.db.pool())
        .await
        .unwrap();

    for item in [1, 10, 999] {
        let err = circulation::borrow_item(&lib.db, 5, item).await.unwrap_err();
        assert!(matches!(err, Error::OutstandingFine { member_id: 5, .. }), "item {}", item);
    }

    let receipt = fines::pay_fine(&lib.db, 5, true).await.unwrap();
    assert!((receipt.amount_paid - 4.50).abs() < 1e-9);
    circulation::borrow_item(&lib.db, 5, 1).await.unwrap();
}

#[tokio::test]
async fn test_full_event_keeps_attendee_count() {
    let lib = library().await;
    events::register_for_event(&lib.db, 1, 3).await.unwrap();
    events::register_for_event(&lib.db, 2, 3).await.unwrap();

    let outcome: Outcome<_> = events::register_for_event(&lib.db, 5, 3).await.into();
    match outcome {
        Outcome::InputError(message) => assert!(message.contains("full capacity")),
        _ => panic!("expected input error"),
    }
    assert_eq!(attendees(&lib.db, 3).await, 2);
}

#[tokio::test]
async fn test_register_and_cancel_move_count_by_one() {
    let lib = library().await;

    events::register_for_event(&lib.db, 4, 1).await.unwrap();
    events::register_for_event(&lib.db, 5, 1).await.unwrap();
    assert_eq!(attendees(&lib.db, 1).await, 2);

    events::cancel_registration(&lib.db, 4, 1).await.unwrap();
    assert_eq!(attendees(&lib.db, 1).await, 1);

    let mine = events::registered_events(&lib.db, 5).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].name, "Book Club");
    assert!(events::attendance_drift(&lib.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_donated_item_is_found_exactly_once() {
    let lib = library().await;
    let donation = NewDonation::new("The Left Hand of Darkness", ItemType::PrintBook)
        .with_isbn("9780441478125");

    let item_id = donation::donate_item(&lib.db, 3, &donation, false).await.unwrap();

    let found = catalog::find_items(&lib.db, "left hand").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, item_id);
    assert_eq!(
        catalog::check_duplicate_isbn(&lib.db, "9780441478125").await.unwrap().as_deref(),
        Some("The Left Hand of Darkness")
    );
}

#[tokio::test]
async fn test_at_most_one_open_borrowing_per_item() {
    let lib = library().await;

    // Members take turns at the same two items
    for round in 0..6 {
        let member = (round % 5) + 1;
        for item in [7, 8] {
            let first = circulation::borrow_item(&lib.db, member, item).await.unwrap();
            let other = (member % 5) + 1;
            let err = circulation::borrow_item(&lib.db, other, item).await.unwrap_err();
            assert!(matches!(err, Error::ItemAlreadyBorrowed(_)));
            circulation::return_item(&lib.db, first.id).await.unwrap();
        }
    }

    let (open,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM (SELECT item_id FROM borrowings WHERE return_date IS NULL GROUP BY item_id HAVING COUNT(*) > 1)",
    )
    .fetch_one(lib.db.pool())
    .await
    .unwrap();
    assert_eq!(open, 0);
}

#[tokio::test]
async fn test_admin_dump_sees_workflow_rows() {
    let lib = library().await;
    circulation::borrow_item(&lib.db, 1, 1).await.unwrap();

    let dumps = introspection::dump_all(&lib.db).await.unwrap();
    let borrowings = dumps.iter().find(|d| d.table == "borrowings").unwrap();
    assert_eq!(borrowings.rows.len(), 1);
    assert!(borrowings.rows[0].contains(&"NULL".to_string()));

    let items = dumps.iter().find(|d| d.table == "items").unwrap();
    assert_eq!(items.rows.len(), 10);
}
