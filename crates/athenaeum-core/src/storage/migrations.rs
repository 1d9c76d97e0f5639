//! Database migrations
//!
//! This module manages SQLite schema migrations for the library store.
//! Migrations are versioned and applied automatically on database connection.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Initial library schema
const MIGRATION_V1: &str = r#"
    -- Library members
    CREATE TABLE IF NOT EXISTS members (
        member_id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        email TEXT,
        status TEXT NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Inactive')),
        joined_on TEXT
    );

    -- Catalog items
    CREATE TABLE IF NOT EXISTS items (
        item_id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        item_type TEXT NOT NULL CHECK (item_type IN (
            'Print Book', 'Online Book', 'Magazine', 'Journal', 'CD', 'Record'
        )),
        genre TEXT,
        publication_date TEXT,
        location TEXT,
        isbn TEXT,
        reference_only INTEGER NOT NULL DEFAULT 0 CHECK (reference_only IN (0, 1))
    );

    CREATE INDEX IF NOT EXISTS idx_items_title ON items(title);
    CREATE INDEX IF NOT EXISTS idx_items_isbn ON items(isbn);

    CREATE TABLE IF NOT EXISTS authors (
        author_id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS item_authors (
        item_id INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
        author_id INTEGER NOT NULL REFERENCES authors(author_id) ON DELETE CASCADE,
        PRIMARY KEY (item_id, author_id)
    );

    -- Loans; fine_amount is assessed externally and read back on return
    CREATE TABLE IF NOT EXISTS borrowings (
        borrowing_id INTEGER PRIMARY KEY AUTOINCREMENT,
        member_id INTEGER NOT NULL REFERENCES members(member_id),
        item_id INTEGER NOT NULL REFERENCES items(item_id),
        borrow_date TEXT NOT NULL,
        due_date TEXT NOT NULL,
        return_date TEXT,
        fine_amount REAL NOT NULL DEFAULT 0 CHECK (fine_amount >= 0)
    );

    CREATE INDEX IF NOT EXISTS idx_borrowings_member_id ON borrowings(member_id);
    CREATE INDEX IF NOT EXISTS idx_borrowings_item_id ON borrowings(item_id);

    -- Running fine balance, one row per member
    CREATE TABLE IF NOT EXISTS fines (
        fine_id INTEGER PRIMARY KEY AUTOINCREMENT,
        member_id INTEGER NOT NULL UNIQUE REFERENCES members(member_id),
        total_fine REAL NOT NULL DEFAULT 0 CHECK (total_fine >= 0)
    );

    CREATE TABLE IF NOT EXISTS donations (
        donation_id INTEGER PRIMARY KEY AUTOINCREMENT,
        member_id INTEGER NOT NULL REFERENCES members(member_id),
        item_id INTEGER NOT NULL REFERENCES items(item_id),
        donation_date TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS social_rooms (
        social_room_id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_name TEXT NOT NULL,
        capacity INTEGER NOT NULL DEFAULT 0 CHECK (capacity >= 0)
    );

    CREATE TABLE IF NOT EXISTS events (
        event_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        event_date TEXT NOT NULL,
        event_time TEXT,
        social_room_id INTEGER NOT NULL REFERENCES social_rooms(social_room_id),
        max_capacity INTEGER NOT NULL CHECK (max_capacity >= 0),
        current_attendees INTEGER NOT NULL DEFAULT 0
            CHECK (current_attendees >= 0 AND current_attendees <= max_capacity),
        description TEXT,
        recommended_audience TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_events_name ON events(name);

    CREATE TABLE IF NOT EXISTS event_members (
        event_id INTEGER NOT NULL REFERENCES events(event_id),
        member_id INTEGER NOT NULL REFERENCES members(member_id),
        registration_date TEXT NOT NULL,
        PRIMARY KEY (event_id, member_id)
    );

    CREATE TABLE IF NOT EXISTS event_volunteers (
        event_id INTEGER NOT NULL REFERENCES events(event_id),
        member_id INTEGER NOT NULL REFERENCES members(member_id),
        volunteer_role TEXT NOT NULL CHECK (length(trim(volunteer_role)) > 0),
        volunteer_date TEXT NOT NULL,
        PRIMARY KEY (event_id, member_id)
    );

    CREATE TABLE IF NOT EXISTS staff (
        staff_id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL DEFAULT '',
        position TEXT NOT NULL
    );
"#;

/// Migration 2: Store-level guard for the single-open-loan rule
///
/// Availability is derived from open borrowings, so the store itself must
/// refuse a second open row for the same item.
const MIGRATION_V2: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_borrowings_open_item
        ON borrowings(item_id) WHERE return_date IS NULL;

    CREATE INDEX IF NOT EXISTS idx_event_members_member_id ON event_members(member_id);
"#;

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Initial library schema");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Open borrowing guard");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}
