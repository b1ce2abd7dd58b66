//! SQLite schema for the record store
//!
//! Four entity tables mirror the four collections. Timestamps are stored as
//! microseconds since the Unix epoch so range indexes sort correctly.
//! Listings that order by `sort_order` break ties on `rowid`, which grows
//! with insertion.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS freezers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- freezer_id is not a foreign key: drawers may outlive their freezer
        CREATE TABLE IF NOT EXISTS drawers (
            id TEXT PRIMARY KEY,
            freezer_id TEXT NOT NULL,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            color TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- tags holds the denormalized name list as a JSON array
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            drawer_id TEXT NOT NULL,
            name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            unit TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            notes TEXT NOT NULL DEFAULT '',
            date_added INTEGER NOT NULL,
            expiry_date INTEGER
        );

        -- Multi-entry index over items.tags (one row per tag name)
        CREATE TABLE IF NOT EXISTS item_tags (
            item_id TEXT NOT NULL,
            tag_name TEXT NOT NULL,
            PRIMARY KEY (item_id, tag_name),
            FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL
        );

        -- Indexes for common query patterns
        CREATE INDEX IF NOT EXISTS idx_freezers_sort_order ON freezers(sort_order);

        CREATE INDEX IF NOT EXISTS idx_drawers_freezer_id ON drawers(freezer_id);
        CREATE INDEX IF NOT EXISTS idx_drawers_sort_order ON drawers(sort_order);

        CREATE INDEX IF NOT EXISTS idx_items_drawer_id ON items(drawer_id);
        CREATE INDEX IF NOT EXISTS idx_items_date_added ON items(date_added);
        CREATE INDEX IF NOT EXISTS idx_items_expiry_date ON items(expiry_date);
        CREATE INDEX IF NOT EXISTS idx_item_tags_tag_name ON item_tags(tag_name);

        CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
