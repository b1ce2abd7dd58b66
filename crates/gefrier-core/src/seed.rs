//! First-run defaults
//!
//! An empty store gets one freezer with four drawers and the default tag
//! set. The emptiness check and the inserts share one transaction, so two
//! concurrent initializations still yield exactly one default freezer.

use rusqlite::Connection;
use tracing::info;

use crate::models::{Drawer, Freezer, Tag};
use crate::storage::records;
use crate::storage::{ChangeSet, Collection, StoreResult};
use crate::store::Store;

/// Name of the freezer created on first run
pub const DEFAULT_FREEZER_NAME: &str = "Mein Gefrierschrank";

/// Number of drawers created on first run
pub const DEFAULT_DRAWER_COUNT: usize = 4;

/// Drawer swatches, assigned in rotation
pub const DRAWER_COLORS: [&str; 8] = [
    "#007AFF", "#34C759", "#FF9500", "#FF3B30", "#AF52DE", "#5AC8FA", "#FF2D55", "#FFCC00",
];

/// Tags created on first run, as (name, color)
pub const DEFAULT_TAGS: [(&str, &str); 6] = [
    ("Fleisch", "#FF3B30"),
    ("Gemüse", "#34C759"),
    ("Brot", "#FF9500"),
    ("Fertiggerichte", "#007AFF"),
    ("Eis", "#5AC8FA"),
    ("Sonstiges", "#8E8E93"),
];

/// Swatch for the drawer at a given position
pub fn drawer_color(index: usize) -> &'static str {
    DRAWER_COLORS[index % DRAWER_COLORS.len()]
}

/// Result of a seeding attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Defaults were written; carries the new freezer's id
    Seeded { freezer_id: String },
    /// The store already had a freezer; nothing was written
    AlreadyInitialized,
}

impl SeedOutcome {
    pub fn was_seeded(&self) -> bool {
        matches!(self, SeedOutcome::Seeded { .. })
    }
}

/// Seed the defaults if the store has no freezer yet
pub async fn initialize_database(store: &Store) -> StoreResult<SeedOutcome> {
    store
        .database()
        .write(|tx, changes| {
            if records::count(tx, Collection::Freezers)? > 0 {
                return Ok(SeedOutcome::AlreadyInitialized);
            }
            let freezer_id = insert_defaults(tx, changes)?;
            info!(freezer = %freezer_id, "Seeded default freezer");
            Ok(SeedOutcome::Seeded { freezer_id })
        })
        .await
}

/// Clear every collection and seed the defaults again, in one transaction
pub async fn reset_database(store: &Store) -> StoreResult<String> {
    store
        .database()
        .write(|tx, changes| {
            records::clear_all(tx)?;
            *changes = ChangeSet::all();
            let freezer_id = insert_defaults(tx, changes)?;
            info!(freezer = %freezer_id, "Reset store to defaults");
            Ok(freezer_id)
        })
        .await
}

fn insert_defaults(conn: &Connection, changes: &mut ChangeSet) -> StoreResult<String> {
    let freezer = Freezer::new(DEFAULT_FREEZER_NAME, 0);
    records::insert_freezer(conn, &freezer)?;
    changes.insert(Collection::Freezers);

    for index in 0..DEFAULT_DRAWER_COUNT {
        let drawer = Drawer::new(
            &freezer.id,
            format!("Fach {}", index + 1),
            drawer_color(index),
            index as i64,
        );
        records::insert_drawer(conn, &drawer)?;
    }
    changes.insert(Collection::Drawers);

    // Tags may survive on their own (e.g. an import with no freezers)
    for (name, color) in DEFAULT_TAGS {
        if records::tag_name_exists(conn, name)? {
            continue;
        }
        records::insert_tag(conn, &Tag::new(name, color))?;
        changes.insert(Collection::Tags);
    }

    Ok(freezer.id)
}
