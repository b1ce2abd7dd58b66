//! Backup snapshots
//!
//! A snapshot is one JSON document holding all four collections:
//!
//! ```json
//! { "freezers": [...], "drawers": [...], "items": [...], "tags": [...] }
//! ```
//!
//! Record fields use camelCase and dates are ISO-8601 strings. Importing
//! replaces the whole store in one transaction; a document that fails to
//! parse, or records that conflict with each other, leave the store as it
//! was.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Drawer, Freezer, Item, Tag};
use crate::storage::records;
use crate::storage::{ChangeSet, StoreError, StoreResult};
use crate::store::Store;

/// Every record in the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub freezers: Vec<Freezer>,
    pub drawers: Vec<Drawer>,
    pub items: Vec<Item>,
    pub tags: Vec<Tag>,
}

/// Number of records written by an import
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub freezers: usize,
    pub drawers: usize,
    pub items: usize,
    pub tags: usize,
}

impl From<&Snapshot> for ImportSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            freezers: snapshot.freezers.len(),
            drawers: snapshot.drawers.len(),
            items: snapshot.items.len(),
            tags: snapshot.tags.len(),
        }
    }
}

/// Read all four collections in one consistent pass
pub async fn export_snapshot(store: &Store) -> StoreResult<Snapshot> {
    store
        .database()
        .read(|conn| {
            Ok(Snapshot {
                freezers: records::select_freezers(conn)?,
                drawers: records::select_all_drawers(conn)?,
                items: records::select_all_items(conn)?,
                tags: records::select_tags(conn)?,
            })
        })
        .await
}

/// Export the store as pretty-printed JSON
pub async fn export_json(store: &Store) -> StoreResult<String> {
    let snapshot = export_snapshot(store).await?;
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Parse a snapshot document; all four collection arrays must be present
pub fn parse_snapshot(json: &str) -> StoreResult<Snapshot> {
    serde_json::from_str(json).map_err(|e| StoreError::MalformedSnapshot {
        details: e.to_string(),
    })
}

/// Replace the contents of the store with a snapshot
pub async fn import_snapshot(store: &Store, snapshot: Snapshot) -> StoreResult<ImportSummary> {
    let summary = ImportSummary::from(&snapshot);
    store
        .database()
        .write(move |tx, changes| {
            records::clear_all(tx)?;
            for freezer in &snapshot.freezers {
                records::insert_freezer(tx, freezer)?;
            }
            for drawer in &snapshot.drawers {
                records::insert_drawer(tx, drawer)?;
            }
            for item in &snapshot.items {
                records::insert_item(tx, item)?;
            }
            for tag in &snapshot.tags {
                records::insert_tag(tx, tag)?;
            }
            *changes = ChangeSet::all();
            Ok(())
        })
        .await?;

    info!(
        freezers = summary.freezers,
        drawers = summary.drawers,
        items = summary.items,
        tags = summary.tags,
        "Imported snapshot"
    );
    Ok(summary)
}

/// Parse and import a snapshot document
pub async fn import_json(store: &Store, json: &str) -> StoreResult<ImportSummary> {
    let snapshot = parse_snapshot(json)?;
    import_snapshot(store, snapshot).await
}

/// Suggested file name for a backup taken on `date`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("gefrierschrank-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Export the store into `dir`, named after today's local date
///
/// Returns the path written.
pub async fn write_backup(store: &Store, dir: &Path) -> StoreResult<PathBuf> {
    let json = export_json(store).await?;
    let path = dir.join(backup_file_name(Local::now().date_naive()));
    write_file(&path, json.as_bytes())?;
    info!("Wrote backup to {:?}", path);
    Ok(path)
}

/// Write a file atomically (temp file in the same directory, then rename)
pub fn write_file(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let write_error = |source| StoreError::WriteError {
        path: temp_path.clone(),
        source,
    };

    let mut file = File::create(&temp_path).map_err(write_error)?;
    file.write_all(data).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;

    fs::rename(&temp_path, path).map_err(|source| StoreError::WriteError {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
