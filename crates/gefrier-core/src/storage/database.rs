//! SQLite record store
//!
//! Owns the single SQLite connection. Every access goes through an async
//! FIFO mutex, so transactions run one at a time in the order they were
//! submitted. After a write commits, the set of collections it touched is
//! published on a broadcast change feed while the lock is still held, which
//! keeps publication order identical to commit order.

use std::collections::BTreeSet;
use std::fmt;

use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, trace};

use crate::config::Config;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::schema::{init_schema, needs_init};

/// Pending change sets a slow subscriber may fall behind by before it lags
const CHANGE_FEED_CAPACITY: usize = 256;

/// One of the four entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Freezers,
    Drawers,
    Items,
    Tags,
}

impl Collection {
    /// All collections, in snapshot order
    pub const ALL: [Collection; 4] = [
        Collection::Freezers,
        Collection::Drawers,
        Collection::Items,
        Collection::Tags,
    ];

    /// Name of the backing table
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Freezers => "freezers",
            Collection::Drawers => "drawers",
            Collection::Items => "items",
            Collection::Tags => "tags",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Set of collections touched by one committed transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<Collection>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A change set covering every collection (full reset)
    pub fn all() -> Self {
        Self::of(&Collection::ALL)
    }

    pub fn of(collections: &[Collection]) -> Self {
        Self(collections.iter().copied().collect())
    }

    /// Record that a collection was modified
    pub fn insert(&mut self, collection: Collection) {
        self.0.insert(collection);
    }

    pub fn contains(&self, collection: Collection) -> bool {
        self.0.contains(&collection)
    }

    /// Check whether any of the given collections changed
    pub fn intersects(&self, collections: &[Collection]) -> bool {
        collections.iter().any(|c| self.0.contains(c))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Collection> + '_ {
        self.0.iter().copied()
    }
}

/// Transactional SQLite store with a post-commit change feed
pub struct Database {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<ChangeSet>,
}

impl Database {
    /// Open or create the database file under the configured data directory
    pub fn open(config: &Config) -> StoreResult<Self> {
        let path = config.database_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("Opening record store at {:?}", path);
        let conn = Connection::open(&path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    /// Subscribe to committed change sets
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.changes.subscribe()
    }

    /// Run a read-only closure against the connection
    pub async fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().await;
        f(&conn)
    }

    /// Run a closure inside one transaction
    ///
    /// The closure records every collection it modifies in the supplied
    /// `ChangeSet`. An `Err` drops the transaction, rolling back all of its
    /// statements, and publishes nothing. On success the transaction commits
    /// and a non-empty change set is published.
    pub async fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>, &mut ChangeSet) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let mut changes = ChangeSet::new();
        let value = f(&tx, &mut changes)?;
        tx.commit()?;

        if !changes.is_empty() {
            trace!(?changes, "Publishing committed change set");
            // No receivers is fine: nobody is watching yet
            let _ = self.changes.send(changes);
        }

        Ok(value)
    }
}
