//! Unified storage interface
//!
//! The `Store` is the handle every consumer receives. It wraps the SQLite
//! record store and the loaded configuration behind an `Arc`, so clones are
//! cheap and all of them see the same data and the same change feed.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open()?;
//! seed::initialize_database(&store).await?;
//!
//! let freezer = store.first_freezer().await?.context("no freezer")?;
//! let drawer = store.add_drawer(&freezer.id, "Fach 5", "#AF52DE").await?;
//! store.add_item(NewItem::new(&drawer.id, "Erbsen")).await?;
//! ```

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::Config;
use crate::expiry::{is_expired, is_expiring_soon};
use crate::models::{
    Drawer, DrawerPatch, DrawerStats, Freezer, FreezerPatch, Item, NewItem, StoreCounts,
    Tag, TagPatch,
};
use crate::storage::records;
use crate::storage::{ChangeSet, Collection, Database, StoreError, StoreResult};

/// Shared handle to the freezer inventory
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db: Database,
    config: Config,
}

impl Store {
    /// Open the store using the default configuration sources
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).context("Failed to open record store")
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        let db = Database::open(&config)?;
        Ok(Self::from_parts(db, config))
    }

    /// Open an in-memory store with default settings (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_in_memory_with_config(Config::default())
    }

    /// Open an in-memory store that still honours the given settings
    pub fn open_in_memory_with_config(config: Config) -> StoreResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_parts(db, config))
    }

    fn from_parts(db: Database, config: Config) -> Self {
        Self {
            inner: Arc::new(StoreInner { db, config }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn database(&self) -> &Database {
        &self.inner.db
    }

    /// Subscribe to change sets published after each committed write
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.inner.db.subscribe()
    }

    // ==================== Freezer Operations ====================

    /// All freezers by `order`, ties in insertion order
    pub async fn list_freezers(&self) -> StoreResult<Vec<Freezer>> {
        self.database().read(records::select_freezers).await
    }

    /// The freezer with the lowest `order`, if any
    pub async fn first_freezer(&self) -> StoreResult<Option<Freezer>> {
        self.database().read(records::select_first_freezer).await
    }

    pub async fn get_freezer(&self, id: &str) -> StoreResult<Option<Freezer>> {
        self.database()
            .read(|conn| records::select_freezer(conn, id))
            .await
    }

    /// Add a freezer at the end of the list
    pub async fn add_freezer(&self, name: &str) -> StoreResult<Freezer> {
        let name = name.to_string();
        self.database()
            .write(move |tx, changes| {
                let order = records::count(tx, Collection::Freezers)?;
                let freezer = Freezer::new(name, order);
                records::insert_freezer(tx, &freezer)?;
                changes.insert(Collection::Freezers);
                Ok(freezer)
            })
            .await
    }

    /// Merge fields into a freezer
    ///
    /// Returns `false` without writing anything when the id is unknown.
    pub async fn update_freezer(&self, id: &str, patch: FreezerPatch) -> StoreResult<bool> {
        let id = id.to_string();
        self.database()
            .write(move |tx, changes| {
                let Some(mut freezer) = records::select_freezer(tx, &id)? else {
                    debug!(id = %id, "Update of unknown freezer ignored");
                    return Ok(false);
                };
                patch.apply(&mut freezer);
                records::update_freezer(tx, &freezer)?;
                changes.insert(Collection::Freezers);
                Ok(true)
            })
            .await
    }

    // ==================== Drawer Operations ====================

    /// Drawers of a freezer by `order`; no freezer means no drawers
    pub async fn list_drawers(&self, freezer_id: Option<&str>) -> StoreResult<Vec<Drawer>> {
        let Some(freezer_id) = freezer_id else {
            return Ok(Vec::new());
        };
        self.database()
            .read(|conn| records::select_drawers(conn, freezer_id))
            .await
    }

    pub async fn get_drawer(&self, id: &str) -> StoreResult<Option<Drawer>> {
        self.database()
            .read(|conn| records::select_drawer(conn, id))
            .await
    }

    /// Add a drawer after the existing drawers of a freezer
    pub async fn add_drawer(&self, freezer_id: &str, name: &str, color: &str) -> StoreResult<Drawer> {
        let freezer_id = freezer_id.to_string();
        let name = name.to_string();
        let color = color.to_string();
        self.database()
            .write(move |tx, changes| {
                if records::select_freezer(tx, &freezer_id)?.is_none() {
                    return Err(StoreError::FreezerNotFound { id: freezer_id });
                }
                let order = records::count_drawers_in(tx, &freezer_id)?;
                let drawer = Drawer::new(freezer_id, name, color, order);
                records::insert_drawer(tx, &drawer)?;
                changes.insert(Collection::Drawers);
                Ok(drawer)
            })
            .await
    }

    /// Merge fields into a drawer
    ///
    /// Returns `false` without writing anything when the id is unknown.
    pub async fn update_drawer(&self, id: &str, patch: DrawerPatch) -> StoreResult<bool> {
        let id = id.to_string();
        self.database()
            .write(move |tx, changes| {
                let Some(mut drawer) = records::select_drawer(tx, &id)? else {
                    debug!(id = %id, "Update of unknown drawer ignored");
                    return Ok(false);
                };
                patch.apply(&mut drawer);
                records::update_drawer(tx, &drawer)?;
                changes.insert(Collection::Drawers);
                Ok(true)
            })
            .await
    }

    /// Delete a drawer and every item in it
    ///
    /// Both deletions share one transaction. Returns the number of items
    /// removed.
    pub async fn delete_drawer(&self, id: &str) -> StoreResult<usize> {
        let id = id.to_string();
        self.database()
            .write(move |tx, changes| {
                let removed = records::delete_items_in_drawer(tx, &id)?;
                if removed > 0 {
                    changes.insert(Collection::Items);
                }
                if records::delete_drawer(tx, &id)? {
                    changes.insert(Collection::Drawers);
                }
                info!(drawer = %id, items = removed, "Deleted drawer");
                Ok(removed)
            })
            .await
    }

    // ==================== Item Operations ====================

    /// Items of a drawer, in no particular order
    pub async fn list_items(&self, drawer_id: &str) -> StoreResult<Vec<Item>> {
        self.database()
            .read(|conn| records::select_items(conn, drawer_id))
            .await
    }

    pub async fn get_item(&self, id: &str) -> StoreResult<Option<Item>> {
        self.database()
            .read(|conn| records::select_item(conn, id))
            .await
    }

    /// Items listing a tag name
    pub async fn items_with_tag(&self, tag_name: &str) -> StoreResult<Vec<Item>> {
        self.database()
            .read(|conn| records::select_items_with_tag(conn, tag_name))
            .await
    }

    /// Items whose expiry date falls before `before`, soonest first
    pub async fn items_expiring_before(&self, before: DateTime<Utc>) -> StoreResult<Vec<Item>> {
        self.database()
            .read(move |conn| records::select_items_expiring_before(conn, before))
            .await
    }

    /// Store a new item, stamping its id and `date_added`
    pub async fn add_item(&self, new_item: NewItem) -> StoreResult<Item> {
        self.database()
            .write(move |tx, changes| {
                let item = new_item.into_item();
                records::insert_item(tx, &item)?;
                changes.insert(Collection::Items);
                Ok(item)
            })
            .await
    }

    /// Remove one item; `false` when the id is unknown
    pub async fn delete_item(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.database()
            .write(move |tx, changes| {
                let deleted = records::delete_item(tx, &id)?;
                if deleted {
                    changes.insert(Collection::Items);
                }
                Ok(deleted)
            })
            .await
    }

    /// Items of a drawer with expiry counts relative to now
    pub async fn drawer_stats(&self, drawer_id: &str) -> StoreResult<DrawerStats> {
        self.drawer_stats_at(drawer_id, Utc::now()).await
    }

    /// Items of a drawer with expiry counts relative to `now`
    pub async fn drawer_stats_at(
        &self,
        drawer_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<DrawerStats> {
        let items = self.list_items(drawer_id).await?;
        let warning_days = self.config().expiry_warning_days;

        let expired_count = items
            .iter()
            .filter(|i| i.expiry_date.is_some_and(|d| is_expired(d, now)))
            .count();
        let expiring_soon_count = items
            .iter()
            .filter(|i| {
                i.expiry_date
                    .is_some_and(|d| is_expiring_soon(d, now, warning_days))
            })
            .count();

        Ok(DrawerStats {
            item_count: items.len(),
            expired_count,
            expiring_soon_count,
            items,
        })
    }

    // ==================== Tag Operations ====================

    /// All tags, in no particular order
    pub async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        self.database().read(records::select_tags).await
    }

    /// Create a tag; fails with `TagExists` when the name is taken
    pub async fn add_tag(&self, name: &str, color: &str) -> StoreResult<Tag> {
        let tag = Tag::new(name, color);
        self.database()
            .write(move |tx, changes| {
                records::insert_tag(tx, &tag)?;
                changes.insert(Collection::Tags);
                Ok(tag)
            })
            .await
    }

    /// Merge fields into a tag
    ///
    /// Items keep the tag names they already carry. Renaming onto a name
    /// another tag holds fails with `TagExists`.
    pub async fn update_tag(&self, id: &str, patch: TagPatch) -> StoreResult<bool> {
        let id = id.to_string();
        self.database()
            .write(move |tx, changes| {
                let Some(mut tag) = records::select_tag(tx, &id)? else {
                    debug!(id = %id, "Update of unknown tag ignored");
                    return Ok(false);
                };
                patch.apply(&mut tag);
                records::update_tag(tx, &tag)?;
                changes.insert(Collection::Tags);
                Ok(true)
            })
            .await
    }

    /// Remove a tag; items keep listing its name
    pub async fn delete_tag(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.database()
            .write(move |tx, changes| {
                let deleted = records::delete_tag(tx, &id)?;
                if deleted {
                    changes.insert(Collection::Tags);
                }
                Ok(deleted)
            })
            .await
    }

    // ==================== Stats ====================

    /// Record counts per collection
    pub async fn counts(&self) -> StoreResult<StoreCounts> {
        self.database()
            .read(|conn| {
                Ok(StoreCounts {
                    freezers: records::count(conn, Collection::Freezers)?,
                    drawers: records::count(conn, Collection::Drawers)?,
                    items: records::count(conn, Collection::Items)?,
                    tags: records::count(conn, Collection::Tags)?,
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::local_midnight;
    use chrono::Duration;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;

    async fn store_with_drawer() -> (Store, Drawer) {
        let store = Store::open_in_memory().unwrap();
        let freezer = store.add_freezer("Keller").await.unwrap();
        let drawer = store.add_drawer(&freezer.id, "Fach 1", "#007AFF").await.unwrap();
        (store, drawer)
    }

    #[tokio::test]
    async fn test_add_item_then_list() {
        let (store, drawer) = store_with_drawer().await;

        let item = store
            .add_item(
                NewItem::new(&drawer.id, "Erbsen")
                    .quantity(2)
                    .unit("Beutel")
                    .tags(vec!["Gemüse".to_string()]),
            )
            .await
            .unwrap();

        let items = store.list_items(&drawer.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], item);
        assert_eq!(items[0].tags, vec!["Gemüse"]);
        assert_eq!(store.get_item(&item.id).await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn test_delete_drawer_cascades_to_items() {
        let (store, drawer) = store_with_drawer().await;
        let freezer_id = drawer.freezer_id.clone();
        let other = store.add_drawer(&freezer_id, "Fach 2", "#34C759").await.unwrap();

        for name in ["Erbsen", "Spinat", "Brot"] {
            store.add_item(NewItem::new(&drawer.id, name)).await.unwrap();
        }
        let kept = store.add_item(NewItem::new(&other.id, "Eis")).await.unwrap();
        let before = store.counts().await.unwrap().items;

        let removed = store.delete_drawer(&drawer.id).await.unwrap();

        assert_eq!(removed, 3);
        assert_eq!(store.counts().await.unwrap().items, before - 3);
        assert!(store.list_items(&drawer.id).await.unwrap().is_empty());
        assert!(store.get_drawer(&drawer.id).await.unwrap().is_none());
        assert_eq!(store.list_items(&other.id).await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_drawers_listed_in_order() {
        let store = Store::open_in_memory().unwrap();
        let freezer = store.add_freezer("Truhe").await.unwrap();
        for name in ["A", "B", "C"] {
            store.add_drawer(&freezer.id, name, "#007AFF").await.unwrap();
        }

        let drawers = store.list_drawers(Some(&freezer.id)).await.unwrap();
        let names: Vec<&str> = drawers.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        let orders: Vec<i64> = drawers.iter().map(|d| d.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_list_drawers_without_freezer_is_empty() {
        let (store, _drawer) = store_with_drawer().await;
        assert!(store.list_drawers(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_drawer_requires_freezer() {
        let store = Store::open_in_memory().unwrap();
        let err = store.add_drawer("missing", "Fach", "#007AFF").await.unwrap_err();
        assert!(matches!(err, StoreError::FreezerNotFound { ref id } if id == "missing"));
        assert_eq!(store.counts().await.unwrap().drawers, 0);
    }

    #[tokio::test]
    async fn test_freezer_order_and_first() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.first_freezer().await.unwrap().is_none());

        let a = store.add_freezer("A").await.unwrap();
        let b = store.add_freezer("B").await.unwrap();
        assert_eq!(a.order, 0);
        assert_eq!(b.order, 1);

        // Move B to the front
        store
            .update_freezer(
                &b.id,
                FreezerPatch {
                    order: Some(-1),
                    ..FreezerPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.first_freezer().await.unwrap().unwrap().id, b.id);
        let names: Vec<String> = store
            .list_freezers()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_silent_noop() {
        let store = Store::open_in_memory().unwrap();
        let mut feed = store.subscribe();

        assert!(!store
            .update_freezer("nope", FreezerPatch::name("X"))
            .await
            .unwrap());
        assert!(!store
            .update_drawer("nope", DrawerPatch::name("X"))
            .await
            .unwrap());
        assert!(!store.update_tag("nope", TagPatch::name("X")).await.unwrap());
        assert!(!store.delete_item("nope").await.unwrap());
        assert!(!store.delete_tag("nope").await.unwrap());

        assert!(matches!(feed.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_rename_drawer() {
        let (store, drawer) = store_with_drawer().await;
        assert!(store
            .update_drawer(&drawer.id, DrawerPatch::name("Oben"))
            .await
            .unwrap());

        let renamed = store.get_drawer(&drawer.id).await.unwrap().unwrap();
        assert_eq!(renamed.name, "Oben");
        assert_eq!(renamed.color, drawer.color);
        assert_eq!(renamed.created_at, drawer.created_at);
    }

    #[tokio::test]
    async fn test_duplicate_tag_rejected() {
        let store = Store::open_in_memory().unwrap();
        store.add_tag("Fleisch", "#FF3B30").await.unwrap();

        let err = store.add_tag("Fleisch", "#000000").await.unwrap_err();
        assert!(matches!(err, StoreError::TagExists { ref name } if name == "Fleisch"));
        assert!(err.is_constraint_violation());
        assert_eq!(store.list_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_tag_onto_existing_name_fails() {
        let store = Store::open_in_memory().unwrap();
        store.add_tag("Fleisch", "#FF3B30").await.unwrap();
        let eis = store.add_tag("Eis", "#5AC8FA").await.unwrap();

        let err = store
            .update_tag(&eis.id, TagPatch::name("Fleisch"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TagExists { .. }));

        let names: Vec<String> = store
            .list_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert!(names.contains(&"Eis".to_string()));
    }

    #[tokio::test]
    async fn test_tag_changes_leave_item_names() {
        let (store, drawer) = store_with_drawer().await;
        let tag = store.add_tag("Fleisch", "#FF3B30").await.unwrap();
        let item = store
            .add_item(NewItem::new(&drawer.id, "Steak").tags(vec!["Fleisch".to_string()]))
            .await
            .unwrap();

        store
            .update_tag(&tag.id, TagPatch::name("Rind"))
            .await
            .unwrap();
        assert_eq!(
            store.get_item(&item.id).await.unwrap().unwrap().tags,
            vec!["Fleisch"]
        );

        assert!(store.delete_tag(&tag.id).await.unwrap());
        assert!(store.list_tags().await.unwrap().is_empty());
        assert_eq!(store.items_with_tag("Fleisch").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drawer_stats_midnight_boundary() {
        let (store, drawer) = store_with_drawer().await;
        let now = Utc::now();
        let midnight = local_midnight(now);

        store
            .add_item(
                NewItem::new(&drawer.id, "abgelaufen")
                    .expiry_date(Some(midnight - Duration::microseconds(1))),
            )
            .await
            .unwrap();
        store
            .add_item(NewItem::new(&drawer.id, "heute").expiry_date(Some(midnight)))
            .await
            .unwrap();
        store
            .add_item(
                NewItem::new(&drawer.id, "später").expiry_date(Some(midnight + Duration::days(60))),
            )
            .await
            .unwrap();
        store
            .add_item(NewItem::new(&drawer.id, "ohne"))
            .await
            .unwrap();

        let stats = store.drawer_stats_at(&drawer.id, now).await.unwrap();
        assert_eq!(stats.item_count, 4);
        assert_eq!(stats.items.len(), 4);
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.expiring_soon_count, 1);
    }

    #[tokio::test]
    async fn test_drawer_stats_honours_warning_window() {
        let config = Config {
            expiry_warning_days: 90,
            ..Config::default()
        };
        let store = Store::open_in_memory_with_config(config).unwrap();
        let freezer = store.add_freezer("F").await.unwrap();
        let drawer = store.add_drawer(&freezer.id, "D", "#007AFF").await.unwrap();
        let now = Utc::now();

        store
            .add_item(
                NewItem::new(&drawer.id, "später")
                    .expiry_date(Some(local_midnight(now) + Duration::days(60))),
            )
            .await
            .unwrap();

        let stats = store.drawer_stats_at(&drawer.id, now).await.unwrap();
        assert_eq!(stats.expiring_soon_count, 1);
    }

    #[tokio::test]
    async fn test_items_expiring_before() {
        let (store, drawer) = store_with_drawer().await;
        let now = Utc::now();
        store
            .add_item(NewItem::new(&drawer.id, "bald").expiry_date(Some(now + Duration::days(1))))
            .await
            .unwrap();
        store
            .add_item(NewItem::new(&drawer.id, "fern").expiry_date(Some(now + Duration::days(100))))
            .await
            .unwrap();

        let soon = store
            .items_expiring_before(now + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].name, "bald");
    }

    #[tokio::test]
    async fn test_writes_publish_touched_collections() {
        let (store, drawer) = store_with_drawer().await;
        let mut feed = store.subscribe();

        store.add_item(NewItem::new(&drawer.id, "x")).await.unwrap();
        store.delete_drawer(&drawer.id).await.unwrap();

        assert_eq!(feed.recv().await.unwrap(), ChangeSet::of(&[Collection::Items]));
        assert_eq!(
            feed.recv().await.unwrap(),
            ChangeSet::of(&[Collection::Drawers, Collection::Items])
        );
    }

    #[tokio::test]
    async fn test_store_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());

        let drawer_id = {
            let store = Store::open_with_config(config.clone()).unwrap();
            let freezer = store.add_freezer("Keller").await.unwrap();
            let drawer = store.add_drawer(&freezer.id, "Fach 1", "#007AFF").await.unwrap();
            store.add_item(NewItem::new(&drawer.id, "Erbsen")).await.unwrap();
            drawer.id
        };

        let store = Store::open_with_config(config).unwrap();
        assert_eq!(store.list_items(&drawer_id).await.unwrap().len(), 1);
        assert_eq!(store.counts().await.unwrap().freezers, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = Store::open_in_memory().unwrap();
        let clone = store.clone();
        clone.add_freezer("Keller").await.unwrap();
        assert_eq!(store.list_freezers().await.unwrap().len(), 1);
    }
}
