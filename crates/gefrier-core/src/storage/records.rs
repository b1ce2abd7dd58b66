//! Row-level reads and writes for the four collections
//!
//! Plain functions over a `Connection` (a `Transaction` derefs to one), so
//! the store can compose several of them inside one transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Drawer, Freezer, Item, Tag};
use crate::storage::database::Collection;
use crate::storage::error::{StoreError, StoreResult};

const FREEZER_COLUMNS: &str = "id, name, sort_order, created_at";
const DRAWER_COLUMNS: &str = "id, freezer_id, name, sort_order, color, created_at";
const ITEM_COLUMNS: &str =
    "id, drawer_id, name, quantity, unit, tags, notes, date_added, expiry_date";
const TAG_COLUMNS: &str = "id, name, color";

// ==================== Internal structs ====================

struct FreezerRow {
    id: String,
    name: String,
    sort_order: i64,
    created_at: i64,
}

impl FreezerRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            sort_order: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn hydrate(self) -> StoreResult<Freezer> {
        let created_at = decode_timestamp(Collection::Freezers, &self.id, self.created_at)?;
        Ok(Freezer {
            id: self.id,
            name: self.name,
            order: self.sort_order,
            created_at,
        })
    }
}

struct DrawerRow {
    id: String,
    freezer_id: String,
    name: String,
    sort_order: i64,
    color: String,
    created_at: i64,
}

impl DrawerRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            freezer_id: row.get(1)?,
            name: row.get(2)?,
            sort_order: row.get(3)?,
            color: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn hydrate(self) -> StoreResult<Drawer> {
        let created_at = decode_timestamp(Collection::Drawers, &self.id, self.created_at)?;
        Ok(Drawer {
            id: self.id,
            freezer_id: self.freezer_id,
            name: self.name,
            order: self.sort_order,
            color: self.color,
            created_at,
        })
    }
}

struct ItemRow {
    id: String,
    drawer_id: String,
    name: String,
    quantity: i64,
    unit: String,
    tags: String,
    notes: String,
    date_added: i64,
    expiry_date: Option<i64>,
}

impl ItemRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            drawer_id: row.get(1)?,
            name: row.get(2)?,
            quantity: row.get(3)?,
            unit: row.get(4)?,
            tags: row.get(5)?,
            notes: row.get(6)?,
            date_added: row.get(7)?,
            expiry_date: row.get(8)?,
        })
    }

    fn hydrate(self) -> StoreResult<Item> {
        let tags: Vec<String> =
            serde_json::from_str(&self.tags).map_err(|e| StoreError::InvalidRecord {
                collection: Collection::Items,
                id: self.id.clone(),
                details: format!("tags column is not a JSON string array: {}", e),
            })?;
        let date_added = decode_timestamp(Collection::Items, &self.id, self.date_added)?;
        let expiry_date = self
            .expiry_date
            .map(|micros| decode_timestamp(Collection::Items, &self.id, micros))
            .transpose()?;

        Ok(Item {
            id: self.id,
            drawer_id: self.drawer_id,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            tags,
            notes: self.notes,
            date_added,
            expiry_date,
        })
    }
}

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
    })
}

fn decode_timestamp(collection: Collection, id: &str, micros: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| StoreError::InvalidRecord {
        collection,
        id: id.to_string(),
        details: format!("timestamp {} out of range", micros),
    })
}

/// Run a query and hydrate every row
fn query_all<R, T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    from_row: fn(&Row) -> rusqlite::Result<R>,
    hydrate: fn(R) -> StoreResult<T>,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, from_row)?
        .collect::<Result<Vec<R>, _>>()?;
    rows.into_iter().map(hydrate).collect()
}

// ==================== Counts ====================

/// Count all records in a collection
pub fn count(conn: &Connection, collection: Collection) -> StoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

// ==================== Freezers ====================

/// All freezers by rank, ties in insertion order
pub fn select_freezers(conn: &Connection) -> StoreResult<Vec<Freezer>> {
    let sql = format!(
        "SELECT {} FROM freezers ORDER BY sort_order, rowid",
        FREEZER_COLUMNS
    );
    query_all(conn, &sql, [], FreezerRow::from_row, FreezerRow::hydrate)
}

pub fn select_first_freezer(conn: &Connection) -> StoreResult<Option<Freezer>> {
    let sql = format!(
        "SELECT {} FROM freezers ORDER BY sort_order, rowid LIMIT 1",
        FREEZER_COLUMNS
    );
    conn.query_row(&sql, [], FreezerRow::from_row)
        .optional()?
        .map(FreezerRow::hydrate)
        .transpose()
}

pub fn select_freezer(conn: &Connection, id: &str) -> StoreResult<Option<Freezer>> {
    let sql = format!("SELECT {} FROM freezers WHERE id = ?", FREEZER_COLUMNS);
    conn.query_row(&sql, params![id], FreezerRow::from_row)
        .optional()?
        .map(FreezerRow::hydrate)
        .transpose()
}

pub fn insert_freezer(conn: &Connection, freezer: &Freezer) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO freezers (id, name, sort_order, created_at) VALUES (?, ?, ?, ?)",
        params![
            freezer.id,
            freezer.name,
            freezer.order,
            freezer.created_at.timestamp_micros(),
        ],
    )?;
    Ok(())
}

pub fn update_freezer(conn: &Connection, freezer: &Freezer) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE freezers SET name = ?, sort_order = ? WHERE id = ?",
        params![freezer.name, freezer.order, freezer.id],
    )?;
    Ok(changed > 0)
}

// ==================== Drawers ====================

/// Drawers of one freezer by rank, ties in insertion order
pub fn select_drawers(conn: &Connection, freezer_id: &str) -> StoreResult<Vec<Drawer>> {
    let sql = format!(
        "SELECT {} FROM drawers WHERE freezer_id = ? ORDER BY sort_order, rowid",
        DRAWER_COLUMNS
    );
    query_all(
        conn,
        &sql,
        params![freezer_id],
        DrawerRow::from_row,
        DrawerRow::hydrate,
    )
}

/// Every drawer in insertion order
pub fn select_all_drawers(conn: &Connection) -> StoreResult<Vec<Drawer>> {
    let sql = format!("SELECT {} FROM drawers ORDER BY rowid", DRAWER_COLUMNS);
    query_all(conn, &sql, [], DrawerRow::from_row, DrawerRow::hydrate)
}

pub fn select_drawer(conn: &Connection, id: &str) -> StoreResult<Option<Drawer>> {
    let sql = format!("SELECT {} FROM drawers WHERE id = ?", DRAWER_COLUMNS);
    conn.query_row(&sql, params![id], DrawerRow::from_row)
        .optional()?
        .map(DrawerRow::hydrate)
        .transpose()
}

pub fn count_drawers_in(conn: &Connection, freezer_id: &str) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM drawers WHERE freezer_id = ?",
        params![freezer_id],
        |row| row.get(0),
    )?)
}

pub fn insert_drawer(conn: &Connection, drawer: &Drawer) -> StoreResult<()> {
    conn.execute(
        r#"
        INSERT INTO drawers (id, freezer_id, name, sort_order, color, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        params![
            drawer.id,
            drawer.freezer_id,
            drawer.name,
            drawer.order,
            drawer.color,
            drawer.created_at.timestamp_micros(),
        ],
    )?;
    Ok(())
}

pub fn update_drawer(conn: &Connection, drawer: &Drawer) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE drawers SET name = ?, sort_order = ?, color = ? WHERE id = ?",
        params![drawer.name, drawer.order, drawer.color, drawer.id],
    )?;
    Ok(changed > 0)
}

pub fn delete_drawer(conn: &Connection, id: &str) -> StoreResult<bool> {
    let changed = conn.execute("DELETE FROM drawers WHERE id = ?", params![id])?;
    Ok(changed > 0)
}

// ==================== Items ====================

pub fn select_items(conn: &Connection, drawer_id: &str) -> StoreResult<Vec<Item>> {
    let sql = format!("SELECT {} FROM items WHERE drawer_id = ?", ITEM_COLUMNS);
    query_all(conn, &sql, params![drawer_id], ItemRow::from_row, ItemRow::hydrate)
}

/// Every item in insertion order
pub fn select_all_items(conn: &Connection) -> StoreResult<Vec<Item>> {
    let sql = format!("SELECT {} FROM items ORDER BY rowid", ITEM_COLUMNS);
    query_all(conn, &sql, [], ItemRow::from_row, ItemRow::hydrate)
}

pub fn select_item(conn: &Connection, id: &str) -> StoreResult<Option<Item>> {
    let sql = format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS);
    conn.query_row(&sql, params![id], ItemRow::from_row)
        .optional()?
        .map(ItemRow::hydrate)
        .transpose()
}

/// Items carrying a tag name, via the multi-entry tag index
pub fn select_items_with_tag(conn: &Connection, tag_name: &str) -> StoreResult<Vec<Item>> {
    let sql = format!(
        r#"
        SELECT {} FROM items
        WHERE id IN (SELECT item_id FROM item_tags WHERE tag_name = ?)
        ORDER BY rowid
        "#,
        ITEM_COLUMNS
    );
    query_all(conn, &sql, params![tag_name], ItemRow::from_row, ItemRow::hydrate)
}

/// Items with an expiry date strictly before `before`, soonest first
pub fn select_items_expiring_before(
    conn: &Connection,
    before: DateTime<Utc>,
) -> StoreResult<Vec<Item>> {
    let sql = format!(
        r#"
        SELECT {} FROM items
        WHERE expiry_date IS NOT NULL AND expiry_date < ?
        ORDER BY expiry_date, rowid
        "#,
        ITEM_COLUMNS
    );
    query_all(
        conn,
        &sql,
        params![before.timestamp_micros()],
        ItemRow::from_row,
        ItemRow::hydrate,
    )
}

/// Insert an item and its tag index rows
pub fn insert_item(conn: &Connection, item: &Item) -> StoreResult<()> {
    let tags = serde_json::to_string(&item.tags)?;
    conn.execute(
        r#"
        INSERT INTO items (id, drawer_id, name, quantity, unit, tags, notes, date_added, expiry_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            item.id,
            item.drawer_id,
            item.name,
            item.quantity,
            item.unit,
            tags,
            item.notes,
            item.date_added.timestamp_micros(),
            item.expiry_date.map(|d| d.timestamp_micros()),
        ],
    )?;

    // A name listed twice on one item indexes once
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO item_tags (item_id, tag_name) VALUES (?, ?)")?;
    for tag in &item.tags {
        stmt.execute(params![item.id, tag])?;
    }

    Ok(())
}

pub fn delete_item(conn: &Connection, id: &str) -> StoreResult<bool> {
    conn.execute("DELETE FROM item_tags WHERE item_id = ?", params![id])?;
    let changed = conn.execute("DELETE FROM items WHERE id = ?", params![id])?;
    Ok(changed > 0)
}

/// Delete every item of a drawer, returning how many were removed
pub fn delete_items_in_drawer(conn: &Connection, drawer_id: &str) -> StoreResult<usize> {
    conn.execute(
        "DELETE FROM item_tags WHERE item_id IN (SELECT id FROM items WHERE drawer_id = ?)",
        params![drawer_id],
    )?;
    Ok(conn.execute("DELETE FROM items WHERE drawer_id = ?", params![drawer_id])?)
}

// ==================== Tags ====================

/// Every tag in insertion order
pub fn select_tags(conn: &Connection) -> StoreResult<Vec<Tag>> {
    let sql = format!("SELECT {} FROM tags ORDER BY rowid", TAG_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map([], tag_from_row)?
        .collect::<Result<Vec<Tag>, _>>()?;
    Ok(tags)
}

pub fn select_tag(conn: &Connection, id: &str) -> StoreResult<Option<Tag>> {
    let sql = format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS);
    Ok(conn.query_row(&sql, params![id], tag_from_row).optional()?)
}

pub fn tag_name_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM tags WHERE name = ?")?;
    Ok(stmt.exists(params![name])?)
}

/// Insert a tag; a duplicate name fails with `TagExists`
pub fn insert_tag(conn: &Connection, tag: &Tag) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO tags (id, name, color) VALUES (?, ?, ?)",
        params![tag.id, tag.name, tag.color],
    )
    .map_err(|e| StoreError::from_tag_insert(e, &tag.name))?;
    Ok(())
}

pub fn update_tag(conn: &Connection, tag: &Tag) -> StoreResult<bool> {
    let changed = conn
        .execute(
            "UPDATE tags SET name = ?, color = ? WHERE id = ?",
            params![tag.name, tag.color, tag.id],
        )
        .map_err(|e| StoreError::from_tag_insert(e, &tag.name))?;
    Ok(changed > 0)
}

pub fn delete_tag(conn: &Connection, id: &str) -> StoreResult<bool> {
    let changed = conn.execute("DELETE FROM tags WHERE id = ?", params![id])?;
    Ok(changed > 0)
}

// ==================== Bulk ====================

/// Clear all data from every collection (preserving schema)
pub fn clear_all(conn: &Connection) -> StoreResult<()> {
    conn.execute("DELETE FROM item_tags", [])?;
    conn.execute("DELETE FROM items", [])?;
    conn.execute("DELETE FROM drawers", [])?;
    conn.execute("DELETE FROM freezers", [])?;
    conn.execute("DELETE FROM tags", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewItem;
    use crate::storage::schema::init_schema;
    use chrono::{Duration, TimeZone};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_item_round_trip_through_row() {
        let conn = conn();
        let expiry = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let item = NewItem::new("d1", "Spinat")
            .quantity(2)
            .unit("Packung")
            .tags(vec!["Gemüse".to_string()])
            .notes("TK")
            .expiry_date(Some(expiry))
            .into_item();

        insert_item(&conn, &item).unwrap();

        let loaded = select_item(&conn, &item.id).unwrap().unwrap();
        assert_eq!(loaded, item);
    }

    #[test]
    fn test_freezers_sorted_by_order_then_insertion() {
        let conn = conn();
        let b = Freezer::new("B", 1);
        let a1 = Freezer::new("A1", 0);
        let a2 = Freezer::new("A2", 0);
        for f in [&b, &a1, &a2] {
            insert_freezer(&conn, f).unwrap();
        }

        let names: Vec<String> = select_freezers(&conn)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["A1", "A2", "B"]);
        assert_eq!(select_first_freezer(&conn).unwrap().unwrap().name, "A1");
    }

    #[test]
    fn test_tag_index_tracks_items() {
        let conn = conn();
        let tagged = NewItem::new("d1", "Steak")
            .tags(vec!["Fleisch".to_string(), "Fleisch".to_string()])
            .into_item();
        let other = NewItem::new("d1", "Eis").into_item();
        insert_item(&conn, &tagged).unwrap();
        insert_item(&conn, &other).unwrap();

        let found = select_items_with_tag(&conn, "Fleisch").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, tagged.id);

        delete_item(&conn, &tagged.id).unwrap();
        assert!(select_items_with_tag(&conn, "Fleisch").unwrap().is_empty());
    }

    #[test]
    fn test_expiring_before_uses_range() {
        let conn = conn();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let late = NewItem::new("d", "late")
            .expiry_date(Some(base + Duration::days(5)))
            .into_item();
        let early = NewItem::new("d", "early")
            .expiry_date(Some(base))
            .into_item();
        let never = NewItem::new("d", "never").into_item();
        for item in [&late, &early, &never] {
            insert_item(&conn, item).unwrap();
        }

        let names: Vec<String> = select_items_expiring_before(&conn, base + Duration::days(10))
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn test_corrupt_tags_column_is_invalid_record() {
        let conn = conn();
        conn.execute(
            r#"INSERT INTO items (id, drawer_id, name, quantity, unit, tags, notes, date_added)
               VALUES ('bad', 'd', 'x', 1, 'g', 'not json', '', 0)"#,
            [],
        )
        .unwrap();

        let err = select_item(&conn, "bad").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidRecord {
                collection: Collection::Items,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_tag_name_is_tag_exists() {
        let conn = conn();
        insert_tag(&conn, &Tag::new("Eis", "#5AC8FA")).unwrap();
        let err = insert_tag(&conn, &Tag::new("Eis", "#000000")).unwrap_err();
        assert!(matches!(err, StoreError::TagExists { .. }));
        assert_eq!(count(&conn, Collection::Tags).unwrap(), 1);
    }

    #[test]
    fn test_clear_all() {
        let conn = conn();
        let freezer = Freezer::new("F", 0);
        insert_freezer(&conn, &freezer).unwrap();
        insert_drawer(&conn, &Drawer::new(&freezer.id, "D", "#007AFF", 0)).unwrap();
        insert_item(
            &conn,
            &NewItem::new("d", "x").tags(vec!["t".to_string()]).into_item(),
        )
        .unwrap();
        insert_tag(&conn, &Tag::new("t", "#000000")).unwrap();

        clear_all(&conn).unwrap();

        for collection in Collection::ALL {
            assert_eq!(count(&conn, collection).unwrap(), 0);
        }
    }
}
