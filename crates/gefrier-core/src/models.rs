//! Data models for Gefrier
//!
//! Defines the four entity records (Freezer, Drawer, Item, Tag), the patch
//! structs used for in-place field merges, and derived query results.
//! Field names serialize in camelCase to match the snapshot file format.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Units offered when adding an item
pub const UNITS: [&str; 6] = ["Stück", "g", "kg", "Packung", "Beutel", "Dose"];

/// Unit used when none is given
pub const DEFAULT_UNIT: &str = "Stück";

/// Generate a fresh opaque record id
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time at the precision the store keeps (microseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Clamp a requested quantity to the minimum of 1
pub fn clamp_quantity(quantity: i64) -> i64 {
    quantity.max(1)
}

/// The root container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Freezer {
    pub id: String,
    pub name: String,
    /// Display rank, a sort key only (gaps allowed)
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl Freezer {
    /// Create a freezer with a fresh id
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            order,
            created_at: now(),
        }
    }
}

/// A drawer inside one freezer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Drawer {
    pub id: String,
    pub freezer_id: String,
    pub name: String,
    /// Rank within the owning freezer
    pub order: i64,
    /// Swatch identifier, e.g. `#007AFF`
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Drawer {
    /// Create a drawer with a fresh id
    pub fn new(
        freezer_id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            id: new_id(),
            freezer_id: freezer_id.into(),
            name: name.into(),
            order,
            color: color.into(),
            created_at: now(),
        }
    }
}

/// A stored item
///
/// `tags` holds tag *names*, not ids. Deleting or renaming a `Tag` leaves
/// these strings as they are.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub drawer_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub date_added: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Item {
    /// Check whether the item carries a tag name
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }
}

/// A global tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    /// Unique across all tags
    pub name: String,
    pub color: String,
}

impl Tag {
    /// Create a tag with a fresh id
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Input for adding an item
///
/// The quantity is stored as given; callers clamp with [`clamp_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub drawer_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl NewItem {
    /// One piece of `name`, no tags, no notes, no expiry
    pub fn new(drawer_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            drawer_id: drawer_id.into(),
            name: name.into(),
            quantity: 1,
            unit: DEFAULT_UNIT.to_string(),
            tags: Vec::new(),
            notes: String::new(),
            expiry_date: None,
        }
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn expiry_date(mut self, expiry_date: Option<DateTime<Utc>>) -> Self {
        self.expiry_date = expiry_date;
        self
    }

    /// Build the record, stamping a fresh id and `date_added`
    pub(crate) fn into_item(self) -> Item {
        Item {
            id: new_id(),
            drawer_id: self.drawer_id,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            tags: self.tags,
            notes: self.notes,
            date_added: now(),
            expiry_date: self.expiry_date.map(|d| d.trunc_subsecs(6)),
        }
    }
}

/// Field merge for a freezer; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezerPatch {
    pub name: Option<String>,
    pub order: Option<i64>,
}

impl FreezerPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn apply(self, freezer: &mut Freezer) {
        if let Some(name) = self.name {
            freezer.name = name;
        }
        if let Some(order) = self.order {
            freezer.order = order;
        }
    }
}

/// Field merge for a drawer; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawerPatch {
    pub name: Option<String>,
    pub order: Option<i64>,
    pub color: Option<String>,
}

impl DrawerPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn apply(self, drawer: &mut Drawer) {
        if let Some(name) = self.name {
            drawer.name = name;
        }
        if let Some(order) = self.order {
            drawer.order = order;
        }
        if let Some(color) = self.color {
            drawer.color = color;
        }
    }
}

/// Field merge for a tag; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl TagPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn apply(self, tag: &mut Tag) {
        if let Some(name) = self.name {
            tag.name = name;
        }
        if let Some(color) = self.color {
            tag.color = color;
        }
    }
}

/// Items of one drawer with derived counts
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawerStats {
    pub items: Vec<Item>,
    pub item_count: usize,
    /// Items whose expiry date lies strictly before today's local midnight
    pub expired_count: usize,
    /// Items expiring between today and the configured warning window
    pub expiring_soon_count: usize,
}

/// Record counts per collection
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreCounts {
    pub freezers: i64,
    pub drawers: i64,
    pub items: i64,
    pub tags: i64,
}

impl StoreCounts {
    pub fn is_empty(&self) -> bool {
        self.freezers == 0 && self.drawers == 0 && self.items == 0 && self.tags == 0
    }
}
