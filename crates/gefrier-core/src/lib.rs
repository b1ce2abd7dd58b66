//! Gefrier Core Library
//!
//! This crate provides the local data layer for Gefrier, a freezer
//! inventory: freezers contain drawers, drawers contain items, and items
//! carry free-form tag names.
//!
//! # Architecture
//!
//! - **SQLite**: single source of truth, one connection, one transaction
//!   per mutation
//! - **Change feed**: every committed write publishes the collections it
//!   touched; live queries re-run when their collections change
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//! seed::initialize_database(&store).await?;
//!
//! let freezer = store.first_freezer().await?;
//! let drawers = store.list_drawers(freezer.as_ref().map(|f| f.id.as_str())).await?;
//!
//! // Keep a drawer's items current
//! let items = live::items(&store, drawers[0].id.clone());
//! let mut rx = items.subscribe();
//! ```
//!
//! # Modules
//!
//! - `store`: Query and mutation API (main entry point)
//! - `models`: Freezer, Drawer, Item and Tag records
//! - `live`: Live queries over the change feed
//! - `seed`: First-run defaults and reset
//! - `snapshot`: JSON backup export and import
//! - `expiry`: Local-day expiry rules and display ordering
//! - `storage`: SQLite schema, transactions and row codecs
//! - `config`: Application configuration

pub mod config;
pub mod expiry;
pub mod live;
pub mod models;
pub mod seed;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use config::Config;
pub use live::{LiveQuery, LiveState};
pub use models::{
    Drawer, DrawerPatch, DrawerStats, Freezer, FreezerPatch, Item, NewItem, StoreCounts, Tag,
    TagPatch,
};
pub use seed::SeedOutcome;
pub use snapshot::{ImportSummary, Snapshot};
pub use storage::{ChangeSet, Collection, StoreError, StoreResult};
pub use store::Store;
