//! Storage layer
//!
//! Handles SQLite persistence of the four collections and the change feed.
//!
//! ## Architecture
//!
//! - **Database**: one connection, serialized transactions, post-commit
//!   change sets on a broadcast channel
//! - **Records**: row codecs and SQL for each collection
//!
//! Every mutation runs inside `Database::write`, so a failed multi-record
//! operation leaves no partial effects behind.

pub mod database;
pub mod error;
pub(crate) mod records;
pub mod schema;

pub use database::{ChangeSet, Collection, Database};
pub use error::{StoreError, StoreResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
