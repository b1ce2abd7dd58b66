//! Freezer command handlers

use anyhow::{Context, Result};

use gefrier_core::{Freezer, FreezerPatch, Store};

use super::pick;
use crate::output::Output;

/// List all freezers
pub async fn list(store: &Store, output: &Output) -> Result<()> {
    let freezers = store.list_freezers().await?;
    output.print_freezers(&freezers);
    Ok(())
}

/// Rename a freezer
pub async fn rename(store: &Store, freezer: String, name: String, output: &Output) -> Result<()> {
    let freezer = resolve(store, &freezer).await?;

    store
        .update_freezer(&freezer.id, FreezerPatch::name(&name))
        .await
        .context("Failed to rename freezer")?;

    output.success(&format!("Renamed freezer '{}' to '{}'", freezer.name, name));
    Ok(())
}

/// Find a freezer by id, id prefix, or name
pub async fn resolve(store: &Store, query: &str) -> Result<Freezer> {
    let freezers = store.list_freezers().await?;
    pick(freezers, query, "freezer", |f| f.id.as_str(), |f| f.name.as_str())
}

/// The freezer named on the command line, or the first one
pub async fn resolve_or_first(store: &Store, query: Option<&str>) -> Result<Freezer> {
    match query {
        Some(query) => resolve(store, query).await,
        None => store
            .first_freezer()
            .await?
            .context("No freezer found. Run `gefrier init` first."),
    }
}
