//! Drawer command handlers

use anyhow::{Context, Result};

use gefrier_core::seed::drawer_color;
use gefrier_core::{Drawer, DrawerPatch, Store};

use super::{confirm, freezer, pick};
use crate::output::Output;

/// List the drawers of a freezer (the first freezer by default)
pub async fn list(store: &Store, freezer: Option<String>, output: &Output) -> Result<()> {
    let freezer = freezer::resolve_or_first(store, freezer.as_deref()).await?;
    let drawers = store.list_drawers(Some(&freezer.id)).await?;
    output.print_drawers(&freezer, &drawers);
    Ok(())
}

/// Add a drawer, picking the next palette color unless one is given
pub async fn add(
    store: &Store,
    name: String,
    color: Option<String>,
    freezer: Option<String>,
    output: &Output,
) -> Result<()> {
    let freezer = freezer::resolve_or_first(store, freezer.as_deref()).await?;
    let color = match color {
        Some(color) => color,
        None => {
            let existing = store.list_drawers(Some(&freezer.id)).await?.len();
            drawer_color(existing).to_string()
        }
    };

    let drawer = store
        .add_drawer(&freezer.id, &name, &color)
        .await
        .context("Failed to add drawer")?;

    output.success(&format!("Added drawer: {}", drawer.name));
    output.print_drawer(&drawer);
    Ok(())
}

/// Rename a drawer
pub async fn rename(store: &Store, drawer: String, name: String, output: &Output) -> Result<()> {
    let drawer = resolve(store, &drawer).await?;

    store
        .update_drawer(&drawer.id, DrawerPatch::name(&name))
        .await
        .context("Failed to rename drawer")?;

    output.success(&format!("Renamed drawer '{}' to '{}'", drawer.name, name));
    Ok(())
}

/// Delete a drawer together with its items
pub async fn delete(store: &Store, drawer: String, yes: bool, output: &Output) -> Result<()> {
    let drawer = resolve(store, &drawer).await?;

    if output.should_prompt() && !yes {
        let count = store.list_items(&drawer.id).await?.len();
        println!("Delete drawer: {} ({} item(s))", drawer.name, count);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = store
        .delete_drawer(&drawer.id)
        .await
        .context("Failed to delete drawer")?;

    output.success(&format!(
        "Deleted drawer '{}' and {} item(s)",
        drawer.name, removed
    ));
    Ok(())
}

/// Find a drawer in any freezer by id, id prefix, or name
pub async fn resolve(store: &Store, query: &str) -> Result<Drawer> {
    if let Some(drawer) = store.get_drawer(query).await? {
        return Ok(drawer);
    }

    let mut drawers = Vec::new();
    for freezer in store.list_freezers().await? {
        drawers.extend(store.list_drawers(Some(&freezer.id)).await?);
    }
    pick(drawers, query, "drawer", |d| d.id.as_str(), |d| d.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gefrier_core::seed::initialize_database;

    #[tokio::test]
    async fn test_resolve_by_name_and_prefix() {
        let store = Store::open_in_memory().unwrap();
        initialize_database(&store).await.unwrap();

        let by_name = resolve(&store, "fach 3").await.unwrap();
        assert_eq!(by_name.name, "Fach 3");

        let by_prefix = resolve(&store, &by_name.id[..8]).await.unwrap();
        assert_eq!(by_prefix.id, by_name.id);

        assert!(resolve(&store, "Fach 9").await.is_err());
    }
}
