//! Tag command handlers

use anyhow::{Context, Result};

use gefrier_core::{Store, Tag, TagPatch};

use super::{explain, pick};
use crate::output::Output;

/// Color used when `tag add` is given none
pub const DEFAULT_TAG_COLOR: &str = "#8E8E93";

/// List all tags
pub async fn list(store: &Store, output: &Output) -> Result<()> {
    let tags = store.list_tags().await?;
    output.print_tags(&tags);
    Ok(())
}

/// Create a tag
pub async fn add(store: &Store, name: String, color: Option<String>, output: &Output) -> Result<()> {
    let color = color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());
    let tag = store.add_tag(&name, &color).await.map_err(explain)?;

    output.success(&format!("Created tag: {}", tag.name));
    Ok(())
}

/// Rename a tag; items keep the old name
pub async fn rename(store: &Store, tag: String, name: String, output: &Output) -> Result<()> {
    let tag = resolve(store, &tag).await?;

    store
        .update_tag(&tag.id, TagPatch::name(&name))
        .await
        .map_err(explain)?;

    output.success(&format!("Renamed tag '{}' to '{}'", tag.name, name));
    Ok(())
}

/// Delete a tag; items keep listing its name
pub async fn delete(store: &Store, tag: String, output: &Output) -> Result<()> {
    let tag = resolve(store, &tag).await?;

    store
        .delete_tag(&tag.id)
        .await
        .context("Failed to delete tag")?;

    output.success(&format!("Deleted tag: {}", tag.name));
    Ok(())
}

async fn resolve(store: &Store, query: &str) -> Result<Tag> {
    let tags = store.list_tags().await?;
    pick(tags, query, "tag", |t| t.id.as_str(), |t| t.name.as_str())
}
