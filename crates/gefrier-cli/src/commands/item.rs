//! Item command handlers

use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate, Utc};

use gefrier_core::expiry::{expiry_from_date, local_midnight, sort_for_display};
use gefrier_core::models::clamp_quantity;
use gefrier_core::{Item, NewItem, Store};

use super::{drawer, pick};
use crate::output::Output;

/// Input for `item add`
pub struct AddArgs {
    pub drawer: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub expires: Option<NaiveDate>,
}

/// List items of a drawer, or all items carrying a tag
pub async fn list(
    store: &Store,
    drawer: Option<String>,
    tag: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut items = match (drawer, tag) {
        (Some(drawer), tag) => {
            let drawer = drawer::resolve(store, &drawer).await?;
            let mut items = store.list_items(&drawer.id).await?;
            if let Some(tag) = tag {
                items.retain(|i| i.has_tag(&tag));
            }
            items
        }
        (None, Some(tag)) => store.items_with_tag(&tag).await?,
        (None, None) => bail!("Give a drawer or --tag to list items."),
    };

    sort_for_display(&mut items, Utc::now());
    output.print_items(&items);
    Ok(())
}

/// Add an item to a drawer
pub async fn add(store: &Store, args: AddArgs, output: &Output) -> Result<()> {
    let drawer = drawer::resolve(store, &args.drawer).await?;

    let new_item = NewItem::new(&drawer.id, args.name)
        .quantity(clamp_quantity(args.quantity))
        .unit(args.unit)
        .tags(args.tags)
        .notes(args.notes.unwrap_or_default())
        .expiry_date(args.expires.map(expiry_from_date));

    let item = store
        .add_item(new_item)
        .await
        .context("Failed to add item")?;

    output.success(&format!("Added {} to {}", item.name, drawer.name));
    output.print_item(&item);
    Ok(())
}

/// Remove an item
pub async fn delete(store: &Store, id: String, output: &Output) -> Result<()> {
    let item = resolve(store, &id).await?;

    if !store.delete_item(&item.id).await? {
        bail!("Item not found: {}", id);
    }

    output.success(&format!("Removed {}", item.name));
    Ok(())
}

/// Items already expired or expiring within `days` days
pub async fn expiring(store: &Store, days: u32, output: &Output) -> Result<()> {
    let cutoff = local_midnight(Utc::now())
        .checked_add_days(Days::new(u64::from(days) + 1))
        .context("Day window out of range")?;

    let items = store.items_expiring_before(cutoff).await?;
    output.print_items(&items);
    Ok(())
}

/// Find an item by full id or id prefix
async fn resolve(store: &Store, query: &str) -> Result<Item> {
    if let Some(item) = store.get_item(query).await? {
        return Ok(item);
    }

    let mut items = Vec::new();
    for freezer in store.list_freezers().await? {
        for drawer in store.list_drawers(Some(&freezer.id)).await? {
            items.extend(store.list_items(&drawer.id).await?);
        }
    }
    // Names repeat too often to be a useful handle for items
    pick(items, query, "item", |i| i.id.as_str(), |_| "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use gefrier_core::seed::initialize_database;

    #[tokio::test]
    async fn test_add_clamps_quantity_and_sets_local_expiry() {
        let store = Store::open_in_memory().unwrap();
        initialize_database(&store).await.unwrap();
        let output = Output::new(OutputFormat::Quiet, 7);
        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();

        add(
            &store,
            AddArgs {
                drawer: "Fach 1".to_string(),
                name: "Erbsen".to_string(),
                quantity: 0,
                unit: "g".to_string(),
                tags: vec!["Gemüse".to_string()],
                notes: None,
                expires: Some(date),
            },
            &output,
        )
        .await
        .unwrap();

        let items = store.items_with_tag("Gemüse").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].expiry_date, Some(expiry_from_date(date)));
    }

    #[tokio::test]
    async fn test_delete_by_prefix() {
        let store = Store::open_in_memory().unwrap();
        initialize_database(&store).await.unwrap();
        let output = Output::new(OutputFormat::Quiet, 7);
        let drawer = drawer::resolve(&store, "Fach 2").await.unwrap();
        let item = store
            .add_item(NewItem::new(&drawer.id, "Brot"))
            .await
            .unwrap();

        delete(&store, item.id[..8].to_string(), &output)
            .await
            .unwrap();

        assert!(store.get_item(&item.id).await.unwrap().is_none());
    }
}
