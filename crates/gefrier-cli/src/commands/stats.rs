//! Stats command handler

use anyhow::Result;

use gefrier_core::Store;

use super::drawer;
use crate::output::Output;

/// Show expiry counts for a drawer, or record counts for the whole store
pub async fn show(store: &Store, drawer: Option<String>, output: &Output) -> Result<()> {
    match drawer {
        Some(query) => {
            let drawer = drawer::resolve(store, &query).await?;
            let stats = store.drawer_stats(&drawer.id).await?;
            output.print_stats(&drawer, &stats);
        }
        None => {
            let counts = store.counts().await?;
            output.print_counts(&counts);
        }
    }
    Ok(())
}
