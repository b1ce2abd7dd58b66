//! Watch command handler
//!
//! Prints a drawer's contents and counts, then prints them again after
//! every change until interrupted.

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use gefrier_core::expiry::sort_for_display;
use gefrier_core::{live, LiveState, Store};

use super::drawer;
use crate::output::Output;

/// Follow a drawer until Ctrl-C
pub async fn watch(store: &Store, drawer: String, output: &Output) -> Result<()> {
    let drawer = drawer::resolve(store, &drawer).await?;
    let live_stats = live::drawer_stats(store, drawer.id.clone());
    let mut rx = live_stats.subscribe();

    output.message(&format!("Watching {} (Ctrl-C to stop)", drawer.name));

    loop {
        let state = rx.borrow_and_update().clone();
        match state {
            LiveState::Loading => {}
            LiveState::Ready(mut stats) => {
                sort_for_display(&mut stats.items, Utc::now());
                output.print_stats(&drawer, &stats);
                if !output.is_json() {
                    output.print_items(&stats.items);
                    println!();
                }
            }
            LiveState::Failed(message) => eprintln!("⚠ {}", message),
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Watch interrupted");
                break;
            }
        }
    }

    Ok(())
}
