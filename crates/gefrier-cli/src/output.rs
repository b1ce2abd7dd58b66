//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use gefrier_core::expiry::{is_expired, is_expiring_soon};
use gefrier_core::{Drawer, DrawerStats, Freezer, ImportSummary, Item, StoreCounts, Tag};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Look-ahead window for the "expires soon" marker
    pub warning_days: u32,
}

impl Output {
    pub fn new(format: OutputFormat, warning_days: u32) -> Self {
        Self {
            format,
            warning_days,
        }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a list of freezers
    pub fn print_freezers(&self, freezers: &[Freezer]) {
        match self.format {
            OutputFormat::Human => {
                if freezers.is_empty() {
                    println!("No freezers found.");
                    return;
                }
                for freezer in freezers {
                    println!("{} | {}", short_id(&freezer.id), freezer.name);
                }
                println!("\n{} freezer(s)", freezers.len());
            }
            OutputFormat::Json => print_json(freezers),
            OutputFormat::Quiet => {
                for freezer in freezers {
                    println!("{}", freezer.id);
                }
            }
        }
    }

    /// Print the drawers of one freezer
    pub fn print_drawers(&self, freezer: &Freezer, drawers: &[Drawer]) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", freezer.name);
                if drawers.is_empty() {
                    println!("No drawers found.");
                    return;
                }
                for drawer in drawers {
                    println!(
                        "{} | {} | {}",
                        short_id(&drawer.id),
                        truncate(&drawer.name, 30),
                        drawer.color
                    );
                }
                println!("\n{} drawer(s)", drawers.len());
            }
            OutputFormat::Json => print_json(drawers),
            OutputFormat::Quiet => {
                for drawer in drawers {
                    println!("{}", drawer.id);
                }
            }
        }
    }

    /// Print a single drawer
    pub fn print_drawer(&self, drawer: &Drawer) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:      {}", drawer.id);
                println!("Name:    {}", drawer.name);
                println!("Color:   {}", drawer.color);
                println!("Created: {}", local_date(drawer.created_at, "%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(drawer),
            OutputFormat::Quiet => println!("{}", drawer.id),
        }
    }

    /// Print a list of items, already sorted for display
    pub fn print_items(&self, items: &[Item]) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No items found.");
                    return;
                }
                let now = Utc::now();
                for item in items {
                    println!("{}", self.item_line(item, now));
                }
                println!("\n{} item(s)", items.len());
            }
            OutputFormat::Json => print_json(items),
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id);
                }
            }
        }
    }

    /// Print a single item
    pub fn print_item(&self, item: &Item) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", item.id);
                println!("Name:     {}", item.name);
                println!("Quantity: {} {}", item.quantity, item.unit);
                if !item.tags.is_empty() {
                    println!("Tags:     {}", item.tags.join(", "));
                }
                if !item.notes.is_empty() {
                    println!("Notes:    {}", truncate_line(&item.notes, 60));
                }
                println!("Added:    {}", local_date(item.date_added, "%Y-%m-%d %H:%M"));
                if let Some(expiry) = item.expiry_date {
                    println!("Expires:  {}", local_date(expiry, "%Y-%m-%d"));
                }
            }
            OutputFormat::Json => print_json(item),
            OutputFormat::Quiet => println!("{}", item.id),
        }
    }

    /// Print a drawer's items with expiry counts
    pub fn print_stats(&self, drawer: &Drawer, stats: &DrawerStats) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", drawer.name);
                println!("  items:         {}", stats.item_count);
                println!("  expired:       {}", stats.expired_count);
                println!("  expiring soon: {}", stats.expiring_soon_count);
            }
            OutputFormat::Json => print_json(stats),
            OutputFormat::Quiet => println!(
                "{} {} {}",
                stats.item_count, stats.expired_count, stats.expiring_soon_count
            ),
        }
    }

    /// Print record counts for the whole store
    pub fn print_counts(&self, counts: &StoreCounts) {
        match self.format {
            OutputFormat::Human => {
                println!("Freezers: {}", counts.freezers);
                println!("Drawers:  {}", counts.drawers);
                println!("Items:    {}", counts.items);
                println!("Tags:     {}", counts.tags);
            }
            OutputFormat::Json => print_json(counts),
            OutputFormat::Quiet => println!(
                "{} {} {} {}",
                counts.freezers, counts.drawers, counts.items, counts.tags
            ),
        }
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[Tag]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for tag in tags {
                    println!("{} ({})", tag.name, tag.color);
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => print_json(tags),
            OutputFormat::Quiet => {
                for tag in tags {
                    println!("{}", tag.name);
                }
            }
        }
    }

    /// Report what an import wrote
    pub fn print_import_summary(&self, summary: &ImportSummary) {
        match self.format {
            OutputFormat::Human => println!(
                "✓ Imported {} freezer(s), {} drawer(s), {} item(s), {} tag(s)",
                summary.freezers, summary.drawers, summary.items, summary.tags
            ),
            OutputFormat::Json => print_json(summary),
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    fn item_line(&self, item: &Item, now: DateTime<Utc>) -> String {
        let expiry = match item.expiry_date {
            Some(date) if is_expired(date, now) => {
                format!("{} (expired)", local_date(date, "%Y-%m-%d"))
            }
            Some(date) if is_expiring_soon(date, now, self.warning_days) => {
                format!("{} (soon)", local_date(date, "%Y-%m-%d"))
            }
            Some(date) => local_date(date, "%Y-%m-%d"),
            None => "-".to_string(),
        };
        let tags = if item.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", item.tags.join(", "))
        };

        format!(
            "{} | {}{} | {} {} | {}",
            short_id(&item.id),
            truncate(&item.name, 30),
            tags,
            item.quantity,
            item.unit,
            expiry
        )
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

fn local_date(date: DateTime<Utc>, format: &str) -> String {
    date.with_timezone(&Local).format(format).to_string()
}

/// First eight characters of an id
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Truncate a string to max length (in characters), adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
