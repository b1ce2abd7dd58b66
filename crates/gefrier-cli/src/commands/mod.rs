//! Command handlers
//!
//! Records can be referenced by full id, id prefix, or (for freezers,
//! drawers and tags) by name.

pub mod config;
pub mod drawer;
pub mod freezer;
pub mod item;
pub mod snapshot;
pub mod stats;
pub mod tag;
pub mod watch;

use std::io::{self, Write};

use anyhow::{bail, Result};

use gefrier_core::StoreError;

/// Pick one record matching `query` by id, id prefix, or name
///
/// An exact id wins outright. Otherwise id prefixes and case-insensitive
/// names are both considered, and more than one hit is an error.
pub(crate) fn pick<T>(
    mut candidates: Vec<T>,
    query: &str,
    kind: &str,
    id: impl Fn(&T) -> &str,
    name: impl Fn(&T) -> &str,
) -> Result<T> {
    if let Some(pos) = candidates.iter().position(|c| id(c) == query) {
        return Ok(candidates.swap_remove(pos));
    }

    let needle = query.to_lowercase();
    let mut matches: Vec<T> = candidates
        .into_iter()
        .filter(|c| id(c).starts_with(query) || name(c).to_lowercase() == needle)
        .collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, query),
        1 => Ok(matches.remove(0)),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, query);
            for m in &matches {
                eprintln!("  {} - {}", id(m), name(m));
            }
            bail!("Ambiguous {}. Please provide more characters of the id.", kind);
        }
    }
}

/// Attach the recovery hint of a store error, if it has one
pub(crate) fn explain(error: StoreError) -> anyhow::Error {
    match error.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("{}\n{}", error, hint),
        None => error.into(),
    }
}

/// Ask for a yes/no confirmation
///
/// Returns `false` without asking when stdin is not a terminal.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
