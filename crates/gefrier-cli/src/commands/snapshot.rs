//! Init, backup and reset command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use gefrier_core::seed::{self, SeedOutcome};
use gefrier_core::snapshot::{export_json, import_json, write_backup, write_file};
use gefrier_core::Store;

use super::{confirm, explain};
use crate::output::Output;

/// Seed the default freezer, drawers and tags into an empty store
pub async fn init(store: &Store, output: &Output) -> Result<()> {
    match seed::initialize_database(store).await? {
        SeedOutcome::Seeded { .. } => {
            output.success("Created default freezer with 4 drawers and default tags")
        }
        SeedOutcome::AlreadyInitialized => output.message("Already initialized."),
    }
    Ok(())
}

/// Export every record as JSON
///
/// Writes to `path` if given, into the backup directory with `backup`,
/// and to stdout otherwise.
pub async fn export(
    store: &Store,
    path: Option<PathBuf>,
    backup: bool,
    output: &Output,
) -> Result<()> {
    if backup {
        let dir = store.config().backup_dir();
        let written = write_backup(store, &dir).await.map_err(explain)?;
        output.success(&format!("Wrote backup to {}", written.display()));
        return Ok(());
    }

    let json = export_json(store).await?;
    match path {
        Some(path) => {
            write_file(&path, json.as_bytes()).map_err(explain)?;
            output.success(&format!("Exported to {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Replace all data with the contents of a backup file
pub async fn import(store: &Store, file: PathBuf, yes: bool, output: &Output) -> Result<()> {
    let json = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read backup file: {:?}", file))?;

    if output.should_prompt() && !yes {
        println!("Importing replaces every freezer, drawer, item and tag.");
        if !confirm("Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let summary = import_json(store, &json).await.map_err(explain)?;
    output.print_import_summary(&summary);
    Ok(())
}

/// Delete everything and seed the defaults again
pub async fn reset(store: &Store, yes: bool, output: &Output) -> Result<()> {
    if output.should_prompt() && !yes {
        println!("This deletes all freezers, drawers, items and tags.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    seed::reset_database(store)
        .await
        .context("Failed to reset data")?;

    output.success("Reset to defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use gefrier_core::NewItem;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_to_file_then_import() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup.json");
        let output = Output::new(OutputFormat::Quiet, 7);

        let source = Store::open_in_memory().unwrap();
        seed::initialize_database(&source).await.unwrap();
        let freezer = source.first_freezer().await.unwrap().unwrap();
        let drawer = source.list_drawers(Some(&freezer.id)).await.unwrap().remove(0);
        source
            .add_item(NewItem::new(&drawer.id, "Erbsen"))
            .await
            .unwrap();
        export(&source, Some(path.clone()), false, &output)
            .await
            .unwrap();

        let target = Store::open_in_memory().unwrap();
        import(&target, path, true, &output).await.unwrap();

        assert_eq!(target.counts().await.unwrap(), source.counts().await.unwrap());
    }

    #[tokio::test]
    async fn test_import_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{\"freezers\": []}").unwrap();
        let output = Output::new(OutputFormat::Quiet, 7);

        let store = Store::open_in_memory().unwrap();
        seed::initialize_database(&store).await.unwrap();
        let before = store.counts().await.unwrap();

        let err = import(&store, path, true, &output).await.unwrap_err();
        assert!(err.to_string().contains("Malformed snapshot"));
        assert_eq!(store.counts().await.unwrap(), before);
    }
}
