//! Gefrier CLI
//!
//! Command-line interface for Gefrier - freezer inventory management.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gefrier_core::models::{DEFAULT_UNIT, UNITS};
use gefrier_core::{seed, Config, Store};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "gefrier")]
#[command(about = "Gefrier - Freezer inventory management")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternative config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default freezer, drawers and tags
    Init,
    /// Manage freezers
    Freezer {
        #[command(subcommand)]
        command: FreezerCommands,
    },
    /// Manage drawers
    Drawer {
        #[command(subcommand)]
        command: DrawerCommands,
    },
    /// Manage items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Show expiry counts for a drawer (or record counts for everything)
    Stats {
        /// Drawer ID prefix or name
        drawer: Option<String>,
    },
    /// Export all data as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write a dated backup into the data directory
        #[arg(long, conflicts_with = "output")]
        backup: bool,
    },
    /// Replace all data with a JSON backup
    Import {
        /// Backup file to read
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete everything and restore the defaults
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Follow a drawer and reprint it on every change
    Watch {
        /// Drawer ID prefix or name
        drawer: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum FreezerCommands {
    /// List all freezers
    #[command(alias = "ls")]
    List,
    /// Rename a freezer
    Rename {
        /// Freezer ID prefix or name
        freezer: String,
        /// New name
        name: String,
    },
}

#[derive(Subcommand)]
enum DrawerCommands {
    /// List drawers of a freezer
    #[command(alias = "ls")]
    List {
        /// Freezer ID prefix or name (defaults to the first freezer)
        #[arg(short, long)]
        freezer: Option<String>,
    },
    /// Add a drawer
    Add {
        /// Drawer name
        name: String,
        /// Color swatch, e.g. #AF52DE (defaults to the next palette color)
        #[arg(short, long)]
        color: Option<String>,
        /// Freezer ID prefix or name (defaults to the first freezer)
        #[arg(short, long)]
        freezer: Option<String>,
    },
    /// Rename a drawer
    Rename {
        /// Drawer ID prefix or name
        drawer: String,
        /// New name
        name: String,
    },
    /// Delete a drawer and all its items
    #[command(alias = "rm")]
    Delete {
        /// Drawer ID prefix or name
        drawer: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// List items of a drawer, expired first
    #[command(alias = "ls")]
    List {
        /// Drawer ID prefix or name
        drawer: Option<String>,
        /// Only items with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Add an item to a drawer
    Add {
        /// Drawer ID prefix or name
        drawer: String,
        /// Item name
        name: String,
        /// Quantity (at least 1)
        #[arg(short = 'n', long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
        /// Unit
        #[arg(short, long, default_value = DEFAULT_UNIT, value_parser = UNITS)]
        unit: String,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Expiry date (YYYY-MM-DD)
        #[arg(short, long)]
        expires: Option<NaiveDate>,
    },
    /// Remove an item
    #[command(alias = "rm")]
    Delete {
        /// Item ID (full or prefix)
        id: String,
    },
    /// List items already expired or expiring soon, soonest first
    Expiring {
        /// Look-ahead window in days (defaults to the configured warning window)
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List all tags
    #[command(alias = "ls")]
    List,
    /// Create a tag
    Add {
        /// Tag name
        name: String,
        /// Color swatch, e.g. #FF3B30
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Rename a tag (items keep the old name)
    Rename {
        /// Tag ID prefix or name
        tag: String,
        /// New name
        name: String,
    },
    /// Delete a tag (items keep the name)
    #[command(alias = "rm")]
    Delete {
        /// Tag ID prefix or name
        tag: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, expiry_warning_days, seed_on_open, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the data directory is unusable
    if let Commands::Config { command } = &cli.command {
        let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet), 0);
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let output = Output::new(
        OutputFormat::from_flags(cli.json, cli.quiet),
        config.expiry_warning_days,
    );
    let store = Store::open_with_config(config.clone()).context("Failed to open record store")?;

    // `init` reports the seeding outcome itself
    if config.seed_on_open && !matches!(cli.command, Commands::Init) {
        seed::initialize_database(&store)
            .await
            .context("Failed to seed defaults")?;
    }

    match cli.command {
        Commands::Init => commands::snapshot::init(&store, &output).await,
        Commands::Freezer { command } => handle_freezer_command(command, &store, &output).await,
        Commands::Drawer { command } => handle_drawer_command(command, &store, &output).await,
        Commands::Item { command } => handle_item_command(command, &store, &output).await,
        Commands::Tag { command } => handle_tag_command(command, &store, &output).await,
        Commands::Stats { drawer } => commands::stats::show(&store, drawer, &output).await,
        Commands::Export { output: path, backup } => {
            commands::snapshot::export(&store, path, backup, &output).await
        }
        Commands::Import { file, yes } => {
            commands::snapshot::import(&store, file, yes, &output).await
        }
        Commands::Reset { yes } => commands::snapshot::reset(&store, yes, &output).await,
        Commands::Watch { drawer } => commands::watch::watch(&store, drawer, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_freezer_command(
    command: FreezerCommands,
    store: &Store,
    output: &Output,
) -> Result<()> {
    match command {
        FreezerCommands::List => commands::freezer::list(store, output).await,
        FreezerCommands::Rename { freezer, name } => {
            commands::freezer::rename(store, freezer, name, output).await
        }
    }
}

async fn handle_drawer_command(
    command: DrawerCommands,
    store: &Store,
    output: &Output,
) -> Result<()> {
    match command {
        DrawerCommands::List { freezer } => commands::drawer::list(store, freezer, output).await,
        DrawerCommands::Add {
            name,
            color,
            freezer,
        } => commands::drawer::add(store, name, color, freezer, output).await,
        DrawerCommands::Rename { drawer, name } => {
            commands::drawer::rename(store, drawer, name, output).await
        }
        DrawerCommands::Delete { drawer, yes } => {
            commands::drawer::delete(store, drawer, yes, output).await
        }
    }
}

async fn handle_item_command(command: ItemCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        ItemCommands::List { drawer, tag } => commands::item::list(store, drawer, tag, output).await,
        ItemCommands::Add {
            drawer,
            name,
            quantity,
            unit,
            tag,
            notes,
            expires,
        } => {
            let args = commands::item::AddArgs {
                drawer,
                name,
                quantity,
                unit,
                tags: tag,
                notes,
                expires,
            };
            commands::item::add(store, args, output).await
        }
        ItemCommands::Delete { id } => commands::item::delete(store, id, output).await,
        ItemCommands::Expiring { days } => {
            let days = days.unwrap_or(store.config().expiry_warning_days);
            commands::item::expiring(store, days, output).await
        }
    }
}

async fn handle_tag_command(command: TagCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        TagCommands::List => commands::tag::list(store, output).await,
        TagCommands::Add { name, color } => commands::tag::add(store, name, color, output).await,
        TagCommands::Rename { tag, name } => commands::tag::rename(store, tag, name, output).await,
        TagCommands::Delete { tag } => commands::tag::delete(store, tag, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging when GEFRIER_LOG is set
///
/// Logs go to the configured log file, or to stderr when none is set.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("GEFRIER_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "gefrier_core={},gefrier_cli={}",
        log_level, log_level
    ));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
