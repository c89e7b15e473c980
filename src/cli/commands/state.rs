//! Persisted state commands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use update_overlay::db::{Database, StoredEntry, AVAILABLE_UPDATE_KEY, STORED_VERSION_KEY};

use crate::cli::output::{print_formatted, print_success, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show every stored key
    Show,

    /// Forget all stored state
    Reset,

    /// Write a stored key (e.g., "storedVersion", "availableUpdate")
    Set {
        key: String,
        value: String,
    },

    /// Remove a stored key
    Remove {
        key: String,
    },
}

#[derive(Serialize)]
struct StateResult {
    path: String,
    entries: Vec<StoredEntry>,
}

pub async fn run(command: StateCommands, format: OutputFormat, quiet: bool) -> Result<()> {
    let db = Database::open().context("Failed to open state database")?;

    match command {
        StateCommands::Show => show(&db, format),
        StateCommands::Reset => {
            let removed = db.clear()?;
            print_success(&format!("Removed {} stored key(s).", removed), quiet);
            Ok(())
        }
        StateCommands::Set { key, value } => {
            warn_unknown_key(&key);
            db.set_value(&key, &value)?;
            print_success(&format!("Set {} = {}", key, value), quiet);
            Ok(())
        }
        StateCommands::Remove { key } => {
            db.remove_value(&key)?;
            print_success(&format!("Removed {}", key), quiet);
            Ok(())
        }
    }
}

fn show(db: &Database, format: OutputFormat) -> Result<()> {
    let result = StateResult {
        path: Database::db_path()?.to_string_lossy().to_string(),
        entries: db.entries()?,
    };

    print_formatted(&result, format, format_state);
    Ok(())
}

fn warn_unknown_key(key: &str) {
    if key != AVAILABLE_UPDATE_KEY && key != STORED_VERSION_KEY {
        tracing::warn!("{} is not read by the update engine", key);
    }
}

fn format_state(result: &StateResult) -> String {
    let mut lines = vec![format!("Database: {}", result.path)];

    if result.entries.is_empty() {
        lines.push("No stored state.".to_string());
    }

    for entry in &result.entries {
        lines.push(format!(
            "  {:<16} {:<12} (updated {})",
            entry.key,
            entry.value,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    lines.join("\n")
}
