//! `boardsync checkpoint` — inspect or reset the checkpoint store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use boardsync_core::CheckpointStore;

use super::{load_config, open_store};
use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum CheckpointCommand {
    /// Show every checkpoint key and its value.
    List(ListArgs),
    /// Delete every checkpoint for the configured customer.
    Clear,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct CheckpointRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "value")]
    value: String,
}

pub fn run(command: CheckpointCommand, global: &GlobalArgs) -> Result<()> {
    let cfg = load_config(global)?;
    let store = open_store(&cfg)?;

    match command {
        CheckpointCommand::List(args) => {
            let mut entries = Vec::new();
            for key in store.keys().context("failed to list checkpoints")? {
                if let Some(value) = store.get(&key).context("failed to read checkpoint")? {
                    entries.push((key, value));
                }
            }

            if args.json {
                let payload: serde_json::Map<String, Value> = entries.into_iter().collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload).context("failed to serialize checkpoints")?
                );
                return Ok(());
            }

            if entries.is_empty() {
                println!("No checkpoints in {}.", store.path().display());
                return Ok(());
            }
            let rows: Vec<CheckpointRow> = entries
                .into_iter()
                .map(|(key, value)| CheckpointRow {
                    value: describe(&key, &value),
                    key,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        CheckpointCommand::Clear => {
            let count = store.keys().context("failed to list checkpoints")?.len();
            store.clear().context("failed to clear checkpoints")?;
            store
                .flush()
                .with_context(|| format!("failed to save {}", store.path().display()))?;
            println!("Cleared {count} checkpoints from {}.", store.path().display());
        }
    }
    Ok(())
}

/// Human form of a checkpoint value: sprint markers are export timestamps,
/// board lists are shown comma-separated.
fn describe(key: &str, value: &Value) -> String {
    if key.starts_with("sprint_") {
        if let Some(at) = value.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis) {
            return format!("exported {}", at.to_rfc3339());
        }
    }
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sprint_markers_render_as_timestamps() {
        let text = describe("sprint_7", &json!(0));
        assert_eq!(text, "exported 1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn board_lists_render_comma_separated() {
        assert_eq!(describe("boardlist", &json!(["1", "2"])), "1, 2");
        assert_eq!(describe("other", &json!(true)), "true");
    }
}
