//! `pgrid checklist` - checklist database management.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use paramgrid_io::import_checklist_csv;
use paramgrid_qc::ChecklistItem;

use crate::context::Context;
use crate::{print_json, CliError};

#[derive(Subcommand)]
pub enum ChecklistCommands {
    /// Create the checklist database if it does not exist
    Init,

    /// Import checklist items from a CSV file
    #[command(after_help = "\
Columns: item_name (required), module, part, spec_min, spec_max,
expected_value, category, is_active

Examples:
  pgrid checklist import checklist.csv")]
    Import {
        file: PathBuf,
    },

    /// List checklist items
    List {
        /// Include inactive items
        #[arg(long)]
        all: bool,
    },

    /// Migrate a legacy (item_name keyed) database to the (module, part, item) schema
    Migrate,

    /// Restore the most recent pre-migration snapshot
    Rollback,

    /// Delete migration snapshots older than the retention period
    Prune {
        /// Retention in days (defaults to checklist.snapshot_retention_days)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Serialize)]
struct InitOutput {
    database: String,
    schema_version: u32,
    items: usize,
}

fn describe_item(item: &ChecklistItem) -> String {
    let mut rule = Vec::new();
    if let Some(min) = item.spec_min {
        rule.push(format!("min={min}"));
    }
    if let Some(max) = item.spec_max {
        rule.push(format!("max={max}"));
    }
    if let Some(expected) = &item.expected_value {
        rule.push(format!("expected={expected}"));
    }
    format!(
        "{}\t{}\t{}",
        item.key(),
        if rule.is_empty() { "-".to_string() } else { rule.join(" ") },
        if item.is_active { "" } else { "inactive" }
    )
}

pub fn cmd_checklist(
    ctx: &Context,
    cmd: ChecklistCommands,
    database: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    if !matches!(cmd, ChecklistCommands::List { .. }) {
        ctx.require(ctx.caps.can_edit_checklist, "edit the checklist")?;
    }
    let mut store = ctx.open_store(database.as_deref())?;

    match cmd {
        ChecklistCommands::Init => {
            let out = InitOutput {
                database: database
                    .unwrap_or_else(|| ctx.settings.checklist_database())
                    .display()
                    .to_string(),
                schema_version: store.schema_version().map_err(CliError::store)?,
                items: store.count().map_err(CliError::store)?,
            };
            if json {
                print_json(&out)?;
            } else {
                println!("{} (schema v{}, {} item(s))", out.database, out.schema_version, out.items);
            }
        }
        ChecklistCommands::Import { file } => {
            let summary = import_checklist_csv(&mut store, &file, &ctx.columns()).map_err(CliError::store)?;
            if json {
                print_json(&summary)?;
            } else {
                println!(
                    "imported {} item(s) ({} inactive), skipped {} blank row(s)",
                    summary.inserted, summary.inactive, summary.skipped_blank
                );
            }
        }
        ChecklistCommands::List { all } => {
            let items = store.list(all).map_err(CliError::store)?;
            if json {
                print_json(&items)?;
            } else {
                for item in &items {
                    println!("{}", describe_item(item));
                }
                eprintln!("{} item(s)", items.len());
            }
        }
        ChecklistCommands::Migrate => {
            let report = store.migrate().map_err(CliError::store)?;
            if json {
                print_json(&report)?;
            } else if report.snapshot_id.is_none() {
                println!("already at schema v{}", report.to_version);
            } else {
                println!(
                    "migrated v{} -> v{}: {} row(s) in {} ms (snapshot {})",
                    report.from_version,
                    report.to_version,
                    report.rows_migrated,
                    report.duration_ms,
                    report.snapshot_id.unwrap_or_default()
                );
            }
        }
        ChecklistCommands::Rollback => {
            let report = store.rollback().map_err(CliError::store)?;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "restored {} row(s) from snapshot {} (schema v{})",
                    report.rows_restored, report.snapshot_id, report.schema_version
                );
            }
        }
        ChecklistCommands::Prune { days } => {
            let days = days.unwrap_or(ctx.settings.checklist.snapshot_retention_days);
            let removed = store.prune_snapshots(days).map_err(CliError::store)?;
            if json {
                print_json(&serde_json::json!({ "removed": removed, "retention_days": days }))?;
            } else {
                println!("removed {removed} snapshot(s) older than {days} day(s)");
            }
        }
    }
    Ok(())
}
