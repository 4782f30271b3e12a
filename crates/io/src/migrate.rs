//! Legacy checklist schema migration (v1 → v2).
//!
//! Protocol: snapshot the v1 table, copy rows into the v2 shape with
//! `module = NULL, part = NULL`, verify every row against the snapshot, then
//! swap tables and bump `PRAGMA user_version`, all inside one transaction.
//! A failed verification rolls the whole thing back. The snapshot outlives
//! the migration so [`ChecklistStore::rollback`] can restore it; it is
//! dropped by [`ChecklistStore::prune_snapshots`].

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use paramgrid_qc::ChecklistItem;

use crate::error::StoreError;
use crate::store::{
    item_from_row, ChecklistStore, ACTIVE_KEY_INDEX, CURRENT_VERSION, ITEMS_TABLE_V1, LEGACY_VERSION,
};

const STAGING_TABLE: &str = "checklist_items_v2";

fn snapshot_table(id: i64) -> String {
    format!("checklist_items_snapshot_{id}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub rows_migrated: usize,
    /// `None` when the database was already current.
    pub snapshot_id: Option<i64>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackReport {
    pub snapshot_id: i64,
    pub rows_restored: usize,
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub id: i64,
    pub from_version: u32,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationRecord {
    pub from_version: u32,
    pub to_version: u32,
    pub applied_at: String,
    pub duration_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
}

fn record_migration(
    conn: &Connection,
    from_version: u32,
    to_version: u32,
    duration_ms: u64,
    error: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO migration_history (from_version, to_version, applied_at, duration_ms, success, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            from_version,
            to_version,
            Utc::now().to_rfc3339(),
            duration_ms as i64,
            error.is_none() as i64,
            error
        ],
    )?;
    Ok(())
}

fn read_items(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<ChecklistItem>> {
    let mut stmt = conn.prepare(sql)?;
    let items = stmt.query_map([], item_from_row)?.collect();
    items
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e)))
}

/// Row-by-row comparison of migrated items against the snapshot. Float
/// bounds must match bit for bit.
pub(crate) fn verify_rows(expected: &[ChecklistItem], actual: &[ChecklistItem]) -> Result<(), String> {
    if expected.len() != actual.len() {
        return Err(format!(
            "row count changed: {} before, {} after",
            expected.len(),
            actual.len()
        ));
    }
    for (before, after) in expected.iter().zip(actual) {
        let same_bounds = before.spec_min.map(f64::to_bits) == after.spec_min.map(f64::to_bits)
            && before.spec_max.map(f64::to_bits) == after.spec_max.map(f64::to_bits);
        let same = before.id == after.id
            && before.item_name == after.item_name
            && same_bounds
            && before.expected_value == after.expected_value
            && before.category == after.category
            && before.is_active == after.is_active
            && after.module.is_none()
            && after.part.is_none();
        if !same {
            return Err(format!("row {:?} ('{}') differs after migration", before.id, before.item_name));
        }
    }
    Ok(())
}

impl ChecklistStore {
    /// Migrate a legacy database to the composite-key schema.
    pub fn migrate(&mut self) -> Result<MigrationReport, StoreError> {
        let from_version = self.schema_version()?;
        if from_version == CURRENT_VERSION {
            return Ok(MigrationReport {
                from_version,
                to_version: CURRENT_VERSION,
                rows_migrated: 0,
                snapshot_id: None,
                duration_ms: 0,
            });
        }
        if from_version != LEGACY_VERSION {
            return Err(StoreError::SchemaVersion {
                found: from_version,
                expected: LEGACY_VERSION,
            });
        }

        let start = Instant::now();
        match self.migrate_legacy(start) {
            Ok(report) => {
                log::info!(
                    "checklist migrated v{} -> v{}: {} row(s), snapshot {:?}",
                    report.from_version,
                    report.to_version,
                    report.rows_migrated,
                    report.snapshot_id
                );
                Ok(report)
            }
            Err(err) => {
                // The transaction is gone; record the failure on its own.
                log::error!("checklist migration failed, rolled back: {err}");
                let elapsed = start.elapsed().as_millis() as u64;
                record_migration(&self.conn, from_version, CURRENT_VERSION, elapsed, Some(&err.to_string()))?;
                Err(err)
            }
        }
    }

    fn migrate_legacy(&mut self, start: Instant) -> Result<MigrationReport, StoreError> {
        let tx = self.conn.transaction()?;

        let legacy = read_items(
            &tx,
            "SELECT id, NULL, NULL, item_name, spec_min, spec_max, expected_value, category, is_active
             FROM checklist_items ORDER BY id",
        )?;

        tx.execute(
            "INSERT INTO migration_snapshots (from_version, row_count, created_at) VALUES (?1, ?2, ?3)",
            params![LEGACY_VERSION, legacy.len() as i64, Utc::now().to_rfc3339()],
        )?;
        let snapshot_id = tx.last_insert_rowid();
        let snapshot = snapshot_table(snapshot_id);
        tx.execute_batch(&format!("CREATE TABLE {snapshot} AS SELECT * FROM checklist_items;"))?;

        let staged_schema = crate::store::ITEMS_TABLE_V2.replace("checklist_items", STAGING_TABLE);
        tx.execute_batch(&staged_schema)?;
        tx.execute_batch(&format!(
            "INSERT INTO {STAGING_TABLE}
                (id, module, part, item_name, spec_min, spec_max, expected_value, category, is_active)
             SELECT id, NULL, NULL, item_name, spec_min, spec_max, expected_value, category, is_active
             FROM {snapshot};"
        ))?;

        let migrated = read_items(
            &tx,
            &format!(
                "SELECT id, module, part, item_name, spec_min, spec_max, expected_value, category, is_active
                 FROM {STAGING_TABLE} ORDER BY id"
            ),
        )?;
        // Dropping `tx` on this error path rolls back everything above.
        verify_rows(&legacy, &migrated).map_err(StoreError::Verification)?;

        tx.execute_batch(&format!(
            "DROP TABLE checklist_items;
             ALTER TABLE {STAGING_TABLE} RENAME TO checklist_items;"
        ))?;
        tx.execute_batch(ACTIVE_KEY_INDEX)?;
        tx.pragma_update(None, "user_version", CURRENT_VERSION)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        record_migration(&tx, LEGACY_VERSION, CURRENT_VERSION, duration_ms, None)?;
        tx.commit()?;

        Ok(MigrationReport {
            from_version: LEGACY_VERSION,
            to_version: CURRENT_VERSION,
            rows_migrated: migrated.len(),
            snapshot_id: Some(snapshot_id),
            duration_ms,
        })
    }

    /// Restore the most recent snapshot and reset the schema to v1. Rows
    /// written after the migration are discarded.
    pub fn rollback(&mut self) -> Result<RollbackReport, StoreError> {
        let start = Instant::now();
        let from_version = self.schema_version()?;

        let tx = self.conn.transaction()?;
        let latest: Option<(i64, i64)> = tx
            .query_row(
                "SELECT id, row_count FROM migration_snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((snapshot_id, expected_rows)) = latest else {
            return Err(StoreError::NoSnapshot);
        };
        let snapshot = snapshot_table(snapshot_id);

        tx.execute_batch("DROP TABLE IF EXISTS checklist_items;")?;
        tx.execute_batch(ITEMS_TABLE_V1)?;
        tx.execute_batch(&format!(
            "INSERT INTO checklist_items (id, item_name, spec_min, spec_max, expected_value, category, is_active)
             SELECT id, item_name, spec_min, spec_max, expected_value, category, is_active FROM {snapshot};"
        ))?;

        let restored: i64 = tx.query_row("SELECT COUNT(*) FROM checklist_items", [], |row| row.get(0))?;
        if restored != expected_rows {
            return Err(StoreError::Verification(format!(
                "snapshot {snapshot_id} holds {restored} row(s), expected {expected_rows}"
            )));
        }

        tx.pragma_update(None, "user_version", LEGACY_VERSION)?;
        let duration_ms = start.elapsed().as_millis() as u64;
        record_migration(&tx, from_version, LEGACY_VERSION, duration_ms, None)?;
        tx.commit()?;

        log::info!("checklist rolled back to v{LEGACY_VERSION} from snapshot {snapshot_id}");
        Ok(RollbackReport {
            snapshot_id,
            rows_restored: restored as usize,
            schema_version: LEGACY_VERSION,
        })
    }

    pub fn snapshots(&self) -> Result<Vec<SnapshotInfo>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, from_version, row_count, created_at FROM migration_snapshots ORDER BY id")?;
        let snapshots = stmt
            .query_map([], |row| {
                let created: String = row.get(3)?;
                Ok(SnapshotInfo {
                    id: row.get(0)?,
                    from_version: row.get(1)?,
                    row_count: row.get::<_, i64>(2)? as usize,
                    created_at: parse_timestamp(&created)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snapshots)
    }

    /// Drop snapshots older than `retention_days`. Returns how many were
    /// removed. A retention reaching past the earliest representable time
    /// keeps everything.
    pub fn prune_snapshots(&mut self, retention_days: u32) -> Result<usize, StoreError> {
        let cutoff = Duration::try_days(i64::from(retention_days)).and_then(|d| Utc::now().checked_sub_signed(d));
        match cutoff {
            Some(cutoff) => self.prune_snapshots_before(cutoff),
            None => {
                log::debug!("retention of {retention_days} day(s) predates any snapshot, nothing to prune");
                Ok(0)
            }
        }
    }

    pub fn prune_snapshots_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let expired: Vec<i64> = self
            .snapshots()?
            .into_iter()
            .filter(|s| s.created_at < cutoff)
            .map(|s| s.id)
            .collect();

        let tx = self.conn.transaction()?;
        for id in &expired {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", snapshot_table(*id)))?;
            tx.execute("DELETE FROM migration_snapshots WHERE id = ?1", [id])?;
        }
        tx.commit()?;

        if !expired.is_empty() {
            log::info!("pruned {} checklist snapshot(s)", expired.len());
        }
        Ok(expired.len())
    }

    pub fn migration_history(&self) -> Result<Vec<MigrationRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT from_version, to_version, applied_at, duration_ms, success, error_message
             FROM migration_history ORDER BY id",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(MigrationRecord {
                    from_version: row.get(0)?,
                    to_version: row.get(1)?,
                    applied_at: row.get(2)?,
                    duration_ms: row.get::<_, i64>(3)? as u64,
                    success: row.get::<_, i64>(4)? != 0,
                    error_message: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
