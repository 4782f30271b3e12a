// Checklist storage using SQLite

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use paramgrid_qc::{Checklist, ChecklistItem, QcError};

use crate::error::StoreError;

/// Schema with the composite (module, part, item_name) identity.
pub const CURRENT_VERSION: u32 = 2;
/// Schema keyed on item_name alone, without module/part.
pub const LEGACY_VERSION: u32 = 1;

pub(crate) const ITEMS_TABLE_V2: &str = r#"
CREATE TABLE IF NOT EXISTS checklist_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module TEXT,
    part TEXT,
    item_name TEXT NOT NULL,
    spec_min REAL,
    spec_max REAL,
    expected_value TEXT,
    category TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1
);
"#;

/// One active row per key. NULL module/part compare equal through COALESCE.
pub(crate) const ACTIVE_KEY_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_checklist_active_key
    ON checklist_items (COALESCE(module, ''), COALESCE(part, ''), item_name)
    WHERE is_active = 1;
"#;

pub(crate) const ITEMS_TABLE_V1: &str = r#"
CREATE TABLE IF NOT EXISTS checklist_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_name TEXT NOT NULL UNIQUE,
    spec_min REAL,
    spec_max REAL,
    expected_value TEXT,
    category TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1
);
"#;

const META_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS migration_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_version INTEGER NOT NULL,
    row_count INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS migration_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_version INTEGER NOT NULL,
    to_version INTEGER NOT NULL,
    applied_at TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    success INTEGER NOT NULL,
    error_message TEXT
);
"#;

const SELECT_V2: &str = "SELECT id, module, part, item_name, spec_min, spec_max, expected_value, category, is_active \
                         FROM checklist_items";
const SELECT_V1: &str = "SELECT id, NULL, NULL, item_name, spec_min, spec_max, expected_value, category, is_active \
                         FROM checklist_items";

pub(crate) fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ChecklistItem> {
    Ok(ChecklistItem {
        id: Some(row.get(0)?),
        module: row.get(1)?,
        part: row.get(2)?,
        item_name: row.get(3)?,
        spec_min: row.get(4)?,
        spec_max: row.get(5)?,
        expected_value: row.get(6)?,
        category: row.get(7)?,
        is_active: row.get::<_, i64>(8)? != 0,
    })
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `PRAGMA user_version`, or a guess from the table shape for databases
/// written before versioning: no `module` column means the legacy schema.
pub(crate) fn detect_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version != 0 {
        return Ok(version);
    }
    if !table_exists(conn, "checklist_items")? {
        return Ok(0);
    }
    if has_column(conn, "checklist_items", "module")? {
        Ok(CURRENT_VERSION)
    } else {
        Ok(LEGACY_VERSION)
    }
}

fn integrity_or(err: rusqlite::Error, item: &ChecklistItem) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => StoreError::Integrity {
            key: item.key().to_string(),
        },
        _ => StoreError::Sqlite(err),
    }
}

pub struct ChecklistStore {
    pub(crate) conn: Connection,
}

impl ChecklistStore {
    /// Open or create a checklist database. A new database gets the current
    /// schema; an existing legacy one is left as-is until [`Self::migrate`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Create a store holding the legacy (v1) schema. Used to stage
    /// databases exported by older tooling.
    pub fn create_legacy(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(ITEMS_TABLE_V1)?;
        conn.pragma_update(None, "user_version", LEGACY_VERSION)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(META_TABLES)?;
        if detect_version(&conn)? == 0 {
            conn.execute_batch(ITEMS_TABLE_V2)?;
            conn.execute_batch(ACTIVE_KEY_INDEX)?;
            conn.pragma_update(None, "user_version", CURRENT_VERSION)?;
            log::debug!("created checklist schema v{CURRENT_VERSION}");
        }
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(detect_version(&self.conn)?)
    }

    pub(crate) fn require_version(&self, expected: u32) -> Result<(), StoreError> {
        let found = self.schema_version()?;
        if found != expected {
            return Err(StoreError::SchemaVersion { found, expected });
        }
        Ok(())
    }

    /// Insert one item. A second active item with the same key is rejected.
    pub fn insert(&mut self, item: &ChecklistItem) -> Result<i64, StoreError> {
        let ids = self.insert_all(std::slice::from_ref(item))?;
        Ok(ids[0])
    }

    /// Insert items in one transaction; nothing is written if any insert fails.
    pub fn insert_all(&mut self, items: &[ChecklistItem]) -> Result<Vec<i64>, StoreError> {
        self.require_version(CURRENT_VERSION)?;
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(items.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO checklist_items
                    (module, part, item_name, spec_min, spec_max, expected_value, category, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for item in items {
                let key = item.key();
                stmt.execute(params![
                    key.module(),
                    key.part(),
                    key.item_name(),
                    item.spec_min,
                    item.spec_max,
                    item.expected_value,
                    item.category,
                    item.is_active as i64,
                ])
                .map_err(|e| integrity_or(e, item))?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Mark an item inactive. Returns false when no such id exists.
    pub fn deactivate(&mut self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("UPDATE checklist_items SET is_active = 0 WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn get(&self, id: i64) -> Result<Option<ChecklistItem>, StoreError> {
        let sql = format!("{} WHERE id = ?1", self.select_sql()?);
        Ok(self.conn.query_row(&sql, [id], item_from_row).optional()?)
    }

    /// Items ordered by name, then scope. Works on either schema version.
    pub fn list(&self, include_inactive: bool) -> Result<Vec<ChecklistItem>, StoreError> {
        let filter = if include_inactive { "" } else { " WHERE is_active = 1" };
        let sql = format!("{}{filter} ORDER BY item_name, 2, 3, id", self.select_sql()?);
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt.query_map([], item_from_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM checklist_items", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Active items as an in-memory [`Checklist`].
    pub fn load_checklist(&self) -> Result<Checklist, StoreError> {
        let items = self.list(false)?;
        Checklist::new(items).map_err(|e| match e {
            QcError::Integrity { key } => StoreError::Integrity { key },
            other => StoreError::Verification(other.to_string()),
        })
    }

    fn select_sql(&self) -> Result<&'static str, StoreError> {
        Ok(if self.schema_version()? == LEGACY_VERSION {
            SELECT_V1
        } else {
            SELECT_V2
        })
    }
}
