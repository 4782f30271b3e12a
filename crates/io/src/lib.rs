// Parameter source loading and checklist persistence

pub mod columns;
pub mod csv;
pub mod error;
pub mod import;
pub mod loader;
pub mod migrate;
pub mod store;
pub mod xlsx;

use std::path::{Path, PathBuf};

pub use columns::{ColumnMap, Field};
pub use error::{IoError, StoreError};
pub use import::{import_checklist_csv, ImportSummary};
pub use loader::{FileLoader, SourceFormat};
pub use migrate::{MigrationRecord, MigrationReport, RollbackReport, SnapshotInfo};
pub use store::{ChecklistStore, CURRENT_VERSION, LEGACY_VERSION};

/// Relative source ids are taken relative to `base` when one is set.
pub(crate) fn resolve_path(base: Option<&Path>, source_id: &str) -> PathBuf {
    let path = Path::new(source_id);
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}
