//! Checklist import from CSV.

use std::path::Path;

use serde::Serialize;

use paramgrid_qc::ChecklistItem;

use crate::columns::{ColumnMap, Columns, Field};
use crate::csv::{read_file_as_utf8, read_records};
use crate::error::{IoError, StoreError};
use crate::store::ChecklistStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub inactive: usize,
    pub skipped_blank: usize,
}

fn parse_active(raw: Option<&str>) -> bool {
    match raw.map(|s| s.to_ascii_lowercase()) {
        None => true,
        Some(v) => !matches!(v.as_str(), "0" | "false" | "no" | "n" | "inactive"),
    }
}

/// Parse checklist rows. `item_name` (or an alias) is required; every
/// other column is optional.
pub fn parse_checklist(content: &str, columns: &ColumnMap) -> Result<(Vec<ChecklistItem>, usize), IoError> {
    let (headers, records) = read_records(content)?;
    let cols = Columns::resolve(columns, &headers, &[Field::ParameterName])?;

    let mut items = Vec::new();
    let mut skipped = 0;
    for (i, record) in records.iter().enumerate() {
        let line = i + 2;
        let Some(name) = cols.get(record, Field::ParameterName) else {
            skipped += 1;
            continue;
        };
        let mut item = ChecklistItem::new(name)
            .scoped(cols.get(record, Field::Module), cols.get(record, Field::Part))
            .range(
                cols.bound(record, Field::SpecMin, line),
                cols.bound(record, Field::SpecMax, line),
            )
            .category(cols.get(record, Field::Category).unwrap_or(""));
        if let Some(expected) = cols.get(record, Field::ExpectedValue) {
            item = item.expected(expected);
        }
        if !parse_active(cols.get(record, Field::IsActive)) {
            item = item.inactive();
        }
        items.push(item);
    }
    Ok((items, skipped))
}

/// Import a checklist CSV. All rows go in one transaction: a duplicate
/// active key leaves the store untouched.
pub fn import_checklist_csv(
    store: &mut ChecklistStore,
    path: &Path,
    columns: &ColumnMap,
) -> Result<ImportSummary, StoreError> {
    let content = read_file_as_utf8(path)?;
    let (items, skipped_blank) = parse_checklist(&content, columns)?;
    store.insert_all(&items)?;

    let summary = ImportSummary {
        inserted: items.len(),
        inactive: items.iter().filter(|i| !i.is_active).count(),
        skipped_blank,
    };
    log::info!(
        "imported {} checklist item(s) from {}",
        summary.inserted,
        path.display()
    );
    Ok(summary)
}
