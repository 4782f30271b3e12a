// Excel parameter sources (xlsx, xls, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use paramgrid_recon::ParameterRow;

use crate::columns::{rows_from_records, ColumnMap};
use crate::error::IoError;

/// Cell text as it would be typed: integers without decimals, booleans as TRUE/FALSE.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Read a worksheet as header + records. Uses `sheet` when given, otherwise the first sheet.
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<(Vec<String>, Vec<Vec<String>>), IoError> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| IoError::Xlsx(format!("failed to open {}: {e}", path.display())))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IoError::Xlsx("workbook contains no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Xlsx(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows().map(|r| r.iter().map(cell_text).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    let records: Vec<Vec<String>> = rows.collect();
    log::debug!("{}: sheet '{sheet_name}', {} record(s)", path.display(), records.len());
    Ok((headers, records))
}

pub fn load_rows(
    source_id: &str,
    path: &Path,
    sheet: Option<&str>,
    columns: &ColumnMap,
) -> Result<Vec<ParameterRow>, IoError> {
    let (headers, records) = read_sheet(path, sheet)?;
    rows_from_records(source_id, &headers, records, columns)
}
