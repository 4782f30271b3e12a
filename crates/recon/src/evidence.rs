use serde::Serialize;

use crate::model::ComparisonTable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub total_parameters: usize,
    pub different_parameters: usize,
    pub identical_parameters: usize,
    pub missing_cells: usize,
    pub sources: usize,
    pub failed_sources: usize,
}

/// Compute summary statistics from a comparison table.
pub fn summarize(table: &ComparisonTable) -> ComparisonSummary {
    let mut different_parameters = 0;
    let mut missing_cells = 0;

    for row in &table.rows {
        if row.is_different {
            different_parameters += 1;
        }
        missing_cells += row.missing_count;
    }

    ComparisonSummary {
        total_parameters: table.rows.len(),
        different_parameters,
        identical_parameters: table.rows.len() - different_parameters,
        missing_cells,
        sources: table.sources.len(),
        failed_sources: table.load_errors.len(),
    }
}
