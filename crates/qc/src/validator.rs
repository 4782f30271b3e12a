//! Structural and spec-range validation of a parameter table.

use std::collections::HashSet;

use paramgrid_recon::ParameterRow;

use crate::error::QcError;
use crate::model::{check_range, describe_range, sort_issues, to_numeric, IssueType, QcIssue, RangeCheck, Severity};
use crate::DEFAULT_NEAR_LIMIT_RATIO;

pub(crate) fn validate_ratio(ratio: f64) -> Result<(), QcError> {
    if (0.0..1.0).contains(&ratio) {
        Ok(())
    } else {
        Err(QcError::InvalidNearLimitRatio(ratio))
    }
}

fn issue(row: &ParameterRow, idx: usize, issue_type: IssueType, severity: Severity, description: String) -> QcIssue {
    QcIssue {
        parameter_name: row.parameter_name.clone(),
        source_id: row.source_id.clone(),
        row: idx,
        issue_type,
        severity,
        description,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QcValidator {
    near_limit_ratio: f64,
}

impl Default for QcValidator {
    fn default() -> Self {
        Self {
            near_limit_ratio: DEFAULT_NEAR_LIMIT_RATIO,
        }
    }
}

impl QcValidator {
    pub fn new(near_limit_ratio: f64) -> Result<Self, QcError> {
        validate_ratio(near_limit_ratio)?;
        Ok(Self { near_limit_ratio })
    }

    /// A missing value is HIGH; a row with a value but no parameter name is
    /// MEDIUM. At most one issue per row.
    pub fn check_missing_values(&self, rows: &[ParameterRow]) -> Vec<QcIssue> {
        let mut issues = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if row.present_value().is_none() {
                issues.push(issue(
                    row,
                    idx,
                    IssueType::MissingValue,
                    Severity::High,
                    "value is empty".to_string(),
                ));
            } else if row.parameter_name.trim().is_empty() {
                issues.push(issue(
                    row,
                    idx,
                    IssueType::MissingValue,
                    Severity::Medium,
                    "parameter name is empty".to_string(),
                ));
            }
        }
        issues
    }

    /// Rows without spec bounds or without a value are skipped here.
    pub fn check_spec_range(&self, rows: &[ParameterRow]) -> Vec<QcIssue> {
        let mut issues = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if !row.has_spec_range() {
                continue;
            }
            let Some(raw) = row.present_value() else {
                continue;
            };
            let value = match to_numeric(raw) {
                Ok(v) => v,
                Err(err) => {
                    issues.push(issue(row, idx, IssueType::NonNumeric, Severity::High, err.to_string()));
                    continue;
                }
            };

            let range = describe_range(row.spec_min, row.spec_max);
            match check_range(value, row.spec_min, row.spec_max, self.near_limit_ratio) {
                RangeCheck::Within => {}
                RangeCheck::NearLimit { bound } => issues.push(issue(
                    row,
                    idx,
                    IssueType::NearLimit,
                    Severity::Medium,
                    format!("value {value} is near limit {bound} of {range}"),
                )),
                RangeCheck::Below { bound } | RangeCheck::Above { bound } => issues.push(issue(
                    row,
                    idx,
                    IssueType::OutOfRange,
                    Severity::Critical,
                    format!("value {value} outside {range} (limit {bound})"),
                )),
            }
        }
        issues
    }

    /// Repeated (source, parameter key) pairs. The first occurrence is the
    /// one used for comparison; each later one is reported.
    pub fn check_duplicates(&self, rows: &[ParameterRow]) -> Vec<QcIssue> {
        let mut seen = HashSet::new();
        let mut issues = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            let key = row.key();
            if !seen.insert((row.source_id.as_str(), key.clone())) {
                issues.push(issue(
                    row,
                    idx,
                    IssueType::DuplicateParameter,
                    Severity::Low,
                    format!("{key} appears more than once in {}", row.source_id),
                ));
            }
        }
        issues
    }

    /// All checks, ordered by severity then row.
    pub fn validate(&self, rows: &[ParameterRow]) -> Vec<QcIssue> {
        let mut issues = self.check_missing_values(rows);
        issues.extend(self.check_spec_range(rows));
        issues.extend(self.check_duplicates(rows));
        sort_issues(&mut issues);
        issues
    }
}
