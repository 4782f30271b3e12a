use std::collections::BTreeMap;

use serde::Serialize;

use crate::checklist::ChecklistSummary;
use crate::error::ConversionError;

// ---------------------------------------------------------------------------
// Severity + issue type
// ---------------------------------------------------------------------------

/// Declaration order is reporting priority: `Critical` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Critical and high issues fail the row they are raised against.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingValue,
    OutOfRange,
    NearLimit,
    NonNumeric,
    ExpectedMismatch,
    DuplicateParameter,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingValue => write!(f, "missing value"),
            Self::OutOfRange => write!(f, "out of range"),
            Self::NearLimit => write!(f, "near limit"),
            Self::NonNumeric => write!(f, "non-numeric value"),
            Self::ExpectedMismatch => write!(f, "expected value mismatch"),
            Self::DuplicateParameter => write!(f, "duplicate parameter"),
        }
    }
}

// ---------------------------------------------------------------------------
// Issues + verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcIssue {
    pub parameter_name: String,
    pub source_id: String,
    /// Index of the offending row in the validated table.
    pub row: usize,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
}

/// Severity first, then table order.
pub fn sort_issues(issues: &mut [QcIssue]) {
    issues.sort_by_key(|i| (i.severity, i.row));
}

pub fn count_by_severity(issues: &[QcIssue]) -> BTreeMap<Severity, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.severity).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcVerdict {
    pub total_parameters: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub pass_rate: f64,
    pub qc_passed: bool,
    pub structural_passed: bool,
    pub issues: Vec<QcIssue>,
    pub issue_counts: BTreeMap<Severity, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_summary: Option<ChecklistSummary>,
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Parse a cell as a finite number.
pub fn to_numeric(value: &str) -> Result<f64, ConversionError> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ConversionError {
            value: trimmed.to_string(),
        }),
    }
}

/// Which side of a spec range a value sits on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeCheck {
    Within,
    /// Inside the range but within the warning band of `bound`.
    NearLimit { bound: f64 },
    Below { bound: f64 },
    Above { bound: f64 },
}

/// Check `value` against optional bounds (a missing bound is unbounded).
/// The warning band is `ratio * |bound|` wide on the inner side of each bound.
pub fn check_range(value: f64, min: Option<f64>, max: Option<f64>, ratio: f64) -> RangeCheck {
    if let Some(lo) = min {
        if value < lo {
            return RangeCheck::Below { bound: lo };
        }
    }
    if let Some(hi) = max {
        if value > hi {
            return RangeCheck::Above { bound: hi };
        }
    }

    if ratio <= 0.0 {
        return RangeCheck::Within;
    }

    let near_hi = max.filter(|hi| value >= hi - ratio * hi.abs());
    let near_lo = min.filter(|lo| value <= lo + ratio * lo.abs());
    match (near_lo, near_hi) {
        (Some(lo), Some(hi)) => {
            let bound = if (value - lo).abs() <= (hi - value).abs() { lo } else { hi };
            RangeCheck::NearLimit { bound }
        }
        (Some(bound), None) | (None, Some(bound)) => RangeCheck::NearLimit { bound },
        (None, None) => RangeCheck::Within,
    }
}

pub fn describe_range(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
        (Some(lo), None) => format!(">= {lo}"),
        (None, Some(hi)) => format!("<= {hi}"),
        (None, None) => "unbounded".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_first() {
        let mut v = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        v.sort();
        assert_eq!(v, vec![Severity::Critical, Severity::High, Severity::Medium, Severity::Low]);
        assert!(Severity::High.is_blocking());
        assert!(!Severity::Medium.is_blocking());
    }

    #[test]
    fn numeric_parsing() {
        assert_eq!(to_numeric(" 48 ").unwrap(), 48.0);
        assert_eq!(to_numeric("-1.5e2").unwrap(), -150.0);
        assert!(to_numeric("abc").is_err());
        assert!(to_numeric("NaN").is_err());
        assert!(to_numeric("inf").is_err());
        assert_eq!(to_numeric("12kg").unwrap_err().value, "12kg");
    }

    #[test]
    fn range_bands() {
        let ratio = 0.05;
        assert_eq!(check_range(60.0, Some(10.0), Some(50.0), ratio), RangeCheck::Above { bound: 50.0 });
        assert_eq!(check_range(5.0, Some(10.0), Some(50.0), ratio), RangeCheck::Below { bound: 10.0 });
        assert_eq!(check_range(30.0, Some(10.0), Some(50.0), ratio), RangeCheck::Within);
        assert_eq!(check_range(48.0, Some(10.0), Some(50.0), ratio), RangeCheck::NearLimit { bound: 50.0 });
        assert_eq!(check_range(47.5, Some(10.0), Some(50.0), ratio), RangeCheck::NearLimit { bound: 50.0 });
        assert_eq!(check_range(47.4, Some(10.0), Some(50.0), ratio), RangeCheck::Within);
        assert_eq!(check_range(10.4, Some(10.0), Some(50.0), ratio), RangeCheck::NearLimit { bound: 10.0 });
        assert_eq!(check_range(50.0, Some(10.0), Some(50.0), ratio), RangeCheck::NearLimit { bound: 50.0 });
    }

    #[test]
    fn open_bounds() {
        assert_eq!(check_range(1e9, Some(0.0), None, 0.05), RangeCheck::Within);
        assert_eq!(check_range(-1e9, None, Some(100.0), 0.05), RangeCheck::Within);
        assert_eq!(check_range(-1.0, Some(0.0), None, 0.05), RangeCheck::Below { bound: 0.0 });
        assert_eq!(check_range(3.0, None, None, 0.05), RangeCheck::Within);
    }

    #[test]
    fn zero_ratio_disables_band() {
        assert_eq!(check_range(50.0, Some(10.0), Some(50.0), 0.0), RangeCheck::Within);
    }
}
