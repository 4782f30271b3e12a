//! Checklist resolution and evaluation.
//!
//! A row resolves to at most one active checklist item: the exact
//! `(module, part, item_name)` entry if present, otherwise the type-common
//! `(NULL, NULL, item_name)` entry. Rows with no match are not
//! checklist-governed and are left out of checklist accounting.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use paramgrid_recon::ParameterRow;

use crate::error::QcError;
use crate::model::{check_range, describe_range, sort_issues, to_numeric, IssueType, QcIssue, RangeCheck, Severity};
use crate::scope::ScopedKey;
use crate::DEFAULT_NEAR_LIMIT_RATIO;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItem {
    /// Storage row id, when loaded from a store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub module: Option<String>,
    pub part: Option<String>,
    pub item_name: String,
    pub spec_min: Option<f64>,
    pub spec_max: Option<f64>,
    pub expected_value: Option<String>,
    pub category: String,
    pub is_active: bool,
}

impl ChecklistItem {
    /// A type-common, active item with no rule attached.
    pub fn new(item_name: impl Into<String>) -> Self {
        Self {
            id: None,
            module: None,
            part: None,
            item_name: item_name.into(),
            spec_min: None,
            spec_max: None,
            expected_value: None,
            category: String::new(),
            is_active: true,
        }
    }

    pub fn scoped(mut self, module: Option<&str>, part: Option<&str>) -> Self {
        self.module = module.map(str::to_string);
        self.part = part.map(str::to_string);
        self
    }

    pub fn range(mut self, spec_min: Option<f64>, spec_max: Option<f64>) -> Self {
        self.spec_min = spec_min;
        self.spec_max = spec_max;
        self
    }

    pub fn expected(mut self, value: &str) -> Self {
        self.expected_value = Some(value.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn key(&self) -> ScopedKey {
        ScopedKey::new(self.module.as_deref(), self.part.as_deref(), &self.item_name)
    }

    fn expected_rule(&self) -> Option<&str> {
        self.expected_value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn has_range(&self) -> bool {
        self.spec_min.is_some() || self.spec_max.is_some()
    }
}

/// Active checklist items indexed by [`ScopedKey`].
#[derive(Debug, Clone, Default)]
pub struct Checklist {
    active: HashMap<ScopedKey, ChecklistItem>,
    inactive: usize,
}

impl Checklist {
    /// Build a checklist; two active items with the same key are rejected.
    pub fn new(items: impl IntoIterator<Item = ChecklistItem>) -> Result<Self, QcError> {
        let mut checklist = Self::default();
        for item in items {
            if !item.is_active {
                checklist.inactive += 1;
                continue;
            }
            let key = item.key();
            if checklist.active.contains_key(&key) {
                return Err(QcError::Integrity { key: key.to_string() });
            }
            checklist.active.insert(key, item);
        }
        Ok(checklist)
    }

    pub fn get(&self, key: &ScopedKey) -> Option<&ChecklistItem> {
        self.active.get(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn inactive_count(&self) -> usize {
        self.inactive
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    MissingValue,
    NonNumeric { value: String },
    OutOfRange { value: f64, min: Option<f64>, max: Option<f64> },
    ExpectedMismatch { expected: String, actual: String },
}

impl FailureKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::OutOfRange { .. } => Severity::Critical,
            Self::MissingValue | Self::NonNumeric { .. } | Self::ExpectedMismatch { .. } => Severity::High,
        }
    }

    pub fn issue_type(&self) -> IssueType {
        match self {
            Self::MissingValue => IssueType::MissingValue,
            Self::NonNumeric { .. } => IssueType::NonNumeric,
            Self::OutOfRange { .. } => IssueType::OutOfRange,
            Self::ExpectedMismatch { .. } => IssueType::ExpectedMismatch,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::MissingValue => "value is missing".to_string(),
            Self::NonNumeric { value } => format!("'{value}' is not numeric"),
            Self::OutOfRange { value, min, max } => {
                format!("value {value} outside {}", describe_range(*min, *max))
            }
            Self::ExpectedMismatch { expected, actual } => {
                format!("expected '{expected}', found '{actual}'")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Pass,
    /// Passed, but within the warning band of `bound`.
    NearLimit { bound: f64 },
    Fail(FailureKind),
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        !matches!(self, Self::Fail(_))
    }
}

/// Case- and whitespace-insensitive comparison; numeric when both sides parse.
fn values_match(expected: &str, actual: &str) -> bool {
    if let (Ok(e), Ok(a)) = (to_numeric(expected), to_numeric(actual)) {
        let scale = e.abs().max(a.abs()).max(1.0);
        return (e - a).abs() <= 1e-9 * scale;
    }
    normalize_text(expected) == normalize_text(actual)
}

fn normalize_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistSummary {
    pub total_params: usize,
    /// Rows that resolved to a checklist item.
    pub checklist_params: usize,
    /// Checklist rows that passed (near-limit included).
    pub validated_params: usize,
    pub failed_params: usize,
    pub qc_passed: bool,
    pub failures_by_severity: BTreeMap<Severity, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistReport {
    pub summary: ChecklistSummary,
    pub issues: Vec<QcIssue>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChecklistMatcher {
    near_limit_ratio: f64,
}

impl Default for ChecklistMatcher {
    fn default() -> Self {
        Self {
            near_limit_ratio: DEFAULT_NEAR_LIMIT_RATIO,
        }
    }
}

impl ChecklistMatcher {
    pub fn new(near_limit_ratio: f64) -> Result<Self, QcError> {
        crate::validator::validate_ratio(near_limit_ratio)?;
        Ok(Self { near_limit_ratio })
    }

    /// Exact scoped entry first, then the type-common entry.
    pub fn match_row<'c>(&self, row: &ParameterRow, checklist: &'c Checklist) -> Option<&'c ChecklistItem> {
        let key = ScopedKey::new(row.module.as_deref(), row.part.as_deref(), &row.parameter_name);
        if key.item_name().is_empty() {
            return None;
        }
        match checklist.get(&key) {
            Some(item) => Some(item),
            None if !key.is_common() => checklist.get(&key.fallback()),
            None => None,
        }
    }

    /// Expected value takes precedence over a numeric range; an item with
    /// neither rule always passes.
    pub fn evaluate(&self, row: &ParameterRow, item: &ChecklistItem) -> CheckOutcome {
        if let Some(expected) = item.expected_rule() {
            return match row.present_value() {
                None => CheckOutcome::Fail(FailureKind::MissingValue),
                Some(actual) if values_match(expected, actual) => CheckOutcome::Pass,
                Some(actual) => CheckOutcome::Fail(FailureKind::ExpectedMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                }),
            };
        }

        if !item.has_range() {
            return CheckOutcome::Pass;
        }

        let Some(raw) = row.present_value() else {
            return CheckOutcome::Fail(FailureKind::MissingValue);
        };
        let value = match to_numeric(raw) {
            Ok(v) => v,
            Err(err) => return CheckOutcome::Fail(FailureKind::NonNumeric { value: err.value }),
        };

        match check_range(value, item.spec_min, item.spec_max, self.near_limit_ratio) {
            RangeCheck::Within => CheckOutcome::Pass,
            RangeCheck::NearLimit { bound } => CheckOutcome::NearLimit { bound },
            RangeCheck::Below { .. } | RangeCheck::Above { .. } => CheckOutcome::Fail(FailureKind::OutOfRange {
                value,
                min: item.spec_min,
                max: item.spec_max,
            }),
        }
    }

    /// Resolve and evaluate every row against `checklist`.
    pub fn run(&self, rows: &[ParameterRow], checklist: &Checklist) -> ChecklistReport {
        let mut checklist_params = 0;
        let mut validated_params = 0;
        let mut failed_params = 0;
        let mut failures_by_severity = BTreeMap::new();
        let mut issues = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let Some(item) = self.match_row(row, checklist) else {
                continue;
            };
            checklist_params += 1;

            match self.evaluate(row, item) {
                CheckOutcome::Pass => validated_params += 1,
                CheckOutcome::NearLimit { bound } => {
                    validated_params += 1;
                    issues.push(QcIssue {
                        parameter_name: row.parameter_name.clone(),
                        source_id: row.source_id.clone(),
                        row: idx,
                        issue_type: IssueType::NearLimit,
                        severity: Severity::Medium,
                        description: format!(
                            "value {} within {}% of checklist limit {bound} {}",
                            row.present_value().unwrap_or_default(),
                            self.near_limit_ratio * 100.0,
                            item.key()
                        ),
                    });
                }
                CheckOutcome::Fail(kind) => {
                    failed_params += 1;
                    *failures_by_severity.entry(kind.severity()).or_insert(0) += 1;
                    issues.push(QcIssue {
                        parameter_name: row.parameter_name.clone(),
                        source_id: row.source_id.clone(),
                        row: idx,
                        issue_type: kind.issue_type(),
                        severity: kind.severity(),
                        description: format!("checklist {}: {}", item.key(), kind.describe()),
                    });
                }
            }
        }

        sort_issues(&mut issues);
        log::debug!(
            "checklist: {checklist_params} of {} row(s) governed, {failed_params} failed",
            rows.len()
        );

        ChecklistReport {
            summary: ChecklistSummary {
                total_params: rows.len(),
                checklist_params,
                validated_params,
                failed_params,
                qc_passed: failed_params == 0,
                failures_by_severity,
            },
            issues,
        }
    }
}
