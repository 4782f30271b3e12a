use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized parameter row from any source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRow {
    pub source_id: String,
    pub parameter_name: String,
    pub module: Option<String>,
    pub part: Option<String>,
    pub value: Option<String>,
    pub spec_min: Option<f64>,
    pub spec_max: Option<f64>,
    pub expected_value: Option<String>,
}

impl ParameterRow {
    pub fn new(source_id: impl Into<String>, parameter_name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            source_id: source_id.into(),
            parameter_name: parameter_name.into(),
            module: None,
            part: None,
            value: value.map(str::to_string),
            spec_min: None,
            spec_max: None,
            expected_value: None,
        }
    }

    pub fn with_scope(mut self, module: Option<&str>, part: Option<&str>) -> Self {
        self.module = normalize_scope(module);
        self.part = normalize_scope(part);
        self
    }

    pub fn with_spec(mut self, spec_min: Option<f64>, spec_max: Option<f64>) -> Self {
        self.spec_min = spec_min;
        self.spec_max = spec_max;
        self
    }

    pub fn with_expected(mut self, expected: &str) -> Self {
        self.expected_value = Some(expected.to_string());
        self
    }

    /// Trimmed value, or `None` when the cell is absent or blank.
    pub fn present_value(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn key(&self) -> ParameterKey {
        ParameterKey {
            parameter_name: self.parameter_name.trim().to_string(),
            module: normalize_scope(self.module.as_deref()),
            part: normalize_scope(self.part.as_deref()),
        }
    }

    pub fn has_spec_range(&self) -> bool {
        self.spec_min.is_some() || self.spec_max.is_some()
    }
}

/// Blank module/part strings mean "no scope".
pub fn normalize_scope(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Alignment identity of a parameter across sources.
///
/// Field order drives the derived ordering: name first, then scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParameterKey {
    pub parameter_name: String,
    pub module: Option<String>,
    pub part: Option<String>,
}

impl ParameterKey {
    pub fn new(parameter_name: &str, module: Option<&str>, part: Option<&str>) -> Self {
        Self {
            parameter_name: parameter_name.trim().to_string(),
            module: normalize_scope(module),
            part: normalize_scope(part),
        }
    }
}

impl std::fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.module, &self.part) {
            (None, None) => write!(f, "{}", self.parameter_name),
            (m, p) => write!(
                f,
                "{}/{}/{}",
                m.as_deref().unwrap_or("*"),
                p.as_deref().unwrap_or("*"),
                self.parameter_name
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// One parameter aligned across every compared source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub parameter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// Every compared source has an entry; `None` marks an absent cell.
    pub values_by_source: BTreeMap<String, Option<String>>,
    pub missing_count: usize,
    pub is_different: bool,
}

impl ComparisonRow {
    pub fn key(&self) -> ParameterKey {
        ParameterKey {
            parameter_name: self.parameter_name.clone(),
            module: self.module.clone(),
            part: self.part.clone(),
        }
    }

    pub fn distinct_values(&self) -> BTreeSet<&str> {
        self.values_by_source
            .values()
            .filter_map(|v| v.as_deref())
            .collect()
    }

    pub fn value_for(&self, source_id: &str) -> Option<&str> {
        self.values_by_source.get(source_id).and_then(|v| v.as_deref())
    }
}

/// Flattened `(parameter, source, value)` record of a comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongFormRecord<'a> {
    pub parameter_name: &'a str,
    pub module: Option<&'a str>,
    pub part: Option<&'a str>,
    pub source_id: &'a str,
    pub value: Option<&'a str>,
    pub is_different: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    /// Sorted, de-duplicated source identifiers (the cache key).
    pub sources: Vec<String>,
    /// Sorted by parameter key.
    pub rows: Vec<ComparisonRow>,
    pub load_errors: Vec<LoadError>,
}

impl ComparisonTable {
    pub fn is_complete(&self) -> bool {
        self.load_errors.is_empty()
    }

    pub fn row(&self, key: &ParameterKey) -> Option<&ComparisonRow> {
        self.rows
            .binary_search_by(|r| {
                (&r.parameter_name, &r.module, &r.part).cmp(&(
                    &key.parameter_name,
                    &key.module,
                    &key.part,
                ))
            })
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn differing(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|r| r.is_different)
    }

    pub fn long_form(&self) -> Vec<LongFormRecord<'_>> {
        let mut out = Vec::with_capacity(self.rows.len() * self.sources.len());
        for row in &self.rows {
            for (source_id, value) in &row.values_by_source {
                out.push(LongFormRecord {
                    parameter_name: &row.parameter_name,
                    module: row.module.as_deref(),
                    part: row.part.as_deref(),
                    source_id,
                    value: value.as_deref(),
                    is_different: row.is_different,
                });
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A consensus ("mother") value proposed for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotherDbCandidate {
    pub parameter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    pub default_value: String,
    pub occurrence_count: usize,
    pub total_sources: usize,
    pub occurrence_rate: f64,
    pub confidence_score: f64,
}
