//! Header matching for tabular parameter sources.
//!
//! Headers are compared after lower-casing and folding spaces/hyphens to
//! underscores, so `Default Value`, `default-value` and `DEFAULT_VALUE` are
//! the same column.

use std::collections::{BTreeMap, HashMap};

use paramgrid_recon::ParameterRow;

use crate::error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    ParameterName,
    Value,
    Module,
    Part,
    SpecMin,
    SpecMax,
    ExpectedValue,
    Category,
    IsActive,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::ParameterName,
        Field::Value,
        Field::Module,
        Field::Part,
        Field::SpecMin,
        Field::SpecMax,
        Field::ExpectedValue,
        Field::Category,
        Field::IsActive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::ParameterName => "parameter_name",
            Field::Value => "value",
            Field::Module => "module",
            Field::Part => "part",
            Field::SpecMin => "spec_min",
            Field::SpecMax => "spec_max",
            Field::ExpectedValue => "expected_value",
            Field::Category => "category",
            Field::IsActive => "is_active",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        let wanted = normalize_header(name);
        Field::ALL.into_iter().find(|f| f.name() == wanted)
    }

    fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Field::ParameterName => &["parameter_name", "parameter", "param", "name", "item_name", "item"],
            Field::Value => &["value", "default_value", "current_value"],
            Field::Module => &["module"],
            Field::Part => &["part"],
            Field::SpecMin => &["spec_min", "min", "lower_limit"],
            Field::SpecMax => &["spec_max", "max", "upper_limit"],
            Field::ExpectedValue => &["expected_value", "expected"],
            Field::Category => &["category"],
            Field::IsActive => &["is_active", "active"],
        }
    }
}

pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Accepted header names per field, in priority order.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    aliases: BTreeMap<Field, Vec<String>>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        let aliases = Field::ALL
            .into_iter()
            .map(|f| (f, f.default_aliases().iter().map(|a| a.to_string()).collect()))
            .collect();
        Self { aliases }
    }
}

impl ColumnMap {
    /// Extra header names for `field`, tried after the built-in ones.
    pub fn with_aliases<I, S>(mut self, field: Field, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = self.aliases.entry(field).or_default();
        for alias in extra {
            let alias = normalize_header(alias.as_ref());
            if !alias.is_empty() && !list.contains(&alias) {
                list.push(alias);
            }
        }
        self
    }

    /// Column index per field for this header row.
    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> HashMap<Field, usize> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
        let mut found = HashMap::new();
        for (field, aliases) in &self.aliases {
            let hit = aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias));
            if let Some(idx) = hit {
                found.insert(*field, idx);
            }
        }
        found
    }
}

/// A header-resolved record source.
pub(crate) struct Columns {
    index: HashMap<Field, usize>,
}

impl Columns {
    pub(crate) fn resolve<S: AsRef<str>>(map: &ColumnMap, headers: &[S], required: &[Field]) -> Result<Self, IoError> {
        let index = map.resolve(headers);
        for field in required {
            if !index.contains_key(field) {
                return Err(IoError::MissingColumn { column: field.name() });
            }
        }
        Ok(Self { index })
    }

    pub(crate) fn get<'r>(&self, record: &'r [String], field: Field) -> Option<&'r str> {
        self.index
            .get(&field)
            .and_then(|&i| record.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub(crate) fn bound(&self, record: &[String], field: Field, line: usize) -> Option<f64> {
        let raw = self.get(record, field)?;
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                log::warn!("line {line}: ignoring non-numeric {} '{raw}'", field.name());
                None
            }
        }
    }
}

/// Turn header + records into parameter rows. Fully blank records are skipped.
pub fn rows_from_records<I>(
    source_id: &str,
    headers: &[String],
    records: I,
    map: &ColumnMap,
) -> Result<Vec<ParameterRow>, IoError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let cols = Columns::resolve(map, headers, &[Field::ParameterName, Field::Value])?;
    let mut rows = Vec::new();

    for (i, record) in records.into_iter().enumerate() {
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        // 1-based, header is line 1
        let line = i + 2;
        let name = cols.get(&record, Field::ParameterName).unwrap_or("");
        let mut row = ParameterRow::new(source_id, name, cols.get(&record, Field::Value))
            .with_scope(cols.get(&record, Field::Module), cols.get(&record, Field::Part))
            .with_spec(
                cols.bound(&record, Field::SpecMin, line),
                cols.bound(&record, Field::SpecMax, line),
            );
        if let Some(expected) = cols.get(&record, Field::ExpectedValue) {
            row = row.with_expected(expected);
        }
        rows.push(row);
    }

    log::debug!("{source_id}: {} parameter row(s)", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header(" Default Value "), "default_value");
        assert_eq!(normalize_header("\u{feff}Spec-Min"), "spec_min");
    }

    #[test]
    fn resolves_default_aliases() {
        let map = ColumnMap::default();
        let idx = map.resolve(&["Name", "Default Value", "MODULE"]);
        assert_eq!(idx[&Field::ParameterName], 0);
        assert_eq!(idx[&Field::Value], 1);
        assert_eq!(idx[&Field::Module], 2);
        assert!(!idx.contains_key(&Field::Part));
    }

    #[test]
    fn canonical_name_preferred_over_alias() {
        let map = ColumnMap::default();
        let idx = map.resolve(&["name", "parameter_name", "value"]);
        assert_eq!(idx[&Field::ParameterName], 1);
    }

    #[test]
    fn extra_aliases() {
        let map = ColumnMap::default().with_aliases(Field::Value, ["Setpoint"]);
        let idx = map.resolve(&["param", "setpoint"]);
        assert_eq!(idx[&Field::Value], 1);
        assert_eq!(Field::from_name("Spec Max"), Some(Field::SpecMax));
    }

    #[test]
    fn records_to_rows() {
        let headers = strings(&["parameter_name", "value", "module", "spec_min", "spec_max"]);
        let records = vec![
            strings(&["Temp", " 48 ", "M1", "10", "50"]),
            strings(&["", "", "", "", ""]),
            strings(&["Speed", "", "", "low", ""]),
        ];
        let rows = rows_from_records("f1", &headers, records, &ColumnMap::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].present_value(), Some("48"));
        assert_eq!(rows[0].module.as_deref(), Some("M1"));
        assert_eq!(rows[0].spec_max, Some(50.0));
        assert_eq!(rows[1].present_value(), None);
        assert_eq!(rows[1].spec_min, None);
    }

    #[test]
    fn missing_required_column() {
        let headers = strings(&["parameter_name", "module"]);
        let err = rows_from_records("f1", &headers, Vec::new(), &ColumnMap::default()).unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { column: "value" }));
    }
}
