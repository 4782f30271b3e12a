use std::collections::BTreeMap;

use crate::model::{ComparisonRow, ParameterKey, ParameterRow};

/// Group loaded rows by parameter key in a single pass and align them across
/// `sources`. Sources with no row for a key (including sources that failed to
/// load) get an absent cell. Within one source the first row with a value
/// for a key wins. Rows with a blank parameter name are skipped.
pub fn group_by_parameter<'a, I>(sources: &[String], loaded: I) -> Vec<ComparisonRow>
where
    I: IntoIterator<Item = &'a ParameterRow>,
{
    let mut groups: BTreeMap<ParameterKey, BTreeMap<&'a str, Option<&'a str>>> = BTreeMap::new();

    for row in loaded {
        let key = row.key();
        if key.parameter_name.is_empty() {
            continue;
        }
        let cell = groups
            .entry(key)
            .or_default()
            .entry(row.source_id.as_str())
            .or_insert(None);
        if cell.is_none() {
            *cell = row.present_value();
        }
    }

    groups
        .into_iter()
        .map(|(key, cells)| {
            let mut values_by_source = BTreeMap::new();
            let mut missing_count = 0;
            let mut first: Option<&str> = None;
            let mut is_different = false;

            for source in sources {
                let value = cells.get(source.as_str()).copied().flatten();
                match value {
                    Some(v) => match first {
                        None => first = Some(v),
                        Some(f) if f != v => is_different = true,
                        Some(_) => {}
                    },
                    None => missing_count += 1,
                }
                values_by_source.insert(source.clone(), value.map(str::to_string));
            }

            ComparisonRow {
                parameter_name: key.parameter_name,
                module: key.module,
                part: key.part,
                values_by_source,
                missing_count,
                is_different,
            }
        })
        .collect()
}
