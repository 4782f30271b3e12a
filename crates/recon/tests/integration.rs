use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use proptest::prelude::*;

use paramgrid_recon::{
    analyze, summarize, ComparisonEngine, LoadError, ParameterRow, ResultCache,
};

type Fixture = HashMap<String, Vec<(String, Option<String>)>>;

fn engine_for(data: Fixture) -> ComparisonEngine<impl Fn(&str) -> Result<Vec<ParameterRow>, LoadError>> {
    let loader = move |source: &str| -> Result<Vec<ParameterRow>, LoadError> {
        let rows = data
            .get(source)
            .ok_or_else(|| LoadError::new(source, "cannot open file"))?;
        Ok(rows
            .iter()
            .map(|(name, value)| ParameterRow::new(source, name.as_str(), value.as_deref()))
            .collect())
    };
    ComparisonEngine::new(loader, Arc::new(ResultCache::new(8)))
}

fn fixture(sources: &[(&str, &[(&str, Option<&str>)])]) -> Fixture {
    sources
        .iter()
        .map(|(src, rows)| {
            (
                src.to_string(),
                rows.iter()
                    .map(|(n, v)| (n.to_string(), v.map(str::to_string)))
                    .collect(),
            )
        })
        .collect()
}

// -------------------------------------------------------------------------
// End-to-end
// -------------------------------------------------------------------------

#[test]
fn compare_then_propose_mother_values() {
    let data = fixture(&[
        ("line1.csv", &[("P1", Some("100")), ("P2", Some("on")), ("P3", Some("400"))]),
        ("line2.csv", &[("P1", Some("100")), ("P2", Some("on")), ("P3", Some("400"))]),
        ("line3.csv", &[("P1", Some("100")), ("P2", Some("on")), ("P3", Some("500"))]),
        ("line4.csv", &[("P1", Some("100")), ("P2", None), ("P3", Some("500"))]),
        ("line5.csv", &[("P1", Some("200")), ("P2", Some("on")), ("P3", Some("500"))]),
    ]);
    let engine = engine_for(data);
    let sources = ["line1.csv", "line2.csv", "line3.csv", "line4.csv", "line5.csv"];
    let table = engine.compare(&sources);

    let summary = summarize(&table);
    assert_eq!(summary.total_parameters, 3);
    assert_eq!(summary.different_parameters, 2);
    assert_eq!(summary.missing_cells, 1);

    let candidates = analyze(&table, &sources, 0.8).unwrap();
    let names: Vec<&str> = candidates.iter().map(|c| c.parameter_name.as_str()).collect();
    // P1 (4 of 5 agree, one dissent) outranks P2 (4 of 5 agree, one missing);
    // P3 only reaches 60%.
    assert_eq!(names, vec!["P1", "P2"]);
    assert_eq!(candidates[0].default_value, "100");
    assert_eq!(candidates[0].occurrence_count, 4);
    assert!(candidates[0].confidence_score > candidates[1].confidence_score);
}

#[test]
fn long_form_lists_every_cell() {
    let data = fixture(&[
        ("a.csv", &[("P1", Some("1")), ("P2", Some("2"))]),
        ("b.csv", &[("P1", Some("1"))]),
    ]);
    let engine = engine_for(data);
    let table = engine.compare(&["b.csv", "a.csv"]);
    let cells = table.long_form();
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[0].parameter_name, "P1");
    assert_eq!(cells[0].source_id, "a.csv");
    assert_eq!(cells[3].source_id, "b.csv");
    assert_eq!(cells[3].value, None);
}

#[test]
fn unreadable_source_does_not_abort() {
    let data = fixture(&[("a.csv", &[("P1", Some("1"))])]);
    let engine = engine_for(data);
    let table = engine.compare(&["a.csv", "gone.csv"]);
    assert!(!table.is_complete());
    assert_eq!(table.load_errors[0].source_id, "gone.csv");
    assert_eq!(table.rows.len(), 1);
    assert_eq!(summarize(&table).failed_sources, 1);
}

#[test]
fn unnamed_rows_never_become_candidates() {
    let data = fixture(&[
        ("a.csv", &[("", Some("x")), ("P1", Some("1"))]),
        ("b.csv", &[("  ", Some("x")), ("P1", Some("1"))]),
    ]);
    let engine = engine_for(data);
    let sources = ["a.csv", "b.csv"];
    let table = engine.compare(&sources);

    let rows: Vec<&str> = table.rows.iter().map(|r| r.parameter_name.as_str()).collect();
    assert_eq!(rows, vec!["P1"]);

    let candidates = analyze(&table, &sources, 0.5).unwrap();
    let names: Vec<&str> = candidates.iter().map(|c| c.parameter_name.as_str()).collect();
    assert_eq!(names, vec!["P1"]);
}

#[test]
fn comparison_serializes_for_exporters() {
    let data = fixture(&[("a.csv", &[("P1", Some("1"))]), ("b.csv", &[("P1", Some("2"))])]);
    let engine = engine_for(data);
    let table = engine.compare(&["a.csv", "b.csv"]);
    let json = serde_json::to_value(&*table).unwrap();
    assert_eq!(json["rows"][0]["is_different"], true);
    assert_eq!(json["rows"][0]["values_by_source"]["b.csv"], "2");
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

fn cell() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(String::new())),
        4 => "[a-c]{1}".prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn is_different_iff_more_than_one_distinct_value(
        grid in prop::collection::vec(prop::collection::vec(cell(), 4), 1..20)
    ) {
        // grid[param][source]
        let sources = ["s0", "s1", "s2", "s3"];
        let mut data: Fixture = HashMap::new();
        for (p, cells) in grid.iter().enumerate() {
            for (s, value) in cells.iter().enumerate() {
                data.entry(sources[s].to_string())
                    .or_default()
                    .push((format!("P{p:02}"), value.clone()));
            }
        }
        let engine = engine_for(data);
        let table = engine.compare(&sources);
        prop_assert_eq!(table.rows.len(), grid.len());

        for (row, cells) in table.rows.iter().zip(grid.iter()) {
            let distinct: BTreeSet<&str> = cells
                .iter()
                .filter_map(|c| c.as_deref())
                .filter(|v| !v.is_empty())
                .collect();
            prop_assert_eq!(row.is_different, distinct.len() > 1);
        }
    }

    #[test]
    fn cache_never_exceeds_capacity(capacity in 1usize..6, keys in prop::collection::vec(0u8..12, 0..40)) {
        let cache = ResultCache::new(capacity);
        let empty = Arc::new(paramgrid_recon::ComparisonTable {
            sources: Vec::new(),
            rows: Vec::new(),
            load_errors: Vec::new(),
        });
        for k in keys {
            cache.set(&[format!("k{k}")], Arc::clone(&empty));
            prop_assert!(cache.len() <= capacity);
        }
    }
}
