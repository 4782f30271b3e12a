//! File-backed sources through the comparison engine and checklist store.

use std::fs;
use std::sync::Arc;

use paramgrid_io::{import_checklist_csv, ChecklistStore, ColumnMap, Field, FileLoader};
use paramgrid_qc::UnifiedQcSystem;
use paramgrid_recon::{CandidateAnalyzer, ComparisonEngine, ParameterKey, ResultCache};
use tempfile::tempdir;

#[test]
fn compare_csv_sources_with_mixed_layouts() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("line1.csv"), "parameter_name,value\nP1,100\nP2,5\n").unwrap();
    fs::write(dir.path().join("line2.csv"), "Name;Default Value\nP1;100\nP2;6\n").unwrap();
    fs::write(dir.path().join("line3.tsv"), "param\tsetpoint\nP1\t100\n").unwrap();

    let loader = FileLoader {
        columns: ColumnMap::default().with_aliases(Field::Value, ["setpoint"]),
        base: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let engine = ComparisonEngine::new(loader, Arc::new(ResultCache::new(4)));
    let sources = ["line1.csv", "line2.csv", "line3.tsv"];
    let table = engine.compare(&sources);

    assert!(table.is_complete());
    assert_eq!(table.rows.len(), 2);
    let p1 = table.row(&ParameterKey::new("P1", None, None)).unwrap();
    assert!(!p1.is_different);
    let p2 = table.row(&ParameterKey::new("P2", None, None)).unwrap();
    assert!(p2.is_different);
    assert_eq!(p2.missing_count, 1);

    let candidates = CandidateAnalyzer::new(0.6).unwrap().analyze(&table, &sources);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].parameter_name, "P1");
    assert_eq!(candidates[0].confidence_score, 1.0);

    // Second call is served from the cache.
    let again = engine.compare(&["line3.tsv", "line1.csv", "line2.csv"]);
    assert!(Arc::ptr_eq(&table, &again));
}

#[test]
fn missing_source_is_recorded_not_fatal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "parameter_name,value\nP1,1\n").unwrap();

    let loader = FileLoader {
        base: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let engine = ComparisonEngine::new(loader, Arc::new(ResultCache::new(4)));
    let table = engine.compare(&["a.csv", "gone.csv"]);

    assert_eq!(table.load_errors.len(), 1);
    assert_eq!(table.load_errors[0].source_id, "gone.csv");
    assert_eq!(table.rows[0].missing_count, 1);
    assert!(engine.cache().is_empty());
}

#[test]
fn imported_checklist_drives_qc() {
    let dir = tempdir().unwrap();
    let checklist_csv = dir.path().join("checklist.csv");
    fs::write(
        &checklist_csv,
        "item_name,module,part,spec_min,spec_max\nTemp,M1,A,10,50\nTemp,,,0,100\n",
    )
    .unwrap();
    let source = dir.path().join("line1.csv");
    fs::write(
        &source,
        "parameter_name,module,part,value\nTemp,M1,A,60\nTemp,M2,B,60\nTemp,M1,A2,48\n",
    )
    .unwrap();

    let mut store = ChecklistStore::open(dir.path().join("checklist.db")).unwrap();
    import_checklist_csv(&mut store, &checklist_csv, &ColumnMap::default()).unwrap();
    let checklist = store.load_checklist().unwrap();

    let rows = FileLoader::default().load_path(source.to_str().unwrap()).unwrap();
    let verdict = UnifiedQcSystem::default().perform_qc(&rows, Some(&checklist));

    assert!(!verdict.qc_passed);
    assert_eq!(verdict.failed_count, 1);
    assert_eq!(verdict.issues[0].row, 0);
    let summary = verdict.checklist_summary.unwrap();
    assert_eq!(summary.checklist_params, 3);
    assert_eq!(summary.validated_params, 2);
}
