// End-to-end tests for the pgrid binary: --json stdout contract and exit codes.
//
// Every test writes its own settings file and passes it with --config so the
// user's real settings are never read.
//
// Run with: cargo test -p paramgrid-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(role: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.toml");
        let db = dir.path().join("checklist.db");
        fs::write(
            &config,
            format!(
                "[session]\nrole = \"{role}\"\n\n[checklist]\ndatabase = \"{}\"\n",
                db.display().to_string().replace('\\', "/")
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn file(&self, name: &str, content: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_pgrid"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env_remove("PGRID_CONFIG")
            .env_remove("PGRID_LOG")
            .output()
            .expect("spawn pgrid")
    }
}

/// Assert stdout is exactly one JSON value.
fn json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!(
            "stdout must be a single JSON value: {e}\nstdout:\n{stdout}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

// ===========================================================================
// compare
// ===========================================================================

#[test]
fn compare_json_reports_differences() {
    let ws = Workspace::new("viewer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,100\nP2,5\n");
    let b = ws.file("b.csv", "Name;Default Value\nP1;100\nP2;6\n");

    let out = ws.run(&["compare", &a, &b, "--json"]);
    assert_eq!(code(&out), 0, "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let val = json(&out);

    assert_eq!(val["summary"]["total_parameters"], 2);
    assert_eq!(val["summary"]["different_parameters"], 1);
    assert_eq!(val["rows"].as_array().unwrap().len(), 2);
    assert_eq!(val["load_errors"].as_array().unwrap().len(), 0);

    let out = ws.run(&["compare", &a, &b, "--json", "--differences-only"]);
    let val = json(&out);
    let rows = val["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["parameter_name"], "P2");
    assert_eq!(rows[0]["values_by_source"][a.as_str()], "5");
}

#[test]
fn compare_long_form_has_one_record_per_cell() {
    let ws = Workspace::new("viewer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,1\nP2,2\n");
    let b = ws.file("b.csv", "parameter_name,value\nP1,1\n");

    let out = ws.run(&["compare", &a, &b, "--long", "--json"]);
    assert_eq!(code(&out), 0);
    let records = json(&out);
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records
        .iter()
        .any(|r| r["parameter_name"] == "P2" && r["source_id"] == b.as_str() && r["value"].is_null()));
}

#[test]
fn missing_source_warns_unless_strict() {
    let ws = Workspace::new("viewer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,1\n");
    let gone = ws.path().join("gone.csv");
    let gone = gone.to_str().unwrap();

    let out = ws.run(&["compare", &a, gone, "--json"]);
    assert_eq!(code(&out), 0);
    let val = json(&out);
    assert_eq!(val["load_errors"][0]["source_id"], gone);
    assert_eq!(val["summary"]["failed_sources"], 1);

    let out = ws.run(&["compare", &a, gone, "--strict"]);
    assert_eq!(code(&out), 11);
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to load"));
}

// ===========================================================================
// candidates
// ===========================================================================

#[test]
fn candidates_require_mother_db_capability() {
    let ws = Workspace::new("viewer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,1\n");

    let out = ws.run(&["candidates", &a]);
    assert_eq!(code(&out), 5);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("role 'viewer'"), "stderr: {stderr}");
    assert!(out.stdout.is_empty());
}

#[test]
fn candidates_json_lists_agreeing_parameters() {
    let ws = Workspace::new("engineer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,100\nP2,5\n");
    let b = ws.file("b.csv", "parameter_name,value\nP1,100\nP2,6\n");
    let c = ws.file("c.csv", "parameter_name,value\nP1,100\nP2,7\n");

    let out = ws.run(&["candidates", &a, &b, &c, "--min-rate", "0.6", "--json"]);
    assert_eq!(code(&out), 0, "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let val = json(&out);
    assert_eq!(val["total_sources"], 3);
    let candidates = val["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["parameter_name"], "P1");
    assert_eq!(candidates[0]["default_value"], "100");
    assert_eq!(candidates[0]["occurrence_count"], 3);
}

#[test]
fn candidates_count_each_source_once() {
    let ws = Workspace::new("engineer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,100\n");
    let b = ws.file("b.csv", "parameter_name,value\nP1,100\n");

    let out = ws.run(&["candidates", &a, &b, &a, "--json"]);
    assert_eq!(code(&out), 0);
    let val = json(&out);
    assert_eq!(val["total_sources"], 2);
    assert_eq!(val["candidates"][0]["total_sources"], 2);
}

#[test]
fn candidates_reject_out_of_range_rate() {
    let ws = Workspace::new("engineer");
    let a = ws.file("a.csv", "parameter_name,value\nP1,1\n");

    let out = ws.run(&["candidates", &a, "--min-rate", "1.5"]);
    assert_eq!(code(&out), 2);
}

// ===========================================================================
// qc + checklist
// ===========================================================================

#[test]
fn qc_fails_against_imported_checklist() {
    let ws = Workspace::new("admin");
    let checklist = ws.file("checklist.csv", "item_name,spec_min,spec_max\nP1,0,10\n");
    let source = ws.file("tool.csv", "parameter_name,value\nP1,50\nP2,5\n");

    let out = ws.run(&["checklist", "import", &checklist, "--json"]);
    assert_eq!(code(&out), 0, "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(json(&out)["inserted"], 1);

    let out = ws.run(&["qc", &source, "--json"]);
    assert_eq!(code(&out), 10);
    let val = json(&out);
    let verdict = &val[0];
    assert_eq!(verdict["source"], source.as_str());
    assert_eq!(verdict["qc_passed"], false);
    assert_eq!(verdict["total_parameters"], 2);
    assert_eq!(verdict["failed_count"], 1);
    assert_eq!(verdict["issues"][0]["severity"], "CRITICAL");
    assert_eq!(verdict["issues"][0]["issue_type"], "out_of_range");

    // Structural checks alone pass.
    let out = ws.run(&["qc", &source, "--no-checklist", "--json"]);
    assert_eq!(code(&out), 0);
    assert_eq!(json(&out)[0]["qc_passed"], true);
}

#[test]
fn qc_reports_unreadable_source_and_keeps_going() {
    let ws = Workspace::new("operator");
    let good = ws.file("a.csv", "parameter_name,value\nP1,1\n");
    let gone = ws.path().join("gone.csv");
    let gone = gone.to_str().unwrap();

    let out = ws.run(&["qc", &good, gone, "--no-checklist", "--json"]);
    assert_eq!(code(&out), 11);
    let val = json(&out);
    let entries = val.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["source"], good.as_str());
    assert_eq!(entries[0]["qc_passed"], true);
    assert!(entries[0].get("load_error").is_none());
    assert_eq!(entries[1]["source"], gone);
    assert!(entries[1]["load_error"].as_str().unwrap().contains("cannot read"));
    assert!(entries[1].get("qc_passed").is_none());

    // A failing verdict outranks the load error.
    let bad = ws.file("b.csv", "parameter_name,value\nP1,\n");
    let out = ws.run(&["qc", &bad, gone, "--no-checklist"]);
    assert_eq!(code(&out), 10);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("NOT LOADED"), "stdout: {stdout}");
}

#[test]
fn qc_requires_run_capability() {
    let ws = Workspace::new("viewer");
    let source = ws.file("tool.csv", "parameter_name,value\nP1,1\n");
    assert_eq!(code(&ws.run(&["qc", &source])), 5);
}

#[test]
fn duplicate_active_checklist_item_is_rejected() {
    let ws = Workspace::new("admin");
    let checklist = ws.file("checklist.csv", "item_name,module,spec_max\nP1,M1,10\n");

    assert_eq!(code(&ws.run(&["checklist", "import", &checklist])), 0);
    let out = ws.run(&["checklist", "import", &checklist]);
    assert_eq!(code(&out), 20);
    assert!(String::from_utf8_lossy(&out.stderr).contains("hint:"));

    let out = ws.run(&["checklist", "list", "--json"]);
    assert_eq!(code(&out), 0);
    assert_eq!(json(&out).as_array().unwrap().len(), 1);
}

#[test]
fn checklist_edits_require_capability_but_list_does_not() {
    let ws = Workspace::new("operator");
    let checklist = ws.file("checklist.csv", "item_name\nP1\n");

    assert_eq!(code(&ws.run(&["checklist", "import", &checklist])), 5);
    let out = ws.run(&["checklist", "list", "--json"]);
    assert_eq!(code(&out), 0);
    assert_eq!(json(&out), serde_json::json!([]));
}

#[test]
fn migrate_is_a_noop_on_a_current_database() {
    let ws = Workspace::new("admin");

    let out = ws.run(&["checklist", "migrate", "--json"]);
    assert_eq!(code(&out), 0, "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let report = json(&out);
    assert_eq!(report["to_version"], 2);
    assert!(report["snapshot_id"].is_null());

    let out = ws.run(&["checklist", "rollback"]);
    assert_eq!(code(&out), 23);
}

// ===========================================================================
// config
// ===========================================================================

#[test]
fn invalid_settings_exit_with_config_code() {
    let ws = Workspace::new("engineer");
    fs::write(&ws.config, "[qc]\nnear_limit_ratio = 2.0\n").unwrap();
    let a = ws.file("a.csv", "parameter_name,value\nP1,1\n");

    let out = ws.run(&["compare", &a]);
    assert_eq!(code(&out), 4);
}

#[test]
fn config_init_writes_loadable_defaults() {
    let ws = Workspace::new("engineer");
    fs::remove_file(&ws.config).unwrap();

    assert_eq!(code(&ws.run(&["config", "init"])), 0);
    assert!(ws.config.exists());
    assert_eq!(code(&ws.run(&["config", "init"])), 4);
    assert_eq!(code(&ws.run(&["config", "init", "--force"])), 0);

    let out = ws.run(&["config", "path", "--json"]);
    let val = json(&out);
    assert_eq!(val["exists"], true);
}
