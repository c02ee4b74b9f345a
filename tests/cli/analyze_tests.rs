//! Tests for the `analyze` CLI command
//!
//! - `analyze [DIR]` - analyze every file of a project
//! - `--rules a,b` - restrict the rule set
//! - `--in-process` - skip the worker thread

use crate::common::{assert_contains, assert_not_contains, assert_valid_json, TestRepo};

// ============================================================================
// TEXT OUTPUT TESTS
// ============================================================================

#[test]
fn test_analyze_text_lists_issues_per_file() {
    let repo = TestRepo::new();
    repo.with_mixed_layout();

    let output = repo.run_cli_success(&["analyze", "--rules", "no-debugger"]);
    assert_contains(&output, "src/app.js");
    assert_contains(&output, "2:2  no-debugger");
    assert_contains(&output, "template-Handler.yaml");
    assert_not_contains(&output, "node_modules");
    assert_contains(&output, "2 issue(s)");
}

#[test]
fn test_analyze_in_process_matches_worker_output() {
    let repo = TestRepo::new();
    repo.with_mixed_layout();

    let worker = repo.run_cli_success(&["analyze", "-f", "json"]);
    let in_process = repo.run_cli_success(&["analyze", "-f", "json", "--in-process"]);
    assert_eq!(
        assert_valid_json(&worker, "worker"),
        assert_valid_json(&in_process, "in-process")
    );
}

// ============================================================================
// JSON OUTPUT TESTS
// ============================================================================

#[test]
fn test_analyze_json_shape() {
    let repo = TestRepo::new();
    repo.add_file("a.js", "debugger;\n")
        .add_file("broken.js", "let = ;\n");

    let output = repo.run_cli_success(&["analyze", "-f", "json", "--rules", "no-debugger"]);
    let json = assert_valid_json(&output, "analyze json");

    let files = json["files"].as_object().expect("files object");
    assert_eq!(files.len(), 2);

    let (_, ok) = files.iter().find(|(k, _)| k.ends_with("/a.js")).unwrap();
    assert_eq!(ok["issues"][0]["ruleId"], "no-debugger");
    assert_eq!(ok["issues"][0]["line"], 1);
    assert_eq!(ok["issues"][0]["column"], 0);

    let (_, broken) = files.iter().find(|(k, _)| k.ends_with("/broken.js")).unwrap();
    assert_eq!(broken["code"], "PARSING");
    assert_eq!(broken["line"], 1);

    assert_eq!(json["meta"]["filesAnalyzed"], 2);
    assert_eq!(json["cancelled"], false);
}

#[test]
fn test_analyze_respects_exclusions() {
    let repo = TestRepo::new();
    repo.add_file("src/a.js", "debugger;\n")
        .add_file("src/gen/b.js", "debugger;\n");

    let output = repo.run_cli_success(&["analyze", "-f", "json", "--exclude", "**/gen/**"]);
    let json = assert_valid_json(&output, "analyze exclusions");
    let files = json["files"].as_object().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.keys().all(|k| k.ends_with("/src/a.js")));
}

#[test]
fn test_analyze_test_files_need_include_tests() {
    let repo = TestRepo::new();
    repo.add_file("test/a.test.js", "debugger;\n");

    let without = repo.run_cli_success(&["analyze", "-f", "json", "--tests", "test"]);
    let json = assert_valid_json(&without, "without tests");
    let (_, result) = json["files"].as_object().unwrap().iter().next().unwrap();
    assert_eq!(result["issues"].as_array().unwrap().len(), 0);

    let with = repo.run_cli_success(&["analyze", "-f", "json", "--tests", "test", "--include-tests"]);
    let json = assert_valid_json(&with, "with tests");
    let (_, result) = json["files"].as_object().unwrap().iter().next().unwrap();
    assert_eq!(result["issues"].as_array().unwrap().len(), 1);
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

#[test]
fn test_analyze_missing_dir_fails() {
    let repo = TestRepo::new();
    let (_, stderr) = repo.run_cli_failure(&["analyze", "does-not-exist"]);
    assert_contains(&stderr, "File not found");
}
