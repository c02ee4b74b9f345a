//! Tests for scripts embedded in HTML and YAML host documents

use std::sync::Arc;

use embedscan::analysis::{analyze_html, analyze_yaml, AnalysisInput};
use embedscan::linter::rules::{EQEQEQ, NO_DEBUGGER, NO_DUPE_KEYS};
use embedscan::{AnalysisConfig, Linter, RuleConfig, RuleRegistry, ScanError};

use crate::common::TestRepo;

fn linter(rules: &[&str]) -> Linter {
    let configs: Vec<RuleConfig> = rules.iter().map(|r| RuleConfig::new(*r)).collect();
    Linter::new(Arc::new(RuleRegistry::builtin()), &configs)
}

// ============================================================================
// YAML HOST TESTS
// ============================================================================

#[test]
fn test_zipfile_parse_error_is_reported_on_host_line() {
    let repo = TestRepo::new();
    repo.add_file(
        "doc.yaml",
        "Resources:\n Fn:\n  Type: AWS::Lambda::Function\n  Properties:\n   Runtime: nodejs18.x\n   Code:\n     ZipFile: x=\n",
    );

    let input = AnalysisInput::new(repo.file("doc.yaml"));
    let result = analyze_yaml(&input, &linter(&[NO_DEBUGGER]), &AnalysisConfig::default());

    match result {
        Err(ScanError::Parsing(err)) => {
            assert_eq!(err.line, Some(7));
        }
        other => panic!("expected a parsing error, got {:?}", other),
    }
}

#[test]
fn test_lambda_issue_uses_synthetic_path_and_host_position() {
    let repo = TestRepo::new();
    repo.add_lambda_template(
        "template.yaml",
        "Handler",
        "exports.handler = () => {\n  debugger;\n};",
    );

    let input = AnalysisInput::new(repo.file("template.yaml"));
    let outputs = analyze_yaml(&input, &linter(&[NO_DEBUGGER]), &AnalysisConfig::default()).unwrap();

    let synthetic = repo.file("template-Handler.yaml");
    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec![&synthetic]);
    let issues = &outputs[&synthetic].issues;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule_id, NO_DEBUGGER);
    assert_eq!((issues[0].line, issues[0].column), (9, 12));
}

#[test]
fn test_non_node_runtime_is_ignored() {
    let repo = TestRepo::new();
    repo.add_file(
        "template.yaml",
        "Resources:\n  Fn:\n    Type: AWS::Lambda::Function\n    Properties:\n      Runtime: python3.12\n      Code:\n        ZipFile: debugger\n",
    );

    let input = AnalysisInput::new(repo.file("template.yaml"));
    let outputs = analyze_yaml(&input, &linter(&[NO_DEBUGGER]), &AnalysisConfig::default()).unwrap();

    // no snippets: one empty output on the host path
    assert_eq!(outputs.len(), 1);
    assert!(outputs[&repo.file("template.yaml")].issues.is_empty());
}

// ============================================================================
// HTML HOST TESTS
// ============================================================================

#[test]
fn test_html_scripts_report_on_host_path() {
    let repo = TestRepo::new();
    repo.add_html_page("index.html", "if (a == b) { go(); }");

    let input = AnalysisInput::new(repo.file("index.html"));
    let outputs = analyze_html(&input, &linter(&[EQEQEQ]), &AnalysisConfig::default()).unwrap();

    let issues = &outputs[&repo.file("index.html")].issues;
    assert_eq!(issues.len(), 1);
    assert_eq!((issues[0].line, issues[0].column), (5, 6));
    assert_eq!((issues[0].end_line, issues[0].end_column), (5, 8));
}

#[test]
fn test_multiple_scripts_merge_into_one_output() {
    let html = "<script>debugger;</script>\n<p>text</p>\n<script>\n  debugger;\n</script>\n";
    let input = AnalysisInput::new("/p/page.html").with_content(html);
    let outputs = analyze_html(&input, &linter(&[NO_DEBUGGER]), &AnalysisConfig::default()).unwrap();

    assert_eq!(outputs.len(), 1);
    let lines: Vec<(usize, usize)> = outputs[&"/p/page.html".into()]
        .issues
        .iter()
        .map(|i| (i.line, i.column))
        .collect();
    assert_eq!(lines, vec![(1, 8), (4, 2)]);
}

#[test]
fn test_secondary_locations_survive_patching() {
    let html = "<div></div>\n<script>\nconst o = {\n  a: 1,\n  a: 2,\n};\n</script>\n";
    let input = AnalysisInput::new("/p/page.html").with_content(html);
    let outputs = analyze_html(&input, &linter(&[NO_DUPE_KEYS]), &AnalysisConfig::default()).unwrap();

    let issues = &outputs[&"/p/page.html".into()].issues;
    assert_eq!(issues.len(), 1);
    assert_eq!((issues[0].line, issues[0].column), (5, 2));
    let secondary = &issues[0].secondary_locations;
    assert_eq!(secondary.len(), 1);
    assert_eq!((secondary[0].line, secondary[0].column), (4, 2));
}
