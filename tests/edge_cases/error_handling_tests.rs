//! Error Handling and Edge Case Tests

use std::sync::Arc;

use embedscan::analysis::{analyze_html, analyze_jsts, analyze_yaml, AnalysisInput};
use embedscan::linter::rules::{EQEQEQ, NO_DEBUGGER};
use embedscan::{AnalysisConfig, Linter, RuleConfig, RuleRegistry, ScanError};

use crate::common::{assert_valid_json, TestRepo};

fn linter() -> Linter {
    Linter::new(Arc::new(RuleRegistry::builtin()), &[RuleConfig::new(NO_DEBUGGER)])
}

// ============================================================================
// EMPTY FILE TESTS
// ============================================================================

#[test]
fn test_empty_script_file() {
    let input = AnalysisInput::new("/p/empty.js").with_content("");
    let output = analyze_jsts(&input, &linter()).unwrap();
    assert!(output.issues.is_empty());
}

#[test]
fn test_empty_host_documents() {
    let html = AnalysisInput::new("/p/empty.html").with_content("");
    let outputs = analyze_html(&html, &linter(), &AnalysisConfig::default()).unwrap();
    assert_eq!(outputs.len(), 1);

    let yaml = AnalysisInput::new("/p/empty.yaml").with_content("");
    let outputs = analyze_yaml(&yaml, &linter(), &AnalysisConfig::default()).unwrap();
    assert_eq!(outputs.len(), 1);
}

#[test]
fn test_empty_project_completes() {
    let repo = TestRepo::new();
    repo.add_empty_file("README.md");

    let output = repo.run_cli_success(&["analyze", "-f", "json"]);
    let json = assert_valid_json(&output, "empty project");
    assert_eq!(json["files"].as_object().unwrap().len(), 0);
    assert_eq!(json["meta"]["filesAnalyzed"], 0);
}

// ============================================================================
// MALFORMED INPUT TESTS
// ============================================================================

#[test]
fn test_missing_file_is_not_found() {
    let input = AnalysisInput::new("/definitely/not/here.js");
    assert!(matches!(
        analyze_jsts(&input, &linter()),
        Err(ScanError::FileNotFound { .. })
    ));
}

#[test]
fn test_binary_content_is_skipped() {
    let repo = TestRepo::new();
    repo.add_file("blob.js", "\u{0}\u{1}\u{2}debugger;");

    let output = repo.run_cli_success(&["analyze", "-f", "json"]);
    let json = assert_valid_json(&output, "binary");
    assert_eq!(json["files"].as_object().unwrap().len(), 0);
}

#[test]
fn test_unsupported_extension() {
    let input = AnalysisInput::new("/p/script.py").with_content("print(1)");
    assert!(matches!(
        analyze_jsts(&input, &linter()),
        Err(ScanError::UnsupportedLanguage { .. })
    ));
}

#[test]
fn test_malformed_yaml_host_is_a_parsing_error() {
    let input = AnalysisInput::new("/p/bad.yaml").with_content("Resources:\n  - [unclosed\n");
    assert!(matches!(
        analyze_yaml(&input, &linter(), &AnalysisConfig::default()),
        Err(ScanError::Parsing(_))
    ));
}

#[test]
fn test_oversized_script_is_skipped_in_project() {
    let repo = TestRepo::new();
    let bundle = "debugger;\n".repeat(200);
    repo.add_file("bundle.js", &bundle)
        .add_file("app.js", "debugger;\n");

    let output = repo.run_cli_success(&["analyze", "-f", "json", "--max-file-size-kb", "1"]);
    let json = assert_valid_json(&output, "oversized");
    let files = json["files"].as_object().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.keys().all(|k| k.ends_with("/app.js")));
}

// ============================================================================
// XHTML TESTS
// ============================================================================

#[test]
fn test_cdata_wrapped_script_is_analyzed() {
    let html = "<html>\n<script><![CDATA[\nif (a == b) { go(); }\n]]></script>\n</html>\n";
    let input = AnalysisInput::new("/p/page.xhtml.html").with_content(html);
    let linter = Linter::new(Arc::new(RuleRegistry::builtin()), &[RuleConfig::new(EQEQEQ)]);
    let outputs = analyze_html(&input, &linter, &AnalysisConfig::default()).unwrap();

    let issues = &outputs[&"/p/page.xhtml.html".into()].issues;
    assert_eq!(issues.len(), 1);
    assert_eq!((issues[0].line, issues[0].column), (3, 6));
    assert_eq!((issues[0].end_line, issues[0].end_column), (3, 8));
}

#[test]
fn test_cdata_on_script_line_keeps_columns() {
    let html = "<script><![CDATA[ debugger; ]]></script>\n";
    let input = AnalysisInput::new("/p/inline.html").with_content(html);
    let outputs = analyze_html(&input, &linter(), &AnalysisConfig::default()).unwrap();

    let issues = &outputs[&"/p/inline.html".into()].issues;
    assert_eq!(issues.len(), 1);
    assert_eq!((issues[0].line, issues[0].column), (1, 18));
}
