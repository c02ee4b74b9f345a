//! Tests for whole-project analysis over a real filesystem

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use embedscan::analysis::{analyze_project, ProjectOutcome};
use embedscan::linter::rules::{EQEQEQ, NO_DEBUGGER};
use embedscan::stores::{InputFile, InputFiles};
use embedscan::{
    AnalysisConfig, FileResult, Linter, NormalizedPath, ProjectAnalysisInput, ProjectStores,
    RuleConfig, RuleRegistry,
};

use crate::common::{expect_issues, result_for, TestRepo};

fn linter() -> Linter {
    Linter::new(
        Arc::new(RuleRegistry::builtin()),
        &[RuleConfig::new(NO_DEBUGGER), RuleConfig::new(EQEQEQ)],
    )
}

fn run(input: &ProjectAnalysisInput) -> (Vec<(NormalizedPath, FileResult)>, ProjectOutcome) {
    let mut stores = ProjectStores::new();
    let mut results = Vec::new();
    let outcome = analyze_project(
        input,
        &mut stores,
        &linter(),
        &AtomicBool::new(false),
        |path, result| results.push((path, result)),
    )
    .unwrap();
    (results, outcome)
}

#[test]
fn test_mixed_project_reports_every_host() {
    let repo = TestRepo::new();
    repo.with_mixed_layout();

    let (results, outcome) = run(&ProjectAnalysisInput::new(repo.base_dir()));

    let app = expect_issues(result_for(&results, &repo.file("src/app.js")), "app.js");
    assert_eq!(app.len(), 1);
    assert_eq!((app[0].line, app[0].column), (2, 2));

    let page = expect_issues(result_for(&results, &repo.file("public/index.html")), "index.html");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].rule_id, EQEQEQ);

    let lambda = expect_issues(
        result_for(&results, &repo.file("infra/template-Handler.yaml")),
        "template-Handler.yaml",
    );
    assert_eq!(lambda.len(), 1);
    assert_eq!(lambda[0].line, 9);

    assert!(results.iter().all(|(p, _)| !p.as_str().contains("node_modules")));

    let ProjectOutcome::Completed(meta) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(meta.files_analyzed, 4);
    assert_eq!(meta.package_manifests, 1);
    assert!(meta.warnings.is_empty(), "{:?}", meta.warnings);
}

#[test]
fn test_parse_error_does_not_abort_project() {
    let repo = TestRepo::new();
    repo.add_file("a.js", "let = ;")
        .add_file("b.js", "debugger;");

    let (results, outcome) = run(&ProjectAnalysisInput::new(repo.base_dir()));

    assert!(matches!(
        result_for(&results, &repo.file("a.js")),
        FileResult::ParsingError(_)
    ));
    assert_eq!(
        expect_issues(result_for(&results, &repo.file("b.js")), "b.js").len(),
        1
    );
    assert!(matches!(outcome, ProjectOutcome::Completed(_)));
}

#[test]
fn test_supplied_content_overrides_disk() {
    let repo = TestRepo::new();
    repo.add_file("a.js", "debugger;");

    let mut files = InputFiles::new();
    files.insert(repo.file("a.js"), InputFile::with_content("a();"));
    let input = ProjectAnalysisInput {
        files: Some(files),
        ..ProjectAnalysisInput::new(repo.base_dir())
    };

    let (results, _) = run(&input);
    assert_eq!(results.len(), 1);
    assert!(expect_issues(&results[0].1, "a.js").is_empty());
}

#[test]
fn test_sandboxed_project_warns_without_tsconfig() {
    let mut files = InputFiles::new();
    files.insert("/virtual/a.ts".into(), InputFile::with_content("let a: number = 1;"));
    let input = ProjectAnalysisInput {
        base_dir: "/virtual".into(),
        files: Some(files),
        configuration: Some(AnalysisConfig {
            no_fs: true,
            ..Default::default()
        }),
        rules: None,
    };

    let (results, outcome) = run(&input);
    assert_eq!(results.len(), 1);
    let ProjectOutcome::Completed(meta) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(meta.warnings.len(), 1);
    assert!(meta.tsconfigs.is_empty());
}
