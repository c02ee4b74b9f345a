//! Tests for the `discover` CLI command

use crate::common::{assert_contains, assert_valid_json, TestRepo};

#[test]
fn test_discover_text() {
    let repo = TestRepo::new();
    repo.with_mixed_layout();

    let output = repo.run_cli_success(&["discover"]);
    assert_contains(&output, "Source files (4):");
    assert_contains(&output, "infra/template.yaml");
    assert_contains(&output, "package.json (1):");
    assert_contains(&output, "tsconfig (origin: Fallback):");
}

#[test]
fn test_discover_json() {
    let repo = TestRepo::new();
    repo.add_file("tsconfig.json", "{}")
        .add_file("src/a.ts", "let a = 1;")
        .add_file("src/page.html", "<script>a();</script>");

    let output = repo.run_cli_success(&["discover", "-f", "json"]);
    let json = assert_valid_json(&output, "discover json");

    assert_eq!(json["report"]["mode"], "walk");
    assert_eq!(json["tsconfigOrigin"], "lookup");
    let categories: Vec<&str> = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["category"].as_str().unwrap())
        .collect();
    assert!(categories.contains(&"typescript"));
    assert!(categories.contains(&"html"));
}
