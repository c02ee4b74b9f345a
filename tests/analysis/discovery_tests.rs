//! Tests for single-walk discovery over a real filesystem

use embedscan::stores::{DiscoveryMode, InputFile, InputFiles, TsConfigOrigin};
use embedscan::{AnalysisConfig, FileCategory, FileKind, NormalizedPath, ProjectStores};

use crate::common::TestRepo;

// ============================================================================
// WALK TESTS
// ============================================================================

#[test]
fn test_walk_skips_dependency_directories() {
    let repo = TestRepo::new();
    repo.with_mixed_layout();

    let mut stores = ProjectStores::new();
    let report = stores
        .discover(&repo.base_dir(), &AnalysisConfig::default(), None)
        .unwrap();
    assert_eq!(report.mode, DiscoveryMode::Walk);

    let paths: Vec<String> = stores
        .source_files
        .files()
        .map(|unit| unit.path.relative_to(&repo.base_dir()).unwrap_or("").to_string())
        .collect();
    assert!(paths.contains(&"src/app.js".to_string()));
    assert!(paths.contains(&"public/index.html".to_string()));
    assert!(paths.contains(&"infra/template.yaml".to_string()));
    assert!(
        paths.iter().all(|p| !p.starts_with("node_modules")),
        "node_modules must not be walked: {:?}",
        paths
    );
    assert_eq!(stores.package_jsons.len(), 1);
}

#[test]
fn test_second_discovery_is_cache_hit() {
    let repo = TestRepo::new();
    repo.add_file("a.js", "a();");

    let mut stores = ProjectStores::new();
    let config = AnalysisConfig::default();
    let first = stores.discover(&repo.base_dir(), &config, None).unwrap();
    let second = stores.discover(&repo.base_dir(), &config, None).unwrap();

    assert_eq!(first.mode, DiscoveryMode::Walk);
    assert_eq!(first.refreshed.len(), 3);
    assert_eq!(second.mode, DiscoveryMode::CacheHit);
    assert!(second.refreshed.is_empty());
}

#[test]
fn test_new_base_dir_triggers_walk() {
    let first_repo = TestRepo::new();
    first_repo.add_file("a.js", "a();");
    let second_repo = TestRepo::new();
    second_repo.add_file("b.js", "b();");

    let mut stores = ProjectStores::new();
    let config = AnalysisConfig::default();
    stores.discover(&first_repo.base_dir(), &config, None).unwrap();
    let report = stores.discover(&second_repo.base_dir(), &config, None).unwrap();

    assert_eq!(report.mode, DiscoveryMode::Walk);
    let files: Vec<_> = stores.source_files.files().collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, second_repo.file("b.js"));
}

#[test]
fn test_changed_input_files_are_rediscovered() {
    let config = AnalysisConfig {
        no_fs: true,
        ..Default::default()
    };
    let base = NormalizedPath::from("/p");
    let mut first = InputFiles::new();
    first.insert("/p/a.js".into(), InputFile::with_content("var a = 1;"));
    let mut second = InputFiles::new();
    second.insert("/p/a.js".into(), InputFile::with_content("var a = 2;"));
    second.insert("/p/b.js".into(), InputFile::with_content("var b = 1;"));

    let mut stores = ProjectStores::new();
    stores.discover(&base, &config, Some(&first)).unwrap();
    let report = stores.discover(&base, &config, Some(&second)).unwrap();
    assert_eq!(report.mode, DiscoveryMode::Simulated);

    let files: Vec<(String, String)> = stores
        .files_to_analyze()
        .iter()
        .map(|unit| (unit.path.to_string(), unit.content.clone()))
        .collect();
    assert_eq!(
        files,
        vec![
            ("/p/a.js".to_string(), "var a = 2;".to_string()),
            ("/p/b.js".to_string(), "var b = 1;".to_string()),
        ]
    );

    let again = stores.discover(&base, &config, Some(&second)).unwrap();
    assert_eq!(again.mode, DiscoveryMode::CacheHit);
}

#[test]
fn test_changed_exclusions_rebuild_source_files() {
    let repo = TestRepo::new();
    repo.add_file("src/a.js", "a();")
        .add_file("src/generated/b.js", "b();");

    let mut stores = ProjectStores::new();
    stores
        .discover(&repo.base_dir(), &AnalysisConfig::default(), None)
        .unwrap();
    assert_eq!(stores.source_files.len(), 2);

    let config = AnalysisConfig {
        exclusions: vec!["**/generated/**".to_string()],
        ..Default::default()
    };
    let report = stores.discover(&repo.base_dir(), &config, None).unwrap();

    assert_eq!(report.mode, DiscoveryMode::Walk);
    assert!(report.refreshed.contains(&"source-files"));
    assert_eq!(stores.source_files.len(), 1);
}

// ============================================================================
// CLASSIFICATION TESTS
// ============================================================================

#[test]
fn test_files_are_categorized_and_split_by_kind() {
    let repo = TestRepo::new();
    repo.add_file("src/app.ts", "let a = 1;")
        .add_file("test/app.test.ts", "let b = 2;")
        .add_file("page.htm", "<p>hi</p>")
        .add_file("notes.txt", "not a source file");

    let config = AnalysisConfig {
        tests: vec!["test".to_string()],
        ..Default::default()
    };
    let mut stores = ProjectStores::new();
    stores.discover(&repo.base_dir(), &config, None).unwrap();

    let main = stores.source_files.get(&repo.file("src/app.ts")).unwrap();
    assert_eq!(main.kind, FileKind::Main);
    assert_eq!(main.category, FileCategory::TypeScript);

    let test = stores.source_files.get(&repo.file("test/app.test.ts")).unwrap();
    assert_eq!(test.kind, FileKind::Test);

    let page = stores.source_files.get(&repo.file("page.htm")).unwrap();
    assert_eq!(page.category, FileCategory::Html);

    assert!(stores.source_files.get(&repo.file("notes.txt")).is_none());
}

#[test]
fn test_user_exclusions_apply() {
    let repo = TestRepo::new();
    repo.add_file("src/a.js", "a();")
        .add_file("src/generated/b.js", "b();");

    let config = AnalysisConfig {
        exclusions: vec!["**/generated/**".to_string()],
        ..Default::default()
    };
    let mut stores = ProjectStores::new();
    stores.discover(&repo.base_dir(), &config, None).unwrap();

    assert!(stores.source_files.get(&repo.file("src/a.js")).is_some());
    assert!(stores.source_files.get(&repo.file("src/generated/b.js")).is_none());
}

// ============================================================================
// TSCONFIG TESTS
// ============================================================================

#[test]
fn test_tsconfig_lookup_wins_over_fallback() {
    let repo = TestRepo::new();
    repo.add_file("tsconfig.json", "{ // comment\n \"include\": [\"src\"], }")
        .add_file("src/a.ts", "let a = 1;");

    let mut stores = ProjectStores::new();
    stores
        .discover(&repo.base_dir(), &AnalysisConfig::default(), None)
        .unwrap();

    assert_eq!(stores.tsconfigs.origin(), Some(TsConfigOrigin::Lookup));
    assert_eq!(stores.tsconfigs.tsconfig_paths(), vec![repo.file("tsconfig.json")]);
}

#[test]
fn test_fallback_tsconfig_without_lookup() {
    let repo = TestRepo::new();
    repo.add_file("src/a.ts", "let a = 1;");

    let mut stores = ProjectStores::new();
    stores
        .discover(&repo.base_dir(), &AnalysisConfig::default(), None)
        .unwrap();

    assert_eq!(stores.tsconfigs.origin(), Some(TsConfigOrigin::Fallback));
    assert!(stores.tsconfigs.tsconfig_paths().is_empty());
    assert_eq!(stores.tsconfigs.tsconfigs().len(), 1);
}

#[test]
fn test_property_paths_take_precedence() {
    let repo = TestRepo::new();
    repo.add_file("tsconfig.json", "{}")
        .add_file("config/tsconfig.app.json", "{ \"include\": [\"../src\"] }")
        .add_file("src/a.ts", "let a = 1;");

    let config = AnalysisConfig {
        tsconfig_paths: vec!["config/tsconfig.app.json".to_string()],
        ..Default::default()
    };
    let mut stores = ProjectStores::new();
    stores.discover(&repo.base_dir(), &config, None).unwrap();

    assert_eq!(stores.tsconfigs.origin(), Some(TsConfigOrigin::Property));
    assert_eq!(
        stores.tsconfigs.tsconfig_paths(),
        vec![repo.file("config/tsconfig.app.json")]
    );
}

#[test]
fn test_changed_tsconfig_paths_rerun_only_tsconfig_store() {
    let repo = TestRepo::new();
    repo.add_file("tsconfig.json", "{}")
        .add_file("config/tsconfig.app.json", "{ \"include\": [\"../src\"] }")
        .add_file("src/a.ts", "let a = 1;");

    let mut stores = ProjectStores::new();
    stores
        .discover(&repo.base_dir(), &AnalysisConfig::default(), None)
        .unwrap();
    assert_eq!(stores.tsconfigs.origin(), Some(TsConfigOrigin::Lookup));

    let config = AnalysisConfig {
        tsconfig_paths: vec!["config/tsconfig.app.json".to_string()],
        ..Default::default()
    };
    let report = stores.discover(&repo.base_dir(), &config, None).unwrap();

    assert_eq!(report.mode, DiscoveryMode::Walk);
    assert_eq!(report.refreshed, vec!["tsconfig"]);
    assert_eq!(stores.tsconfigs.origin(), Some(TsConfigOrigin::Property));
    assert_eq!(stores.source_files.len(), 1);
}
