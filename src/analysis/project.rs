//! Project analysis
//!
//! Discovers the project once, then analyzes every file to analyze in
//! discovery order, handing each result to a sink as soon as it is ready.
//! Cancellation is checked between files.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{analyze_file, FileResult};
use crate::config::AnalysisConfig;
use crate::lang::FileCategory;
use crate::linter::{Linter, RuleConfig};
use crate::paths::NormalizedPath;
use crate::stores::{InputFiles, ProjectStores};
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysisInput {
    pub base_dir: NormalizedPath,
    /// Explicit file list; required when filesystem access is disabled
    #[serde(default)]
    pub files: Option<InputFiles>,
    /// Defaults to `<baseDir>/.embedscan/config.toml`
    #[serde(default)]
    pub configuration: Option<AnalysisConfig>,
    /// Rebuild the linter with these rules before analyzing
    #[serde(default)]
    pub rules: Option<Vec<RuleConfig>>,
}

impl ProjectAnalysisInput {
    pub fn new(base_dir: impl Into<NormalizedPath>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    pub fn config(&self) -> AnalysisConfig {
        match &self.configuration {
            Some(config) => config.clone(),
            None => AnalysisConfig::load_or_default(self.base_dir.as_path()),
        }
    }
}

/// Summary sent once every file has been analyzed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub tsconfigs: Vec<NormalizedPath>,
    pub package_manifests: usize,
    pub files_analyzed: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectOutcome {
    Completed(ProjectMeta),
    Cancelled,
}

/// Analyze a whole project, streaming one result per reported path into `sink`.
pub fn analyze_project(
    input: &ProjectAnalysisInput,
    stores: &mut ProjectStores,
    linter: &Linter,
    cancel: &AtomicBool,
    mut sink: impl FnMut(NormalizedPath, FileResult),
) -> Result<ProjectOutcome> {
    let config = input.config();
    stores.discover(&input.base_dir, &config, input.files.as_ref())?;

    let mut meta = ProjectMeta {
        tsconfigs: stores.tsconfigs.tsconfig_paths(),
        package_manifests: stores.package_jsons.len(),
        ..Default::default()
    };

    let files = stores.files_to_analyze();
    let has_typescript = files
        .iter()
        .any(|unit| unit.category == FileCategory::TypeScript);
    if has_typescript && stores.tsconfigs.origin().is_none() {
        meta.warnings.push(
            "No tsconfig.json file found; TypeScript files are analyzed without project settings."
                .to_string(),
        );
    }

    for unit in files {
        if cancel.load(Ordering::Relaxed) {
            info!(
                "[ANALYSIS] cancelled after {} file(s) in {}",
                meta.files_analyzed, input.base_dir
            );
            return Ok(ProjectOutcome::Cancelled);
        }
        let results = analyze_file(
            &unit.path,
            &unit.content,
            unit.kind,
            unit.category,
            linter,
            &config,
        );
        for (path, result) in results {
            sink(path, result);
        }
        meta.files_analyzed += 1;
    }

    info!(
        "[ANALYSIS] analyzed {} file(s) in {}",
        meta.files_analyzed, input.base_dir
    );
    Ok(ProjectOutcome::Completed(meta))
}
