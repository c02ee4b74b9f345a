//! Analysis entry points
//!
//! Plain script files are parsed and linted directly. Host documents go
//! through their snippet extractor and the unit builder first; each unit is
//! reported on its own path, which is synthetic for named resources. A parse
//! failure anywhere in a document turns the whole document into a
//! parsing-error result keyed by the host path.

pub mod metrics;
pub mod project;

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::embedded::{
    build_units, AnalyzableUnit, HostDocument, HtmlExtractor, SnippetExtractor, YamlExtractor,
};
use crate::error::ParsingError;
use crate::fs_utils::read_source;
use crate::lang::{FileCategory, Lang};
use crate::linter::{Issue, LintResult, Linter, SymbolHighlight};
use crate::paths::NormalizedPath;
use crate::stores::FileKind;
use crate::{Result, ScanError};

pub use metrics::Metrics;
pub use project::{analyze_project, ProjectAnalysisInput, ProjectMeta, ProjectOutcome};

/// Findings and metrics of one reported path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub highlighted_symbols: Vec<SymbolHighlight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_complexity: Option<u32>,
    pub metrics: Metrics,
}

impl AnalysisOutput {
    fn new(lint: LintResult, metrics: Metrics) -> Self {
        Self {
            issues: lint.issues,
            highlighted_symbols: lint.highlighted_symbols,
            cognitive_complexity: lint.cognitive_complexity,
            metrics,
        }
    }

    /// Fold in the output of another unit reported on the same path
    fn merge(&mut self, other: AnalysisOutput) {
        self.issues.extend(other.issues);
        self.highlighted_symbols.extend(other.highlighted_symbols);
        self.cognitive_complexity = match (self.cognitive_complexity, other.cognitive_complexity) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.metrics.merge(&other.metrics);
    }
}

/// Result reported for one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileResult {
    Success(AnalysisOutput),
    ParsingError(ParsingError),
    Error { error: String },
}

impl FileResult {
    pub fn from_error(err: ScanError) -> Self {
        match err {
            ScanError::Parsing(parsing) => Self::ParsingError(parsing),
            other => Self::Error {
                error: other.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One file to analyze; without content it is read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    pub file_path: NormalizedPath,
    #[serde(default)]
    pub file_content: Option<String>,
    #[serde(default)]
    pub file_type: FileKind,
}

impl AnalysisInput {
    pub fn new(file_path: impl Into<NormalizedPath>) -> Self {
        Self {
            file_path: file_path.into(),
            file_content: None,
            file_type: FileKind::Main,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.file_content = Some(content.into());
        self
    }

    fn content(&self) -> Result<Cow<'_, str>> {
        match &self.file_content {
            Some(content) => Ok(Cow::Borrowed(content)),
            None => {
                debug!("[ANALYSIS] reading {}", self.file_path);
                Ok(Cow::Owned(read_source(self.file_path.as_path())?))
            }
        }
    }
}

pub type JsTsAnalysisInput = AnalysisInput;
pub type EmbeddedAnalysisInput = AnalysisInput;

/// Analyze a JavaScript or TypeScript file.
pub fn analyze_jsts(input: &JsTsAnalysisInput, linter: &Linter) -> Result<AnalysisOutput> {
    let content = input.content()?;
    jsts_output(&input.file_path, &content, input.file_type, linter)
}

/// Analyze an HTML host document.
pub fn analyze_html(
    input: &EmbeddedAnalysisInput,
    linter: &Linter,
    config: &AnalysisConfig,
) -> Result<BTreeMap<NormalizedPath, AnalysisOutput>> {
    analyze_embedded(input, &HtmlExtractor, linter, config)
}

/// Analyze a YAML host document.
pub fn analyze_yaml(
    input: &EmbeddedAnalysisInput,
    linter: &Linter,
    config: &AnalysisConfig,
) -> Result<BTreeMap<NormalizedPath, AnalysisOutput>> {
    analyze_embedded(input, &YamlExtractor, linter, config)
}

/// Analyze a host document with any extractor, one output per reported path.
pub fn analyze_embedded(
    input: &EmbeddedAnalysisInput,
    extractor: &dyn SnippetExtractor,
    linter: &Linter,
    config: &AnalysisConfig,
) -> Result<BTreeMap<NormalizedPath, AnalysisOutput>> {
    let content = input.content()?;
    embedded_outputs(&input.file_path, &content, input.file_type, extractor, linter, config)
}

fn jsts_output(
    path: &NormalizedPath,
    content: &str,
    kind: FileKind,
    linter: &Linter,
) -> Result<AnalysisOutput> {
    let lang = Lang::from_path(path.as_path())?;
    let unit = AnalyzableUnit::from_script(path.clone(), content, lang)?;
    lint_unit(&unit, kind, linter)
}

fn lint_unit(unit: &AnalyzableUnit, kind: FileKind, linter: &Linter) -> Result<AnalysisOutput> {
    let lint = linter.lint(unit, kind)?;
    Ok(AnalysisOutput::new(lint, Metrics::compute(&unit.tree)))
}

fn embedded_outputs(
    path: &NormalizedPath,
    content: &str,
    kind: FileKind,
    extractor: &dyn SnippetExtractor,
    linter: &Linter,
    config: &AnalysisConfig,
) -> Result<BTreeMap<NormalizedPath, AnalysisOutput>> {
    let host = HostDocument::new(path.clone(), content);
    let units = build_units(&host, extractor, config)?;

    let mut outputs: BTreeMap<NormalizedPath, AnalysisOutput> = BTreeMap::new();
    if units.is_empty() {
        outputs.insert(path.clone(), AnalysisOutput::default());
    }
    for unit in &units {
        let output = lint_unit(unit, kind, linter)?;
        match outputs.get_mut(&unit.path) {
            Some(existing) => existing.merge(output),
            None => {
                outputs.insert(unit.path.clone(), output);
            }
        }
    }
    Ok(outputs)
}

/// Analyze one discovered file and return a result per reported path.
///
/// Errors never escape: they become the file's result.
pub fn analyze_file(
    path: &NormalizedPath,
    content: &str,
    kind: FileKind,
    category: FileCategory,
    linter: &Linter,
    config: &AnalysisConfig,
) -> Vec<(NormalizedPath, FileResult)> {
    let outputs = match category {
        FileCategory::JavaScript | FileCategory::TypeScript => {
            jsts_output(path, content, kind, linter).map(|output| {
                let mut outputs = BTreeMap::new();
                outputs.insert(path.clone(), output);
                outputs
            })
        }
        FileCategory::Html => embedded_outputs(path, content, kind, &HtmlExtractor, linter, config),
        FileCategory::Yaml => embedded_outputs(path, content, kind, &YamlExtractor, linter, config),
    };

    match outputs {
        Ok(outputs) => outputs
            .into_iter()
            .map(|(path, output)| (path, FileResult::Success(output)))
            .collect(),
        Err(e) => {
            debug!("[ANALYSIS] {} failed: {}", path, e);
            vec![(path.clone(), FileResult::from_error(e))]
        }
    }
}
