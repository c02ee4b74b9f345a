//! Scripts embedded in host documents
//!
//! A [`SnippetExtractor`] turns a host document (markup, config) into an
//! ordered list of [`EmbeddedSnippet`]s. The [`builder`] parses each accepted
//! snippet and patches the resulting tree into host coordinates.

pub mod builder;
pub mod html;
pub mod yaml;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::fs_utils::check_content;
use crate::line_index::LineIndex;
use crate::paths::NormalizedPath;
use crate::syntax::SnippetAnchor;
use crate::Result;

pub use builder::{build_units, AnalyzableUnit};
pub use html::HtmlExtractor;
pub use yaml::YamlExtractor;

/// How the snippet text was written in its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SnippetFormat {
    /// Starts in the middle of a host line (flow scalars, inline tags)
    Plain,
    /// Starts at the beginning of its own line (block scalars)
    Block,
}

/// One script region of a host document
#[derive(Debug, Clone)]
pub struct EmbeddedSnippet {
    pub code: String,
    pub anchor: SnippetAnchor,
    pub format: SnippetFormat,
    /// Distinguishes several independently reported snippets of one document
    pub resource_name: Option<String>,
    /// Line table of the host document
    pub line_index: Arc<LineIndex>,
}

impl EmbeddedSnippet {
    /// Snippet starting at byte `offset` of the host.
    pub fn at(
        code: impl Into<String>,
        offset: usize,
        format: SnippetFormat,
        line_index: &Arc<LineIndex>,
    ) -> Self {
        Self {
            code: code.into(),
            anchor: SnippetAnchor::at_offset(line_index, offset),
            format,
            resource_name: None,
            line_index: Arc::clone(line_index),
        }
    }

    pub fn with_resource(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }
}

/// A host document to extract from
#[derive(Debug, Clone)]
pub struct HostDocument {
    pub path: NormalizedPath,
    pub text: String,
}

impl HostDocument {
    pub fn new(path: NormalizedPath, text: impl Into<String>) -> Self {
        Self {
            path,
            text: text.into(),
        }
    }
}

/// Produces the script regions of one host format.
///
/// Implementations must return snippets in document order and have no side
/// effects. A host document that cannot be read at all is reported as a
/// parsing error.
pub trait SnippetExtractor {
    fn name(&self) -> &'static str;

    fn extract(&self, host_text: &str) -> Result<Vec<EmbeddedSnippet>>;
}

/// Drop snippets that are not worth analyzing. Rejection is not an error.
pub fn accept_snippets(
    snippets: Vec<EmbeddedSnippet>,
    host: &NormalizedPath,
    config: &AnalysisConfig,
) -> Vec<EmbeddedSnippet> {
    let max_bytes = config.max_file_size_bytes();
    snippets
        .into_iter()
        .filter(|snippet| {
            let verdict = check_content(&snippet.code, max_bytes);
            if !verdict.is_accepted() {
                debug!(
                    "[EMBEDDED] skipping snippet at {}:{} ({})",
                    host,
                    snippet.anchor.line,
                    verdict.reason()
                );
            }
            verdict.is_accepted()
        })
        .collect()
}
