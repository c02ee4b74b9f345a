//! Analyzable-unit construction
//!
//! Parses every accepted snippet of a host document in document order and
//! patches its tree into host coordinates. The first snippet that fails to
//! parse aborts the document: its error is patched and returned, later
//! snippets are never parsed.

use std::sync::Arc;

use tracing::debug;

use super::{accept_snippets, EmbeddedSnippet, HostDocument, SnippetExtractor};
use crate::config::AnalysisConfig;
use crate::lang::Lang;
use crate::paths::NormalizedPath;
use crate::syntax::{parse_script, patch_error, patch_tree, SyntaxTree};
use crate::{Result, ScanError};

/// A patched tree ready for the rule engine, plus the path results are reported on
#[derive(Debug, Clone)]
pub struct AnalyzableUnit {
    pub tree: SyntaxTree,
    pub path: NormalizedPath,
    /// `path` was derived from a resource name and is not a real file
    pub synthetic: bool,
}

impl AnalyzableUnit {
    /// Unit for a plain script file; nothing to patch.
    pub fn from_script(path: NormalizedPath, text: &str, lang: Lang) -> Result<Self> {
        Ok(Self {
            tree: parse_script(text, lang)?,
            path,
            synthetic: false,
        })
    }
}

/// Build the units of one host document.
pub fn build_units(
    host: &HostDocument,
    extractor: &dyn SnippetExtractor,
    config: &AnalysisConfig,
) -> Result<Vec<AnalyzableUnit>> {
    build_with(host, extractor, config, |snippet| {
        parse_script(&snippet.code, Lang::JavaScript)
    })
}

fn build_with(
    host: &HostDocument,
    extractor: &dyn SnippetExtractor,
    config: &AnalysisConfig,
    mut parse: impl FnMut(&EmbeddedSnippet) -> Result<SyntaxTree>,
) -> Result<Vec<AnalyzableUnit>> {
    let snippets = accept_snippets(extractor.extract(&host.text)?, &host.path, config);
    debug!(
        "[EMBEDDED] {} {} snippet(s) in {}",
        snippets.len(),
        extractor.name(),
        host.path
    );

    let host_text: Arc<str> = Arc::from(host.text.as_str());
    let mut units = Vec::with_capacity(snippets.len());

    for snippet in snippets {
        let tree = match parse(&snippet) {
            Ok(tree) => tree,
            Err(ScanError::Parsing(err)) => {
                return Err(patch_error(err, &snippet.anchor).into());
            }
            Err(other) => return Err(other),
        };
        let tree = patch_tree(
            tree,
            &snippet.anchor,
            Arc::clone(&host_text),
            Arc::clone(&snippet.line_index),
        );

        let (path, synthetic) = match &snippet.resource_name {
            Some(name) => (host.path.synthetic(name), true),
            None => (host.path.clone(), false),
        };
        units.push(AnalyzableUnit {
            tree,
            path,
            synthetic,
        });
    }

    Ok(units)
}
