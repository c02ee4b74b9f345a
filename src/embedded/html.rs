//! `<script>` extraction from markup documents

use std::borrow::Cow;
use std::sync::Arc;

use tree_sitter::Node;

use super::{EmbeddedSnippet, SnippetExtractor, SnippetFormat};
use crate::lang::FileCategory;
use crate::line_index::LineIndex;
use crate::syntax::{get_node_text, parser_for, visit_all};
use crate::{Result, ScanError};

/// Script `type` values that denote inline JavaScript
const SCRIPT_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "text/ecmascript",
    "application/ecmascript",
    "module",
    "text/babel",
    "text/jsx",
];

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IgnoreState {
    None,
    Next,
    UntilEnable,
}

/// Extracts inline scripts from HTML (and Vue single-file components).
///
/// Scripts with a `src` attribute or a non-script `type` are skipped. A
/// `<![CDATA[ ... ]]>` wrapper around a script body is blanked out. The
/// directive comments `eslint-disable`, `eslint-enable` and
/// `eslint-disable-next-script` suppress scripts that follow them.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl SnippetExtractor for HtmlExtractor {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extract(&self, host_text: &str) -> Result<Vec<EmbeddedSnippet>> {
        let language = FileCategory::Html
            .host_language()
            .ok_or_else(|| ScanError::Grammar {
                language: "HTML".to_string(),
                message: "no host grammar".to_string(),
            })?;
        let mut parser = parser_for(&language, "HTML")?;
        let Some(tree) = parser.parse(host_text, None) else {
            return Ok(Vec::new());
        };

        let line_index = Arc::new(LineIndex::new(host_text));
        let mut snippets = Vec::new();
        let mut ignore = IgnoreState::None;

        visit_all(&tree.root_node(), |node| match node.kind() {
            "comment" => {
                let body = get_node_text(node, host_text)
                    .trim_start_matches("<!--")
                    .trim_end_matches("-->")
                    .trim();
                ignore = match body {
                    "eslint-disable" => IgnoreState::UntilEnable,
                    "eslint-enable" => IgnoreState::None,
                    "eslint-disable-next-script" => IgnoreState::Next,
                    _ => ignore,
                };
            }
            "script_element" => {
                let Some((offset, code)) = script_content(node, host_text) else {
                    return;
                };
                match ignore {
                    IgnoreState::UntilEnable => {}
                    IgnoreState::Next => ignore = IgnoreState::None,
                    IgnoreState::None => snippets.push(EmbeddedSnippet::at(
                        strip_cdata(code),
                        offset,
                        SnippetFormat::Plain,
                        &line_index,
                    )),
                }
            }
            _ => {}
        });

        Ok(snippets)
    }
}

/// Offset and text of an inline script, or `None` when it is external or not JavaScript.
fn script_content<'a>(element: &Node, source: &'a str) -> Option<(usize, &'a str)> {
    let mut cursor = element.walk();
    let children: Vec<Node> = element.children(&mut cursor).collect();
    let start_tag = children.iter().find(|c| c.kind() == "start_tag")?;

    for (name, value) in attributes(start_tag, source) {
        match name.to_ascii_lowercase().as_str() {
            "src" => return None,
            "type" if !SCRIPT_TYPES.contains(&value.trim().to_ascii_lowercase().as_str()) => {
                return None
            }
            _ => {}
        }
    }

    let offset = start_tag.end_byte();
    let end = children
        .iter()
        .find(|c| c.kind() == "end_tag" && !c.is_missing() && c.start_byte() >= offset)
        .map(|c| c.start_byte())
        .or_else(|| {
            children
                .iter()
                .find(|c| c.kind() == "raw_text")
                .map(|c| c.end_byte())
        })
        .unwrap_or(offset);

    source.get(offset..end).map(|code| (offset, code))
}

/// Replace the CDATA markers with spaces so every other byte keeps its offset.
fn strip_cdata(code: &str) -> Cow<'_, str> {
    let trimmed = code.trim_start();
    if !trimmed.starts_with(CDATA_OPEN) {
        return Cow::Borrowed(code);
    }
    let open = code.len() - trimmed.len();
    let body = open + CDATA_OPEN.len();
    let mut stripped = code.to_string();
    stripped.replace_range(open..body, &" ".repeat(CDATA_OPEN.len()));

    let close = stripped
        .rfind(CDATA_CLOSE)
        .filter(|&close| close >= body && stripped[close + CDATA_CLOSE.len()..].trim().is_empty());
    if let Some(close) = close {
        stripped.replace_range(close..close + CDATA_CLOSE.len(), &" ".repeat(CDATA_CLOSE.len()));
    }
    Cow::Owned(stripped)
}

/// `(name, unquoted value)` pairs of a start tag
fn attributes<'a>(start_tag: &Node, source: &'a str) -> Vec<(&'a str, &'a str)> {
    let mut result = Vec::new();
    let mut cursor = start_tag.walk();
    for attribute in start_tag.named_children(&mut cursor) {
        if attribute.kind() != "attribute" {
            continue;
        }
        let mut name = "";
        let mut value = "";
        let mut inner = attribute.walk();
        for part in attribute.named_children(&mut inner) {
            match part.kind() {
                "attribute_name" => name = get_node_text(&part, source),
                "attribute_value" => value = get_node_text(&part, source),
                "quoted_attribute_value" => {
                    value = get_node_text(&part, source)
                        .trim_matches(|c| c == '"' || c == '\'')
                }
                _ => {}
            }
        }
        result.push((name, value));
    }
    result
}
