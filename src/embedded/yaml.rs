//! Inline function code in CloudFormation / SAM templates
//!
//! Recognized resources:
//!
//! - `AWS::Lambda::Function` with `Properties.Code.ZipFile`
//! - `AWS::Serverless::Function` with `Properties.InlineCode`
//!
//! and only when `Properties.Runtime` starts with `nodejs`. Each snippet is
//! named after the resource's logical id.

use std::borrow::Cow;
use std::sync::Arc;

use tree_sitter::Node;

use super::{EmbeddedSnippet, SnippetExtractor, SnippetFormat};
use crate::error::ParsingError;
use crate::lang::FileCategory;
use crate::line_index::LineIndex;
use crate::syntax::{get_node_text, parser_for};
use crate::{Result, ScanError};

const LAMBDA_TYPE: &str = "AWS::Lambda::Function";
const SERVERLESS_TYPE: &str = "AWS::Serverless::Function";
const NODEJS_RUNTIME_PREFIX: &str = "nodejs";

#[derive(Debug, Default, Clone, Copy)]
pub struct YamlExtractor;

impl SnippetExtractor for YamlExtractor {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extract(&self, host_text: &str) -> Result<Vec<EmbeddedSnippet>> {
        let language = FileCategory::Yaml
            .host_language()
            .ok_or_else(|| ScanError::Grammar {
                language: "YAML".to_string(),
                message: "no host grammar".to_string(),
            })?;
        let mut parser = parser_for(&language, "YAML")?;
        let Some(tree) = parser.parse(host_text, None) else {
            return Ok(Vec::new());
        };
        let root = tree.root_node();
        if root.has_error() {
            return Err(malformed_document(&root).into());
        }

        let line_index = Arc::new(LineIndex::new(host_text));
        let mut snippets = Vec::new();
        let mut cursor = root.walk();
        for document in root.named_children(&mut cursor) {
            if document.kind() != "document" {
                continue;
            }
            let Some(resources) = lookup(&document, "Resources", host_text) else {
                continue;
            };
            for (key, resource) in pairs(&resources) {
                let Some(name) = scalar_text(&key, host_text) else {
                    continue;
                };
                if let Some(code) = inline_code(&resource, host_text) {
                    if let Some(snippet) = snippet_of(&code, host_text, &line_index) {
                        snippets.push(snippet.with_resource(name));
                    }
                }
            }
        }

        Ok(snippets)
    }
}

/// The node holding inline code of a Node.js function resource
fn inline_code<'t>(resource: &Node<'t>, source: &str) -> Option<Node<'t>> {
    let kind = lookup(resource, "Type", source).and_then(|t| scalar_text(&t, source))?;
    let properties = lookup(resource, "Properties", source)?;
    let runtime = lookup(&properties, "Runtime", source).and_then(|r| scalar_text(&r, source))?;
    if !runtime.starts_with(NODEJS_RUNTIME_PREFIX) {
        return None;
    }

    match kind.as_str() {
        LAMBDA_TYPE => {
            let code = lookup(&properties, "Code", source)?;
            lookup(&code, "ZipFile", source)
        }
        SERVERLESS_TYPE => lookup(&properties, "InlineCode", source),
        _ => None,
    }
}

/// Build the snippet for a scalar value node.
///
/// Block scalars start on the line after their `|` / `>` header, at column 1,
/// so the code keeps its indentation. Flow scalars start at their first
/// character (inside the quotes when quoted). Escapes of quoted scalars are
/// resolved, so columns after an escape on the same line are approximate.
fn snippet_of(value: &Node, source: &str, line_index: &Arc<LineIndex>) -> Option<EmbeddedSnippet> {
    let node = unwrap(*value);
    let (start, end) = (node.start_byte(), node.end_byte());
    match node.kind() {
        "block_scalar" => {
            let text = source.get(start..end)?;
            let header_end = text.find('\n')?;
            let offset = start + header_end + 1;
            let code = source.get(offset..end)?;
            Some(EmbeddedSnippet::at(code, offset, SnippetFormat::Block, line_index))
        }
        "plain_scalar" => Some(EmbeddedSnippet::at(
            source.get(start..end)?,
            start,
            SnippetFormat::Plain,
            line_index,
        )),
        "double_quote_scalar" if end >= start + 2 => Some(EmbeddedSnippet::at(
            unescape_double_quoted(source.get(start + 1..end - 1)?),
            start + 1,
            SnippetFormat::Plain,
            line_index,
        )),
        "single_quote_scalar" if end >= start + 2 => Some(EmbeddedSnippet::at(
            source.get(start + 1..end - 1)?.replace("''", "'"),
            start + 1,
            SnippetFormat::Plain,
            line_index,
        )),
        _ => None,
    }
}

/// Resolve the escape sequences of a double-quoted scalar body.
///
/// Unknown escapes are kept verbatim.
fn unescape_double_quoted(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push(c);
            break;
        };
        let simple = match escape {
            '0' => Some('\0'),
            'a' => Some('\u{07}'),
            'b' => Some('\u{08}'),
            't' | '\t' => Some('\t'),
            'n' => Some('\n'),
            'v' => Some('\u{0B}'),
            'f' => Some('\u{0C}'),
            'r' => Some('\r'),
            'e' => Some('\u{1B}'),
            ' ' => Some(' '),
            '"' => Some('"'),
            '/' => Some('/'),
            '\\' => Some('\\'),
            'N' => Some('\u{85}'),
            '_' => Some('\u{A0}'),
            'L' => Some('\u{2028}'),
            'P' => Some('\u{2029}'),
            _ => None,
        };
        if let Some(resolved) = simple {
            out.push(resolved);
            continue;
        }
        let width = match escape {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            '\n' => {
                // escaped line break: the break and the next line's indentation vanish
                while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
                continue;
            }
            other => {
                out.push(c);
                out.push(other);
                continue;
            }
        };
        let digits: String = (0..width).filter_map(|_| chars.next_if(char::is_ascii_hexdigit)).collect();
        match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
            Some(resolved) if digits.len() == width => out.push(resolved),
            _ => {
                out.push(c);
                out.push(escape);
                out.push_str(&digits);
            }
        }
    }
    Cow::Owned(out)
}

/// Descend through wrapper nodes (`document`, `block_node`, `flow_node`) to the content.
fn unwrap(mut node: Node) -> Node {
    while matches!(node.kind(), "document" | "block_node" | "flow_node") {
        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|c| !matches!(c.kind(), "anchor" | "tag" | "comment"));
        match inner {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Key/value pairs of a mapping node (block or flow)
fn pairs<'t>(node: &Node<'t>) -> Vec<(Node<'t>, Node<'t>)> {
    let mapping = unwrap(*node);
    if !matches!(mapping.kind(), "block_mapping" | "flow_mapping") {
        return Vec::new();
    }
    let mut cursor = mapping.walk();
    mapping
        .named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "block_mapping_pair" | "flow_pair"))
        .filter_map(|pair| {
            Some((
                pair.child_by_field_name("key")?,
                pair.child_by_field_name("value")?,
            ))
        })
        .collect()
}

fn lookup<'t>(node: &Node<'t>, key: &str, source: &str) -> Option<Node<'t>> {
    pairs(node)
        .into_iter()
        .find(|(k, _)| scalar_text(k, source).as_deref() == Some(key))
        .map(|(_, value)| value)
}

/// Text of a flow scalar with surrounding quotes removed
fn scalar_text(node: &Node, source: &str) -> Option<String> {
    let node = unwrap(*node);
    let text = get_node_text(&node, source);
    match node.kind() {
        "plain_scalar" => Some(text.trim().to_string()),
        "double_quote_scalar" => Some(text.trim_matches('"').to_string()),
        "single_quote_scalar" => Some(text.trim_matches('\'').to_string()),
        _ => None,
    }
}

fn malformed_document(root: &Node) -> ParsingError {
    let mut cursor = root.walk();
    let mut node = *root;
    loop {
        if node.is_error() || node.is_missing() {
            break;
        }
        let next = node
            .children(&mut cursor)
            .find(|c| c.has_error() || c.is_error() || c.is_missing());
        match next {
            Some(child) => node = child,
            None => break,
        }
    }
    let start = node.start_position();
    ParsingError::new(
        format!(
            "Malformed YAML document. ({}:{})",
            start.row + 1,
            start.column
        ),
        Some(start.row + 1),
    )
}
