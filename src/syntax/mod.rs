//! Owned syntax trees
//!
//! tree-sitter trees borrow their source and cannot be relocated, so every
//! parsed script is converted into an owned [`SyntaxTree`]. Its positions can
//! then be rewritten in place by the [`patch`] module and the tree can outlive
//! the parser.
//!
//! Conventions: lines are 1-based, columns are 0-based byte columns, ranges are
//! byte offsets into [`SyntaxTree::text`].

pub mod parse;
pub mod patch;

use std::sync::Arc;

use serde::Serialize;
use tree_sitter::Node;

use crate::lang::Lang;
use crate::line_index::LineIndex;

pub use parse::{parse_script, parser_for};
pub use patch::{patch_error, patch_tree, SnippetAnchor};

/// A point in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<tree_sitter::Point> for Position {
    fn from(point: tree_sitter::Point) -> Self {
        Self {
            line: point.row + 1,
            column: point.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn of(node: &Node) -> Self {
        Self {
            start: node.start_position().into(),
            end: node.end_position().into(),
        }
    }
}

/// Byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn of(node: &Node) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxNode {
    pub kind: &'static str,
    pub named: bool,
    /// Field name under which the parent holds this node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub loc: SourceLocation,
    pub range: Range,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub(crate) fn from_ts(node: &Node, field: Option<&'static str>) -> Self {
        Self {
            kind: node.kind(),
            named: node.is_named(),
            field,
            loc: SourceLocation::of(node),
            range: Range::of(node),
            children: Vec::new(),
        }
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    pub fn named_children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| c.named)
    }

    /// Pre-order iterator over this node and everything below it
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Visit every node mutably, pre-order, without recursion.
    pub fn for_each_mut(&mut self, mut visitor: impl FnMut(&mut SyntaxNode)) {
        let mut stack: Vec<&mut SyntaxNode> = vec![self];
        while let Some(node) = stack.pop() {
            visitor(node);
            stack.extend(node.children.iter_mut().rev());
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A terminal, non-comment leaf
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: &'static str,
    pub value: String,
    pub loc: SourceLocation,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub value: String,
    pub loc: SourceLocation,
    pub range: Range,
}

/// Parsed script plus the text and line table its positions refer to
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub lang: Lang,
    pub root: SyntaxNode,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub(crate) text: Arc<str>,
    pub(crate) line_index: Arc<LineIndex>,
}

impl SyntaxTree {
    /// Full text of the document the positions refer to
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Text of a 1-based line
    pub fn line_text(&self, line: usize) -> Option<&str> {
        self.line_index.line_text(&self.text, line)
    }

    /// Source text covered by a node
    pub fn node_text(&self, node: &SyntaxNode) -> &str {
        self.text.get(node.range.start..node.range.end).unwrap_or("")
    }
}

/// Visit every tree-sitter node under `node`, pre-order.
pub fn visit_all<F>(node: &Node, mut visitor: F)
where
    F: FnMut(&Node),
{
    let mut cursor = node.walk();
    loop {
        visitor(&cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Text of a tree-sitter node, empty when the range is not valid UTF-8
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}
