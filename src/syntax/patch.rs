//! Location patching
//!
//! Snippets are parsed on their own, so every position in their tree is
//! snippet-relative. Patching shifts those positions by the snippet anchor:
//!
//! - a position on the snippet's first line gets `anchor.column - 1` added to its column
//! - every line gets `anchor.line - 1` added
//! - every byte range gets `anchor.offset` added
//!
//! Afterwards the tree refers to the host document's text and line table.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Position, Range, SourceLocation, SyntaxTree};
use crate::error::ParsingError;
use crate::line_index::LineIndex;

/// Location of a snippet's first character in its host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetAnchor {
    /// 1-based
    pub line: usize,
    /// 1-based
    pub column: usize,
    /// 0-based byte offset
    pub offset: usize,
}

impl SnippetAnchor {
    pub fn at_offset(index: &LineIndex, offset: usize) -> Self {
        let (line, column) = index.to_line_column(offset);
        Self {
            line,
            column,
            offset,
        }
    }

    pub fn position(&self, pos: Position) -> Position {
        let column = if pos.line == 1 {
            pos.column + self.column - 1
        } else {
            pos.column
        };
        Position {
            line: pos.line + self.line - 1,
            column,
        }
    }

    fn location(&self, loc: &mut SourceLocation) {
        loc.start = self.position(loc.start);
        loc.end = self.position(loc.end);
    }

    fn range(&self, range: &mut Range) {
        range.start += self.offset;
        range.end += self.offset;
    }
}

/// Translate every node, token and comment of a snippet tree into host coordinates.
pub fn patch_tree(
    mut tree: SyntaxTree,
    anchor: &SnippetAnchor,
    host_text: Arc<str>,
    host_index: Arc<LineIndex>,
) -> SyntaxTree {
    tree.root.for_each_mut(|node| {
        anchor.location(&mut node.loc);
        anchor.range(&mut node.range);
    });
    for token in &mut tree.tokens {
        anchor.location(&mut token.loc);
        anchor.range(&mut token.range);
    }
    for comment in &mut tree.comments {
        anchor.location(&mut comment.loc);
        anchor.range(&mut comment.range);
    }
    tree.text = host_text;
    tree.line_index = host_index;
    tree
}

static POSITION_IN_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+):(\d+)\)").expect("valid position regex"));

/// Apply the same delta to a snippet parse error, including any `(line:column)`
/// embedded in its message.
pub fn patch_error(error: ParsingError, anchor: &SnippetAnchor) -> ParsingError {
    let message = POSITION_IN_MESSAGE
        .replace(&error.message, |caps: &regex::Captures| {
            let line = caps[1].parse::<usize>().unwrap_or(1);
            let column = caps[2].parse::<usize>().unwrap_or(0);
            let patched = anchor.position(Position::new(line, column));
            format!("({}:{})", patched.line, patched.column)
        })
        .into_owned();

    ParsingError {
        message,
        line: error.line.map(|line| line + anchor.line - 1),
        code: error.code,
    }
}
