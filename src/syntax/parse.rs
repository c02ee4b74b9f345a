//! Script parsing: tree-sitter parse, conversion to an owned tree, error reporting

use std::sync::Arc;

use tree_sitter::{Language, Node, Parser};

use super::{get_node_text, Comment, Range, SourceLocation, SyntaxNode, SyntaxTree, Token};
use crate::error::{ParsingError, Result, ScanError};
use crate::lang::Lang;
use crate::line_index::LineIndex;

/// A parser loaded with `language`, `name` labelling it in errors.
pub fn parser_for(language: &Language, name: &str) -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| ScanError::Grammar {
            language: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(parser)
}

/// Parse a script into an owned syntax tree.
///
/// A tree containing any error or missing node is rejected with a
/// [`ScanError::Parsing`] carrying the position of the first such node.
pub fn parse_script(text: &str, lang: Lang) -> Result<SyntaxTree> {
    let mut parser = parser_for(&lang.tree_sitter_language(), lang.name())?;

    let tree = parser
        .parse(text, None)
        .ok_or_else(|| ParsingError::new("Parser returned no tree", None))?;
    let root = tree.root_node();

    if root.has_error() {
        return Err(first_error(&root, text).into());
    }

    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let root = convert(&root, text, &mut tokens, &mut comments);

    Ok(SyntaxTree {
        lang,
        root,
        tokens,
        comments,
        text: Arc::from(text),
        line_index: Arc::new(LineIndex::new(text)),
    })
}

fn is_comment(node: &Node) -> bool {
    matches!(node.kind(), "comment" | "html_comment")
}

fn record_leaf(node: &Node, text: &str, tokens: &mut Vec<Token>, comments: &mut Vec<Comment>) {
    if node.child_count() > 0 || node.start_byte() == node.end_byte() {
        return;
    }
    if is_comment(node) {
        comments.push(Comment {
            value: get_node_text(node, text).to_string(),
            loc: SourceLocation::of(node),
            range: Range::of(node),
        });
    } else {
        tokens.push(Token {
            kind: node.kind(),
            value: get_node_text(node, text).to_string(),
            loc: SourceLocation::of(node),
            range: Range::of(node),
        });
    }
}

/// Move the finished node on top of the stack into its parent.
fn close(stack: &mut Vec<SyntaxNode>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(done) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(done);
        }
    }
}

/// Iterative conversion; deeply nested expressions must not exhaust the stack.
fn convert(
    root: &Node,
    text: &str,
    tokens: &mut Vec<Token>,
    comments: &mut Vec<Comment>,
) -> SyntaxNode {
    let mut cursor = root.walk();
    let mut stack = vec![SyntaxNode::from_ts(root, None)];
    record_leaf(root, text, tokens, comments);

    loop {
        if cursor.goto_first_child() {
            let node = cursor.node();
            stack.push(SyntaxNode::from_ts(&node, cursor.field_name()));
            record_leaf(&node, text, tokens, comments);
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                close(&mut stack);
                let node = cursor.node();
                stack.push(SyntaxNode::from_ts(&node, cursor.field_name()));
                record_leaf(&node, text, tokens, comments);
                break;
            }
            if !cursor.goto_parent() {
                return stack.swap_remove(0);
            }
            close(&mut stack);
        }
    }
}

/// Locate the first error or missing node in document order and describe it.
fn first_error(root: &Node, text: &str) -> ParsingError {
    let mut found: Option<Node> = None;
    let mut cursor = root.walk();
    'walk: loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            found = Some(node);
            break;
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    let node = found.unwrap_or(*root);
    let start = node.start_position();
    let line = start.row + 1;
    let description = if node.is_missing() {
        format!("Missing {}", node.kind())
    } else {
        let snippet = get_node_text(&node, text)
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(20)
            .collect::<String>();
        if snippet.trim().is_empty() {
            "Unexpected token".to_string()
        } else {
            format!("Unexpected token '{}'", snippet.trim())
        }
    };

    ParsingError::new(
        format!("{}. ({}:{})", description, line, start.column),
        Some(line),
    )
}
