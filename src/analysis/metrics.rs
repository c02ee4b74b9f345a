//! Size and structure metrics of an analyzed unit

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::linter::complexity::is_function;
use crate::syntax::SyntaxTree;

const DECLARATION_STATEMENTS: &[&str] = &["lexical_declaration", "variable_declaration"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Lines holding at least one token
    pub ncloc: usize,
    /// Lines holding comment text
    pub comment_lines: usize,
    pub functions: usize,
    pub statements: usize,
    pub classes: usize,
}

impl Metrics {
    pub fn compute(tree: &SyntaxTree) -> Self {
        let mut code_lines = BTreeSet::new();
        for token in &tree.tokens {
            code_lines.extend(token.loc.start.line..=token.loc.end.line);
        }

        let mut comment_lines = BTreeSet::new();
        for comment in &tree.comments {
            for (i, text) in comment.value.lines().enumerate() {
                if is_comment_text(text) {
                    comment_lines.insert(comment.loc.start.line + i);
                }
            }
        }

        let mut metrics = Self {
            ncloc: code_lines.len(),
            comment_lines: comment_lines.len(),
            ..Self::default()
        };
        for node in tree.root.descendants() {
            if is_function(node) {
                metrics.functions += 1;
            } else if matches!(node.kind, "class_declaration" | "class") && node.named {
                metrics.classes += 1;
            } else if is_statement(node.kind) {
                metrics.statements += 1;
            }
        }
        metrics
    }

    /// Accumulate the metrics of another unit reported on the same path
    pub fn merge(&mut self, other: &Metrics) {
        self.ncloc += other.ncloc;
        self.comment_lines += other.comment_lines;
        self.functions += other.functions;
        self.statements += other.statements;
        self.classes += other.classes;
    }
}

fn is_statement(kind: &str) -> bool {
    (kind.ends_with("_statement") && kind != "empty_statement")
        || DECLARATION_STATEMENTS.contains(&kind)
}

/// Comment line with something besides delimiters and decoration
fn is_comment_text(line: &str) -> bool {
    line.trim()
        .trim_start_matches("//")
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .trim_matches(|c: char| c == '*' || c.is_whitespace())
        .chars()
        .any(char::is_alphanumeric)
}
