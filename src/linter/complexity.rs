//! Cognitive complexity
//!
//! Structural constructs (`if`, loops, `switch`, `catch`, ternaries) cost one
//! plus their nesting level. `else`, `else if`, labelled jumps and each change
//! of operator in a sequence of logical operators cost one. Functions nested in
//! functions raise the nesting level of their body.

use crate::syntax::{SourceLocation, SyntaxNode};

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "arrow_function",
    "method_definition",
    "generator_function_declaration",
    "generator_function",
];

const STRUCTURAL_KINDS: &[&str] = &[
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_statement",
    "catch_clause",
    "ternary_expression",
];

pub fn is_function(node: &SyntaxNode) -> bool {
    node.named && FUNCTION_KINDS.contains(&node.kind)
}

fn is_logical(node: &SyntaxNode) -> bool {
    node.kind == "binary_expression"
        && node
            .child_by_field("operator")
            .is_some_and(|op| matches!(op.kind, "&&" | "||" | "??"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Increment {
    pub loc: SourceLocation,
    pub value: u32,
    /// Part of `value` due to nesting
    pub nesting: u32,
}

impl Increment {
    pub fn message(&self) -> String {
        if self.nesting > 0 {
            format!("+{} (incl. {} for nesting)", self.value, self.nesting)
        } else {
            format!("+{}", self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionComplexity {
    /// Where the function is reported: its name, or its keyword or arrow
    pub loc: SourceLocation,
    pub complexity: u32,
    pub increments: Vec<Increment>,
}

#[derive(Default)]
struct Walker {
    increments: Vec<Increment>,
}

impl Walker {
    fn total(&self) -> u32 {
        self.increments.iter().map(|i| i.value).sum()
    }

    fn add(&mut self, node: &SyntaxNode, nesting: u32, structural: bool) {
        let keyword = node.children.iter().find(|c| !c.named).unwrap_or(node);
        let nesting = if structural { nesting } else { 0 };
        self.increments.push(Increment {
            loc: keyword.loc,
            value: 1 + nesting,
            nesting,
        });
    }

    fn walk(&mut self, node: &SyntaxNode, nesting: u32, in_function: bool) {
        match node.kind {
            "if_statement" => self.walk_if(node, nesting, in_function, false),
            kind if STRUCTURAL_KINDS.contains(&kind) => {
                self.add(node, nesting, true);
                for child in &node.children {
                    self.walk(child, nesting + 1, in_function);
                }
            }
            "break_statement" | "continue_statement" => {
                if node.child_by_field("label").is_some() {
                    self.add(node, nesting, false);
                }
            }
            _ if is_logical(node) => self.walk_logical(node, nesting, in_function),
            _ if is_function(node) => {
                let inner = if in_function { nesting + 1 } else { nesting };
                for child in &node.children {
                    self.walk(child, inner, true);
                }
            }
            _ => {
                for child in &node.children {
                    self.walk(child, nesting, in_function);
                }
            }
        }
    }

    fn walk_if(&mut self, node: &SyntaxNode, nesting: u32, in_function: bool, else_if: bool) {
        if !else_if {
            self.add(node, nesting, true);
        }
        for child in &node.children {
            match child.field {
                Some("condition") => self.walk(child, nesting, in_function),
                Some("consequence") => self.walk(child, nesting + 1, in_function),
                Some("alternative") => self.walk_else(child, nesting, in_function),
                _ => {}
            }
        }
    }

    fn walk_else(&mut self, clause: &SyntaxNode, nesting: u32, in_function: bool) {
        self.add(clause, nesting, false);
        for child in clause.named_children() {
            if child.kind == "if_statement" {
                self.walk_if(child, nesting, in_function, true);
            } else {
                self.walk(child, nesting + 1, in_function);
            }
        }
    }

    fn walk_logical(&mut self, node: &SyntaxNode, nesting: u32, in_function: bool) {
        let mut operators = Vec::new();
        let mut operands = Vec::new();
        flatten_logical(node, &mut operators, &mut operands);

        let mut previous = None;
        for op in operators {
            if previous != Some(op.kind) {
                self.increments.push(Increment {
                    loc: op.loc,
                    value: 1,
                    nesting: 0,
                });
            }
            previous = Some(op.kind);
        }
        for operand in operands {
            self.walk(operand, nesting, in_function);
        }
    }
}

fn flatten_logical<'a>(
    node: &'a SyntaxNode,
    operators: &mut Vec<&'a SyntaxNode>,
    operands: &mut Vec<&'a SyntaxNode>,
) {
    if !is_logical(node) {
        operands.push(node);
        return;
    }
    for child in &node.children {
        if child.field == Some("operator") {
            operators.push(child);
        } else {
            flatten_logical(child, operators, operands);
        }
    }
}

fn report_location(function: &SyntaxNode) -> SourceLocation {
    if let Some(name) = function.child_by_field("name") {
        return name.loc;
    }
    function
        .children
        .iter()
        .find(|c| c.kind == "=>" || c.kind == "function")
        .map(|c| c.loc)
        .unwrap_or(function.loc)
}

/// Complexity of a whole program
pub fn file_complexity(root: &SyntaxNode) -> u32 {
    let mut walker = Walker::default();
    walker.walk(root, 0, false);
    walker.total()
}

/// Complexity of every outermost function; nested functions count toward their parent.
pub fn function_complexities(root: &SyntaxNode) -> Vec<FunctionComplexity> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_function(node) {
            let mut walker = Walker::default();
            for child in &node.children {
                walker.walk(child, 0, true);
            }
            found.push(FunctionComplexity {
                loc: report_location(node),
                complexity: walker.total(),
                increments: walker.increments,
            });
            continue;
        }
        stack.extend(node.children.iter().rev());
    }
    found
}
