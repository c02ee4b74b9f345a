//! Built-in rules
//!
//! Two of them are virtual: they always run and report a metric through the
//! message channel instead of a finding.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::complexity::{file_complexity, function_complexities};
use super::issues::{IssueLocation, SymbolHighlight};
use super::{Rule, RuleContext, RuleMeta, SECONDARY_LOCATIONS_SENTINEL};
use crate::embedded::AnalyzableUnit;
use crate::syntax::{SourceLocation, SyntaxNode};

pub const NO_DEBUGGER: &str = "no-debugger";
pub const NO_DUPE_KEYS: &str = "no-dupe-keys";
pub const EQEQEQ: &str = "eqeqeq";
pub const COGNITIVE_COMPLEXITY: &str = "cognitive-complexity";
pub const SYMBOL_HIGHLIGHTING: &str = "internal-symbol-highlighting";
pub const COGNITIVE_COMPLEXITY_METRIC: &str = "internal-cognitive-complexity";

const DEFAULT_COMPLEXITY_THRESHOLD: u32 = 15;

/// Every built-in rule, virtual ones included
pub fn all() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(NoDebugger),
        Arc::new(NoDupeKeys),
        Arc::new(Eqeqeq),
        Arc::new(CognitiveComplexity),
        Arc::new(SymbolHighlighting),
        Arc::new(CognitiveComplexityMetric),
    ]
}

pub struct NoDebugger;

static NO_DEBUGGER_META: RuleMeta = RuleMeta {
    id: NO_DEBUGGER,
    description: "Debugger statements should not be used",
    uses_secondary_locations: false,
    is_virtual: false,
};

impl Rule for NoDebugger {
    fn meta(&self) -> &'static RuleMeta {
        &NO_DEBUGGER_META
    }

    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>) {
        for node in unit.tree.root.descendants() {
            if node.kind == "debugger_statement" {
                ctx.report(&node.loc, "Remove this debugger statement.");
            }
        }
    }
}

pub struct NoDupeKeys;

static NO_DUPE_KEYS_META: RuleMeta = RuleMeta {
    id: NO_DUPE_KEYS,
    description: "Object literals should not have duplicate keys",
    uses_secondary_locations: true,
    is_virtual: false,
};

fn property_key<'a>(unit: &'a AnalyzableUnit, property: &'a SyntaxNode) -> Option<(&'a SyntaxNode, &'a str)> {
    let key = match property.kind {
        "pair" => property.child_by_field("key")?,
        "shorthand_property_identifier" => property,
        _ => return None,
    };
    let text = unit.tree.node_text(key);
    let name = match key.kind {
        "string" => text.trim_matches(|c| c == '"' || c == '\''),
        "property_identifier" | "shorthand_property_identifier" | "number" => text,
        _ => return None,
    };
    Some((key, name))
}

impl Rule for NoDupeKeys {
    fn meta(&self) -> &'static RuleMeta {
        &NO_DUPE_KEYS_META
    }

    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>) {
        for object in unit.tree.root.descendants().filter(|n| n.kind == "object") {
            let mut first_seen: HashMap<&str, &SyntaxNode> = HashMap::new();
            for property in object.named_children() {
                let Some((key, name)) = property_key(unit, property) else {
                    continue;
                };
                match first_seen.get(name) {
                    Some(original) => ctx.report_with_secondary(
                        &key.loc,
                        format!("Duplicate key '{}'.", name),
                        &[(original.loc, Some("Original key".to_string()))],
                        None,
                    ),
                    None => {
                        first_seen.insert(name, key);
                    }
                }
            }
        }
    }
}

pub struct Eqeqeq;

static EQEQEQ_META: RuleMeta = RuleMeta {
    id: EQEQEQ,
    description: "Strict equality operators should be used",
    uses_secondary_locations: false,
    is_virtual: false,
};

impl Rule for Eqeqeq {
    fn meta(&self) -> &'static RuleMeta {
        &EQEQEQ_META
    }

    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>) {
        for node in unit.tree.root.descendants() {
            if node.kind != "binary_expression" {
                continue;
            }
            let Some(op) = node.child_by_field("operator") else {
                continue;
            };
            let strict = match op.kind {
                "==" => "===",
                "!=" => "!==",
                _ => continue,
            };
            ctx.report(&op.loc, format!("Use '{}' instead of '{}'.", strict, op.kind));
        }
    }
}

pub struct CognitiveComplexity;

/// First user option as a non-negative integer threshold
fn complexity_threshold(options: &[Value]) -> u32 {
    let Some(option) = options
        .iter()
        .find(|o| o.as_str() != Some(SECONDARY_LOCATIONS_SENTINEL))
    else {
        return DEFAULT_COMPLEXITY_THRESHOLD;
    };
    match serde_json::from_value::<u32>(option.clone()) {
        Ok(threshold) => threshold,
        Err(_) => {
            warn!(
                "[LINTER] invalid {} threshold {}, using {}",
                COGNITIVE_COMPLEXITY, option, DEFAULT_COMPLEXITY_THRESHOLD
            );
            DEFAULT_COMPLEXITY_THRESHOLD
        }
    }
}

static COGNITIVE_COMPLEXITY_META: RuleMeta = RuleMeta {
    id: COGNITIVE_COMPLEXITY,
    description: "Cognitive Complexity of functions should not be too high",
    uses_secondary_locations: true,
    is_virtual: false,
};

impl Rule for CognitiveComplexity {
    fn meta(&self) -> &'static RuleMeta {
        &COGNITIVE_COMPLEXITY_META
    }

    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>) {
        let threshold = complexity_threshold(ctx.options());

        for function in function_complexities(&unit.tree.root) {
            if function.complexity <= threshold {
                continue;
            }
            let secondary: Vec<(SourceLocation, Option<String>)> = function
                .increments
                .iter()
                .map(|inc| (inc.loc, Some(inc.message())))
                .collect();
            ctx.report_with_secondary(
                &function.loc,
                format!(
                    "Refactor this function to reduce its Cognitive Complexity from {} to the {} allowed.",
                    function.complexity, threshold
                ),
                &secondary,
                Some(f64::from(function.complexity - threshold)),
            );
        }
    }
}

pub struct SymbolHighlighting;

static SYMBOL_HIGHLIGHTING_META: RuleMeta = RuleMeta {
    id: SYMBOL_HIGHLIGHTING,
    description: "Symbol declarations and their references",
    uses_secondary_locations: false,
    is_virtual: true,
};

/// Identifier nodes introduced by declarations, in document order
fn declared_identifiers(root: &SyntaxNode) -> Vec<&SyntaxNode> {
    let mut declared = Vec::new();
    for node in root.descendants() {
        match node.kind {
            "variable_declarator"
            | "function_declaration"
            | "generator_function_declaration"
            | "class_declaration" => {
                if let Some(name) = node.child_by_field("name").filter(|n| n.kind == "identifier") {
                    declared.push(name);
                }
            }
            "formal_parameters" => {
                declared.extend(node.named_children().filter(|n| n.kind == "identifier"));
            }
            _ => {}
        }
    }
    declared
}

impl Rule for SymbolHighlighting {
    fn meta(&self) -> &'static RuleMeta {
        &SYMBOL_HIGHLIGHTING_META
    }

    /// Matches references by name, without scope analysis.
    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>) {
        let tree = &unit.tree;
        let declared = declared_identifiers(&tree.root);
        let declaration_ranges: HashSet<_> = declared.iter().map(|n| n.range).collect();

        let mut references: HashMap<&str, Vec<IssueLocation>> = HashMap::new();
        for node in tree.root.descendants() {
            if node.kind == "identifier" && !declaration_ranges.contains(&node.range) {
                references
                    .entry(tree.node_text(node))
                    .or_default()
                    .push(IssueLocation::from_location(&node.loc, None));
            }
        }

        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        for declaration in declared {
            let name = tree.node_text(declaration);
            if !seen.insert(name) {
                continue;
            }
            symbols.push(SymbolHighlight {
                declaration: IssueLocation::from_location(&declaration.loc, None),
                references: references.remove(name).unwrap_or_default(),
            });
        }

        if let Ok(payload) = serde_json::to_string(&symbols) {
            ctx.report(&tree.root.loc, payload);
        }
    }
}

pub struct CognitiveComplexityMetric;

static COGNITIVE_COMPLEXITY_METRIC_META: RuleMeta = RuleMeta {
    id: COGNITIVE_COMPLEXITY_METRIC,
    description: "Cognitive Complexity of the whole file",
    uses_secondary_locations: false,
    is_virtual: true,
};

impl Rule for CognitiveComplexityMetric {
    fn meta(&self) -> &'static RuleMeta {
        &COGNITIVE_COMPLEXITY_METRIC_META
    }

    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>) {
        let complexity = file_complexity(&unit.tree.root);
        ctx.report(&unit.tree.root.loc, complexity.to_string());
    }
}
