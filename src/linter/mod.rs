//! Rule engine
//!
//! Rules are looked up by id in a closed [`RuleRegistry`]. A [`Linter`] holds
//! the rules enabled for a project, runs them over an analyzable unit and
//! hands the raw messages to the issue codec, which turns them into findings
//! and extracts the virtual-rule metrics.

pub mod complexity;
pub mod issues;
pub mod rules;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::embedded::AnalyzableUnit;
use crate::stores::FileKind;
use crate::syntax::SourceLocation;
use crate::Result;

pub use issues::{decode_messages, Issue, IssueLocation, LintResult, SymbolHighlight};

/// Option value passed to rules that report through the secondary-location envelope
pub const SECONDARY_LOCATIONS_SENTINEL: &str = "secondary-locations";

/// Static description of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMeta {
    pub id: &'static str,
    pub description: &'static str,
    /// Messages of this rule are envelopes carrying secondary locations
    pub uses_secondary_locations: bool,
    /// Always enabled; the single message carries a metric, not a finding
    pub is_virtual: bool,
}

/// A check over one analyzable unit
pub trait Rule: Send + Sync {
    fn meta(&self) -> &'static RuleMeta;

    fn check(&self, unit: &AnalyzableUnit, ctx: &mut RuleContext<'_>);
}

/// Raw engine message: one location, one string, 1-based columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    pub rule_id: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub message: String,
}

/// Reporting handle given to a rule for one run
pub struct RuleContext<'a> {
    meta: &'static RuleMeta,
    options: &'a [Value],
    messages: &'a mut Vec<LintMessage>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        meta: &'static RuleMeta,
        options: &'a [Value],
        messages: &'a mut Vec<LintMessage>,
    ) -> Self {
        Self {
            meta,
            options,
            messages,
        }
    }

    pub fn options(&self) -> &[Value] {
        self.options
    }

    /// Whether the linter asked for envelope-encoded messages
    pub fn wants_secondary_locations(&self) -> bool {
        self.options
            .iter()
            .any(|o| o.as_str() == Some(SECONDARY_LOCATIONS_SENTINEL))
    }

    pub fn report(&mut self, loc: &SourceLocation, message: impl Into<String>) {
        self.messages.push(LintMessage {
            rule_id: self.meta.id.to_string(),
            line: loc.start.line,
            column: loc.start.column + 1,
            end_line: loc.end.line,
            end_column: loc.end.column + 1,
            message: message.into(),
        });
    }

    /// Report with secondary locations. Without the sentinel option they are dropped.
    pub fn report_with_secondary(
        &mut self,
        loc: &SourceLocation,
        message: impl Into<String>,
        secondary: &[(SourceLocation, Option<String>)],
        cost: Option<f64>,
    ) {
        let message = message.into();
        if self.wants_secondary_locations() {
            let envelope = issues::encode_envelope(&message, secondary, cost);
            self.report(loc, envelope);
        } else {
            self.report(loc, message);
        }
    }
}

/// Rule configuration sent with linter initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub key: String,
    #[serde(default)]
    pub configurations: Vec<Value>,
    #[serde(default = "default_targets")]
    pub file_type_target: Vec<FileKind>,
}

fn default_targets() -> Vec<FileKind> {
    vec![FileKind::Main]
}

impl RuleConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            configurations: Vec::new(),
            file_type_target: default_targets(),
        }
    }
}

/// Every rule the engine knows, keyed by id
pub struct RuleRegistry {
    rules: BTreeMap<&'static str, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// The built-in rule set
    pub fn builtin() -> Self {
        let mut registry = Self {
            rules: BTreeMap::new(),
        };
        for rule in rules::all() {
            registry.register(rule);
        }
        registry
    }

    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        self.rules.insert(rule.meta().id, rule);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(id)
    }

    pub fn meta(&self, id: &str) -> Option<&'static RuleMeta> {
        self.rules.get(id).map(|rule| rule.meta())
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    fn virtual_rules(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.values().filter(|rule| rule.meta().is_virtual)
    }
}

struct EnabledRule {
    rule: Arc<dyn Rule>,
    options: Vec<Value>,
    targets: Vec<FileKind>,
}

/// The rules enabled for one project
pub struct Linter {
    registry: Arc<RuleRegistry>,
    enabled: Vec<EnabledRule>,
}

impl Linter {
    /// Enable the configured rules plus every virtual rule. Unknown keys are skipped.
    pub fn new(registry: Arc<RuleRegistry>, configs: &[RuleConfig]) -> Self {
        let mut enabled = Vec::new();
        for config in configs {
            let Some(rule) = registry.get(&config.key) else {
                warn!("[LINTER] unknown rule '{}' ignored", config.key);
                continue;
            };
            if rule.meta().is_virtual {
                continue;
            }
            let mut options = config.configurations.clone();
            if rule.meta().uses_secondary_locations {
                options.push(Value::String(SECONDARY_LOCATIONS_SENTINEL.to_string()));
            }
            enabled.push(EnabledRule {
                rule: Arc::clone(rule),
                options,
                targets: config.file_type_target.clone(),
            });
        }
        for rule in registry.virtual_rules() {
            enabled.push(EnabledRule {
                rule: Arc::clone(rule),
                options: Vec::new(),
                targets: vec![FileKind::Main, FileKind::Test],
            });
        }
        debug!("[LINTER] created with {} rule(s)", enabled.len());

        Self { registry, enabled }
    }

    pub fn enabled_rule_ids(&self) -> Vec<&'static str> {
        self.enabled.iter().map(|e| e.rule.meta().id).collect()
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run the rules targeting `kind` and decode their messages.
    pub fn lint(&self, unit: &AnalyzableUnit, kind: FileKind) -> Result<LintResult> {
        let mut messages = Vec::new();
        for enabled in self.enabled.iter().filter(|e| e.targets.contains(&kind)) {
            let mut ctx = RuleContext::new(enabled.rule.meta(), &enabled.options, &mut messages);
            enabled.rule.check(unit, &mut ctx);
        }
        decode_messages(messages, &self.registry)
    }
}
