//! Issue channel codec
//!
//! Rule messages cross the engine as one location plus one string. Rules that
//! need secondary locations squeeze them into a JSON envelope; the two virtual
//! rules squeeze a metric into it. Decoding turns each raw message into a
//! [`DecodedMessage`], pulls the virtual-rule payloads out, and converts
//! columns from the engine convention (1-based) to the public one (0-based)
//! exactly once.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rules::{COGNITIVE_COMPLEXITY_METRIC, SYMBOL_HIGHLIGHTING};
use super::{LintMessage, RuleRegistry};
use crate::syntax::SourceLocation;
use crate::{Result, ScanError};

/// A location in public convention: 1-based lines, 0-based columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLocation {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IssueLocation {
    pub fn from_location(loc: &SourceLocation, message: Option<String>) -> Self {
        Self {
            line: loc.start.line,
            column: loc.start.column,
            end_line: loc.end.line,
            end_column: loc.end.column,
            message,
        }
    }
}

/// A finding as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub rule_id: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub message: String,
    #[serde(default)]
    pub secondary_locations: Vec<IssueLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// One entry of the symbol cross-reference table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHighlight {
    pub declaration: IssueLocation,
    pub references: Vec<IssueLocation>,
}

/// Decoded output of one lint run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    pub issues: Vec<Issue>,
    pub highlighted_symbols: Vec<SymbolHighlight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_complexity: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    message: String,
    #[serde(default)]
    secondary_locations: Vec<IssueLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cost: Option<f64>,
}

/// Internal form of a raw message once its rule metadata is known
#[derive(Debug)]
enum DecodedMessage {
    Plain(LintMessage),
    WithSecondary {
        raw: LintMessage,
        message: String,
        secondary: Vec<IssueLocation>,
        cost: Option<f64>,
    },
    Symbols(Vec<SymbolHighlight>),
    Complexity(u32),
}

/// Encode a message and its secondary locations (tree convention) into an envelope.
///
/// Secondary columns are written 1-based, like the primary location of the
/// message that will carry the envelope.
pub fn encode_envelope(
    message: &str,
    secondary: &[(SourceLocation, Option<String>)],
    cost: Option<f64>,
) -> String {
    let envelope = Envelope {
        message: message.to_string(),
        secondary_locations: secondary
            .iter()
            .map(|(loc, message)| IssueLocation {
                line: loc.start.line,
                column: loc.start.column + 1,
                end_line: loc.end.line,
                end_column: loc.end.column + 1,
                message: message.clone(),
            })
            .collect(),
        cost,
    };
    serde_json::to_string(&envelope).unwrap_or_else(|_| message.to_string())
}

fn decode_one(raw: LintMessage, registry: &RuleRegistry) -> Result<DecodedMessage> {
    let malformed = |raw: &LintMessage, e: serde_json::Error| ScanError::ChannelDecode {
        rule_id: raw.rule_id.clone(),
        message: e.to_string(),
    };

    match raw.rule_id.as_str() {
        SYMBOL_HIGHLIGHTING => {
            let symbols = serde_json::from_str(&raw.message).map_err(|e| malformed(&raw, e))?;
            return Ok(DecodedMessage::Symbols(symbols));
        }
        COGNITIVE_COMPLEXITY_METRIC => {
            let value = serde_json::from_str(&raw.message).map_err(|e| malformed(&raw, e))?;
            return Ok(DecodedMessage::Complexity(value));
        }
        _ => {}
    }

    let uses_envelope = registry
        .meta(&raw.rule_id)
        .is_some_and(|meta| meta.uses_secondary_locations);
    if !uses_envelope {
        return Ok(DecodedMessage::Plain(raw));
    }
    if !raw.message.trim_start().starts_with('{') {
        debug!(
            "[LINTER] {} reported without an envelope, keeping message as is",
            raw.rule_id
        );
        return Ok(DecodedMessage::Plain(raw));
    }

    let envelope: Envelope = serde_json::from_str(&raw.message).map_err(|e| malformed(&raw, e))?;
    Ok(DecodedMessage::WithSecondary {
        raw,
        message: envelope.message,
        secondary: envelope.secondary_locations,
        cost: envelope.cost,
    })
}

fn normalize(location: IssueLocation) -> IssueLocation {
    IssueLocation {
        column: location.column.saturating_sub(1),
        end_column: location.end_column.saturating_sub(1),
        ..location
    }
}

fn to_issue(raw: LintMessage, message: String, secondary: Vec<IssueLocation>, cost: Option<f64>) -> Issue {
    Issue {
        rule_id: raw.rule_id,
        line: raw.line,
        column: raw.column.saturating_sub(1),
        end_line: raw.end_line,
        end_column: raw.end_column.saturating_sub(1),
        message,
        secondary_locations: secondary.into_iter().map(normalize).collect(),
        cost,
    }
}

/// Decode raw engine messages into findings and virtual-rule metrics.
pub fn decode_messages(messages: Vec<LintMessage>, registry: &RuleRegistry) -> Result<LintResult> {
    let mut result = LintResult::default();
    for raw in messages {
        match decode_one(raw, registry)? {
            DecodedMessage::Plain(raw) => {
                let message = raw.message.clone();
                result.issues.push(to_issue(raw, message, Vec::new(), None));
            }
            DecodedMessage::WithSecondary {
                raw,
                message,
                secondary,
                cost,
            } => result.issues.push(to_issue(raw, message, secondary, cost)),
            DecodedMessage::Symbols(symbols) => result.highlighted_symbols = symbols,
            DecodedMessage::Complexity(value) => result.cognitive_complexity = Some(value),
        }
    }
    Ok(result)
}
