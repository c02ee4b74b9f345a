//! Worker protocol message types
//!
//! Everything that crosses the worker boundary is plain JSON: requests are
//! `{type, data}` objects, request/response completions are
//! `{type: "success" | "failure", ...}` and streamed partial results carry a
//! `messageType`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::{AnalysisInput, FileResult, ProjectAnalysisInput, ProjectMeta};
use crate::error::SerializedError;
use crate::linter::RuleConfig;
use crate::paths::NormalizedPath;
use crate::{Result, ScanError};

/// Unit of work posted to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum WorkerRequest {
    OnInitLinter { rules: Vec<RuleConfig> },
    OnAnalyzeJsts(AnalysisInput),
    OnAnalyzeHtml(AnalysisInput),
    OnAnalyzeYaml(AnalysisInput),
    OnAnalyzeProject(ProjectAnalysisInput),
    OnCancelAnalysis,
}

impl WorkerRequest {
    /// Answered with a stream of partial results instead of one response
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::OnAnalyzeProject(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OnInitLinter { .. } => "on-init-linter",
            Self::OnAnalyzeJsts(_) => "on-analyze-jsts",
            Self::OnAnalyzeHtml(_) => "on-analyze-html",
            Self::OnAnalyzeYaml(_) => "on-analyze-yaml",
            Self::OnAnalyzeProject(_) => "on-analyze-project",
            Self::OnCancelAnalysis => "on-cancel-analysis",
        }
    }
}

/// Completion of a request/response unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerResponse {
    Success { result: Value },
    Failure { error: SerializedError },
}

impl WorkerResponse {
    pub fn success(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self::Success { result },
            Err(e) => Self::failure(&ScanError::Worker {
                message: format!("cannot serialize result: {}", e),
            }),
        }
    }

    pub fn failure(err: &ScanError) -> Self {
        Self::Failure {
            error: SerializedError::from(err),
        }
    }

    /// Typed result, or the typed error rebuilt from its serialized shape
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Success { result } => {
                serde_json::from_value(result).map_err(|e| ScanError::Worker {
                    message: format!("unexpected worker result: {}", e),
                })
            }
            Self::Failure { error } => Err(ScanError::from(error)),
        }
    }
}

/// Partial or terminal result of a streaming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all = "camelCase")]
pub enum StreamMessage {
    FileResult {
        filename: NormalizedPath,
        result: FileResult,
    },
    Meta {
        meta: ProjectMeta,
    },
    Error {
        error: SerializedError,
    },
    Cancelled,
}

impl StreamMessage {
    /// No message follows a terminal one for the same request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::FileResult { .. })
    }
}

/// Request as posted to the worker, with the id its completions are matched by
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Posted {
    pub id: u64,
    pub request: WorkerRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum WorkerMessage {
    Reply(WorkerResponse),
    Stream(StreamMessage),
}

/// Message sent back by the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Delivered {
    pub id: u64,
    pub message: WorkerMessage,
}
