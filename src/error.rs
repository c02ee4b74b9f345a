//! Error types and exit codes for embedscan

use std::fmt;
use std::process::ExitCode;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error codes shared by typed errors and their serialized form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed script or host document
    Parsing,
    /// An analysis request arrived before the linter was initialized
    LinterInitialization,
    /// Anything else
    GeneralError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsing => "PARSING",
            Self::LinterInitialization => "LINTER_INITIALIZATION",
            Self::GeneralError => "GENERAL_ERROR",
        };
        f.write_str(name)
    }
}

/// A parse failure, already expressed in the coordinates of the file it is reported on.
///
/// This is also the "parsing-error result" returned for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsingError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub code: ErrorCode,
}

impl ParsingError {
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
            code: ErrorCode::Parsing,
        }
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {})", self.message, line),
            None => f.write_str(&self.message),
        }
    }
}

/// Main error type for embedscan operations
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported language for extension: {extension}")]
    UnsupportedLanguage { extension: String },

    #[error("Parse error: {0}")]
    Parsing(ParsingError),

    #[error("Failed to load {language} grammar: {message}")]
    Grammar { language: String, message: String },

    #[error("Linter does not exist. Did you call /init-linter?")]
    LinterNotInitialized,

    #[error("Malformed issue envelope from rule {rule_id}: {message}")]
    ChannelDecode { rule_id: String, message: String },

    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Worker error: {message}")]
    Worker { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Convert error to appropriate exit code:
    /// - 1: File not found / IO error
    /// - 2: Unsupported language
    /// - 3: Parse failure
    /// - 4: Internal failure (grammar, codec, worker, linter state)
    /// - 5: Configuration or discovery error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(1),
            Self::UnsupportedLanguage { .. } => ExitCode::from(2),
            Self::Parsing(_) => ExitCode::from(3),
            Self::Grammar { .. } => ExitCode::from(4),
            Self::LinterNotInitialized => ExitCode::from(4),
            Self::ChannelDecode { .. } => ExitCode::from(4),
            Self::Worker { .. } => ExitCode::from(4),
            Self::Discovery { .. } => ExitCode::from(5),
            Self::Config { .. } => ExitCode::from(5),
            Self::Io(_) => ExitCode::from(1),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parsing(_) => ErrorCode::Parsing,
            Self::LinterNotInitialized => ErrorCode::LinterInitialization,
            _ => ErrorCode::GeneralError,
        }
    }
}

impl From<ParsingError> for ScanError {
    fn from(err: ParsingError) -> Self {
        Self::Parsing(err)
    }
}

/// Plain error shape that can cross the worker boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<&ScanError> for SerializedError {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::Parsing(parsing) => Self {
                code: ErrorCode::Parsing,
                message: parsing.message.clone(),
                stack: None,
                data: parsing.line.map(|line| serde_json::json!({ "line": line })),
            },
            other => Self {
                code: other.code(),
                message: other.to_string(),
                stack: None,
                data: None,
            },
        }
    }
}

impl From<SerializedError> for ScanError {
    fn from(err: SerializedError) -> Self {
        match err.code {
            ErrorCode::Parsing => {
                let line = err
                    .data
                    .as_ref()
                    .and_then(|data| data.get("line"))
                    .and_then(|line| line.as_u64())
                    .map(|line| line as usize);
                Self::Parsing(ParsingError::new(err.message, line))
            }
            ErrorCode::LinterInitialization => Self::LinterNotInitialized,
            ErrorCode::GeneralError => Self::Worker {
                message: err.message,
            },
        }
    }
}

/// Result type alias for embedscan operations
pub type Result<T> = std::result::Result<T, ScanError>;
