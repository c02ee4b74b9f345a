//! Language detection and tree-sitter grammar loading

use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::Language;

use crate::error::{Result, ScanError};

/// Script dialects the analyzer can parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl Lang {
    /// Detect language from file path extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ScanError::UnsupportedLanguage {
                extension: "none".to_string(),
            })?;

        Self::from_extension(ext)
    }

    /// Detect language from file extension string (without the dot)
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "ts" | "mts" | "cts" => Ok(Self::TypeScript),
            "tsx" => Ok(Self::Tsx),
            "js" | "mjs" | "cjs" => Ok(Self::JavaScript),
            "jsx" => Ok(Self::Jsx),
            _ => Err(ScanError::UnsupportedLanguage {
                extension: ext.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }

    /// Get the tree-sitter Language for parsing
    ///
    /// The JavaScript grammar already accepts JSX.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn is_typescript(&self) -> bool {
        matches!(self, Self::TypeScript | Self::Tsx)
    }
}

/// Which analyzer a discovered file is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    JavaScript,
    TypeScript,
    /// Markup host document (`<script>` regions)
    Html,
    /// Config host document (inline function code)
    Yaml,
}

impl FileCategory {
    pub fn is_host_document(&self) -> bool {
        matches!(self, Self::Html | Self::Yaml)
    }

    /// Grammar for host documents; script categories have none.
    pub fn host_language(&self) -> Option<Language> {
        match self {
            Self::Html => Some(tree_sitter_html::LANGUAGE.into()),
            Self::Yaml => Some(tree_sitter_yaml::language().into()),
            Self::JavaScript | Self::TypeScript => None,
        }
    }
}
