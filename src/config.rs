//! Analysis configuration
//!
//! One `AnalysisConfig` is built per request (or loaded from
//! `<baseDir>/.embedscan/config.toml`) and passed explicitly to discovery,
//! extraction and analysis. Nothing here is process-global.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lang::FileCategory;
use crate::paths::NormalizedPath;
use crate::{Result, ScanError};

/// Directory (relative to the base dir) holding the project configuration file
pub const CONFIG_DIR: &str = ".embedscan";
pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_MAX_FILE_SIZE_KB: u64 = 4000;
pub const DEFAULT_MAX_FILES_FOR_TYPE_CHECKING: usize = 20_000;

/// Exclusions applied on top of any user-provided patterns
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "**/.*",
    "**/.*/**",
    "**/*.d.ts",
    "**/.git/**",
    "**/node_modules/**",
    "**/bower_components/**",
    "**/dist/**",
    "**/vendor/**",
    "**/external/**",
    "**/contrib/**",
];

fn default_js_suffixes() -> Vec<String> {
    [".js", ".mjs", ".cjs", ".jsx"].iter().map(|s| s.to_string()).collect()
}

fn default_ts_suffixes() -> Vec<String> {
    [".ts", ".mts", ".cts", ".tsx"].iter().map(|s| s.to_string()).collect()
}

fn default_html_suffixes() -> Vec<String> {
    [".html", ".htm", ".vue"].iter().map(|s| s.to_string()).collect()
}

fn default_yaml_suffixes() -> Vec<String> {
    [".yml", ".yaml"].iter().map(|s| s.to_string()).collect()
}

fn default_max_file_size_kb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_KB
}

fn default_max_files_for_type_checking() -> usize {
    DEFAULT_MAX_FILES_FOR_TYPE_CHECKING
}

/// Per-request analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default = "default_js_suffixes")]
    pub js_suffixes: Vec<String>,
    #[serde(default = "default_ts_suffixes")]
    pub ts_suffixes: Vec<String>,
    #[serde(default = "default_html_suffixes")]
    pub html_suffixes: Vec<String>,
    #[serde(default = "default_yaml_suffixes")]
    pub yaml_suffixes: Vec<String>,

    /// Extra glob patterns, matched against paths relative to the base dir
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Directories (relative to the base dir) whose files are test code
    #[serde(default)]
    pub tests: Vec<String>,

    #[serde(default = "default_max_file_size_kb")]
    pub max_file_size_kb: u64,

    /// Explicit tsconfig locations (exact relative paths or globs)
    #[serde(default)]
    pub tsconfig_paths: Vec<String>,

    #[serde(default = "default_max_files_for_type_checking")]
    pub max_files_for_type_checking: usize,

    /// Sandboxed mode: never walk the filesystem, only use supplied input files
    #[serde(default)]
    pub no_fs: bool,

    #[serde(default)]
    pub environments: Vec<String>,

    #[serde(default)]
    pub globals: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            js_suffixes: default_js_suffixes(),
            ts_suffixes: default_ts_suffixes(),
            html_suffixes: default_html_suffixes(),
            yaml_suffixes: default_yaml_suffixes(),
            exclusions: Vec::new(),
            tests: Vec::new(),
            max_file_size_kb: DEFAULT_MAX_FILE_SIZE_KB,
            tsconfig_paths: Vec::new(),
            max_files_for_type_checking: DEFAULT_MAX_FILES_FOR_TYPE_CHECKING,
            no_fs: false,
            environments: Vec::new(),
            globals: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load `<base_dir>/.embedscan/config.toml`, falling back to defaults when absent.
    pub fn load(base_dir: &Path) -> Result<Self> {
        Self::load_from(&base_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ScanError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Like [`AnalysisConfig::load`] but never fails: an unreadable file is reported and ignored.
    pub fn load_or_default(base_dir: &Path) -> Self {
        match Self::load(base_dir) {
            Ok(config) => config,
            Err(e) => {
                warn!("[CONFIG] {}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_kb.saturating_mul(1000)
    }

    /// Which analyzer handles `path`, judged by suffix only.
    pub fn categorize(&self, path: &NormalizedPath) -> Option<FileCategory> {
        let name = path.file_name().to_lowercase();
        let has_suffix = |suffixes: &[String]| {
            suffixes
                .iter()
                .any(|suffix| name.ends_with(&suffix.to_lowercase()))
        };

        if has_suffix(&self.js_suffixes) {
            Some(FileCategory::JavaScript)
        } else if has_suffix(&self.ts_suffixes) {
            Some(FileCategory::TypeScript)
        } else if has_suffix(&self.html_suffixes) {
            Some(FileCategory::Html)
        } else if has_suffix(&self.yaml_suffixes) {
            Some(FileCategory::Yaml)
        } else {
            None
        }
    }

    pub fn is_js_ts(&self, path: &NormalizedPath) -> bool {
        matches!(
            self.categorize(path),
            Some(FileCategory::JavaScript | FileCategory::TypeScript)
        )
    }

    /// Whether `path` lies in one of the configured test directories
    pub fn is_test_file(&self, base_dir: &NormalizedPath, path: &NormalizedPath) -> bool {
        self.tests
            .iter()
            .map(|dir| base_dir.join(dir))
            .any(|dir| path.is_within(&dir))
    }

    /// Compile default and user exclusions into a matcher.
    pub fn exclusion_matcher(&self) -> Result<ExclusionMatcher> {
        let patterns = DEFAULT_EXCLUSIONS
            .iter()
            .map(|p| p.to_string())
            .chain(self.exclusions.iter().cloned());
        ExclusionMatcher::new(patterns)
    }
}

/// Glob-based exclusion check, applied to paths relative to the base dir
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    set: GlobSet,
}

impl ExclusionMatcher {
    pub fn new(patterns: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.trim()).map_err(|e| ScanError::Config {
                message: format!("Invalid exclusion pattern '{}': {}", pattern, e),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| ScanError::Config {
            message: format!("Failed to compile exclusions: {}", e),
        })?;
        Ok(Self { set })
    }

    /// Whether a file is excluded. Paths outside `base_dir` are never excluded.
    pub fn is_excluded_file(&self, base_dir: &NormalizedPath, path: &NormalizedPath) -> bool {
        match path.relative_to(base_dir) {
            Some(relative) => self.set.is_match(relative),
            None => false,
        }
    }

    /// Whether everything under a directory is excluded.
    pub fn is_excluded_dir(&self, base_dir: &NormalizedPath, dir: &NormalizedPath) -> bool {
        match dir.relative_to(base_dir) {
            // a directory is excluded when an arbitrary child of it would be
            Some(relative) => self.set.is_match(format!("{}/_", relative)),
            None => false,
        }
    }
}
