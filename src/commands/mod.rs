//! Command modules for the embedscan CLI
//!
//! - `analyze`: analyze a project through a worker channel
//! - `discover`: run discovery only and list what each store found
//!
//! Handlers take their `Args` struct from `cli.rs` plus a shared
//! [`CommandContext`], and return the text to print.

pub mod analyze;
pub mod discover;

pub use analyze::run_analyze;
pub use discover::run_discover;

use crate::cli::{OutputFormat, ProjectArgs};
use crate::config::AnalysisConfig;
use crate::paths::{resolve_path, NormalizedPath};
use crate::{Result, ScanError};

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub verbose: bool,
}

impl CommandContext {
    pub fn from_cli(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }
}

/// Resolve the base dir and build its configuration with CLI overrides.
pub(crate) fn project_setup(args: &ProjectArgs) -> Result<(NormalizedPath, AnalysisConfig)> {
    let base_dir = resolve_path(args.path.as_deref())?;
    if !base_dir.as_path().is_dir() {
        return Err(ScanError::FileNotFound {
            path: base_dir.to_string(),
        });
    }
    let mut config = AnalysisConfig::load_or_default(base_dir.as_path());
    args.apply(&mut config);
    Ok((base_dir, config))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| ScanError::Worker {
        message: format!("JSON serialization failed: {}", e),
    })
}
