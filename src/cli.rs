//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::AnalysisConfig;

/// Analyzer for JavaScript embedded in markup and config documents
#[derive(Parser, Debug)]
#[command(name = "embedscan")]
#[command(about = "Finds issues in JavaScript/TypeScript files and in scripts embedded in HTML and YAML documents")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze every file of a project
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),

    /// List what discovery finds in a project, per store
    #[command(visible_alias = "d")]
    Discover(DiscoverArgs),
}

/// Options shared by every command that walks a project
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project base directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Extra exclusion glob, relative to the base directory (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclusions: Vec<String>,

    /// Directories holding test code, relative to the base directory
    #[arg(long, value_name = "DIR", value_delimiter = ',')]
    pub tests: Vec<String>,

    /// Skip files larger than this many kilobytes
    #[arg(long, value_name = "KB")]
    pub max_file_size_kb: Option<u64>,

    /// Explicit tsconfig paths or globs
    #[arg(long = "tsconfig", value_name = "PATH")]
    pub tsconfig_paths: Vec<String>,
}

impl ProjectArgs {
    /// Apply command-line overrides on top of the project configuration.
    pub fn apply(&self, config: &mut AnalysisConfig) {
        config.exclusions.extend(self.exclusions.iter().cloned());
        config.tests.extend(self.tests.iter().cloned());
        config
            .tsconfig_paths
            .extend(self.tsconfig_paths.iter().cloned());
        if let Some(kb) = self.max_file_size_kb {
            config.max_file_size_kb = kb;
        }
    }
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Rules to enable (defaults to every built-in rule)
    #[arg(long, value_name = "RULE", value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Also apply the rules to test files
    #[arg(long)]
    pub include_tests: bool,

    /// Handle requests on the main thread instead of a worker thread
    #[arg(long)]
    pub in_process: bool,
}

/// Arguments for the discover command
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default for terminal)
    #[default]
    Text,
    /// JSON for machine parsing
    Json,
}
