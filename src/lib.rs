//! embedscan: lint JavaScript/TypeScript wherever it lives
//!
//! Besides plain `.js`/`.ts` files, scripts are found inside host documents:
//! `<script>` regions of HTML pages and inline function code of YAML
//! templates. Each embedded script is parsed on its own and its syntax tree is
//! patched back into the coordinates of the host document, so issues point at
//! the right line and column of the file the user actually edits.
//!
//! # Layers
//!
//! - [`syntax`]: owned syntax trees, position patching
//! - [`embedded`]: snippet extraction from HTML and YAML hosts
//! - [`linter`]: rule registry, the linter and its message codec
//! - [`stores`]: single-walk discovery of source files, manifests and tsconfigs
//! - [`analysis`]: per-file and per-project analysis
//! - [`worker`]: request/stream protocol, in-process or on a worker thread
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use embedscan::analysis::{analyze_jsts, AnalysisInput};
//! use embedscan::linter::{Linter, RuleConfig, RuleRegistry};
//!
//! let linter = Linter::new(
//!     Arc::new(RuleRegistry::builtin()),
//!     &[RuleConfig::new("no-debugger")],
//! );
//! let input = AnalysisInput::new("/project/app.js").with_content("debugger;");
//! let output = analyze_jsts(&input, &linter)?;
//! assert_eq!(output.issues[0].rule_id, "no-debugger");
//! ```

pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod embedded;
pub mod error;
pub mod fs_utils;
pub mod lang;
pub mod line_index;
pub mod linter;
pub mod paths;
pub mod stores;
pub mod syntax;
pub mod worker;

// Re-export commonly used types
pub use analysis::{AnalysisInput, AnalysisOutput, FileResult, ProjectAnalysisInput};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::AnalysisConfig;
pub use error::{ErrorCode, ParsingError, Result, ScanError, SerializedError};
pub use lang::{FileCategory, Lang};
pub use linter::{Issue, Linter, RuleConfig, RuleRegistry};
pub use paths::NormalizedPath;
pub use stores::{FileKind, ProjectStores};
pub use worker::{select_channel, Channel, StreamMessage, WorkerRequest, WorkerResponse};
