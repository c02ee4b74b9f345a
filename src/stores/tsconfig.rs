//! Store of TypeScript project configurations
//!
//! Which tsconfigs apply is decided once discovery ends, by origin:
//!
//! 1. `Property`: files matching the configured `tsconfig_paths`
//! 2. `Lookup`: every `tsconfig.json` found during the walk
//! 3. `Fallback`: an in-memory config listing the discovered JS/TS files,
//!    only when nothing was found and the filesystem is available

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    fingerprint, FileStore, FileStoreState, IgnoredDirs, InputFiles, StoreContext, StoreStatus,
};
use crate::config::AnalysisConfig;
use crate::fs_utils::read_source;
use crate::paths::NormalizedPath;

pub const TSCONFIG_JSON: &str = "tsconfig.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TsConfigOrigin {
    Property,
    Lookup,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    /// `None` for the in-memory fallback
    pub path: Option<NormalizedPath>,
    pub compiler_options: Value,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub files: Vec<String>,
    pub references: Vec<String>,
}

impl TsConfig {
    /// Parse a tsconfig; comments and trailing commas are allowed.
    pub fn parse(path: NormalizedPath, text: &str) -> Result<Self, String> {
        let value: Value = json5::from_str(text).map_err(|e| e.to_string())?;
        let strings = |key: &str| -> Vec<String> {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };
        let references = value
            .get("references")
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r.get("path").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            compiler_options: value.get("compilerOptions").cloned().unwrap_or(Value::Null),
            include: strings("include"),
            exclude: strings("exclude"),
            files: strings("files"),
            references,
            path: Some(path),
        })
    }

    fn fallback(files: Vec<String>) -> Self {
        Self {
            path: None,
            compiler_options: serde_json::json!({ "allowJs": true, "noImplicitAny": true }),
            include: Vec::new(),
            exclude: Vec::new(),
            files,
            references: Vec::new(),
        }
    }

    /// Whether `file` belongs to this project by `files`/`include`/`exclude`.
    pub fn covers(&self, file: &NormalizedPath) -> bool {
        let Some(dir) = self.path.as_ref().and_then(NormalizedPath::parent) else {
            return self.files.iter().any(|f| f == file.as_str());
        };
        let Some(relative) = file.relative_to(&dir) else {
            return false;
        };
        if self.files.iter().any(|f| dir.join(f) == *file) {
            return true;
        }
        if !self.files.is_empty() && self.include.is_empty() {
            return false;
        }
        let matches = |patterns: &[String]| {
            build_globs(patterns.iter().map(|p| include_pattern(p)))
                .map(|set| set.is_match(relative))
                .unwrap_or(false)
        };
        (self.include.is_empty() || matches(self.include.as_slice()))
            && !matches(self.exclude.as_slice())
    }
}

/// tsconfig `include` entries name directories as well as globs
fn include_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
    if trimmed.contains('*') || trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{}/**", trimmed)
    }
}

fn build_globs(patterns: impl IntoIterator<Item = String>) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(&pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!("[STORE] invalid tsconfig pattern '{}': {}", pattern, e),
        }
    }
    builder.build().ok()
}

#[derive(Debug, Default)]
pub struct TsConfigStore {
    state: FileStoreState<TsConfig>,
    ignored: IgnoredDirs,
    property_paths: Option<GlobSet>,
    property: Vec<NormalizedPath>,
    lookup: Vec<NormalizedPath>,
    js_ts_files: Vec<NormalizedPath>,
    origin: Option<TsConfigOrigin>,
    fallback: Option<TsConfig>,
}

impl TsConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self) -> Option<TsConfigOrigin> {
        self.origin
    }

    /// The tsconfigs in effect, according to the selected origin
    pub fn tsconfigs(&self) -> Vec<&TsConfig> {
        match self.origin {
            Some(TsConfigOrigin::Property) => {
                self.property.iter().filter_map(|p| self.state.get(p)).collect()
            }
            Some(TsConfigOrigin::Lookup) => {
                self.lookup.iter().filter_map(|p| self.state.get(p)).collect()
            }
            Some(TsConfigOrigin::Fallback) => self.fallback.iter().collect(),
            None => Vec::new(),
        }
    }

    /// Paths of the tsconfig files in effect (the fallback has none)
    pub fn tsconfig_paths(&self) -> Vec<NormalizedPath> {
        self.tsconfigs()
            .into_iter()
            .filter_map(|c| c.path.clone())
            .collect()
    }

    /// Closest tsconfig in effect whose project covers `file`
    pub fn tsconfig_for_file(&self, file: &NormalizedPath) -> Option<&TsConfig> {
        let mut candidates: Vec<&TsConfig> = self
            .tsconfigs()
            .into_iter()
            .filter(|config| config.covers(file))
            .collect();
        candidates.sort_by_key(|c| {
            std::cmp::Reverse(c.path.as_ref().map(|p| p.as_str().len()).unwrap_or(0))
        });
        candidates.into_iter().next()
    }

    /// Property paths are part of the key, so changing them re-runs the store.
    fn cache_key(config: &AnalysisConfig, input_files: Option<&InputFiles>) -> u64 {
        fingerprint((
            &config.tsconfig_paths,
            (&config.js_suffixes, &config.ts_suffixes),
            &config.exclusions,
            config.max_files_for_type_checking,
            config.no_fs,
            input_files,
        ))
    }

    fn is_property_path(&self, path: &NormalizedPath, ctx: &StoreContext<'_>) -> bool {
        match (&self.property_paths, path.relative_to(ctx.base_dir)) {
            (Some(set), Some(relative)) => set.is_match(relative),
            _ => false,
        }
    }

    fn load(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) -> bool {
        let text = match ctx.input_file(path).and_then(|f| f.file_content.clone()) {
            Some(text) => text,
            None if ctx.config.no_fs => return false,
            None => match read_source(path.as_path()) {
                Ok(text) => text,
                Err(e) => {
                    warn!("[STORE] cannot read {}: {}", path, e);
                    return false;
                }
            },
        };
        match TsConfig::parse(path.clone(), &text) {
            Ok(config) => {
                self.state.insert(path.clone(), config);
                true
            }
            Err(e) => {
                warn!("[STORE] invalid tsconfig {}: {}", path, e);
                false
            }
        }
    }
}

impl FileStore for TsConfigStore {
    fn name(&self) -> &'static str {
        "tsconfig"
    }

    fn status(&self) -> StoreStatus {
        self.state.status()
    }

    fn is_initialized(
        &mut self,
        base_dir: &NormalizedPath,
        config: &AnalysisConfig,
        input_files: Option<&InputFiles>,
    ) -> bool {
        self.state
            .check(base_dir, Self::cache_key(config, input_files))
    }

    fn setup(&mut self, ctx: &StoreContext<'_>) {
        self.state
            .begin(ctx.base_dir, Self::cache_key(ctx.config, ctx.input_files));
        self.ignored.clear();
        self.property.clear();
        self.lookup.clear();
        self.js_ts_files.clear();
        self.origin = None;
        self.fallback = None;
        self.property_paths = if ctx.config.tsconfig_paths.is_empty() {
            None
        } else {
            build_globs(
                ctx.config
                    .tsconfig_paths
                    .iter()
                    .map(|p| p.trim_start_matches("./").to_string()),
            )
        };
    }

    fn process_directory(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) -> bool {
        !self.ignored.check_dir(path, ctx)
    }

    fn process_file(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) {
        if self.ignored.covers(path, ctx.base_dir) {
            return;
        }
        if self.is_property_path(path, ctx) {
            if self.load(path, ctx) {
                self.property.push(path.clone());
            }
        } else if path.file_name() == TSCONFIG_JSON {
            if self.load(path, ctx) {
                self.lookup.push(path.clone());
            }
        } else if ctx.config.is_js_ts(path) && !ctx.exclusions.is_excluded_file(ctx.base_dir, path)
        {
            self.js_ts_files.push(path.clone());
        }
    }

    fn post_process(&mut self, ctx: &StoreContext<'_>) {
        self.origin = if !self.property.is_empty() {
            Some(TsConfigOrigin::Property)
        } else if !self.lookup.is_empty() {
            Some(TsConfigOrigin::Lookup)
        } else if !ctx.config.no_fs
            && !self.js_ts_files.is_empty()
            && self.js_ts_files.len() <= ctx.config.max_files_for_type_checking
        {
            let files = self.js_ts_files.iter().map(|p| p.to_string()).collect();
            self.fallback = Some(TsConfig::fallback(files));
            Some(TsConfigOrigin::Fallback)
        } else {
            None
        };
        self.js_ts_files.clear();
        self.state.finish();

        match self.origin {
            Some(origin) => info!(
                "[STORE] using {:?} tsconfig(s): {}",
                origin,
                self.tsconfigs().len()
            ),
            None => debug!("[STORE] no tsconfig in effect"),
        }
    }
}
