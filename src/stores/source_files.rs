//! Store of analyzable source files

use tracing::{debug, info, warn};

use super::{
    fingerprint, FileKind, FileStatus, FileStore, FileStoreState, IgnoredDirs, InputFiles,
    StoreContext, StoreStatus,
};
use crate::config::AnalysisConfig;
use crate::fs_utils::{check_content, file_size, read_source};
use crate::lang::FileCategory;
use crate::paths::NormalizedPath;

/// A discovered file, immutable once stored
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub path: NormalizedPath,
    pub content: String,
    pub kind: FileKind,
    pub status: FileStatus,
    pub category: FileCategory,
}

#[derive(Debug, Default)]
pub struct SourceFileStore {
    state: FileStoreState<SourceUnit>,
    ignored: IgnoredDirs,
    /// Paths explicitly requested by the latest caller, if any
    requested: Option<Vec<NormalizedPath>>,
}

impl SourceFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &NormalizedPath) -> Option<&SourceUnit> {
        self.state.get(path)
    }

    /// All discovered files, in traversal order
    pub fn files(&self) -> impl Iterator<Item = &SourceUnit> {
        self.state.iter().map(|(_, unit)| unit)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Files the caller asked for, or everything discovered when no list was given.
    ///
    /// Requested files that were filtered out during discovery are not returned.
    pub fn files_to_analyze(&self) -> Vec<&SourceUnit> {
        match &self.requested {
            Some(paths) => paths.iter().filter_map(|p| self.state.get(p)).collect(),
            None => self.files().collect(),
        }
    }

    /// Everything that decides which units exist and what they contain
    fn cache_key(config: &AnalysisConfig, input_files: Option<&InputFiles>) -> u64 {
        fingerprint((
            (
                &config.js_suffixes,
                &config.ts_suffixes,
                &config.html_suffixes,
                &config.yaml_suffixes,
            ),
            &config.exclusions,
            &config.tests,
            config.max_file_size_kb,
            config.no_fs,
            input_files,
        ))
    }

    fn load(&self, path: &NormalizedPath, ctx: &StoreContext<'_>) -> Option<String> {
        let max_bytes = ctx.config.max_file_size_bytes();
        let content = match ctx.input_file(path).and_then(|f| f.file_content.clone()) {
            Some(content) => content,
            None if ctx.config.no_fs => {
                warn!("[STORE] no content supplied for {} in no-fs mode", path);
                return None;
            }
            None => {
                match file_size(path.as_path()) {
                    Ok(size) if size > max_bytes => {
                        debug!("[STORE] skipping {}: too large ({} bytes)", path, size);
                        return None;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("[STORE] cannot stat {}: {}", path, e);
                        return None;
                    }
                }
                match read_source(path.as_path()) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!("[STORE] cannot read {}: {}", path, e);
                        return None;
                    }
                }
            }
        };

        let verdict = check_content(&content, max_bytes);
        if !verdict.is_accepted() {
            debug!("[STORE] skipping {}: {}", path, verdict.reason());
            return None;
        }
        Some(content)
    }
}

impl FileStore for SourceFileStore {
    fn name(&self) -> &'static str {
        "source-files"
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
        self.requested = input_files.map(|files| files.keys().cloned().collect());
        self.state
            .check(base_dir, Self::cache_key(config, input_files))
    }

    fn setup(&mut self, ctx: &StoreContext<'_>) {
        self.state
            .begin(ctx.base_dir, Self::cache_key(ctx.config, ctx.input_files));
        self.ignored.clear();
    }

    fn process_directory(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) -> bool {
        !self.ignored.check_dir(path, ctx)
    }

    fn process_file(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) {
        if self.ignored.covers(path, ctx.base_dir)
            || ctx.exclusions.is_excluded_file(ctx.base_dir, path)
        {
            return;
        }
        let Some(category) = ctx.config.categorize(path) else {
            return;
        };

        let input = ctx.input_file(path);
        let status = input.map(|f| f.file_status).unwrap_or_default();
        if status == FileStatus::Removed {
            return;
        }
        let kind = match input {
            Some(file) => file.file_type,
            None if ctx.config.is_test_file(ctx.base_dir, path) => FileKind::Test,
            None => FileKind::Main,
        };

        let Some(content) = self.load(path, ctx) else {
            return;
        };
        self.state.insert(
            path.clone(),
            SourceUnit {
                path: path.clone(),
                content,
                kind,
                status,
                category,
            },
        );
    }

    fn post_process(&mut self, ctx: &StoreContext<'_>) {
        self.state.finish();
        info!(
            "[STORE] found {} source file(s) under {}",
            self.state.len(),
            ctx.base_dir
        );
    }
}
