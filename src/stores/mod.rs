//! Project file stores
//!
//! Independent caches that share a single directory traversal:
//!
//! - [`SourceFileStore`]: files to analyze, with their content
//! - [`PackageJsonStore`]: parsed `package.json` manifests
//! - [`TsConfigStore`]: tsconfig files and which one applies
//!
//! Each store moves through `Uninitialized -> Accumulating -> Ready`. Cached
//! state is keyed by the base dir plus a fingerprint of the settings and input
//! files the store consults. A store asked about any other key drops
//! everything and is rebuilt on the next discovery; there is no partial
//! invalidation.

pub mod discovery;
pub mod package_json;
pub mod source_files;
pub mod tsconfig;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, ExclusionMatcher};
use crate::paths::NormalizedPath;

pub use discovery::{run_discovery, DiscoveryMode, DiscoveryReport, ProjectStores};
pub use package_json::{PackageJson, PackageJsonStore};
pub use source_files::{SourceFileStore, SourceUnit};
pub use tsconfig::{TsConfig, TsConfigOrigin, TsConfigStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileKind {
    #[default]
    Main,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileStatus {
    #[default]
    Added,
    Changed,
    Removed,
}

/// A file supplied by the caller instead of (or on top of) a filesystem walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFile {
    #[serde(default)]
    pub file_content: Option<String>,
    #[serde(default)]
    pub file_type: FileKind,
    #[serde(default)]
    pub file_status: FileStatus,
}

impl InputFile {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            file_content: Some(content.into()),
            ..Default::default()
        }
    }
}

pub type InputFiles = BTreeMap<NormalizedPath, InputFile>;

/// Fingerprint of whatever a store's cached state was built from
pub fn fingerprint(value: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Uninitialized,
    Accumulating,
    Ready,
}

/// Everything a store may consult while processing entries
pub struct StoreContext<'a> {
    pub base_dir: &'a NormalizedPath,
    pub config: &'a AnalysisConfig,
    pub input_files: Option<&'a InputFiles>,
    pub exclusions: &'a ExclusionMatcher,
}

impl StoreContext<'_> {
    pub fn input_file(&self, path: &NormalizedPath) -> Option<&InputFile> {
        self.input_files.and_then(|files| files.get(path))
    }
}

/// Capabilities every store offers to the discovery coordinator.
pub trait FileStore {
    fn name(&self) -> &'static str;

    fn status(&self) -> StoreStatus;

    /// Whether cached state already covers `base_dir` under `config` and
    /// `input_files`. Mismatching state is discarded.
    fn is_initialized(
        &mut self,
        base_dir: &NormalizedPath,
        config: &AnalysisConfig,
        input_files: Option<&InputFiles>,
    ) -> bool;

    fn setup(&mut self, ctx: &StoreContext<'_>);

    fn process_file(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>);

    /// Returns `false` when nothing below `path` interests this store.
    fn process_directory(&mut self, _path: &NormalizedPath, _ctx: &StoreContext<'_>) -> bool {
        true
    }

    fn post_process(&mut self, ctx: &StoreContext<'_>);
}

/// Cached state of one store
#[derive(Debug, Clone)]
pub struct FileStoreState<T> {
    base_dir: Option<NormalizedPath>,
    key: u64,
    entries: HashMap<NormalizedPath, T>,
    ordered_paths: Vec<NormalizedPath>,
    status: StoreStatus,
}

impl<T> Default for FileStoreState<T> {
    fn default() -> Self {
        Self {
            base_dir: None,
            key: 0,
            entries: HashMap::new(),
            ordered_paths: Vec::new(),
            status: StoreStatus::Uninitialized,
        }
    }
}

impl<T> FileStoreState<T> {
    pub fn status(&self) -> StoreStatus {
        self.status
    }

    pub fn base_dir(&self) -> Option<&NormalizedPath> {
        self.base_dir.as_ref()
    }

    /// Ready for `base_dir` and `key`; state cached under anything else is dropped.
    pub fn check(&mut self, base_dir: &NormalizedPath, key: u64) -> bool {
        if self.base_dir.as_ref() != Some(base_dir) || self.key != key {
            if self.base_dir.is_some() {
                *self = Self::default();
            }
            return false;
        }
        self.status == StoreStatus::Ready
    }

    pub fn begin(&mut self, base_dir: &NormalizedPath, key: u64) {
        *self = Self {
            base_dir: Some(base_dir.clone()),
            key,
            status: StoreStatus::Accumulating,
            ..Self::default()
        };
    }

    pub fn finish(&mut self) {
        self.status = StoreStatus::Ready;
    }

    /// Store an entry, replacing any previous entry for the same path.
    pub fn insert(&mut self, path: NormalizedPath, value: T) {
        if self.entries.insert(path.clone(), value).is_none() {
            self.ordered_paths.push(path);
        }
    }

    pub fn get(&self, path: &NormalizedPath) -> Option<&T> {
        self.entries.get(path)
    }

    /// Entries in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedPath, &T)> {
        self.ordered_paths
            .iter()
            .filter_map(|path| self.entries.get(path).map(|value| (path, value)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directories a store has decided to ignore, consulted for files below them
#[derive(Debug, Clone, Default)]
pub struct IgnoredDirs(HashSet<NormalizedPath>);

impl IgnoredDirs {
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Record `dir` as ignored when the exclusions say so; returns whether it is.
    pub fn check_dir(&mut self, dir: &NormalizedPath, ctx: &StoreContext<'_>) -> bool {
        if self.covers(dir, ctx.base_dir) || ctx.exclusions.is_excluded_dir(ctx.base_dir, dir) {
            self.0.insert(dir.clone());
            return true;
        }
        false
    }

    /// Whether `path` lies under an ignored directory
    pub fn covers(&self, path: &NormalizedPath, base_dir: &NormalizedPath) -> bool {
        !self.0.is_empty()
            && path
                .ancestors_below(base_dir)
                .iter()
                .any(|dir| self.0.contains(dir))
    }
}
