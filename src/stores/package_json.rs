//! Store of `package.json` manifests

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{
    fingerprint, FileStore, FileStoreState, IgnoredDirs, InputFiles, StoreContext, StoreStatus,
};
use crate::config::AnalysisConfig;
use crate::fs_utils::read_source;
use crate::paths::NormalizedPath;

pub const PACKAGE_JSON: &str = "package.json";

const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PackageJson {
    pub path: NormalizedPath,
    pub name: Option<String>,
    pub dependencies: BTreeSet<String>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl PackageJson {
    pub fn parse(path: NormalizedPath, text: &str) -> serde_json::Result<Self> {
        let raw: RawManifest = serde_json::from_str(text)?;
        let dependencies = DEPENDENCY_SECTIONS
            .iter()
            .filter_map(|section| raw.rest.get(*section).and_then(Value::as_object))
            .flat_map(|deps| deps.keys().cloned())
            .collect();
        Ok(Self {
            path,
            name: raw.name,
            dependencies,
        })
    }

    /// Directory holding the manifest
    pub fn dir(&self) -> Option<NormalizedPath> {
        self.path.parent()
    }
}

#[derive(Debug, Default)]
pub struct PackageJsonStore {
    state: FileStoreState<PackageJson>,
    ignored: IgnoredDirs,
}

impl PackageJsonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manifests(&self) -> impl Iterator<Item = &PackageJson> {
        self.state.iter().map(|(_, manifest)| manifest)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Manifests whose directory contains `path`, closest first
    pub fn manifests_for(&self, path: &NormalizedPath) -> Vec<&PackageJson> {
        let mut found: Vec<&PackageJson> = self
            .manifests()
            .filter(|m| m.dir().is_some_and(|dir| path.is_within(&dir)))
            .collect();
        found.sort_by_key(|m| std::cmp::Reverse(m.path.as_str().len()));
        found
    }

    fn cache_key(config: &AnalysisConfig, input_files: Option<&InputFiles>) -> u64 {
        fingerprint((&config.exclusions, config.no_fs, input_files))
    }

    /// Union of the dependency names visible from `path`
    pub fn dependencies_for(&self, path: &NormalizedPath) -> BTreeSet<String> {
        self.manifests_for(path)
            .into_iter()
            .flat_map(|m| m.dependencies.iter().cloned())
            .collect()
    }
}

impl FileStore for PackageJsonStore {
    fn name(&self) -> &'static str {
        "package-json"
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
    }

    fn process_directory(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) -> bool {
        !self.ignored.check_dir(path, ctx)
    }

    fn process_file(&mut self, path: &NormalizedPath, ctx: &StoreContext<'_>) {
        if path.file_name() != PACKAGE_JSON || self.ignored.covers(path, ctx.base_dir) {
            return;
        }

        let text = match ctx.input_file(path).and_then(|f| f.file_content.clone()) {
            Some(text) => text,
            None if ctx.config.no_fs => return,
            None => match read_source(path.as_path()) {
                Ok(text) => text,
                Err(e) => {
                    warn!("[STORE] cannot read {}: {}", path, e);
                    return;
                }
            },
        };

        match PackageJson::parse(path.clone(), &text) {
            Ok(manifest) => self.state.insert(path.clone(), manifest),
            Err(e) => warn!("[STORE] invalid {}: {}", path, e),
        }
    }

    fn post_process(&mut self, _ctx: &StoreContext<'_>) {
        self.state.finish();
        debug!("[STORE] found {} package.json file(s)", self.state.len());
    }
}
