//! Discovery coordinator
//!
//! Drives a single traversal of the base dir and fans every entry out to the
//! stores that still need it. With filesystem access the tree is walked for
//! real; in no-fs mode the walk is rebuilt from the supplied input files, with
//! every ancestor directory fed to the stores before any file.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{
    FileStore, InputFiles, PackageJsonStore, SourceFileStore, SourceUnit, StoreContext,
    TsConfigStore,
};
use crate::config::AnalysisConfig;
use crate::paths::NormalizedPath;
use crate::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Every store already covered the base dir
    CacheHit,
    Walk,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub mode: DiscoveryMode,
    /// Stores that were rebuilt
    pub refreshed: Vec<&'static str>,
    pub directories: usize,
    pub files: usize,
}

impl DiscoveryReport {
    fn cache_hit() -> Self {
        Self {
            mode: DiscoveryMode::CacheHit,
            refreshed: Vec::new(),
            directories: 0,
            files: 0,
        }
    }
}

/// Run discovery for an arbitrary set of stores.
pub fn run_discovery(
    stores: &mut [&mut dyn FileStore],
    base_dir: &NormalizedPath,
    config: &AnalysisConfig,
    input_files: Option<&InputFiles>,
) -> Result<DiscoveryReport> {
    let mut pending: Vec<&mut dyn FileStore> = Vec::new();
    for store in stores.iter_mut() {
        if !store.is_initialized(base_dir, config, input_files) {
            pending.push(&mut **store);
        }
    }
    if pending.is_empty() {
        debug!("[DISCOVERY] cache hit for {}", base_dir);
        return Ok(DiscoveryReport::cache_hit());
    }

    let exclusions = config.exclusion_matcher()?;
    let ctx = StoreContext {
        base_dir,
        config,
        input_files,
        exclusions: &exclusions,
    };

    for store in pending.iter_mut() {
        store.setup(&ctx);
    }

    let mut report = if !config.no_fs {
        walk(&mut pending, &ctx)?
    } else if let Some(files) = input_files {
        simulate(&mut pending, files, &ctx)
    } else {
        return Err(ScanError::Discovery {
            message: "no input files supplied and filesystem access is disabled".to_string(),
        });
    };

    for store in pending.iter_mut() {
        store.post_process(&ctx);
    }

    report.refreshed = pending.iter().map(|s| s.name()).collect();
    info!(
        "[DISCOVERY] {:?} of {}: {} dir(s), {} file(s), refreshed {:?}",
        report.mode, base_dir, report.directories, report.files, report.refreshed
    );
    Ok(report)
}

/// Single real walk; a directory no pending store is interested in is not entered.
fn walk(stores: &mut [&mut dyn FileStore], ctx: &StoreContext<'_>) -> Result<DiscoveryReport> {
    if !ctx.base_dir.as_path().is_dir() {
        return Err(ScanError::Discovery {
            message: format!("{} is not a directory", ctx.base_dir),
        });
    }

    let mut report = DiscoveryReport {
        mode: DiscoveryMode::Walk,
        refreshed: Vec::new(),
        directories: 0,
        files: 0,
    };

    let mut entries = WalkDir::new(ctx.base_dir.as_path())
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("[DISCOVERY] skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let path = NormalizedPath::new(entry.path());
        let file_type = entry.file_type();
        if file_type.is_dir() {
            report.directories += 1;
            let mut interested = false;
            for store in stores.iter_mut() {
                interested |= store.process_directory(&path, ctx);
            }
            if !interested {
                entries.skip_current_dir();
            }
        } else if file_type.is_file() {
            report.files += 1;
            for store in stores.iter_mut() {
                store.process_file(&path, ctx);
            }
        }
    }

    Ok(report)
}

/// Rebuild a walk from input files: all ancestor directories first, then all files.
fn simulate(
    stores: &mut [&mut dyn FileStore],
    files: &InputFiles,
    ctx: &StoreContext<'_>,
) -> DiscoveryReport {
    let mut seen = HashSet::new();
    let mut directories = Vec::new();
    for path in files.keys() {
        for dir in path.ancestors_below(ctx.base_dir) {
            if seen.insert(dir.clone()) {
                directories.push(dir);
            }
        }
    }

    for dir in &directories {
        for store in stores.iter_mut() {
            store.process_directory(dir, ctx);
        }
    }
    for path in files.keys() {
        for store in stores.iter_mut() {
            store.process_file(path, ctx);
        }
    }

    DiscoveryReport {
        mode: DiscoveryMode::Simulated,
        refreshed: Vec::new(),
        directories: directories.len(),
        files: files.len(),
    }
}

/// The three project stores behind one discovery entry point
#[derive(Debug, Default)]
pub struct ProjectStores {
    pub source_files: SourceFileStore,
    pub package_jsons: PackageJsonStore,
    pub tsconfigs: TsConfigStore,
}

impl ProjectStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store current for `base_dir`, walking at most once.
    pub fn discover(
        &mut self,
        base_dir: &NormalizedPath,
        config: &AnalysisConfig,
        input_files: Option<&InputFiles>,
    ) -> Result<DiscoveryReport> {
        let mut stores: [&mut dyn FileStore; 3] = [
            &mut self.source_files,
            &mut self.package_jsons,
            &mut self.tsconfigs,
        ];
        run_discovery(&mut stores, base_dir, config, input_files)
    }

    pub fn files_to_analyze(&self) -> Vec<&SourceUnit> {
        self.source_files.files_to_analyze()
    }
}
