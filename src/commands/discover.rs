//! Discover command handler

use std::fmt::Write as _;

use serde::Serialize;

use super::{project_setup, to_json, CommandContext};
use crate::cli::{DiscoverArgs, OutputFormat};
use crate::lang::FileCategory;
use crate::paths::NormalizedPath;
use crate::stores::{DiscoveryReport, FileKind, ProjectStores, TsConfigOrigin};
use crate::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveredFile {
    path: NormalizedPath,
    kind: FileKind,
    category: FileCategory,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverOutput {
    base_dir: NormalizedPath,
    report: DiscoveryReport,
    files: Vec<DiscoveredFile>,
    package_manifests: Vec<NormalizedPath>,
    tsconfig_origin: Option<TsConfigOrigin>,
    tsconfigs: Vec<NormalizedPath>,
}

/// Run the discover command
pub fn run_discover(args: &DiscoverArgs, ctx: &CommandContext) -> Result<String> {
    let (base_dir, config) = project_setup(&args.project)?;
    let mut stores = ProjectStores::new();
    let report = stores.discover(&base_dir, &config, None)?;

    let output = DiscoverOutput {
        files: stores
            .source_files
            .files()
            .map(|unit| DiscoveredFile {
                path: unit.path.clone(),
                kind: unit.kind,
                category: unit.category,
            })
            .collect(),
        package_manifests: stores
            .package_jsons
            .manifests()
            .map(|m| m.path.clone())
            .collect(),
        tsconfig_origin: stores.tsconfigs.origin(),
        tsconfigs: stores.tsconfigs.tsconfig_paths(),
        base_dir,
        report,
    };

    match ctx.format {
        OutputFormat::Json => to_json(&output),
        OutputFormat::Text => Ok(render_text(&output)),
    }
}

fn render_text(output: &DiscoverOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Base dir: {}", output.base_dir);
    let _ = writeln!(
        out,
        "Walked {} dir(s) and {} file(s)",
        output.report.directories, output.report.files
    );

    let _ = writeln!(out, "\nSource files ({}):", output.files.len());
    for file in &output.files {
        let relative = file
            .path
            .relative_to(&output.base_dir)
            .unwrap_or(file.path.as_str());
        let kind = format!("{:?}", file.kind);
        let category = format!("{:?}", file.category);
        let _ = writeln!(out, "  {:<6} {:<10} {}", kind, category, relative);
    }

    let _ = writeln!(out, "\npackage.json ({}):", output.package_manifests.len());
    for manifest in &output.package_manifests {
        let _ = writeln!(out, "  {}", manifest);
    }

    match output.tsconfig_origin {
        Some(origin) => {
            let _ = writeln!(out, "\ntsconfig (origin: {:?}):", origin);
            if output.tsconfigs.is_empty() {
                let _ = writeln!(out, "  <in-memory>");
            }
            for tsconfig in &output.tsconfigs {
                let _ = writeln!(out, "  {}", tsconfig);
            }
        }
        None => {
            let _ = writeln!(out, "\ntsconfig: none");
        }
    }
    out
}
