//! Analyze command handler
//!
//! Initializes the linter through the selected worker channel, subscribes to
//! a project analysis and renders the streamed results. Ctrl-C cancels the
//! stream between files.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use tracing::info;

use super::{project_setup, to_json, CommandContext};
use crate::analysis::{FileResult, ProjectAnalysisInput, ProjectMeta};
use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::linter::{RuleConfig, RuleRegistry};
use crate::paths::NormalizedPath;
use crate::stores::FileKind;
use crate::worker::{select_channel, StreamMessage, WorkerRequest};
use crate::{Result, ScanError};

/// Everything a project analysis produced
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReport {
    pub files: BTreeMap<NormalizedPath, FileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ProjectMeta>,
    pub cancelled: bool,
}

/// Rule configurations for the requested keys, or every non-virtual built-in rule
pub fn rule_configs(keys: &[String], include_tests: bool) -> Vec<RuleConfig> {
    let registry = RuleRegistry::builtin();
    let keys: Vec<String> = if keys.is_empty() {
        registry
            .ids()
            .filter(|id| registry.meta(id).is_some_and(|meta| !meta.is_virtual))
            .map(str::to_string)
            .collect()
    } else {
        keys.to_vec()
    };
    keys.into_iter()
        .map(|key| {
            let mut config = RuleConfig::new(key);
            if include_tests {
                config.file_type_target = vec![FileKind::Main, FileKind::Test];
            }
            config
        })
        .collect()
}

/// Run the analyze command
pub fn run_analyze(args: &AnalyzeArgs, ctx: &CommandContext) -> Result<String> {
    let (base_dir, config) = project_setup(&args.project)?;
    let runtime = tokio::runtime::Runtime::new().map_err(|e| ScanError::Worker {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;

    let input = ProjectAnalysisInput {
        base_dir,
        files: None,
        configuration: Some(config),
        rules: None,
    };
    let report = runtime.block_on(collect(
        input,
        rule_configs(&args.rules, args.include_tests),
        args.in_process,
    ))?;

    match ctx.format {
        OutputFormat::Json => to_json(&report),
        OutputFormat::Text => Ok(render_text(&report)),
    }
}

async fn collect(
    input: ProjectAnalysisInput,
    rules: Vec<RuleConfig>,
    in_process: bool,
) -> Result<AnalyzeReport> {
    let channel = select_channel(in_process)?;
    channel
        .post(WorkerRequest::OnInitLinter { rules })
        .await?
        .into_result::<serde_json::Value>()?;

    info!("Analyzing {}", input.base_dir);
    let mut stream = channel.subscribe(WorkerRequest::OnAnalyzeProject(input))?;
    let mut report = AnalyzeReport::default();
    let mut cancel_sent = false;

    loop {
        tokio::select! {
            message = stream.recv() => {
                let Some(message) = message else { break };
                match message {
                    StreamMessage::FileResult { filename, result } => {
                        report.files.insert(filename, result);
                    }
                    StreamMessage::Meta { meta } => report.meta = Some(meta),
                    StreamMessage::Cancelled => report.cancelled = true,
                    StreamMessage::Error { error } => return Err(ScanError::from(error)),
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                info!("Cancelling analysis");
                channel.cancel();
                cancel_sent = true;
            }
        }
    }

    Ok(report)
}

fn render_text(report: &AnalyzeReport) -> String {
    let mut out = String::new();
    let mut issue_count = 0;

    for (path, result) in &report.files {
        match result {
            FileResult::Success(output) => {
                if output.issues.is_empty() {
                    continue;
                }
                issue_count += output.issues.len();
                let _ = writeln!(out, "{}", path);
                for issue in &output.issues {
                    let _ = writeln!(
                        out,
                        "  {}:{}  {}  {}",
                        issue.line, issue.column, issue.rule_id, issue.message
                    );
                    for secondary in &issue.secondary_locations {
                        let _ = writeln!(
                            out,
                            "      {}:{}  {}",
                            secondary.line,
                            secondary.column,
                            secondary.message.as_deref().unwrap_or("")
                        );
                    }
                }
            }
            FileResult::ParsingError(err) => {
                let _ = writeln!(out, "{}", path);
                let _ = writeln!(out, "  parsing error: {}", err);
            }
            FileResult::Error { error } => {
                let _ = writeln!(out, "{}", path);
                let _ = writeln!(out, "  error: {}", error);
            }
        }
    }

    if report.cancelled {
        let _ = writeln!(out, "Analysis cancelled after {} file(s)", report.files.len());
        return out;
    }
    let _ = writeln!(
        out,
        "{} issue(s) in {} result(s)",
        issue_count,
        report.files.len()
    );
    if let Some(meta) = &report.meta {
        for tsconfig in &meta.tsconfigs {
            let _ = writeln!(out, "tsconfig: {}", tsconfig);
        }
        for warning in &meta.warnings {
            let _ = writeln!(out, "warning: {}", warning);
        }
    }
    out
}
