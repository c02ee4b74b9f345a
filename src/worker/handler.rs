//! Request handling on the worker side
//!
//! [`WorkerState`] owns the project stores and the current linter. Every
//! error is turned into its serialized shape before it leaves this module.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::protocol::{StreamMessage, WorkerRequest, WorkerResponse};
use crate::analysis::{
    analyze_html, analyze_jsts, analyze_project, analyze_yaml, AnalysisInput, AnalysisOutput,
    FileResult, ProjectAnalysisInput, ProjectOutcome,
};
use crate::config::AnalysisConfig;
use crate::error::SerializedError;
use crate::linter::{Linter, RuleConfig, RuleRegistry};
use crate::paths::NormalizedPath;
use crate::stores::ProjectStores;
use crate::{Result, ScanError};

/// Cancellation target of the stream currently running on a worker.
///
/// Every stream gets a fresh flag when the worker starts it, so a cancel only
/// ever reaches the stream in flight. A cancel with no stream running is a no-op.
#[derive(Debug, Default)]
pub struct CancelSlot {
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl CancelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the flag of the stream starting now.
    pub fn begin(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        *self.current.lock() = Some(Arc::clone(&flag));
        flag
    }

    pub fn end(&self, flag: &Arc<AtomicBool>) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, flag)) {
            *current = None;
        }
    }

    /// Cancel the stream in flight; returns whether there was one.
    pub fn cancel(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

pub struct WorkerState {
    registry: Arc<RuleRegistry>,
    linter: Option<Linter>,
    stores: ProjectStores,
    cancel: Arc<CancelSlot>,
}

impl WorkerState {
    pub fn new(cancel: Arc<CancelSlot>) -> Self {
        Self {
            registry: Arc::new(RuleRegistry::builtin()),
            linter: None,
            stores: ProjectStores::new(),
            cancel,
        }
    }

    pub fn stores(&self) -> &ProjectStores {
        &self.stores
    }

    fn init_linter(&mut self, rules: &[RuleConfig]) {
        let linter = Linter::new(Arc::clone(&self.registry), rules);
        info!(
            "[WORKER] linter initialized with {} rule(s)",
            linter.enabled_rule_ids().len()
        );
        self.linter = Some(linter);
    }

    fn linter(&self) -> Result<&Linter> {
        self.linter.as_ref().ok_or(ScanError::LinterNotInitialized)
    }

    /// Handle a request/response unit of work.
    pub fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        debug!("[WORKER] handling {}", request.name());
        match request {
            WorkerRequest::OnInitLinter { rules } => {
                self.init_linter(&rules);
                WorkerResponse::success(serde_json::Value::Null)
            }
            WorkerRequest::OnAnalyzeJsts(input) => match self.analyze_jsts(&input) {
                Ok(result) => WorkerResponse::success(result),
                Err(e) => WorkerResponse::failure(&e),
            },
            WorkerRequest::OnAnalyzeHtml(input) => {
                self.analyze_embedded(&input, analyze_html)
            }
            WorkerRequest::OnAnalyzeYaml(input) => {
                self.analyze_embedded(&input, analyze_yaml)
            }
            WorkerRequest::OnCancelAnalysis => {
                if !self.cancel.cancel() {
                    debug!("[WORKER] no stream in flight to cancel");
                }
                WorkerResponse::success(serde_json::Value::Null)
            }
            WorkerRequest::OnAnalyzeProject(_) => WorkerResponse::failure(&ScanError::Worker {
                message: "project analysis is a streaming request".to_string(),
            }),
        }
    }

    fn analyze_jsts(&self, input: &AnalysisInput) -> Result<FileResult> {
        let linter = self.linter()?;
        Ok(match analyze_jsts(input, linter) {
            Ok(output) => FileResult::Success(output),
            Err(e @ ScanError::Parsing(_)) => FileResult::from_error(e),
            Err(e) => return Err(e),
        })
    }

    fn analyze_embedded(
        &self,
        input: &AnalysisInput,
        analyze: fn(
            &AnalysisInput,
            &Linter,
            &AnalysisConfig,
        ) -> Result<BTreeMap<NormalizedPath, AnalysisOutput>>,
    ) -> WorkerResponse {
        let linter = match self.linter() {
            Ok(linter) => linter,
            Err(e) => return WorkerResponse::failure(&e),
        };
        let results: BTreeMap<NormalizedPath, FileResult> =
            match analyze(input, linter, &AnalysisConfig::default()) {
                Ok(outputs) => outputs
                    .into_iter()
                    .map(|(path, output)| (path, FileResult::Success(output)))
                    .collect(),
                Err(e @ ScanError::Parsing(_)) => {
                    BTreeMap::from([(input.file_path.clone(), FileResult::from_error(e))])
                }
                Err(e) => return WorkerResponse::failure(&e),
            };
        WorkerResponse::success(results)
    }

    /// Handle a streaming unit of work; `emit` receives exactly one terminal message.
    pub fn handle_stream(&mut self, request: WorkerRequest, emit: &mut dyn FnMut(StreamMessage)) {
        debug!("[WORKER] streaming {}", request.name());
        let flag = self.cancel.begin();
        let terminal = match request {
            WorkerRequest::OnAnalyzeProject(input) => self.analyze_project(&input, &flag, emit),
            other => Err(ScanError::Worker {
                message: format!("{} is not a streaming request", other.name()),
            }),
        };
        self.cancel.end(&flag);
        emit(match terminal {
            Ok(ProjectOutcome::Completed(meta)) => StreamMessage::Meta { meta },
            Ok(ProjectOutcome::Cancelled) => StreamMessage::Cancelled,
            Err(e) => StreamMessage::Error {
                error: SerializedError::from(&e),
            },
        });
    }

    fn analyze_project(
        &mut self,
        input: &ProjectAnalysisInput,
        cancel: &AtomicBool,
        emit: &mut dyn FnMut(StreamMessage),
    ) -> Result<ProjectOutcome> {
        if let Some(rules) = &input.rules {
            self.init_linter(rules);
        }
        let linter = self.linter.as_ref().ok_or(ScanError::LinterNotInitialized)?;
        analyze_project(
            input,
            &mut self.stores,
            linter,
            cancel,
            |filename, result| emit(StreamMessage::FileResult { filename, result }),
        )
    }
}
