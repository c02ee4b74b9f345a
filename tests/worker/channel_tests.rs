//! Tests for the request/stream protocol over both channel implementations
//!
//! Each scenario runs against the in-process channel and the message-passing
//! channel; the observable results must be identical.

use std::collections::BTreeMap;
use std::sync::Arc;

use embedscan::linter::rules::{COGNITIVE_COMPLEXITY, NO_DEBUGGER, NO_DUPE_KEYS};
use embedscan::stores::{InputFile, InputFiles};
use embedscan::worker::StreamReceiver;
use embedscan::{
    select_channel, AnalysisConfig, AnalysisInput, Channel, ErrorCode, FileResult,
    NormalizedPath, ProjectAnalysisInput, RuleConfig, ScanError, StreamMessage, WorkerRequest,
    WorkerResponse,
};

use crate::common::{expect_issues, TestRepo};

async fn init(channel: &Arc<dyn Channel>, rules: Vec<RuleConfig>) {
    let response = channel
        .post(WorkerRequest::OnInitLinter { rules })
        .await
        .unwrap();
    assert!(matches!(response, WorkerResponse::Success { .. }));
}

async fn collect(channel: &Arc<dyn Channel>, input: ProjectAnalysisInput) -> Vec<StreamMessage> {
    let mut rx = channel
        .subscribe(WorkerRequest::OnAnalyzeProject(input))
        .unwrap();
    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    messages
}

fn channels() -> Vec<Arc<dyn Channel>> {
    vec![select_channel(true).unwrap(), select_channel(false).unwrap()]
}

// ============================================================================
// REQUEST/RESPONSE TESTS
// ============================================================================

#[tokio::test]
async fn test_uninitialized_linter_is_a_typed_failure() {
    for channel in channels() {
        let response = channel
            .post(WorkerRequest::OnAnalyzeJsts(
                AnalysisInput::new("/p/a.js").with_content("a();"),
            ))
            .await
            .unwrap();
        match response {
            WorkerResponse::Failure { error } => {
                assert_eq!(error.code, ErrorCode::LinterInitialization);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_secondary_locations_cross_the_channel() {
    for channel in channels() {
        init(&channel, vec![RuleConfig::new(NO_DUPE_KEYS)]).await;
        let response = channel
            .post(WorkerRequest::OnAnalyzeJsts(
                AnalysisInput::new("/p/a.js").with_content("const o = {\n    a: 1,\n    a: 2,\n};"),
            ))
            .await
            .unwrap();
        let result: FileResult = response.into_result().unwrap();
        let issues = expect_issues(&result, "a.js");
        assert_eq!(issues.len(), 1);
        assert_eq!((issues[0].line, issues[0].column), (3, 4));
        let secondary = &issues[0].secondary_locations;
        assert_eq!((secondary[0].line, secondary[0].column), (2, 4));
        assert_eq!((secondary[0].end_line, secondary[0].end_column), (2, 5));
    }
}

#[tokio::test]
async fn test_complexity_cost_crosses_the_channel() {
    let code = "function f(a, b) {\n  if (a) {\n    if (b) {\n      return 1;\n    }\n  }\n  return 0;\n}\n";
    for channel in channels() {
        let mut rule = RuleConfig::new(COGNITIVE_COMPLEXITY);
        rule.configurations = vec![serde_json::json!(1)];
        init(&channel, vec![rule]).await;

        let response = channel
            .post(WorkerRequest::OnAnalyzeJsts(
                AnalysisInput::new("/p/f.js").with_content(code),
            ))
            .await
            .unwrap();
        let FileResult::Success(output) = response.into_result::<FileResult>().unwrap() else {
            panic!("expected success");
        };
        assert_eq!(output.cognitive_complexity, Some(3));
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].cost, Some(2.0));
        assert_eq!(output.issues[0].secondary_locations.len(), 2);
    }
}

#[tokio::test]
async fn test_yaml_request_returns_results_per_path() {
    let yaml = "Resources:\n  Fn:\n    Type: AWS::Serverless::Function\n    Properties:\n      Runtime: nodejs20.x\n      InlineCode: \"debugger;\"\n";
    for channel in channels() {
        init(&channel, vec![RuleConfig::new(NO_DEBUGGER)]).await;
        let response = channel
            .post(WorkerRequest::OnAnalyzeYaml(
                AnalysisInput::new("/p/t.yaml").with_content(yaml),
            ))
            .await
            .unwrap();
        let results: BTreeMap<NormalizedPath, FileResult> = response.into_result().unwrap();
        let issues = expect_issues(&results[&"/p/t-Fn.yaml".into()], "t-Fn.yaml");
        assert_eq!((issues[0].line, issues[0].column), (6, 19));
    }
}

#[tokio::test]
async fn test_cancel_request_is_acknowledged() {
    for channel in channels() {
        let response = channel.post(WorkerRequest::OnCancelAnalysis).await.unwrap();
        assert!(matches!(response, WorkerResponse::Success { .. }));
    }
}

// ============================================================================
// STREAMING TESTS
// ============================================================================

#[tokio::test]
async fn test_project_stream_over_real_tree() {
    let repo = TestRepo::new();
    repo.with_mixed_layout();

    for channel in channels() {
        let input = ProjectAnalysisInput {
            rules: Some(vec![RuleConfig::new(NO_DEBUGGER)]),
            ..ProjectAnalysisInput::new(repo.base_dir())
        };
        let messages = collect(&channel, input).await;

        let files: Vec<&NormalizedPath> = messages
            .iter()
            .filter_map(|m| match m {
                StreamMessage::FileResult { filename, .. } => Some(filename),
                _ => None,
            })
            .collect();
        assert_eq!(files.len(), 4);
        assert!(files.contains(&&repo.file("infra/template-Handler.yaml")));

        let StreamMessage::Meta { meta } = messages.last().unwrap() else {
            panic!("expected meta as terminal, got {:?}", messages.last());
        };
        assert_eq!(meta.files_analyzed, 4);
        assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);
    }
}

#[tokio::test]
async fn test_project_stream_on_missing_dir_ends_with_error() {
    for channel in channels() {
        init(&channel, vec![RuleConfig::new(NO_DEBUGGER)]).await;
        let messages = collect(
            &channel,
            ProjectAnalysisInput::new("/definitely/not/a/project"),
        )
        .await;
        assert_eq!(messages.len(), 1);
        let StreamMessage::Error { error } = &messages[0] else {
            panic!("expected error, got {:?}", messages[0]);
        };
        assert!(matches!(ScanError::from(error.clone()), ScanError::Worker { .. } | ScanError::Discovery { .. }));
    }
}

fn generated_project(base_dir: &str, count: usize) -> ProjectAnalysisInput {
    let mut files = InputFiles::new();
    for i in 0..count {
        files.insert(
            format!("{}/src/f{:04}.js", base_dir, i).as_str().into(),
            InputFile::with_content("function f() { return 1; }\n"),
        );
    }
    ProjectAnalysisInput {
        base_dir: base_dir.into(),
        files: Some(files),
        configuration: Some(AnalysisConfig {
            no_fs: true,
            ..Default::default()
        }),
        rules: Some(vec![RuleConfig::new(NO_DEBUGGER)]),
    }
}

/// Wait for the first file result, so the stream is known to be in flight
async fn first_result(rx: &mut StreamReceiver) -> StreamMessage {
    let first = rx.recv().await.unwrap();
    assert!(
        matches!(first, StreamMessage::FileResult { .. }),
        "expected a file result first, got {:?}",
        first
    );
    first
}

async fn drain_rest(rx: &mut StreamReceiver, mut messages: Vec<StreamMessage>) -> Vec<StreamMessage> {
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    messages
}

fn file_results(messages: &[StreamMessage]) -> usize {
    messages
        .iter()
        .filter(|m| matches!(m, StreamMessage::FileResult { .. }))
        .count()
}

const LARGE_PROJECT: usize = 2000;

#[tokio::test]
async fn test_cancel_in_flight_stream_ends_cancelled() {
    let channel = select_channel(false).unwrap();
    let mut rx = channel
        .subscribe(WorkerRequest::OnAnalyzeProject(generated_project(
            "/p",
            LARGE_PROJECT,
        )))
        .unwrap();
    let first = first_result(&mut rx).await;
    channel.cancel();

    let messages = drain_rest(&mut rx, vec![first]).await;
    assert!(matches!(messages.last(), Some(StreamMessage::Cancelled)));
    assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);
    assert!(file_results(&messages) < LARGE_PROJECT);

    // the next subscription is not affected
    let messages = collect(&channel, generated_project("/p", 3)).await;
    assert_eq!(file_results(&messages), 3);
    assert!(matches!(messages.last(), Some(StreamMessage::Meta { .. })));
}

#[tokio::test]
async fn test_cancel_request_stops_in_flight_stream() {
    let channel = select_channel(false).unwrap();
    let mut rx = channel
        .subscribe(WorkerRequest::OnAnalyzeProject(generated_project(
            "/p",
            LARGE_PROJECT,
        )))
        .unwrap();
    let first = first_result(&mut rx).await;
    let response = channel.post(WorkerRequest::OnCancelAnalysis).await.unwrap();
    assert!(matches!(response, WorkerResponse::Success { .. }));

    let messages = drain_rest(&mut rx, vec![first]).await;
    assert!(matches!(messages.last(), Some(StreamMessage::Cancelled)));
    assert!(file_results(&messages) < LARGE_PROJECT);
}

#[tokio::test]
async fn test_cancel_leaves_queued_stream_alone() {
    let channel = select_channel(false).unwrap();
    let mut running = channel
        .subscribe(WorkerRequest::OnAnalyzeProject(generated_project(
            "/p",
            LARGE_PROJECT,
        )))
        .unwrap();
    let mut queued = channel
        .subscribe(WorkerRequest::OnAnalyzeProject(generated_project("/q", 3)))
        .unwrap();

    let first = first_result(&mut running).await;
    channel.cancel();

    let running = drain_rest(&mut running, vec![first]).await;
    assert!(matches!(running.last(), Some(StreamMessage::Cancelled)));

    let queued = drain_rest(&mut queued, Vec::new()).await;
    assert_eq!(file_results(&queued), 3);
    let Some(StreamMessage::Meta { meta }) = queued.last() else {
        panic!("expected meta as terminal, got {:?}", queued.last());
    };
    assert_eq!(meta.files_analyzed, 3);
}

#[tokio::test]
async fn test_cancel_without_stream_does_not_leak() {
    for channel in channels() {
        channel.cancel();
        let messages = collect(&channel, generated_project("/p", 3)).await;
        assert_eq!(file_results(&messages), 3);
        assert!(matches!(messages.last(), Some(StreamMessage::Meta { .. })));
    }
}
