//! End-to-end runs of the public library API against mock HTTP collaborators.

use changescope::clients::{DevOpsClient, OpenAIChatModel};
use changescope::config::AnalysisConfig;
use changescope::types::analysis::{AnalysisStep, ReviewVerdict};
use changescope::types::ticket::TicketSource;
use changescope::{
    analyze_devops_files, extract_ticket_references, format, parse_diff_files, AnalysisMode,
    AnalysisModes, AnalysisOptions, AnalysisOrchestrator, AnalysisOutcome, ReportStyle, Verbosity,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const DIFF: &str = "\
diff --git a/src/loader.rs b/src/loader.rs
--- a/src/loader.rs
+++ b/src/loader.rs
@@ -1,3 +1,4 @@
 pub fn load() -> Value {
-    read()
+    let raw = read();
+    parse(raw).unwrap()
 }
diff --git a/infra/db.tf b/infra/db.tf
new file mode 100644
--- /dev/null
+++ b/infra/db.tf
@@ -0,0 +1,4 @@
+resource \"aws_db_instance\" \"main\" {
+  instance_class = \"db.t3.large\"
+}
+resource \"aws_lb\" \"front\" {}
";

fn completion(content: Value) -> Value {
    json!({
        "id": "cmpl-1",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content.to_string()},
            "finish_reason": "stop"
        }]
    })
}

fn chat_model(server: &MockServer) -> Arc<OpenAIChatModel> {
    Arc::new(
        OpenAIChatModel::new(
            server.url("/v1/chat/completions"),
            "test-model",
            0.0,
            None,
            Duration::from_secs(5),
        )
        .unwrap(),
    )
}

fn tracker(server: &MockServer) -> Arc<DevOpsClient> {
    Arc::new(
        DevOpsClient::new(server.base_url(), "token".to_string())
            .with_retry_count(0)
            .with_backoff(Duration::from_millis(1)),
    )
}

async fn mock_ticket(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/api/2/issue/PAY-42");
            then.status(200).json_body(json!({
                "key": "PAY-42",
                "fields": {
                    "summary": "Load payment settings",
                    "description": "Settings must load at startup.\n\nAcceptance Criteria:\n- settings are parsed\n- invalid settings are reported",
                    "status": {"name": "In Progress"},
                    "issuetype": {"name": "Story"}
                }
            }));
        })
        .await
}

fn options(mode: AnalysisMode) -> AnalysisOptions {
    AnalysisOptions {
        mode,
        branch_name: "feature/PAY-42-settings".to_string(),
        commit_messages: vec!["PAY-42: parse settings".to_string()],
        description: None,
    }
}

#[test]
fn test_title_reference_wins_over_branch_and_commit() {
    let refs = extract_ticket_references(
        Some("[ABC-100] fix"),
        "feature/ABC-100-x",
        &["ABC-100: done".to_string()],
        &AnalysisConfig::default().ticket_pattern,
        None,
    )
    .unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].key, "ABC-100");
    assert_eq!(refs[0].source, TicketSource::Title);
    assert_eq!(refs[0].confidence, 95);
}

#[test]
fn test_parser_and_cost_estimator_agree_on_files() {
    let records = parse_diff_files(DIFF);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].additions + records[0].deletions, 3);
    assert_eq!(records[1].additions, 4);

    let fragments = changescope::diff::split_file_diffs(DIFF);
    let cost = analyze_devops_files(&fragments);
    assert!(cost.has_dev_ops_changes);
    let kinds: Vec<&str> = cost.estimates.iter().map(|e| e.resource_type.as_str()).collect();
    assert_eq!(kinds, vec!["rds", "load_balancer"]);
    let sum: f64 = cost.estimates.iter().map(|e| e.estimated_new_cost).sum();
    assert_eq!(cost.total_estimated_cost, sum);
}

#[tokio::test]
async fn test_execute_against_mock_services() {
    let llm = MockServer::start_async().await;
    let jira = MockServer::start_async().await;
    let ticket_mock = mock_ticket(&jira).await;

    let answers = [
        ("Describe what changed in each file", json!({
            "files": [
                {"path": "src/loader.rs", "summary": "Parses loaded settings", "complexity": 2, "risks": ["unwrap on parse"]},
                {"path": "infra/db.tf", "summary": "Adds a database and a load balancer", "complexity": 3}
            ]
        })),
        ("Identify correctness", json!({"risks": ["Panics on malformed settings"]})),
        ("Write a short summary", json!({
            "summary": "Parses settings and provisions a database.",
            "recommendations": ["Return a Result from load()"],
            "overallComplexity": 3
        })),
        ("Critically re-read", json!({"summary": "Parses settings at startup and provisions an RDS instance."})),
        ("Rate the ticket on each dimension", json!({
            "overallScore": 70,
            "dimensions": {
                "clarity": 70, "completeness": 60, "testability": 80, "feasibility": 90,
                "scope": 70, "acceptanceCriteria": 75, "businessValue": 60, "technicalDetail": 55
            },
            "feedback": ["Name the settings source"]
        })),
        ("For each acceptance criterion", json!({
            "criteria": [
                {"criterion": "settings are parsed", "status": "met", "evidence": "parse(raw)"},
                {"criterion": "invalid settings are reported", "status": "unmet"}
            ]
        })),
        ("should be approved, needs changes", json!({
            "verdict": "request_changes",
            "comments": ["Invalid settings still panic"]
        })),
    ];
    let mut mocks = Vec::new();
    for (marker, answer) in answers {
        mocks.push(
            llm.mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .body_contains(marker);
                then.status(200).json_body(completion(answer));
            })
            .await,
        );
    }

    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default())
        .with_model(chat_model(&llm))
        .with_ticket_provider(tracker(&jira));
    let outcome = orchestrator
        .analyze(DIFF, Some("Load settings"), AnalysisModes::default(), &options(AnalysisMode::Execute))
        .await
        .unwrap();

    ticket_mock.assert_async().await;
    for mock in &mocks {
        mock.assert_async().await;
    }

    let AnalysisOutcome::Executed(result) = &outcome else {
        panic!("expected EXECUTE outcome");
    };
    assert_eq!(result.summary, "Parses settings at startup and provisions an RDS instance.");
    assert_eq!(result.overall_complexity, 3);
    assert!(result.warnings.is_empty());
    assert_eq!(result.ticket_references[0].key, "PAY-42");
    assert_eq!(result.ticket_references[0].source, TicketSource::Branch);

    let review = result.peer_review.as_ref().unwrap();
    assert_eq!(review.ticket.as_ref().unwrap().title, "Load payment settings");
    assert_eq!(review.acceptance_criteria.compliance_percentage, Some(50));
    assert!(!review.acceptance_criteria.satisfied);
    assert_eq!(review.verdict, ReviewVerdict::RequestChanges);

    let report = format(&outcome, Verbosity::Detailed, ReportStyle::Markdown);
    assert!(report.contains("## Acceptance criteria"));
    assert!(report.contains("[unmet] invalid settings are reported"));
    assert!(report.contains("## Infrastructure cost"));
}

#[tokio::test]
async fn test_prompt_only_never_reaches_the_model() {
    let llm = MockServer::start_async().await;
    let jira = MockServer::start_async().await;
    let ticket_mock = mock_ticket(&jira).await;
    let model_mock = llm
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(completion(json!({})));
        })
        .await;

    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default())
        .with_model(chat_model(&llm))
        .with_ticket_provider(tracker(&jira));
    let outcome = orchestrator
        .analyze(DIFF, None, AnalysisModes::default(), &options(AnalysisMode::PromptOnly))
        .await
        .unwrap();

    model_mock.assert_hits_async(0).await;
    ticket_mock.assert_async().await;

    let AnalysisOutcome::PromptOnly(result) = &outcome else {
        panic!("expected PROMPT_ONLY outcome");
    };
    let steps: Vec<AnalysisStep> = result.prompts.iter().map(|p| p.step).collect();
    assert_eq!(steps, AnalysisStep::ALL.to_vec());
    assert!(result.static_analysis.dev_ops_cost_estimates.is_some());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["mode"], "PROMPT_ONLY");
    assert_eq!(json["prompts"][0]["step"], "fileAnalysis");
}

#[tokio::test]
async fn test_model_outage_degrades_every_stage() {
    let llm = MockServer::start_async().await;
    llm.mock_async(|when, then| {
        when.method(POST);
        then.status(503).body("overloaded");
    })
    .await;

    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default()).with_model(chat_model(&llm));
    let modes = AnalysisModes {
        summary: true,
        risks: true,
        complexity: true,
    };
    let outcome = orchestrator
        .analyze(DIFF, None, modes, &options(AnalysisMode::Execute))
        .await
        .unwrap();

    let AnalysisOutcome::Executed(result) = &outcome else {
        panic!("expected EXECUTE outcome");
    };
    // Seven stages, all answered by fallbacks.
    assert_eq!(result.warnings.len(), 7);
    assert!(result.warnings.iter().all(|w| w.ends_with("static fallback used")));
    assert_eq!(result.file_analyses.len(), 2);
    assert!(!result.recommendations.is_empty());
    // No tracker configured, so the ticket could not be judged.
    assert_eq!(
        result.peer_review.as_ref().unwrap().verdict,
        ReviewVerdict::NeedsDiscussion
    );

    let line = format(&outcome, Verbosity::Minimal, ReportStyle::Console);
    assert!(line.starts_with("changescope | 2 file(s)"));
    assert!(!line.contains('\n'));
}
