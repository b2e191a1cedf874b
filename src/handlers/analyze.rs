use crate::{
    args::AnalyzeArgs,
    clients::{DevOpsClient, OpenAIChatModel},
    config::{AnalysisConfig, AppConfig},
    errors::AppError,
    formatter::{self, ReportStyle, Verbosity},
    git::{collect_change_metadata, GitRepository, SystemGit},
    logging::OperationTimer,
    orchestrator::{AnalysisOptions, AnalysisOrchestrator},
    types::analysis::{AnalysisMode, AnalysisOutcome},
};
use chrono::{DateTime, Utc};
use std::{path::Path, sync::Arc};
use tokio::io::AsyncReadExt;

/// CLI flags win over configuration values.
fn effective_analysis_config(config: &AppConfig, args: &AnalyzeArgs) -> AnalysisConfig {
    let mut analysis = config.analysis.clone();
    if let Some(pattern) = &args.ticket_pattern {
        analysis.ticket_pattern = pattern.clone();
    }
    if let Some(prefix) = &args.project_prefix {
        analysis.default_project_prefix = Some(prefix.clone());
    }
    if let Some(limit) = args.commit_limit {
        analysis.commit_limit = limit;
    }
    if args.no_peer_review {
        analysis.peer_review = false;
    }
    if args.no_refinement {
        analysis.self_refinement = false;
    }
    analysis
}

/// Wires whichever collaborators are configured. Missing ones are not errors.
pub fn build_orchestrator(config: &AppConfig, analysis: AnalysisConfig) -> AnalysisOrchestrator {
    let mut orchestrator = AnalysisOrchestrator::new(analysis);

    match OpenAIChatModel::from_config(&config.ai) {
        Ok(Some(model)) => {
            tracing::info!("使用模型 {}", config.ai.model_name);
            orchestrator = orchestrator.with_model(Arc::new(model));
        }
        Ok(None) => tracing::info!("No AI endpoint configured; EXECUTE mode uses static analysis"),
        Err(e) => tracing::warn!("Could not create chat model, continuing without it: {}", e),
    }

    if let Some(account) = &config.account {
        tracing::info!("Fetching ticket details from {}", account.base_url);
        orchestrator = orchestrator.with_ticket_provider(Arc::new(DevOpsClient::from_account(account)));
    }
    orchestrator
}

async fn read_diff(args: &AnalyzeArgs, git: &dyn GitRepository) -> Result<String, AppError> {
    match &args.diff_file {
        Some(path) if path.as_os_str() == "-" => {
            let mut diff = String::new();
            tokio::io::stdin()
                .read_to_string(&mut diff)
                .await
                .map_err(|e| AppError::IO("reading diff from stdin".to_string(), e))?;
            Ok(diff)
        }
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::IO(format!("reading diff file {}", path.display()), e)),
        None => Ok(git.git_diff(&args.diff_args()).await?),
    }
}

pub fn render(
    outcome: &AnalysisOutcome,
    as_json: bool,
    verbosity: Verbosity,
    style: ReportStyle,
) -> Result<String, AppError> {
    if as_json {
        return serde_json::to_string_pretty(outcome)
            .map_err(|e| AppError::Generic(format!("Failed to serialize outcome: {}", e)));
    }
    Ok(formatter::format(outcome, verbosity, style))
}

/// Appends the generation time to multi-line Markdown reports.
fn stamp_markdown(
    mut rendered: String,
    verbosity: Verbosity,
    style: ReportStyle,
    generated_at: DateTime<Utc>,
) -> String {
    if style == ReportStyle::Markdown && verbosity != Verbosity::Minimal {
        rendered.push_str(&format!(
            "> Generated: {}\n",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    rendered
}

async fn write_output(rendered: &str, output: Option<&Path>) -> Result<(), AppError> {
    match output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .map_err(|e| AppError::IO(format!("writing {}", path.display()), e))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

pub async fn handle_analyze(config: &AppConfig, args: AnalyzeArgs) -> Result<(), AppError> {
    let mut git = SystemGit::new();
    if let Some(range) = &args.range {
        git = git.with_log_range(range.clone());
    }
    handle_analyze_with(config, args, &git).await
}

/// Same as [`handle_analyze`] with an injected git collaborator.
pub async fn handle_analyze_with(
    config: &AppConfig,
    args: AnalyzeArgs,
    git: &dyn GitRepository,
) -> Result<(), AppError> {
    // Contract checks come first so bad flags fail before any I/O.
    let mode: AnalysisMode = args.mode.parse()?;
    let verbosity: Verbosity = args
        .verbosity
        .as_deref()
        .unwrap_or(config.output.verbosity.as_str())
        .parse()?;
    let style: ReportStyle = args
        .style
        .as_deref()
        .unwrap_or(config.output.style.as_str())
        .parse()?;
    let analysis = effective_analysis_config(config, &args);

    let diff = read_diff(&args, git).await?;
    let metadata = collect_change_metadata(
        git,
        args.title.clone(),
        args.branch.clone(),
        args.description.clone(),
        analysis.commit_limit,
    )
    .await;

    let orchestrator = build_orchestrator(config, analysis);
    let options = AnalysisOptions {
        mode,
        branch_name: metadata.branch_name,
        commit_messages: metadata.commit_messages,
        description: metadata.description,
    };

    let timer = OperationTimer::new("analyze").with_metadata("mode", mode);
    let outcome = orchestrator
        .analyze(&diff, metadata.title.as_deref(), args.modes(), &options)
        .await?;
    timer
        .with_metadata("tickets", outcome.ticket_references().len())
        .finish();

    if args.output.is_some() {
        colored::control::set_override(false);
    }
    let mut rendered = render(&outcome, args.json, verbosity, style)?;
    if !args.json {
        rendered = stamp_markdown(rendered, verbosity, style, Utc::now());
    }
    write_output(&rendered, args.output.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ContractError, GitError};
    use async_trait::async_trait;
    use tempfile::tempdir;

    const DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1 +1,2 @@
 fn a() {}
+fn b() {}
";

    struct FakeGit;

    #[async_trait]
    impl GitRepository for FakeGit {
        async fn git_diff(&self, _args: &[String]) -> Result<String, GitError> {
            Ok(DIFF.to_string())
        }
        async fn current_branch(&self) -> Result<String, GitError> {
            Ok("feature/ABC-9-b".to_string())
        }
        async fn commit_messages(&self, _limit: usize) -> Result<Vec<String>, GitError> {
            Ok(vec!["ABC-9 add b".to_string()])
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = AnalyzeArgs {
            ticket_pattern: Some(r"PROJ-\d+".to_string()),
            project_prefix: Some("PROJ".to_string()),
            commit_limit: Some(3),
            no_peer_review: true,
            ..AnalyzeArgs::default()
        };
        let analysis = effective_analysis_config(&AppConfig::default(), &args);
        assert_eq!(analysis.ticket_pattern, r"PROJ-\d+");
        assert_eq!(analysis.default_project_prefix.as_deref(), Some("PROJ"));
        assert_eq!(analysis.commit_limit, 3);
        assert!(!analysis.peer_review);
        assert!(analysis.self_refinement);
    }

    #[tokio::test]
    async fn test_prompt_only_json_written_to_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("outcome.json");
        let args = AnalyzeArgs {
            mode: "prompt-only".to_string(),
            json: true,
            output: Some(out.clone()),
            ..AnalyzeArgs::default()
        };
        handle_analyze_with(&AppConfig::default(), args, &FakeGit).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["mode"], "PROMPT_ONLY");
        assert_eq!(written["ticketReferences"][0]["key"], "ABC-9");
        assert_eq!(written["prompts"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_diff_file_and_markdown_report() {
        let dir = tempdir().unwrap();
        let diff_path = dir.path().join("change.diff");
        std::fs::write(&diff_path, DIFF).unwrap();
        let out = dir.path().join("report.md");
        let args = AnalyzeArgs {
            mode: "execute".to_string(),
            diff_file: Some(diff_path),
            style: Some("markdown".to_string()),
            output: Some(out.clone()),
            ..AnalyzeArgs::default()
        };
        handle_analyze_with(&AppConfig::default(), args, &FakeGit).await.unwrap();

        let report = std::fs::read_to_string(&out).unwrap();
        assert!(report.starts_with("# changescope analysis"));
        assert!(report.contains("## Summary"));
        assert!(report.contains("No language model configured"));
        assert!(report.trim_end().ends_with(" UTC"));
    }

    #[test]
    fn test_markdown_stamp_only_on_multi_line_reports() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let stamped = stamp_markdown("# r\n\n".to_string(), Verbosity::Standard, ReportStyle::Markdown, at);
        assert_eq!(stamped, "# r\n\n> Generated: 2026-01-02 03:04:05 UTC\n");

        let line = stamp_markdown("changescope | 1 file(s)".to_string(), Verbosity::Minimal, ReportStyle::Markdown, at);
        assert_eq!(line, "changescope | 1 file(s)");
        let console = stamp_markdown("x".to_string(), Verbosity::Detailed, ReportStyle::Console, at);
        assert_eq!(console, "x");
    }

    #[tokio::test]
    async fn test_invalid_mode_is_rejected() {
        let args = AnalyzeArgs {
            mode: "dry-run".to_string(),
            ..AnalyzeArgs::default()
        };
        let err = handle_analyze_with(&AppConfig::default(), args, &FakeGit)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Contract(ContractError::InvalidMode(_))));
    }

    #[tokio::test]
    async fn test_missing_diff_file_is_io_error() {
        let args = AnalyzeArgs {
            mode: "execute".to_string(),
            diff_file: Some("/nonexistent/change.diff".into()),
            ..AnalyzeArgs::default()
        };
        let err = handle_analyze_with(&AppConfig::default(), args, &FakeGit)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IO(_, _)));
    }
}
