use crate::types::analysis::AnalysisModes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// changescope - change intelligence for pull requests
#[derive(Parser, Debug)]
#[command(name = "changescope", version)]
#[command(about = "Structured analysis of a git change: tickets, IaC cost deltas and staged LLM review")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a diff and print a report (or prompts with --mode prompt-only)
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Revision range to diff, e.g. `main..HEAD`
    pub range: Option<String>,

    /// execute | prompt-only
    #[arg(long, default_value = "execute")]
    pub mode: String,

    /// minimal | compact | standard | detailed | verbose
    #[arg(long)]
    pub verbosity: Option<String>,

    /// console | markdown
    #[arg(long)]
    pub style: Option<String>,

    /// Pull request title
    #[arg(long)]
    pub title: Option<String>,

    /// Pull request description
    #[arg(long)]
    pub description: Option<String>,

    /// Branch name (defaults to the current branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Read the diff from a file instead of running git (`-` for stdin)
    #[arg(long, conflicts_with_all = ["staged", "range"])]
    pub diff_file: Option<PathBuf>,

    /// Diff the staged changes
    #[arg(long)]
    pub staged: bool,

    /// Regex for ticket keys
    #[arg(long)]
    pub ticket_pattern: Option<String>,

    /// Keep only tickets whose key starts with this prefix
    #[arg(long)]
    pub project_prefix: Option<String>,

    /// Number of commit messages to scan for ticket keys
    #[arg(long)]
    pub commit_limit: Option<usize>,

    #[arg(long)]
    pub no_summary: bool,

    #[arg(long)]
    pub no_risks: bool,

    #[arg(long)]
    pub no_complexity: bool,

    /// Skip the ticket quality, acceptance criteria and peer review stages
    #[arg(long)]
    pub no_peer_review: bool,

    #[arg(long)]
    pub no_refinement: bool,

    /// Print the raw outcome as JSON instead of a report
    #[arg(long)]
    pub json: bool,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl AnalyzeArgs {
    pub fn modes(&self) -> AnalysisModes {
        AnalysisModes {
            summary: !self.no_summary,
            risks: !self.no_risks,
            complexity: !self.no_complexity,
        }
    }

    /// Arguments passed after `git diff`.
    pub fn diff_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.staged {
            args.push("--staged".to_string());
        }
        if let Some(range) = &self.range {
            args.push(range.clone());
        }
        args
    }
}
