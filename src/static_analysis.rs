//! Deterministic analysis that never needs a model.
//!
//! Everything here is computed from the parsed diff alone and feeds both the
//! `staticAnalysis` side channel and the stage fallbacks.

use crate::cost::analyze_devops_files;
use crate::cost::detector::classify_file;
use crate::types::analysis::{
    CoverageReport, Fix, ProjectClassification, Severity, StaticAnalysis, TestSuggestion,
};
use crate::types::cost::InfraFileType;
use crate::types::git::{DiffFileRecord, FileDiff, FileStatus};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Files touching more lines than this are flagged as large.
pub const LARGE_FILE_LINES: usize = 400;

const DEPENDENCY_MANIFESTS: &[&str] = &[
    "cargo.toml",
    "cargo.lock",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "requirements.txt",
    "pyproject.toml",
    "poetry.lock",
    "pipfile",
    "pipfile.lock",
    "go.mod",
    "go.sum",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "gemfile",
    "gemfile.lock",
    "composer.json",
];

lazy_static! {
    static ref HUNK_HEADER: Regex = Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").unwrap();
    static ref RISK_RULES: Vec<RiskRule> = vec![
        RiskRule {
            id: "hardcoded-secret",
            pattern: Regex::new(
                r#"(?i)(api[_-]?key|secret|passw(or)?d|token|private[_-]?key)\w*"?\s*[:=]\s*["'][^"'\s]{8,}["']"#
            )
            .unwrap(),
            severity: Severity::Critical,
            message: "Possible hard-coded secret",
            suggestion: Some("Load the value from the environment or a secret store"),
            rust_only: false,
        },
        RiskRule {
            id: "aws-access-key",
            pattern: Regex::new(r"\bAKIA[0-9A-Z]{16}\b").unwrap(),
            severity: Severity::Critical,
            message: "AWS access key id committed",
            suggestion: Some("Revoke the key and read credentials from the environment"),
            rust_only: false,
        },
        RiskRule {
            id: "tls-verification-disabled",
            pattern: Regex::new(
                r"(?i)(verify\s*=\s*false|rejectunauthorized\s*:\s*false|insecureskipverify\s*:\s*true|danger_accept_invalid_certs\(\s*true\s*\)|node_tls_reject_unauthorized)"
            )
            .unwrap(),
            severity: Severity::High,
            message: "TLS certificate verification disabled",
            suggestion: Some("Keep certificate verification enabled outside of tests"),
            rust_only: false,
        },
        RiskRule {
            id: "sql-concatenation",
            pattern: Regex::new(
                r#"(?i)((["'](select|insert|update|delete)\s[^"']*["']\s*(\+|\|\||%))|format!\(\s*"(select|insert|update|delete)\s)"#
            )
            .unwrap(),
            severity: Severity::High,
            message: "SQL built by string concatenation",
            suggestion: Some("Use bound query parameters"),
            rust_only: false,
        },
        RiskRule {
            id: "unsafe-block",
            pattern: Regex::new(r"\bunsafe\s*(\{|fn\b|impl\b)").unwrap(),
            severity: Severity::High,
            message: "New unsafe code",
            suggestion: Some("Document the safety invariant or use a safe abstraction"),
            rust_only: true,
        },
        RiskRule {
            id: "panic-path",
            pattern: Regex::new(r"\.unwrap\(\)|\.expect\(|\bpanic!\(|\bunreachable!\(").unwrap(),
            severity: Severity::Medium,
            message: "Panicking call on a fallible value",
            suggestion: Some("Propagate the error with `?`"),
            rust_only: true,
        },
        RiskRule {
            id: "debug-output",
            pattern: Regex::new(
                r"\b(console\.log|dbg!|System\.out\.println|fmt\.Println|var_dump|print_r)\s*\("
            )
            .unwrap(),
            severity: Severity::Low,
            message: "Debug output left in code",
            suggestion: None,
            rust_only: false,
        },
        RiskRule {
            id: "todo-marker",
            pattern: Regex::new(r"\b(TODO|FIXME|XXX|HACK)\b").unwrap(),
            severity: Severity::Info,
            message: "Unresolved TODO/FIXME marker",
            suggestion: None,
            rust_only: false,
        },
    ];
}

struct RiskRule {
    id: &'static str,
    pattern: Regex,
    severity: Severity,
    message: &'static str,
    suggestion: Option<&'static str>,
    rust_only: bool,
}

/// One risk found by the pattern or structural scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskFinding {
    pub rule: &'static str,
    pub path: String,
    pub line: Option<u32>,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
}

impl RiskFinding {
    pub fn describe(&self) -> String {
        match self.line {
            Some(line) => format!("[{}] {} (line {})", self.severity, self.message, line),
            None => format!("[{}] {}", self.severity, self.message),
        }
    }
}

/// Results of [`scan_risks`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskScan {
    pub findings: Vec<RiskFinding>,
}

impl RiskScan {
    /// Per-file risk lines, keyed by path.
    pub fn by_file(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for finding in &self.findings {
            map.entry(finding.path.clone()).or_default().push(finding.describe());
        }
        map
    }

    /// Distinct medium-or-worse risks, most severe first.
    pub fn overall(&self) -> Vec<String> {
        let mut ranked: Vec<&RiskFinding> = self
            .findings
            .iter()
            .filter(|f| severity_rank(f.severity) >= severity_rank(Severity::Medium))
            .collect();
        ranked.sort_by(|a, b| severity_rank(b.severity).cmp(&severity_rank(a.severity)));

        let mut seen = HashSet::new();
        ranked
            .into_iter()
            .map(|f| format!("{} in {}", f.message, f.path))
            .filter(|line| seen.insert(line.clone()))
            .collect()
    }

    /// Fix suggestions for findings that carry one.
    pub fn fixes(&self) -> Vec<Fix> {
        self.findings
            .iter()
            .filter_map(|f| {
                f.suggestion.as_ref().map(|s| Fix {
                    file: f.path.clone(),
                    line: f.line,
                    description: f.message.clone(),
                    suggestion: Some(s.clone()),
                    severity: f.severity,
                })
            })
            .collect()
    }

    pub fn has_severity_at_least(&self, severity: Severity) -> bool {
        self.findings
            .iter()
            .any(|f| severity_rank(f.severity) >= severity_rank(severity))
    }
}

pub fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 4,
        Severity::High => 3,
        Severity::Medium => 2,
        Severity::Low => 1,
        Severity::Info => 0,
    }
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Language of a source file, by extension.
pub fn language_for(path: &str) -> Option<&'static str> {
    let lang = match extension(path).as_str() {
        "rs" => "Rust",
        "py" => "Python",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "rb" => "Ruby",
        "c" | "h" => "C",
        "cc" | "cpp" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "php" => "PHP",
        "swift" => "Swift",
        "scala" => "Scala",
        _ => return None,
    };
    Some(lang)
}

pub fn is_test_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if lower.starts_with("tests/")
        || lower.starts_with("test/")
        || lower.contains("/tests/")
        || lower.contains("/test/")
        || lower.contains("__tests__/")
        || lower.contains("src/test/")
    {
        return true;
    }
    let name = file_name(path);
    let stem = name.split('.').next().unwrap_or_default();
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_tests")
        || stem.ends_with("_spec")
        || stem.ends_with("Test")
        || stem.ends_with("Tests")
        || name.contains(".test.")
        || name.contains(".spec.")
}

pub fn is_doc_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    matches!(extension(&lower).as_str(), "md" | "rst" | "adoc")
        || lower.starts_with("docs/")
        || lower.contains("/docs/")
        || file_name(&lower).starts_with("readme")
}

pub fn is_dependency_manifest(path: &str) -> bool {
    let name = file_name(path).to_ascii_lowercase();
    DEPENDENCY_MANIFESTS.contains(&name.as_str())
}

fn is_migration(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.contains("migration") || (extension(&lower) == "sql" && lower.contains("schema"))
}

fn is_ci_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.starts_with(".github/workflows/")
        || lower == ".gitlab-ci.yml"
        || lower.starts_with(".circleci/")
        || file_name(&lower) == "jenkinsfile"
        || lower == "azure-pipelines.yml"
}

fn is_source_file(path: &str) -> bool {
    language_for(path).is_some() && !is_test_file(path)
}

/// Stem with conventional test affixes removed, so `parser_test.go` and
/// `parser.go` compare equal.
fn normalized_stem(path: &str) -> String {
    let name = file_name(path);
    let mut stem = name.split('.').next().unwrap_or_default().to_string();
    for prefix in ["test_"] {
        if let Some(rest) = stem.strip_prefix(prefix) {
            stem = rest.to_string();
        }
    }
    for suffix in ["_tests", "_test", "_spec", "Tests", "Test"] {
        if let Some(rest) = stem.strip_suffix(suffix) {
            stem = rest.to_string();
            break;
        }
    }
    stem.to_ascii_lowercase()
}

/// Conventional test location for a source file.
pub fn suggest_test_path(path: &str) -> String {
    let p = Path::new(path);
    let stem = p
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = extension(path);
    let dir = p
        .parent()
        .map(|d| d.to_string_lossy().to_string())
        .filter(|d| !d.is_empty());
    let join = |name: String| match &dir {
        Some(d) => format!("{}/{}", d, name),
        None => name,
    };

    match ext.as_str() {
        "rs" => format!("tests/{}_test.rs", stem),
        "py" => format!("tests/test_{}.py", stem),
        "go" => join(format!("{}_test.go", stem)),
        "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => join(format!("{}.test.{}", stem, ext)),
        "java" | "kt" | "scala" => {
            let test_dir = dir
                .as_deref()
                .map(|d| d.replacen("src/main/", "src/test/", 1))
                .unwrap_or_else(|| "src/test".to_string());
            format!("{}/{}Test.{}", test_dir, stem, ext)
        }
        _ => format!("tests/{}_test.{}", stem, ext),
    }
}

/// One suggestion per changed source file with no related test change.
pub fn suggest_tests(records: &[DiffFileRecord]) -> Vec<TestSuggestion> {
    let tested: HashSet<String> = records
        .iter()
        .filter(|r| is_test_file(&r.path))
        .map(|r| normalized_stem(&r.path))
        .collect();

    records
        .iter()
        .filter(|r| r.status != FileStatus::Deleted && is_source_file(&r.path))
        .filter(|r| !tested.contains(&normalized_stem(&r.path)))
        .map(|r| TestSuggestion {
            source_file: r.path.clone(),
            suggested_test_file: suggest_test_path(&r.path),
            reason: format!(
                "{} changed lines without a matching test change",
                r.changed_lines()
            ),
        })
        .collect()
}

/// Change-level coverage; `None` when no source file changed.
pub fn coverage_report(records: &[DiffFileRecord]) -> Option<CoverageReport> {
    let tested: HashSet<String> = records
        .iter()
        .filter(|r| is_test_file(&r.path))
        .map(|r| normalized_stem(&r.path))
        .collect();
    let sources: Vec<&DiffFileRecord> = records.iter().filter(|r| is_source_file(&r.path)).collect();
    if sources.is_empty() {
        return None;
    }
    let test_files = records.iter().filter(|r| is_test_file(&r.path)).count();
    let covered = sources
        .iter()
        .filter(|r| tested.contains(&normalized_stem(&r.path)))
        .count();
    let percentage = ((covered as f64 / sources.len() as f64) * 100.0).round() as u8;

    Some(CoverageReport {
        source_files: sources.len(),
        test_files,
        covered_source_files: covered,
        coverage_percentage: percentage,
    })
}

pub fn classify_project(records: &[DiffFileRecord], infra: &[InfraFileType]) -> ProjectClassification {
    let mut lines_by_lang: HashMap<&'static str, usize> = HashMap::new();
    for record in records {
        if let Some(lang) = language_for(&record.path) {
            *lines_by_lang.entry(lang).or_default() += record.changed_lines();
        }
    }
    let mut ranked: Vec<(&'static str, usize)> = lines_by_lang.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let languages: Vec<String> = ranked.iter().map(|(l, _)| l.to_string()).collect();

    ProjectClassification {
        primary_language: languages.first().cloned(),
        languages,
        touches_infrastructure: infra.iter().any(|t| *t != InfraFileType::GithubActions),
        touches_ci: infra.contains(&InfraFileType::GithubActions)
            || records.iter().any(|r| is_ci_file(&r.path)),
        touches_docs: records.iter().any(|r| is_doc_file(&r.path)),
        touches_dependencies: records.iter().any(|r| is_dependency_manifest(&r.path)),
    }
}

/// Added lines of a fragment with their new-side line numbers.
fn numbered_additions(fragment: &str) -> Vec<(Option<u32>, &str)> {
    let mut out = Vec::new();
    let mut next_line: Option<u32> = None;
    let mut in_hunks = false;

    for line in fragment.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            in_hunks = true;
            next_line = caps[1].parse().ok();
            continue;
        }
        if !in_hunks && (line.starts_with("+++") || line.starts_with("diff --git")) {
            continue;
        }
        if let Some(added) = line.strip_prefix('+') {
            out.push((next_line, added));
            next_line = next_line.map(|n| n + 1);
        } else if line.starts_with('-') {
            continue;
        } else if in_hunks {
            next_line = next_line.map(|n| n + 1);
        }
    }
    out
}

/// Pattern scan of added lines plus structural checks on each file.
pub fn scan_risks(records: &[DiffFileRecord], fragments: &[FileDiff]) -> RiskScan {
    let mut findings = Vec::new();

    for (record, fragment) in records.iter().zip(fragments) {
        let path = &record.path;
        let is_rust = extension(path) == "rs";
        let is_test = is_test_file(path);

        if record.status == FileStatus::Deleted {
            findings.push(structural(path, "deleted-file", Severity::Medium, format!("File deleted ({} lines removed)", record.deletions)));
        }
        if record.changed_lines() > LARGE_FILE_LINES {
            findings.push(structural(path, "large-change", Severity::Medium, format!("Large change ({} lines)", record.changed_lines())));
        }
        if is_migration(path) {
            findings.push(structural(path, "migration", Severity::High, "Database migration".to_string()));
        }
        if is_dependency_manifest(path) {
            findings.push(structural(path, "dependency-change", Severity::Low, "Dependency manifest changed".to_string()));
        }
        if let Some(kind) = classify_file(path, &fragment.diff) {
            if kind != InfraFileType::GithubActions {
                findings.push(structural(path, "infra-change", Severity::Medium, format!("Infrastructure change ({})", kind)));
            }
        }

        if record.status == FileStatus::Deleted {
            continue;
        }
        for (line_no, text) in numbered_additions(&fragment.diff) {
            for rule in RISK_RULES.iter() {
                if rule.rust_only && !is_rust {
                    continue;
                }
                // Panics and secrets in tests are expected fixtures.
                if is_test && matches!(rule.id, "panic-path" | "hardcoded-secret") {
                    continue;
                }
                if rule.pattern.is_match(text) {
                    findings.push(RiskFinding {
                        rule: rule.id,
                        path: path.clone(),
                        line: line_no,
                        severity: rule.severity,
                        message: rule.message.to_string(),
                        suggestion: rule.suggestion.map(str::to_string),
                    });
                }
            }
        }
    }

    tracing::debug!("Static risk scan produced {} finding(s)", findings.len());
    RiskScan { findings }
}

fn structural(path: &str, rule: &'static str, severity: Severity, message: String) -> RiskFinding {
    RiskFinding {
        rule,
        path: path.to_string(),
        line: None,
        severity,
        message,
        suggestion: None,
    }
}

/// Heuristic 1..=5 complexity from a file's changed line count.
pub fn heuristic_complexity(changed_lines: usize) -> u8 {
    match changed_lines {
        0..=10 => 1,
        11..=50 => 2,
        51..=150 => 3,
        151..=400 => 4,
        _ => 5,
    }
}

/// Rounded mean of per-file complexity, bumped by one for very large change
/// sets. An empty change is complexity 1.
pub fn overall_complexity(per_file: &[u8], records: &[DiffFileRecord]) -> u8 {
    if per_file.is_empty() {
        return 1;
    }
    let mean = per_file.iter().map(|c| *c as f64).sum::<f64>() / per_file.len() as f64;
    let mut score = mean.round() as u8;
    let total: usize = records.iter().map(DiffFileRecord::changed_lines).sum();
    if total > 1000 || records.len() > 20 {
        score += 1;
    }
    score.clamp(1, 5)
}

/// Builds the side channel attached to every result.
pub fn build_static_analysis(records: &[DiffFileRecord], fragments: &[FileDiff]) -> StaticAnalysis {
    let devops = analyze_devops_files(fragments);
    let suggestions = suggest_tests(records);

    StaticAnalysis {
        test_suggestions: if suggestions.is_empty() { None } else { Some(suggestions) },
        coverage_report: coverage_report(records),
        project_classification: if records.is_empty() {
            None
        } else {
            Some(classify_project(records, &devops.file_types))
        },
        dev_ops_cost_estimates: if devops.has_dev_ops_changes { Some(devops) } else { None },
    }
}
