//! Unified diff parsing.
//!
//! Splits `git diff` output into per-file spans and counts added/removed lines.
//! Text that contains no `diff --git` header is not an error: it simply yields
//! no records.

use crate::types::git::{DiffFileRecord, FileDiff, FileStatus};

const DEV_NULL: &str = "/dev/null";
const HEADER_PREFIX: &str = "diff --git ";

/// Paths named by a `diff --git` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderPaths {
    old: String,
    new: String,
}

fn strip_side_prefix(raw: &str) -> String {
    let unquoted = raw.trim().trim_matches('"');
    if unquoted == DEV_NULL {
        return unquoted.to_string();
    }
    unquoted
        .strip_prefix("a/")
        .or_else(|| unquoted.strip_prefix("b/"))
        .unwrap_or(unquoted)
        .to_string()
}

fn starts_new_side(candidate: &str) -> bool {
    candidate.starts_with("b/") || candidate.starts_with("\"b/") || candidate.starts_with(DEV_NULL)
}

/// Splits the header remainder into old/new paths.
///
/// Paths may contain spaces, so every space is a candidate split point. A split
/// where both sides name the same file wins, then one whose right side looks
/// like a `b/` path, then the first space.
fn parse_header(line: &str) -> Option<HeaderPaths> {
    let rest = line.strip_prefix(HEADER_PREFIX)?.trim_end();
    let splits: Vec<usize> = rest.match_indices(' ').map(|(i, _)| i).collect();
    if rest.is_empty() || splits.is_empty() {
        return None;
    }

    let side_at = |i: usize| {
        HeaderPaths {
            old: strip_side_prefix(&rest[..i]),
            new: strip_side_prefix(&rest[i + 1..]),
        }
    };

    let chosen = splits
        .iter()
        .map(|&i| side_at(i))
        .find(|paths| paths.old == paths.new)
        .or_else(|| {
            splits
                .iter()
                .find(|&&i| starts_new_side(&rest[i + 1..]))
                .map(|&i| side_at(i))
        })
        .unwrap_or_else(|| side_at(splits[0]));

    if chosen.old.is_empty() || chosen.new.is_empty() {
        return None;
    }
    Some(chosen)
}

/// Accumulates one file span while scanning.
struct FileSpan {
    paths: HeaderPaths,
    status: FileStatus,
    additions: usize,
    deletions: usize,
    in_hunks: bool,
    text: String,
}

impl FileSpan {
    fn open(paths: HeaderPaths, header_line: &str) -> Self {
        let status = if paths.old == DEV_NULL {
            FileStatus::Added
        } else if paths.new == DEV_NULL {
            FileStatus::Deleted
        } else {
            FileStatus::Modified
        };
        let mut text = String::with_capacity(header_line.len() + 1);
        text.push_str(header_line);
        text.push('\n');
        Self {
            paths,
            status,
            additions: 0,
            deletions: 0,
            in_hunks: false,
            text,
        }
    }

    fn feed(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');

        if line.starts_with("@@") {
            self.in_hunks = true;
            return;
        }

        if !self.in_hunks {
            // Extended header: mode lines and the ---/+++ path annotations.
            if line.starts_with("new file mode") {
                self.status = FileStatus::Added;
                return;
            }
            if line.starts_with("deleted file mode") {
                self.status = FileStatus::Deleted;
                return;
            }
            if let Some(rest) = line.strip_prefix("--- ") {
                if rest.trim() == DEV_NULL {
                    self.status = FileStatus::Added;
                }
                return;
            }
            if let Some(rest) = line.strip_prefix("+++ ") {
                if rest.trim() == DEV_NULL {
                    self.status = FileStatus::Deleted;
                }
                return;
            }
            if line.starts_with("+++") || line.starts_with("---") {
                return;
            }
        }

        // Only a single leading marker counts; `++`/`--` lines never do.
        if line.starts_with("++") || line.starts_with("--") {
            return;
        }
        if line.starts_with('+') {
            self.additions += 1;
        } else if line.starts_with('-') {
            self.deletions += 1;
        }
    }

    fn path(&self) -> String {
        if self.paths.new != DEV_NULL {
            self.paths.new.clone()
        } else {
            self.paths.old.clone()
        }
    }

    fn into_parts(self) -> (DiffFileRecord, FileDiff) {
        let path = self.path();
        let record = DiffFileRecord {
            path: path.clone(),
            additions: self.additions,
            deletions: self.deletions,
            status: self.status,
        };
        (record, FileDiff { path, diff: self.text })
    }
}

/// Scans `diff` once, yielding every file span in order.
fn scan(diff: &str) -> Vec<FileSpan> {
    let mut spans = Vec::new();
    let mut current: Option<FileSpan> = None;

    for line in diff.lines() {
        if let Some(paths) = parse_header(line) {
            if let Some(span) = current.take() {
                spans.push(span);
            }
            current = Some(FileSpan::open(paths, line));
        } else if let Some(span) = current.as_mut() {
            span.feed(line);
        }
    }

    if let Some(span) = current {
        spans.push(span);
    }
    spans
}

/// Parses a unified diff into one record per `diff --git` header.
pub fn parse_diff_files(diff: &str) -> Vec<DiffFileRecord> {
    scan(diff)
        .into_iter()
        .map(|span| span.into_parts().0)
        .collect()
}

/// Splits a unified diff into `(path, fragment)` pairs, one per file header.
pub fn split_file_diffs(diff: &str) -> Vec<FileDiff> {
    scan(diff)
        .into_iter()
        .map(|span| span.into_parts().1)
        .collect()
}

/// Records and fragments from a single scan, index-aligned.
pub fn parse_with_fragments(diff: &str) -> (Vec<DiffFileRecord>, Vec<FileDiff>) {
    scan(diff).into_iter().map(FileSpan::into_parts).unzip()
}

/// Lines added by a fragment, without the leading `+`.
pub fn added_lines(fragment: &str) -> impl Iterator<Item = &str> {
    let mut in_hunks = false;
    fragment.lines().filter_map(move |line| {
        if line.starts_with("@@") {
            in_hunks = true;
            return None;
        }
        if !in_hunks && (line.starts_with("+++") || line.starts_with("diff --git")) {
            return None;
        }
        line.strip_prefix('+')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILES: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1234567..abcdefg 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 fn main() {
-    println!(\"old\");
+    println!(\"new\");
+    println!(\"extra\");
 }
diff --git a/README.md b/README.md
index 1111111..2222222 100644
--- a/README.md
+++ b/README.md
@@ -1,2 +1,1 @@
-# Title
-Old text
+# Title
";

    #[test]
    fn test_counts_additions_and_deletions_per_file() {
        let records = parse_diff_files(TWO_FILES);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            DiffFileRecord {
                path: "src/lib.rs".to_string(),
                additions: 2,
                deletions: 1,
                status: FileStatus::Modified,
            }
        );
        assert_eq!(records[1].path, "README.md");
        assert_eq!(records[1].additions, 1);
        assert_eq!(records[1].deletions, 2);
    }

    #[test]
    fn test_new_and_deleted_files_never_use_dev_null() {
        let diff = "\
diff --git a/new.txt b/new.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new.txt
@@ -0,0 +1,2 @@
+one
+two
diff --git a/old.txt b/old.txt
deleted file mode 100644
index e69de29..0000000
--- a/old.txt
+++ /dev/null
@@ -1 +0,0 @@
-gone
";
        let records = parse_diff_files(diff);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "new.txt");
        assert_eq!(records[0].status, FileStatus::Added);
        assert_eq!(records[0].additions, 2);
        assert_eq!(records[1].path, "old.txt");
        assert_eq!(records[1].status, FileStatus::Deleted);
        assert_eq!(records[1].deletions, 1);
        assert!(records.iter().all(|r| r.path != DEV_NULL));
    }

    #[test]
    fn test_dev_null_side_in_header_uses_other_side() {
        let diff = "diff --git /dev/null b/created.rs\n+fn x() {}\n";
        let records = parse_diff_files(diff);
        assert_eq!(records[0].path, "created.rs");
        assert_eq!(records[0].status, FileStatus::Added);

        let diff = "diff --git a/removed.rs /dev/null\n-fn x() {}\n";
        let records = parse_diff_files(diff);
        assert_eq!(records[0].path, "removed.rs");
        assert_eq!(records[0].status, FileStatus::Deleted);
    }

    #[test]
    fn test_paths_with_spaces() {
        let diff = "diff --git a/docs/my notes.md b/docs/my notes.md\n+line\n";
        let records = parse_diff_files(diff);
        assert_eq!(records[0].path, "docs/my notes.md");
    }

    #[test]
    fn test_rename_uses_new_path() {
        let diff = "\
diff --git a/old/name.rs b/new/name.rs
similarity index 90%
rename from old/name.rs
rename to new/name.rs
--- a/old/name.rs
+++ b/new/name.rs
@@ -1 +1 @@
-a
+b
";
        let records = parse_diff_files(diff);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "new/name.rs");
        assert_eq!(records[0].status, FileStatus::Modified);
    }

    #[test]
    fn test_no_headers_yields_no_records() {
        assert!(parse_diff_files("").is_empty());
        assert!(parse_diff_files("+just a line\n-another\n").is_empty());
        assert!(split_file_diffs("not a diff at all").is_empty());
    }

    #[test]
    fn test_header_without_hunks_counts_plain_lines() {
        let diff = "diff --git a/test.txt b/test.txt\n+new line";
        let records = parse_diff_files(diff);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].additions, 1);
        assert_eq!(records[0].deletions, 0);
    }

    #[test]
    fn test_record_count_matches_header_count_and_line_totals() {
        let mut diff = String::new();
        let mut expected_changes = 0;
        for i in 0..7 {
            diff.push_str(&format!(
                "diff --git a/f{i}.rs b/f{i}.rs\n--- a/f{i}.rs\n+++ b/f{i}.rs\n@@ -1 +1 @@\n"
            ));
            for j in 0..i {
                diff.push_str(&format!("+added {j}\n"));
                expected_changes += 1;
            }
            diff.push_str("-removed\n context\n");
            expected_changes += 1;
        }
        let records = parse_diff_files(&diff);
        assert_eq!(records.len(), 7);
        let total: usize = records.iter().map(|r| r.additions + r.deletions).sum();
        assert_eq!(total, expected_changes);
    }

    #[test]
    fn test_double_markers_inside_hunks_are_not_counted() {
        let diff = "\
diff --git a/db/schema.sql b/db/schema.sql
--- a/db/schema.sql
+++ b/db/schema.sql
@@ -1,3 +1,3 @@
--- old sql comment
+++ new counter
-x
+y
";
        let records = parse_diff_files(diff);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].additions, records[0].deletions), (1, 1));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        assert_eq!(parse_diff_files(TWO_FILES), parse_diff_files(TWO_FILES));
        assert_eq!(split_file_diffs(TWO_FILES), split_file_diffs(TWO_FILES));
    }

    #[test]
    fn test_fragments_align_with_records() {
        let (records, fragments) = parse_with_fragments(TWO_FILES);
        assert_eq!(records.len(), fragments.len());
        assert_eq!(fragments[0].path, "src/lib.rs");
        assert!(fragments[0].diff.contains("println!(\"extra\")"));
        assert!(!fragments[0].diff.contains("README"));
        assert!(fragments[1].diff.starts_with("diff --git a/README.md"));
    }

    #[test]
    fn test_added_lines_skip_header() {
        let fragments = split_file_diffs(TWO_FILES);
        let added: Vec<&str> = added_lines(&fragments[0].diff).collect();
        assert_eq!(added, vec!["    println!(\"new\");", "    println!(\"extra\");"]);
    }
}
