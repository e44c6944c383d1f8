//! Unified-diff parsing for a single file
//!
//! Produces a per-line classification of the *new* file plus a list of
//! deleted lines anchored to new-file positions. Parsing never fails:
//! malformed hunks are skipped and the result degrades to "no highlights".

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Classification of a new-file line relative to the committed version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChangeType {
    /// Pure insertion
    Added,
    /// An addition that replaces a same-position deletion
    Modified,
}

/// 1-based new-file line number -> change classification
pub type ChangedLineMap = FxHashMap<usize, LineChangeType>;

/// A line removed from the committed version, anchored to the new file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedLine {
    /// New-file line the deletion sits after (0 = before the first line)
    pub after_line: usize,
    pub content: String,
}

/// Kind of a raw line within a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Addition,
    Deletion,
}

/// One raw line of a parsed hunk
#[derive(Debug, Clone)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    /// Line number in the new file (context and additions only)
    pub new_line_number: Option<usize>,
}

/// One `@@ -a,b +c,d @@` region of a unified diff
#[derive(Debug, Clone)]
pub struct Hunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

/// Per-file classification extracted from a unified diff
#[derive(Debug, Clone, Default)]
pub struct ParsedDiff {
    pub changed_lines: ChangedLineMap,
    pub deleted_lines: Vec<DeletedLine>,
}

/// Parse the unified diff for one file into a line-change map and a
/// deleted-line list. Empty or malformed input yields empty results.
pub fn parse_unified_diff(diff_text: &str) -> ParsedDiff {
    let mut result = ParsedDiff::default();
    for hunk in parse_hunks(diff_text) {
        classify_hunk(&hunk, &mut result);
    }
    result
}

/// Split a unified diff into its hunks, skipping file-level meta lines.
pub fn parse_hunks(diff_text: &str) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let lines: Vec<&str> = diff_text.lines().collect();
    let mut ix = 0usize;

    while ix < lines.len() {
        let line = lines[ix];
        if !line.starts_with("@@") {
            ix += 1;
            continue;
        }

        let Some((old_start, old_lines, new_start, new_lines)) = parse_hunk_header(line) else {
            ix += 1;
            continue;
        };
        ix += 1;

        let mut new_line = new_start;
        let mut hunk_lines = Vec::new();

        while ix < lines.len() {
            let hunk_line = lines[ix];
            if hunk_line.starts_with("@@") || is_meta_line(hunk_line) {
                break;
            }

            match hunk_line.chars().next() {
                Some(' ') | None => {
                    hunk_lines.push(DiffLine {
                        kind: DiffLineKind::Context,
                        content: hunk_line.strip_prefix(' ').unwrap_or(hunk_line).to_string(),
                        new_line_number: Some(new_line),
                    });
                    new_line = new_line.saturating_add(1);
                }
                Some('-') => {
                    hunk_lines.push(DiffLine {
                        kind: DiffLineKind::Deletion,
                        content: hunk_line[1..].to_string(),
                        new_line_number: None,
                    });
                }
                Some('+') => {
                    hunk_lines.push(DiffLine {
                        kind: DiffLineKind::Addition,
                        content: hunk_line[1..].to_string(),
                        new_line_number: Some(new_line),
                    });
                    new_line = new_line.saturating_add(1);
                }
                Some('\\') => {
                    // "\ No newline at end of file" - carries no content
                }
                _ => break,
            }
            ix += 1;
        }

        hunks.push(Hunk {
            old_start,
            old_lines,
            new_start,
            new_lines,
            lines: hunk_lines,
        });
    }

    hunks
}

/// Pair the earliest deletions in a hunk with the additions that follow
/// them: such pairs become a single `Modified` line, excess deletions stay
/// as visible deleted lines, excess additions stay `Added`.
fn classify_hunk(hunk: &Hunk, out: &mut ParsedDiff) {
    let mut new_line_pos = hunk.new_start.saturating_sub(1);
    let mut pending: VecDeque<DeletedLine> = VecDeque::new();

    for line in &hunk.lines {
        match line.kind {
            DiffLineKind::Context => {
                out.deleted_lines.extend(pending.drain(..));
                new_line_pos += 1;
            }
            DiffLineKind::Deletion => {
                // Deleted lines do not exist in the new file; the anchor is
                // the new-file line they sit after.
                pending.push_back(DeletedLine {
                    after_line: new_line_pos,
                    content: line.content.clone(),
                });
            }
            DiffLineKind::Addition => {
                if let Some(number) = line.new_line_number {
                    let kind = if pending.pop_front().is_some() {
                        LineChangeType::Modified
                    } else {
                        LineChangeType::Added
                    };
                    out.changed_lines.insert(number, kind);
                }
                new_line_pos += 1;
            }
        }
    }

    out.deleted_lines.extend(pending.drain(..));
}

/// Parse `@@ -oldStart,oldLines +newStart,newLines @@`. Counts default to 1
/// when omitted, per the unified-diff format.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@")?;
    let end = rest.find("@@")?;
    let mut parts = rest[..end].split_whitespace();

    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;

    let (old_start, old_lines) = parse_range(old)?;
    let (new_start, new_lines) = parse_range(new)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

fn is_meta_line(line: &str) -> bool {
    line.starts_with("diff --git")
        || line.starts_with("index ")
        || line.starts_with("--- ")
        || line.starts_with("+++ ")
        || line.starts_with("new file mode")
        || line.starts_with("deleted file mode")
        || line.starts_with("old mode")
        || line.starts_with("new mode")
        || line.starts_with("rename from")
        || line.starts_with("rename to")
        || line.starts_with("similarity index")
        || line.starts_with("Binary files")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff_with_hunk(body: &str) -> String {
        format!(
            "diff --git a/f.txt b/f.txt\nindex 000..111 100644\n--- a/f.txt\n+++ b/f.txt\n{body}"
        )
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse_unified_diff("");
        assert!(parsed.changed_lines.is_empty());
        assert!(parsed.deleted_lines.is_empty());
    }

    #[test]
    fn test_malformed_input_yields_empty() {
        let parsed = parse_unified_diff("not a diff\n@@ garbage @@\nstill not a diff");
        assert!(parsed.changed_lines.is_empty());
        assert!(parsed.deleted_lines.is_empty());
    }

    #[test]
    fn test_hunk_header_parsing() {
        assert_eq!(parse_hunk_header("@@ -1,5 +2,7 @@"), Some((1, 5, 2, 7)));
        assert_eq!(parse_hunk_header("@@ -3 +4 @@ fn main()"), Some((3, 1, 4, 1)));
        assert_eq!(parse_hunk_header("@@ broken @@"), None);
    }

    #[test]
    fn test_pure_addition() {
        let diff = diff_with_hunk("@@ -1,2 +1,3 @@\n a\n+b\n c\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.len(), 1);
        assert_eq!(parsed.changed_lines.get(&2), Some(&LineChangeType::Added));
        assert!(parsed.deleted_lines.is_empty());
    }

    #[test]
    fn test_balanced_deletions_become_modified() {
        // 3 deletions followed by 3 additions: all pair up as modified
        let diff = diff_with_hunk("@@ -1,4 +1,4 @@\n a\n-b\n-c\n-d\n+B\n+C\n+D\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.len(), 3);
        for line in 2..=4 {
            assert_eq!(
                parsed.changed_lines.get(&line),
                Some(&LineChangeType::Modified),
                "line {line} should be modified"
            );
        }
        assert!(parsed.deleted_lines.is_empty(), "no visible deletions when balanced");
    }

    #[test]
    fn test_excess_deletions_stay_deleted() {
        // 3 deletions, 1 addition: 1 modified + 2 deleted at the same anchor
        let diff = diff_with_hunk("@@ -1,4 +1,2 @@\n a\n-b\n-c\n-d\n+B\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.len(), 1);
        assert_eq!(parsed.changed_lines.get(&2), Some(&LineChangeType::Modified));
        assert_eq!(parsed.deleted_lines.len(), 2);
        assert_eq!(parsed.deleted_lines[0].after_line, 1);
        assert_eq!(parsed.deleted_lines[1].after_line, 1);
        // Oldest-deleted first among same-anchor entries
        assert_eq!(parsed.deleted_lines[0].content, "c");
        assert_eq!(parsed.deleted_lines[1].content, "d");
    }

    #[test]
    fn test_excess_additions_stay_added() {
        // 1 deletion, 3 additions: 1 modified + 2 added
        let diff = diff_with_hunk("@@ -1,2 +1,4 @@\n a\n-b\n+B\n+C\n+D\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.get(&2), Some(&LineChangeType::Modified));
        assert_eq!(parsed.changed_lines.get(&3), Some(&LineChangeType::Added));
        assert_eq!(parsed.changed_lines.get(&4), Some(&LineChangeType::Added));
        assert!(parsed.deleted_lines.is_empty());
    }

    #[test]
    fn test_context_flushes_pending_deletions() {
        // A context line between the deletion and the addition breaks the
        // pairing: the deletion stays visible, the addition is pure.
        let diff = diff_with_hunk("@@ -1,3 +1,3 @@\n a\n-b\n c\n+d\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.get(&3), Some(&LineChangeType::Added));
        assert_eq!(parsed.deleted_lines.len(), 1);
        assert_eq!(parsed.deleted_lines[0].after_line, 1);
        assert_eq!(parsed.deleted_lines[0].content, "b");
    }

    #[test]
    fn test_deletion_before_first_line() {
        let diff = diff_with_hunk("@@ -1,2 +1,1 @@\n-gone\n kept\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.deleted_lines.len(), 1);
        assert_eq!(parsed.deleted_lines[0].after_line, 0, "anchored before the first line");
    }

    #[test]
    fn test_multiple_hunks() {
        let diff = diff_with_hunk(
            "@@ -1,2 +1,2 @@\n-a\n+A\n b\n@@ -10,2 +10,3 @@\n x\n+y\n z\n",
        );
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.get(&1), Some(&LineChangeType::Modified));
        assert_eq!(parsed.changed_lines.get(&11), Some(&LineChangeType::Added));
    }

    #[test]
    fn test_no_newline_marker_ignored() {
        let diff = diff_with_hunk("@@ -1 +1 @@\n-a\n+b\n\\ No newline at end of file\n");
        let parsed = parse_unified_diff(&diff);
        assert_eq!(parsed.changed_lines.get(&1), Some(&LineChangeType::Modified));
        assert!(parsed.deleted_lines.is_empty());
    }

    #[test]
    fn test_end_of_hunk_flushes_pending() {
        let diff = diff_with_hunk("@@ -1,3 +1,1 @@\n a\n-b\n-c\n");
        let parsed = parse_unified_diff(&diff);
        assert!(parsed.changed_lines.is_empty());
        assert_eq!(parsed.deleted_lines.len(), 2);
        assert_eq!(parsed.deleted_lines[0].content, "b");
        assert_eq!(parsed.deleted_lines[1].content, "c");
    }
}
