//! Content-version diffing
//!
//! Positional comparison of two full-text snapshots of one document, at
//! line granularity for source code and block granularity for prose. This
//! is not an edit-script diff: it locates the first (or all) positions
//! where the versions diverge, which is what live streaming highlights and
//! scroll following need.

use crate::patch::LineChangeType;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Unit of comparison, selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffGranularity {
    /// Per-line comparison (source code)
    #[default]
    Line,
    /// Per-block comparison (prose/markdown, blank-line separated)
    Block,
}

impl DiffGranularity {
    /// Prose extensions diff per block; everything else per line. The path
    /// is not otherwise interpreted.
    pub fn for_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" | "mdx" | "txt" | "rst" | "adoc" => Self::Block,
            _ => Self::Line,
        }
    }
}

/// Location of the first divergence between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentDiff {
    /// 1-based index of the first changed line/block; `None` = identical
    pub first_changed: Option<usize>,
    /// Line/block count of the new snapshot
    pub total: usize,
    /// True when the change grows the document at that position
    pub is_addition: bool,
    /// Approximate char offset of the change (block granularity only);
    /// accumulates `len + 2` per unchanged leading block
    pub char_offset: usize,
}

impl ContentDiff {
    fn identical(total: usize) -> Self {
        Self {
            first_changed: None,
            total,
            is_addition: false,
            char_offset: 0,
        }
    }
}

/// Every changed new-snapshot index, for live fade highlighting
#[derive(Debug, Clone, Default)]
pub struct AllChanged {
    pub changed: FxHashMap<usize, LineChangeType>,
    pub total: usize,
}

impl AllChanged {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

fn normalize(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Find the first line where `new` diverges from `old`.
pub fn diff_lines(old: &str, new: &str) -> ContentDiff {
    let old = normalize(old);
    let new = normalize(new);
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    compare_positional(&old_lines, &new_lines, false)
}

/// Collect every line where `new` diverges from `old`. An empty `old`
/// classifies everything as `Added` (there is no prior content to modify),
/// as do indices beyond the old snapshot's length.
pub fn diff_all_lines(old: &str, new: &str) -> AllChanged {
    let old = normalize(old);
    let new = normalize(new);
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let old_is_empty = old.is_empty();

    let mut changed = FxHashMap::default();
    for (i, line) in new_lines.iter().enumerate() {
        let differs = match old_lines.get(i) {
            Some(old_line) => old_line != line,
            None => true,
        };
        if !differs {
            continue;
        }
        let kind = if old_is_empty || i >= old_lines.len() {
            LineChangeType::Added
        } else {
            LineChangeType::Modified
        };
        changed.insert(i + 1, kind);
    }

    AllChanged {
        changed,
        total: new_lines.len(),
    }
}

/// Find the first block where `new` diverges from `old`. Blocks are
/// blank-line separated, except that fenced code (``` or ~~~) suppresses
/// splitting until the closing fence.
pub fn diff_blocks(old: &str, new: &str) -> ContentDiff {
    let old = normalize(old);
    let new = normalize(new);
    let old_blocks = split_blocks(&old);
    let new_blocks = split_blocks(&new);
    let old_refs: Vec<&str> = old_blocks.iter().map(String::as_str).collect();
    let new_refs: Vec<&str> = new_blocks.iter().map(String::as_str).collect();
    compare_positional(&old_refs, &new_refs, true)
}

/// Dispatch to [`diff_lines`] or [`diff_blocks`] per granularity.
pub fn diff_at(granularity: DiffGranularity, old: &str, new: &str) -> ContentDiff {
    match granularity {
        DiffGranularity::Line => diff_lines(old, new),
        DiffGranularity::Block => diff_blocks(old, new),
    }
}

/// Shared prefix/truncation/growth logic for lines and blocks.
fn compare_positional(old: &[&str], new: &[&str], track_offset: bool) -> ContentDiff {
    let total = new.len();
    let common = old.len().min(new.len());
    let mut char_offset = 0usize;

    for i in 0..common {
        if old[i] != new[i] {
            return ContentDiff {
                first_changed: Some(i + 1),
                total,
                is_addition: new[i].len() > old[i].len(),
                char_offset,
            };
        }
        if track_offset {
            char_offset += new[i].len() + 2;
        }
    }

    if old.len() > new.len() {
        // Content was truncated at the end
        return ContentDiff {
            first_changed: Some(total.max(1)),
            total,
            is_addition: false,
            char_offset,
        };
    }
    if new.len() > old.len() {
        return ContentDiff {
            first_changed: Some(old.len() + 1),
            total,
            is_addition: true,
            char_offset,
        };
    }

    ContentDiff::identical(total)
}

/// Split into blank-line separated blocks, keeping fenced code intact.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in text.split('\n') {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            current.push(line);
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(&trimmed[..3]);
            current.push(line);
            continue;
        }

        if trimmed.is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}
