//! Highlight composition
//!
//! Merges the committed-diff classification with the ephemeral recent-edit
//! set into one annotation per row, and materializes the display sequence
//! with virtual deleted rows interleaved at their anchors. Both highlight
//! sources render together (background color + accent border); neither
//! replaces the other.

use crate::patch::{ChangedLineMap, DeletedLine, LineChangeType};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Annotation for one display row; both fields may be set at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowHighlight {
    /// Classification relative to the last committed revision
    pub git: Option<LineChangeType>,
    /// Changed by the most recent streamed update (time-limited)
    pub recent_edit: bool,
}

/// One row of the materialized display sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRow {
    /// A real line/block of the current content (1-based index)
    Content { index: usize },
    /// A virtual placeholder for a line removed since the last commit
    Deleted { content: String },
}

/// Merge git-diff and recent-edit highlights per row index.
pub fn compose(
    git: &ChangedLineMap,
    recent: &FxHashSet<usize>,
) -> FxHashMap<usize, RowHighlight> {
    let mut rows: FxHashMap<usize, RowHighlight> = FxHashMap::default();

    for (&index, &kind) in git {
        rows.entry(index).or_default().git = Some(kind);
    }
    for &index in recent {
        rows.entry(index).or_default().recent_edit = true;
    }

    rows
}

/// Interleave virtual deleted rows into the content sequence. Anchors at 0
/// sit before the first line; anchors past `line_count` collect at the end.
/// Multiple deletions at one anchor keep their original (oldest-first)
/// order.
pub fn display_rows(line_count: usize, deleted: &[DeletedLine]) -> Vec<DisplayRow> {
    let mut by_anchor: FxHashMap<usize, Vec<&DeletedLine>> = FxHashMap::default();
    for line in deleted {
        by_anchor.entry(line.after_line.min(line_count)).or_default().push(line);
    }

    let mut rows = Vec::with_capacity(line_count + deleted.len());
    for anchor in 0..=line_count {
        if anchor > 0 {
            rows.push(DisplayRow::Content { index: anchor });
        }
        if let Some(lines) = by_anchor.get(&anchor) {
            for line in lines {
                rows.push(DisplayRow::Deleted {
                    content: line.content.clone(),
                });
            }
        }
    }

    rows
}
