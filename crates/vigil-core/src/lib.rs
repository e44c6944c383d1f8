//! Core diff engine for vigil - live-rewrite file viewer
//!
//! Pure computation only: no I/O, no timers. Three pieces:
//!
//! - [`patch`]: parses the unified git diff for a single file into a
//!   per-line classification of the new file plus anchored deleted lines.
//! - [`diff`]: compares two full-text snapshots of one document at line or
//!   block granularity and locates where they diverge.
//! - [`overlay`]: merges the git classification with an ephemeral
//!   recent-edit set and interleaves virtual deleted rows for display.

pub mod diff;
pub mod overlay;
pub mod patch;

pub use diff::{
    diff_all_lines, diff_at, diff_blocks, diff_lines, AllChanged, ContentDiff, DiffGranularity,
};
pub use overlay::{compose, display_rows, DisplayRow, RowHighlight};
pub use patch::{
    parse_hunks, parse_unified_diff, ChangedLineMap, DeletedLine, DiffLine, DiffLineKind, Hunk,
    LineChangeType, ParsedDiff,
};
