//! Per-document session
//!
//! One session per open document owns every piece of mutable state the
//! engine needs: the previous streamed snapshot, the recent-edit fade set,
//! the diff fetcher and the scroll controller. Nothing is shared across
//! documents; `reset()` synchronously discards all of it, and dropping the
//! session shuts the fetch worker down.

use crate::config::Config;
use crate::fetch::{DiffFetcher, DiffTransport};
use crate::recent::RecentEdits;
use crate::scroll::{AutoScrollController, Locator, ScrollPhase};
use anyhow::ensure;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use vigil_core::{
    compose, diff_all_lines, diff_blocks, display_rows, ContentDiff, DiffGranularity, DisplayRow,
    RowHighlight,
};

pub struct DocumentSession {
    path: PathBuf,
    granularity: DiffGranularity,
    /// Previous streamed frame, for recent-edit diffing
    previous: Option<String>,
    recent: RecentEdits,
    fetcher: DiffFetcher,
    scroll: AutoScrollController,
    streaming: bool,
}

impl DocumentSession {
    /// Open a session for one document. `path` must be absolute so the
    /// repo-relative path can be derived from `repo_root`.
    pub fn open<T: DiffTransport>(
        repo_root: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        transport: T,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let path = path.into();
        ensure!(path.is_absolute(), "document path must be absolute: {}", path.display());

        let granularity = DiffGranularity::for_path(&path.to_string_lossy());
        let fetcher = DiffFetcher::new(repo_root, &path, transport, config.fetch_debounce());
        let scroll = AutoScrollController::new(granularity, config.scroll_settings());

        Ok(Self {
            path,
            granularity,
            previous: None,
            recent: RecentEdits::new(config.fade_ttl()),
            fetcher,
            scroll,
            streaming: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn granularity(&self) -> DiffGranularity {
        self.granularity
    }

    /// Feed one content frame from the file watcher.
    pub fn update(
        &mut self,
        current: &str,
        is_streaming: bool,
        now: Instant,
        locator: &mut dyn Locator,
    ) {
        // Suspend git-diff churn mid-stream; re-fetch once the stream ends
        if is_streaming != self.streaming {
            self.fetcher.set_enabled(!is_streaming);
            if !is_streaming {
                self.fetcher.invalidate(now);
            }
            self.streaming = is_streaming;
        }

        let previous = self.previous.as_deref().unwrap_or("");
        let skip_artifact = current.is_empty() && !previous.is_empty();
        if !skip_artifact && current != previous {
            match self.granularity {
                DiffGranularity::Line => {
                    let batch = diff_all_lines(previous, current);
                    self.recent.record(&batch, now);
                }
                DiffGranularity::Block => {
                    if let Some(index) = diff_blocks(previous, current).first_changed {
                        self.recent.record_index(index, now);
                    }
                }
            }
            self.previous = Some(current.to_string());
            self.fetcher.invalidate(now);
        }

        self.scroll.update(current, is_streaming, now, locator);
    }

    /// Drive all pending timers: debounced fetch, highlight fade, scroll.
    pub fn tick(&mut self, now: Instant, locator: &mut dyn Locator) {
        self.fetcher.tick(now);
        self.recent.tick(now);
        self.scroll.tick(now, locator);
    }

    /// Per-row annotations merging git classification with the fading
    /// recent-edit set.
    pub fn annotations(&self) -> FxHashMap<usize, RowHighlight> {
        compose(&self.fetcher.state().changed_lines, self.recent.active())
    }

    /// Display sequence for the latest frame, with virtual deleted rows
    /// interleaved at their anchors.
    pub fn display_rows(&self) -> Vec<DisplayRow> {
        let line_count = self
            .previous
            .as_deref()
            .map(|text| text.split('\n').count())
            .unwrap_or(0);
        display_rows(line_count, &self.fetcher.state().deleted_lines)
    }

    pub fn diff_loading(&self) -> bool {
        self.fetcher.state().loading
    }

    pub fn diff_error(&self) -> Option<&str> {
        self.fetcher.state().error.as_deref()
    }

    /// Latest known change location (with the approximate char offset for
    /// block-granularity consumers).
    pub fn last_change(&self) -> Option<ContentDiff> {
        self.scroll.last_change()
    }

    pub fn scroll_phase(&self) -> ScrollPhase {
        self.scroll.phase()
    }

    pub fn notify_user_scroll(&mut self, now: Instant) {
        self.scroll.notify_user_scroll(now);
    }

    pub fn reset_user_scroll(&mut self) {
        self.scroll.reset_user_scroll();
    }

    pub fn scroll_to_change(&mut self, now: Instant, locator: &mut dyn Locator) {
        self.scroll.scroll_to_change(now, locator);
    }

    /// Document switch: discard the previous snapshot, the fade set and
    /// timer, the user-scroll flag and any in-flight fetch. Cross-file
    /// leakage of any of these is an invariant violation.
    pub fn reset(&mut self) {
        self.previous = None;
        self.streaming = false;
        self.recent.clear();
        self.fetcher.reset();
        self.fetcher.set_enabled(true);
        self.scroll.reset();
    }
}
