//! Debounced, supersedable git-diff fetching
//!
//! One fetcher per open document. Content edits invalidate the cached diff
//! but the actual round-trip is debounced; at most one logical request is
//! current at a time, and a newer request supersedes older ones by bumping
//! a generation counter so stale responses are silently dropped. Disabling
//! the fetcher (mid-stream) suspends all work and hands back an
//! identity-stable empty state.

use crate::timing::Debouncer;
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use vigil_core::{parse_unified_diff, ChangedLineMap, DeletedLine};

/// JSON wire format of the diff transport
#[derive(Debug, Clone, Deserialize)]
pub struct DiffResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<DiffPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffPayload {
    pub diff: String,
}

/// Outcome of one transport round-trip
#[derive(Debug, Clone)]
pub enum TransportReply {
    /// Unified diff text (possibly empty)
    Diff(String),
    /// No diff available: untracked file, no changes, or not found. This
    /// is a success state, never surfaced as an error.
    NotFound,
    /// Transport-level failure, surfaced to the caller as a string
    Failed(String),
}

impl TransportReply {
    /// Interpret a JSON transport response. `success:false` and 404-style
    /// misses are an absence of diff, not an error.
    pub fn from_json(body: &str) -> Self {
        match serde_json::from_str::<DiffResponse>(body) {
            Ok(response) if response.success => match response.data {
                Some(payload) => Self::Diff(payload.diff),
                None => Self::NotFound,
            },
            Ok(_) => Self::NotFound,
            Err(err) => Self::Failed(format!("malformed diff response: {err}")),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies unified-diff text for `(repo_root, relative_path)`. Runs on the
/// fetch worker thread.
pub trait DiffTransport: Send + 'static {
    fn fetch_diff(&self, repo_root: &Path, relative_path: &Path) -> TransportReply;
}

/// Default transport: asks the local `git` for the worktree diff against
/// the last committed revision.
pub struct GitCliTransport;

impl GitCliTransport {
    fn git_diff(repo_root: &Path, relative_path: &Path) -> Result<String, TransportError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo_root)
            .arg("diff")
            .arg("HEAD")
            .arg("--")
            .arg(relative_path)
            .output()?;

        if !output.status.success() {
            return Err(TransportError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl DiffTransport for GitCliTransport {
    fn fetch_diff(&self, repo_root: &Path, relative_path: &Path) -> TransportReply {
        match Self::git_diff(repo_root, relative_path) {
            Ok(text) => TransportReply::Diff(text),
            // Unborn HEAD is an absence of diff, not an error
            Err(TransportError::CommandFailed(stderr))
                if stderr.contains("unknown revision") || stderr.contains("bad revision") =>
            {
                TransportReply::NotFound
            }
            Err(err) => TransportReply::Failed(err.to_string()),
        }
    }
}

struct FetchRequest {
    generation: u64,
    repo_root: PathBuf,
    relative_path: PathBuf,
}

struct FetchResponse {
    generation: u64,
    reply: TransportReply,
}

/// Result of the latest completed fetch
#[derive(Debug, Clone, Default)]
pub struct DiffState {
    pub changed_lines: ChangedLineMap,
    pub deleted_lines: Vec<DeletedLine>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Debounced fetch orchestration for one document.
pub struct DiffFetcher {
    repo_root: PathBuf,
    /// None when the file is not under the repo root; no request is ever
    /// issued in that case.
    relative_path: Option<PathBuf>,
    debounce: Debouncer,
    generation: u64,
    enabled: bool,
    state: DiffState,
    /// Returned while disabled; one stable allocation so downstream
    /// consumers see the same reference every call.
    disabled_state: DiffState,
    request_tx: mpsc::Sender<FetchRequest>,
    response_rx: mpsc::Receiver<FetchResponse>,
}

impl DiffFetcher {
    /// Spawn the worker and compute the repo-relative path. The worker
    /// exits when the fetcher is dropped.
    pub fn new<T: DiffTransport>(
        repo_root: impl Into<PathBuf>,
        file_path: &Path,
        transport: T,
        debounce_window: Duration,
    ) -> Self {
        let repo_root = repo_root.into();
        let relative_path = file_path
            .strip_prefix(&repo_root)
            .ok()
            .map(Path::to_path_buf);
        if relative_path.is_none() {
            debug!("{} is outside {}; git diff disabled", file_path.display(), repo_root.display());
        }

        let (request_tx, request_rx) = mpsc::channel::<FetchRequest>();
        let (response_tx, response_rx) = mpsc::channel::<FetchResponse>();

        thread::spawn(move || {
            while let Ok(mut request) = request_rx.recv() {
                // Drain to the newest queued request; superseded ones are
                // abandoned without a reply.
                while let Ok(newer) = request_rx.try_recv() {
                    request = newer;
                }
                let reply = transport.fetch_diff(&request.repo_root, &request.relative_path);
                if let TransportReply::Failed(err) = &reply {
                    warn!("diff fetch failed for {}: {err}", request.relative_path.display());
                }
                if response_tx
                    .send(FetchResponse {
                        generation: request.generation,
                        reply,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            repo_root,
            relative_path,
            debounce: Debouncer::new(debounce_window),
            generation: 0,
            enabled: true,
            state: DiffState::default(),
            disabled_state: DiffState::default(),
            request_tx,
            response_rx,
        }
    }

    /// Content changed: schedule a debounced re-fetch.
    pub fn invalidate(&mut self, now: Instant) {
        if !self.enabled || self.relative_path.is_none() {
            return;
        }
        self.debounce.trigger(now);
    }

    /// Suspend or resume fetching. Suspension cancels the pending debounce
    /// and supersedes any in-flight request.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.debounce.cancel();
            self.generation = self.generation.wrapping_add(1);
            self.state.loading = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drive the debounce window and apply any completed responses.
    pub fn tick(&mut self, now: Instant) {
        if !self.enabled {
            return;
        }

        if self.debounce.fire(now) {
            if let Some(relative_path) = &self.relative_path {
                self.generation = self.generation.wrapping_add(1);
                self.state.loading = true;
                let request = FetchRequest {
                    generation: self.generation,
                    repo_root: self.repo_root.clone(),
                    relative_path: relative_path.clone(),
                };
                if self.request_tx.send(request).is_err() {
                    // Worker gone; report it once instead of spinning
                    self.state.loading = false;
                    self.state.error = Some("diff worker unavailable".to_string());
                }
            }
        }

        let responses: Vec<FetchResponse> = self.response_rx.try_iter().collect();
        for response in responses {
            if response.generation != self.generation {
                debug!("dropping superseded diff response (gen {})", response.generation);
                continue;
            }
            self.apply(response.reply);
        }
    }

    fn apply(&mut self, reply: TransportReply) {
        self.state.loading = false;
        match reply {
            TransportReply::Diff(text) => {
                let parsed = parse_unified_diff(&text);
                self.state.changed_lines = parsed.changed_lines;
                self.state.deleted_lines = parsed.deleted_lines;
                self.state.error = None;
            }
            TransportReply::NotFound => {
                self.state.changed_lines = ChangedLineMap::default();
                self.state.deleted_lines = Vec::new();
                self.state.error = None;
            }
            TransportReply::Failed(message) => {
                self.state.changed_lines = ChangedLineMap::default();
                self.state.deleted_lines = Vec::new();
                self.state.error = Some(message);
            }
        }
    }

    /// Current result. While disabled this is the same empty value on
    /// every call.
    pub fn state(&self) -> &DiffState {
        if self.enabled {
            &self.state
        } else {
            &self.disabled_state
        }
    }

    /// Document switch: drop all cached results and supersede anything in
    /// flight.
    pub fn reset(&mut self) {
        self.debounce.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.state = DiffState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Transport that replies with a fixed JSON body, exercising the wire
    /// format path.
    struct JsonTransport(String);

    impl DiffTransport for JsonTransport {
        fn fetch_diff(&self, _repo_root: &Path, _relative_path: &Path) -> TransportReply {
            TransportReply::from_json(&self.0)
        }
    }

    struct FailingTransport;

    impl DiffTransport for FailingTransport {
        fn fetch_diff(&self, _repo_root: &Path, _relative_path: &Path) -> TransportReply {
            TransportReply::Failed("HTTP 500".to_string())
        }
    }

    const WINDOW: Duration = Duration::from_millis(600);

    fn fetcher_with<T: DiffTransport>(transport: T) -> DiffFetcher {
        DiffFetcher::new("/repo", Path::new("/repo/src/main.rs"), transport, WINDOW)
    }

    /// Tick until the in-flight request completes (the worker is a real
    /// thread, so drain with a bounded wait).
    fn settle(fetcher: &mut DiffFetcher, after: Instant) {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            fetcher.tick(after);
            if !fetcher.state().loading {
                return;
            }
            assert!(Instant::now() < deadline, "fetch did not settle in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_from_json_success() {
        let reply = TransportReply::from_json(
            r#"{"success": true, "data": {"diff": "@@ -1 +1 @@\n-a\n+b\n"}}"#,
        );
        assert!(matches!(reply, TransportReply::Diff(ref text) if text.starts_with("@@")));
    }

    #[test]
    fn test_from_json_failure_is_not_found() {
        assert!(matches!(
            TransportReply::from_json(r#"{"success": false, "error": "no diff"}"#),
            TransportReply::NotFound
        ));
        assert!(matches!(
            TransportReply::from_json(r#"{"success": true}"#),
            TransportReply::NotFound
        ));
    }

    #[test]
    fn test_from_json_garbage_fails() {
        assert!(matches!(
            TransportReply::from_json("<html>504</html>"),
            TransportReply::Failed(_)
        ));
    }

    #[test]
    fn test_successful_fetch_populates_maps() {
        let body = r#"{"success": true, "data": {"diff": "@@ -1,2 +1,2 @@\n-a\n+A\n b\n"}}"#;
        let mut fetcher = fetcher_with(JsonTransport(body.to_string()));
        let base = Instant::now();

        fetcher.invalidate(base);
        assert!(fetcher.state().changed_lines.is_empty(), "nothing before debounce fires");
        settle(&mut fetcher, base + WINDOW);

        assert_eq!(fetcher.state().changed_lines.len(), 1);
        assert!(fetcher.state().error.is_none());
    }

    #[test]
    fn test_success_false_is_empty_without_error() {
        let body = r#"{"success": false}"#;
        let mut fetcher = fetcher_with(JsonTransport(body.to_string()));
        let base = Instant::now();

        fetcher.invalidate(base);
        settle(&mut fetcher, base + WINDOW);

        assert!(fetcher.state().changed_lines.is_empty());
        assert!(fetcher.state().deleted_lines.is_empty());
        assert!(fetcher.state().error.is_none(), "absence of diff is a success state");
    }

    #[test]
    fn test_transport_failure_surfaces_error_and_clears_maps() {
        let mut fetcher = fetcher_with(FailingTransport);
        let base = Instant::now();

        fetcher.invalidate(base);
        settle(&mut fetcher, base + WINDOW);

        assert!(fetcher.state().changed_lines.is_empty());
        assert_eq!(fetcher.state().error.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_debounce_coalesces_invalidations() {
        let body = r#"{"success": true, "data": {"diff": ""}}"#;
        let mut fetcher = fetcher_with(JsonTransport(body.to_string()));
        let base = Instant::now();

        fetcher.invalidate(base);
        fetcher.invalidate(base + Duration::from_millis(500));
        fetcher.tick(base + WINDOW);
        assert!(
            fetcher.debounce.pending(),
            "second invalidation inside the window postponed the fetch"
        );
    }

    #[test]
    fn test_file_outside_repo_root_never_fetches() {
        let mut fetcher = DiffFetcher::new(
            "/repo",
            Path::new("/elsewhere/main.rs"),
            FailingTransport,
            WINDOW,
        );
        let base = Instant::now();

        fetcher.invalidate(base);
        fetcher.tick(base + WINDOW);

        assert!(!fetcher.state().loading);
        assert!(fetcher.state().changed_lines.is_empty());
        assert!(fetcher.state().error.is_none());
    }

    #[test]
    fn test_disabled_fetcher_is_inert_and_identity_stable() {
        let mut fetcher = fetcher_with(FailingTransport);
        fetcher.set_enabled(false);
        let base = Instant::now();

        fetcher.invalidate(base);
        fetcher.tick(base + WINDOW);

        let first = fetcher.state() as *const DiffState;
        let second = fetcher.state() as *const DiffState;
        assert_eq!(first, second, "same reference on every call while disabled");
        assert!(fetcher.state().changed_lines.is_empty());
        assert!(fetcher.state().error.is_none());
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let body = r#"{"success": true, "data": {"diff": "@@ -1 +1 @@\n-a\n+b\n"}}"#;
        let mut fetcher = fetcher_with(JsonTransport(body.to_string()));
        let base = Instant::now();

        fetcher.invalidate(base);
        fetcher.tick(base + WINDOW); // request sent
        fetcher.reset(); // supersedes it

        // Give the worker time to reply, then drain: the stale response
        // must not repopulate the cleared state.
        thread::sleep(Duration::from_millis(50));
        fetcher.tick(base + WINDOW + Duration::from_millis(100));
        assert!(fetcher.state().changed_lines.is_empty(), "stale reply swallowed");
    }
}
