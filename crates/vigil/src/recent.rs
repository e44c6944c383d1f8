//! Recent-edit highlight set
//!
//! Tracks which line/block indices the most recent streamed frame changed.
//! Membership has a time-to-live: a new non-empty batch replaces both the
//! set and the outstanding fade deadline; switching documents clears
//! everything immediately.

use crate::timing::FadeTimer;
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};
use vigil_core::AllChanged;

pub struct RecentEdits {
    indices: FxHashSet<usize>,
    fade: FadeTimer,
}

impl RecentEdits {
    pub fn new(ttl: Duration) -> Self {
        Self {
            indices: FxHashSet::default(),
            fade: FadeTimer::new(ttl),
        }
    }

    /// Replace the set with a new batch of changed line indices and re-arm
    /// the fade. Empty batches are ignored so an unchanged frame does not
    /// wipe a still-fading highlight.
    pub fn record(&mut self, batch: &AllChanged, now: Instant) {
        if batch.is_empty() {
            return;
        }
        self.indices = batch.changed.keys().copied().collect();
        self.fade.arm(now);
    }

    /// Replace the set with a single changed index (block granularity).
    pub fn record_index(&mut self, index: usize, now: Instant) {
        self.indices.clear();
        self.indices.insert(index);
        self.fade.arm(now);
    }

    /// Drop the set once the fade deadline passes.
    pub fn tick(&mut self, now: Instant) {
        if self.fade.expired(now) {
            self.indices.clear();
        }
    }

    pub fn active(&self) -> &FxHashSet<usize> {
        &self.indices
    }

    /// Document switch: clear the set and cancel the pending fade.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.fade.cancel();
    }
}
