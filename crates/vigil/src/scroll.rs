//! Viewport auto-scroll
//!
//! A small state machine that follows the edit point of a streamed
//! document without fighting the user's own scrolling. The rendering
//! surface is reached only through the [`Locator`] capability, so the
//! whole machine is testable against an in-memory fake.

use crate::timing::Debouncer;
use std::time::{Duration, Instant};
use vigil_core::{diff_at, ContentDiff, DiffGranularity};

/// Axis-aligned bounding box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Rect {
    /// Vertical containment is what decides scrolling; rect comparison
    /// stays correct under non-100% zoom where scrollTop arithmetic does
    /// not.
    pub fn contains_vertically(&self, other: &Rect) -> bool {
        other.top >= self.top && other.bottom <= self.bottom
    }
}

/// Where to place an element when scrolling it into view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Start,
    Center,
    End,
}

/// Opaque element handle minted by the rendering surface
pub type ElementId = usize;

/// The rendering surface's capability to map a logical row index to
/// concrete geometry and move the viewport.
pub trait Locator {
    fn find_element(&self, index: usize) -> Option<ElementId>;
    fn container_rect(&self) -> Rect;
    fn element_rect(&self, element: ElementId) -> Option<Rect>;
    fn scroll_height(&self) -> f64;
    fn scroll_to(&mut self, position: f64, smooth: bool);
    fn scroll_into_view(&mut self, element: ElementId, alignment: Alignment);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollPhase {
    /// No previous snapshot yet
    #[default]
    Idle,
    /// Actively diffing and allowed to scroll
    Tracking,
    /// User scrolled; auto-scroll suspended
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct ScrollSettings {
    /// Quiet window coalescing content-update bursts
    pub debounce: Duration,
    /// Scroll events this close after a programmatic scroll are our own
    /// echo, not the user
    pub echo_window: Duration,
    /// Extra pixels past the end to absorb zoom/font-scale rounding
    pub bottom_buffer_px: f64,
    /// One-time scroll-to-bottom on the first frame
    pub scroll_to_bottom_on_open: bool,
    /// Fraction of the document past which a pure addition counts as
    /// tail-appending
    pub tail_threshold: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            echo_window: Duration::from_millis(200),
            bottom_buffer_px: 32.0,
            scroll_to_bottom_on_open: false,
            tail_threshold: 0.9,
        }
    }
}

/// Decides, per content update, whether and where to scroll.
pub struct AutoScrollController {
    granularity: DiffGranularity,
    settings: ScrollSettings,
    phase: ScrollPhase,
    /// Snapshot the next diff compares against
    previous: Option<String>,
    /// Latest content waiting out the debounce window
    pending: Option<String>,
    debounce: Debouncer,
    streaming: bool,
    /// Streaming has stopped since the interruption (restart re-enables)
    stream_stopped: bool,
    last_programmatic_scroll: Option<Instant>,
    /// Latest known change location, for the forced-jump escape hatch
    last_change: Option<ContentDiff>,
}

impl AutoScrollController {
    pub fn new(granularity: DiffGranularity, settings: ScrollSettings) -> Self {
        let debounce = Debouncer::new(settings.debounce);
        Self {
            granularity,
            settings,
            phase: ScrollPhase::Idle,
            previous: None,
            pending: None,
            debounce,
            streaming: false,
            stream_stopped: false,
            last_programmatic_scroll: None,
            last_change: None,
        }
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn last_change(&self) -> Option<ContentDiff> {
        self.last_change
    }

    /// Feed one content frame. Scrolling happens later, from [`tick`],
    /// once the debounce window has quieted.
    ///
    /// [`tick`]: Self::tick
    pub fn update(
        &mut self,
        current: &str,
        is_streaming: bool,
        now: Instant,
        locator: &mut dyn Locator,
    ) {
        if !is_streaming && self.streaming {
            self.stream_stopped = true;
        }
        if is_streaming
            && !self.streaming
            && self.phase == ScrollPhase::Interrupted
            && self.stream_stopped
        {
            // Streaming stopped and restarted: the interruption is over
            self.phase = ScrollPhase::Tracking;
            self.stream_stopped = false;
        }
        self.streaming = is_streaming;

        // First frame: store the snapshot, optionally jump to the bottom
        if self.previous.is_none() {
            if self.settings.scroll_to_bottom_on_open {
                self.last_programmatic_scroll = Some(now);
                let bottom = locator.scroll_height() + self.settings.bottom_buffer_px;
                locator.scroll_to(bottom, false);
            }
            self.previous = Some(current.to_string());
            self.phase = ScrollPhase::Tracking;
            return;
        }

        let reference = self
            .pending
            .as_deref()
            .or(self.previous.as_deref())
            .unwrap_or("");

        // Transient write artifact: a momentarily empty file must not
        // poison the diff chain
        if current.is_empty() && !reference.is_empty() {
            return;
        }
        if current == reference {
            return;
        }

        self.pending = Some(current.to_string());
        self.debounce.trigger(now);
    }

    /// Drive the debounce window; computes the diff and scrolls when a
    /// burst has quieted.
    pub fn tick(&mut self, now: Instant, locator: &mut dyn Locator) {
        if !self.debounce.fire(now) {
            return;
        }
        let Some(current) = self.pending.take() else {
            return;
        };

        let previous = self.previous.take().unwrap_or_default();
        let diff = diff_at(self.granularity, &previous, &current);
        self.previous = Some(current);

        let Some(index) = diff.first_changed else {
            return;
        };
        self.last_change = Some(diff);

        if !self.streaming || self.phase != ScrollPhase::Tracking {
            return;
        }
        self.scroll_to_location(index, &diff, now, locator);
    }

    /// A scroll event from the surface. Within the echo window after our
    /// own scroll it is ignored; later it means the user took over.
    pub fn notify_user_scroll(&mut self, now: Instant) {
        if self.phase != ScrollPhase::Tracking {
            return;
        }
        let is_echo = self
            .last_programmatic_scroll
            .map(|at| now.duration_since(at) < self.settings.echo_window)
            .unwrap_or(false);
        if !is_echo {
            self.phase = ScrollPhase::Interrupted;
        }
    }

    /// Clear a user interruption and resume following.
    pub fn reset_user_scroll(&mut self) {
        if self.phase == ScrollPhase::Interrupted {
            self.phase = ScrollPhase::Tracking;
        }
    }

    /// Force an immediate jump to the latest known change location,
    /// regardless of phase or streaming state.
    pub fn scroll_to_change(&mut self, now: Instant, locator: &mut dyn Locator) {
        if let Some(diff) = self.last_change {
            if let Some(index) = diff.first_changed {
                self.scroll_to_location(index, &diff, now, locator);
            }
        }
    }

    /// Document switch: discard every cached piece of state.
    pub fn reset(&mut self) {
        self.phase = ScrollPhase::Idle;
        self.previous = None;
        self.pending = None;
        self.debounce.cancel();
        self.streaming = false;
        self.stream_stopped = false;
        self.last_programmatic_scroll = None;
        self.last_change = None;
    }

    fn scroll_to_location(
        &mut self,
        index: usize,
        diff: &ContentDiff,
        now: Instant,
        locator: &mut dyn Locator,
    ) {
        let total = diff.total.max(1);

        // Generation is appending: jump to the end
        if diff.is_addition && index as f64 >= total as f64 * self.settings.tail_threshold {
            self.last_programmatic_scroll = Some(now);
            let bottom = locator.scroll_height() + self.settings.bottom_buffer_px;
            locator.scroll_to(bottom, true);
            return;
        }

        if let Some(element) = locator.find_element(index) {
            if let Some(rect) = locator.element_rect(element) {
                if !locator.container_rect().contains_vertically(&rect) {
                    self.last_programmatic_scroll = Some(now);
                    locator.scroll_into_view(element, Alignment::Center);
                }
                return;
            }
        }

        // Locator miss: percentage fallback
        let ratio = (index as f64 / total as f64).max(0.5);
        self.last_programmatic_scroll = Some(now);
        locator.scroll_to(locator.scroll_height() * ratio, true);
    }
}
