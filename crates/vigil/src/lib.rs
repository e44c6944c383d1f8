//! vigil - live-rewrite viewer engine
//!
//! Orchestration over the [`vigil_core`] diff engine for files whose
//! content is being rewritten live: debounced git-diff fetching with
//! supersedable requests, time-limited recent-edit highlights, and a
//! user-aware auto-scroll state machine. One [`DocumentSession`] per open
//! document ties it all together; the rendering surface plugs in through
//! the [`Locator`] capability.

pub mod config;
pub mod fetch;
pub mod recent;
pub mod scroll;
pub mod session;
pub mod timing;

pub use config::Config;
pub use fetch::{DiffFetcher, DiffState, DiffTransport, GitCliTransport, TransportReply};
pub use recent::RecentEdits;
pub use scroll::{Alignment, AutoScrollController, ElementId, Locator, Rect, ScrollPhase, ScrollSettings};
pub use session::DocumentSession;
pub use timing::{Debouncer, FadeTimer};

pub use vigil_core::{
    ContentDiff, DiffGranularity, DisplayRow, LineChangeType, RowHighlight,
};
