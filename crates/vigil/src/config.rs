//! Configuration file support for vigil
//!
//! Config file location: `~/.config/vigil/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [fetch]
//! debounce_ms = 600
//!
//! [scroll]
//! debounce_ms = 100
//! echo_window_ms = 200
//! bottom_buffer_px = 32.0
//! scroll_to_bottom_on_open = false
//! tail_threshold = 0.9
//!
//! [highlight]
//! fade_ms = 2500
//! ```
//!
//! A missing or unparseable file falls back to the defaults above.

use crate::scroll::ScrollSettings;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub scroll: ScrollConfig,
    pub highlight: HighlightConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Quiet window between a content change and the git-diff round-trip
    pub debounce_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { debounce_ms: 600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub debounce_ms: u64,
    /// Scroll events this close after our own scroll count as echo
    pub echo_window_ms: u64,
    pub bottom_buffer_px: f64,
    pub scroll_to_bottom_on_open: bool,
    /// Fraction of the document past which an append jumps to the end
    pub tail_threshold: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            echo_window_ms: 200,
            bottom_buffer_px: 32.0,
            scroll_to_bottom_on_open: false,
            tail_threshold: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Recent-edit highlight time-to-live
    pub fade_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { fade_ms: 2500 }
    }
}

impl Config {
    /// Load from the XDG config dir, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring malformed {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn fetch_debounce(&self) -> Duration {
        Duration::from_millis(self.fetch.debounce_ms)
    }

    pub fn fade_ttl(&self) -> Duration {
        Duration::from_millis(self.highlight.fade_ms)
    }

    pub fn scroll_settings(&self) -> ScrollSettings {
        ScrollSettings {
            debounce: Duration::from_millis(self.scroll.debounce_ms),
            echo_window: Duration::from_millis(self.scroll.echo_window_ms),
            bottom_buffer_px: self.scroll.bottom_buffer_px,
            scroll_to_bottom_on_open: self.scroll.scroll_to_bottom_on_open,
            tail_threshold: self.scroll.tail_threshold,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("vigil").join("config.toml"))
}
