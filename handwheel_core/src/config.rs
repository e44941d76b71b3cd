//! Runtime configuration types for the controller.
//!
//! These are the structs the scheduler and handlers use. They are separate
//! from the TOML-deserialized config in `handwheel_config`.

/// Open interval (min_ms, max_ms) a press must last to count as a short press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindow {
    /// Presses this short or shorter are contact bounce.
    pub min_ms: u64,
    /// Presses this long or longer are unintended holds.
    pub max_ms: u64,
}

impl DebounceWindow {
    /// True iff `min_ms < held_ms < max_ms`.
    #[inline]
    pub fn accepts(&self, held_ms: u64) -> bool {
        held_ms > self.min_ms && held_ms < self.max_ms
    }
}

impl Default for DebounceWindow {
    fn default() -> Self {
        Self {
            min_ms: 100,
            max_ms: 500,
        }
    }
}

/// Timing gates of the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Minimum spacing between bus polls (µs).
    pub bus_poll_us: u64,
    /// Heartbeat toggle period (µs).
    pub heartbeat_us: u64,
    pub debounce: DebounceWindow,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            bus_poll_us: 500,
            heartbeat_us: 500_000,
            debounce: DebounceWindow::default(),
        }
    }
}

/// Where the presenter draws on the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Baseline of the status line.
    pub status_line: i32,
    /// Column of the step-size label.
    pub step_x: i32,
    /// Column of the mode label.
    pub mode_x: i32,
    /// Position of the splash text.
    pub splash_x: i32,
    pub splash_y: i32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            status_line: 48,
            step_x: 1,
            mode_x: 72,
            splash_x: 35,
            splash_y: 30,
        }
    }
}
