//! `From` implementations bridging `handwheel_config` types to `handwheel_core` types.

use crate::config::{DebounceWindow, Layout, Timing};

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&handwheel_config::TimingCfg> for Timing {
    fn from(c: &handwheel_config::TimingCfg) -> Self {
        Self {
            bus_poll_us: c.bus_poll_us,
            heartbeat_us: c.heartbeat_us,
            debounce: DebounceWindow {
                min_ms: c.debounce_min_ms,
                max_ms: c.debounce_max_ms,
            },
        }
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

impl From<&handwheel_config::DisplayCfg> for Layout {
    fn from(c: &handwheel_config::DisplayCfg) -> Self {
        // Label columns and the splash position are fixed by the panel artwork;
        // only the status line moves with the panel height.
        Self {
            status_line: c.status_line,
            ..Self::default()
        }
    }
}
