//! Mode-button debouncing.
//!
//! `DebounceGate` is a pure state machine over (level, timestamp) edges.
//! `ModeButton` binds it to the shared state and a clock and is what the
//! edge interrupt calls.

use std::sync::Arc;
use std::time::Instant;

use handwheel_traits::{Clock, Level};

use crate::config::DebounceWindow;
use crate::mode::Mode;
use crate::state::SharedState;

/// What a single edge amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Button went down; press start recorded.
    Pressed,
    /// Valid short press on release.
    ShortPress { held_ms: u64 },
    /// Released too early; contact bounce.
    Bounce { held_ms: u64 },
    /// Released too late; a hold with no action.
    LongHold { held_ms: u64 },
    /// Release without a recorded press.
    Orphan,
}

/// Press-duration filter. Level low = pressed (active low with pull-up).
#[derive(Debug, Clone)]
pub struct DebounceGate {
    window: DebounceWindow,
    press_started_ms: Option<u64>,
}

impl DebounceGate {
    pub fn new(window: DebounceWindow) -> Self {
        Self {
            window,
            press_started_ms: None,
        }
    }

    pub fn window(&self) -> DebounceWindow {
        self.window
    }

    /// True while a press is being timed.
    pub fn is_pressed(&self) -> bool {
        self.press_started_ms.is_some()
    }

    /// Feed one edge. A second falling edge without a release restarts timing.
    pub fn on_edge(&mut self, level: Level, now_ms: u64) -> Edge {
        match level {
            Level::Low => {
                self.press_started_ms = Some(now_ms);
                Edge::Pressed
            }
            Level::High => {
                let Some(start) = self.press_started_ms.take() else {
                    return Edge::Orphan;
                };
                let held_ms = now_ms.saturating_sub(start);
                if self.window.accepts(held_ms) {
                    Edge::ShortPress { held_ms }
                } else if held_ms <= self.window.min_ms {
                    Edge::Bounce { held_ms }
                } else {
                    Edge::LongHold { held_ms }
                }
            }
        }
    }
}

/// Edge-interrupt handler for the mode button.
///
/// Owned by the interrupt context; touches the shared state only through
/// single atomic stores, so it may preempt or be preempted by the encoder
/// callback.
pub struct ModeButton<C: Clock> {
    gate: DebounceGate,
    state: Arc<SharedState>,
    clock: C,
    epoch: Instant,
}

impl<C: Clock> ModeButton<C> {
    pub fn new(state: Arc<SharedState>, window: DebounceWindow, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            gate: DebounceGate::new(window),
            state,
            clock,
            epoch,
        }
    }

    /// Handle one pin transition. Returns the new mode when a short press
    /// advanced it.
    pub fn on_level(&mut self, level: Level) -> Option<Mode> {
        let now_ms = self.clock.ms_since(self.epoch);
        let edge = self.gate.on_edge(level, now_ms);
        tracing::trace!(?level, ?edge, "mode button edge");
        match edge {
            Edge::ShortPress { .. } => Some(self.state.advance_mode()),
            _ => None,
        }
    }
}

impl<C: Clock> core::fmt::Debug for ModeButton<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModeButton")
            .field("gate", &self.gate)
            .field("mode", &self.state.mode())
            .finish()
    }
}
