//! Status-line rendering and the dirty-flag lifecycle.

use std::sync::Arc;

use handwheel_traits::{Display, Encoder, StepIncrement};

use crate::config::Layout;
use crate::error::HandwheelError;
use crate::hw_error::{Peripheral, map_hw_error};
use crate::mode::{Mode, apply_enable_gate};
use crate::state::SharedState;

/// Label for a raw step increment: 1 -> "x0.01mm", 10 -> "x0.1mm", anything else -> "x1.0mm".
pub fn step_label(raw: u16) -> &'static str {
    match StepIncrement::from_raw(raw) {
        StepIncrement::Hundredth => "x0.01mm",
        StepIncrement::Tenth => "x0.1mm",
        StepIncrement::Whole => "x1.0mm",
    }
}

/// What one redraw showed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redraw {
    pub mode: Mode,
    pub increment: u16,
    /// Encoder enable state applied by this redraw.
    pub encoder_enabled: bool,
    /// First failure of this redraw, if any. The dirty flag is cleared either way.
    pub error: Option<HandwheelError>,
}

/// Redraw counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawCounters {
    pub redraws: u64,
    pub failures: u64,
}

/// Draws mode and step size on the status line when something changed.
///
/// Main loop only: a flush blocks for tens of milliseconds.
pub struct DisplayPresenter<D: Display> {
    display: D,
    state: Arc<SharedState>,
    layout: Layout,
    last_increment: Option<u16>,
    counters: RedrawCounters,
}

impl<D: Display> DisplayPresenter<D> {
    pub fn new(display: D, state: Arc<SharedState>, layout: Layout) -> Self {
        Self {
            display,
            state,
            layout,
            last_increment: None,
            counters: RedrawCounters::default(),
        }
    }

    pub fn counters(&self) -> RedrawCounters {
        self.counters
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Redraw if the dirty flag is set or the increment moved since the last
    /// redraw; otherwise do nothing.
    ///
    /// The dirty flag is cleared before the state is read, so an update that
    /// lands during the (slow) flush sets it again and is drawn next time.
    pub fn refresh<E: Encoder + ?Sized>(&mut self, encoder: &mut E) -> Option<Redraw> {
        let dirty = self.state.take_dirty();
        let increment = self.state.step_increment();
        if !dirty && self.last_increment == Some(increment) {
            return None;
        }
        self.last_increment = Some(increment);
        let mode = self.state.mode();

        let mut error = self.draw_status(increment, mode).err();

        // The gate is policy, not presentation: apply it even if drawing failed.
        let encoder_enabled = match apply_enable_gate(encoder, mode) {
            Ok(on) => on,
            Err(e) => {
                let err = map_hw_error(Peripheral::Encoder, &*e);
                tracing::warn!(error = %err, ?mode, "encoder enable failed");
                error.get_or_insert(err);
                false
            }
        };

        if error.is_none()
            && let Err(e) = self.display.flush()
        {
            error = Some(map_hw_error(Peripheral::Display, &*e));
        }

        self.counters.redraws += 1;
        if let Some(err) = &error {
            self.counters.failures += 1;
            tracing::warn!(error = %err, "redraw failed; waiting for next change");
        } else {
            tracing::debug!(?mode, increment, encoder_enabled, "redraw");
        }
        Some(Redraw {
            mode,
            increment,
            encoder_enabled,
            error,
        })
    }

    fn draw_status(&mut self, increment: u16, mode: Mode) -> Result<(), HandwheelError> {
        let line = self.layout.status_line;
        let map = |e: Box<dyn std::error::Error + Send + Sync>| map_hw_error(Peripheral::Display, &*e);
        self.display.clear().map_err(map)?;
        self.display
            .text(step_label(increment), self.layout.step_x, line)
            .map_err(map)?;
        self.display
            .text(mode.label(), self.layout.mode_x, line)
            .map_err(map)?;
        Ok(())
    }

    /// Show the start-up splash. Called once before the loop starts.
    pub fn splash(&mut self, text: &str) -> Result<(), HandwheelError> {
        let map = |e: Box<dyn std::error::Error + Send + Sync>| map_hw_error(Peripheral::Display, &*e);
        self.display.clear().map_err(map)?;
        self.display
            .text(text, self.layout.splash_x, self.layout.splash_y)
            .map_err(map)?;
        self.display.flush().map_err(map)?;
        tracing::info!(text, "splash shown");
        Ok(())
    }
}
