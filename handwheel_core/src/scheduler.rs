//! The cooperative main loop.
//!
//! Each iteration checks three independent gates and runs whatever is due,
//! in a fixed order: bus poll, display, heartbeat. Bus servicing has the
//! tightest external deadline, so it always goes first. The loop never
//! sleeps or blocks waiting; its rate is set by the gate checks plus
//! whichever action fired.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use handwheel_traits::clock::Clock;
use handwheel_traits::{BusTransport, Display, Encoder, StatusLed};

use crate::bus::{BusPoller, Poll};
use crate::heartbeat::Heartbeat;
use crate::mode::Mode;
use crate::presenter::{DisplayPresenter, Redraw};
use crate::state::SharedState;
use crate::stats::LoopStats;

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub bus: Poll,
    pub redraw: Option<Redraw>,
    pub heartbeat: bool,
}

pub struct Scheduler<T: BusTransport, D: Display, E: Encoder, L: StatusLed> {
    pub(crate) state: Arc<SharedState>,
    pub(crate) bus: BusPoller<T>,
    pub(crate) presenter: DisplayPresenter<D>,
    pub(crate) heartbeat: Heartbeat<L>,
    pub(crate) encoder: E,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) iterations: u64,
    pub(crate) max_iteration_us: u64,
}

impl<T: BusTransport, D: Display, E: Encoder, L: StatusLed> core::fmt::Debug
    for Scheduler<T, D, E, L>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("mode", &self.state.mode())
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl<T: BusTransport, D: Display, E: Encoder, L: StatusLed> Scheduler<T, D, E, L> {
    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn display(&self) -> &D {
        self.presenter.display()
    }

    pub fn led(&self) -> &L {
        self.heartbeat.led()
    }

    pub fn transport(&self) -> &T {
        self.bus.transport()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Microseconds since the scheduler was built, on its clock.
    pub fn uptime_us(&self) -> u64 {
        self.clock.us_since(self.epoch)
    }

    pub fn stats(&self) -> LoopStats {
        let bus = self.bus.counters();
        let redraw = self.presenter.counters();
        LoopStats {
            iterations: self.iterations,
            bus_polls: bus.polls,
            bus_served: bus.served,
            bus_ignored: bus.ignored,
            bus_errors: bus.errors,
            redraws: redraw.redraws,
            redraw_failures: redraw.failures,
            heartbeat_toggles: self.heartbeat.toggles(),
            heartbeat_failures: self.heartbeat.failures(),
            max_iteration_us: self.max_iteration_us,
        }
    }

    /// Show the splash text. Failures are logged and ignored.
    pub fn show_splash(&mut self, text: &str) {
        if let Err(e) = self.presenter.splash(text) {
            tracing::warn!(error = %e, "splash failed");
        }
    }

    /// One loop iteration.
    pub fn run_once(&mut self) -> Tick {
        let start_us = self.clock.us_since(self.epoch);

        let bus = self.bus.poll(start_us);
        let redraw = self.presenter.refresh(&mut self.encoder);
        // Re-read the clock: a redraw can take tens of milliseconds.
        let now_us = self.clock.us_since(self.epoch);
        let heartbeat = self.heartbeat.tick(now_us);

        self.iterations += 1;
        let spent = self.clock.us_since(self.epoch).saturating_sub(start_us);
        self.max_iteration_us = self.max_iteration_us.max(spent);

        Tick {
            bus,
            redraw,
            heartbeat,
        }
    }

    /// Run until `stop` is set. Returns the final statistics.
    pub fn run(&mut self, stop: &AtomicBool) -> LoopStats {
        tracing::info!(mode = ?self.mode(), "main loop start");
        while !stop.load(Ordering::Relaxed) {
            self.run_once();
        }
        let stats = self.stats();
        tracing::info!(
            iterations = stats.iterations,
            bus_served = stats.bus_served,
            redraws = stats.redraws,
            "main loop stop"
        );
        stats
    }
}
