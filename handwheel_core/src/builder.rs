//! Builder for the boxed `Handwheel` and the generic `build_scheduler` constructor.
//!
//! Collaborators must be created around the shared state: the bus transport
//! gets `state.registers()` and the encoder gets `EncoderBridge::new(state)`
//! before they are handed to the builder.

use std::sync::Arc;

use handwheel_traits::clock::{Clock, MonotonicClock};
use handwheel_traits::{BusTransport, Display, Encoder, StatusLed};

use crate::bus::BusPoller;
use crate::config::{Layout, Timing};
use crate::error::{BuildError, Result};
use crate::heartbeat::Heartbeat;
use crate::presenter::DisplayPresenter;
use crate::scheduler::Scheduler;
use crate::state::SharedState;

/// Scheduler over boxed collaborators, as assembled by the CLI.
pub type Handwheel =
    Scheduler<Box<dyn BusTransport>, Box<dyn Display>, Box<dyn Encoder>, Box<dyn StatusLed>>;

impl Handwheel {
    /// Start building a Handwheel.
    pub fn builder() -> HandwheelBuilder {
        HandwheelBuilder::default()
    }
}

/// Builder for `Handwheel`. All fields are validated on `build()`.
#[derive(Default)]
pub struct HandwheelBuilder {
    state: Option<Arc<SharedState>>,
    bus: Option<Box<dyn BusTransport>>,
    display: Option<Box<dyn Display>>,
    encoder: Option<Box<dyn Encoder>>,
    led: Option<Box<dyn StatusLed>>,
    timing: Option<Timing>,
    layout: Option<Layout>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl HandwheelBuilder {
    pub fn with_state(mut self, state: Arc<SharedState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_bus(mut self, bus: impl BusTransport + 'static) -> Self {
        self.bus = Some(Box::new(bus));
        self
    }

    pub fn with_display(mut self, display: impl Display + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn with_led(mut self, led: impl StatusLed + 'static) -> Self {
        self.led = Some(Box::new(led));
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Inject a clock (tests use a manually advanced one).
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<Handwheel> {
        let state = self
            .state
            .ok_or_else(|| eyre::Report::new(BuildError::MissingState))?;
        let bus = self
            .bus
            .ok_or_else(|| eyre::Report::new(BuildError::MissingBus))?;
        let display = self
            .display
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDisplay))?;
        let encoder = self
            .encoder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;
        let led = self
            .led
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLed))?;
        build_scheduler(
            state,
            bus,
            display,
            encoder,
            led,
            self.timing.unwrap_or_default(),
            self.layout.unwrap_or_default(),
            self.clock,
        )
    }
}

/// Validate timing and construct a `Scheduler` with static dispatch.
///
/// This is the single source of truth for validation and construction,
/// used by both `HandwheelBuilder::build()` and direct callers.
#[allow(clippy::too_many_arguments)]
pub fn build_scheduler<T: BusTransport, D: Display, E: Encoder, L: StatusLed>(
    state: Arc<SharedState>,
    bus: T,
    display: D,
    encoder: E,
    led: L,
    timing: Timing,
    layout: Layout,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<Scheduler<T, D, E, L>> {
    if timing.bus_poll_us == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "bus_poll_us must be >= 1",
        )));
    }
    if timing.heartbeat_us == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "heartbeat_us must be >= 1",
        )));
    }
    if timing.debounce.min_ms >= timing.debounce.max_ms {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "debounce window is empty",
        )));
    }

    let clock: Arc<dyn Clock + Send + Sync> = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
    let epoch = clock.now();
    tracing::debug!(
        bus_poll_us = timing.bus_poll_us,
        heartbeat_us = timing.heartbeat_us,
        registers = state.bank().len(),
        "scheduler built"
    );

    Ok(Scheduler {
        bus: BusPoller::new(bus, timing.bus_poll_us),
        presenter: DisplayPresenter::new(display, Arc::clone(&state), layout),
        heartbeat: Heartbeat::new(led, timing.heartbeat_us),
        encoder,
        state,
        clock,
        epoch,
        iterations: 0,
        max_iteration_us: 0,
    })
}
