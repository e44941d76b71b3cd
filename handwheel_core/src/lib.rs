#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Handwheel controller logic (hardware-agnostic).
//!
//! All hardware interaction goes through the traits in `handwheel_traits`:
//! `BusTransport`, `Display`, `Encoder` and `StatusLed`.
//!
//! ## Architecture
//!
//! - **Shared state** (`state`): register bank, mode, step increment and the
//!   display-dirty flag, all lock-free atomics
//! - **Interrupt handlers**: `debounce::ModeButton` for the mode pushbutton,
//!   `bridge::EncoderBridge` for encoder samples
//! - **Main loop** (`scheduler`): bus poll, display refresh and heartbeat,
//!   each behind its own `gate::IntervalGate`
//!
//! ## Concurrency
//!
//! Handlers may preempt the main loop at any point. Each field of the shared
//! state is written by one party with a single store, so readers never see a
//! torn value, though two fields read back to back may belong to different
//! updates.

pub mod bridge;
pub mod builder;
pub mod bus;
pub mod config;
pub mod conversions;
pub mod debounce;
pub mod error;
pub mod gate;
pub mod heartbeat;
pub mod hw_error;
pub mod mocks;
pub mod mode;
pub mod presenter;
pub mod scheduler;
pub mod state;
pub mod stats;

pub use bridge::EncoderBridge;
pub use builder::{Handwheel, HandwheelBuilder, build_scheduler};
pub use bus::{BusCounters, BusPoller, Poll};
pub use config::{DebounceWindow, Layout, Timing};
pub use debounce::{DebounceGate, Edge, ModeButton};
pub use error::{BuildError, HandwheelError, Result};
pub use gate::IntervalGate;
pub use heartbeat::Heartbeat;
pub use mode::{Mode, apply_enable_gate, encoder_should_be_enabled};
pub use presenter::{DisplayPresenter, Redraw, RedrawCounters, step_label};
pub use scheduler::{Scheduler, Tick};
pub use state::SharedState;
pub use stats::LoopStats;
