//! Backend assembly and the `run` / `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use handwheel_config::Config;
use handwheel_core::{
    EncoderBridge, Handwheel, HandwheelError, Layout, LoopStats, ModeButton, SharedState, Timing,
};
use handwheel_traits::SampleSink;
use handwheel_traits::clock::MonotonicClock;

use crate::cli::RtLock;
use crate::rt::setup_rt_once;

/// The assembled controller plus everything that must outlive the loop.
pub struct Backend {
    pub handwheel: Handwheel,
    /// Simulated bus master, when one is polling.
    pub master: Option<handwheel_hardware::SimMaster>,
    /// Interrupt registrations and operator threads; released on drop.
    _inputs: Vec<Box<dyn Send>>,
}

/// Collaborators common to both backends.
fn core_parts(cfg: &Config) -> (Arc<SharedState>, Timing, Layout, Arc<dyn SampleSink>) {
    let state = SharedState::new(cfg.bus.register_count);
    let sink: Arc<dyn SampleSink> = Arc::new(EncoderBridge::new(Arc::clone(&state)));
    (state, (&cfg.timing).into(), (&cfg.display).into(), sink)
}

/// Simulated collaborators: host threads stand in for the operator, the
/// encoder and the bus master.
#[cfg(not(feature = "hardware"))]
pub fn assemble(cfg: &Config) -> eyre::Result<Backend> {
    use handwheel_hardware::modbus::ModbusSlave;
    use handwheel_hardware::{SimButton, SimDisplay, SimEncoder, SimLed, SimMaster, channel_link};

    // Samples between step-switch changes of the simulated operator.
    const SWITCH_EVERY: u64 = 40;

    let (state, timing, layout, sink) = core_parts(cfg);
    let clock = MonotonicClock::new();

    let encoder = SimEncoder::spawn(sink, cfg.sim.encoder_rate_hz, SWITCH_EVERY, clock);

    let mut inputs: Vec<Box<dyn Send>> = Vec::new();
    if cfg.sim.press_every_ms > 0 {
        // Hold for the middle of the window so every press is accepted.
        let hold = Duration::from_millis(timing.debounce.min_ms.midpoint(timing.debounce.max_ms));
        let mut button = ModeButton::new(Arc::clone(&state), timing.debounce, clock);
        let operator = SimButton::spawn(
            Duration::from_millis(cfg.sim.press_every_ms),
            hold,
            clock,
            move |level| {
                button.on_level(level);
            },
        );
        inputs.push(Box::new(operator));
    }

    let (link, end) = channel_link();
    let bus = ModbusSlave::new(link, state.registers(), cfg.bus.slave_address);
    let master = (cfg.sim.master_poll_ms > 0).then(|| {
        SimMaster::spawn(
            end,
            cfg.bus.slave_address,
            u16::try_from(cfg.bus.register_count).unwrap_or(4),
            Duration::from_millis(cfg.sim.master_poll_ms),
            clock,
        )
    });

    let display = SimDisplay::new(cfg.display.width, cfg.display.height)
        .with_flush_latency(Duration::from_millis(cfg.sim.flush_ms));

    let handwheel = Handwheel::builder()
        .with_state(state)
        .with_bus(bus)
        .with_display(display)
        .with_encoder(encoder)
        .with_led(SimLed::default())
        .with_timing(timing)
        .with_layout(layout)
        .with_clock(clock)
        .build()?;

    tracing::info!(backend = "sim", "collaborators assembled");
    Ok(Backend {
        handwheel,
        master,
        _inputs: inputs,
    })
}

/// Raspberry Pi collaborators on `rppal`.
#[cfg(feature = "hardware")]
pub fn assemble(cfg: &Config) -> eyre::Result<Backend> {
    use handwheel_hardware::modbus::ModbusSlave;
    use handwheel_hardware::rpi::{RpiButton, RpiEncoder, RpiLed, RpiSerial, open_gpio, open_oled};

    let (state, timing, layout, sink) = core_parts(cfg);
    let clock = MonotonicClock::new();
    let pins = &cfg.pins;

    let gpio = open_gpio().wrap_err("open gpio")?;
    let led = RpiLed::new(&gpio, pins.status_led).wrap_err("open status led pin")?;
    let encoder = RpiEncoder::new(
        &gpio,
        pins.encoder_a,
        pins.encoder_b,
        pins.step_switch,
        Duration::from_millis(timing.debounce.min_ms),
        sink,
    )
    .wrap_err("open encoder pins")?;

    let mut button = ModeButton::new(Arc::clone(&state), timing.debounce, clock);
    let button = RpiButton::attach(&gpio, pins.mode_button, move |level| {
        button.on_level(level);
    })
    .wrap_err("open mode button pin")?;

    let serial = RpiSerial::open(&cfg.bus.port, cfg.bus.baudrate)
        .wrap_err_with(|| format!("open serial port {}", cfg.bus.port))?;
    let bus = ModbusSlave::new(serial, state.registers(), cfg.bus.slave_address);

    let d = &cfg.display;
    let display = open_oled(d.i2c_bus, d.i2c_address, d.width, d.height)
        .wrap_err("open i2c display")?;

    let handwheel = Handwheel::builder()
        .with_state(state)
        .with_bus(bus)
        .with_display(display)
        .with_encoder(encoder)
        .with_led(led)
        .with_timing(timing)
        .with_layout(layout)
        .with_clock(clock)
        .build()?;

    tracing::info!(backend = "rpi", port = %cfg.bus.port, "collaborators assembled");
    Ok(Backend {
        handwheel,
        master: None,
        _inputs: vec![Box::new(button)],
    })
}

pub struct RunOpts {
    pub duration_ms: Option<u64>,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: RtLock,
}

/// What a finished run reports.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub stats: LoopStats,
    pub elapsed_us: u64,
    /// Replies received by the simulated master, if it ran.
    pub master_replies: Option<u64>,
}

/// Sleep in short slices, returning early once `stop` is set.
fn hold(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::Relaxed) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        std::thread::sleep(left.min(Duration::from_millis(10)));
    }
}

pub fn run(cfg: &Config, opts: &RunOpts, shutdown: Arc<AtomicBool>) -> eyre::Result<RunReport> {
    setup_rt_once(opts.rt, opts.rt_prio, opts.rt_lock);

    let mut backend = assemble(cfg)?;

    if !cfg.display.splash_text.is_empty() {
        backend.handwheel.show_splash(&cfg.display.splash_text);
        hold(Duration::from_millis(cfg.display.splash_ms), &shutdown);
    }

    let started = Instant::now();
    if let Some(ms) = opts.duration_ms {
        let stop = Arc::clone(&shutdown);
        std::thread::Builder::new()
            .name("run-timer".into())
            .spawn(move || {
                std::thread::sleep(Duration::from_millis(ms));
                stop.store(true, Ordering::Relaxed);
            })
            .wrap_err("spawn run timer")?;
    }

    let stats = backend.handwheel.run(&shutdown);
    let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    Ok(RunReport {
        stats,
        elapsed_us,
        master_replies: backend.master.as_ref().map(|m| m.replies()),
    })
}

/// Build the backend and exercise one redraw and one heartbeat toggle.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut backend = assemble(cfg)?;
    // The first iteration always redraws and toggles the LED.
    let tick = backend.handwheel.run_once();
    let Some(redraw) = tick.redraw else {
        eyre::bail!(HandwheelError::Display("first iteration did not redraw".into()));
    };
    if let Some(e) = redraw.error {
        return Err(eyre::Report::new(e)).wrap_err("display self-check");
    }
    if !tick.heartbeat {
        eyre::bail!(HandwheelError::Led("status LED did not toggle".into()));
    }
    let stats = backend.handwheel.stats();
    if stats.heartbeat_failures > 0 {
        eyre::bail!(HandwheelError::Led("status LED toggle failed".into()));
    }
    tracing::info!(mode = ?redraw.mode, increment = redraw.increment, "self-check passed");
    Ok(())
}

#[cfg(all(test, not(feature = "hardware")))]
mod tests {
    use super::*;

    const CFG: &str = r#"
[pins]
encoder_a = 18
encoder_b = 19
step_switch = 22
mode_button = 21
status_led = 25

[display]
splash_ms = 0

[sim]
flush_ms = 0
press_every_ms = 0
master_poll_ms = 20
"#;

    fn cfg() -> Config {
        let cfg = handwheel_config::load_toml(CFG).expect("parse");
        cfg.validate().expect("valid");
        cfg
    }

    #[test]
    fn self_check_passes_on_sim_backend() {
        self_check(&cfg()).expect("self-check");
    }

    #[test]
    fn preset_stop_flag_ends_run_immediately() {
        let opts = RunOpts {
            duration_ms: None,
            rt: false,
            rt_prio: None,
            rt_lock: RtLock::None,
        };
        let report = run(&cfg(), &opts, Arc::new(AtomicBool::new(true))).expect("run");
        assert_eq!(report.stats.iterations, 0);
        assert!(report.master_replies.is_some());
    }

    #[test]
    fn duration_bounds_the_run() {
        let opts = RunOpts {
            duration_ms: Some(100),
            rt: false,
            rt_prio: None,
            rt_lock: RtLock::None,
        };
        let report = run(&cfg(), &opts, Arc::new(AtomicBool::new(false))).expect("run");
        assert!(report.stats.iterations > 0);
        assert!(report.stats.redraws >= 1);
        assert!(report.elapsed_us >= 100_000);
    }
}
