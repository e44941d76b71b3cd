//! Simulated collaborators for running the controller on a development host.
//!
//! Background actors (encoder, operator, bus master) each own one thread that
//! is shut down and joined when the handle is dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;
use handwheel_traits::clock::{Clock, MonotonicClock};
use handwheel_traits::{
    Display, Encoder, EncoderSample, Level, SampleSink, StatusLed, StepIncrement,
};

use crate::framebuffer::FrameBuffer;
use crate::modbus::{self, ModbusSlave, SerialLink};

type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Longest single sleep of a background actor, so that drop stays prompt.
const SLICE: Duration = Duration::from_millis(10);

/// Sleep `total` in slices; returns false if `shutdown` was raised meanwhile.
fn sleep_unless<C: Clock>(clock: &C, shutdown: &AtomicBool, total: Duration) -> bool {
    let mut left = total;
    while !left.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let step = left.min(SLICE);
        clock.sleep(step);
        left -= step;
    }
    !shutdown.load(Ordering::Relaxed)
}

/// Stop flag plus join handle shared by the background actors.
struct Worker {
    name: &'static str,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(name: &'static str, body: impl FnOnce(Arc<AtomicBool>) + Send + 'static) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let join_handle = std::thread::spawn(move || body(flag));
        Self {
            name,
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!(worker = self.name, "thread joined"),
                Err(e) => tracing::warn!(worker = self.name, ?e, "thread panicked during shutdown"),
            }
        }
    }
}

// ── LED ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimLed {
    on: bool,
    toggles: u64,
}

impl SimLed {
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn toggles(&self) -> u64 {
        self.toggles
    }
}

impl StatusLed for SimLed {
    fn toggle(&mut self) -> HwResult<()> {
        self.on = !self.on;
        self.toggles += 1;
        tracing::trace!(on = self.on, "led");
        Ok(())
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

/// One `text` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// Off-screen display: renders into a framebuffer and records the text of
/// every flushed frame. A flush can be made to take time, like the I2C blit.
pub struct SimDisplay<C: Clock = MonotonicClock> {
    fb: FrameBuffer,
    pending: Vec<TextItem>,
    shown: Vec<TextItem>,
    flushes: u64,
    flush_latency: Duration,
    clock: C,
}

impl SimDisplay<MonotonicClock> {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_clock(width, height, MonotonicClock::new())
    }
}

impl<C: Clock> SimDisplay<C> {
    pub fn with_clock(width: u32, height: u32, clock: C) -> Self {
        Self {
            fb: FrameBuffer::new(width, height),
            pending: Vec::new(),
            shown: Vec::new(),
            flushes: 0,
            flush_latency: Duration::ZERO,
            clock,
        }
    }

    #[must_use]
    pub fn with_flush_latency(mut self, latency: Duration) -> Self {
        self.flush_latency = latency;
        self
    }

    /// Text of the last flushed frame.
    pub fn shown(&self) -> &[TextItem] {
        &self.shown
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }
}

impl<C: Clock> Display for SimDisplay<C> {
    fn clear(&mut self) -> HwResult<()> {
        self.fb.clear();
        self.pending.clear();
        Ok(())
    }

    fn text(&mut self, text: &str, x: i32, y: i32) -> HwResult<()> {
        self.fb.draw_text(text, x, y);
        self.pending.push(TextItem {
            text: text.to_string(),
            x,
            y,
        });
        Ok(())
    }

    fn flush(&mut self) -> HwResult<()> {
        self.clock.sleep(self.flush_latency);
        self.shown.clone_from(&self.pending);
        self.flushes += 1;
        let texts: Vec<&str> = self.shown.iter().map(|t| t.text.as_str()).collect();
        tracing::debug!(?texts, lit = self.fb.lit(), "display flush");
        Ok(())
    }
}

// ── Encoder ──────────────────────────────────────────────────────────────────

/// Encoder that turns steadily while enabled.
///
/// Emits `rate_hz` samples per second to the bound sink; the step switch
/// moves to the next position every `switch_every` samples.
pub struct SimEncoder {
    enabled: Arc<AtomicBool>,
    samples: Arc<AtomicU64>,
    _worker: Worker,
}

impl SimEncoder {
    pub fn spawn<C: Clock + Send + 'static>(
        sink: Arc<dyn SampleSink>,
        rate_hz: u32,
        switch_every: u64,
        clock: C,
    ) -> Self {
        let enabled = Arc::new(AtomicBool::new(false));
        let samples = Arc::new(AtomicU64::new(0));
        let period_us = 1_000_000 / rate_hz.max(1);
        let period = Duration::from_micros(u64::from(period_us));

        let en = Arc::clone(&enabled);
        let count = Arc::clone(&samples);
        let worker = Worker::spawn("sim-encoder", move |shutdown| {
            let mut position: i32 = 0;
            let mut step = StepIncrement::default();
            while sleep_unless(&clock, &shutdown, period) {
                if !en.load(Ordering::Acquire) {
                    continue;
                }
                position = position.wrapping_add(1);
                let n = count.fetch_add(1, Ordering::Relaxed) + 1;
                if switch_every > 0 && n % switch_every == 0 {
                    step = step.next();
                }
                sink.on_sample(EncoderSample {
                    position,
                    interval_us: period_us,
                    step_increment: step.raw(),
                });
            }
        });

        Self {
            enabled,
            samples,
            _worker: worker,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

impl Encoder for SimEncoder {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        if self.enabled.swap(on, Ordering::AcqRel) != on {
            tracing::debug!(on, "sim encoder sampling");
        }
        Ok(())
    }
}

// ── Mode button ──────────────────────────────────────────────────────────────

/// An operator pressing the mode button every `every` for `hold`.
///
/// Edges are delivered to `handler` on the button thread, the way the edge
/// interrupt would call it.
pub struct SimButton {
    presses: Arc<AtomicU64>,
    _worker: Worker,
}

impl SimButton {
    pub fn spawn<C, F>(every: Duration, hold: Duration, clock: C, mut handler: F) -> Self
    where
        C: Clock + Send + 'static,
        F: FnMut(Level) + Send + 'static,
    {
        let presses = Arc::new(AtomicU64::new(0));
        let count = Arc::clone(&presses);
        let worker = Worker::spawn("sim-button", move |shutdown| {
            while sleep_unless(&clock, &shutdown, every) {
                handler(Level::Low);
                // Always release, even when shutting down mid-press.
                sleep_unless(&clock, &shutdown, hold);
                handler(Level::High);
                count.fetch_add(1, Ordering::Relaxed);
            }
        });
        Self {
            presses,
            _worker: worker,
        }
    }

    pub fn presses(&self) -> u64 {
        self.presses.load(Ordering::Relaxed)
    }
}

// ── Bus ──────────────────────────────────────────────────────────────────────

/// Slave end of an in-process serial line.
pub struct ChannelLink {
    requests: xch::Receiver<Vec<u8>>,
    replies: xch::Sender<Vec<u8>>,
    pending: VecDeque<u8>,
}

/// Master end of an in-process serial line.
#[derive(Clone)]
pub struct MasterEnd {
    pub requests: xch::Sender<Vec<u8>>,
    pub replies: xch::Receiver<Vec<u8>>,
}

pub fn channel_link() -> (ChannelLink, MasterEnd) {
    let (req_tx, req_rx) = xch::unbounded();
    let (rep_tx, rep_rx) = xch::unbounded();
    (
        ChannelLink {
            requests: req_rx,
            replies: rep_tx,
            pending: VecDeque::new(),
        },
        MasterEnd {
            requests: req_tx,
            replies: rep_rx,
        },
    )
}

impl SerialLink for ChannelLink {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while let Ok(frame) = self.requests.try_recv() {
            self.pending.extend(frame);
        }
        let n = buf.len().min(self.pending.len());
        for (dst, b) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = b;
        }
        Ok(n)
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.replies.send(frame.to_vec()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "bus master gone")
        })
    }
}

/// Modbus slave on an in-process line.
pub type ChannelBus = ModbusSlave<ChannelLink>;

/// Host controller polling the slave's first registers periodically.
pub struct SimMaster {
    replies: Arc<AtomicU64>,
    timeouts: Arc<AtomicU64>,
    last_position: Arc<AtomicU16>,
    _worker: Worker,
}

impl SimMaster {
    pub fn spawn<C: Clock + Send + 'static>(
        end: MasterEnd,
        slave: u8,
        count: u16,
        every: Duration,
        clock: C,
    ) -> Self {
        let replies = Arc::new(AtomicU64::new(0));
        let timeouts = Arc::new(AtomicU64::new(0));
        let last_position = Arc::new(AtomicU16::new(0));
        let (ok, late, pos) = (
            Arc::clone(&replies),
            Arc::clone(&timeouts),
            Arc::clone(&last_position),
        );
        let worker = Worker::spawn("sim-master", move |shutdown| {
            let request = modbus::read_request(slave, 0, count);
            while sleep_unless(&clock, &shutdown, every) {
                if end.requests.send(request.clone()).is_err() {
                    break;
                }
                match end.replies.recv_timeout(Duration::from_millis(50)) {
                    Ok(frame) => match modbus::parse_read_reply(slave, &frame) {
                        Ok(regs) => {
                            if let Some(&p) = regs.first() {
                                pos.store(p, Ordering::Relaxed);
                            }
                            ok.fetch_add(1, Ordering::Release);
                            tracing::trace!(?regs, "master read");
                        }
                        Err(e) => tracing::debug!(error = %e, "master got bad reply"),
                    },
                    Err(_) => {
                        late.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });
        Self {
            replies,
            timeouts,
            last_position,
            _worker: worker,
        }
    }

    pub fn replies(&self) -> u64 {
        self.replies.load(Ordering::Acquire)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Register 0 as last read by the master.
    pub fn last_position(&self) -> u16 {
        self.last_position.load(Ordering::Relaxed)
    }
}
