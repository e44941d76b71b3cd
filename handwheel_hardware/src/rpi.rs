//! Raspberry Pi backend on `rppal`.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use handwheel_traits::{Display, Encoder, EncoderSample, Level, SampleSink, StatusLed};
pub use rppal::gpio::Gpio;
use rppal::gpio::{InputPin, OutputPin, Trigger};
use rppal::i2c::I2c;
use rppal::uart::{Parity, Uart};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use crate::error::{HwError, Result};
use crate::framebuffer::draw_text;
use crate::modbus::SerialLink;
use crate::step_switch::StepSwitch;

type HwResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn level(l: rppal::gpio::Level) -> Level {
    match l {
        rppal::gpio::Level::Low => Level::Low,
        rppal::gpio::Level::High => Level::High,
    }
}

/// Open the GPIO controller shared by the pin backends.
pub fn open_gpio() -> Result<Gpio> {
    Ok(Gpio::new()?)
}

// ── LED ──────────────────────────────────────────────────────────────────────

pub struct RpiLed {
    pin: OutputPin,
}

impl RpiLed {
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self> {
        let mut pin = gpio.get(pin)?.into_output();
        pin.set_low();
        Ok(Self { pin })
    }
}

impl StatusLed for RpiLed {
    fn toggle(&mut self) -> HwResult<()> {
        self.pin.toggle();
        Ok(())
    }
}

// ── Mode button ──────────────────────────────────────────────────────────────

/// Mode pushbutton (active low, internal pull-up) delivering both edges to
/// `handler` from the interrupt thread. The interrupt is cleared on drop.
pub struct RpiButton {
    _pin: InputPin,
}

impl RpiButton {
    pub fn attach<F>(gpio: &Gpio, pin: u8, mut handler: F) -> Result<Self>
    where
        F: FnMut(Level) + Send + 'static,
    {
        let mut pin = gpio.get(pin)?.into_input_pullup();
        pin.set_async_interrupt(Trigger::Both, move |l| handler(level(l)))?;
        Ok(Self { _pin: pin })
    }
}

// ── Encoder ──────────────────────────────────────────────────────────────────

/// Quadrature transition table indexed by `(previous << 2) | current`.
const QUAD: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];
/// Quarter steps per detent.
const STEPS_PER_DETENT: i8 = 4;

#[derive(Debug)]
struct Quadrature {
    a: bool,
    b: bool,
    quarter: i8,
    position: i32,
    last_detent: Instant,
}

impl Quadrature {
    fn state(&self) -> usize {
        (usize::from(self.a) << 1) | usize::from(self.b)
    }

    /// Feed one pin change; returns `(position, interval_us)` on a full detent.
    fn update(&mut self, a: Option<bool>, b: Option<bool>, now: Instant) -> Option<(i32, u32)> {
        let prev = self.state();
        if let Some(a) = a {
            self.a = a;
        }
        if let Some(b) = b {
            self.b = b;
        }
        self.quarter += QUAD[(prev << 2) | self.state()];
        if self.quarter.abs() < STEPS_PER_DETENT {
            return None;
        }
        self.position = self.position.wrapping_add(i32::from(self.quarter.signum()));
        self.quarter = 0;
        let interval = now.saturating_duration_since(self.last_detent);
        self.last_detent = now;
        Some((
            self.position,
            u32::try_from(interval.as_micros()).unwrap_or(u32::MAX),
        ))
    }
}

struct EncoderShared {
    decoder: Mutex<Quadrature>,
    enabled: AtomicBool,
    switch: Mutex<StepSwitch>,
    step: AtomicU16,
    sink: Arc<dyn SampleSink>,
}

impl EncoderShared {
    fn on_pin(&self, a: Option<bool>, b: Option<bool>) {
        let detent = match self.decoder.lock() {
            Ok(mut q) => q.update(a, b, Instant::now()),
            Err(_) => return,
        };
        if let Some((position, interval_us)) = detent
            && self.enabled.load(Ordering::Acquire)
        {
            self.sink.on_sample(EncoderSample {
                position,
                interval_us,
                step_increment: self.step.load(Ordering::Relaxed),
            });
        }
    }

    fn on_step_edge(&self) {
        let next = match self.switch.lock() {
            Ok(mut sw) => sw.edge(Instant::now()),
            Err(_) => return,
        };
        let Some(next) = next else {
            return;
        };
        self.step.store(next.raw(), Ordering::Relaxed);
        tracing::debug!(step = next.raw(), "step switch");
        if self.enabled.load(Ordering::Acquire) {
            let position = self.decoder.lock().map(|q| q.position).unwrap_or_default();
            self.sink.on_sample(EncoderSample {
                position,
                interval_us: 0,
                step_increment: next.raw(),
            });
        }
    }
}

/// Quadrature encoder on two GPIOs plus the step-size button, which cycles
/// the increment 1 -> 10 -> 100 on each press. Step-switch edges within
/// `bounce` of the last accepted press are ignored.
pub struct RpiEncoder {
    shared: Arc<EncoderShared>,
    _pins: [InputPin; 3],
}

impl RpiEncoder {
    pub fn new(
        gpio: &Gpio,
        pin_a: u8,
        pin_b: u8,
        step_pin: u8,
        bounce: Duration,
        sink: Arc<dyn SampleSink>,
    ) -> Result<Self> {
        let mut a = gpio.get(pin_a)?.into_input_pullup();
        let mut b = gpio.get(pin_b)?.into_input_pullup();
        let mut step = gpio.get(step_pin)?.into_input_pullup();

        let shared = Arc::new(EncoderShared {
            decoder: Mutex::new(Quadrature {
                a: a.is_high(),
                b: b.is_high(),
                quarter: 0,
                position: 0,
                last_detent: Instant::now(),
            }),
            enabled: AtomicBool::new(false),
            switch: Mutex::new(StepSwitch::new(bounce)),
            step: AtomicU16::new(StepSwitch::default().step().raw()),
            sink,
        });

        let s = Arc::clone(&shared);
        a.set_async_interrupt(Trigger::Both, move |l| {
            s.on_pin(Some(l == rppal::gpio::Level::High), None);
        })?;
        let s = Arc::clone(&shared);
        b.set_async_interrupt(Trigger::Both, move |l| {
            s.on_pin(None, Some(l == rppal::gpio::Level::High));
        })?;
        let s = Arc::clone(&shared);
        step.set_async_interrupt(Trigger::FallingEdge, move |_| s.on_step_edge())?;

        Ok(Self {
            shared,
            _pins: [a, b, step],
        })
    }
}

impl Encoder for RpiEncoder {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        self.shared.enabled.store(on, Ordering::Release);
        Ok(())
    }
}

// ── Serial ───────────────────────────────────────────────────────────────────

/// UART in non-blocking read mode, for the Modbus slave.
///
/// A read that finds bytes keeps collecting until the line has been quiet
/// for 1.5 character times, so a frame arriving slowly is never split by an
/// empty read.
pub struct RpiSerial {
    uart: Uart,
    char_gap: Duration,
}

/// Character gap for a baud rate: 1.5 characters of 11 bits, fixed at
/// 750 us above 19200 baud.
pub fn char_gap(baudrate: u32) -> Duration {
    if baudrate == 0 || baudrate > 19_200 {
        return Duration::from_micros(750);
    }
    Duration::from_micros(16_500_000 / u64::from(baudrate))
}

impl RpiSerial {
    pub fn open(port: &str, baudrate: u32) -> Result<Self> {
        let mut uart = Uart::with_path(port, baudrate, Parity::None, 8, 1)?;
        uart.set_read_mode(0, Duration::ZERO)?;
        uart.set_write_mode(true)?;
        Ok(Self {
            uart,
            char_gap: char_gap(baudrate),
        })
    }
}

impl SerialLink for RpiSerial {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut n = self.uart.read(buf).map_err(std::io::Error::other)?;
        if n == 0 {
            return Ok(0);
        }
        let mut last = Instant::now();
        while n < buf.len() && last.elapsed() < self.char_gap {
            let got = self
                .uart
                .read(&mut buf[n..])
                .map_err(std::io::Error::other)?;
            if got > 0 {
                n += got;
                last = Instant::now();
            } else {
                std::hint::spin_loop();
            }
        }
        Ok(n)
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        let mut sent = 0;
        while sent < frame.len() {
            sent += self
                .uart
                .write(&frame[sent..])
                .map_err(std::io::Error::other)?;
        }
        Ok(())
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

/// Panel geometries the SSD1306 driver supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSize {
    W128H64,
    W128H32,
    W96H16,
}

impl PanelSize {
    pub fn from_dimensions(width: u32, height: u32) -> Result<Self> {
        match (width, height) {
            (128, 64) => Ok(Self::W128H64),
            (128, 32) => Ok(Self::W128H32),
            (96, 16) => Ok(Self::W96H16),
            _ => Err(HwError::I2c(format!(
                "unsupported panel size {width}x{height} (128x64, 128x32 or 96x16)"
            ))),
        }
    }
}

fn panel_err(e: impl std::fmt::Debug) -> HwError {
    HwError::I2c(format!("{e:?}"))
}

/// SSD1306 OLED on the I2C bus, drawn in buffered graphics mode. `flush`
/// pushes the whole buffer, which takes tens of milliseconds at standard
/// bus speed.
pub struct Oled<S: DisplaySize> {
    panel: Ssd1306<I2CInterface<I2c>, S, BufferedGraphicsMode<S>>,
}

impl<S: DisplaySize> Oled<S> {
    fn open(i2c: I2c, address: u8, size: S) -> Result<Self> {
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let mut panel = Ssd1306::new(interface, size, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        panel.init().map_err(panel_err)?;
        Ok(Self { panel })
    }
}

impl<S: DisplaySize> Display for Oled<S> {
    fn clear(&mut self) -> HwResult<()> {
        self.panel.clear_buffer();
        Ok(())
    }

    fn text(&mut self, text: &str, x: i32, y: i32) -> HwResult<()> {
        draw_text(&mut self.panel, text, x, y).map_err(panel_err)?;
        Ok(())
    }

    fn flush(&mut self) -> HwResult<()> {
        self.panel.flush().map_err(panel_err)?;
        Ok(())
    }
}

/// Open the panel on `bus` at `address` and initialize it.
pub fn open_oled(bus: u8, address: u8, width: u32, height: u32) -> Result<Box<dyn Display>> {
    let size = PanelSize::from_dimensions(width, height)?;
    let i2c = I2c::with_bus(bus)?;
    let panel: Box<dyn Display> = match size {
        PanelSize::W128H64 => Box::new(Oled::open(i2c, address, DisplaySize128x64)?),
        PanelSize::W128H32 => Box::new(Oled::open(i2c, address, DisplaySize128x32)?),
        PanelSize::W96H16 => Box::new(Oled::open(i2c, address, DisplaySize96x16)?),
    };
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> Quadrature {
        Quadrature {
            a: true,
            b: true,
            quarter: 0,
            position: 0,
            last_detent: Instant::now(),
        }
    }

    #[test]
    fn full_cycle_is_one_detent() {
        let mut q = decoder();
        let now = Instant::now();
        // 11 -> 01 -> 00 -> 10 -> 11
        assert_eq!(q.update(Some(false), None, now), None);
        assert_eq!(q.update(None, Some(false), now), None);
        assert_eq!(q.update(Some(true), None, now), None);
        let (pos, _) = q.update(None, Some(true), now).expect("detent");
        assert_eq!(pos.abs(), 1);
    }

    #[test]
    fn panel_size_follows_config_dimensions() {
        assert_eq!(PanelSize::from_dimensions(128, 64).expect("128x64"), PanelSize::W128H64);
        assert_eq!(PanelSize::from_dimensions(96, 16).expect("96x16"), PanelSize::W96H16);
        let err = PanelSize::from_dimensions(64, 48).expect_err("odd size");
        assert!(err.to_string().contains("64x48"));
    }

    #[test]
    fn char_gap_scales_with_baud() {
        assert_eq!(char_gap(9_600), Duration::from_micros(1_718));
        assert_eq!(char_gap(38_400), Duration::from_micros(750));
    }

    #[test]
    fn bounce_on_one_pin_cancels_out() {
        let mut q = decoder();
        let now = Instant::now();
        for _ in 0..10 {
            assert_eq!(q.update(Some(false), None, now), None);
            assert_eq!(q.update(Some(true), None, now), None);
        }
        assert_eq!(q.position, 0);
    }
}
