//! Do-nothing collaborators for tests and benches.

use handwheel_traits::{BusOutcome, BusTransport, Display, Encoder, StatusLed};

type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A bus that never has traffic pending.
#[derive(Debug, Default)]
pub struct NullBus;

impl BusTransport for NullBus {
    fn receive(&mut self) -> HwResult<BusOutcome> {
        Ok(BusOutcome::Idle)
    }
}

/// A display that accepts and discards everything.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn clear(&mut self) -> HwResult<()> {
        Ok(())
    }

    fn text(&mut self, _text: &str, _x: i32, _y: i32) -> HwResult<()> {
        Ok(())
    }

    fn flush(&mut self) -> HwResult<()> {
        Ok(())
    }
}

/// An encoder that remembers its last enable state.
#[derive(Debug, Default)]
pub struct NullEncoder {
    pub enabled: bool,
}

impl Encoder for NullEncoder {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        self.enabled = on;
        Ok(())
    }
}

/// An LED that only counts toggles.
#[derive(Debug, Default)]
pub struct NullLed {
    pub toggles: u64,
}

impl StatusLed for NullLed {
    fn toggle(&mut self) -> HwResult<()> {
        self.toggles += 1;
        Ok(())
    }
}
