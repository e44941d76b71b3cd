//! Collaborator boundaries for the handwheel controller.
//!
//! The controller core only talks to hardware through the traits below. All
//! of them return `Box<dyn Error + Send + Sync>` at the boundary so that
//! simulated and real backends can use their own error types.
pub mod clock;
pub mod registers;
pub mod sample;

pub use clock::{Clock, MonotonicClock};
pub use registers::RegisterBank;
pub use sample::{EncoderSample, StepIncrement};

/// Logic level of an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Receiver for decoded encoder samples, bound once when the encoder is built.
///
/// Called asynchronously with respect to the main loop (interrupt context on
/// the target, a foreign thread on the host). Implementations must not block.
pub trait SampleSink: Send + Sync {
    fn on_sample(&self, sample: EncoderSample);
}

/// Control surface of the encoder-decoder collaborator.
pub trait Encoder {
    /// Start or stop delivering samples to the bound sink.
    fn enable(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Result of one non-blocking receive on the field-bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOutcome {
    /// Nothing pending; the normal case.
    Idle,
    /// One request addressed to us was serviced.
    Served,
    /// A frame arrived but was not for us (other address, bad checksum).
    Ignored,
}

/// Field-bus slave transport servicing requests against a register bank it
/// was given at construction.
pub trait BusTransport {
    /// Service at most one request. Must never block waiting for traffic.
    fn receive(&mut self) -> Result<BusOutcome, Box<dyn std::error::Error + Send + Sync>>;
}

/// Text-capable display driver with an off-screen buffer.
pub trait Display {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Push the buffer to the panel. Slow (tens of ms); main loop only.
    fn flush(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Single status LED.
pub trait StatusLed {
    fn toggle(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Encoder + ?Sized> Encoder for Box<T> {
    fn enable(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).enable(on)
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn receive(&mut self) -> Result<BusOutcome, Box<dyn std::error::Error + Send + Sync>> {
        (**self).receive()
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).clear()
    }
    fn text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).text(text, x, y)
    }
    fn flush(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).flush()
    }
}

impl<T: StatusLed + ?Sized> StatusLed for Box<T> {
    fn toggle(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).toggle()
    }
}
