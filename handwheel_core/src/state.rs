//! State cells shared between the interrupt handlers and the main loop.
//!
//! Writers per field:
//! - registers 0/1 and `increment`: encoder callback only
//! - `mode`: mode-button handler only
//! - `dirty`: set by both handlers, cleared only by the display presenter
//!
//! Every field is an atomic written with one store, so no field is ever torn.
//! No lock is taken anywhere; readers may see fields from two different,
//! close-together updates. That is accepted: the values are telemetry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

use handwheel_traits::RegisterBank;

use crate::mode::Mode;

#[derive(Debug)]
pub struct SharedState {
    registers: Arc<RegisterBank>,
    mode: AtomicU8,
    increment: AtomicU16,
    dirty: AtomicBool,
}

impl SharedState {
    /// Fresh state: `Disabled`, increment 0, dirty so that the first loop
    /// iteration draws the screen and applies the enable gate.
    pub fn new(register_count: usize) -> Arc<Self> {
        Arc::new(Self {
            registers: Arc::new(RegisterBank::new(register_count)),
            mode: AtomicU8::new(Mode::Disabled.as_u8()),
            increment: AtomicU16::new(0),
            dirty: AtomicBool::new(true),
        })
    }

    /// Register bank handed to the bus transport at construction.
    pub fn registers(&self) -> Arc<RegisterBank> {
        Arc::clone(&self.registers)
    }

    pub fn bank(&self) -> &RegisterBank {
        &self.registers
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Move to the next mode and mark the display dirty. Returns the new mode.
    ///
    /// Load and store are separate; this is sound because the mode button
    /// handler is the only writer.
    pub(crate) fn advance_mode(&self) -> Mode {
        let next = self.mode().next();
        self.mode.store(next.as_u8(), Ordering::Release);
        self.mark_dirty();
        next
    }

    #[inline]
    pub fn step_increment(&self) -> u16 {
        self.increment.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_step_increment(&self, raw: u16) {
        self.increment.store(raw, Ordering::Release);
    }

    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the dirty flag, returning whether it was set.
    #[inline]
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}
