//! Field-bus register bank shared between the encoder callback and the bus transport.
//!
//! Every register is an `AtomicU16`: a write is one indivisible store, so a
//! reader never observes a torn register. Reads of several registers are not
//! a snapshot; two registers may come from different, close-together updates.

use std::sync::atomic::{AtomicU16, Ordering};

/// Absolute encoder position (low 16 bits, two's complement).
pub const REG_POSITION: u16 = 0;
/// Interval between encoder detents in units of 100 µs.
pub const REG_INTERVAL: u16 = 1;
/// Reserved for the interval low bits; never written by the controller.
pub const REG_INTERVAL_LO: u16 = 2;
/// Reserved.
pub const REG_RESERVED: u16 = 3;
/// Smallest bank that holds the registers above.
pub const MIN_REGISTERS: usize = 4;

/// Fixed-size holding register array. Allocated once, never resized.
#[derive(Debug)]
pub struct RegisterBank {
    regs: Box<[AtomicU16]>,
}

impl RegisterBank {
    /// Allocate `len` registers, all zero. `len` is raised to `MIN_REGISTERS`.
    pub fn new(len: usize) -> Self {
        let regs = (0..len.max(MIN_REGISTERS))
            .map(|_| AtomicU16::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { regs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Read one register; `None` when `addr` is outside the bank.
    #[inline]
    pub fn get(&self, addr: u16) -> Option<u16> {
        self.regs
            .get(usize::from(addr))
            .map(|r| r.load(Ordering::Relaxed))
    }

    /// Write one register; returns false when `addr` is outside the bank.
    #[inline]
    pub fn set(&self, addr: u16, value: u16) -> bool {
        match self.regs.get(usize::from(addr)) {
            Some(r) => {
                r.store(value, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// True when `count` registers starting at `start` all lie inside the bank.
    #[inline]
    pub fn contains_range(&self, start: u16, count: u16) -> bool {
        usize::from(start) + usize::from(count) <= self.regs.len()
    }

    /// Copy `out.len()` registers starting at `start` into `out`.
    /// Returns false (and leaves `out` untouched) when the range is out of bounds.
    pub fn read_into(&self, start: u16, out: &mut [u16]) -> bool {
        let start = usize::from(start);
        let Some(src) = self.regs.get(start..start + out.len()) else {
            return false;
        };
        for (dst, reg) in out.iter_mut().zip(src) {
            *dst = reg.load(Ordering::Relaxed);
        }
        true
    }

    /// Per-register copy of the whole bank (not a consistent snapshot).
    pub fn snapshot(&self) -> Vec<u16> {
        self.regs.iter().map(|r| r.load(Ordering::Relaxed)).collect()
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new(MIN_REGISTERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_is_at_least_min_size() {
        assert_eq!(RegisterBank::new(0).len(), MIN_REGISTERS);
        assert_eq!(RegisterBank::new(10).len(), 10);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let bank = RegisterBank::new(4);
        assert!(!bank.set(4, 1));
        assert_eq!(bank.get(4), None);
        let mut out = [0u16; 2];
        assert!(!bank.read_into(3, &mut out));
        assert!(!bank.contains_range(3, 2));
        assert!(bank.contains_range(2, 2));
    }

    #[test]
    fn read_into_copies_range() {
        let bank = RegisterBank::new(4);
        bank.set(REG_POSITION, 7);
        bank.set(REG_INTERVAL, 9);
        let mut out = [0u16; 2];
        assert!(bank.read_into(0, &mut out));
        assert_eq!(out, [7, 9]);
        assert_eq!(bank.snapshot(), vec![7, 9, 0, 0]);
    }
}
