//! Liveness LED.

use handwheel_traits::StatusLed;

use crate::gate::IntervalGate;
use crate::hw_error::{Peripheral, map_hw_error};

/// Toggles the status LED once per period, independent of everything else.
pub struct Heartbeat<L: StatusLed> {
    led: L,
    gate: IntervalGate,
    toggles: u64,
    failures: u64,
}

impl<L: StatusLed> Heartbeat<L> {
    pub fn new(led: L, period_us: u64) -> Self {
        Self {
            led,
            gate: IntervalGate::new(period_us),
            toggles: 0,
            failures: 0,
        }
    }

    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    /// Toggle if the period elapsed. Returns whether a toggle was attempted.
    pub fn tick(&mut self, now_us: u64) -> bool {
        if !self.gate.fire(now_us) {
            return false;
        }
        match self.led.toggle() {
            Ok(()) => self.toggles += 1,
            Err(e) => {
                self.failures += 1;
                let err = map_hw_error(Peripheral::Led, &*e);
                tracing::warn!(error = %err, "heartbeat toggle failed");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Led(bool, u32);
    impl StatusLed for Led {
        fn toggle(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0 = !self.0;
            self.1 += 1;
            Ok(())
        }
    }

    #[test]
    fn toggles_once_per_period() {
        let mut hb = Heartbeat::new(Led::default(), 500_000);
        let mut fired = 0;
        // 2.2 s of 1 ms iterations: t=0, 0.5, 1.0, 1.5, 2.0
        for t in (0..2_200_000u64).step_by(1_000) {
            if hb.tick(t) {
                fired += 1;
            }
        }
        assert_eq!(fired, 5);
        assert_eq!(hb.led().1, 5);
        assert!(hb.led().0);
    }

    #[test]
    fn failed_toggle_is_counted() {
        struct Broken;
        impl StatusLed for Broken {
            fn toggle(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                Err("gpio gone".into())
            }
        }
        let mut hb = Heartbeat::new(Broken, 10);
        assert!(hb.tick(0));
        assert!(hb.tick(10));
        assert_eq!((hb.toggles(), hb.failures()), (0, 2));
    }
}
