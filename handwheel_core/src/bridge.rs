//! Encoder callback: the only writer of the position/interval registers.

use std::sync::Arc;

use handwheel_traits::registers::{REG_INTERVAL, REG_POSITION};
use handwheel_traits::{EncoderSample, SampleSink};

use crate::state::SharedState;

/// Sink bound to the encoder collaborator at construction.
#[derive(Debug, Clone)]
pub struct EncoderBridge {
    state: Arc<SharedState>,
}

impl EncoderBridge {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }

    /// Mirror one sample into the register bank and mark the display dirty.
    ///
    /// Registers carry the low 16 bits: position in two's complement,
    /// interval in units of 100 µs. Nothing is validated or clamped.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[inline]
    pub fn apply(&self, sample: EncoderSample) {
        let bank = self.state.bank();
        bank.set(REG_POSITION, sample.position as u16);
        bank.set(REG_INTERVAL, (sample.interval_us / 100) as u16);
        self.state.set_step_increment(sample.step_increment);
        self.state.mark_dirty();
    }
}

impl SampleSink for EncoderBridge {
    fn on_sample(&self, sample: EncoderSample) {
        self.apply(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwheel_traits::registers::{REG_INTERVAL_LO, REG_RESERVED};

    #[test]
    fn sample_lands_in_registers() {
        let state = SharedState::new(4);
        state.take_dirty();
        let bridge = EncoderBridge::new(state.clone());
        bridge.on_sample(EncoderSample {
            position: 1234,
            interval_us: 56_789,
            step_increment: 10,
        });
        assert_eq!(state.bank().get(REG_POSITION), Some(1234));
        assert_eq!(state.bank().get(REG_INTERVAL), Some(567));
        assert_eq!(state.step_increment(), 10);
        assert!(state.is_dirty());
    }

    #[test]
    fn reserved_registers_stay_untouched() {
        let state = SharedState::new(4);
        EncoderBridge::new(state.clone()).apply(EncoderSample {
            position: -1,
            interval_us: u32::MAX,
            step_increment: 100,
        });
        assert_eq!(state.bank().get(REG_INTERVAL_LO), Some(0));
        assert_eq!(state.bank().get(REG_RESERVED), Some(0));
    }

    #[test]
    fn negative_position_is_twos_complement() {
        let state = SharedState::new(4);
        EncoderBridge::new(state.clone()).apply(EncoderSample {
            position: -2,
            interval_us: 99,
            step_increment: 1,
        });
        assert_eq!(state.bank().get(REG_POSITION), Some(0xFFFE));
        // 99 / 100 truncates to zero
        assert_eq!(state.bank().get(REG_INTERVAL), Some(0));
    }
}
