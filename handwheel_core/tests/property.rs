use std::sync::Arc;

use handwheel_core::mocks::{NullBus, NullDisplay, NullEncoder, NullLed};
use handwheel_core::{EncoderBridge, Layout, SharedState, Timing, build_scheduler};
use handwheel_traits::EncoderSample;
use handwheel_traits::clock::test_clock::TestClock;
use handwheel_traits::registers::{REG_INTERVAL, REG_POSITION};
use proptest::prelude::*;

prop_compose! {
    fn sample_strategy()(
        position in any::<i32>(),
        interval_us in any::<u32>(),
        step_increment in prop_oneof![Just(1u16), Just(10u16), Just(100u16), any::<u16>()],
    ) -> EncoderSample {
        EncoderSample { position, interval_us, step_increment }
    }
}

proptest! {
    // Any batch of updates between two iterations costs at most one redraw.
    #[test]
    fn batches_collapse_into_one_redraw(batches in proptest::collection::vec(
        proptest::collection::vec(sample_strategy(), 0..8), 1..20)
    ) {
        let clock = TestClock::new();
        let state = SharedState::new(4);
        let bridge = EncoderBridge::new(Arc::clone(&state));
        let mut sched = build_scheduler(
            Arc::clone(&state),
            NullBus,
            NullDisplay,
            NullEncoder::default(),
            NullLed::default(),
            Timing::default(),
            Layout::default(),
            Some(Arc::new(clock.clone())),
        ).expect("build");
        sched.run_once();

        let mut expected = 1u64;
        for batch in &batches {
            for s in batch {
                bridge.apply(*s);
            }
            clock.advance_us(100);
            let redraw = sched.run_once().redraw;
            prop_assert_eq!(redraw.is_some(), !batch.is_empty());
            if let (Some(r), Some(last)) = (redraw, batch.last()) {
                prop_assert_eq!(r.increment, last.step_increment);
                expected += 1;
            }
        }
        prop_assert_eq!(sched.stats().redraws, expected);
    }

    #[test]
    fn registers_hold_low_sixteen_bits(s in sample_strategy()) {
        let state = SharedState::new(4);
        EncoderBridge::new(Arc::clone(&state)).apply(s);
        prop_assert_eq!(state.bank().get(REG_POSITION), Some(s.position as u16));
        prop_assert_eq!(state.bank().get(REG_INTERVAL), Some((s.interval_us / 100) as u16));
        prop_assert_eq!(state.step_increment(), s.step_increment);
    }
}
