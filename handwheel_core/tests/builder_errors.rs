use handwheel_core::error::BuildError;
use handwheel_core::mocks::{NullBus, NullDisplay, NullEncoder, NullLed};
use handwheel_core::{DebounceWindow, Handwheel, SharedState, Timing};
use handwheel_traits::clock::test_clock::TestClock;
use rstest::rstest;

fn build_error(err: &eyre::Report) -> Option<&BuildError> {
    err.downcast_ref::<BuildError>()
}

#[rstest]
fn missing_state_yields_typed_build_error() {
    let err = Handwheel::builder()
        .with_bus(NullBus)
        .with_display(NullDisplay)
        .with_encoder(NullEncoder::default())
        .with_led(NullLed::default())
        .build()
        .expect_err("should fail with MissingState");
    assert_eq!(build_error(&err), Some(&BuildError::MissingState));
}

#[rstest]
fn missing_bus_yields_typed_build_error() {
    let err = Handwheel::builder()
        .with_state(SharedState::new(4))
        .with_display(NullDisplay)
        .with_encoder(NullEncoder::default())
        .with_led(NullLed::default())
        .build()
        .expect_err("should fail with MissingBus");
    assert_eq!(build_error(&err), Some(&BuildError::MissingBus));
}

#[rstest]
fn missing_led_yields_typed_build_error() {
    let err = Handwheel::builder()
        .with_state(SharedState::new(4))
        .with_bus(NullBus)
        .with_display(NullDisplay)
        .with_encoder(NullEncoder::default())
        .build()
        .expect_err("should fail with MissingLed");
    assert_eq!(build_error(&err), Some(&BuildError::MissingLed));
}

#[rstest]
#[case::zero_bus_poll(Timing { bus_poll_us: 0, ..Timing::default() })]
#[case::zero_heartbeat(Timing { heartbeat_us: 0, ..Timing::default() })]
#[case::empty_window(Timing { debounce: DebounceWindow { min_ms: 500, max_ms: 100 }, ..Timing::default() })]
fn invalid_timing_is_rejected(#[case] timing: Timing) {
    let err = Handwheel::builder()
        .with_state(SharedState::new(4))
        .with_bus(NullBus)
        .with_display(NullDisplay)
        .with_encoder(NullEncoder::default())
        .with_led(NullLed::default())
        .with_timing(timing)
        .build()
        .expect_err("invalid timing");
    assert!(matches!(build_error(&err), Some(BuildError::InvalidConfig(_))));
}

#[rstest]
fn complete_builder_runs() {
    let clock = TestClock::new();
    let mut hw = Handwheel::builder()
        .with_state(SharedState::new(8))
        .with_bus(NullBus)
        .with_display(NullDisplay)
        .with_encoder(NullEncoder::default())
        .with_led(NullLed::default())
        .with_clock(clock.clone())
        .build()
        .expect("build");
    let tick = hw.run_once();
    assert!(tick.heartbeat);
    assert!(tick.redraw.is_some());
    clock.advance_ms(1);
    assert!(hw.run_once().redraw.is_none());
    assert_eq!(hw.uptime_us(), 1_000);
    assert_eq!(hw.state().bank().len(), 8);
}
