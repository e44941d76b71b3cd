//! Background actors start, do their work and stop on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use handwheel_hardware::sim::{SimButton, SimEncoder, SimMaster, channel_link};
use handwheel_hardware::ModbusSlave;
use handwheel_traits::clock::MonotonicClock;
use handwheel_traits::{BusTransport, Encoder, EncoderSample, Level, RegisterBank, SampleSink};

#[derive(Default)]
struct CountingSink(AtomicU64);

impl SampleSink for CountingSink {
    fn on_sample(&self, _sample: EncoderSample) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn encoder_emits_only_while_enabled() {
    let sink = Arc::new(CountingSink::default());
    let mut enc = SimEncoder::spawn(sink.clone(), 500, 10, MonotonicClock::new());
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(sink.0.load(Ordering::Relaxed), 0);

    enc.enable(true).expect("enable");
    std::thread::sleep(Duration::from_millis(60));
    enc.enable(false).expect("disable");
    std::thread::sleep(Duration::from_millis(20));
    let seen = sink.0.load(Ordering::Relaxed);
    assert!(seen > 0);
    assert_eq!(seen, enc.samples());

    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(sink.0.load(Ordering::Relaxed), seen);
    drop(enc);
}

#[test]
fn button_delivers_press_release_pairs() {
    let edges = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&edges);
    let button = SimButton::spawn(
        Duration::from_millis(5),
        Duration::from_millis(5),
        MonotonicClock::new(),
        move |l| log.lock().expect("lock").push(l),
    );
    std::thread::sleep(Duration::from_millis(60));
    drop(button);
    let edges = edges.lock().expect("lock");
    assert!(edges.len() >= 2);
    assert_eq!(edges.len() % 2, 0);
    for pair in edges.chunks(2) {
        assert_eq!(pair, &[Level::Low, Level::High]);
    }
}

#[test]
fn master_reads_registers_through_slave() {
    let bank = Arc::new(RegisterBank::new(4));
    bank.set(0, 42);
    let (link, end) = channel_link();
    let mut slave = ModbusSlave::new(link, bank, 3);
    let master = SimMaster::spawn(end, 3, 4, Duration::from_millis(2), MonotonicClock::new());
    for _ in 0..2_000 {
        slave.receive().expect("receive");
        if master.replies() > 0 {
            break;
        }
        std::thread::sleep(Duration::from_micros(500));
    }
    assert!(master.replies() > 0);
    assert_eq!(master.last_position(), 42);
}
