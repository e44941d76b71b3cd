//! Field-bus polling.

use handwheel_traits::{BusOutcome, BusTransport};

use crate::error::HandwheelError;
use crate::gate::IntervalGate;
use crate::hw_error::{Peripheral, map_hw_error};

/// Result of one bus gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// Minimum spacing not yet elapsed; transport not touched.
    NotDue,
    Done(BusOutcome),
    /// Transport reported an error. Not retried; the next poll is a fresh attempt.
    Failed(HandwheelError),
}

/// Poll counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusCounters {
    pub polls: u64,
    pub served: u64,
    pub ignored: u64,
    pub errors: u64,
}

/// Calls the transport's non-blocking receive no more often than the gate allows.
pub struct BusPoller<T: BusTransport> {
    transport: T,
    gate: IntervalGate,
    counters: BusCounters,
    consecutive_errors: u32,
}

impl<T: BusTransport> BusPoller<T> {
    pub fn new(transport: T, min_spacing_us: u64) -> Self {
        Self {
            transport,
            gate: IntervalGate::new(min_spacing_us),
            counters: BusCounters::default(),
            consecutive_errors: 0,
        }
    }

    pub fn counters(&self) -> BusCounters {
        self.counters
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn poll(&mut self, now_us: u64) -> Poll {
        if !self.gate.fire(now_us) {
            return Poll::NotDue;
        }
        self.counters.polls += 1;
        match self.transport.receive() {
            Ok(outcome) => {
                self.consecutive_errors = 0;
                match outcome {
                    BusOutcome::Idle => {}
                    BusOutcome::Served => {
                        self.counters.served += 1;
                        tracing::trace!(now_us, "bus request served");
                    }
                    BusOutcome::Ignored => self.counters.ignored += 1,
                }
                Poll::Done(outcome)
            }
            Err(e) => {
                let err = map_hw_error(Peripheral::Bus, &*e);
                self.counters.errors += 1;
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                // Only the first of a run of failures is loud; the poll rate is high.
                if self.consecutive_errors == 1 {
                    tracing::warn!(error = %err, "bus receive failed");
                } else {
                    tracing::debug!(error = %err, run = self.consecutive_errors, "bus receive failed");
                }
                Poll::Failed(err)
            }
        }
    }
}
