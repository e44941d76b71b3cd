//! Monotonic "never earlier, possibly later" deadline checks.

/// Fires at most once per `period_us`, measured from the last time it fired.
///
/// An unarmed gate fires on the first check, so every activity runs once on
/// the first loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGate {
    period_us: u64,
    last_us: Option<u64>,
}

impl IntervalGate {
    pub fn new(period_us: u64) -> Self {
        Self {
            period_us,
            last_us: None,
        }
    }

    #[inline]
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    #[inline]
    pub fn last_fired_us(&self) -> Option<u64> {
        self.last_us
    }

    /// True when at least `period_us` elapsed since the last fire; records
    /// `now_us` as the new reference when it fires.
    #[inline]
    pub fn fire(&mut self, now_us: u64) -> bool {
        if let Some(last) = self.last_us
            && now_us.saturating_sub(last) < self.period_us
        {
            return false;
        }
        self.last_us = Some(now_us);
        true
    }
}
