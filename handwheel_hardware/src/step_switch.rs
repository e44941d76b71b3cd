//! Step-size pushbutton: each debounced press cycles the increment
//! 1 -> 10 -> 100 -> 1.

use std::time::{Duration, Instant};

use handwheel_traits::StepIncrement;

/// Edges this close after an accepted press are contact bounce.
pub const DEFAULT_BOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct StepSwitch {
    bounce: Duration,
    last_press: Option<Instant>,
    step: StepIncrement,
}

impl StepSwitch {
    pub fn new(bounce: Duration) -> Self {
        Self {
            bounce,
            last_press: None,
            step: StepIncrement::default(),
        }
    }

    pub fn step(&self) -> StepIncrement {
        self.step
    }

    /// Feed one falling edge. Returns the new increment when the edge counts
    /// as a press, `None` for bounce.
    pub fn edge(&mut self, now: Instant) -> Option<StepIncrement> {
        if let Some(last) = self.last_press
            && now.saturating_duration_since(last) < self.bounce
        {
            return None;
        }
        self.last_press = Some(now);
        let next = self.step.next();
        if next == self.step {
            return None;
        }
        self.step = next;
        Some(next)
    }
}

impl Default for StepSwitch {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn bounce_burst_is_one_press() {
        let mut sw = StepSwitch::default();
        let t0 = Instant::now();
        let accepted: Vec<_> = (0..8)
            .filter_map(|i| sw.edge(t0 + Duration::from_millis(i * 3)))
            .collect();
        assert_eq!(accepted, vec![StepIncrement::default().next()]);
        assert_eq!(sw.step(), StepIncrement::default().next());
    }

    #[rstest]
    #[case(99, 1)]
    #[case(100, 2)]
    #[case(250, 2)]
    fn second_press_needs_the_bounce_gap(#[case] gap_ms: u64, #[case] presses: usize) {
        let mut sw = StepSwitch::new(Duration::from_millis(100));
        let t0 = Instant::now();
        let n = [t0, t0 + Duration::from_millis(gap_ms)]
            .into_iter()
            .filter_map(|t| sw.edge(t))
            .count();
        assert_eq!(n, presses);
    }

    #[test]
    fn three_presses_wrap_around() {
        let mut sw = StepSwitch::default();
        let t0 = Instant::now();
        for i in 1..=3 {
            sw.edge(t0 + Duration::from_secs(i));
        }
        assert_eq!(sw.step(), StepIncrement::default());
    }
}
