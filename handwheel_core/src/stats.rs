//! Main-loop statistics.

/// Counters accumulated by the scheduler since it was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub bus_polls: u64,
    pub bus_served: u64,
    pub bus_ignored: u64,
    pub bus_errors: u64,
    pub redraws: u64,
    pub redraw_failures: u64,
    pub heartbeat_toggles: u64,
    pub heartbeat_failures: u64,
    /// Longest single iteration (µs); dominated by display flushes.
    pub max_iteration_us: u64,
}

impl LoopStats {
    /// Mean iteration rate over `elapsed_us` of runtime.
    pub fn iterations_per_sec(&self, elapsed_us: u64) -> f64 {
        if elapsed_us == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.iterations as f64 * 1_000_000.0 / elapsed_us as f64;
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::LoopStats;

    #[test]
    fn rate_handles_zero_elapsed() {
        let s = LoopStats {
            iterations: 10,
            ..LoopStats::default()
        };
        assert_eq!(s.iterations_per_sec(0), 0.0);
        assert!((s.iterations_per_sec(1_000_000) - 10.0).abs() < f64::EPSILON);
    }
}
