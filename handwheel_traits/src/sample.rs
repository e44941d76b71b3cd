//! Values produced by the encoder-decoder collaborator.

/// One decoded encoder update.
///
/// `step_increment` is the raw collaborator value (1, 10 or 100 for
/// 0.01, 0.1 and 1.0 mm per detent). It is carried unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderSample {
    pub position: i32,
    pub interval_us: u32,
    pub step_increment: u16,
}

/// Step resolution selected on the handwheel's step-size switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepIncrement {
    /// 0.01 mm per detent.
    #[default]
    Hundredth,
    /// 0.1 mm per detent.
    Tenth,
    /// 1.0 mm per detent.
    Whole,
}

impl StepIncrement {
    /// Map a raw increment to a resolution. Anything that is not 1 or 10 is 1.0 mm.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            1 => Self::Hundredth,
            10 => Self::Tenth,
            _ => Self::Whole,
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            Self::Hundredth => 1,
            Self::Tenth => 10,
            Self::Whole => 100,
        }
    }

    /// Next position of the step-size switch: 0.01 -> 0.1 -> 1.0 -> 0.01.
    pub fn next(self) -> Self {
        match self {
            Self::Hundredth => Self::Tenth,
            Self::Tenth => Self::Whole,
            Self::Whole => Self::Hundredth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StepIncrement;

    #[test]
    fn raw_round_trip_and_fallback() {
        for s in [StepIncrement::Hundredth, StepIncrement::Tenth, StepIncrement::Whole] {
            assert_eq!(StepIncrement::from_raw(s.raw()), s);
        }
        assert_eq!(StepIncrement::from_raw(0), StepIncrement::Whole);
        assert_eq!(StepIncrement::from_raw(7), StepIncrement::Whole);
    }

    #[test]
    fn switch_cycles_through_three_positions() {
        let s = StepIncrement::default();
        assert_eq!(s.next().next().next(), s);
    }
}
