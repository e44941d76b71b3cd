//! Maps `Box<dyn Error>` from trait boundaries to typed `HandwheelError`.
//!
//! The traits in `handwheel_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `handwheel_hardware::HwError` downcasting.

use crate::error::HandwheelError;

/// Which collaborator an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peripheral {
    Bus,
    Display,
    Led,
    Encoder,
}

/// Map a trait-boundary error to a typed `HandwheelError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(source: Peripheral, e: &(dyn std::error::Error + 'static)) -> HandwheelError {
    #[cfg(feature = "hardware-errors")]
    {
        use handwheel_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => HandwheelError::Timeout,
                HwError::Gpio(_) | HwError::Io(_) => HandwheelError::HardwareFault(hw.to_string()),
                other => wrap(source, other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        HandwheelError::Timeout
    } else {
        wrap(source, s)
    }
}

fn wrap(source: Peripheral, msg: String) -> HandwheelError {
    match source {
        Peripheral::Bus => HandwheelError::Bus(msg),
        Peripheral::Display => HandwheelError::Display(msg),
        Peripheral::Led => HandwheelError::Led(msg),
        Peripheral::Encoder => HandwheelError::Encoder(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_errors_map_by_peripheral() {
        let e = std::io::Error::other("nack");
        assert_eq!(
            map_hw_error(Peripheral::Display, &e),
            HandwheelError::Display("nack".into())
        );
        assert_eq!(
            map_hw_error(Peripheral::Bus, &e),
            HandwheelError::Bus("nack".into())
        );
    }

    #[test]
    fn timeout_text_maps_to_timeout() {
        let e = std::io::Error::other("i2c Timeout on flush");
        assert_eq!(map_hw_error(Peripheral::Display, &e), HandwheelError::Timeout);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_error_is_downcast() {
        use handwheel_hardware::error::HwError;
        let e = HwError::Gpio("pin busy".into());
        assert!(matches!(
            map_hw_error(Peripheral::Led, &e),
            HandwheelError::HardwareFault(_)
        ));
        let e = HwError::Timeout;
        assert_eq!(map_hw_error(Peripheral::Bus, &e), HandwheelError::Timeout);
    }
}
