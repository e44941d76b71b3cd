//! Operating mode of the handwheel and the encoder enable gate.

use handwheel_traits::Encoder;

/// Operating mode, cycled by short presses of the mode button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Mode {
    /// Wheel ignored.
    #[default]
    Disabled = 0,
    /// Wheel jogs the machine; the only mode with encoder sampling.
    Jogging = 1,
    /// Host-controlled; no local jog motion.
    Control = 2,
}

impl Mode {
    /// Cyclic successor: Disabled -> Jogging -> Control -> Disabled.
    #[inline]
    pub fn next(self) -> Self {
        match self {
            Self::Disabled => Self::Jogging,
            Self::Jogging => Self::Control,
            Self::Control => Self::Disabled,
        }
    }

    /// Label shown on the status line.
    pub fn label(self) -> &'static str {
        match self {
            Self::Disabled => "disable",
            Self::Jogging => "joggling",
            Self::Control => "control",
        }
    }

    #[inline]
    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a stored discriminant. Only values written by `as_u8` are ever
    /// stored; anything else is treated as `Disabled`.
    #[inline]
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Jogging,
            2 => Self::Control,
            _ => Self::Disabled,
        }
    }
}

/// Single point of policy for what a mode means to the encoder.
#[inline]
pub fn encoder_should_be_enabled(mode: Mode) -> bool {
    mode == Mode::Jogging
}

/// Apply the enable gate to the encoder collaborator.
pub fn apply_enable_gate<E: Encoder + ?Sized>(
    encoder: &mut E,
    mode: Mode,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let on = encoder_should_be_enabled(mode);
    encoder.enable(on)?;
    Ok(on)
}
