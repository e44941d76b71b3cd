use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("peripheral timeout")]
    Timeout,
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("serial error: {0}")]
    Serial(String),
    #[error("bad frame: {0}")]
    Frame(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

#[cfg(feature = "hardware")]
impl From<rppal::gpio::Error> for HwError {
    fn from(e: rppal::gpio::Error) -> Self {
        Self::Gpio(e.to_string())
    }
}

#[cfg(feature = "hardware")]
impl From<rppal::i2c::Error> for HwError {
    fn from(e: rppal::i2c::Error) -> Self {
        Self::I2c(e.to_string())
    }
}

#[cfg(feature = "hardware")]
impl From<rppal::uart::Error> for HwError {
    fn from(e: rppal::uart::Error) -> Self {
        Self::Serial(e.to_string())
    }
}
