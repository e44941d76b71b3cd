use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandwheelError {
    #[error("bus transport error: {0}")]
    Bus(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("status led error: {0}")]
    Led(String),
    #[error("encoder error: {0}")]
    Encoder(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout talking to peripheral")]
    Timeout,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing bus transport")]
    MissingBus,
    #[error("missing display")]
    MissingDisplay,
    #[error("missing encoder")]
    MissingEncoder,
    #[error("missing status led")]
    MissingLed,
    #[error("missing shared state")]
    MissingState,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
