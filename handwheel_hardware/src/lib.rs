//! Collaborator backends for the handwheel controller.
//!
//! - `modbus`: RTU slave codec and the `ModbusSlave` bus transport
//! - `framebuffer`: 1-bit SSD1306-layout framebuffer drawn with `embedded-graphics`
//! - `step_switch`: debounced step-size pushbutton
//! - `sim`: host-side simulated encoder, display, LED, operator and bus master
//! - `rpi` (feature `hardware`): GPIO and UART backends on `rppal`, the OLED
//!   on `ssd1306`
pub mod error;
pub mod framebuffer;
pub mod modbus;
#[cfg(feature = "hardware")]
pub mod rpi;
pub mod sim;
pub mod step_switch;

pub use error::HwError;
pub use modbus::{ModbusSlave, SerialLink, SlaveCounters};
pub use sim::{ChannelBus, SimButton, SimDisplay, SimEncoder, SimLed, SimMaster, channel_link};
