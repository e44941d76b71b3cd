#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the handwheel controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Only `[pins]` is mandatory; every other section falls back to the
//!   firmware's fixed constants (slave 3 at 38400 baud, 500 µs bus poll,
//!   500 ms heartbeat, 100..500 ms debounce window).
use serde::Deserialize;
use std::path::Path;

/// Highest valid Modbus slave address.
pub const MAX_SLAVE_ADDRESS: u8 = 247;
/// Largest panel the SSD1306 controller addresses.
pub const MAX_PANEL_WIDTH: u32 = 128;
pub const MAX_PANEL_HEIGHT: u32 = 64;

#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub encoder_a: u8,
    pub encoder_b: u8,
    /// Step-size switch, consumed by the encoder collaborator.
    pub step_switch: u8,
    /// Mode pushbutton, active low with pull-up.
    pub mode_button: u8,
    pub status_led: u8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BusCfg {
    pub slave_address: u8,
    pub baudrate: u32,
    /// Serial device of the RS-485 transceiver.
    pub port: String,
    /// Number of holding registers exposed to the master (>= 4).
    pub register_count: usize,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            slave_address: 3,
            baudrate: 38_400,
            port: "/dev/serial0".to_string(),
            register_count: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayCfg {
    pub i2c_bus: u8,
    pub i2c_address: u8,
    pub width: u32,
    pub height: u32,
    /// Baseline of the status line (the yellow band on two-color panels).
    pub status_line: i32,
    pub splash_text: String,
    /// How long the splash stays up before the loop starts (0 skips it).
    pub splash_ms: u64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            i2c_address: 0x3C,
            width: 128,
            height: 64,
            status_line: 48,
            splash_text: "Heli2".to_string(),
            splash_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    /// Minimum spacing between two bus polls (µs).
    pub bus_poll_us: u64,
    /// Heartbeat LED toggle period (µs).
    pub heartbeat_us: u64,
    /// A press must last strictly longer than this (ms).
    pub debounce_min_ms: u64,
    /// A press must last strictly shorter than this (ms).
    pub debounce_max_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            bus_poll_us: 500,
            heartbeat_us: 500_000,
            debounce_min_ms: 100,
            debounce_max_ms: 500,
        }
    }
}

/// Log rotation policy for the optional log file.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Never,
    Daily,
    Hourly,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    pub rotation: Rotation,
}

/// Knobs of the simulated backend. Ignored by the hardware backend.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Samples per second emitted by the simulated encoder while enabled.
    pub encoder_rate_hz: u32,
    /// Emulated flush latency of the simulated display (ms).
    pub flush_ms: u64,
    /// Period of the simulated operator's short press (0 disables it).
    pub press_every_ms: u64,
    /// Period of the simulated bus master's read request (0 disables it).
    pub master_poll_ms: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            encoder_rate_hz: 20,
            flush_ms: 5,
            press_every_ms: 1500,
            master_poll_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub bus: BusCfg,
    #[serde(default)]
    pub display: DisplayCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()
        .map_err(|e| eyre::eyre!("invalid config {:?}: {}", path, e))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let pins = [
            ("encoder_a", p.encoder_a),
            ("encoder_b", p.encoder_b),
            ("step_switch", p.step_switch),
            ("mode_button", p.mode_button),
            ("status_led", p.status_led),
        ];
        for (i, (name_a, a)) in pins.iter().enumerate() {
            for (name_b, b) in &pins[i + 1..] {
                if a == b {
                    eyre::bail!("pins.{name_a} and pins.{name_b} share GPIO {a}");
                }
            }
        }

        // Bus
        if self.bus.slave_address == 0 || self.bus.slave_address > MAX_SLAVE_ADDRESS {
            eyre::bail!("bus.slave_address must be in 1..={MAX_SLAVE_ADDRESS}");
        }
        if self.bus.baudrate == 0 {
            eyre::bail!("bus.baudrate must be > 0");
        }
        if self.bus.register_count < 4 {
            eyre::bail!("bus.register_count must be >= 4");
        }
        if self.bus.register_count > 125 {
            eyre::bail!("bus.register_count must be <= 125");
        }

        // Display
        if self.display.width == 0 || self.display.height == 0 {
            eyre::bail!("display.width and display.height must be > 0");
        }
        if self.display.width > MAX_PANEL_WIDTH || self.display.height > MAX_PANEL_HEIGHT {
            eyre::bail!(
                "display must be at most {MAX_PANEL_WIDTH}x{MAX_PANEL_HEIGHT} (SSD1306 limit)"
            );
        }
        if self.display.status_line < 0
            || u32::try_from(self.display.status_line).unwrap_or(u32::MAX) >= self.display.height
        {
            eyre::bail!("display.status_line must lie inside the panel height");
        }
        if self.display.splash_ms > 60_000 {
            eyre::bail!("display.splash_ms is unreasonably large (>60s)");
        }

        // Timing
        if self.timing.bus_poll_us == 0 {
            eyre::bail!("timing.bus_poll_us must be >= 1");
        }
        if self.timing.heartbeat_us == 0 {
            eyre::bail!("timing.heartbeat_us must be >= 1");
        }
        if self.timing.debounce_min_ms >= self.timing.debounce_max_ms {
            eyre::bail!("timing.debounce_min_ms must be < timing.debounce_max_ms");
        }

        // Sim
        if self.sim.encoder_rate_hz == 0 {
            eyre::bail!("sim.encoder_rate_hz must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pins]
encoder_a = 18
encoder_b = 19
step_switch = 22
mode_button = 21
status_led = 25
"#;

    #[test]
    fn minimal_config_uses_firmware_defaults() {
        let cfg = load_toml(MINIMAL).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.bus.slave_address, 3);
        assert_eq!(cfg.bus.baudrate, 38_400);
        assert_eq!(cfg.timing.bus_poll_us, 500);
        assert_eq!(cfg.timing.heartbeat_us, 500_000);
        assert_eq!(cfg.timing.debounce_min_ms, 100);
        assert_eq!(cfg.timing.debounce_max_ms, 500);
        assert_eq!(cfg.display.status_line, 48);
        assert_eq!(cfg.logging.rotation, Rotation::Never);
    }

    #[test]
    fn rejects_shared_pins() {
        let toml = MINIMAL.replace("status_led = 25", "status_led = 21");
        let cfg = load_toml(&toml).expect("parse");
        let err = cfg.validate().expect_err("shared pin");
        assert!(err.to_string().contains("share GPIO 21"));
    }
}
