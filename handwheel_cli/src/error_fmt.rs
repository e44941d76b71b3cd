//! Human-readable error descriptions, JSON error output and exit codes.

use handwheel_core::{BuildError, HandwheelError};
use handwheel_hardware::HwError;

/// Stable exit codes.
pub mod exit {
    pub const FAILURE: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const HARDWARE: i32 = 3;
    pub const CHECK: i32 = 4;
}

fn chain_text(err: &eyre::Report) -> String {
    err.chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

fn is_config_error(err: &eyre::Report) -> bool {
    let text = chain_text(err).to_ascii_lowercase();
    text.contains("config") || text.contains("share gpio") || text.contains("must be")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingState
            | BuildError::MissingBus
            | BuildError::MissingDisplay
            | BuildError::MissingEncoder
            | BuildError::MissingLed => format!(
                "What happened: The controller could not be assembled ({be}).\nLikely causes: A collaborator failed to initialize before it reached the builder.\nHow to fix: Re-run with --log-level=debug and check the first failing component."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid timing configuration ({msg}).\nLikely causes: Zero periods or an empty debounce window in [timing].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HandwheelError>() {
        return match he {
            HandwheelError::Display(_) => format!(
                "What happened: The display did not accept a frame ({he}).\nLikely causes: Wrong I2C bus or address, or the panel is not powered.\nHow to fix: Check [display].i2c_bus and i2c_address and the panel wiring."
            ),
            HandwheelError::Led(_) => format!(
                "What happened: The status LED could not be driven ({he}).\nLikely causes: Pin already claimed or wrong pin number.\nHow to fix: Check [pins].status_led."
            ),
            HandwheelError::Bus(_) | HandwheelError::Timeout => format!(
                "What happened: The field bus failed ({he}).\nLikely causes: Serial port missing, wrong baud rate, or wiring.\nHow to fix: Check [bus].port and baudrate and the RS-485 adapter."
            ),
            _ => format!(
                "What happened: {he}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        let what = chain_text(err);
        return match hw {
            HwError::Gpio(_) => format!(
                "What happened: Failed to initialize GPIO ({what}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem."
            ),
            HwError::I2c(_) => format!(
                "What happened: Failed to talk to the display ({what}).\nLikely causes: I2C disabled, wrong bus number, or wrong address.\nHow to fix: Enable I2C, then check [display].i2c_bus and i2c_address."
            ),
            HwError::Serial(_) => format!(
                "What happened: Failed to open the serial port ({what}).\nLikely causes: Port missing, in use by a console, or no permission.\nHow to fix: Check [bus].port and that the user is in the dialout group."
            ),
            _ => format!(
                "What happened: Hardware error ({what}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    let msg = chain_text(err);
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing file.\nHow to fix: Pass --config with the path to a valid TOML file (see etc/handwheel.toml)."
        );
    }
    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this controller ({msg}).\nLikely causes: Missing [pins] section, misspelled key, or wrong value type.\nHow to fix: Compare the file with etc/handwheel.toml."
        );
    }
    if is_config_error(err) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values or pins assigned twice.\nHow to fix: Edit the TOML config and try again."
        );
    }

    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<HandwheelError>().is_some() {
        return exit::CHECK;
    }
    if err.downcast_ref::<HwError>().is_some() {
        return exit::HARDWARE;
    }
    if err.downcast_ref::<BuildError>().is_some() || is_config_error(err) {
        return exit::CONFIG;
    }
    exit::FAILURE
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        exit::CONFIG => "Config",
        exit::HARDWARE => "Hardware",
        exit::CHECK => "Check",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
