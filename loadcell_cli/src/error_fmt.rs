//! Human-readable error descriptions and structured JSON error formatting.

use loadcell_core::error::{BuildError, ScaleError};
use loadcell_hardware::error::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/loadcell.toml for a sample."
        );
    }

    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::SensorTimeout { attempts } => format!(
                "What happened: Scale read timed out ({attempts} attempts without a sample).\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing hardware.sensor_read_timeout_ms in the config."
            ),
            ScaleError::InvalidArgument(msg) => format!(
                "What happened: {msg}.\nHow to fix: Pass the calibration weight in grams, e.g. `loadcell calibrate --weight 500`."
            ),
            ScaleError::Uncalibrated(msg) => format!(
                "What happened: Calibration produced no usable scale factor ({msg}).\nLikely causes: The known weight was not on the scale, or the scale was tared with the weight on it.\nHow to fix: Tare the empty scale, place the weight, then calibrate again."
            ),
            ScaleError::State(msg) => format!(
                "What happened: Internal state error ({msg}).\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::DataReadyTimeout => "What happened: HX711 did not produce data within the configured timeout.\nLikely causes: Wrong DT/SCK pins, wiring/power issues, or timeout configured too low.\nHow to fix: Check [pins] in the config, verify 5V/GND, and raise hardware.sensor_read_timeout_ms.".to_string(),
            HwError::UnsupportedGain(g) => format!(
                "What happened: Gain {g} is not supported.\nHow to fix: Set hardware.gain to 128 or 64 (channel A) or 32 (channel B)."
            ),
            other => format!(
                "What happened: Failed to initialize hardware ({other}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({msg}).\nHow to fix: Check the --config path, or omit it to use built-in defaults."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for the error class, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::SensorTimeout { .. }) => "SensorTimeout",
        Some(ScaleError::InvalidArgument(_)) => "InvalidArgument",
        Some(ScaleError::Uncalibrated(_)) => "Uncalibrated",
        Some(ScaleError::State(_)) => "State",
        None if err.downcast_ref::<HwError>().is_some() => "Hardware",
        None => "Error",
    }
}

/// Map scale errors to stable exit codes; anything else returns 1.
///
/// 2 is left to clap for usage errors.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "SensorTimeout" => 3,
        "Uncalibrated" => 4,
        "InvalidArgument" => 5,
        "InvalidConfig" => 6,
        "Hardware" => 7,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({ "reason": reason_name(err), "message": humanize(err) });
    if let Some(ScaleError::SensorTimeout { attempts }) = err.downcast_ref::<ScaleError>() {
        obj["details"] = json!({ "attempts": attempts });
    }
    obj.to_string()
}
