//! Human-readable error descriptions and structured JSON error formatting.

use lift_core::error::{BuildError, LiftError};
use lift_hardware::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No range sensor was provided to the lift.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the lift.\nLikely causes: The motor driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the driver is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::MissingSwitches => {
                "What happened: No limit switches were provided to the lift.\nLikely causes: The proximity inputs were not wired into the builder.\nHow to fix: Pass the switches via with_switches(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No settings store was provided to the lift.\nLikely causes: The store was not wired into the builder.\nHow to fix: Pass a store via with_store(...), or use --store FILE.".to_string()
            }
            BuildError::MissingBattery | BuildError::MissingDisplay | BuildError::MissingHost => format!(
                "What happened: The lift could not be assembled ({be}).\nLikely causes: A collaborator was not wired into the builder.\nHow to fix: Provide every link (battery, display, host) before starting."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LiftError>() {
        return match le {
            LiftError::Config(msg) => format!(
                "What happened: Configuration rejected ({msg}).\nLikely causes: A typo or an out-of-range value in the TOML.\nHow to fix: Edit the config file (or drop --config to use defaults), then rerun."
            ),
            LiftError::Storage(msg) => format!(
                "What happened: Settings storage failed ({msg}).\nLikely causes: The store file is unreadable, not valid TOML, or the directory is read-only.\nHow to fix: Check the --store path and its permissions; delete the file to start from a fresh store."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::Gpio(_) | HwError::Pwm(_) => format!(
                "What happened: Failed to initialize the actuator or switch pins ({he}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access GPIO and PWM."
            ),
            HwError::Adc(_) => format!(
                "What happened: The distance sensor ADC is unavailable ({he}).\nLikely causes: SPI disabled or a wrong pins.adc_channel.\nHow to fix: Enable SPI0 and check the channel the sensor is wired to."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from input files
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 't_ms,raw'.".to_string();
    }
    if lower.contains("invalid scenario") {
        return format!(
            "What happened: The scenario file could not be parsed.\nLikely causes: A [[step]] without at_ms or with an unknown kind.\nHow to fix: Use kind = button|soc|host_metrics|host_name|host_text. Original: {msg}"
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

/// Stable exit codes: 2 config, 3 assembly, 4 storage, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<LiftError>() {
        Some(LiftError::Config(_)) => 2,
        Some(LiftError::Storage(_)) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<LiftError>() {
        Some(LiftError::Config(_)) => "Config",
        Some(LiftError::Storage(_)) => "Storage",
        Some(_) => "Lift",
        None if err.downcast_ref::<HwError>().is_some() => "Hardware",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_exit_code_two() {
        let err = eyre::Report::new(LiftError::Config("bus.capacity must be >= 1".into()));
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("bus.capacity"));
    }

    #[test]
    fn build_errors_name_the_missing_part() {
        let err = eyre::Report::new(BuildError::MissingActuator);
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("No actuator"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Build");
        assert_eq!(v["exit_code"], 3);
    }

    #[test]
    fn untyped_errors_fall_back_to_generic_text() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Original: boom"));
    }
}
