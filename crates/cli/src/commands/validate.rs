//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{MeasurementKind, SessionBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    device: String,
    profile: String,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    device: blueprint.device.name.clone(),
                    profile: blueprint.device.profile.to_string(),
                    sink_count: blueprint.sinks.len(),
                }),
                error: None,
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - fused records will only be counted".to_string());
    }

    if blueprint.device.profile.primary_kind() != MeasurementKind::PulseChannels {
        warnings.push(format!(
            "Profile '{}' streams no pulse channels - no records will be fused",
            blueprint.device.profile
        ));
    }

    if let Some(mark) = blueprint.sync.pulse_high_water_mark {
        let pulse_rate = blueprint
            .device
            .profile
            .stream_settings()
            .get(MeasurementKind::PulseChannels)
            .map(|s| usize::from(s.sample_rate_hz));
        if pulse_rate.is_some_and(|rate| mark < rate) {
            warnings.push(format!(
                "sync.pulse_high_water_mark = {} holds less than one second of pulse samples",
                mark
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Device: {} ({})", summary.device, summary.profile);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for(
            r#"
            [device]
            profile = "h10"
            name = "strap"

            [sync]
            pulse_high_water_mark = 16
            "#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("No sinks")));
        assert!(warnings.iter().any(|w| w.contains("no pulse channels")));
        // h10 has no pulse stream to compare against
        assert!(!warnings.iter().any(|w| w.contains("high_water_mark")));
    }

    #[test]
    fn test_low_high_water_mark_warns() {
        let (_file, args) = args_for(
            r#"
            [device]
            profile = "oh1"

            [sync]
            pulse_high_water_mark = 16

            [[sinks]]
            name = "log"
            sink_type = "log"
            "#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("less than one second"));
    }

    #[test]
    fn test_invalid_config() {
        let (_file, args) = args_for(
            r#"
            [device]
            profile = "oh1"

            [[sinks]]
            name = "out"
            sink_type = "file"
            "#,
        );
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("path"));
        assert!(run_validate(&args).is_err());
    }
}
