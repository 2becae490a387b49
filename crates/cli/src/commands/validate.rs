//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::SessionConfig;
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
    town: String,
    carla: String,
    vehicle: String,
    camera: String,
    recording: bool,
    validation: bool,
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
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    town: config.town.clone(),
                    carla: format!("{}:{}", config.carla.host, config.carla.port),
                    vehicle: config.vehicle.blueprint.clone(),
                    camera: format!(
                        "{}x{} fov {}",
                        config.camera.width, config.camera.height, config.camera.fov
                    ),
                    recording: config.enable_recording,
                    validation: config.validation_mode,
                }),
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
fn collect_warnings(config: &SessionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.pacing.target_fps == 0 {
        warnings.push("pacing.target_fps is 0 - the loop runs unthrottled".to_string());
    }

    if !config.validation_mode && config.validation.log_path.is_some() {
        warnings.push(
            "validation.log_path is set but validation_mode is off - no log will be written"
                .to_string(),
        );
    }

    if config.vehicle.spawn_point_index.is_some() && config.vehicle.spawn_seed.is_some() {
        warnings.push(
            "vehicle.spawn_seed is ignored because vehicle.spawn_point_index is set".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Town: {}", summary.town);
            println!("  CARLA: {}", summary.carla);
            println!("  Vehicle: {}", summary.vehicle);
            println!("  Camera: {}", summary.camera);
            println!("  Recording: {}", summary.recording);
            println!("  Validation: {}", summary.validation);
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
