// src/config/validate.rs

use anyhow::{anyhow, Result};

use crate::config::model::ConfigFile;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - `progress_throttle_ms >= 1`
/// - `initial_progress <= 100`
/// - every command id is non-empty
/// - start and notification mutations are distinct commands
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_scheduler(cfg)?;
    validate_commands(cfg)?;
    Ok(())
}

fn validate_scheduler(cfg: &ConfigFile) -> Result<()> {
    let s = &cfg.scheduler;

    if s.progress_throttle_ms == 0 {
        return Err(anyhow!(
            "[scheduler].progress_throttle_ms must be >= 1 (got 0)"
        ));
    }

    if s.initial_progress > 100 {
        return Err(anyhow!(
            "[scheduler].initial_progress must be <= 100 (got {})",
            s.initial_progress
        ));
    }

    Ok(())
}

fn validate_commands(cfg: &ConfigFile) -> Result<()> {
    let c = &cfg.commands;

    for (key, value) in [
        ("range_values_mutation", &c.range_values_mutation),
        ("calculation_start_mutation", &c.calculation_start_mutation),
        (
            "calculation_notification_mutation",
            &c.calculation_notification_mutation,
        ),
    ] {
        if value.trim().is_empty() {
            return Err(anyhow!("[commands].{} must not be empty", key));
        }
    }

    if let Some(empty) = c.cosmetic_triggers.iter().position(|t| t.trim().is_empty()) {
        return Err(anyhow!(
            "[commands].cosmetic_triggers[{}] must not be empty",
            empty
        ));
    }

    if c.calculation_start_mutation == c.calculation_notification_mutation {
        return Err(anyhow!(
            "[commands].calculation_start_mutation and calculation_notification_mutation must differ (both '{}')",
            c.calculation_start_mutation
        ));
    }

    Ok(())
}
