// src/config/model.rs

use serde::{Deserialize, Serialize};

use crate::command::ids;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// debounce_ms = 100
/// progress_delay_ms = 1000
///
/// [commands]
/// cosmetic_triggers = ["sheet.command.set-style"]
/// ```
///
/// All sections and keys are optional; the defaults reproduce the reference
/// timings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub commands: CommandsSection,
}

/// `[scheduler]` section: timings and progress budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Quiet period after the last qualifying edit before a flush.
    pub debounce_ms: u64,

    /// A session must run this long before the progress indicator opens.
    pub progress_delay_ms: u64,

    /// Minimum spacing between two progress pushes of the same metric.
    pub progress_throttle_ms: u64,

    /// Fixed overhead added to the estimated task count.
    pub progress_overhead: u64,

    /// First increment pushed when the indicator opens (percent of a 100
    /// task budget in the reference widget).
    pub initial_progress: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            progress_delay_ms: 1000,
            progress_throttle_ms: 300,
            progress_overhead: 100,
            initial_progress: 5,
        }
    }
}

/// `[commands]` section: identifiers the scheduler treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsSection {
    pub range_values_mutation: String,
    pub cosmetic_triggers: Vec<String>,
    pub calculation_start_mutation: String,
    pub calculation_notification_mutation: String,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            range_values_mutation: ids::SET_RANGE_VALUES_MUTATION.to_string(),
            cosmetic_triggers: vec![
                ids::SET_STYLE_COMMAND.to_string(),
                ids::SET_BORDER_COMMAND.to_string(),
                ids::CLEAR_SELECTION_FORMAT_COMMAND.to_string(),
            ],
            calculation_start_mutation: ids::SET_FORMULA_CALCULATION_START_MUTATION.to_string(),
            calculation_notification_mutation: ids::SET_FORMULA_CALCULATION_NOTIFICATION_MUTATION
                .to_string(),
        }
    }
}
