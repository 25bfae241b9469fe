// src/command.rs

//! Commands as observed on the host command bus.
//!
//! The scheduler never executes commands itself; it only reads the ones the
//! bus reports as executed, and emits a single kind of command of its own
//! (the calculation start request).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known command identifiers used by the default configuration.
pub mod ids {
    /// Range-value mutation; the only command with extra filtering rules.
    pub const SET_RANGE_VALUES_MUTATION: &str = "sheet.mutation.set-range-values";

    /// Cosmetic commands that can originate a range-value mutation without
    /// changing any computed value.
    pub const SET_STYLE_COMMAND: &str = "sheet.command.set-style";
    pub const SET_BORDER_COMMAND: &str = "sheet.command.set-border";
    pub const CLEAR_SELECTION_FORMAT_COMMAND: &str = "sheet.command.clear-selection-format";

    /// Outbound request that starts a recalculation.
    pub const SET_FORMULA_CALCULATION_START_MUTATION: &str =
        "formula.mutation.set-formula-calculation-start";

    /// Inbound progress notification emitted by the calculation engine.
    pub const SET_FORMULA_CALCULATION_NOTIFICATION_MUTATION: &str =
        "formula.mutation.set-formula-calculation-notification";
}

/// Execution options attached to a command by the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOptions {
    /// The command was applied locally only (not a collaborative/user edit).
    #[serde(default)]
    pub only_local: bool,
}

impl ExecOptions {
    pub fn local_only() -> Self {
        Self { only_local: true }
    }
}

/// An executed command: identifier, free-form parameters and options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub options: ExecOptions,
}

impl Command {
    pub fn new(id: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            params,
            options: ExecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// The `trigger` parameter: id of the command that caused this one, if any.
    pub fn trigger(&self) -> Option<&str> {
        self.params.get("trigger").and_then(Value::as_str)
    }
}
