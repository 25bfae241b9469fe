// src/batch/request.rs

use serde::{Deserialize, Serialize};

use crate::command::{Command, ExecOptions};
use crate::dirty::DirtyDescriptor;
use crate::errors::{RecalcError, Result};

/// Request for the calculation engine to recalculate `dirty`.
///
/// Serialises to the flat camelCase shape the engine expects
/// (`dirtyRanges`, `dirtyNameMap`, ..., `forceCalculation`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationStartRequest {
    #[serde(flatten)]
    pub dirty: DirtyDescriptor,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_calculation: bool,
}

impl CalculationStartRequest {
    pub fn new(dirty: DirtyDescriptor) -> Self {
        Self {
            dirty,
            force_calculation: false,
        }
    }

    /// Unconditional first calculation: nothing known dirty, forced.
    pub fn bootstrap() -> Self {
        Self {
            dirty: DirtyDescriptor::default(),
            force_calculation: true,
        }
    }

    /// The local-only bus command carrying this request.
    pub fn into_command(self, command_id: &str) -> Result<Command> {
        let params = serde_json::to_value(&self).map_err(|e| RecalcError::Other(e.into()))?;
        Ok(Command::new(command_id, params).with_options(ExecOptions::local_only()))
    }
}
