// src/session/notification.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RecalcError, Result};

/// Stage reported while a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationStage {
    StartDependency,
    #[serde(alias = "CURRENTLY_CALCULATING")]
    Calculating,
    #[serde(alias = "CURRENTLY_CALCULATING_ARRAY_FORMULA")]
    CalculatingArray,
}

/// Terminal classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutedState {
    NotExecuted,
    StopExecution,
    Success,
    Initial,
}

impl ExecutedState {
    /// Human-readable result used in the terminal log line.
    pub fn describe(self) -> &'static str {
        match self {
            ExecutedState::NotExecuted => "no tasks are being executed anymore",
            ExecutedState::StopExecution => "formula execution was stopped",
            ExecutedState::Success => "formula calculation succeeded",
            ExecutedState::Initial => "waiting for calculation",
        }
    }
}

/// The two independently tracked calculation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Scalar,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub stage: CalculationStage,
    #[serde(default)]
    pub total_formulas_to_calculate: u64,
    #[serde(default)]
    pub completed_formulas_count: u64,
    #[serde(default)]
    pub total_array_formulas_to_calculate: u64,
    #[serde(default)]
    pub completed_array_formulas_count: u64,
}

impl StageInfo {
    pub fn new(stage: CalculationStage) -> Self {
        Self {
            stage,
            total_formulas_to_calculate: 0,
            completed_formulas_count: 0,
            total_array_formulas_to_calculate: 0,
            completed_array_formulas_count: 0,
        }
    }

    /// The metric this stage reports on, if any.
    pub fn metric(&self) -> Option<Metric> {
        match self.stage {
            CalculationStage::StartDependency => None,
            CalculationStage::Calculating => Some(Metric::Scalar),
            CalculationStage::CalculatingArray => Some(Metric::Array),
        }
    }

    /// `(total, completed)` for `metric`.
    pub fn counts(&self, metric: Metric) -> (u64, u64) {
        match metric {
            Metric::Scalar => (self.total_formulas_to_calculate, self.completed_formulas_count),
            Metric::Array => (
                self.total_array_formulas_to_calculate,
                self.completed_array_formulas_count,
            ),
        }
    }
}

/// Wire shape: both fields optional, exactly one expected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_info: Option<StageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions_executed_state: Option<ExecutedState>,
}

/// A progress notification from the calculation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNotification", into = "RawNotification")]
pub enum CalculationNotification {
    Stage(StageInfo),
    Executed(ExecutedState),
}

impl TryFrom<RawNotification> for CalculationNotification {
    type Error = RecalcError;

    fn try_from(raw: RawNotification) -> Result<Self> {
        match (raw.stage_info, raw.functions_executed_state) {
            (Some(info), None) => Ok(CalculationNotification::Stage(info)),
            (None, Some(state)) => Ok(CalculationNotification::Executed(state)),
            (Some(_), Some(_)) => Err(RecalcError::InvalidNotification(
                "both stageInfo and functionsExecutedState are present".to_string(),
            )),
            (None, None) => Err(RecalcError::InvalidNotification(
                "neither stageInfo nor functionsExecutedState is present".to_string(),
            )),
        }
    }
}

impl From<CalculationNotification> for RawNotification {
    fn from(n: CalculationNotification) -> Self {
        match n {
            CalculationNotification::Stage(info) => RawNotification {
                stage_info: Some(info),
                functions_executed_state: None,
            },
            CalculationNotification::Executed(state) => RawNotification {
                stage_info: None,
                functions_executed_state: Some(state),
            },
        }
    }
}

impl CalculationNotification {
    /// Decode the params of a notification command.
    pub fn from_params(params: &Value) -> Result<Self> {
        let raw: RawNotification = serde_json::from_value(params.clone())
            .map_err(|e| RecalcError::InvalidNotification(e.to_string()))?;
        Self::try_from(raw)
    }

    pub fn dependency_build() -> Self {
        CalculationNotification::Stage(StageInfo::new(CalculationStage::StartDependency))
    }

    pub fn calculating(total: u64, completed: u64) -> Self {
        let mut info = StageInfo::new(CalculationStage::Calculating);
        info.total_formulas_to_calculate = total;
        info.completed_formulas_count = completed;
        CalculationNotification::Stage(info)
    }

    pub fn calculating_array(total: u64, completed: u64) -> Self {
        let mut info = StageInfo::new(CalculationStage::CalculatingArray);
        info.total_array_formulas_to_calculate = total;
        info.completed_array_formulas_count = completed;
        CalculationNotification::Stage(info)
    }

    pub fn executed(state: ExecutedState) -> Self {
        CalculationNotification::Executed(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_stage_info() {
        let n = CalculationNotification::from_params(&json!({
            "stageInfo": {
                "stage": "CALCULATING",
                "totalFormulasToCalculate": 10,
                "completedFormulasCount": 1,
                "totalArrayFormulasToCalculate": 0,
                "completedArrayFormulasCount": 0
            }
        }))
        .unwrap();
        assert_eq!(n, CalculationNotification::calculating(10, 1));
    }

    #[test]
    fn accepts_engine_stage_aliases() {
        let n = CalculationNotification::from_params(&json!({
            "stageInfo": { "stage": "CURRENTLY_CALCULATING_ARRAY_FORMULA" }
        }))
        .unwrap();
        assert_eq!(n, CalculationNotification::calculating_array(0, 0));
    }

    #[test]
    fn decodes_executed_state() {
        let n = CalculationNotification::from_params(&json!({
            "functionsExecutedState": "STOP_EXECUTION"
        }))
        .unwrap();
        assert_eq!(n, CalculationNotification::executed(ExecutedState::StopExecution));
    }

    #[test]
    fn rejects_both_or_neither() {
        let both = json!({
            "stageInfo": { "stage": "START_DEPENDENCY" },
            "functionsExecutedState": "SUCCESS"
        });
        assert!(matches!(
            CalculationNotification::from_params(&both),
            Err(RecalcError::InvalidNotification(_))
        ));
        assert!(matches!(
            CalculationNotification::from_params(&json!({})),
            Err(RecalcError::InvalidNotification(_))
        ));
    }

    #[test]
    fn serializes_back_to_wire_shape() {
        let json = serde_json::to_value(CalculationNotification::executed(ExecutedState::Success)).unwrap();
        assert_eq!(json, json!({ "functionsExecutedState": "SUCCESS" }));
    }
}
