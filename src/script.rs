// src/script.rs

//! Replay scripts: a timed sequence of executed commands and engine
//! notifications, plus the dirty conversions to register before replaying.
//!
//! ```toml
//! [[conversion]]
//! command = "sheet.mutation.set-range-values"
//! source = "params"
//!
//! [[event]]
//! at_ms = 0
//! command = "sheet.mutation.set-range-values"
//! params = { dirty = { dirtyRanges = [] } }
//!
//! [[event]]
//! at_ms = 400
//! notification = { stageInfo = { stage = "START_DEPENDENCY" } }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Timestamp;
use crate::command::{Command, ExecOptions};
use crate::config::{validate_config, ConfigFile};
use crate::dirty::{DirtyConversionRegistry, DirtyDescriptor, ParamsConversion, StaticConversion};
use crate::engine::{CoreRuntime, Emitted, RuntimeEvent, SimulatedRuntime};
use crate::errors::{RecalcError, Result};
use crate::session::CalculationNotification;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    #[serde(default)]
    pub conversion: Vec<ConversionEntry>,

    #[serde(default)]
    pub event: Vec<ScriptEvent>,
}

/// Where a registered conversion gets its descriptor from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSource {
    /// The command's own `dirty` parameter.
    #[default]
    Params,
    /// The inline `dirty` table of the conversion entry.
    Static,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionEntry {
    pub command: String,

    #[serde(default)]
    pub source: ConversionSource,

    #[serde(default)]
    pub dirty: Option<DirtyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptEvent {
    pub at_ms: u64,

    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub params: Option<Value>,

    #[serde(default)]
    pub only_local: bool,

    /// Raw notification payload, camelCase as the engine sends it.
    #[serde(default)]
    pub notification: Option<Value>,
}

impl ScriptEvent {
    pub fn at(&self) -> Timestamp {
        Timestamp::from_millis(self.at_ms)
    }

    /// The runtime event this entry stands for.
    pub fn to_runtime_event(&self) -> Result<RuntimeEvent> {
        match (&self.command, &self.notification) {
            (Some(id), None) => {
                let params = self.params.clone().unwrap_or(Value::Null);
                let options = ExecOptions {
                    only_local: self.only_local,
                };
                Ok(RuntimeEvent::CommandExecuted(
                    Command::new(id.clone(), params).with_options(options),
                ))
            }
            (None, Some(payload)) => {
                let notification = CalculationNotification::from_params(payload)?;
                Ok(RuntimeEvent::Notification(notification))
            }
            _ => Err(RecalcError::ScriptError(format!(
                "event at {}ms must carry exactly one of `command` or `notification`",
                self.at_ms
            ))),
        }
    }
}

impl ReplayScript {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let script: ReplayScript = toml::from_str(contents)?;
        script.validate()?;
        Ok(script)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "loading replay script");
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        for (idx, conversion) in self.conversion.iter().enumerate() {
            if conversion.command.trim().is_empty() {
                return Err(RecalcError::ScriptError(format!(
                    "conversion[{idx}].command must not be empty"
                )));
            }
            match (conversion.source, &conversion.dirty) {
                (ConversionSource::Static, None) => {
                    return Err(RecalcError::ScriptError(format!(
                        "conversion[{idx}] ({}) has source = \"static\" but no `dirty` table",
                        conversion.command
                    )));
                }
                (ConversionSource::Params, Some(_)) => {
                    return Err(RecalcError::ScriptError(format!(
                        "conversion[{idx}] ({}) has a `dirty` table but source = \"params\"",
                        conversion.command
                    )));
                }
                _ => {}
            }
        }

        let mut last = 0;
        for (idx, event) in self.event.iter().enumerate() {
            if event.at_ms < last {
                return Err(RecalcError::ScriptError(format!(
                    "event[{idx}] at {}ms is earlier than the previous event ({last}ms)",
                    event.at_ms
                )));
            }
            last = event.at_ms;
            // Also catches malformed notifications up front.
            event.to_runtime_event()?;
        }
        Ok(())
    }

    /// A registry holding every conversion the script declares.
    pub fn build_registry(&self) -> DirtyConversionRegistry {
        let registry = DirtyConversionRegistry::new();
        for conversion in &self.conversion {
            match (conversion.source, &conversion.dirty) {
                (ConversionSource::Static, Some(dirty)) => {
                    registry.register(
                        conversion.command.clone(),
                        Arc::new(StaticConversion(dirty.clone())),
                    );
                }
                _ => {
                    registry.register(conversion.command.clone(), Arc::new(ParamsConversion));
                }
            }
        }
        registry
    }
}

/// Replay `script` on simulated time, starting with the bootstrap request,
/// and return every outbound effect. Timers still armed after the last
/// event are run out.
pub fn replay(script: &ReplayScript, cfg: &ConfigFile) -> Result<Vec<Emitted>> {
    validate_config(cfg).map_err(|e| RecalcError::ConfigError(format!("{e:#}")))?;

    let registry = Arc::new(script.build_registry());
    let mut sim = SimulatedRuntime::new(CoreRuntime::new(cfg, registry));

    sim.bootstrap();
    for event in &script.event {
        sim.dispatch_at(event.at(), event.to_runtime_event()?);
    }
    let end = sim.settle();

    info!(
        events = script.event.len(),
        effects = sim.emitted().len(),
        end_ms = end.as_millis(),
        "replay finished"
    );
    Ok(sim.take_emitted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Effect;
    use crate::session::ProgressCall;

    const SCRIPT: &str = r#"
[[conversion]]
command = "sheet.mutation.set-range-values"

[[conversion]]
command = "sheet.mutation.insert-row"
source = "static"
dirty = { dirtyNameMap = { u1 = { s1 = true } } }

[[event]]
at_ms = 0
notification = { stageInfo = { stage = "START_DEPENDENCY" } }

[[event]]
at_ms = 10
notification = { functionsExecutedState = "SUCCESS" }

[[event]]
at_ms = 20
command = "sheet.mutation.insert-row"
"#;

    #[test]
    fn parses_conversions_and_events() {
        let script = ReplayScript::from_toml_str(SCRIPT).unwrap();
        assert_eq!(script.conversion.len(), 2);
        assert_eq!(script.conversion[0].source, ConversionSource::Params);
        assert_eq!(script.event.len(), 3);

        let registry = script.build_registry();
        assert!(registry.contains("sheet.mutation.insert-row"));
        assert!(registry.contains("sheet.mutation.set-range-values"));
    }

    #[test]
    fn replay_flushes_after_debounce() {
        let script = ReplayScript::from_toml_str(SCRIPT).unwrap();
        let emitted = replay(&script, &ConfigFile::default()).unwrap();

        let starts: Vec<_> = emitted
            .iter()
            .filter_map(|e| match &e.effect {
                Effect::StartCalculation(r) => Some((e.at.as_millis(), r.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 2);
        assert!(starts[0].1.force_calculation);
        assert_eq!(starts[1].0, 120);
        assert_eq!(starts[1].1.dirty.dirty_name_map.get("u1", "s1"), Some(true));

        // A 10ms session never shows the indicator.
        assert!(!emitted.iter().any(|e| matches!(e.effect, Effect::Progress(ProgressCall::InsertTaskCount { .. }))));
    }

    #[test]
    fn replay_refuses_invalid_config() {
        let script = ReplayScript::from_toml_str(SCRIPT).unwrap();
        let mut cfg = ConfigFile::default();
        cfg.scheduler.progress_throttle_ms = 0;

        let err = replay(&script, &cfg).unwrap_err();
        assert!(matches!(err, RecalcError::ConfigError(_)));
    }

    #[test]
    fn rejects_out_of_order_events() {
        let err = ReplayScript::from_toml_str(
            r#"
[[event]]
at_ms = 50
command = "a"

[[event]]
at_ms = 10
command = "b"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecalcError::ScriptError(_)));
    }

    #[test]
    fn rejects_event_with_both_payloads() {
        let err = ReplayScript::from_toml_str(
            r#"
[[event]]
at_ms = 0
command = "a"
notification = { functionsExecutedState = "SUCCESS" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecalcError::ScriptError(_)));
    }

    #[test]
    fn rejects_static_conversion_without_table() {
        let err = ReplayScript::from_toml_str(
            r#"
[[conversion]]
command = "a"
source = "static"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RecalcError::ScriptError(_)));
    }
}
