#![allow(dead_code)]

use std::sync::Arc;

use recalc_scheduler::command::{ids, Command, ExecOptions};
use recalc_scheduler::config::{validate_config, ConfigFile};
use recalc_scheduler::dirty::{
    CellRange, DirtyConversion, DirtyConversionRegistry, DirtyDescriptor, ParamsConversion,
    StaticConversion, UnitRange,
};
use serde_json::json;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: ConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigFile::default(),
        }
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.scheduler.debounce_ms = ms;
        self
    }

    pub fn progress_delay_ms(mut self, ms: u64) -> Self {
        self.config.scheduler.progress_delay_ms = ms;
        self
    }

    pub fn progress_throttle_ms(mut self, ms: u64) -> Self {
        self.config.scheduler.progress_throttle_ms = ms;
        self
    }

    pub fn progress_overhead(mut self, overhead: u64) -> Self {
        self.config.scheduler.progress_overhead = overhead;
        self
    }

    pub fn cosmetic_trigger(mut self, trigger: &str) -> Self {
        self.config.commands.cosmetic_triggers.push(trigger.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        validate_config(&self.config).expect("Failed to build valid config from builder");
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the host's conversion registry.
pub struct RegistryBuilder {
    registry: DirtyConversionRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: DirtyConversionRegistry::new(),
        }
    }

    /// The range-value mutation reads its descriptor from `params.dirty`.
    pub fn with_range_values(self) -> Self {
        self.with(ids::SET_RANGE_VALUES_MUTATION, Arc::new(ParamsConversion))
    }

    pub fn with_static(self, command: &str, dirty: DirtyDescriptor) -> Self {
        self.with(command, Arc::new(StaticConversion(dirty)))
    }

    pub fn with(self, command: &str, conversion: Arc<dyn DirtyConversion>) -> Self {
        self.registry.register(command, conversion);
        self
    }

    pub fn build(self) -> Arc<DirtyConversionRegistry> {
        Arc::new(self.registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `DirtyDescriptor` with short helpers for single cells.
#[derive(Default)]
pub struct DescriptorBuilder {
    dirty: DirtyDescriptor,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, unit: &str, sheet: &str, row: u32, column: u32) -> Self {
        self.dirty = self
            .dirty
            .with_range(UnitRange::new(unit, sheet, CellRange::cell(row, column)));
        self
    }

    pub fn name(mut self, unit: &str, sheet: &str, flag: bool) -> Self {
        self.dirty = self.dirty.with_name(unit, sheet, flag);
        self
    }

    pub fn feature(mut self, unit: &str, sheet: &str, id: &str, flag: bool) -> Self {
        self.dirty = self.dirty.with_feature(unit, sheet, id, flag);
        self
    }

    pub fn build(self) -> DirtyDescriptor {
        self.dirty
    }
}

/// A range-value edit whose `params.dirty` marks one cell.
pub fn range_edit(unit: &str, sheet: &str, row: u32, column: u32) -> Command {
    let dirty = DescriptorBuilder::new().cell(unit, sheet, row, column).build();
    Command::new(ids::SET_RANGE_VALUES_MUTATION, json!({ "dirty": dirty }))
}

/// A range-value edit fired by a cosmetic command.
pub fn cosmetic_edit(trigger: &str) -> Command {
    Command::new(ids::SET_RANGE_VALUES_MUTATION, json!({ "trigger": trigger }))
}

/// A range-value edit replicated from a collaborator.
pub fn local_edit(unit: &str, sheet: &str) -> Command {
    range_edit(unit, sheet, 0, 0).with_options(ExecOptions::local_only())
}
