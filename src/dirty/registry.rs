// src/dirty/registry.rs

//! Command id -> dirty conversion lookup.
//!
//! The registry is owned by the host application (which registers one
//! conversion per recalculation-relevant command) and is only queried by
//! the scheduler. A command without a registered conversion is not
//! recalculation-relevant.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::command::Command;
use crate::dirty::descriptor::DirtyDescriptor;

/// Extracts the dirty descriptor produced by one executed command.
pub trait DirtyConversion: Send + Sync {
    fn dirty_data(&self, command: &Command) -> DirtyDescriptor;
}

impl<F> DirtyConversion for F
where
    F: Fn(&Command) -> DirtyDescriptor + Send + Sync,
{
    fn dirty_data(&self, command: &Command) -> DirtyDescriptor {
        self(command)
    }
}

/// Always reports the same descriptor.
#[derive(Debug, Clone, Default)]
pub struct StaticConversion(pub DirtyDescriptor);

impl DirtyConversion for StaticConversion {
    fn dirty_data(&self, _command: &Command) -> DirtyDescriptor {
        self.0.clone()
    }
}

/// Reads the descriptor from the command's `dirty` parameter.
///
/// Malformed or missing payloads contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamsConversion;

impl DirtyConversion for ParamsConversion {
    fn dirty_data(&self, command: &Command) -> DirtyDescriptor {
        let Some(payload) = command.params.get("dirty") else {
            return DirtyDescriptor::default();
        };
        match serde_json::from_value(payload.clone()) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(
                    command = %command.id,
                    error = %err,
                    "malformed dirty payload; contributing nothing"
                );
                DirtyDescriptor::default()
            }
        }
    }
}

#[derive(Default)]
pub struct DirtyConversionRegistry {
    conversions: RwLock<HashMap<String, Arc<dyn DirtyConversion>>>,
}

impl fmt::Debug for DirtyConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.conversions.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<&String> = guard.keys().collect();
        ids.sort();
        f.debug_struct("DirtyConversionRegistry")
            .field("commands", &ids)
            .finish()
    }
}

impl DirtyConversionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the conversion for `command_id`.
    pub fn register(
        &self,
        command_id: impl Into<String>,
        conversion: Arc<dyn DirtyConversion>,
    ) -> Option<Arc<dyn DirtyConversion>> {
        let command_id = command_id.into();
        debug!(command = %command_id, "registering dirty conversion");
        self.conversions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command_id, conversion)
    }

    /// Returns `true` if a conversion was removed.
    pub fn deregister(&self, command_id: &str) -> bool {
        let removed = self
            .conversions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(command_id)
            .is_some();
        if removed {
            debug!(command = %command_id, "deregistered dirty conversion");
        }
        removed
    }

    pub fn get(&self, command_id: &str) -> Option<Arc<dyn DirtyConversion>> {
        self.conversions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command_id)
            .cloned()
    }

    pub fn contains(&self, command_id: &str) -> bool {
        self.conversions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(command_id)
    }

    pub fn len(&self) -> usize {
        self.conversions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
