// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s stamped with the current time and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The shell (`engine::runtime::Runtime`, or `engine::replay` in simulated
//! time) is responsible for:
//! - reading events from channels
//! - arming and cancelling real timers
//! - forwarding start requests and progress calls to their backends
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels or real time.

use std::sync::Arc;

use crate::batch::{BatcherSettings, EditBatcher};
use crate::clock::Timestamp;
use crate::config::ConfigFile;
use crate::dirty::DirtyConversionRegistry;
use crate::engine::event_handlers::{
    handle_command_executed, handle_notification, handle_notification_command, handle_timer,
    CoreStep,
};
use crate::engine::RuntimeEvent;
use crate::session::{SessionTracker, TrackerSettings};

/// Pure core runtime state.
///
/// This owns:
/// - the edit batcher (pending and in-flight batches, debounce timer)
/// - the session tracker (live sessions, progress indicator state)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    batcher: EditBatcher,
    tracker: SessionTracker,
    notification_command: String,
}

impl CoreRuntime {
    pub fn new(cfg: &ConfigFile, registry: Arc<DirtyConversionRegistry>) -> Self {
        Self::with_settings(
            BatcherSettings::from_config(cfg),
            TrackerSettings::from_config(cfg),
            cfg.commands.calculation_notification_mutation.clone(),
            registry,
        )
    }

    pub fn with_settings(
        batcher: BatcherSettings,
        tracker: TrackerSettings,
        notification_command: String,
        registry: Arc<DirtyConversionRegistry>,
    ) -> Self {
        Self {
            batcher: EditBatcher::new(batcher, registry),
            tracker: SessionTracker::new(tracker),
            notification_command,
        }
    }

    pub fn batcher(&self) -> &EditBatcher {
        &self.batcher
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// The unconditional first calculation request.
    pub fn bootstrap(&mut self, now: Timestamp) -> CoreStep {
        let mut commands = Vec::new();
        self.batcher.bootstrap(now, &mut commands);
        CoreStep::running(commands)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: Timestamp) -> CoreStep {
        match event {
            RuntimeEvent::CommandExecuted(command) => {
                if command.id == self.notification_command {
                    handle_notification_command(&mut self.batcher, &mut self.tracker, &command, now)
                } else {
                    handle_command_executed(&mut self.batcher, command)
                }
            }
            RuntimeEvent::Notification(notification) => {
                handle_notification(&mut self.batcher, &mut self.tracker, notification, now)
            }
            RuntimeEvent::TimerFired(timer) => {
                handle_timer(&mut self.batcher, &mut self.tracker, timer, now)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
