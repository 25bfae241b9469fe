// src/batch/batcher.rs

//! The edit batcher.
//!
//! Executed commands that can change computed values are appended to the
//! pending batch; every admitted command re-arms a single debounce timer.
//! When the timer fires the pending batch becomes an in-flight batch and a
//! single start request carrying the merged dirty descriptor is emitted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::batch::in_flight::{ActiveBatch, InFlightBatches};
use crate::batch::request::CalculationStartRequest;
use crate::clock::Timestamp;
use crate::command::Command;
use crate::config::ConfigFile;
use crate::dirty::{merge, DirtyConversionRegistry, DirtyDescriptor};
use crate::engine::event_handlers::CoreCommand;
use crate::engine::timers::TimerSlot;
use crate::engine::{TimerId, TimerKind};
use crate::session::ExecutedState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherSettings {
    /// Quiet period after the last admitted command before flushing.
    pub debounce: Duration,
    /// The range-value mutation, subject to the extra filters below.
    pub range_values_mutation: String,
    /// Originating commands that never change computed values.
    pub cosmetic_triggers: Vec<String>,
}

impl Default for BatcherSettings {
    fn default() -> Self {
        Self::from_config(&ConfigFile::default())
    }
}

impl BatcherSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            debounce: Duration::from_millis(cfg.scheduler.debounce_ms),
            range_values_mutation: cfg.commands.range_values_mutation.clone(),
            cosmetic_triggers: cfg.commands.cosmetic_triggers.clone(),
        }
    }
}

/// Whether an executed command joins the pending batch, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Queue,
    /// No dirty conversion registered: not recalculation-relevant.
    NoConversion,
    /// Range-value mutation applied locally only.
    LocalOnly,
    /// Range-value mutation caused by a cosmetic command.
    CosmeticTrigger(String),
}

/// What a terminal notification did to the oldest in-flight batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBatch {
    pub commands: usize,
    pub elapsed: Duration,
    pub requeued: bool,
    pub bootstrap: bool,
}

#[derive(Debug)]
pub struct EditBatcher {
    settings: BatcherSettings,
    registry: Arc<DirtyConversionRegistry>,
    pending: Vec<Command>,
    /// Where the next stopped batch is spliced back into `pending`. Retried
    /// commands stay ahead of newer ones and keep their relative order.
    requeue_cursor: usize,
    debounce: TimerSlot,
    in_flight: InFlightBatches,
}

impl EditBatcher {
    pub fn new(settings: BatcherSettings, registry: Arc<DirtyConversionRegistry>) -> Self {
        Self {
            settings,
            registry,
            pending: Vec::new(),
            requeue_cursor: 0,
            debounce: TimerSlot::new(TimerKind::Debounce),
            in_flight: InFlightBatches::new(),
        }
    }

    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    pub fn in_flight(&self) -> &InFlightBatches {
        &self.in_flight
    }

    pub fn is_debounce_armed(&self) -> bool {
        self.debounce.is_armed()
    }

    pub fn classify(&self, command: &Command) -> Admission {
        if !self.registry.contains(&command.id) {
            return Admission::NoConversion;
        }

        if command.id == self.settings.range_values_mutation {
            if command.options.only_local {
                return Admission::LocalOnly;
            }
            if let Some(trigger) = command.trigger() {
                if self.settings.cosmetic_triggers.iter().any(|c| c == trigger) {
                    return Admission::CosmeticTrigger(trigger.to_string());
                }
            }
        }

        Admission::Queue
    }

    /// Entry point for every executed command. Returns the admission
    /// decision.
    pub fn on_command_executed(&mut self, command: Command, out: &mut Vec<CoreCommand>) -> Admission {
        let admission = self.classify(&command);
        if admission != Admission::Queue {
            debug!(command = %command.id, ?admission, "command does not trigger recalculation");
            return admission;
        }

        debug!(
            command = %command.id,
            pending = self.pending.len() + 1,
            "queued command for recalculation"
        );
        self.pending.push(command);
        self.debounce.cancel(out);
        self.debounce.arm(self.settings.debounce, out);
        admission
    }

    /// Handle the debounce timer. Returns `false` for stale timers.
    pub fn on_timer(&mut self, timer: TimerId, now: Timestamp, out: &mut Vec<CoreCommand>) -> bool {
        if !self.debounce.fire(timer) {
            debug!(?timer, "ignoring stale debounce timer");
            return false;
        }
        self.flush(now, out);
        true
    }

    /// Move the pending batch in flight and request a calculation for it.
    pub fn flush(&mut self, now: Timestamp, out: &mut Vec<CoreCommand>) {
        let batch = std::mem::take(&mut self.pending);
        self.requeue_cursor = 0;

        let dirty = self.dirty_for(&batch);
        info!(
            commands = batch.len(),
            ranges = dirty.dirty_ranges.len(),
            in_flight = self.in_flight.len() + 1,
            "flushing edit batch; requesting recalculation"
        );

        out.push(CoreCommand::StartCalculation(CalculationStartRequest::new(dirty)));
        self.in_flight.push(ActiveBatch::new(batch, now));
    }

    /// Unconditional first calculation, bypassing batching.
    pub fn bootstrap(&mut self, now: Timestamp, out: &mut Vec<CoreCommand>) {
        info!("requesting initial forced recalculation");
        out.push(CoreCommand::StartCalculation(CalculationStartRequest::bootstrap()));
        self.in_flight.push(ActiveBatch {
            bootstrap: true,
            ..ActiveBatch::new(Vec::new(), now)
        });
    }

    /// Merge the conversions of every command in `batch`. Commands whose
    /// conversion disappeared since they were queued contribute nothing.
    fn dirty_for(&self, batch: &[Command]) -> DirtyDescriptor {
        let descriptors: Vec<DirtyDescriptor> = batch
            .iter()
            .filter_map(|command| match self.registry.get(&command.id) {
                Some(conversion) => Some(conversion.dirty_data(command)),
                None => {
                    warn!(
                        command = %command.id,
                        "dirty conversion missing at flush; skipping its contribution"
                    );
                    None
                }
            })
            .collect();
        merge(&descriptors)
    }

    /// A session started: tie it to the newest batch still waiting for one.
    /// Older waiting batches never produced a session and are discarded.
    pub fn on_session_started(&mut self) {
        for batch in self.in_flight.start_session() {
            warn!(
                commands = batch.commands.len(),
                flushed_at = %batch.flushed_at,
                "in-flight batch never started a session; discarding it"
            );
        }
    }

    /// No session is live any more: started batches still in flight lost
    /// their terminal notification.
    pub fn on_sessions_idle(&mut self) {
        for batch in self.in_flight.drop_started() {
            warn!(
                commands = batch.commands.len(),
                flushed_at = %batch.flushed_at,
                "in-flight batch outlived its session; discarding it"
            );
        }
    }

    /// Apply a terminal classification to the batch of the oldest live
    /// session.
    ///
    /// `STOP_EXECUTION` puts the batch back in front of pending commands for
    /// retry on the next flush; every other state drops it.
    pub fn resolve(&mut self, state: ExecutedState, now: Timestamp) -> Option<ResolvedBatch> {
        let Some(batch) = self.in_flight.resolve() else {
            debug!(?state, "terminal notification with no in-flight batch");
            return None;
        };

        let commands = batch.commands.len();
        let requeued = state == ExecutedState::StopExecution;
        if requeued {
            let at = self.requeue_cursor.min(self.pending.len());
            self.pending.splice(at..at, batch.commands);
            self.requeue_cursor = at + commands;
            debug!(
                requeued = commands,
                pending = self.pending.len(),
                "stopped batch requeued for retry"
            );
        }

        Some(ResolvedBatch {
            commands,
            elapsed: now.saturating_since(batch.flushed_at),
            requeued,
            bootstrap: batch.bootstrap,
        })
    }
}
