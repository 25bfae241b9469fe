// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::batch::{CalculationStartRequest, EditBatcher, ResolvedBatch};
use crate::clock::Timestamp;
use crate::command::Command;
use crate::engine::{TimerId, TimerKind};
use crate::session::{
    CalculationNotification, CalculationStage, ExecutedState, ProgressCall, SessionTracker,
};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Ask the calculation engine to recalculate.
    StartCalculation(CalculationStartRequest),
    /// Call the progress widget.
    Progress(ProgressCall),
    /// Arm a single-shot timer, replacing any armed timer of the same kind.
    ScheduleTimer { timer: TimerId, delay: Duration },
    /// Disarm the timer of this kind, if any.
    CancelTimer(TimerKind),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle an executed command that is not a progress notification.
pub fn handle_command_executed(batcher: &mut EditBatcher, command: Command) -> CoreStep {
    let mut commands = Vec::new();
    batcher.on_command_executed(command, &mut commands);
    CoreStep::running(commands)
}

/// Handle a notification command: decode its params, then dispatch.
pub fn handle_notification_command(
    batcher: &mut EditBatcher,
    tracker: &mut SessionTracker,
    command: &Command,
    now: Timestamp,
) -> CoreStep {
    match CalculationNotification::from_params(&command.params) {
        Ok(notification) => handle_notification(batcher, tracker, notification, now),
        Err(err) => {
            warn!(command = %command.id, error = %err, "ignoring malformed calculation notification");
            CoreStep::running(Vec::new())
        }
    }
}

/// Handle a decoded progress notification.
///
/// A dependency build ties the new session to its in-flight batch; the
/// other stages only concern the tracker. Terminal notifications first
/// settle the session's batch (retry or drop), then let the tracker close
/// the session.
pub fn handle_notification(
    batcher: &mut EditBatcher,
    tracker: &mut SessionTracker,
    notification: CalculationNotification,
    now: Timestamp,
) -> CoreStep {
    let mut commands = Vec::new();

    match notification {
        CalculationNotification::Stage(info) => {
            if info.stage == CalculationStage::StartDependency {
                batcher.on_session_started();
            }
            tracker.on_stage(&info, now, &mut commands);
        }
        CalculationNotification::Executed(state) => {
            let resolved = batcher.resolve(state, now);
            log_execution_result(state, resolved.as_ref());
            tracker.on_executed(state, now, &mut commands);
            if tracker.live_sessions() == 0 {
                batcher.on_sessions_idle();
            }
        }
    }

    CoreStep::running(commands)
}

fn log_execution_result(state: ExecutedState, resolved: Option<&ResolvedBatch>) {
    let elapsed_ms = resolved.map(|r| r.elapsed.as_millis() as u64);
    match state {
        ExecutedState::Success => {
            info!(?state, elapsed_ms, "execution result: {}", state.describe());
        }
        ExecutedState::StopExecution => {
            let requeued = resolved.map_or(0, |r| r.commands);
            info!(?state, elapsed_ms, requeued, "execution result: {}", state.describe());
        }
        ExecutedState::NotExecuted | ExecutedState::Initial => {
            debug!(?state, elapsed_ms, "execution result: {}", state.describe());
        }
    }
}

/// Route a timer expiry to its owner.
pub fn handle_timer(
    batcher: &mut EditBatcher,
    tracker: &mut SessionTracker,
    timer: TimerId,
    now: Timestamp,
) -> CoreStep {
    let mut commands = Vec::new();

    match timer.kind {
        TimerKind::Debounce => {
            batcher.on_timer(timer, now, &mut commands);
        }
        TimerKind::ProgressDelay | TimerKind::Throttle(_) => {
            tracker.on_timer(timer, now, &mut commands);
        }
    }

    CoreStep::running(commands)
}
