// src/engine/replay.rs

//! Deterministic driver for [`CoreRuntime`] on simulated time.
//!
//! Timers armed by the core are kept in a table of deadlines instead of
//! being slept on. Moving the clock forward fires every due timer in
//! deadline order (ties in arming order), each at its own deadline. The
//! command-line replay and most integration tests use this driver.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::batch::CalculationStartRequest;
use crate::clock::Timestamp;
use crate::engine::core::CoreRuntime;
use crate::engine::event_handlers::{CoreCommand, CoreStep};
use crate::engine::{RuntimeEvent, TimerId, TimerKind};
use crate::session::ProgressCall;

const MAX_SETTLE_STEPS: usize = 10_000;

/// An outbound effect of the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartCalculation(CalculationStartRequest),
    Progress(ProgressCall),
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::StartCalculation(request) => match serde_json::to_string(request) {
                Ok(json) => write!(f, "startCalculation {json}"),
                Err(_) => write!(f, "startCalculation {request:?}"),
            },
            Effect::Progress(call) => write!(f, "progress {call}"),
        }
    }
}

/// An effect and the simulated time it happened at.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    pub at: Timestamp,
    pub effect: Effect,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    id: TimerId,
    deadline: Timestamp,
    seq: u64,
}

#[derive(Debug)]
pub struct SimulatedRuntime {
    core: CoreRuntime,
    now: Timestamp,
    timers: HashMap<TimerKind, ArmedTimer>,
    next_seq: u64,
    emitted: Vec<Emitted>,
    running: bool,
}

impl SimulatedRuntime {
    pub fn new(core: CoreRuntime) -> Self {
        Self {
            core,
            now: Timestamp::ZERO,
            timers: HashMap::new(),
            next_seq: 0,
            emitted: Vec::new(),
            running: true,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn core(&self) -> &CoreRuntime {
        &self.core
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Deadline of the armed timer of `kind`, if any.
    pub fn timer_deadline(&self, kind: TimerKind) -> Option<Timestamp> {
        self.timers.get(&kind).map(|t| t.deadline)
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn bootstrap(&mut self) {
        let step = self.core.bootstrap(self.now);
        self.apply(step);
    }

    /// Deliver `event` at the current time.
    pub fn dispatch(&mut self, event: RuntimeEvent) {
        if !self.running {
            warn!(?event, "simulated runtime stopped; dropping event");
            return;
        }
        let step = self.core.step(event, self.now);
        self.apply(step);
    }

    /// Move time to `at` (firing due timers), then deliver `event`.
    pub fn dispatch_at(&mut self, at: Timestamp, event: RuntimeEvent) {
        self.advance_to(at);
        self.dispatch(event);
    }

    /// Fire every timer due at or before `target`, then set the clock to
    /// `target` (time never moves backwards).
    pub fn advance_to(&mut self, target: Timestamp) {
        while let Some(timer) = self.next_due(target) {
            self.timers.remove(&timer.id.kind);
            self.now = self.now.max(timer.deadline);
            if !self.running {
                continue;
            }
            let step = self.core.step(RuntimeEvent::TimerFired(timer.id), self.now);
            self.apply(step);
        }
        self.now = self.now.max(target);
    }

    pub fn advance_by(&mut self, by: Duration) {
        self.advance_to(self.now + by);
    }

    /// Fire timers until none are armed. Returns the time reached.
    pub fn settle(&mut self) -> Timestamp {
        for _ in 0..MAX_SETTLE_STEPS {
            let Some(next) = self.timers.values().map(|t| t.deadline).min() else {
                return self.now;
            };
            self.advance_to(next);
        }
        warn!(armed = self.timers.len(), "timers kept re-arming; giving up settling");
        self.now
    }

    pub fn emitted(&self) -> &[Emitted] {
        &self.emitted
    }

    pub fn take_emitted(&mut self) -> Vec<Emitted> {
        std::mem::take(&mut self.emitted)
    }

    pub fn start_requests(&self) -> Vec<(Timestamp, &CalculationStartRequest)> {
        self.emitted
            .iter()
            .filter_map(|e| match &e.effect {
                Effect::StartCalculation(request) => Some((e.at, request)),
                Effect::Progress(_) => None,
            })
            .collect()
    }

    pub fn progress_calls(&self) -> Vec<ProgressCall> {
        self.emitted
            .iter()
            .filter_map(|e| match e.effect {
                Effect::Progress(call) => Some(call),
                Effect::StartCalculation(_) => None,
            })
            .collect()
    }

    fn next_due(&self, target: Timestamp) -> Option<ArmedTimer> {
        self.timers
            .values()
            .filter(|t| t.deadline <= target)
            .min_by_key(|t| (t.deadline, t.seq))
            .copied()
    }

    fn apply(&mut self, step: CoreStep) {
        for command in step.commands {
            match command {
                CoreCommand::StartCalculation(request) => self.emitted.push(Emitted {
                    at: self.now,
                    effect: Effect::StartCalculation(request),
                }),
                CoreCommand::Progress(call) => self.emitted.push(Emitted {
                    at: self.now,
                    effect: Effect::Progress(call),
                }),
                CoreCommand::ScheduleTimer { timer, delay } => {
                    self.next_seq += 1;
                    self.timers.insert(
                        timer.kind,
                        ArmedTimer {
                            id: timer,
                            deadline: self.now + delay,
                            seq: self.next_seq,
                        },
                    );
                }
                CoreCommand::CancelTimer(kind) => {
                    self.timers.remove(&kind);
                }
            }
        }
        if !step.keep_running {
            self.running = false;
        }
    }
}
