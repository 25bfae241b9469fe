// src/engine/timers.rs

//! Single-shot timer bookkeeping for the pure core.
//!
//! The core never sleeps. It asks the shell to arm a timer of a given
//! [`TimerKind`] and later receives `RuntimeEvent::TimerFired` carrying the
//! [`TimerId`] it handed out. Each slot holds at most one armed timer; arming
//! again replaces it (the generation moves on), so a late fire from the
//! replaced timer is recognised as stale and dropped.

use std::time::Duration;

use tracing::debug;

use crate::engine::event_handlers::CoreCommand;
use crate::engine::{TimerId, TimerKind};

#[derive(Debug, Clone)]
pub struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    armed: bool,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Arm (or re-arm) the timer. Any previously armed timer of this slot
    /// becomes stale.
    pub fn arm(&mut self, delay: Duration, out: &mut Vec<CoreCommand>) -> TimerId {
        self.generation += 1;
        self.armed = true;
        let timer = TimerId {
            kind: self.kind,
            generation: self.generation,
        };
        debug!(?timer, delay_ms = delay.as_millis() as u64, "arming timer");
        out.push(CoreCommand::ScheduleTimer { timer, delay });
        timer
    }

    /// Cancel the armed timer, if any. Returns whether one was armed.
    pub fn cancel(&mut self, out: &mut Vec<CoreCommand>) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        debug!(kind = ?self.kind, generation = self.generation, "cancelling timer");
        out.push(CoreCommand::CancelTimer(self.kind));
        true
    }

    /// Consume a fire notification. Returns `true` only for the currently
    /// armed generation; the slot is disarmed in that case.
    pub fn fire(&mut self, timer: TimerId) -> bool {
        if timer.kind != self.kind || !self.armed || timer.generation != self.generation {
            return false;
        }
        self.armed = false;
        true
    }
}
