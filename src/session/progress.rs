// src/session/progress.rs

//! Throttled translation of completed-count snapshots into progress
//! increments.
//!
//! For each [`Metric`] the reporter remembers the last completed count it
//! *recorded*. A push forwards `completed - recorded` and moves the record
//! forward. Pushes arriving inside the throttle window are held back; only
//! the most recent one is kept, and it is delivered when the window closes
//! or, at the latest, just before the indicator is completed or stopped.
//! Because deltas are always taken against the recorded value, nothing that
//! was coalesced is lost.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::clock::Timestamp;
use crate::engine::event_handlers::CoreCommand;
use crate::engine::timers::TimerSlot;
use crate::engine::{TimerId, TimerKind};
use crate::session::notification::Metric;

/// A call on the external progress widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "call")]
pub enum ProgressCall {
    InsertTaskCount { count: u64 },
    PushTask { count: u64 },
    Complete,
    Stop,
}

impl fmt::Display for ProgressCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressCall::InsertTaskCount { count } => write!(f, "insertTaskCount({count})"),
            ProgressCall::PushTask { count } => write!(f, "pushTask({{count: {count}}})"),
            ProgressCall::Complete => write!(f, "complete()"),
            ProgressCall::Stop => write!(f, "stop()"),
        }
    }
}

#[derive(Debug, Clone)]
struct MetricLatch {
    metric: Metric,
    recorded: u64,
    last_push_at: Option<Timestamp>,
    held_back: Option<u64>,
    trailing: TimerSlot,
}

impl MetricLatch {
    fn new(metric: Metric) -> Self {
        Self {
            metric,
            recorded: 0,
            last_push_at: None,
            held_back: None,
            trailing: TimerSlot::new(TimerKind::Throttle(metric)),
        }
    }

    fn forward(&mut self, completed: u64, now: Timestamp, out: &mut Vec<CoreCommand>) {
        let delta = completed.saturating_sub(self.recorded);
        self.recorded = completed;
        self.last_push_at = Some(now);
        if delta > 0 {
            trace!(metric = ?self.metric, completed, delta, "forwarding progress delta");
            out.push(CoreCommand::Progress(ProgressCall::PushTask { count: delta }));
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressReporter {
    throttle: Duration,
    scalar: MetricLatch,
    array: MetricLatch,
}

impl ProgressReporter {
    pub fn new(throttle: Duration) -> Self {
        Self {
            throttle,
            scalar: MetricLatch::new(Metric::Scalar),
            array: MetricLatch::new(Metric::Array),
        }
    }

    fn latch(&self, metric: Metric) -> &MetricLatch {
        match metric {
            Metric::Scalar => &self.scalar,
            Metric::Array => &self.array,
        }
    }

    fn latch_mut(&mut self, metric: Metric) -> &mut MetricLatch {
        match metric {
            Metric::Scalar => &mut self.scalar,
            Metric::Array => &mut self.array,
        }
    }

    /// Last completed count recorded for `metric`.
    pub fn recorded(&self, metric: Metric) -> u64 {
        self.latch(metric).recorded
    }

    /// Move the record forward without emitting anything (indicator hidden).
    pub fn record(&mut self, metric: Metric, completed: u64) {
        let latch = self.latch_mut(metric);
        latch.recorded = completed;
        latch.held_back = None;
    }

    /// Forward `completed - recorded` for `metric`, at most once per
    /// throttle window.
    pub fn push_delta(
        &mut self,
        metric: Metric,
        completed: u64,
        now: Timestamp,
        out: &mut Vec<CoreCommand>,
    ) {
        let throttle = self.throttle;
        let latch = self.latch_mut(metric);

        let since_last = latch.last_push_at.map(|at| now.saturating_since(at));
        match since_last {
            Some(elapsed) if elapsed < throttle => {
                latch.held_back = Some(completed);
                if !latch.trailing.is_armed() {
                    latch.trailing.arm(throttle - elapsed, out);
                }
            }
            _ => {
                latch.held_back = None;
                latch.trailing.cancel(out);
                latch.forward(completed, now, out);
            }
        }
    }

    /// Deliver a held-back push. Returns `false` if `timer` is not ours or
    /// is stale.
    pub fn on_timer(&mut self, timer: TimerId, now: Timestamp, out: &mut Vec<CoreCommand>) -> bool {
        let TimerKind::Throttle(metric) = timer.kind else {
            return false;
        };
        let latch = self.latch_mut(metric);
        if !latch.trailing.fire(timer) {
            debug!(?timer, "ignoring stale throttle timer");
            return false;
        }
        if let Some(completed) = latch.held_back.take() {
            latch.forward(completed, now, out);
        }
        true
    }

    /// Deliver every held-back push now, cancelling its trailing timer.
    pub fn flush_held_back(&mut self, now: Timestamp, out: &mut Vec<CoreCommand>) {
        for metric in [Metric::Scalar, Metric::Array] {
            let latch = self.latch_mut(metric);
            if let Some(completed) = latch.held_back.take() {
                latch.trailing.cancel(out);
                latch.forward(completed, now, out);
            }
        }
    }

    /// Drop all records and held-back pushes, cancelling trailing timers.
    pub fn reset(&mut self, out: &mut Vec<CoreCommand>) {
        for metric in [Metric::Scalar, Metric::Array] {
            let latch = self.latch_mut(metric);
            latch.trailing.cancel(out);
            *latch = MetricLatch {
                trailing: latch.trailing.clone(),
                ..MetricLatch::new(metric)
            };
        }
    }
}
