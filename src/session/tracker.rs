// src/session/tracker.rs

//! Calculation session tracker.
//!
//! Several recalculations can be in flight at once (a new edit is flushed
//! before the previous session reported its end), but the user only ever
//! sees a single progress indicator. The tracker:
//!
//! - counts live sessions (`START_DEPENDENCY` increments, any terminal
//!   notification decrements, clamped at zero)
//! - delays opening the indicator by `progress_delay` so recalculations
//!   that finish quickly never flash it
//! - latches each metric's total once per burst, on its first
//!   `completed == 1` notification
//! - forwards throttled completed-count deltas through the
//!   [`ProgressReporter`] while the indicator is visible
//! - completes or stops the indicator when the last live session ends, then
//!   resets everything for the next burst

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Timestamp;
use crate::config::ConfigFile;
use crate::engine::event_handlers::CoreCommand;
use crate::engine::timers::TimerSlot;
use crate::engine::{TimerId, TimerKind};
use crate::session::notification::{CalculationStage, ExecutedState, Metric, StageInfo};
use crate::session::progress::{ProgressCall, ProgressReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// How long a session must run before the indicator opens.
    pub progress_delay: Duration,
    /// Minimum spacing between two pushes of the same metric.
    pub progress_throttle: Duration,
    /// Fixed task-count overhead added to the estimated remaining work.
    pub progress_overhead: u64,
    /// First push after the indicator opens.
    pub initial_progress: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            progress_delay: Duration::from_millis(1000),
            progress_throttle: Duration::from_millis(300),
            progress_overhead: 100,
            initial_progress: 5,
        }
    }
}

impl TrackerSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let s = &cfg.scheduler;
        Self {
            progress_delay: Duration::from_millis(s.progress_delay_ms),
            progress_throttle: Duration::from_millis(s.progress_throttle_ms),
            progress_overhead: s.progress_overhead,
            initial_progress: s.initial_progress,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MetricTotals {
    total: u64,
    latched: bool,
}

#[derive(Debug)]
pub struct SessionTracker {
    settings: TrackerSettings,
    live_sessions: u32,
    sessions_started: u64,
    progress_timer: TimerSlot,
    progress_visible: bool,
    scalar: MetricTotals,
    array: MetricTotals,
    reporter: ProgressReporter,
}

impl SessionTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            live_sessions: 0,
            sessions_started: 0,
            progress_timer: TimerSlot::new(TimerKind::ProgressDelay),
            progress_visible: false,
            scalar: MetricTotals::default(),
            array: MetricTotals::default(),
            reporter: ProgressReporter::new(settings.progress_throttle),
        }
    }

    /// Sessions that started and have not reported a terminal state yet.
    pub fn live_sessions(&self) -> u32 {
        self.live_sessions
    }

    /// Total number of sessions seen since construction.
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    pub fn is_progress_visible(&self) -> bool {
        self.progress_visible
    }

    /// The deferred indicator timer is armed and has not fired yet.
    pub fn is_progress_pending(&self) -> bool {
        self.progress_timer.is_armed()
    }

    /// Latched total for `metric` in the current burst.
    pub fn latched_total(&self, metric: Metric) -> u64 {
        self.totals(metric).total
    }

    /// Completed count last recorded for `metric`.
    pub fn recorded_done(&self, metric: Metric) -> u64 {
        self.reporter.recorded(metric)
    }

    fn totals(&self, metric: Metric) -> &MetricTotals {
        match metric {
            Metric::Scalar => &self.scalar,
            Metric::Array => &self.array,
        }
    }

    fn totals_mut(&mut self, metric: Metric) -> &mut MetricTotals {
        match metric {
            Metric::Scalar => &mut self.scalar,
            Metric::Array => &mut self.array,
        }
    }

    /// Handle a `stageInfo` notification.
    pub fn on_stage(&mut self, info: &StageInfo, now: Timestamp, out: &mut Vec<CoreCommand>) {
        match info.stage {
            CalculationStage::StartDependency => self.on_dependency_build(out),
            CalculationStage::Calculating | CalculationStage::CalculatingArray => {
                if let Some(metric) = info.metric() {
                    self.on_calculating(metric, info, now, out);
                }
            }
        }
    }

    fn on_dependency_build(&mut self, out: &mut Vec<CoreCommand>) {
        self.live_sessions += 1;
        self.sessions_started += 1;
        debug!(
            session = self.sessions_started,
            live_sessions = self.live_sessions,
            "calculation session building dependencies"
        );
        self.progress_timer.arm(self.settings.progress_delay, out);
    }

    fn on_calculating(
        &mut self,
        metric: Metric,
        info: &StageInfo,
        now: Timestamp,
        out: &mut Vec<CoreCommand>,
    ) {
        let (total, completed) = info.counts(metric);

        let totals = self.totals_mut(metric);
        if completed == 1 && !totals.latched {
            totals.latched = true;
            totals.total += total;
            debug!(?metric, total, latched_total = totals.total, "latched metric total");
        }

        if self.progress_visible {
            self.reporter.push_delta(metric, completed, now, out);
        } else {
            self.reporter.record(metric, completed);
        }
    }

    /// Handle a throttle or deferred-indicator timer. Returns `false` for
    /// timers that are not the tracker's or are stale.
    pub fn on_timer(&mut self, timer: TimerId, now: Timestamp, out: &mut Vec<CoreCommand>) -> bool {
        match timer.kind {
            TimerKind::ProgressDelay => self.on_progress_delay(timer, out),
            TimerKind::Throttle(_) => self.reporter.on_timer(timer, now, out),
            TimerKind::Debounce => false,
        }
    }

    fn on_progress_delay(&mut self, timer: TimerId, out: &mut Vec<CoreCommand>) -> bool {
        if !self.progress_timer.fire(timer) {
            debug!(?timer, "ignoring stale progress timer");
            return false;
        }
        if self.live_sessions == 0 {
            debug!("progress timer fired with no live session; ignoring");
            return false;
        }

        let remaining_scalar = self
            .scalar
            .total
            .saturating_sub(self.reporter.recorded(Metric::Scalar));
        let remaining_array = self
            .array
            .total
            .saturating_sub(self.reporter.recorded(Metric::Array));
        let task_count = remaining_scalar + remaining_array + self.settings.progress_overhead;

        info!(
            live_sessions = self.live_sessions,
            task_count, "recalculation is taking a while; showing progress"
        );
        out.push(CoreCommand::Progress(ProgressCall::InsertTaskCount {
            count: task_count,
        }));
        out.push(CoreCommand::Progress(ProgressCall::PushTask {
            count: self.settings.initial_progress,
        }));
        self.progress_visible = true;
        true
    }

    /// Handle a terminal notification.
    pub fn on_executed(&mut self, state: ExecutedState, now: Timestamp, out: &mut Vec<CoreCommand>) {
        if self.live_sessions == 0 {
            warn!(
                ?state,
                "terminal notification without a matching dependency build; clamping session count at zero"
            );
            return;
        }

        self.live_sessions -= 1;
        debug!(?state, live_sessions = self.live_sessions, "calculation session ended");

        if self.live_sessions == 0 {
            self.finish_burst(state, now, out);
        }
    }

    /// Last live session ended: close the indicator and reset.
    fn finish_burst(&mut self, state: ExecutedState, now: Timestamp, out: &mut Vec<CoreCommand>) {
        if self.progress_timer.cancel(out) {
            debug!("recalculation ended before progress delay; indicator never shown");
        }

        if self.progress_visible {
            self.reporter.flush_held_back(now, out);
            match state {
                ExecutedState::Success => out.push(CoreCommand::Progress(ProgressCall::Complete)),
                ExecutedState::StopExecution => out.push(CoreCommand::Progress(ProgressCall::Stop)),
                ExecutedState::NotExecuted | ExecutedState::Initial => {
                    debug!(?state, "leaving progress indicator as-is");
                }
            }
        }

        self.progress_visible = false;
        self.scalar = MetricTotals::default();
        self.array = MetricTotals::default();
        self.reporter.reset(out);
    }
}
