// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::{Clock, TokioClock};
use crate::errors::Result;

use super::backend::{CalculationBackend, ProgressSink};
use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, TimerId, TimerKind};

/// Drives the core in response to `RuntimeEvent`s, arms real timers, and
/// delegates start requests and progress calls to their backends.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics. Events are handled strictly one at a time, which
/// is the serialization the core relies on.
pub struct Runtime<B: CalculationBackend, P: ProgressSink> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    /// Timers feed back into our own channel without keeping it open.
    timer_tx: mpsc::WeakSender<RuntimeEvent>,
    clock: Arc<dyn Clock>,
    backend: B,
    progress: P,
    timers: HashMap<TimerKind, JoinHandle<()>>,
    bootstrap: bool,
}

impl<B: CalculationBackend, P: ProgressSink> fmt::Debug for Runtime<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("armed_timers", &self.timers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<B: CalculationBackend, P: ProgressSink> Runtime<B, P> {
    /// `event_tx` must be a sender of the channel `event_rx` belongs to.
    pub fn new(
        core: CoreRuntime,
        event_tx: &mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
        progress: P,
    ) -> Self {
        Self {
            core,
            event_rx,
            timer_tx: event_tx.downgrade(),
            clock: Arc::new(TokioClock::new()),
            backend,
            progress,
            timers: HashMap::new(),
            bootstrap: true,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Do not issue the initial forced calculation on start.
    pub fn skip_bootstrap(mut self) -> Self {
        self.bootstrap = false;
        self
    }

    /// Main event loop.
    ///
    /// - Issues the initial forced calculation (unless skipped).
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core.
    pub async fn run(mut self) -> Result<()> {
        info!("recalc scheduler runtime started");

        if self.bootstrap {
            let step = self.core.bootstrap(self.clock.now());
            for command in step.commands {
                self.execute_command(command).await?;
            }
        }

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let now = self.clock.now();
            let step = self.core.step(event, now);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.abort_timers();
        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartCalculation(request) => {
                debug!(
                    ranges = request.dirty.dirty_ranges.len(),
                    force = request.force_calculation,
                    "dispatching calculation start request"
                );
                self.backend.start_calculation(request).await?;
            }
            CoreCommand::Progress(call) => {
                self.progress.apply(call);
            }
            CoreCommand::ScheduleTimer { timer, delay } => {
                self.schedule_timer(timer, delay);
            }
            CoreCommand::CancelTimer(kind) => {
                if let Some(handle) = self.timers.remove(&kind) {
                    handle.abort();
                }
            }
        }
        Ok(())
    }

    fn schedule_timer(&mut self, timer: TimerId, delay: Duration) {
        if let Some(previous) = self.timers.remove(&timer.kind) {
            previous.abort();
        }

        let tx = self.timer_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(tx) = tx.upgrade() else {
                return;
            };
            if tx.send(RuntimeEvent::TimerFired(timer)).await.is_err() {
                debug!(?timer, "runtime gone before timer fired");
            }
        });
        self.timers.insert(timer.kind, handle);
    }

    fn abort_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
