// src/engine/mod.rs

//! Orchestration engine for the recalculation scheduler.
//!
//! This module ties together:
//! - the edit batcher (what to recalculate, and when)
//! - the session tracker (how far along running recalculations are)
//! - the runtime event loop that reacts to:
//!   - executed commands from the host command bus
//!   - progress notifications from the calculation engine
//!   - timer expiries
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`], and [`replay`] drives the same core on
//! simulated time.

use crate::command::Command;
use crate::session::{CalculationNotification, Metric};

/// What a timer is for. At most one timer per kind is armed at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Quiet period of the edit batcher.
    Debounce,
    /// Deferred opening of the progress indicator.
    ProgressDelay,
    /// Trailing edge of a metric's progress throttle.
    Throttle(Metric),
}

/// A specific arming of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Events flowing into the runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The host command bus executed a command.
    CommandExecuted(Command),
    /// The calculation engine reported progress (already decoded).
    Notification(CalculationNotification),
    /// A timer armed by the core expired.
    TimerFired(TimerId),
    /// Graceful shutdown requested.
    ShutdownRequested,
}

pub mod backend;
pub mod core;
pub mod event_handlers;
pub mod replay;
pub mod runtime;
pub mod timers;

pub use backend::{CalculationBackend, ChannelCalculationBackend, ProgressSink, TracingProgressSink};
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use replay::{Effect, Emitted, SimulatedRuntime};
pub use runtime::Runtime;
