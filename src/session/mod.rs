// src/session/mod.rs

//! Calculation session tracking and progress reporting.
//!
//! - [`notification`] decodes progress notifications from the calculation
//!   engine.
//! - [`tracker`] counts overlapping sessions and decides when the progress
//!   indicator opens, completes or stops.
//! - [`progress`] turns completed-count snapshots into throttled increments.

pub mod notification;
pub mod progress;
pub mod tracker;

pub use notification::{CalculationNotification, CalculationStage, ExecutedState, Metric, StageInfo};
pub use progress::{ProgressCall, ProgressReporter};
pub use tracker::{SessionTracker, TrackerSettings};
