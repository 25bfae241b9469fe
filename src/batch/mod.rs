// src/batch/mod.rs

//! Edit batching: from executed commands to calculation start requests.
//!
//! - [`batcher`] filters executed commands, accumulates them and flushes
//!   after a quiet period.
//! - [`in_flight`] remembers which batch each running session belongs to so
//!   a stopped session's commands can be retried.
//! - [`request`] is the outbound start request.

pub mod batcher;
pub mod in_flight;
pub mod request;

pub use batcher::{Admission, BatcherSettings, EditBatcher, ResolvedBatch};
pub use in_flight::{ActiveBatch, InFlightBatches};
pub use request::CalculationStartRequest;
