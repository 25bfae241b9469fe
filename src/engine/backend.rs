// src/engine/backend.rs

//! Pluggable outbound backends.
//!
//! The runtime talks to a [`CalculationBackend`] (where start requests go)
//! and a [`ProgressSink`] (the progress widget) instead of concrete
//! services. This makes it easy to swap in recording fakes in tests.
//!
//! - [`ChannelCalculationBackend`] turns each request into a local-only
//!   command and sends it over an mpsc channel, the usual way to hand
//!   commands back to a host bus.
//! - [`TracingProgressSink`] reports progress calls as log lines, for
//!   headless hosts.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::info;

use crate::batch::CalculationStartRequest;
use crate::command::Command;
use crate::config::CommandsSection;
use crate::errors::{RecalcError, Result};
use crate::session::ProgressCall;

/// Receiver of calculation start requests.
pub trait CalculationBackend: Send {
    fn start_calculation(
        &mut self,
        request: CalculationStartRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// The single progress indicator.
pub trait ProgressSink: Send {
    fn insert_task_count(&mut self, count: u64);
    fn push_task(&mut self, count: u64);
    fn complete(&mut self);
    fn stop(&mut self);

    fn apply(&mut self, call: ProgressCall) {
        match call {
            ProgressCall::InsertTaskCount { count } => self.insert_task_count(count),
            ProgressCall::PushTask { count } => self.push_task(count),
            ProgressCall::Complete => self.complete(),
            ProgressCall::Stop => self.stop(),
        }
    }
}

pub struct ChannelCalculationBackend {
    tx: mpsc::Sender<Command>,
    command_id: String,
}

impl ChannelCalculationBackend {
    /// `command_id` is the id the start request is issued under.
    pub fn new(tx: mpsc::Sender<Command>, command_id: impl Into<String>) -> Self {
        Self {
            tx,
            command_id: command_id.into(),
        }
    }

    /// Issue start requests under `commands.calculation_start_mutation`.
    pub fn from_config(tx: mpsc::Sender<Command>, commands: &CommandsSection) -> Self {
        Self::new(tx, commands.calculation_start_mutation.clone())
    }
}

impl CalculationBackend for ChannelCalculationBackend {
    fn start_calculation(
        &mut self,
        request: CalculationStartRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();
        let command = request.into_command(&self.command_id);

        Box::pin(async move {
            let command = command?;
            tx.send(command)
                .await
                .map_err(|e| RecalcError::ChannelClosed(e.to_string()))?;
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn insert_task_count(&mut self, count: u64) {
        info!(count, "progress: insert task count");
    }

    fn push_task(&mut self, count: u64) {
        info!(count, "progress: push task");
    }

    fn complete(&mut self) {
        info!("progress: complete");
    }

    fn stop(&mut self) {
        info!("progress: stop");
    }
}
