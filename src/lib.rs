// src/lib.rs

pub mod batch;
pub mod cli;
pub mod clock;
pub mod command;
pub mod config;
pub mod dirty;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod script;
pub mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::dirty::DirtyConversionRegistry;
use crate::engine::{CalculationBackend, CoreRuntime, ProgressSink, Runtime, RuntimeEvent};
use crate::script::ReplayScript;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - replay script loading and conversion registration
/// - the simulated-time driver around the core runtime
/// - printing of every outbound effect
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let Some(script_path) = args.script.as_deref() else {
        anyhow::bail!("--script is required unless --dry-run is given");
    };
    let script = ReplayScript::load(script_path)
        .with_context(|| format!("loading replay script {script_path:?}"))?;
    info!(
        conversions = script.conversion.len(),
        events = script.event.len(),
        "replaying script"
    );

    for emitted in script::replay(&script, &cfg)? {
        println!("t={} {}", emitted.at.as_millis(), emitted.effect);
    }
    Ok(())
}

/// A scheduler running on the Tokio runtime.
#[derive(Debug)]
pub struct SchedulerHandle {
    /// Feed executed commands and engine notifications here.
    pub events: mpsc::Sender<RuntimeEvent>,
    pub task: JoinHandle<errors::Result<()>>,
}

impl SchedulerHandle {
    /// Ask the runtime to stop and wait for it.
    pub async fn shutdown(self) -> Result<()> {
        // The runtime may already be gone; joining reports why.
        let _ = self.events.send(RuntimeEvent::ShutdownRequested).await;
        self.task.await.context("scheduler task panicked")??;
        Ok(())
    }
}

/// Spawn the async runtime for embedding in a host application. The
/// initial forced calculation is issued right away.
pub fn spawn_scheduler<B, P>(
    cfg: &ConfigFile,
    registry: Arc<DirtyConversionRegistry>,
    backend: B,
    progress: P,
) -> SchedulerHandle
where
    B: CalculationBackend + 'static,
    P: ProgressSink + 'static,
{
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let core = CoreRuntime::new(cfg, registry);
    let runtime = Runtime::new(core, &tx, rx, backend, progress);
    let task = tokio::spawn(runtime.run());
    SchedulerHandle { events: tx, task }
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    let s = &cfg.scheduler;
    let c = &cfg.commands;

    println!("recalc-scheduler dry-run");
    println!("  scheduler.debounce_ms = {}", s.debounce_ms);
    println!("  scheduler.progress_delay_ms = {}", s.progress_delay_ms);
    println!("  scheduler.progress_throttle_ms = {}", s.progress_throttle_ms);
    println!("  scheduler.progress_overhead = {}", s.progress_overhead);
    println!("  scheduler.initial_progress = {}", s.initial_progress);
    println!();

    println!("commands:");
    println!("  range_values_mutation: {}", c.range_values_mutation);
    println!("  calculation_start_mutation: {}", c.calculation_start_mutation);
    println!(
        "  calculation_notification_mutation: {}",
        c.calculation_notification_mutation
    );
    if !c.cosmetic_triggers.is_empty() {
        println!("  cosmetic_triggers:");
        for trigger in &c.cosmetic_triggers {
            println!("    - {trigger}");
        }
    }

    debug!("dry-run complete (nothing replayed)");
}
