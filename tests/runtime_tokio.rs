// tests/runtime_tokio.rs

mod common;
use crate::common::{
    init_tracing, range_edit, with_timeout, RecordingBackend, RecordingProgress, RegistryBuilder,
};

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use recalc_scheduler::clock::{ManualClock, Timestamp};
use recalc_scheduler::command::{ids, Command};
use recalc_scheduler::config::ConfigFile;
use recalc_scheduler::engine::{
    ChannelCalculationBackend, CoreRuntime, Runtime, RuntimeEvent, TracingProgressSink,
};
use recalc_scheduler::session::{CalculationNotification, ProgressCall};
use recalc_scheduler::spawn_scheduler;

fn notification(params: serde_json::Value) -> RuntimeEvent {
    RuntimeEvent::CommandExecuted(Command::new(
        ids::SET_FORMULA_CALCULATION_NOTIFICATION_MUTATION,
        params,
    ))
}

#[tokio::test(start_paused = true)]
async fn runtime_debounces_edits_on_real_timers() -> anyhow::Result<()> {
    init_tracing();

    let backend = RecordingBackend::new();
    let progress = RecordingProgress::new();
    let handle = spawn_scheduler(
        &ConfigFile::default(),
        RegistryBuilder::new().with_range_values().build(),
        backend.clone(),
        progress.clone(),
    );

    sleep(Duration::from_millis(1)).await;
    assert_eq!(backend.len(), 1, "bootstrap request is issued on start");
    assert!(backend.requests()[0].force_calculation);

    for (row, gap) in [(1, 50), (2, 40), (3, 0)] {
        handle
            .events
            .send(RuntimeEvent::CommandExecuted(range_edit("book", "s1", row, 0)))
            .await?;
        sleep(Duration::from_millis(gap)).await;
    }

    sleep(Duration::from_millis(99)).await;
    assert_eq!(backend.len(), 1, "still inside the quiet period");

    sleep(Duration::from_millis(2)).await;
    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    let rows: Vec<u32> = requests[1]
        .dirty
        .dirty_ranges
        .iter()
        .map(|r| r.range.start_row)
        .collect();
    assert_eq!(rows, vec![1, 2, 3], "events are handled strictly in delivery order");
    assert!(progress.calls().is_empty());

    with_timeout(handle.shutdown()).await
}

#[tokio::test(start_paused = true)]
async fn runtime_opens_and_completes_progress() -> anyhow::Result<()> {
    init_tracing();

    let backend = RecordingBackend::new();
    let progress = RecordingProgress::new();
    let handle = spawn_scheduler(
        &ConfigFile::default(),
        RegistryBuilder::new().with_range_values().build(),
        backend.clone(),
        progress.clone(),
    );

    handle
        .events
        .send(notification(json!({ "stageInfo": { "stage": "START_DEPENDENCY" } })))
        .await?;
    handle
        .events
        .send(notification(json!({
            "stageInfo": {
                "stage": "CURRENTLY_CALCULATING",
                "totalFormulasToCalculate": 40,
                "completedFormulasCount": 1
            }
        })))
        .await?;

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(
        progress.calls(),
        vec![
            ProgressCall::InsertTaskCount { count: 39 + 100 },
            ProgressCall::PushTask { count: 5 },
        ]
    );

    handle
        .events
        .send(notification(json!({ "functionsExecutedState": "SUCCESS" })))
        .await?;
    sleep(Duration::from_millis(10)).await;
    assert_eq!(progress.calls().last(), Some(&ProgressCall::Complete));

    with_timeout(handle.shutdown()).await
}

#[tokio::test(start_paused = true)]
async fn runtime_exits_when_all_senders_are_dropped() -> anyhow::Result<()> {
    init_tracing();

    let backend = RecordingBackend::new();
    let handle = spawn_scheduler(
        &ConfigFile::default(),
        RegistryBuilder::new().with_range_values().build(),
        backend.clone(),
        RecordingProgress::new(),
    );

    // A pending debounce timer must not keep the runtime alive.
    handle
        .events
        .send(RuntimeEvent::CommandExecuted(range_edit("book", "s1", 0, 0)))
        .await?;
    drop(handle.events);

    with_timeout(handle.task).await??;
    assert_eq!(backend.len(), 1);
    Ok(())
}

#[tokio::test]
async fn channel_backend_emits_local_only_start_commands() -> anyhow::Result<()> {
    init_tracing();

    let (bus_tx, mut bus_rx) = mpsc::channel::<Command>(8);
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    let core = CoreRuntime::new(&ConfigFile::default(), Arc::new(Default::default()));
    let runtime = Runtime::new(
        core,
        &tx,
        rx,
        ChannelCalculationBackend::new(bus_tx, ids::SET_FORMULA_CALCULATION_START_MUTATION),
        TracingProgressSink,
    );
    let task = tokio::spawn(runtime.run());

    let command = with_timeout(bus_rx.recv()).await.expect("bootstrap command");
    assert_eq!(command.id, ids::SET_FORMULA_CALCULATION_START_MUTATION);
    assert!(command.options.only_local);
    assert_eq!(command.params["forceCalculation"], json!(true));

    tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(task).await??;
    Ok(())
}

#[tokio::test]
async fn closed_bus_surfaces_as_runtime_error() {
    init_tracing();

    let (bus_tx, bus_rx) = mpsc::channel::<Command>(1);
    drop(bus_rx);
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    let core = CoreRuntime::new(&ConfigFile::default(), Arc::new(Default::default()));
    let runtime = Runtime::new(
        core,
        &tx,
        rx,
        ChannelCalculationBackend::new(bus_tx, ids::SET_FORMULA_CALCULATION_START_MUTATION),
        TracingProgressSink,
    );

    let err = with_timeout(runtime.run()).await.unwrap_err();
    assert!(matches!(
        err,
        recalc_scheduler::errors::RecalcError::ChannelClosed(_)
    ));
}

#[tokio::test]
async fn channel_backend_uses_the_configured_start_mutation() -> anyhow::Result<()> {
    init_tracing();

    let mut cfg = ConfigFile::default();
    cfg.commands.calculation_start_mutation = "host.mutation.recalculate".to_string();

    let (bus_tx, mut bus_rx) = mpsc::channel::<Command>(8);
    let handle = spawn_scheduler(
        &cfg,
        RegistryBuilder::new().with_range_values().build(),
        ChannelCalculationBackend::from_config(bus_tx, &cfg.commands),
        TracingProgressSink,
    );

    let command = with_timeout(bus_rx.recv()).await.expect("bootstrap command");
    assert_eq!(command.id, "host.mutation.recalculate");
    assert!(command.options.only_local);

    with_timeout(handle.shutdown()).await
}

#[tokio::test(start_paused = true)]
async fn throttle_windows_follow_the_injected_clock() -> anyhow::Result<()> {
    init_tracing();

    let clock = Arc::new(ManualClock::new());
    let backend = RecordingBackend::new();
    let progress = RecordingProgress::new();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    let core = CoreRuntime::new(
        &ConfigFile::default(),
        RegistryBuilder::new().with_range_values().build(),
    );
    let runtime = Runtime::new(core, &tx, rx, backend.clone(), progress.clone())
        .with_clock(clock.clone())
        .skip_bootstrap();
    let task = tokio::spawn(runtime.run());

    let notify = |n: CalculationNotification| RuntimeEvent::Notification(n);
    tx.send(notify(CalculationNotification::dependency_build())).await?;
    tx.send(notify(CalculationNotification::calculating(40, 1))).await?;

    // Timers still run on Tokio time; the core only sees the manual clock.
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(backend.len(), 0, "no initial forced calculation");
    assert_eq!(
        progress.calls(),
        vec![
            ProgressCall::InsertTaskCount { count: 39 + 100 },
            ProgressCall::PushTask { count: 5 },
        ]
    );

    tx.send(notify(CalculationNotification::calculating(40, 10))).await?;
    sleep(Duration::from_millis(1)).await;

    // 400ms later on the injected clock, but only 1ms later on Tokio's.
    clock.set(Timestamp::from_millis(400));
    tx.send(notify(CalculationNotification::calculating(40, 25))).await?;
    sleep(Duration::from_millis(1)).await;

    assert_eq!(
        &progress.calls()[2..],
        &[
            ProgressCall::PushTask { count: 9 },
            ProgressCall::PushTask { count: 15 },
        ]
    );

    tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(task).await??;
    Ok(())
}
