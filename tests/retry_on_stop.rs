// tests/retry_on_stop.rs

mod common;
use crate::common::{default_sim, ms, notify, quiet_sim, range_edit, RegistryBuilder};

use recalc_scheduler::command::Command;
use recalc_scheduler::config::ConfigFile;
use recalc_scheduler::dirty::DirtyDescriptor;
use recalc_scheduler::engine::RuntimeEvent;
use recalc_scheduler::session::{CalculationNotification, ExecutedState};

fn edit(row: u32) -> RuntimeEvent {
    RuntimeEvent::CommandExecuted(range_edit("book", "s1", row, 0))
}

fn rows(sim: &recalc_scheduler::engine::SimulatedRuntime, nth: usize) -> Vec<u32> {
    sim.start_requests()[nth]
        .1
        .dirty
        .dirty_ranges
        .iter()
        .map(|r| r.range.start_row)
        .collect()
}

#[test]
fn stopped_batch_is_retried_ahead_of_newer_edits() {
    let mut sim = default_sim();

    // Batch A = [x, y] flushes at t=100.
    sim.dispatch_at(ms(0), edit(1));
    sim.dispatch_at(ms(10), edit(2));
    sim.advance_to(ms(110));
    assert_eq!(rows(&sim, 0), vec![1, 2]);

    // z is queued while A runs; then A is stopped.
    sim.dispatch_at(ms(120), notify(CalculationNotification::dependency_build()));
    sim.dispatch_at(ms(130), edit(3));
    sim.dispatch_at(ms(140), notify(CalculationNotification::executed(ExecutedState::StopExecution)));

    let pending: Vec<u32> = sim
        .core()
        .batcher()
        .pending()
        .iter()
        .map(|c| c.params["dirty"]["dirtyRanges"][0]["range"]["startRow"].as_u64().unwrap() as u32)
        .collect();
    assert_eq!(pending, vec![1, 2, 3]);

    sim.settle();
    assert_eq!(sim.start_requests().len(), 2);
    assert_eq!(rows(&sim, 1), vec![1, 2, 3]);
}

#[test]
fn successive_stops_keep_retried_batches_in_order() {
    let mut sim = default_sim();

    sim.dispatch_at(ms(0), edit(1));
    sim.advance_to(ms(100)); // batch [1] in flight
    sim.dispatch_at(ms(110), edit(2));
    sim.advance_to(ms(210)); // batch [2] in flight
    sim.dispatch_at(ms(220), edit(3)); // pending [3]

    sim.dispatch(notify(CalculationNotification::executed(ExecutedState::StopExecution)));
    sim.dispatch(notify(CalculationNotification::executed(ExecutedState::StopExecution)));

    let pending: Vec<u32> = sim
        .core()
        .batcher()
        .pending()
        .iter()
        .map(|c| c.params["dirty"]["dirtyRanges"][0]["range"]["startRow"].as_u64().unwrap() as u32)
        .collect();
    assert_eq!(pending, vec![1, 2, 3]);
}

#[test]
fn batch_that_never_started_a_session_does_not_absorb_a_later_stop() {
    let registry = RegistryBuilder::new()
        .with_range_values()
        .with_static("sheet.mutation.noop", DirtyDescriptor::default())
        .build();
    let mut sim = quiet_sim(&ConfigFile::default(), registry);

    // The host never reports a session for this flush.
    sim.dispatch_at(
        ms(0),
        RuntimeEvent::CommandExecuted(Command::new("sheet.mutation.noop", serde_json::json!({}))),
    );
    sim.advance_to(ms(100));
    assert_eq!(sim.start_requests().len(), 1);

    sim.dispatch_at(ms(200), edit(1));
    sim.dispatch_at(ms(210), edit(2));
    sim.advance_to(ms(310));
    assert_eq!(rows(&sim, 1), vec![1, 2]);

    sim.dispatch_at(ms(320), notify(CalculationNotification::dependency_build()));
    sim.dispatch_at(ms(330), notify(CalculationNotification::executed(ExecutedState::StopExecution)));

    let pending: Vec<u32> = sim
        .core()
        .batcher()
        .pending()
        .iter()
        .map(|c| c.params["dirty"]["dirtyRanges"][0]["range"]["startRow"].as_u64().unwrap() as u32)
        .collect();
    assert_eq!(pending, vec![1, 2]);
    assert!(sim.core().batcher().in_flight().is_empty());
}

#[test]
fn not_executed_drops_the_batch() {
    let mut sim = default_sim();

    sim.dispatch_at(ms(0), edit(1));
    sim.advance_to(ms(100));
    sim.dispatch_at(ms(110), notify(CalculationNotification::dependency_build()));
    sim.dispatch_at(ms(120), notify(CalculationNotification::executed(ExecutedState::NotExecuted)));
    sim.settle();

    assert_eq!(sim.start_requests().len(), 1);
    assert!(sim.core().batcher().pending().is_empty());
    assert!(sim.core().batcher().in_flight().is_empty());
}

#[test]
fn success_drops_the_batch() {
    let mut sim = default_sim();

    sim.dispatch_at(ms(0), edit(1));
    sim.advance_to(ms(100));
    sim.dispatch_at(ms(110), notify(CalculationNotification::dependency_build()));
    sim.dispatch_at(ms(120), notify(CalculationNotification::executed(ExecutedState::Success)));
    sim.settle();

    assert_eq!(sim.start_requests().len(), 1);
    assert!(sim.core().batcher().in_flight().is_empty());
}
