// tests/debounce_batching.rs

mod common;
use crate::common::{cosmetic_edit, default_sim, local_edit, ms, notify, range_edit};

use recalc_scheduler::command::Command;
use recalc_scheduler::dirty::{CellRange, UnitRange};
use recalc_scheduler::engine::{RuntimeEvent, TimerKind};
use recalc_scheduler::session::CalculationNotification;
use serde_json::json;

fn edit(row: u32) -> RuntimeEvent {
    RuntimeEvent::CommandExecuted(range_edit("book", "s1", row, 0))
}

#[test]
fn rapid_edits_coalesce_into_one_request() {
    let mut sim = default_sim();

    sim.dispatch_at(ms(0), edit(1));
    sim.dispatch_at(ms(50), edit(2));
    sim.dispatch_at(ms(90), edit(3));

    sim.advance_to(ms(189));
    assert!(sim.start_requests().is_empty(), "flush happens only after the quiet period");

    sim.advance_to(ms(190));
    let starts = sim.start_requests();
    assert_eq!(starts.len(), 1);

    let (at, request) = starts[0];
    assert_eq!(at, ms(190));
    assert!(!request.force_calculation);
    let rows: Vec<u32> = request
        .dirty
        .dirty_ranges
        .iter()
        .map(|r| r.range.start_row)
        .collect();
    assert_eq!(rows, vec![1, 2, 3], "ranges keep execution order");
    assert_eq!(
        request.dirty.dirty_ranges[0],
        UnitRange::new("book", "s1", CellRange::cell(1, 0))
    );
}

#[test]
fn edits_spaced_beyond_the_quiet_period_flush_separately() {
    let mut sim = default_sim();

    sim.dispatch_at(ms(0), edit(1));
    sim.dispatch_at(ms(150), edit(2));
    sim.settle();

    let at: Vec<u64> = sim
        .start_requests()
        .iter()
        .map(|(at, _)| at.as_millis())
        .collect();
    assert_eq!(at, vec![100, 250]);
}

#[test]
fn filtered_commands_never_arm_the_debounce() {
    let mut sim = default_sim();

    sim.dispatch(RuntimeEvent::CommandExecuted(local_edit("book", "s1")));
    sim.dispatch(RuntimeEvent::CommandExecuted(cosmetic_edit("sheet.command.set-style")));
    sim.dispatch(RuntimeEvent::CommandExecuted(cosmetic_edit("sheet.command.set-border")));
    sim.dispatch(RuntimeEvent::CommandExecuted(Command::new(
        "sheet.command.set-selection",
        json!({}),
    )));

    assert_eq!(sim.timer_deadline(TimerKind::Debounce), None);
    assert!(sim.core().batcher().pending().is_empty());
    sim.settle();
    assert!(sim.start_requests().is_empty());
}

#[test]
fn non_cosmetic_trigger_is_still_batched() {
    let mut sim = default_sim();

    sim.dispatch(RuntimeEvent::CommandExecuted(cosmetic_edit("sheet.command.paste")));
    sim.settle();

    assert_eq!(sim.start_requests().len(), 1);
}

#[test]
fn edits_during_a_running_session_are_flushed_alongside_it() {
    let mut sim = default_sim();

    sim.dispatch_at(ms(0), edit(1));
    sim.advance_to(ms(100));
    sim.dispatch_at(ms(110), notify(CalculationNotification::dependency_build()));
    sim.dispatch_at(ms(150), edit(2));
    sim.advance_to(ms(250));

    assert_eq!(sim.start_requests().len(), 2);
    assert_eq!(sim.core().batcher().in_flight().len(), 2);
}
