#![allow(dead_code)]

pub use recalc_scheduler_test_utils::*;

use std::sync::Arc;

use recalc_scheduler::clock::Timestamp;
use recalc_scheduler::config::ConfigFile;
use recalc_scheduler::dirty::DirtyConversionRegistry;
use recalc_scheduler::engine::{CoreRuntime, RuntimeEvent, SimulatedRuntime};
use recalc_scheduler::session::{CalculationNotification, ExecutedState};

/// A simulated runtime whose bootstrap session already finished, so tests
/// start from a quiet state at t=0 with no effects recorded.
pub fn quiet_sim(cfg: &ConfigFile, registry: Arc<DirtyConversionRegistry>) -> SimulatedRuntime {
    init_tracing();
    let mut sim = SimulatedRuntime::new(CoreRuntime::new(cfg, registry));
    sim.bootstrap();
    sim.dispatch(notify(CalculationNotification::dependency_build()));
    sim.dispatch(notify(CalculationNotification::executed(ExecutedState::Success)));
    sim.take_emitted();
    sim
}

pub fn default_sim() -> SimulatedRuntime {
    quiet_sim(
        &ConfigFile::default(),
        RegistryBuilder::new().with_range_values().build(),
    )
}

pub fn notify(notification: CalculationNotification) -> RuntimeEvent {
    RuntimeEvent::Notification(notification)
}

pub fn ms(millis: u64) -> Timestamp {
    Timestamp::from_millis(millis)
}
