use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use recalc_scheduler::batch::CalculationStartRequest;
use recalc_scheduler::engine::{CalculationBackend, ProgressSink};
use recalc_scheduler::errors::Result;
use recalc_scheduler::session::ProgressCall;

/// Records every start request, in order.
///
/// Clones share the same log, so keep one and hand the other to the
/// runtime.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    requests: Arc<Mutex<Vec<CalculationStartRequest>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<CalculationStartRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CalculationBackend for RecordingBackend {
    fn start_calculation(
        &mut self,
        request: CalculationStartRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.requests.lock().unwrap().push(request);
        Box::pin(async { Ok(()) })
    }
}

/// Records every call made to the progress indicator.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    calls: Arc<Mutex<Vec<ProgressCall>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ProgressCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ProgressSink for RecordingProgress {
    fn insert_task_count(&mut self, count: u64) {
        self.record(ProgressCall::InsertTaskCount { count });
    }

    fn push_task(&mut self, count: u64) {
        self.record(ProgressCall::PushTask { count });
    }

    fn complete(&mut self) {
        self.record(ProgressCall::Complete);
    }

    fn stop(&mut self) {
        self.record(ProgressCall::Stop);
    }
}
