// src/batch/in_flight.rs

use std::collections::VecDeque;

use crate::clock::Timestamp;
use crate::command::Command;

/// Commands handed to the engine by one flush.
#[derive(Debug, Clone)]
pub struct ActiveBatch {
    pub commands: Vec<Command>,
    pub flushed_at: Timestamp,
    /// The unconditional first calculation, not a flush of edits.
    pub bootstrap: bool,
    /// A `START_DEPENDENCY` has been attributed to this batch.
    pub started: bool,
}

impl ActiveBatch {
    pub fn new(commands: Vec<Command>, flushed_at: Timestamp) -> Self {
        Self {
            commands,
            flushed_at,
            bootstrap: false,
            started: false,
        }
    }
}

/// Batches whose sessions have not reported a terminal state yet, oldest
/// first.
///
/// Notifications carry no request id, so batches are tied to sessions by
/// arrival:
/// - a session start claims the newest unstarted batch; unstarted batches
///   flushed before it never produced a session and are discarded
/// - a terminal state resolves the oldest started batch, or the oldest
///   unstarted one if no session was seen
///
/// A request that never reports back therefore cannot shift later
/// terminals onto the wrong batch.
#[derive(Debug, Default)]
pub struct InFlightBatches {
    batches: VecDeque<ActiveBatch>,
}

impl InFlightBatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, batch: ActiveBatch) {
        self.batches.push_back(batch);
    }

    /// Attribute a session start. Returns the superseded batches that were
    /// discarded, oldest first.
    pub fn start_session(&mut self) -> Vec<ActiveBatch> {
        let Some(newest) = self.batches.iter().rposition(|b| !b.started) else {
            return Vec::new();
        };

        let mut superseded = Vec::new();
        let mut kept = VecDeque::with_capacity(self.batches.len());
        for (idx, mut batch) in self.batches.drain(..).enumerate() {
            if idx == newest {
                batch.started = true;
                kept.push_back(batch);
            } else if idx < newest && !batch.started {
                superseded.push(batch);
            } else {
                kept.push_back(batch);
            }
        }
        self.batches = kept;
        superseded
    }

    /// Remove and return the batch a terminal state belongs to.
    pub fn resolve(&mut self) -> Option<ActiveBatch> {
        match self.batches.iter().position(|b| b.started) {
            Some(idx) => self.batches.remove(idx),
            None => self.batches.pop_front(),
        }
    }

    /// Drop started batches left over once no session is live.
    pub fn drop_started(&mut self) -> Vec<ActiveBatch> {
        let (started, unstarted): (VecDeque<_>, VecDeque<_>) =
            self.batches.drain(..).partition(|b| b.started);
        self.batches = unstarted;
        started.into_iter().collect()
    }

    pub fn oldest(&self) -> Option<&ActiveBatch> {
        self.batches.front()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// All in-flight commands, oldest batch first.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.batches.iter().flat_map(|b| b.commands.iter())
    }
}
