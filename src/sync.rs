use std::sync::Mutex;

use crate::state::{LiveEvent, ScheduleSnapshot};

#[derive(Debug, Default)]
struct Pending {
    schedule: Option<ScheduleSnapshot>,
    event: Option<LiveEvent>,
}

/// Single handoff point between the stream thread (producer) and the render
/// loop (consumer). Holds at most one unconsumed update per kind; publishing
/// over an unconsumed value replaces it. Intermediate states between two
/// render ticks are coalesced away, not queued.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<Pending>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_schedule(&self, snapshot: ScheduleSnapshot) {
        let mut pending = self.inner.lock().expect("shared state lock poisoned");
        pending.schedule = Some(snapshot);
    }

    pub fn publish_event(&self, event: LiveEvent) {
        let mut pending = self.inner.lock().expect("shared state lock poisoned");
        pending.event = Some(event);
    }

    /// Returns and clears the pending schedule, if any.
    pub fn take_schedule(&self) -> Option<ScheduleSnapshot> {
        self.inner
            .lock()
            .expect("shared state lock poisoned")
            .schedule
            .take()
    }

    /// Returns and clears the pending event, if any.
    pub fn take_event(&self) -> Option<LiveEvent> {
        self.inner
            .lock()
            .expect("shared state lock poisoned")
            .event
            .take()
    }
}

/// Equality gate on the per-game play counter. The stream redelivers
/// identical payloads (reliably so around scoring plays); a repeated
/// sequence is an exact duplicate and is dropped even if other fields were
/// to differ. This is not an ordering check: out-of-order delivery passes
/// through untouched.
#[derive(Debug, Default)]
pub struct SequenceGate {
    last_admitted: Option<i64>,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `sequence` differs from the last admitted one; records it.
    pub fn admit(&mut self, sequence: i64) -> bool {
        if self.last_admitted == Some(sequence) {
            return false;
        }
        self.last_admitted = Some(sequence);
        true
    }
}
