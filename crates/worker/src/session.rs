use tokio::sync::broadcast;

use crate::events::WorkerEvent;

/// Capacity of the worker event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State that outlives a single connection: the job counter used for
/// safe names, and the event channel.
pub struct SessionContext {
    jobs: u64,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { jobs: 0, event_tx }
    }

    /// Allocate the number of the next job. Numbers start at 1 and never
    /// repeat within a session.
    pub fn next_job(&mut self) -> u64 {
        self.jobs += 1;
        self.jobs
    }

    /// Number of jobs started so far.
    pub fn jobs_started(&self) -> u64 {
        self.jobs
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    pub fn emit(&self, event: WorkerEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
