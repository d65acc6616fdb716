//! Lifecycle events emitted by the worker.
//!
//! Subscribers (tests, an embedding application) receive these through
//! [`SessionContext::subscribe`](crate::session::SessionContext::subscribe).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A connection to the dispatch server was established.
    Connected { url: String },

    /// The connection was lost or closed.
    Disconnected { reason: String },

    /// A job spec was accepted and an engine instance loaded for it.
    JobStarted { job: u64, mode: &'static str },

    /// Every output of the job was sent.
    JobCompleted { job: u64 },

    /// The job aborted; the connection is closed after this.
    JobFailed { job: u64, error: String },

    /// The job was cancelled while executing.
    JobCancelled { job: u64 },
}
