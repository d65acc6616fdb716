use ffpipe_engine::EngineError;

use crate::gate::GateError;

/// Errors that abort a job, and with it the connection.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The server declared a different input than the one expected next.
    #[error("Index mismatch: got {received}, expected {expected}")]
    IndexMismatch { expected: i64, received: i64 },

    /// A chunk pushed the transfer past its declared size.
    #[error("Chunk overflow: {received} bytes received for a {declared}-byte transfer")]
    ChunkOverflow { declared: u64, received: u64 },

    #[error("Wrongly typed message, expected {expected}, received {received}")]
    UnexpectedControl {
        expected: &'static str,
        received: &'static str,
    },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Job cancelled")]
    Cancelled,
}

impl FlowError {
    /// Whether the transport was already gone when the job failed.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, FlowError::Gate(GateError::ChannelClosed(_)))
    }
}
