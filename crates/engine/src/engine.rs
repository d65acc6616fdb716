//! The engine collaborator interface.

use async_trait::async_trait;
use ffpipe_core::messages::LogStream;
use tokio::sync::mpsc;

use crate::error::EngineError;

/// One log line emitted by the engine while a call is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub stream: LogStream,
    pub message: String,
}

impl LogEvent {
    pub fn stdout(message: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stdout,
            message: message.into(),
        }
    }

    pub fn stderr(message: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stderr,
            message: message.into(),
        }
    }
}

/// A loaded media engine instance with its own private filesystem.
///
/// Instances are single-owner and single-use: the job that created one
/// calls [`terminate`](MediaEngine::terminate) when it is done, after
/// which every other method fails with [`EngineError::Terminated`].
#[async_trait]
pub trait MediaEngine: Send {
    /// Create or replace a file in the engine filesystem.
    async fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Read a whole file from the engine filesystem.
    async fn read_file(&mut self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Remove a file. Fails with [`EngineError::FileNotFound`] if absent.
    async fn delete_file(&mut self, name: &str) -> Result<(), EngineError>;

    /// Run a transform (`ffmpeg`) call and return its exit status.
    async fn exec(&mut self, args: &[String]) -> Result<i32, EngineError>;

    /// Run an inspect (`ffprobe`) call and return its exit status.
    async fn inspect(&mut self, args: &[String]) -> Result<i32, EngineError>;

    /// Subscribe to log lines emitted from now on.
    ///
    /// Delivery is lossless and in emission order. A new subscription
    /// replaces the previous one; dropping the receiver detaches it.
    fn subscribe_logs(&mut self) -> mpsc::UnboundedReceiver<LogEvent>;

    /// Tear the instance down. Calling it more than once is harmless.
    async fn terminate(&mut self);
}

/// Loads fresh engine instances, one per job.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn load(&self) -> Result<Box<dyn MediaEngine>, EngineError>;
}
