/// Errors that can occur while driving a media engine instance.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A file name that is not a plain name inside the engine's filesystem.
    #[error("Invalid engine file name: {0:?}")]
    InvalidName(String),

    #[error("Engine file not found: {0}")]
    FileNotFound(String),

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The instance was terminated; it must not be used again.
    #[error("Engine has been terminated")]
    Terminated,

    /// Engine-specific failure reported by the implementation.
    #[error("Engine failure: {0}")]
    Failed(String),
}
