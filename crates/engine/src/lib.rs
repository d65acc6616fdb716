//! Media engine abstraction and the native process-backed engine.
//!
//! The job protocol only ever talks to an engine through
//! [`MediaEngine`]: named files in, an argument vector, an exit status
//! and named files out, plus a stream of log lines. [`process`] drives
//! native `ffmpeg`/`ffprobe` binaries inside a private scratch
//! directory.

pub mod engine;
pub mod error;
pub mod process;

pub use engine::{EngineFactory, LogEvent, MediaEngine};
pub use error::EngineError;
pub use process::{EngineConfig, ProcessEngine, ProcessEngineFactory};
