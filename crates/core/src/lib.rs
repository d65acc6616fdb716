//! Shared protocol types for the ffpipe job-streaming worker.
//!
//! Holds the job description received from the dispatch server, the
//! local safe-name scheme used to stage files for the media engine,
//! argument patching, and the typed wire messages exchanged over the
//! job WebSocket.

pub mod command_line;
pub mod error;
pub mod job;
pub mod messages;
pub mod patch;
pub mod safe_name;
