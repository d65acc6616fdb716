//! Typed control messages of the job WebSocket protocol.
//!
//! Control messages are JSON text frames tagged by a `"type"` field.
//! The one exception is the input size declaration, which the server
//! sends as a bare `[index, byteSize]` array. File contents travel in
//! untyped binary frames.

use serde::{Deserialize, Serialize};

use crate::job::JobSpec;

/// Which engine output stream a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Messages the dispatch server sends as tagged JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// First handshake: the server is ready to negotiate a job.
    Ready,
    /// Second handshake: the server has a task queued.
    TaskReady,
    /// The job to run.
    Ffargs { ffargs: JobSpec },
}

impl ServerMessage {
    /// The wire `"type"` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Ready => "ready",
            ServerMessage::TaskReady => "taskReady",
            ServerMessage::Ffargs { .. } => "ffargs",
        }
    }

    /// The acknowledgement the worker sends back for this message.
    pub fn echo(&self) -> ClientMessage {
        match self {
            ServerMessage::Ready => ClientMessage::Ready,
            ServerMessage::TaskReady => ClientMessage::TaskReady,
            ServerMessage::Ffargs { .. } => ClientMessage::Ffargs,
        }
    }
}

/// Messages the worker sends as tagged JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ready,
    TaskReady,
    /// Echo acknowledging receipt of the job spec.
    Ffargs,
    /// The input size declaration was accepted.
    InputInfoOk,
    /// The input bytes were received and staged.
    InputOk,
    LogLine {
        #[serde(rename = "logType")]
        log_type: LogStream,
        #[serde(rename = "logLine")]
        log_line: String,
    },
    /// No more log lines will follow for the current job.
    LogEnd,
    /// Output descriptor. For a mapped output a binary frame of
    /// `out_info.1` bytes follows, empty included; unmapped slots get none.
    OutInfo {
        #[serde(rename = "outInfo")]
        out_info: (i64, u64),
    },
}

impl ClientMessage {
    pub fn log_line(log_type: LogStream, log_line: impl Into<String>) -> Self {
        ClientMessage::LogLine {
            log_type,
            log_line: log_line.into(),
        }
    }

    pub fn out_info(index: i64, len: u64) -> Self {
        ClientMessage::OutInfo {
            out_info: (index, len),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ClientMessage is always serialisable")
    }
}

/// Input size declaration: `[index, byteSize]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDeclaration(pub i64, pub u64);

impl InputDeclaration {
    pub fn index(&self) -> i64 {
        self.0
    }

    pub fn size(&self) -> u64 {
        self.1
    }
}
