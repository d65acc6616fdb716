//! `ffpipe-worker` library crate.
//!
//! The job protocol (gate, transfer, executor, cycle controller), the
//! WebSocket connection bridge and the reconnect supervisor. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod connection;
pub mod cycle;
pub mod error;
pub mod events;
pub mod executor;
pub mod flow;
pub mod gate;
pub mod reassembly;
pub mod session;
pub mod sink;
pub mod supervisor;
pub mod transfer;
