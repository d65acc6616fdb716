//! The job cycle controller.
//!
//! Drives one connection through repeated jobs:
//!
//! ```text
//! AwaitReady -> AwaitTaskReady -> AwaitSpec -> Executing -> AwaitReady ...
//! ```
//!
//! Each handshake step waits for one tagged control message and echoes
//! it back. `Executing` loads a fresh engine, runs the job, deletes the
//! staged files and tears the engine down whatever happened. Cancellation
//! is observed at every step; during `Executing` it drops the job
//! mid-flight, and a cancellation caused by the transport closing is
//! reported as a closed channel.

use ffpipe_core::job::JobSpec;
use ffpipe_core::safe_name::SafeNames;
use ffpipe_core::messages::ServerMessage;
use ffpipe_engine::EngineFactory;
use tokio_util::sync::CancellationToken;

use crate::error::FlowError;
use crate::events::WorkerEvent;
use crate::flow::{cleanup, process_job};
use crate::gate::{GateError, MessageGate};
use crate::session::SessionContext;
use crate::sink::FrameSink;

/// Where the controller is in the job cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    AwaitReady,
    AwaitTaskReady,
    AwaitSpec,
    Executing,
    Cancelled,
}

impl CycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleState::AwaitReady => "await_ready",
            CycleState::AwaitTaskReady => "await_task_ready",
            CycleState::AwaitSpec => "await_spec",
            CycleState::Executing => "executing",
            CycleState::Cancelled => "cancelled",
        }
    }
}

/// Wait for a control message of type `expected` and echo it back.
pub async fn pong_back(
    gate: &mut MessageGate,
    sink: &FrameSink,
    expected: &'static str,
) -> Result<ServerMessage, FlowError> {
    let msg = gate.await_server_message().await?;
    if msg.kind() != expected {
        return Err(FlowError::UnexpectedControl {
            expected,
            received: msg.kind(),
        });
    }
    sink.send_message(&msg.echo())?;
    Ok(msg)
}

/// Run jobs on one connection until it closes, a job fails, or `cancel`
/// fires.
///
/// Returns `Ok(())` when the server closes the connection between jobs.
/// On a failed job the connection is closed before the error is
/// returned.
pub async fn cycle_jobs(
    ctx: &mut SessionContext,
    factory: &dyn EngineFactory,
    gate: &mut MessageGate,
    sink: &FrameSink,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    loop {
        match handshake(gate, sink, CycleState::AwaitReady, "ready", cancel).await {
            Ok(_) => {}
            Err(e) if e.is_channel_closed() => {
                tracing::info!("Server closed the connection between jobs");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        handshake(gate, sink, CycleState::AwaitTaskReady, "taskReady", cancel).await?;

        let spec = match handshake(gate, sink, CycleState::AwaitSpec, "ffargs", cancel).await? {
            ServerMessage::Ffargs { ffargs } => ffargs,
            other => {
                return Err(FlowError::UnexpectedControl {
                    expected: "ffargs",
                    received: other.kind(),
                })
            }
        };

        execute_job(ctx, factory, spec, gate, sink, cancel).await?;
    }
}

async fn handshake(
    gate: &mut MessageGate,
    sink: &FrameSink,
    state: CycleState,
    expected: &'static str,
    cancel: &CancellationToken,
) -> Result<ServerMessage, FlowError> {
    tracing::trace!(state = state.as_str(), "Waiting for {expected}");
    // A close already queued wins over the cancellation it triggered.
    tokio::select! {
        biased;
        result = pong_back(gate, sink, expected) => result,
        _ = cancel.cancelled() => Err(FlowError::Cancelled),
    }
}

async fn execute_job(
    ctx: &mut SessionContext,
    factory: &dyn EngineFactory,
    spec: JobSpec,
    gate: &mut MessageGate,
    sink: &FrameSink,
    cancel: &CancellationToken,
) -> Result<(), FlowError> {
    let job = ctx.next_job();
    tracing::info!(
        job,
        state = CycleState::Executing.as_str(),
        mode = spec.mode().as_str(),
        inputs = spec.inputs().len(),
        outputs = spec.outputs().len(),
        "Job received",
    );

    let mut engine = match factory.load().await {
        Ok(engine) => engine,
        Err(e) => {
            let err = FlowError::from(e);
            fail(ctx, sink, job, &err);
            return Err(err);
        }
    };
    ctx.emit(WorkerEvent::JobStarted {
        job,
        mode: spec.mode().as_str(),
    });

    let mut names = SafeNames::new(job);
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FlowError::Cancelled),
        result = process_job(&mut *engine, &spec, &mut names, gate, sink) => result,
    };

    cleanup(&mut *engine, &names).await;
    engine.terminate().await;

    // Cancellation raised by the transport going away is a lost channel.
    let outcome = match outcome {
        Err(FlowError::Cancelled) => match gate.pending_close() {
            Some(reason) => Err(FlowError::Gate(GateError::ChannelClosed(reason))),
            None => Err(FlowError::Cancelled),
        },
        other => other,
    };

    match outcome {
        Ok(()) => {
            tracing::info!(job, "Job completed");
            ctx.emit(WorkerEvent::JobCompleted { job });
            Ok(())
        }
        Err(FlowError::Cancelled) => {
            tracing::info!(job, state = CycleState::Cancelled.as_str(), "Job cancelled");
            ctx.emit(WorkerEvent::JobCancelled { job });
            Err(FlowError::Cancelled)
        }
        Err(e) => {
            fail(ctx, sink, job, &e);
            Err(e)
        }
    }
}

fn fail(ctx: &SessionContext, sink: &FrameSink, job: u64, error: &FlowError) {
    tracing::error!(job, error = %error, "Job failed, closing connection");
    ctx.emit(WorkerEvent::JobFailed {
        job,
        error: error.to_string(),
    });
    sink.close();
}
