//! Engine invocation with live log relay.

use ffpipe_core::job::ToolMode;
use ffpipe_core::messages::ClientMessage;
use ffpipe_engine::{LogEvent, MediaEngine};
use tokio::sync::mpsc;

use crate::error::FlowError;
use crate::gate::GateError;
use crate::sink::FrameSink;

/// Forwards engine log lines to the server as `logLine` messages.
///
/// The subscription lives exactly as long as the relay: dropping it
/// detaches from the engine on every exit path. The channel is unbounded
/// and nothing is dropped.
pub struct LogRelay {
    rx: mpsc::UnboundedReceiver<LogEvent>,
    sink: FrameSink,
    open: bool,
    forwarded: u64,
}

impl LogRelay {
    pub fn attach(engine: &mut dyn MediaEngine, sink: FrameSink) -> Self {
        Self {
            rx: engine.subscribe_logs(),
            sink,
            open: true,
            forwarded: 0,
        }
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    fn forward(&mut self, event: LogEvent) -> Result<(), GateError> {
        self.forwarded += 1;
        self.sink
            .send_message(&ClientMessage::log_line(event.stream, event.message))
    }

    fn handle(&mut self, received: Option<LogEvent>) -> Result<(), GateError> {
        match received {
            Some(event) => self.forward(event),
            None => {
                self.open = false;
                Ok(())
            }
        }
    }

    /// Forward whatever is still queued once the call has returned.
    fn drain(&mut self) -> Result<(), GateError> {
        while let Ok(event) = self.rx.try_recv() {
            self.forward(event)?;
        }
        Ok(())
    }
}

/// Run the engine call for `mode` with `args`, relaying its log lines.
///
/// `logEnd` is sent once the call has returned successfully. A non-zero
/// exit status is returned, not treated as an error.
pub async fn execute(
    engine: &mut dyn MediaEngine,
    mode: ToolMode,
    args: &[String],
    sink: &FrameSink,
) -> Result<i32, FlowError> {
    let mut relay = LogRelay::attach(engine, sink.clone());

    tracing::info!(mode = mode.as_str(), args = ?args, "Invoking engine");

    let result = {
        let call = async {
            match mode {
                ToolMode::Inspect => engine.inspect(args).await,
                ToolMode::Transform => engine.exec(args).await,
            }
        };
        tokio::pin!(call);

        // Queued lines go out before the call is polled again.
        loop {
            tokio::select! {
                biased;
                received = relay.rx.recv(), if relay.open => relay.handle(received)?,
                result = &mut call => break result,
            }
        }
    };

    relay.drain()?;
    let status = result?;

    if status != 0 {
        tracing::warn!(mode = mode.as_str(), status, "Engine call exited with non-zero status");
    }
    tracing::debug!(status, lines = relay.forwarded(), "Engine call finished");

    sink.send_message(&ClientMessage::LogEnd)?;
    Ok(status)
}
