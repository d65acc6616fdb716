//! Bridges a WebSocket stream to the gate and sink.
//!
//! The stream is split: a reader task feeds inbound frames into the
//! [`MessageGate`] channel, a writer task drains the [`FrameSink`]
//! channel into the socket. Transport close or error cancels the
//! connection token so a running job is torn down as well.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::gate::{inbound_channel, Inbound, MessageGate};
use crate::sink::{outbound_channel, FrameSink, Outbound};

/// A live job connection.
pub struct Connection {
    pub gate: MessageGate,
    pub sink: FrameSink,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Spawn the reader and writer tasks for `ws`.
    ///
    /// `cancel` is cancelled when the transport closes or fails, and
    /// cancelling it stops both tasks.
    pub fn attach<S>(ws: WebSocketStream<S>, inbound_capacity: usize, cancel: CancellationToken) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write, read) = ws.split();
        let (inbound_tx, gate) = inbound_channel(inbound_capacity);
        let (sink, outbound_rx) = outbound_channel();

        let reader = tokio::spawn(read_loop(read, inbound_tx, cancel.clone()));
        let writer = tokio::spawn(write_loop(write, outbound_rx, cancel.clone()));

        Self {
            gate,
            sink,
            cancel,
            reader,
            writer,
        }
    }

    /// Flush queued frames, close the socket and wait for both tasks.
    pub async fn shutdown(self) {
        self.sink.close();
        drop(self.sink);
        drop(self.gate);

        if let Err(e) = self.writer.await {
            tracing::debug!(error = %e, "Connection writer task failed");
        }
        self.cancel.cancel();
        if let Err(e) = self.reader.await {
            tracing::debug!(error = %e, "Connection reader task failed");
        }
    }
}

async fn read_loop<R>(mut read: R, tx: mpsc::Sender<Inbound>, cancel: CancellationToken)
where
    R: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = read.next() => msg,
        };

        let event = match msg {
            Some(Ok(Message::Text(text))) => Inbound::Text(text),
            Some(Ok(Message::Binary(data))) => Inbound::Binary(data),
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Server closed WebSocket");
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "closed by server".to_string());
                close(&tx, &cancel, Inbound::Closed(reason));
                break;
            }
            Some(Ok(_)) => {
                // Ping / Pong / raw frames: handled by tungstenite.
                continue;
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "WebSocket receive error");
                close(&tx, &cancel, Inbound::Error(e.to_string()));
                break;
            }
            None => {
                close(&tx, &cancel, Inbound::Closed("stream ended".to_string()));
                break;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(event) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

/// Report the end of the transport: queue the close for any pending wait,
/// then cancel so a job blocked on the engine is released. The close is
/// queued first so the cancelled job can tell it apart from a shutdown.
fn close(tx: &mpsc::Sender<Inbound>, cancel: &CancellationToken, event: Inbound) {
    let _ = tx.try_send(event);
    cancel.cancel();
}

async fn write_loop<W>(mut write: W, mut rx: mpsc::UnboundedReceiver<Outbound>, cancel: CancellationToken)
where
    W: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            frame = rx.recv() => frame,
            _ = cancel.cancelled() => None,
        };

        let message = match frame {
            Some(Outbound::Text(text)) => Message::Text(text),
            Some(Outbound::Binary(data)) => Message::Binary(data),
            Some(Outbound::Close) | None => break,
        };

        if let Err(e) = write.send(message).await {
            tracing::warn!(error = %e, "WebSocket send failed");
            cancel.cancel();
            return;
        }
    }

    if let Err(e) = write.close().await {
        tracing::debug!(error = %e, "WebSocket close failed");
    }
}
