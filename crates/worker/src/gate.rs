//! Typed waits on the inbound side of the job connection.
//!
//! The connection's reader task pushes every inbound frame into a
//! bounded channel in arrival order. [`MessageGate`] owns the receiving
//! end and suspends the caller until the next frame is available, then
//! checks that it is of the kind the protocol step requires.
//!
//! The policy is strict: a frame of the wrong kind fails the wait with
//! [`GateError::UnexpectedFrame`] instead of being skipped. Once the
//! transport reports close or error, that wait and every later one fail
//! with [`GateError::ChannelClosed`].

use std::fmt;

use ffpipe_core::messages::{InputDeclaration, ServerMessage};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

/// Default number of inbound frames buffered ahead of the protocol task.
pub const DEFAULT_INBOUND_CAPACITY: usize = 64;

/// An inbound transport event, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection.
    Closed(String),
    /// The transport failed.
    Error(String),
}

/// Kind of a data frame, for mismatch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Text => f.write_str("text"),
            FrameKind::Binary => f.write_str("binary"),
        }
    }
}

/// Errors from waiting on the inbound channel.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The transport closed or failed; no further frames will arrive.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Expected {expected} frame, received {received} frame")]
    UnexpectedFrame {
        expected: FrameKind,
        received: FrameKind,
    },

    #[error("Malformed {what}: {source}")]
    Malformed {
        what: &'static str,
        source: serde_json::Error,
    },
}

/// Create the inbound channel: the sender goes to the transport reader,
/// the gate to the protocol task.
pub fn inbound_channel(capacity: usize) -> (mpsc::Sender<Inbound>, MessageGate) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, MessageGate::new(rx))
}

/// Receiving end of the inbound channel with typed waits.
pub struct MessageGate {
    rx: mpsc::Receiver<Inbound>,
    closed: Option<String>,
}

impl MessageGate {
    pub fn new(rx: mpsc::Receiver<Inbound>) -> Self {
        Self { rx, closed: None }
    }

    /// Whether close or error has been observed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// Check, without waiting, whether the transport has already closed.
    ///
    /// Data frames still queued ahead of the close are discarded, so call
    /// this only once the current exchange has been abandoned.
    pub fn pending_close(&mut self) -> Option<String> {
        while self.closed.is_none() {
            match self.rx.try_recv() {
                Ok(Inbound::Closed(reason) | Inbound::Error(reason)) => self.mark_closed(reason),
                Ok(_) => continue,
                Err(mpsc::error::TryRecvError::Empty) => return None,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.mark_closed("inbound stream ended".to_string())
                }
            }
        }
        self.closed.clone()
    }

    fn mark_closed(&mut self, reason: String) {
        tracing::debug!(reason = %reason, "Inbound channel closed");
        self.closed = Some(reason);
        self.rx.close();
    }

    /// Wait for the next data frame, whatever its kind.
    async fn next_frame(&mut self) -> Result<Inbound, GateError> {
        if let Some(reason) = &self.closed {
            return Err(GateError::ChannelClosed(reason.clone()));
        }

        let event = self
            .rx
            .recv()
            .await
            .unwrap_or_else(|| Inbound::Closed("inbound stream ended".to_string()));

        match event {
            Inbound::Closed(reason) | Inbound::Error(reason) => {
                self.mark_closed(reason.clone());
                Err(GateError::ChannelClosed(reason))
            }
            frame => Ok(frame),
        }
    }

    /// Wait for the next text frame.
    pub async fn await_text(&mut self) -> Result<String, GateError> {
        match self.next_frame().await? {
            Inbound::Text(text) => Ok(text),
            _ => Err(GateError::UnexpectedFrame {
                expected: FrameKind::Text,
                received: FrameKind::Binary,
            }),
        }
    }

    /// Wait for the next binary frame.
    pub async fn await_binary(&mut self) -> Result<Vec<u8>, GateError> {
        match self.next_frame().await? {
            Inbound::Binary(data) => Ok(data),
            _ => Err(GateError::UnexpectedFrame {
                expected: FrameKind::Binary,
                received: FrameKind::Text,
            }),
        }
    }

    /// Wait for a tagged control message from the server.
    pub async fn await_server_message(&mut self) -> Result<ServerMessage, GateError> {
        self.await_json("control message").await
    }

    /// Wait for an `[index, byteSize]` input declaration.
    pub async fn await_input_declaration(&mut self) -> Result<InputDeclaration, GateError> {
        self.await_json("input declaration").await
    }

    async fn await_json<T: DeserializeOwned>(&mut self, what: &'static str) -> Result<T, GateError> {
        let text = self.await_text().await?;
        serde_json::from_str(text.trim()).map_err(|source| {
            tracing::warn!(raw = %text, "Failed to parse {what}");
            GateError::Malformed { what, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn frames_delivered_in_arrival_order() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Text("one".into())).await.unwrap();
        tx.send(Inbound::Binary(vec![1, 2])).await.unwrap();
        tx.send(Inbound::Text("two".into())).await.unwrap();

        assert_eq!(gate.await_text().await.unwrap(), "one");
        assert_eq!(gate.await_binary().await.unwrap(), vec![1, 2]);
        assert_eq!(gate.await_text().await.unwrap(), "two");
    }

    #[tokio::test]
    async fn wait_suspends_until_a_frame_arrives() {
        let (tx, mut gate) = inbound_channel(8);
        let waiter = tokio::spawn(async move { gate.await_binary().await });

        tokio::task::yield_now().await;
        tx.send(Inbound::Binary(vec![9; 4])).await.unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), vec![9; 4]);
    }

    #[tokio::test]
    async fn wrong_kind_is_rejected() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Binary(vec![0])).await.unwrap();
        tx.send(Inbound::Text("late".into())).await.unwrap();

        assert_matches!(
            gate.await_text().await,
            Err(GateError::UnexpectedFrame { expected: FrameKind::Text, received: FrameKind::Binary })
        );
        assert_matches!(
            gate.await_binary().await,
            Err(GateError::UnexpectedFrame { expected: FrameKind::Binary, received: FrameKind::Text })
        );
    }

    #[tokio::test]
    async fn close_fails_pending_and_later_waits() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Closed("going away".into())).await.unwrap();
        tx.send(Inbound::Text("after close".into())).await.ok();

        assert_matches!(gate.await_text().await, Err(GateError::ChannelClosed(r)) if r == "going away");
        assert_matches!(gate.await_binary().await, Err(GateError::ChannelClosed(_)));
        assert!(gate.is_closed());
    }

    #[tokio::test]
    async fn transport_error_is_channel_closed() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Error("connection reset".into())).await.unwrap();
        assert_matches!(gate.await_binary().await, Err(GateError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn dropped_sender_is_channel_closed() {
        let (tx, mut gate) = inbound_channel(8);
        drop(tx);
        assert_matches!(gate.await_text().await, Err(GateError::ChannelClosed(_)));
    }

    #[tokio::test]
    async fn pending_close_sees_queued_close_without_waiting() {
        let (tx, mut gate) = inbound_channel(8);
        assert_eq!(gate.pending_close(), None);

        tx.send(Inbound::Binary(vec![1; 8])).await.unwrap();
        assert_eq!(gate.pending_close(), None);

        tx.send(Inbound::Binary(vec![2; 8])).await.unwrap();
        tx.send(Inbound::Closed("going away".into())).await.unwrap();
        assert_eq!(gate.pending_close().as_deref(), Some("going away"));
        assert!(gate.is_closed());
        assert_matches!(gate.await_binary().await, Err(GateError::ChannelClosed(r)) if r == "going away");

        drop(tx);
        let (tx, mut gate) = inbound_channel(8);
        drop(tx);
        assert_eq!(gate.pending_close().as_deref(), Some("inbound stream ended"));
    }

    #[tokio::test]
    async fn parses_control_messages_and_declarations() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Text(r#"{"type":"ready"}"#.into())).await.unwrap();
        tx.send(Inbound::Text("[2, 1024]\n".into())).await.unwrap();
        tx.send(Inbound::Text("not json".into())).await.unwrap();

        assert_eq!(gate.await_server_message().await.unwrap(), ServerMessage::Ready);
        assert_eq!(gate.await_input_declaration().await.unwrap(), InputDeclaration(2, 1024));
        assert_matches!(
            gate.await_server_message().await,
            Err(GateError::Malformed { what: "control message", .. })
        );
    }
}
