//! Outbound side of the job connection.
//!
//! [`FrameSink`] queues frames for the connection's writer task, which
//! forwards them to the WebSocket in order.

use ffpipe_core::messages::ClientMessage;
use tokio::sync::mpsc;

use crate::gate::GateError;

/// A frame queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
    /// Close the connection; nothing queued after this is sent.
    Close,
}

/// Create the outbound channel: the sink goes to the protocol task, the
/// receiver to the transport writer.
pub fn outbound_channel() -> (FrameSink, mpsc::UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FrameSink { tx }, rx)
}

/// Cheaply cloneable handle for sending frames to the server.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl FrameSink {
    /// Send a tagged control message as a text frame.
    pub fn send_message(&self, msg: &ClientMessage) -> Result<(), GateError> {
        self.push(Outbound::Text(msg.to_json()))
    }

    pub fn send_binary(&self, data: Vec<u8>) -> Result<(), GateError> {
        self.push(Outbound::Binary(data))
    }

    /// Ask the writer to close the connection. Never fails.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }

    fn push(&self, frame: Outbound) -> Result<(), GateError> {
        self.tx
            .send(frame)
            .map_err(|_| GateError::ChannelClosed("outbound writer stopped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn frames_are_queued_in_order() {
        let (sink, mut rx) = outbound_channel();
        sink.send_message(&ClientMessage::InputInfoOk).unwrap();
        sink.send_binary(vec![7, 7]).unwrap();
        sink.close();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Text(r#"{"type":"inputInfoOk"}"#.into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Binary(vec![7, 7]));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn send_after_writer_gone_is_channel_closed() {
        let (sink, rx) = outbound_channel();
        drop(rx);
        assert_matches!(sink.send_binary(vec![1]), Err(GateError::ChannelClosed(_)));
        sink.close();
    }
}
