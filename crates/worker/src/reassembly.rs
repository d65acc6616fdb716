//! Chunked binary receive.

use crate::error::FlowError;
use crate::gate::MessageGate;

/// Upper bound on the buffer reserved up front for one transfer.
///
/// Larger transfers grow the buffer as chunks arrive, so a bogus size
/// declaration cannot force a huge allocation before any data is seen.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Receive binary frames until exactly `total_size` bytes have arrived.
///
/// Chunks may be of any size. A chunk that would push the running
/// total past `total_size` is a protocol violation and nothing of it is
/// kept.
pub async fn receive_exact(gate: &mut MessageGate, total_size: u64) -> Result<Vec<u8>, FlowError> {
    let mut buffer = Vec::with_capacity(total_size.min(MAX_PREALLOCATION) as usize);
    let mut received: u64 = 0;

    while received < total_size {
        let chunk = gate.await_binary().await?;
        let after = received + chunk.len() as u64;
        if after > total_size {
            return Err(FlowError::ChunkOverflow {
                declared: total_size,
                received: after,
            });
        }

        buffer.extend_from_slice(&chunk);
        received = after;
        tracing::trace!(
            chunk = chunk.len(),
            received,
            total = total_size,
            "Received chunk",
        );
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{inbound_channel, GateError, Inbound};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn concatenates_uneven_chunks() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Binary(vec![1, 2, 3])).await.unwrap();
        tx.send(Inbound::Binary(vec![])).await.unwrap();
        tx.send(Inbound::Binary(vec![4])).await.unwrap();
        tx.send(Inbound::Binary(vec![5, 6])).await.unwrap();

        assert_eq!(receive_exact(&mut gate, 6).await.unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn stops_at_declared_size() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Binary(vec![0xAA; 4])).await.unwrap();
        tx.send(Inbound::Text("next".into())).await.unwrap();

        assert_eq!(receive_exact(&mut gate, 4).await.unwrap(), vec![0xAA; 4]);
        assert_eq!(gate.await_text().await.unwrap(), "next");
    }

    #[tokio::test]
    async fn zero_size_reads_nothing() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Text("untouched".into())).await.unwrap();

        assert!(receive_exact(&mut gate, 0).await.unwrap().is_empty());
        assert_eq!(gate.await_text().await.unwrap(), "untouched");
    }

    #[tokio::test]
    async fn overshooting_chunk_is_rejected() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Binary(vec![0; 3])).await.unwrap();
        tx.send(Inbound::Binary(vec![0; 3])).await.unwrap();

        assert_matches!(
            receive_exact(&mut gate, 5).await,
            Err(FlowError::ChunkOverflow { declared: 5, received: 6 })
        );
    }

    #[tokio::test]
    async fn close_mid_transfer_is_channel_closed() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Binary(vec![0; 10])).await.unwrap();
        tx.send(Inbound::Closed("bye".into())).await.unwrap();

        assert_matches!(
            receive_exact(&mut gate, 100).await,
            Err(FlowError::Gate(GateError::ChannelClosed(_)))
        );
    }

    #[tokio::test]
    async fn text_mid_transfer_is_rejected() {
        let (tx, mut gate) = inbound_channel(8);
        tx.send(Inbound::Binary(vec![0; 2])).await.unwrap();
        tx.send(Inbound::Text("[2, 10]".into())).await.unwrap();

        assert_matches!(
            receive_exact(&mut gate, 4).await,
            Err(FlowError::Gate(GateError::UnexpectedFrame { .. }))
        );
    }
}
