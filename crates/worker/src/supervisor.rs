//! Connect, run jobs, reconnect.
//!
//! Each connection gets its own cancellation token, a child of the
//! shutdown token, so a shutdown tears down the current job as well.

use ffpipe_engine::EngineFactory;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::connection::Connection;
use crate::cycle::cycle_jobs;
use crate::error::FlowError;
use crate::events::WorkerEvent;
use crate::session::SessionContext;

/// Run the worker until `shutdown` is cancelled.
///
/// Connection failures and ended connections are retried after
/// `config.reconnect_delay`.
pub async fn run(
    config: &WorkerConfig,
    factory: &dyn EngineFactory,
    ctx: &mut SessionContext,
    shutdown: &CancellationToken,
) {
    loop {
        tracing::info!(url = %config.server_url, "Connecting to dispatch server");

        let connected = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = connect_async(config.server_url.as_str()) => result,
        };

        match connected {
            Ok((ws_stream, _response)) => {
                tracing::info!("WebSocket connected");
                ctx.emit(WorkerEvent::Connected {
                    url: config.server_url.clone(),
                });

                let cancel = shutdown.child_token();
                let mut conn = Connection::attach(ws_stream, config.inbound_capacity, cancel.clone());
                let result = cycle_jobs(ctx, factory, &mut conn.gate, &conn.sink, &cancel).await;
                conn.shutdown().await;

                let reason = match result {
                    Ok(()) => "closed by server".to_string(),
                    Err(e @ FlowError::Cancelled) => {
                        tracing::info!("Connection cancelled");
                        e.to_string()
                    }
                    Err(e) if e.is_channel_closed() => {
                        tracing::info!(error = %e, "Connection lost");
                        e.to_string()
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Connection ended by job failure");
                        e.to_string()
                    }
                };
                ctx.emit(WorkerEvent::Disconnected { reason });
            }
            Err(e) => {
                tracing::error!(error = %e, "WebSocket connection failed");
            }
        }

        if shutdown.is_cancelled() {
            break;
        }

        tracing::info!(delay_secs = config.reconnect_delay.as_secs(), "Reconnecting after delay");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    tracing::info!(jobs = ctx.jobs_started(), "Worker stopped");
}
