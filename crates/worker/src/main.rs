//! `ffpipe-worker` -- media job worker.
//!
//! Connects to a dispatch server over WebSocket, receives jobs (an
//! ffmpeg/ffprobe argument vector plus input files), runs them against
//! local `ffmpeg`/`ffprobe` binaries and streams logs and output files
//! back.
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default                | Description                          |
//! |--------------------------|----------|------------------------|--------------------------------------|
//! | `SERVER_WS_URL`          | yes      | --                     | WebSocket endpoint, e.g. `ws://host:8080/ffmpeg` |
//! | `RECONNECT_DELAY_SECS`   | no       | `5`                    | Seconds to wait before reconnecting  |
//! | `FFMPEG_BIN`             | no       | `ffmpeg`               | Transform tool binary                |
//! | `FFPROBE_BIN`            | no       | `ffprobe`              | Inspect tool binary                  |
//! | `SCRATCH_DIR`            | no       | `<system temp>/ffpipe` | Parent of per-job scratch directories |
//! | `INBOUND_QUEUE_CAPACITY` | no       | `64`                   | Inbound frames buffered per connection |

use ffpipe_engine::ProcessEngineFactory;
use ffpipe_worker::config::WorkerConfig;
use ffpipe_worker::session::SessionContext;
use ffpipe_worker::supervisor;
use tokio_util::sync::CancellationToken;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ffpipe_worker=info,ffpipe_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        url = %config.server_url,
        ffmpeg = %config.engine.ffmpeg_bin.display(),
        ffprobe = %config.engine.ffprobe_bin.display(),
        scratch = %config.engine.scratch_root.display(),
        "Starting ffpipe-worker",
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let factory = ProcessEngineFactory::new(config.engine.clone());
    let mut ctx = SessionContext::new();

    supervisor::run(&config, &factory, &mut ctx, &shutdown).await;
}
