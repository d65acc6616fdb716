//! Media engine backed by native `ffmpeg`/`ffprobe` processes.
//!
//! Each [`ProcessEngine`] owns a scratch directory that plays the role
//! of the engine's private filesystem: staged inputs are written there,
//! the tools run with it as their working directory, and outputs are
//! read back from it. Tool stdout/stderr are split into lines and
//! handed to the log subscriber as [`LogEvent`]s while the call runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use ffpipe_core::messages::LogStream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::engine::{EngineFactory, LogEvent, MediaEngine};
use crate::error::EngineError;

/// Arguments prepended to every transform call.
///
/// `-nostdin` keeps ffmpeg from waiting on a terminal; `-y` lets it
/// overwrite the pre-named output files.
const EXEC_PREFIX: [&str; 2] = ["-nostdin", "-y"];

/// Locations of the tool binaries and the scratch area.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    /// Parent directory for per-instance scratch directories.
    pub scratch_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            scratch_root: std::env::temp_dir().join("ffpipe"),
        }
    }
}

/// Creates a [`ProcessEngine`] with a fresh scratch directory per call.
#[derive(Debug, Clone)]
pub struct ProcessEngineFactory {
    config: EngineConfig,
}

impl ProcessEngineFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineFactory for ProcessEngineFactory {
    async fn load(&self) -> Result<Box<dyn MediaEngine>, EngineError> {
        let engine = ProcessEngine::load(&self.config).await?;
        Ok(Box::new(engine))
    }
}

/// One engine instance: a scratch directory plus the tool locations.
pub struct ProcessEngine {
    dir: PathBuf,
    ffmpeg_bin: PathBuf,
    ffprobe_bin: PathBuf,
    log_tx: Option<mpsc::UnboundedSender<LogEvent>>,
    terminated: bool,
}

impl ProcessEngine {
    /// Create the instance's scratch directory under `config.scratch_root`.
    pub async fn load(config: &EngineConfig) -> Result<Self, EngineError> {
        let dir = config
            .scratch_root
            .join(format!("engine-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;

        tracing::debug!(dir = %dir.display(), "Engine instance loaded");

        Ok(Self {
            dir,
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            ffprobe_bin: config.ffprobe_bin.clone(),
            log_tx: None,
            terminated: false,
        })
    }

    /// The scratch directory backing this instance.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a plain file name into the scratch directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        if self.terminated {
            return Err(EngineError::Terminated);
        }
        if !is_plain_name(name) {
            return Err(EngineError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    async fn run_tool(&self, program: &Path, prefix: &[&str], args: &[String]) -> Result<i32, EngineError> {
        if self.terminated {
            return Err(EngineError::Terminated);
        }

        let mut child = Command::new(program)
            .args(prefix)
            .args(args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain both pipes alongside `wait` so a chatty tool never blocks
        // on a full pipe, and every line is queued before we return.
        let log_tx = self.log_tx.as_ref();
        let (status, (), ()) = tokio::join!(
            child.wait(),
            forward_lines(stdout, LogStream::Stdout, log_tx),
            forward_lines(stderr, LogStream::Stderr, log_tx),
        );

        let status = status?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[async_trait]
impl MediaEngine for ProcessEngine {
    async fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| not_found_or_io(e, name))
    }

    async fn delete_file(&mut self, name: &str) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(e, name))
    }

    async fn exec(&mut self, args: &[String]) -> Result<i32, EngineError> {
        self.run_tool(&self.ffmpeg_bin, &EXEC_PREFIX, args).await
    }

    async fn inspect(&mut self, args: &[String]) -> Result<i32, EngineError> {
        self.run_tool(&self.ffprobe_bin, &[], args).await
    }

    fn subscribe_logs(&mut self) -> mpsc::UnboundedReceiver<LogEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.log_tx = Some(tx);
        rx
    }

    async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            tracing::debug!(dir = %self.dir.display(), error = %e, "Failed to remove engine scratch dir");
        }
        tracing::debug!(dir = %self.dir.display(), "Engine instance terminated");
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        if !self.terminated {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

/// Names must stay inside the scratch directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

fn not_found_or_io(e: std::io::Error, name: &str) -> EngineError {
    if e.kind() == std::io::ErrorKind::NotFound {
        EngineError::FileNotFound(name.to_string())
    } else {
        EngineError::Io(e)
    }
}

/// Send each line of `reader` as a [`LogEvent`] until EOF.
///
/// Both `\n` and `\r` end a line, so ffmpeg's carriage-return progress
/// updates come through one by one. Empty lines are skipped.
async fn forward_lines<R>(reader: Option<R>, stream: LogStream, tx: Option<&mpsc::UnboundedSender<LogEvent>>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        let (consumed, complete) = match reader.fill_buf().await {
            Ok([]) => break,
            Ok(available) => match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    line.extend_from_slice(&available[..end]);
                    (end + 1, true)
                }
                None => {
                    line.extend_from_slice(available);
                    (available.len(), false)
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "Engine log pipe read failed");
                break;
            }
        };
        reader.consume(consumed);

        if complete {
            emit_line(&mut line, stream, tx);
        }
    }
    emit_line(&mut line, stream, tx);
}

fn emit_line(line: &mut Vec<u8>, stream: LogStream, tx: Option<&mpsc::UnboundedSender<LogEvent>>) {
    if line.is_empty() {
        return;
    }
    let message = String::from_utf8_lossy(line).into_owned();
    line.clear();
    // A dropped receiver just means nobody is relaying right now.
    if let Some(tx) = tx {
        let _ = tx.send(LogEvent { stream, message });
    }
}
