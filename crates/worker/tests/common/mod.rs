//! Shared test helpers: an in-memory scripted engine and frame helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ffpipe_engine::{EngineError, EngineFactory, LogEvent, MediaEngine};
use ffpipe_worker::gate::Inbound;
use ffpipe_worker::sink::Outbound;
use tokio::sync::mpsc;

/// What the scripted engine does when `exec`/`inspect` is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Copy the file following `-i` to the last argument, like
    /// `ffmpeg -i in -c copy out`.
    Copy,
    /// Succeed without producing any file.
    NoOutput,
    /// Fail the call.
    Fail,
    /// Never return.
    Hang,
    /// Like `Copy`, after [`CHATTY_LINES`] progress lines on stderr.
    Chatty,
}

/// Number of progress lines a [`Behavior::Chatty`] call emits.
pub const CHATTY_LINES: usize = 20_000;

/// Shared view into every engine a [`ScriptedFactory`] has loaded.
#[derive(Debug, Clone, Default)]
pub struct EngineRecord {
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    pub loaded: Arc<AtomicUsize>,
    pub terminated: Arc<AtomicUsize>,
}

impl EngineRecord {
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

pub struct ScriptedEngine {
    behavior: Behavior,
    record: EngineRecord,
    log_tx: Option<mpsc::UnboundedSender<LogEvent>>,
    terminated: bool,
}

impl ScriptedEngine {
    pub fn new(behavior: Behavior, record: EngineRecord) -> Self {
        Self {
            behavior,
            record,
            log_tx: None,
            terminated: false,
        }
    }

    fn check(&self) -> Result<(), EngineError> {
        if self.terminated {
            Err(EngineError::Terminated)
        } else {
            Ok(())
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(tx) = &self.log_tx {
            let _ = tx.send(event);
        }
    }

    async fn run(&mut self, args: &[String], tool: &str) -> Result<i32, EngineError> {
        self.check()?;
        self.record.calls.lock().unwrap().push(args.to_vec());
        self.log(LogEvent::stderr(format!("{tool} version test")));

        if self.behavior == Behavior::Chatty {
            for frame in 1..=CHATTY_LINES {
                self.log(LogEvent::stderr(format!("frame={frame}")));
                if frame % 500 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }

        match self.behavior {
            Behavior::Copy | Behavior::Chatty => {
                let input = args
                    .iter()
                    .position(|a| a == "-i")
                    .and_then(|i| args.get(i + 1))
                    .ok_or_else(|| EngineError::Failed("no input".into()))?;
                let output = args.last().ok_or_else(|| EngineError::Failed("no output".into()))?;

                let mut files = self.record.files.lock().unwrap();
                let data = files
                    .get(input.as_str())
                    .cloned()
                    .ok_or_else(|| EngineError::FileNotFound(input.clone()))?;
                files.insert(output.clone(), data);
                drop(files);

                self.log(LogEvent::stdout("copied"));
                Ok(0)
            }
            Behavior::NoOutput => {
                self.log(LogEvent::stdout("nothing to do"));
                Ok(1)
            }
            Behavior::Fail => Err(EngineError::Failed("scripted failure".into())),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.check()?;
        self.record.files.lock().unwrap().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.check()?;
        self.record
            .file(name)
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }

    async fn delete_file(&mut self, name: &str) -> Result<(), EngineError> {
        self.check()?;
        self.record
            .files
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }

    async fn exec(&mut self, args: &[String]) -> Result<i32, EngineError> {
        self.run(args, "ffmpeg").await
    }

    async fn inspect(&mut self, args: &[String]) -> Result<i32, EngineError> {
        self.check()?;
        self.record.calls.lock().unwrap().push(args.to_vec());
        self.log(LogEvent::stdout("codec_name=h264"));
        self.log(LogEvent::stderr("Input #0, matroska"));
        Ok(0)
    }

    fn subscribe_logs(&mut self) -> mpsc::UnboundedReceiver<LogEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.log_tx = Some(tx);
        rx
    }

    async fn terminate(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.record.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct ScriptedFactory {
    pub behavior: Behavior,
    pub record: EngineRecord,
}

impl ScriptedFactory {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            record: EngineRecord::default(),
        }
    }
}

#[async_trait]
impl EngineFactory for ScriptedFactory {
    async fn load(&self) -> Result<Box<dyn MediaEngine>, EngineError> {
        self.record.loaded.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedEngine::new(self.behavior, self.record.clone())))
    }
}

pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn text(value: serde_json::Value) -> Inbound {
    Inbound::Text(value.to_string())
}

/// Queue `frames` on the inbound channel.
pub async fn feed(tx: &mpsc::Sender<Inbound>, frames: Vec<Inbound>) {
    for frame in frames {
        tx.send(frame).await.unwrap();
    }
}

/// Everything the worker has queued for sending so far.
pub fn sent(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

/// The parsed JSON of every text frame, in order.
pub fn sent_json(frames: &[Outbound]) -> Vec<serde_json::Value> {
    frames
        .iter()
        .filter_map(|f| match f {
            Outbound::Text(t) => Some(serde_json::from_str(t).unwrap()),
            _ => None,
        })
        .collect()
}

/// The `"type"` of every text frame, in order.
pub fn sent_types(frames: &[Outbound]) -> Vec<String> {
    sent_json(frames)
        .iter()
        .map(|v| v["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// `len` bytes of a recognisable pattern.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
