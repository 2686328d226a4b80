//! Fingerprint sensor seam.
//!
//! The sensor's own imaging and template protocol lives behind
//! [`FingerprintSensor`]; the controller only sees a [`ScanOutcome`] per
//! capture attempt.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use warden_core::error::{WardenError, WardenResult};
use warden_core::types::{IdentityId, ScanOutcome};

#[async_trait]
pub trait FingerprintSensor: Send {
    /// Start-up self-check. An error here means no usable sensor.
    async fn verify(&mut self) -> WardenResult<()>;

    /// One bounded capture-and-match attempt. Never blocks waiting for a
    /// finger: with nothing on the glass it returns [`ScanOutcome::Busy`].
    async fn capture_and_match(&mut self) -> ScanOutcome;
}

// ---------------------------------------------------------------------------
// Console sensor
// ---------------------------------------------------------------------------

/// Bench sensor driven by text commands, one per line:
///
/// ```text
/// match 7 120     # template 7 matched with confidence 120
/// nomatch
/// error           # imaging failure
/// comm            # packet error
/// ```
///
/// Lines are read on a background task so captures never wait on input.
pub struct ConsoleSensor {
    rx: mpsc::Receiver<ScanOutcome>,
}

impl ConsoleSensor {
    pub fn stdin() -> Self {
        Self::spawn(tokio::io::stdin())
    }

    pub fn spawn<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(outcome) = parse_line(&line) else {
                            if !line.trim().is_empty() {
                                tracing::warn!(line, "unrecognized sensor command");
                            }
                            continue;
                        };
                        if tx.send(outcome).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "sensor input closed");
                        break;
                    }
                }
            }
        });
        Self { rx }
    }
}

/// Parses one console command.
pub fn parse_line(line: &str) -> Option<ScanOutcome> {
    let mut words = line.split_whitespace();
    match words.next()? {
        "match" => {
            let id = words.next()?.parse::<u16>().ok()?;
            let confidence = match words.next() {
                Some(w) => w.parse::<u16>().ok()?,
                None => 100,
            };
            Some(ScanOutcome::Match {
                id: IdentityId::from_sensor(id),
                confidence,
            })
        }
        "nomatch" => Some(ScanOutcome::NoMatch),
        "error" => Some(ScanOutcome::SensorError),
        "comm" => Some(ScanOutcome::CommError),
        _ => None,
    }
}

#[async_trait]
impl FingerprintSensor for ConsoleSensor {
    async fn verify(&mut self) -> WardenResult<()> {
        Ok(())
    }

    async fn capture_and_match(&mut self) -> ScanOutcome {
        self.rx.try_recv().unwrap_or(ScanOutcome::Busy)
    }
}

// ---------------------------------------------------------------------------
// Scripted sensor
// ---------------------------------------------------------------------------

/// Replays queued outcomes, then reports `Busy`. Clones share the queue.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    queue: Arc<Mutex<VecDeque<ScanOutcome>>>,
    captures: Arc<Mutex<usize>>,
    present: bool,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self {
            queue: Arc::default(),
            captures: Arc::default(),
            present: true,
        }
    }

    /// A sensor that fails its self-check.
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    pub fn push(&self, outcome: ScanOutcome) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(outcome);
        }
    }

    /// Number of capture attempts made so far.
    pub fn captures(&self) -> usize {
        self.captures.lock().map(|c| *c).unwrap_or_default()
    }
}

impl Default for ScriptedSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FingerprintSensor for ScriptedSensor {
    async fn verify(&mut self) -> WardenResult<()> {
        if self.present {
            Ok(())
        } else {
            Err(WardenError::Sensor("no response to handshake".into()))
        }
    }

    async fn capture_and_match(&mut self) -> ScanOutcome {
        if let Ok(mut c) = self.captures.lock() {
            *c += 1;
        }
        self.queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(ScanOutcome::Busy)
    }
}
