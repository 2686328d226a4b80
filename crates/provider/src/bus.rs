//! Transports for the actuator bus.
//!
//! A transport moves one short frame to the secondary controller. There is
//! no acknowledgement at this layer: `Ok` only means the frame left.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use warden_core::error::{WardenError, WardenResult};

#[async_trait]
pub trait BusTransport: Send {
    async fn transmit(&mut self, frame: &[u8]) -> WardenResult<()>;
}

/// One datagram per frame to a fixed peer.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn connect(bind: &str, peer: &str) -> WardenResult<Self> {
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| WardenError::Bus(format!("cannot bind {bind}: {e}")))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| WardenError::Bus(format!("cannot reach {peer}: {e}")))?;
        tracing::info!(bind, peer, "actuator bus connected");
        Ok(Self { socket })
    }
}

#[async_trait]
impl BusTransport for UdpTransport {
    async fn transmit(&mut self, frame: &[u8]) -> WardenResult<()> {
        let sent = self
            .socket
            .send(frame)
            .await
            .map_err(|e| WardenError::Bus(e.to_string()))?;
        if sent != frame.len() {
            return Err(WardenError::Bus(format!(
                "short send: {sent} of {} bytes",
                frame.len()
            )));
        }
        Ok(())
    }
}

/// Logs frames instead of sending them.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl BusTransport for LogTransport {
    async fn transmit(&mut self, frame: &[u8]) -> WardenResult<()> {
        tracing::info!(command = %String::from_utf8_lossy(frame), "bus (log only)");
        Ok(())
    }
}

/// Keeps every frame it is given; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames transmitted so far, decoded as text.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut s) = self.sent.lock() {
            s.clear();
        }
    }

    /// While failing, frames are rejected and not recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BusTransport for RecordingTransport {
    async fn transmit(&mut self, frame: &[u8]) -> WardenResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WardenError::Bus("peer not responding".into()));
        }
        let text = String::from_utf8_lossy(frame).into_owned();
        self.sent
            .lock()
            .map_err(|_| WardenError::Bus("recorder poisoned".into()))?
            .push(text);
        Ok(())
    }
}
