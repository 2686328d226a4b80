//! Actuator bus: commands to the secondary controller.
//!
//! Sends are best-effort: no acknowledgement, no retry, no queue. A frame
//! that fails to go out is logged and dropped.

use crate::BestEffort;
use warden_core::types::Command;
use warden_provider::BusTransport;

pub struct ActuatorBus {
    transport: Box<dyn BusTransport>,
    max_frame_len: usize,
    dropped: u64,
}

impl ActuatorBus {
    pub fn new(transport: Box<dyn BusTransport>, max_frame_len: usize) -> Self {
        Self {
            transport,
            max_frame_len,
            dropped: 0,
        }
    }

    pub async fn send(&mut self, command: Command) -> BestEffort {
        let frame = command.encode();
        if frame.len() > self.max_frame_len {
            self.dropped += 1;
            tracing::warn!(%command, len = frame.len(), "frame exceeds bus limit, dropped");
            return BestEffort::Skipped;
        }

        match self.transport.transmit(&frame).await {
            Ok(()) => {
                tracing::debug!(%command, "bus send");
                BestEffort::Delivered
            }
            Err(e) => {
                self.dropped += 1;
                tracing::warn!(%command, error = %e, "bus send failed");
                BestEffort::Failed
            }
        }
    }

    /// Commands dropped since start.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
