//! Remote state mirror.
//!
//! Polls the relay bank, the door lock flag, and the failed-attempt counter
//! on independent schedules and turns remote changes into actuator
//! commands. Remote I/O errors stop here: they only flip the reachability
//! flag, and the next successful operation flips it back. Writes are held
//! back only while the last read failed; a failed write never blocks the
//! writes after it.

use crate::actuator::ActuatorBus;
use crate::lockout::{Reconcile, Transition};
use crate::schedule::Schedule;
use crate::session::{Session, Shadow};
use crate::BestEffort;
use tokio::time::{Duration, Instant};
use warden_core::config::{IntervalSettings, RemoteSettings};
use warden_core::types::{Command, PropertyKind, PropertyValue};
use warden_core::RemotePaths;
use warden_provider::RemoteStore;

/// A read that did not reach the remote. Already logged.
struct Unreachable;

pub struct RemoteMirror {
    store: Box<dyn RemoteStore>,
    paths: RemotePaths,
    timeout: Duration,
    relays: Vec<Shadow<bool>>,
    relay_schedule: Schedule,
    door_schedule: Schedule,
    counter_schedule: Schedule,
    /// Outcome of the latest read or write.
    connected: bool,
    /// Outcome of the latest read. Gates writes.
    readable: bool,
}

impl RemoteMirror {
    pub fn new(
        store: Box<dyn RemoteStore>,
        paths: RemotePaths,
        relay_count: u8,
        intervals: &IntervalSettings,
        remote: &RemoteSettings,
    ) -> Self {
        Self {
            store,
            paths,
            timeout: remote.timeout(),
            relays: vec![Shadow::default(); usize::from(relay_count)],
            relay_schedule: Schedule::new(intervals.relay()),
            door_schedule: Schedule::new(intervals.door()),
            counter_schedule: Schedule::new(intervals.failed_attempts()),
            // Unknown until the first operation succeeds.
            connected: false,
            readable: false,
        }
    }

    pub fn paths(&self) -> &RemotePaths {
        &self.paths
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Shadow of relay `id` (1-based).
    pub fn relay_shadow(&self, id: u8) -> Option<bool> {
        let idx = usize::from(id).checked_sub(1)?;
        self.relays.get(idx).and_then(|s| s.get())
    }

    /// Runs every poll whose interval has elapsed, in the order relays,
    /// door, counter. The first unreachable read ends the cycle.
    pub async fn poll(&mut self, now: Instant, session: &mut Session, bus: &mut ActuatorBus) {
        if self.relay_schedule.fire(now) && self.poll_relays(bus).await.is_err() {
            return;
        }
        if self.door_schedule.fire(now) && self.poll_door(session, bus).await.is_err() {
            return;
        }
        if self.counter_schedule.fire(now) {
            let _ = self.poll_counter(session).await;
        }
    }

    async fn poll_relays(&mut self, bus: &mut ActuatorBus) -> Result<(), Unreachable> {
        for idx in 0..self.relays.len() {
            let id = (idx + 1) as u8;
            let path = self.paths.relay_state(id);
            let Some(on) = self.read(&path, PropertyKind::Bool).await?.and_then(|v| v.as_bool())
            else {
                continue;
            };
            if self.relays[idx].update(on) {
                tracing::info!(relay = id, on, "relay changed remotely");
                bus.send(Command::Relay { id, on }).await;
            }
        }
        Ok(())
    }

    async fn poll_door(
        &mut self,
        session: &mut Session,
        bus: &mut ActuatorBus,
    ) -> Result<(), Unreachable> {
        let path = self.paths.door_lock();
        let Some(locked) = self.read(path, PropertyKind::Bool).await?.and_then(|v| v.as_bool())
        else {
            return Ok(());
        };
        if session.door.observe_remote(locked) {
            tracing::info!(locked, "door lock changed remotely");
            bus.send(Command::door(locked)).await;
        }
        Ok(())
    }

    async fn poll_counter(&mut self, session: &mut Session) -> Result<(), Unreachable> {
        let path = self.paths.failed_attempts();
        let Some(remote) = self.read(&path, PropertyKind::Int).await?.and_then(|v| v.as_int())
        else {
            return Ok(());
        };
        let remote = u32::try_from(remote.max(0)).unwrap_or(u32::MAX);

        if let Reconcile::Overwritten {
            previous,
            transition,
        } = session.lockout.reconcile(remote)
        {
            tracing::info!(local = previous, remote, "failed attempts synced from remote");
            match transition {
                Some(Transition::Released) => {
                    tracing::info!("system unlocked: failed attempts reset remotely")
                }
                Some(Transition::Engaged) => {
                    tracing::warn!("system locked: failed attempts raised remotely")
                }
                None => {}
            }
        }
        Ok(())
    }

    /// One bounded read. `Ok(None)` for an absent or mistyped property.
    async fn read(
        &mut self,
        path: &str,
        kind: PropertyKind,
    ) -> Result<Option<PropertyValue>, Unreachable> {
        let result = tokio::time::timeout(self.timeout, self.store.read(path)).await;
        let json = match result {
            Ok(Ok(json)) => json,
            Ok(Err(e)) => {
                self.readable = false;
                self.mark_disconnected(path, &e.to_string());
                return Err(Unreachable);
            }
            Err(_) => {
                self.readable = false;
                self.mark_disconnected(path, "timed out");
                return Err(Unreachable);
            }
        };
        self.readable = true;
        self.mark_connected();

        match PropertyValue::from_json(kind, &json) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(path, error = %e, "ignoring remote value");
                Ok(None)
            }
        }
    }

    /// Fire-and-forget write. Skipped while the last read failed; the
    /// outcome only updates the reachability flag.
    pub async fn push(&mut self, path: &str, value: impl Into<PropertyValue>) -> BestEffort {
        let value = value.into();
        if !self.readable {
            tracing::debug!(path, "remote unreachable, write skipped");
            return BestEffort::Skipped;
        }

        match tokio::time::timeout(self.timeout, self.store.write(path, value.to_json())).await {
            Ok(Ok(())) => {
                self.mark_connected();
                BestEffort::Delivered
            }
            Ok(Err(e)) => {
                self.mark_disconnected(path, &e.to_string());
                BestEffort::Failed
            }
            Err(_) => {
                self.mark_disconnected(path, "timed out");
                BestEffort::Failed
            }
        }
    }

    fn mark_connected(&mut self) {
        if !self.connected {
            tracing::info!("remote database reachable");
            self.connected = true;
        }
    }

    fn mark_disconnected(&mut self, path: &str, reason: &str) {
        if self.connected {
            tracing::warn!(path, reason, "remote database unreachable");
        } else {
            tracing::debug!(path, reason, "remote still unreachable");
        }
        self.connected = false;
    }
}
