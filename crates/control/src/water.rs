//! Water-level float switch monitor.

use crate::actuator::ActuatorBus;
use crate::mirror::RemoteMirror;
use crate::schedule::Schedule;
use tokio::time::{Duration, Instant};
use warden_core::types::Command;
use warden_provider::DigitalInput;

pub struct WaterMonitor {
    input: Box<dyn DigitalInput>,
    schedule: Schedule,
    last: Option<bool>,
}

impl WaterMonitor {
    pub fn new(input: Box<dyn DigitalInput>, interval: Duration) -> Self {
        Self {
            input,
            schedule: Schedule::new(interval),
            last: None,
        }
    }

    /// Last level seen, `true` meaning water present.
    pub fn level(&self) -> Option<bool> {
        self.last
    }

    /// Takes the boot-time reading as the baseline. Emits nothing.
    pub fn prime(&mut self) {
        match self.input.read() {
            Ok(present) => {
                tracing::info!(present, "initial water level");
                self.last = Some(present);
            }
            Err(e) => tracing::warn!(error = %e, "cannot read water level"),
        }
    }

    /// Samples the switch when due and reports a changed level to the bus
    /// and the remote. Returns the new level on change.
    pub async fn check(
        &mut self,
        now: Instant,
        mirror: &mut RemoteMirror,
        bus: &mut ActuatorBus,
    ) -> Option<bool> {
        if !self.schedule.fire(now) {
            return None;
        }
        let present = match self.input.read() {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read water level");
                return None;
            }
        };

        match self.last.replace(present) {
            None => {
                tracing::info!(present, "water level baseline");
                return None;
            }
            Some(prev) if prev == present => return None,
            Some(_) => {}
        }

        if present {
            tracing::info!("water present");
            bus.send(Command::WaterPresent).await;
        } else {
            tracing::warn!("water empty");
            bus.send(Command::WaterEmpty).await;
        }

        let paths = mirror.paths().clone();
        let (status, tank) = if present {
            ("water_present", "normal")
        } else {
            ("water_empty", "alert")
        };
        mirror.push(&paths.water_level(), present).await;
        mirror.push(&paths.water_status(), status).await;
        mirror.push(&paths.tank_status(), tank).await;
        Some(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use serde_json::json;
    use warden_core::config::{IntervalSettings, RemoteSettings};
    use warden_core::RemotePaths;
    use warden_provider::{MemoryStore, RecordingTransport, ScriptedInput};

    struct Rig {
        line: ScriptedInput,
        store: MemoryStore,
        rec: RecordingTransport,
        monitor: WaterMonitor,
        mirror: RemoteMirror,
        bus: ActuatorBus,
    }

    async fn rig(level: bool) -> Rig {
        let line = ScriptedInput::new(level);
        let store = MemoryStore::new();
        let rec = RecordingTransport::new();
        let mut mirror = RemoteMirror::new(
            Box::new(store.clone()),
            RemotePaths::new("door", "water_level_001"),
            1,
            &IntervalSettings::default(),
            &RemoteSettings::default(),
        );
        let mut bus = ActuatorBus::new(Box::new(rec.clone()), 32);
        // One poll so the mirror knows the remote is reachable.
        mirror
            .poll(Instant::now(), &mut Session::new(3), &mut bus)
            .await;
        rec.clear();
        Rig {
            monitor: WaterMonitor::new(Box::new(line.clone()), Duration::from_secs(2)),
            line,
            store,
            rec,
            mirror,
            bus,
        }
    }

    #[tokio::test]
    async fn primed_level_emits_nothing() {
        let mut r = rig(true).await;
        r.monitor.prime();
        let t0 = Instant::now();
        assert_eq!(r.monitor.check(t0, &mut r.mirror, &mut r.bus).await, None);
        assert!(r.rec.sent().is_empty());
    }

    #[tokio::test]
    async fn change_emits_command_then_pushes() {
        let mut r = rig(true).await;
        r.monitor.prime();
        r.line.set_level(false);

        let t0 = Instant::now();
        assert_eq!(r.monitor.check(t0, &mut r.mirror, &mut r.bus).await, Some(false));
        assert_eq!(r.rec.sent(), vec!["waterempty"]);
        assert_eq!(
            r.store.get("/devices/water_level_001/water_level"),
            Some(json!(false))
        );
        assert_eq!(
            r.store.get("/devices/water_level_001/status"),
            Some(json!("water_empty"))
        );
        assert_eq!(
            r.store.get("/devices/water_level_001/tank_status"),
            Some(json!("alert"))
        );
    }

    #[tokio::test]
    async fn identical_reads_emit_once() {
        let mut r = rig(false).await;
        r.monitor.prime();
        r.line.set_level(true);

        let t0 = Instant::now();
        r.monitor.check(t0, &mut r.mirror, &mut r.bus).await;
        r.monitor
            .check(t0 + Duration::from_secs(2), &mut r.mirror, &mut r.bus)
            .await;
        assert_eq!(r.rec.sent(), vec!["waterpresent"]);
    }

    #[tokio::test]
    async fn samples_only_every_interval() {
        let mut r = rig(true).await;
        r.monitor.prime();
        let t0 = Instant::now();
        r.monitor.check(t0, &mut r.mirror, &mut r.bus).await;

        r.line.set_level(false);
        let early = r
            .monitor
            .check(t0 + Duration::from_millis(1999), &mut r.mirror, &mut r.bus)
            .await;
        assert_eq!(early, None);
        assert_eq!(r.monitor.level(), Some(true));
    }

    #[tokio::test]
    async fn unreadable_line_keeps_last_level() {
        let mut r = rig(true).await;
        r.monitor.prime();
        r.line.set_failing(true);
        let t0 = Instant::now();
        assert_eq!(r.monitor.check(t0, &mut r.mirror, &mut r.bus).await, None);
        assert_eq!(r.monitor.level(), Some(true));
    }

    #[tokio::test]
    async fn failed_prime_takes_first_sample_as_baseline() {
        let mut r = rig(true).await;
        r.line.set_failing(true);
        r.monitor.prime();
        r.line.set_failing(false);

        let t0 = Instant::now();
        assert_eq!(r.monitor.check(t0, &mut r.mirror, &mut r.bus).await, None);
        assert_eq!(r.monitor.level(), Some(true));
        assert!(r.rec.sent().is_empty());
    }
}
