//! The control loop.
//!
//! One iteration: remote poll, water check, then either one access
//! decision or the lockout notice. Every step is bounded, so an iteration
//! always finishes and the loop only stops on shutdown.

use crate::actuator::ActuatorBus;
use crate::alarm::Alarm;
use crate::decision::{AccessAttempt, AccessDecisionEngine, CycleContext};
use crate::event_log::EventLogger;
use crate::journal::{Journal, JournalEvent, JournalRow};
use crate::mirror::RemoteMirror;
use crate::schedule::Schedule;
use crate::session::Session;
use crate::water::WaterMonitor;
use std::future::Future;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use warden_core::error::{WardenError, WardenResult};
use warden_core::{Config, RemotePaths};
use warden_provider::{
    BusTransport, DigitalInput, DigitalOutput, FingerprintSensor, IdentityStore, RemoteStore,
    WallClock,
};

/// External collaborators handed to [`Controller::new`].
pub struct Collaborators {
    pub store: Box<dyn RemoteStore>,
    pub transport: Box<dyn BusTransport>,
    pub sensor: Box<dyn FingerprintSensor>,
    pub identities: Box<dyn IdentityStore>,
    pub clock: Box<dyn WallClock>,
    pub buzzer: Box<dyn DigitalOutput>,
    /// Float switch. Without one the water monitor is off.
    pub water: Option<Box<dyn DigitalInput>>,
    pub journal: Journal,
}

pub struct Controller {
    session: Session,
    mirror: RemoteMirror,
    bus: ActuatorBus,
    engine: AccessDecisionEngine,
    logger: EventLogger,
    alarm: Alarm,
    water: Option<WaterMonitor>,
    journal: Journal,
    lockout_notice: Schedule,
    lockout_notices: u64,
    tick: Duration,
}

impl Controller {
    pub fn new(config: &Config, parts: Collaborators) -> Self {
        let paths = RemotePaths::new(&config.device.id, &config.device.water_device_id);
        let policy = &config.policy;
        Self {
            session: Session::new(policy.max_failed_attempts),
            mirror: RemoteMirror::new(
                parts.store,
                paths,
                policy.relay_count,
                &config.intervals,
                &config.remote,
            ),
            bus: ActuatorBus::new(parts.transport, config.bus.max_frame_len),
            engine: AccessDecisionEngine::new(
                parts.sensor,
                parts.identities,
                config.device.unknown_name.clone(),
            ),
            logger: EventLogger::new(parts.clock, config.device.utc_offset_secs),
            alarm: Alarm::new(
                parts.buzzer,
                policy.alarm_pulses,
                Duration::from_millis(policy.alarm_on_ms),
                Duration::from_millis(policy.alarm_off_ms),
            ),
            water: parts
                .water
                .map(|input| WaterMonitor::new(input, config.intervals.water())),
            journal: parts.journal,
            lockout_notice: Schedule::new(config.intervals.lockout_notice()),
            lockout_notices: 0,
            tick: config.intervals.tick(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        self.mirror.is_connected()
    }

    /// "System locked" diagnostics emitted so far.
    pub fn lockout_notices(&self) -> u64 {
        self.lockout_notices
    }

    /// Boot sequence. Fails only if the sensor does not answer.
    pub async fn start(&mut self) -> WardenResult<()> {
        self.engine.verify_sensor().await.map_err(|e| {
            tracing::error!(error = %e, "fingerprint sensor not found");
            match e {
                WardenError::Sensor(_) => e,
                other => WardenError::Sensor(other.to_string()),
            }
        })?;
        tracing::info!("fingerprint sensor ready");

        self.alarm.silence();
        if let Some(water) = self.water.as_mut() {
            water.prime();
        }
        tracing::info!(
            device = %self.mirror.paths().device_id(),
            threshold = self.session.lockout.threshold(),
            "controller started"
        );
        Ok(())
    }

    /// One loop iteration. Returns the access attempt if a scan ran.
    pub async fn tick(&mut self) -> Option<AccessAttempt> {
        let now = Instant::now();

        let was_locked = self.session.lockout.is_locked();
        self.mirror
            .poll(now, &mut self.session, &mut self.bus)
            .await;
        let locked = self.session.lockout.is_locked();
        if locked != was_locked {
            let event = if locked {
                JournalEvent::LockoutEngaged
            } else {
                JournalEvent::LockoutReleased
            };
            self.journal_remote(event);
        }

        if let Some(water) = self.water.as_mut() {
            water.check(now, &mut self.mirror, &mut self.bus).await;
        }

        if locked {
            if self.lockout_notice.fire(now) {
                self.lockout_notices += 1;
                tracing::warn!(
                    failed_attempts = self.session.lockout.failed_attempts(),
                    "system locked, waiting for remote reset"
                );
            }
            return None;
        }
        self.lockout_notice.reset();

        if !self.session.should_scan() {
            return None;
        }
        let mut ctx = CycleContext {
            session: &mut self.session,
            mirror: &mut self.mirror,
            bus: &mut self.bus,
            logger: &mut self.logger,
            alarm: &mut self.alarm,
            journal: &mut self.journal,
        };
        Some(self.engine.cycle(&mut ctx).await)
    }

    /// Runs [`start`](Self::start) and then iterates until `shutdown`
    /// resolves. Shutdown is honoured between iterations.
    pub async fn run<F>(&mut self, shutdown: F) -> WardenResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut iterations: u64 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(iterations, "shutdown requested, control loop stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.tick().await;
                    iterations += 1;
                }
            }
        }
    }

    fn journal_remote(&mut self, event: JournalEvent) {
        if !self.journal.is_enabled() {
            return;
        }
        self.journal.record(&JournalRow {
            at: self.logger.local_now().map(|t| t.to_rfc3339()),
            event,
            identity: None,
            user: None,
            failed_attempts: self.session.lockout.failed_attempts(),
        });
    }
}
