//! Access decision engine.
//!
//! Turns one sensor capture into a grant or a denial and carries out its
//! consequences: access log, failed-attempt counter, door and lockout.
//! Remote writes along the way are best-effort and never undo the local
//! decision.

use crate::actuator::ActuatorBus;
use crate::alarm::Alarm;
use crate::event_log::EventLogger;
use crate::journal::{Journal, JournalEvent, JournalRow};
use crate::lockout::Transition;
use crate::mirror::RemoteMirror;
use crate::session::Session;
use warden_core::error::WardenResult;
use warden_core::types::{AccessStatus, Command, Identity, ScanOutcome};
use warden_provider::{FingerprintSensor, IdentityStore};

/// User recorded for a failed attempt.
pub const DENIED_USER: &str = "unknown";

/// Result of one scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessAttempt {
    Granted(Identity),
    Denied,
    SensorBusy,
    SensorError,
    CommError,
}

impl AccessAttempt {
    /// Whether the attempt was decided (granted or denied) rather than
    /// dropped for a retry.
    pub fn is_decision(&self) -> bool {
        matches!(self, AccessAttempt::Granted(_) | AccessAttempt::Denied)
    }
}

/// Everything a decision touches besides the sensor.
pub struct CycleContext<'a> {
    pub session: &'a mut Session,
    pub mirror: &'a mut RemoteMirror,
    pub bus: &'a mut ActuatorBus,
    pub logger: &'a mut EventLogger,
    pub alarm: &'a mut Alarm,
    pub journal: &'a mut Journal,
}

pub struct AccessDecisionEngine {
    sensor: Box<dyn FingerprintSensor>,
    identities: Box<dyn IdentityStore>,
    unknown_name: String,
}

impl AccessDecisionEngine {
    pub fn new(
        sensor: Box<dyn FingerprintSensor>,
        identities: Box<dyn IdentityStore>,
        unknown_name: impl Into<String>,
    ) -> Self {
        Self {
            sensor,
            identities,
            unknown_name: unknown_name.into(),
        }
    }

    pub async fn verify_sensor(&mut self) -> WardenResult<()> {
        self.sensor.verify().await
    }

    /// Maps a raw sensor result to an attempt, resolving the display name
    /// of a match.
    pub fn resolve(&self, outcome: ScanOutcome) -> AccessAttempt {
        match outcome {
            ScanOutcome::Match { id, confidence } => {
                let name = self
                    .identities
                    .name(id)
                    .unwrap_or_else(|| self.unknown_name.clone());
                tracing::debug!(%id, confidence, "fingerprint matched");
                AccessAttempt::Granted(Identity { id, name })
            }
            ScanOutcome::NoMatch => AccessAttempt::Denied,
            ScanOutcome::Busy => AccessAttempt::SensorBusy,
            ScanOutcome::SensorError => AccessAttempt::SensorError,
            ScanOutcome::CommError => AccessAttempt::CommError,
        }
    }

    pub async fn scan(&mut self) -> AccessAttempt {
        let outcome = self.sensor.capture_and_match().await;
        self.resolve(outcome)
    }

    /// One capture, then the reaction to it.
    pub async fn cycle(&mut self, ctx: &mut CycleContext<'_>) -> AccessAttempt {
        let attempt = self.scan().await;
        match &attempt {
            AccessAttempt::Granted(identity) => grant(ctx, identity).await,
            AccessAttempt::Denied => deny(ctx).await,
            AccessAttempt::SensorBusy => {}
            AccessAttempt::SensorError => tracing::debug!("sensor imaging error, retrying"),
            AccessAttempt::CommError => tracing::debug!("sensor communication error, retrying"),
        }
        attempt
    }
}

async fn grant(ctx: &mut CycleContext<'_>, identity: &Identity) {
    tracing::info!(id = %identity.id, user = %identity.name, "access granted");
    ctx.logger
        .record(ctx.mirror, AccessStatus::Success, &identity.name)
        .await;

    let transition = ctx.session.lockout.record_granted();
    let counter = ctx.mirror.paths().failed_attempts();
    ctx.mirror.push(&counter, 0u32).await;

    ctx.bus.send(Command::Unlock).await;
    ctx.session.door.set_local(false);
    let door = ctx.mirror.paths().door_lock();
    ctx.mirror.push(door, false).await;

    journal(ctx, JournalEvent::Granted, Some(identity));
    if transition == Some(Transition::Released) {
        tracing::info!("lockout cleared by successful match");
        journal(ctx, JournalEvent::LockoutReleased, None);
    }
}

async fn deny(ctx: &mut CycleContext<'_>) {
    ctx.logger
        .record(ctx.mirror, AccessStatus::Failed, DENIED_USER)
        .await;

    let transition = ctx.session.lockout.record_denied();
    let count = ctx.session.lockout.failed_attempts();
    tracing::warn!(
        failed_attempts = count,
        threshold = ctx.session.lockout.threshold(),
        "access denied"
    );
    let counter = ctx.mirror.paths().failed_attempts();
    ctx.mirror.push(&counter, count).await;
    journal(ctx, JournalEvent::Denied, None);

    if transition == Some(Transition::Engaged) {
        tracing::warn!(failed_attempts = count, "too many failed attempts, system locked");
        ctx.alarm.sound().await;
        ctx.bus.send(Command::Alert).await;
        ctx.bus.send(Command::Lock).await;
        ctx.session.door.set_local(true);
        let door = ctx.mirror.paths().door_lock();
        ctx.mirror.push(door, true).await;
        journal(ctx, JournalEvent::LockoutEngaged, None);
    }
}

fn journal(ctx: &mut CycleContext<'_>, event: JournalEvent, identity: Option<&Identity>) {
    if !ctx.journal.is_enabled() {
        return;
    }
    let row = JournalRow {
        at: ctx.logger.local_now().map(|t| t.to_rfc3339()),
        event,
        identity: identity.map(|i| i.id.get()),
        user: identity.map(|i| i.name.clone()),
        failed_attempts: ctx.session.lockout.failed_attempts(),
    };
    ctx.journal.record(&row);
}
