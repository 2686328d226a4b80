//! End-to-end control loop scenarios against in-memory collaborators.
//!
//! Time is paused: the alarm pattern and the poll intervals advance the
//! tokio clock instead of the wall clock.

use serde_json::json;
use tokio::time::Duration;
use warden_control::journal::Journal;
use warden_control::{AccessAttempt, Collaborators, Controller};
use warden_core::types::{IdentityId, ScanOutcome};
use warden_core::{Config, WardenError};
use warden_provider::{
    ManualClock, MemoryStore, NameStore, RecordingOutput, RecordingTransport, ScriptedInput,
    ScriptedSensor,
};

const COUNTER: &str = "/devices/fingerprint_door_001/failed_attempts";
const DOOR: &str = "/smart_controls/relays/door/isLocked";
const LAST_UPDATED: &str = "/devices/fingerprint_door_001/last_updated";

// 2025-09-15 01:35:31 at +08:00.
const SYNCED: i64 = 1_757_871_331;

struct Harness {
    store: MemoryStore,
    bus: RecordingTransport,
    sensor: ScriptedSensor,
    buzzer: RecordingOutput,
    water: ScriptedInput,
    clock: ManualClock,
    controller: Controller,
}

fn config() -> Config {
    let mut cfg = Config::default();
    cfg.remote.url = "https://warden-test.firebaseio.com".into();
    cfg
}

fn harness_with(
    config: Config,
    sensor: ScriptedSensor,
    names: NameStore,
    journal: Journal,
) -> Harness {
    let store = MemoryStore::new();
    let bus = RecordingTransport::new();
    let buzzer = RecordingOutput::new();
    let water = ScriptedInput::new(true);
    let clock = ManualClock::at(SYNCED);

    let controller = Controller::new(
        &config,
        Collaborators {
            store: Box::new(store.clone()),
            transport: Box::new(bus.clone()),
            sensor: Box::new(sensor.clone()),
            identities: Box::new(names),
            clock: Box::new(clock.clone()),
            buzzer: Box::new(buzzer.clone()),
            water: Some(Box::new(water.clone())),
            journal,
        },
    );
    Harness {
        store,
        bus,
        sensor,
        buzzer,
        water,
        clock,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(
        config(),
        ScriptedSensor::new(),
        NameStore::in_memory(),
        Journal::disabled(),
    )
}

fn matched(id: u16) -> ScanOutcome {
    ScanOutcome::Match {
        id: IdentityId::from_sensor(id),
        confidence: 100,
    }
}

async fn advance(d: Duration) {
    tokio::time::advance(d).await;
}

#[tokio::test(start_paused = true)]
async fn third_denial_locks_out() {
    let mut h = harness();
    h.store.set(COUNTER, 2);
    h.controller.start().await.unwrap();
    h.sensor.push(ScanOutcome::NoMatch);

    let attempt = h.controller.tick().await;

    assert_eq!(attempt, Some(AccessAttempt::Denied));
    let session = h.controller.session();
    assert_eq!(session.lockout.failed_attempts(), 3);
    assert!(session.lockout.is_locked());
    assert_eq!(h.bus.sent(), vec!["alert", "lock"]);
    assert_eq!(h.store.get(COUNTER), Some(json!(3)));
    assert_eq!(h.store.get(DOOR), Some(json!(true)));
    assert_eq!(h.buzzer.levels().iter().filter(|on| **on).count(), 10);
    assert_eq!(
        h.store
            .get("/devices/fingerprint_door_001/logs/2025-09-15/01:35:31/user"),
        Some(json!("unknown"))
    );
}

#[tokio::test(start_paused = true)]
async fn remote_reset_unlocks_without_alarm() {
    let mut h = harness();
    h.store.set(COUNTER, 3);
    h.controller.start().await.unwrap();

    assert_eq!(h.controller.tick().await, None);
    assert!(h.controller.session().lockout.is_locked());

    h.store.set(COUNTER, 0);
    advance(Duration::from_secs(5)).await;
    h.controller.tick().await;

    let session = h.controller.session();
    assert_eq!(session.lockout.failed_attempts(), 0);
    assert!(!session.lockout.is_locked());
    assert!(h.buzzer.levels().iter().all(|on| !on));
    assert!(!h.bus.sent().contains(&"alert".to_string()));
}

#[tokio::test(start_paused = true)]
async fn lockout_notice_is_rate_limited() {
    let mut h = harness();
    h.store.set(COUNTER, 3);
    h.controller.start().await.unwrap();

    h.controller.tick().await;
    assert_eq!(h.controller.lockout_notices(), 1);

    advance(Duration::from_secs(5)).await;
    h.controller.tick().await;
    advance(Duration::from_secs(5)).await;
    h.controller.tick().await;
    advance(Duration::from_secs(1)).await;
    h.controller.tick().await;

    assert!(h.controller.session().lockout.is_locked());
    assert_eq!(h.controller.lockout_notices(), 2);
}

#[tokio::test(start_paused = true)]
async fn lockout_notice_restarts_after_unlock() {
    let mut cfg = config();
    cfg.intervals.failed_attempts_ms = 1000;
    let mut h = harness_with(
        cfg,
        ScriptedSensor::new(),
        NameStore::in_memory(),
        Journal::disabled(),
    );
    h.store.set(COUNTER, 3);
    h.controller.start().await.unwrap();
    h.controller.tick().await;
    assert_eq!(h.controller.lockout_notices(), 1);

    h.store.set(COUNTER, 0);
    advance(Duration::from_secs(1)).await;
    h.controller.tick().await;
    assert!(!h.controller.session().lockout.is_locked());

    // Well inside the notice interval, yet the new lockout is reported.
    h.store.set(COUNTER, 3);
    advance(Duration::from_secs(1)).await;
    h.controller.tick().await;
    assert!(h.controller.session().lockout.is_locked());
    assert_eq!(h.controller.lockout_notices(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_increase_relocks_without_alarm() {
    let mut h = harness();
    h.controller.start().await.unwrap();
    h.controller.tick().await;

    h.store.set(COUNTER, 7);
    advance(Duration::from_secs(5)).await;
    assert_eq!(h.controller.tick().await, None);

    assert!(h.controller.session().lockout.is_locked());
    assert!(h.buzzer.levels().iter().all(|on| !on));
    assert!(h.bus.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unnamed_grant_logs_default_name() {
    let mut h = harness();
    h.store.set(COUNTER, 1);
    h.controller.start().await.unwrap();
    h.sensor.push(matched(7));

    let attempt = h.controller.tick().await;

    let Some(AccessAttempt::Granted(identity)) = attempt else {
        panic!("expected grant, got {attempt:?}");
    };
    assert_eq!(identity.id.get(), 7);
    assert_eq!(
        h.store
            .get("/devices/fingerprint_door_001/logs/2025-09-15/01:35:31/user"),
        Some(json!("Unknown"))
    );
    assert_eq!(
        h.store
            .get("/devices/fingerprint_door_001/logs/2025-09-15/01:35:31/status"),
        Some(json!("success"))
    );
    assert_eq!(h.store.get(LAST_UPDATED), Some(json!("2025-09-15 01:35:31")));
    assert_eq!(h.store.get(COUNTER), Some(json!(0)));
    assert_eq!(h.store.get(DOOR), Some(json!(false)));
    assert_eq!(h.bus.sent(), vec!["unlock"]);
    assert_eq!(h.controller.session().lockout.failed_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_log_write_does_not_undo_grant() {
    let mut h = harness();
    h.store.set(COUNTER, 2);
    h.store.set(DOOR, true);
    h.controller.start().await.unwrap();
    h.store.fail_next_writes(1);
    h.sensor.push(matched(1));

    let attempt = h.controller.tick().await;

    assert!(matches!(attempt, Some(AccessAttempt::Granted(_))));
    assert_eq!(h.store.get(COUNTER), Some(json!(0)));
    assert_eq!(h.store.get(DOOR), Some(json!(false)));
    assert_eq!(h.controller.session().lockout.failed_attempts(), 0);

    advance(Duration::from_secs(5)).await;
    h.controller.tick().await;

    let session = h.controller.session();
    assert_eq!(session.lockout.failed_attempts(), 0);
    assert!(!session.door.is_locked());
    assert!(h.controller.is_connected());
    assert_eq!(h.bus.sent(), vec!["lock", "unlock"]);
}

#[tokio::test(start_paused = true)]
async fn named_grant_logs_stored_name() {
    let mut names = NameStore::in_memory();
    names.set(IdentityId::from_sensor(4), "Alice").unwrap();
    let mut h = harness_with(config(), ScriptedSensor::new(), names, Journal::disabled());
    h.controller.start().await.unwrap();
    h.sensor.push(matched(4));

    h.controller.tick().await;

    assert_eq!(
        h.store
            .get("/devices/fingerprint_door_001/logs/2025-09-15/01:35:31/user"),
        Some(json!("Alice"))
    );
}

#[tokio::test(start_paused = true)]
async fn unlocked_door_suspends_scanning_until_relocked() {
    let mut h = harness();
    h.controller.start().await.unwrap();
    h.sensor.push(matched(1));
    h.controller.tick().await;
    h.bus.clear();
    let captures = h.sensor.captures();

    // Remote already holds `false` from the grant: no echo to the bus.
    advance(Duration::from_secs(1)).await;
    assert_eq!(h.controller.tick().await, None);
    assert!(h.bus.sent().is_empty());
    assert_eq!(h.sensor.captures(), captures);

    // Operator relocks from the dashboard.
    h.store.set(DOOR, true);
    advance(Duration::from_secs(1)).await;
    assert_eq!(h.controller.tick().await, Some(AccessAttempt::SensorBusy));
    assert_eq!(h.bus.sent(), vec!["lock"]);
}

#[tokio::test(start_paused = true)]
async fn relay_changes_are_forwarded_once() {
    let mut h = harness();
    h.store.set("/smart_controls/relays/3/state", true);
    h.controller.start().await.unwrap();
    h.controller.tick().await;
    assert_eq!(h.bus.sent(), vec!["3:1"]);

    advance(Duration::from_millis(1500)).await;
    h.controller.tick().await;
    assert_eq!(h.bus.sent(), vec!["3:1"]);

    h.store.set("/smart_controls/relays/3/state", false);
    advance(Duration::from_millis(1500)).await;
    h.controller.tick().await;
    assert_eq!(h.bus.sent(), vec!["3:1", "3:0"]);
}

#[tokio::test(start_paused = true)]
async fn transient_sensor_results_change_nothing() {
    let mut h = harness();
    h.controller.start().await.unwrap();
    h.sensor.push(ScanOutcome::SensorError);
    h.sensor.push(ScanOutcome::CommError);

    assert_eq!(h.controller.tick().await, Some(AccessAttempt::SensorError));
    assert_eq!(h.controller.tick().await, Some(AccessAttempt::CommError));
    assert_eq!(h.controller.tick().await, Some(AccessAttempt::SensorBusy));

    assert_eq!(h.controller.session().lockout.failed_attempts(), 0);
    assert!(h.bus.sent().is_empty());
    assert!(h.store.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn offline_denial_still_counts_locally() {
    let mut h = harness();
    h.store.set_offline(true);
    h.controller.start().await.unwrap();
    h.sensor.push(ScanOutcome::NoMatch);

    assert_eq!(h.controller.tick().await, Some(AccessAttempt::Denied));
    assert!(!h.controller.is_connected());
    assert_eq!(h.controller.session().lockout.failed_attempts(), 1);
    assert!(h.store.writes().is_empty());

    h.store.set_offline(false);
    advance(Duration::from_millis(1500)).await;
    h.controller.tick().await;
    assert!(h.controller.is_connected());
}

#[tokio::test(start_paused = true)]
async fn unsynchronized_clock_uses_fallback_keys() {
    let mut h = harness();
    h.clock.set(0);
    h.controller.start().await.unwrap();
    h.sensor.push(ScanOutcome::NoMatch);
    h.sensor.push(ScanOutcome::NoMatch);

    h.controller.tick().await;
    h.controller.tick().await;

    assert_eq!(
        h.store
            .get("/devices/fingerprint_door_001/logs/system/entry_1/status"),
        Some(json!("failed"))
    );
    assert_eq!(
        h.store
            .get("/devices/fingerprint_door_001/logs/system/entry_2/status"),
        Some(json!("failed"))
    );
    assert_eq!(
        h.store.get(LAST_UPDATED),
        Some(json!("system_time_unavailable"))
    );
}

#[tokio::test(start_paused = true)]
async fn water_change_is_reported() {
    let mut h = harness();
    h.controller.start().await.unwrap();
    h.controller.tick().await;
    assert!(h.bus.sent().is_empty());

    h.water.set_level(false);
    advance(Duration::from_secs(2)).await;
    h.controller.tick().await;

    assert_eq!(h.bus.sent(), vec!["waterempty"]);
    assert_eq!(
        h.store.get("/devices/water_level_001/tank_status"),
        Some(json!("alert"))
    );
}

#[tokio::test(start_paused = true)]
async fn absent_sensor_stops_start() {
    let mut h = harness_with(
        config(),
        ScriptedSensor::absent(),
        NameStore::in_memory(),
        Journal::disabled(),
    );
    let err = h.controller.start().await.unwrap_err();
    assert!(matches!(err, WardenError::Sensor(_)));
}

#[tokio::test(start_paused = true)]
async fn run_stops_on_shutdown() {
    let mut h = harness();
    h.controller
        .run(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    assert!(h.sensor.captures() >= 5);
    assert!(h.controller.is_connected());
    // Boot silenced the buzzer.
    assert_eq!(h.buzzer.levels().first(), Some(&false));
}

#[tokio::test(start_paused = true)]
async fn journal_records_decisions_and_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.ndjson");
    let sensor = ScriptedSensor::new();
    let mut h = harness_with(
        config(),
        sensor,
        NameStore::in_memory(),
        Journal::open(&path).unwrap(),
    );
    h.store.set(COUNTER, 2);
    h.controller.start().await.unwrap();
    h.sensor.push(ScanOutcome::NoMatch);
    h.controller.tick().await;

    h.store.set(COUNTER, 0);
    advance(Duration::from_secs(5)).await;
    h.controller.tick().await;

    let events: Vec<String> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(events, vec!["denied", "lockout_engaged", "lockout_released"]);
}
