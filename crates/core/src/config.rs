//! Controller configuration.
//!
//! Loaded from a TOML file; every field has a default matching the
//! deployed firmware so a minimal file only needs `[remote] url`.
//!
//! ```toml
//! [device]
//! id = "fingerprint_door_001"
//!
//! [remote]
//! url = "https://example-default-rtdb.firebaseio.com"
//!
//! [bus]
//! transport = "udp"
//! peer = "192.168.4.2:4210"
//! ```

use crate::error::{WardenError, WardenResult};
use crate::types::{MAX_FRAME_LEN, MAX_IDENTITIES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceSettings,
    pub remote: RemoteSettings,
    pub intervals: IntervalSettings,
    pub policy: PolicySettings,
    pub bus: BusSettings,
    pub gpio: GpioSettings,
    pub identity: IdentitySettings,
    pub journal: JournalSettings,
}

impl Config {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> WardenResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WardenError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> WardenResult<Self> {
        toml::from_str(raw).map_err(|e| WardenError::Config(e.to_string()))
    }

    /// Rejects settings the control loop cannot run with.
    pub fn validate(&self) -> WardenResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(WardenError::Config("device.id must not be empty".into()));
        }
        if self.device.utc_offset_secs.unsigned_abs() >= 86_400 {
            return Err(WardenError::Config(
                "device.utc_offset_secs must be less than a day".into(),
            ));
        }
        if self.remote.url.trim().is_empty() {
            return Err(WardenError::Config("remote.url must not be empty".into()));
        }
        if self.remote.timeout_ms == 0 {
            return Err(WardenError::Config("remote.timeout_ms must be positive".into()));
        }

        let i = &self.intervals;
        for (name, ms) in [
            ("relay_ms", i.relay_ms),
            ("door_ms", i.door_ms),
            ("failed_attempts_ms", i.failed_attempts_ms),
            ("water_ms", i.water_ms),
            ("lockout_notice_ms", i.lockout_notice_ms),
            ("tick_ms", i.tick_ms),
        ] {
            if ms == 0 {
                return Err(WardenError::Config(format!(
                    "intervals.{name} must be positive"
                )));
            }
        }

        if self.policy.max_failed_attempts == 0 {
            return Err(WardenError::Config(
                "policy.max_failed_attempts must be at least 1".into(),
            ));
        }
        if self.policy.relay_count == 0 {
            return Err(WardenError::Config("policy.relay_count must be at least 1".into()));
        }
        if self.identity.capacity == 0 || self.identity.capacity > MAX_IDENTITIES {
            return Err(WardenError::Config(format!(
                "identity.capacity must be within 1..={MAX_IDENTITIES}"
            )));
        }
        if self.bus.max_frame_len == 0 || self.bus.max_frame_len > MAX_FRAME_LEN {
            return Err(WardenError::Config(format!(
                "bus.max_frame_len must be within 1..={MAX_FRAME_LEN}"
            )));
        }
        if self.bus.transport == BusTransportKind::Udp && self.bus.peer.is_none() {
            return Err(WardenError::Config("bus.peer is required for udp".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Device identifier under `/devices/`.
    pub id: String,
    /// Identifier of the water-level node under `/devices/`.
    pub water_device_id: String,
    /// Offset of local time from UTC, in seconds. Log keys use local time.
    pub utc_offset_secs: i32,
    /// Name logged for a matched identity with no stored name.
    pub unknown_name: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            id: "fingerprint_door_001".into(),
            water_device_id: "water_level_001".into(),
            utc_offset_secs: 8 * 3600,
            unknown_name: "Unknown".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Realtime database root URL.
    pub url: String,
    /// Web API key used for email/password sign-in.
    pub api_key: Option<String>,
    pub user_email: Option<String>,
    pub user_password: Option<String>,
    /// Upper bound on every remote request.
    pub timeout_ms: u64,
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            user_email: None,
            user_password: None,
            timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalSettings {
    pub relay_ms: u64,
    pub door_ms: u64,
    pub failed_attempts_ms: u64,
    pub water_ms: u64,
    /// Minimum spacing of the "system locked" diagnostic.
    pub lockout_notice_ms: u64,
    /// Pause between control loop iterations.
    pub tick_ms: u64,
}

impl IntervalSettings {
    pub fn relay(&self) -> Duration {
        Duration::from_millis(self.relay_ms)
    }

    pub fn door(&self) -> Duration {
        Duration::from_millis(self.door_ms)
    }

    pub fn failed_attempts(&self) -> Duration {
        Duration::from_millis(self.failed_attempts_ms)
    }

    pub fn water(&self) -> Duration {
        Duration::from_millis(self.water_ms)
    }

    pub fn lockout_notice(&self) -> Duration {
        Duration::from_millis(self.lockout_notice_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            relay_ms: 1500,
            door_ms: 1000,
            failed_attempts_ms: 5000,
            water_ms: 2000,
            lockout_notice_ms: 10_000,
            tick_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub max_failed_attempts: u32,
    /// Relays `1..=relay_count` are mirrored.
    pub relay_count: u8,
    pub alarm_pulses: u32,
    pub alarm_on_ms: u64,
    pub alarm_off_ms: u64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 3,
            relay_count: 8,
            alarm_pulses: 10,
            alarm_on_ms: 200,
            alarm_off_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusTransportKind {
    /// One datagram per command to `peer`.
    Udp,
    /// Commands are only logged.
    #[default]
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    pub transport: BusTransportKind,
    /// `host:port` of the secondary controller.
    pub peer: Option<String>,
    /// Local bind address for the UDP socket.
    pub bind: String,
    pub max_frame_len: usize,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            transport: BusTransportKind::default(),
            peer: None,
            bind: "0.0.0.0:0".into(),
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioSettings {
    /// Sysfs value file of the water float switch.
    pub water_input: Option<PathBuf>,
    /// Float switch pulls the line low when water is present.
    pub water_active_low: bool,
    /// Sysfs value file of the buzzer.
    pub buzzer_output: Option<PathBuf>,
    pub buzzer_active_low: bool,
}

impl Default for GpioSettings {
    fn default() -> Self {
        Self {
            water_input: None,
            water_active_low: true,
            buzzer_output: None,
            buzzer_active_low: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// JSON file holding `fp_{id}` -> name.
    pub path: PathBuf,
    pub capacity: u16,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("identities.json"),
            capacity: MAX_IDENTITIES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    /// Local NDJSON access journal. Disabled when unset.
    pub path: Option<PathBuf>,
}
