//! Domain types for the Warden access controller.

use crate::error::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Highest template slot the fingerprint sensor can hold.
pub const MAX_IDENTITIES: u16 = 162;

/// Numeric identity of an enrolled fingerprint template (`1..=162`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(u16);

impl IdentityId {
    /// Validates `raw` against `1..=capacity`.
    pub fn new(raw: u16, capacity: u16) -> WardenResult<Self> {
        if raw == 0 || raw > capacity {
            return Err(WardenError::InvalidInput(format!(
                "identity id {raw} outside 1..={capacity}"
            )));
        }
        Ok(Self(raw))
    }

    /// Wraps an id reported by the sensor without range checking.
    ///
    /// The sensor only reports slots it actually holds, so a match id is
    /// trusted as-is.
    pub const fn from_sensor(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    /// Key used by the name store, e.g. `fp_7`.
    pub fn store_key(self) -> String {
        format!("fp_{}", self.0)
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity with its display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Result of one capture-and-match attempt on the fingerprint sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A stored template matched.
    Match { id: IdentityId, confidence: u16 },
    /// A finger was imaged but no template matched.
    NoMatch,
    /// No finger on the sensor yet.
    Busy,
    /// Imaging or feature extraction failed.
    SensorError,
    /// Packet-level failure talking to the sensor.
    CommError,
}

// ---------------------------------------------------------------------------
// Access log
// ---------------------------------------------------------------------------

/// Outcome written to the remote access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Success,
    Failed,
}

impl AccessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessStatus::Success => "success",
            AccessStatus::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Lockout
// ---------------------------------------------------------------------------

/// Lockout policy state. Derived from the failed-attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Unlocked,
    Locked,
}

// ---------------------------------------------------------------------------
// Actuator commands
// ---------------------------------------------------------------------------

/// Largest frame the peer controller accepts in one transmission.
pub const MAX_FRAME_LEN: usize = 32;

/// Encoded command bytes. Inline for every command the controller issues.
pub type Frame = SmallVec<[u8; MAX_FRAME_LEN]>;

/// Command sent to the secondary controller over the actuator bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Drive relay `id` on or off (`"{id}:{0|1}"`).
    Relay { id: u8, on: bool },
    Lock,
    Unlock,
    /// Security alert; the peer forwards it as an SMS.
    Alert,
    WaterPresent,
    WaterEmpty,
}

impl Command {
    /// ASCII wire form.
    pub fn encode(&self) -> Frame {
        match self {
            Command::Relay { id, on } => {
                Frame::from_slice(format!("{id}:{}", u8::from(*on)).as_bytes())
            }
            Command::Lock => Frame::from_slice(b"lock"),
            Command::Unlock => Frame::from_slice(b"unlock"),
            Command::Alert => Frame::from_slice(b"alert"),
            Command::WaterPresent => Frame::from_slice(b"waterpresent"),
            Command::WaterEmpty => Frame::from_slice(b"waterempty"),
        }
    }

    /// `lock` or `unlock` for a door state.
    pub fn door(locked: bool) -> Self {
        if locked {
            Command::Lock
        } else {
            Command::Unlock
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.encode()))
    }
}

// ---------------------------------------------------------------------------
// Remote properties
// ---------------------------------------------------------------------------

/// Declared type of a remote property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Int,
    Text,
}

/// A typed remote property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl PropertyValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Int(n) => serde_json::Value::from(*n),
            PropertyValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Decodes a JSON value as `kind`.
    ///
    /// `Ok(None)` means the property does not exist remotely (JSON `null`).
    pub fn from_json(kind: PropertyKind, value: &serde_json::Value) -> WardenResult<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        let decoded = match kind {
            PropertyKind::Bool => value.as_bool().map(PropertyValue::Bool),
            PropertyKind::Int => value
                .as_i64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .map(PropertyValue::Int),
            PropertyKind::Text => value.as_str().map(|s| PropertyValue::Text(s.to_string())),
        };
        decoded.map(Some).ok_or_else(|| {
            WardenError::InvalidInput(format!("expected {kind:?}, remote holds {value}"))
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<u32> for PropertyValue {
    fn from(n: u32) -> Self {
        PropertyValue::Int(i64::from(n))
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}
