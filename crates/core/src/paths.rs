//! Remote database layout.
//!
//! Every path the controller reads or writes is built here so the layout
//! lives in one place.

/// Door lock flag shared with the operator dashboard.
pub const DOOR_LOCK: &str = "/smart_controls/relays/door/isLocked";

/// Path builder bound to one device identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePaths {
    device_id: String,
    water_device_id: String,
}

impl RemotePaths {
    pub fn new(device_id: impl Into<String>, water_device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            water_device_id: water_device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn relay_state(&self, id: u8) -> String {
        format!("/smart_controls/relays/{id}/state")
    }

    pub fn door_lock(&self) -> &'static str {
        DOOR_LOCK
    }

    pub fn failed_attempts(&self) -> String {
        format!("/devices/{}/failed_attempts", self.device_id)
    }

    pub fn log_status(&self, date_key: &str, time_key: &str) -> String {
        format!("/devices/{}/logs/{date_key}/{time_key}/status", self.device_id)
    }

    pub fn log_user(&self, date_key: &str, time_key: &str) -> String {
        format!("/devices/{}/logs/{date_key}/{time_key}/user", self.device_id)
    }

    pub fn last_updated(&self) -> String {
        format!("/devices/{}/last_updated", self.device_id)
    }

    pub fn water_level(&self) -> String {
        format!("/devices/{}/water_level", self.water_device_id)
    }

    pub fn water_status(&self) -> String {
        format!("/devices/{}/status", self.water_device_id)
    }

    pub fn tank_status(&self) -> String {
        format!("/devices/{}/tank_status", self.water_device_id)
    }
}
