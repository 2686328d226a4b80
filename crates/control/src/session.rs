//! Mutable control state shared by the components of one controller.
//!
//! Passed explicitly to each component call instead of living in globals.

use crate::lockout::Lockout;

/// Last locally observed copy of a remote property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadow<T> {
    value: Option<T>,
}

impl<T> Default for Shadow<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Copy + PartialEq> Shadow<T> {
    pub fn get(&self) -> Option<T> {
        self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Stores `value`; returns `true` if the shadow was unset or different.
    pub fn update(&mut self, value: T) -> bool {
        let changed = self.value != Some(value);
        self.value = Some(value);
        changed
    }
}

/// Local door lock state.
///
/// `locked` gates scanning. `shadow` is the value last exchanged with the
/// remote flag, used to detect operator changes.
#[derive(Debug, Clone)]
pub struct DoorState {
    locked: bool,
    shadow: Shadow<bool>,
}

impl DoorState {
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Local decision (grant or lockout). The shadow follows so the next
    /// poll does not echo the change back to the bus.
    pub fn set_local(&mut self, locked: bool) {
        self.locked = locked;
        self.shadow.set(locked);
    }

    /// Remote value read by the mirror. Returns `true` when the actuator
    /// must be told.
    pub fn observe_remote(&mut self, locked: bool) -> bool {
        self.locked = locked;
        self.shadow.update(locked)
    }
}

impl Default for DoorState {
    /// Doors boot locked with no remote value seen yet.
    fn default() -> Self {
        Self {
            locked: true,
            shadow: Shadow::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub lockout: Lockout,
    pub door: DoorState,
}

impl Session {
    pub fn new(max_failed_attempts: u32) -> Self {
        Self {
            lockout: Lockout::new(max_failed_attempts),
            door: DoorState::default(),
        }
    }

    /// Scanning runs only with the door locked and no lockout in force.
    pub fn should_scan(&self) -> bool {
        self.door.is_locked() && !self.lockout.is_locked()
    }
}
