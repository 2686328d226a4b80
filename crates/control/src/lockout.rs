//! Failed-attempt counter and lockout policy.
//!
//! The lock state is never stored; it is derived from the counter, so
//! `locked ⇔ failed_attempts ≥ threshold` holds after every operation.

use warden_core::types::LockState;

/// A change of [`LockState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// UNLOCKED -> LOCKED.
    Engaged,
    /// LOCKED -> UNLOCKED.
    Released,
}

/// Result of comparing the local counter with the remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    InSync,
    Overwritten {
        previous: u32,
        transition: Option<Transition>,
    },
}

#[derive(Debug, Clone)]
pub struct Lockout {
    failed_attempts: u32,
    threshold: u32,
}

impl Lockout {
    pub fn new(threshold: u32) -> Self {
        Self {
            failed_attempts: 0,
            threshold,
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn state(&self) -> LockState {
        if self.failed_attempts >= self.threshold {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state() == LockState::Locked
    }

    /// One more failed attempt.
    pub fn record_denied(&mut self) -> Option<Transition> {
        self.set(self.failed_attempts.saturating_add(1))
    }

    /// A successful match clears the counter and any lockout.
    pub fn record_granted(&mut self) -> Option<Transition> {
        self.set(0)
    }

    /// Adopts the remote counter whenever it differs from the local one.
    pub fn reconcile(&mut self, remote: u32) -> Reconcile {
        if remote == self.failed_attempts {
            return Reconcile::InSync;
        }
        let previous = self.failed_attempts;
        let transition = self.set(remote);
        Reconcile::Overwritten {
            previous,
            transition,
        }
    }

    fn set(&mut self, value: u32) -> Option<Transition> {
        let before = self.state();
        self.failed_attempts = value;
        match (before, self.state()) {
            (LockState::Unlocked, LockState::Locked) => Some(Transition::Engaged),
            (LockState::Locked, LockState::Unlocked) => Some(Transition::Released),
            _ => None,
        }
    }
}
