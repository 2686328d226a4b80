//! Access-control state machine, remote mirror, and control loop.

pub mod actuator;
pub mod alarm;
pub mod controller;
pub mod decision;
pub mod event_log;
pub mod journal;
pub mod lockout;
pub mod mirror;
pub mod schedule;
pub mod session;
pub mod water;

pub use actuator::ActuatorBus;
pub use controller::{Collaborators, Controller};
pub use decision::{AccessAttempt, AccessDecisionEngine};
pub use event_log::{EventLogger, LogEntry};
pub use lockout::{Lockout, Transition};
pub use mirror::RemoteMirror;
pub use session::Session;

/// Outcome of a fire-and-forget operation.
///
/// Informational only: nothing retries on `Failed`, and callers are free to
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestEffort {
    Delivered,
    Failed,
    /// Not attempted (remote known unreachable, frame too long).
    Skipped,
}
