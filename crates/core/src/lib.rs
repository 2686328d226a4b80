//! Domain models, configuration, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies beyond reading the
//! configuration file.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::Config;
pub use error::{WardenError, WardenResult};
pub use paths::RemotePaths;
pub use types::{
    AccessStatus, Command, Identity, IdentityId, LockState, PropertyKind, PropertyValue,
    ScanOutcome,
};
