//! External collaborators of the access controller and their adapters.
//!
//! Each seam is a trait; the control crate only sees the traits. Real
//! adapters talk to Firebase, UDP, sysfs, and stdin. In-memory adapters
//! (`MemoryStore`, `ScriptedSensor`, ...) back the tests and dry runs.

pub mod bus;
pub mod clock;
pub mod firebase;
pub mod gpio;
pub mod identity;
pub mod memory;
pub mod sensor;

use async_trait::async_trait;
use warden_core::error::WardenResult;

pub use bus::{BusTransport, LogTransport, RecordingTransport, UdpTransport};
pub use clock::{ManualClock, SystemClock, WallClock};
pub use firebase::FirebaseStore;
pub use gpio::{
    DigitalInput, DigitalOutput, NullOutput, RecordingOutput, ScriptedInput, SysfsInput, SysfsOutput,
};
pub use identity::{IdentityStore, NameStore};
pub use memory::MemoryStore;
pub use sensor::{ConsoleSensor, FingerprintSensor, ScriptedSensor};

/// Key/value access to the remote real-time database.
///
/// Paths are absolute (`/devices/...`). A missing property reads as JSON
/// `null`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read(&self, path: &str) -> WardenResult<serde_json::Value>;
    async fn write(&self, path: &str, value: serde_json::Value) -> WardenResult<()>;
}
