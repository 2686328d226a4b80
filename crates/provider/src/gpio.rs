//! Digital I/O lines.
//!
//! Levels are logical: `true` means "active" (water present, buzzer on)
//! after polarity is applied, so callers never deal with active-low wiring.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use warden_core::error::{WardenError, WardenResult};

pub trait DigitalInput: Send {
    fn read(&mut self) -> WardenResult<bool>;
}

pub trait DigitalOutput: Send {
    fn set(&mut self, active: bool) -> WardenResult<()>;
}

// ---------------------------------------------------------------------------
// sysfs
// ---------------------------------------------------------------------------

/// Input line exported through `/sys/class/gpio/gpioN/value`.
#[derive(Debug, Clone)]
pub struct SysfsInput {
    path: PathBuf,
    active_low: bool,
}

impl SysfsInput {
    pub fn new(path: impl AsRef<Path>, active_low: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            active_low,
        }
    }
}

impl DigitalInput for SysfsInput {
    fn read(&mut self) -> WardenResult<bool> {
        let raw = std::fs::read_to_string(&self.path)?;
        let high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(WardenError::InvalidInput(format!(
                    "{}: unexpected level {other:?}",
                    self.path.display()
                )))
            }
        };
        Ok(high != self.active_low)
    }
}

/// Output line exported through sysfs.
#[derive(Debug, Clone)]
pub struct SysfsOutput {
    path: PathBuf,
    active_low: bool,
}

impl SysfsOutput {
    pub fn new(path: impl AsRef<Path>, active_low: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            active_low,
        }
    }
}

impl DigitalOutput for SysfsOutput {
    fn set(&mut self, active: bool) -> WardenResult<()> {
        let high = active != self.active_low;
        std::fs::write(&self.path, if high { "1" } else { "0" })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory lines
// ---------------------------------------------------------------------------

/// Input whose level is set by the test. Clones share the line.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    level: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl ScriptedInput {
    pub fn new(level: bool) -> Self {
        let input = Self::default();
        input.set_level(level);
        input
    }

    pub fn set_level(&self, level: bool) {
        self.level.store(level, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DigitalInput for ScriptedInput {
    fn read(&mut self) -> WardenResult<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WardenError::InvalidInput("line unreadable".into()));
        }
        Ok(self.level.load(Ordering::SeqCst))
    }
}

/// Output that remembers every level written. Clones share the history.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    levels: Arc<Mutex<Vec<bool>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.levels.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl DigitalOutput for RecordingOutput {
    fn set(&mut self, active: bool) -> WardenResult<()> {
        self.levels
            .lock()
            .map_err(|_| WardenError::InvalidInput("recorder poisoned".into()))?
            .push(active);
        Ok(())
    }
}

/// Output with nothing attached.
#[derive(Debug, Default)]
pub struct NullOutput;

impl DigitalOutput for NullOutput {
    fn set(&mut self, _active: bool) -> WardenResult<()> {
        Ok(())
    }
}
