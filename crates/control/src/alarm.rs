//! Buzzer alarm pattern sounded when the lockout engages.

use tokio::time::Duration;
use warden_provider::DigitalOutput;

pub struct Alarm {
    buzzer: Box<dyn DigitalOutput>,
    pulses: u32,
    on: Duration,
    off: Duration,
}

impl Alarm {
    pub fn new(buzzer: Box<dyn DigitalOutput>, pulses: u32, on: Duration, off: Duration) -> Self {
        Self {
            buzzer,
            pulses,
            on,
            off,
        }
    }

    /// Drives the buzzer to its idle level.
    pub fn silence(&mut self) {
        if let Err(e) = self.buzzer.set(false) {
            tracing::warn!(error = %e, "cannot silence buzzer");
        }
    }

    /// Plays the full pulse pattern. Takes `pulses * (on + off)`; the
    /// buzzer is left off even if a write fails midway.
    pub async fn sound(&mut self) {
        tracing::warn!(pulses = self.pulses, "security alarm");
        for _ in 0..self.pulses {
            if let Err(e) = self.buzzer.set(true) {
                tracing::warn!(error = %e, "buzzer write failed, alarm aborted");
                break;
            }
            tokio::time::sleep(self.on).await;
            if let Err(e) = self.buzzer.set(false) {
                tracing::warn!(error = %e, "buzzer write failed, alarm aborted");
                break;
            }
            tokio::time::sleep(self.off).await;
        }
        self.silence();
        tracing::info!("security alarm complete");
    }
}
