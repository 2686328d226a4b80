//! Remote access log.
//!
//! Entries land under `logs/{date}/{time}` in local time. Before the wall
//! clock has synchronized they go under `logs/system/entry_{n}` instead.

use crate::mirror::RemoteMirror;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use warden_core::types::AccessStatus;
use warden_provider::WallClock;

/// Wall time before this (2001-09-09) is treated as unsynchronized.
pub const SANITY_EPOCH_SECS: i64 = 1_000_000_000;

const FALLBACK_DATE_KEY: &str = "system";
const FALLBACK_LAST_UPDATED: &str = "system_time_unavailable";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub date_key: String,
    pub time_key: String,
    pub status: AccessStatus,
    pub user: String,
    /// Whether the keys came from a synchronized wall clock.
    pub clock_valid: bool,
}

impl LogEntry {
    /// Value written to `last_updated` alongside the entry.
    pub fn last_updated(&self) -> String {
        if self.clock_valid {
            format!("{} {}", self.date_key, self.time_key)
        } else {
            FALLBACK_LAST_UPDATED.to_string()
        }
    }
}

pub struct EventLogger {
    clock: Box<dyn WallClock>,
    offset: FixedOffset,
    fallback_counter: u64,
}

impl EventLogger {
    pub fn new(clock: Box<dyn WallClock>, utc_offset_secs: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or_else(|| {
            tracing::warn!(utc_offset_secs, "invalid UTC offset, logging in UTC");
            Utc.fix()
        });
        Self {
            clock,
            offset,
            fallback_counter: 0,
        }
    }

    /// Current wall time in the configured zone, if the clock is plausible.
    pub fn local_now(&self) -> Option<DateTime<FixedOffset>> {
        let now = self.clock.now();
        (now.timestamp() >= SANITY_EPOCH_SECS).then(|| now.with_timezone(&self.offset))
    }

    /// Builds the next entry. Each unsynchronized entry takes a new
    /// fallback key.
    pub fn entry(&mut self, status: AccessStatus, user: &str) -> LogEntry {
        let (date_key, time_key, clock_valid) = match self.local_now() {
            Some(local) => (
                local.format("%Y-%m-%d").to_string(),
                local.format("%H:%M:%S").to_string(),
                true,
            ),
            None => {
                self.fallback_counter += 1;
                (
                    FALLBACK_DATE_KEY.to_string(),
                    format!("entry_{}", self.fallback_counter),
                    false,
                )
            }
        };
        LogEntry {
            date_key,
            time_key,
            status,
            user: user.to_string(),
            clock_valid,
        }
    }

    /// Writes one entry and `last_updated` through the mirror. All three
    /// writes are best-effort.
    pub async fn record(
        &mut self,
        mirror: &mut RemoteMirror,
        status: AccessStatus,
        user: &str,
    ) -> LogEntry {
        let entry = self.entry(status, user);
        if !entry.clock_valid {
            tracing::warn!(key = %entry.time_key, "wall clock unsynchronized, using fallback log key");
        }

        let paths = mirror.paths().clone();
        mirror
            .push(
                &paths.log_status(&entry.date_key, &entry.time_key),
                status.as_str(),
            )
            .await;
        mirror
            .push(
                &paths.log_user(&entry.date_key, &entry.time_key),
                entry.user.as_str(),
            )
            .await;
        mirror
            .push(&paths.last_updated(), entry.last_updated())
            .await;

        tracing::info!(
            status = status.as_str(),
            user = %entry.user,
            date = %entry.date_key,
            time = %entry.time_key,
            "access logged"
        );
        entry
    }
}
