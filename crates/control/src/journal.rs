//! Local NDJSON journal of access decisions and lockout transitions.
//!
//! A derived record kept on the device so history survives remote outages.
//! Each row is serialized straight into a buffered writer and flushed, so a
//! power cut loses at most the row being written.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    Granted,
    Denied,
    LockoutEngaged,
    LockoutReleased,
}

/// One journal line.
#[derive(Debug, Clone, Serialize)]
pub struct JournalRow {
    /// RFC 3339 local time, absent while the wall clock is unsynchronized.
    pub at: Option<String>,
    pub event: JournalEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub failed_attempts: u32,
}

/// NDJSON writer over any `Write`.
pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl<W: Write> JsonStreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(4 * 1024, writer),
            rows_written: 0,
        }
    }

    pub fn write_row(&mut self, row: &JournalRow) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

type BoxedSink = JsonStreamSink<Box<dyn Write + Send>>;

/// Optional journal. Write errors are logged and otherwise ignored.
pub struct Journal {
    sink: Option<BoxedSink>,
}

impl Journal {
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Appends to `path`, creating it if needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!(path = %path.display(), "local journal enabled");
        Ok(Self::to_writer(file))
    }

    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(JsonStreamSink::new(Box::new(writer))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn rows_written(&self) -> usize {
        self.sink.as_ref().map_or(0, |s| s.rows_written())
    }

    pub fn record(&mut self, row: &JournalRow) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.write_row(row) {
            tracing::warn!(error = %e, "journal write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event: JournalEvent, failed_attempts: u32) -> JournalRow {
        JournalRow {
            at: None,
            event,
            identity: None,
            user: None,
            failed_attempts,
        }
    }

    #[test]
    fn rows_are_newline_delimited() {
        let mut buf = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buf);
        sink.write_row(&JournalRow {
            at: Some("2025-09-15T01:35:31+08:00".into()),
            event: JournalEvent::Granted,
            identity: Some(7),
            user: Some("Alice".into()),
            failed_attempts: 0,
        })
        .unwrap();
        sink.write_row(&row(JournalEvent::LockoutEngaged, 3)).unwrap();
        assert_eq!(sink.rows_written(), 2);
        drop(sink);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["event"], "granted");
        assert_eq!(lines[0]["identity"], 7);
        assert_eq!(lines[1]["event"], "lockout_engaged");
        assert!(lines[1].get("user").is_none());
    }

    #[test]
    fn open_appends_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.ndjson");

        Journal::open(&path).unwrap().record(&row(JournalEvent::Denied, 1));
        let mut again = Journal::open(&path).unwrap();
        again.record(&row(JournalEvent::Denied, 2));
        assert_eq!(again.rows_written(), 1);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn disabled_journal_is_silent() {
        let mut j = Journal::disabled();
        j.record(&row(JournalEvent::Denied, 1));
        assert!(!j.is_enabled());
        assert_eq!(j.rows_written(), 0);
    }
}
