//! In-process remote store.
//!
//! Stands in for the real-time database in tests and dry runs. Clones share
//! the same state, so a test can keep one handle to play the operator while
//! the controller owns another.

use crate::RemoteStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use warden_core::error::{WardenError, WardenResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    values: BTreeMap<String, Value>,
    offline: bool,
    failing_writes: usize,
    reads: Vec<String>,
    writes: Vec<(String, Value)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets a value as an operator would, without recording it as a write.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.lock().values.insert(path.to_string(), value.into());
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.lock().values.get(path).cloned()
    }

    /// While offline every read and write fails.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Rejects the next `count` writes while reads keep working.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().failing_writes = count;
    }

    /// Paths read so far, in order.
    pub fn reads(&self) -> Vec<String> {
        self.lock().reads.clone()
    }

    /// Writes issued through [`RemoteStore::write`], in order.
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.lock().writes.clone()
    }

    pub fn clear_history(&self) {
        let mut inner = self.lock();
        inner.reads.clear();
        inner.writes.clear();
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn read(&self, path: &str) -> WardenResult<Value> {
        let mut inner = self.lock();
        inner.reads.push(path.to_string());
        if inner.offline {
            return Err(WardenError::Remote(format!("{path}: offline")));
        }
        Ok(inner.values.get(path).cloned().unwrap_or(Value::Null))
    }

    async fn write(&self, path: &str, value: Value) -> WardenResult<()> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(WardenError::Remote(format!("{path}: offline")));
        }
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(WardenError::Remote(format!("{path}: write rejected")));
        }
        inner.writes.push((path.to_string(), value.clone()));
        inner.values.insert(path.to_string(), value);
        Ok(())
    }
}
