//! Identity name store.
//!
//! A flat `fp_{id}` -> display name map persisted as a JSON object. The
//! enrollment tool writes it; the controller only reads names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use warden_core::error::{WardenError, WardenResult};
use warden_core::types::IdentityId;

/// Read access to display names, keyed by identity.
pub trait IdentityStore: Send {
    fn name(&self, id: IdentityId) -> Option<String>;
}

/// JSON-file backed name store.
#[derive(Debug, Clone, Default)]
pub struct NameStore {
    path: Option<PathBuf>,
    names: BTreeMap<String, String>,
}

impl NameStore {
    /// Opens the store at `path`. A missing file yields an empty store.
    pub fn open(path: &Path) -> WardenResult<Self> {
        let names = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                WardenError::Identity(format!("{} is not a name map: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            names,
        })
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: IdentityId, name: &str) -> WardenResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WardenError::InvalidInput("name must not be blank".into()));
        }
        self.names.insert(id.store_key(), name.to_string());
        Ok(())
    }

    /// Returns `true` if a name was stored for `id`.
    pub fn remove(&mut self, id: IdentityId) -> bool {
        self.names.remove(&id.store_key()).is_some()
    }

    /// All named identities in ascending id order. Keys that are not
    /// `fp_{n}` are skipped.
    pub fn entries(&self) -> Vec<(IdentityId, String)> {
        let mut out: Vec<(IdentityId, String)> = self
            .names
            .iter()
            .filter_map(|(key, name)| {
                let raw = key.strip_prefix("fp_")?.parse::<u16>().ok()?;
                Some((IdentityId::from_sensor(raw), name.clone()))
            })
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Writes the map back to disk via a temporary file and rename.
    pub fn save(&self) -> WardenResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let body = serde_json::to_string_pretty(&self.names)
            .map_err(|e| WardenError::Identity(format!("cannot encode names: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), names = self.names.len(), "name store saved");
        Ok(())
    }
}

impl IdentityStore for NameStore {
    fn name(&self, id: IdentityId) -> Option<String> {
        self.names.get(&id.store_key()).cloned()
    }
}
