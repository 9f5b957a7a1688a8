use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::crypto::{open, seal};
use super::{KeyStore, PersistenceError};
use crate::fs::{atomic_write, remove_if_exists};
use crate::item::ClipboardItem;
use crate::store::{HistorySnapshot, PasteHistory};

/// Envelope version written by this build. Older files are still read.
pub const CURRENT_VERSION: u32 = 3;

/// Plaintext schema of the history file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedHistory {
    pub version: u32,
    #[serde(default)]
    pub items: Vec<ClipboardItem>,
    #[serde(default)]
    pub paste_history: PasteHistory,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedHistoryRef<'a> {
    version: u32,
    items: &'a [ClipboardItem],
    paste_history: &'a PasteHistory,
}

impl From<PersistedHistory> for HistorySnapshot {
    fn from(history: PersistedHistory) -> Self {
        Self {
            items: history.items,
            paste_history: history.paste_history,
        }
    }
}

/// The encrypted history file. Calls block; run them off the async runtime.
pub struct HistoryStore {
    path: PathBuf,
    keystore: Arc<dyn KeyStore>,
}

impl HistoryStore {
    pub fn new(path: PathBuf, keystore: Arc<dyn KeyStore>) -> Self {
        Self { path, keystore }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypts and atomically replaces the history file.
    pub fn save(&self, snapshot: &HistorySnapshot) -> Result<(), PersistenceError> {
        let plaintext = serde_json::to_vec(&PersistedHistoryRef {
            version: CURRENT_VERSION,
            items: &snapshot.items,
            paste_history: &snapshot.paste_history,
        })?;
        let blob = seal(&self.keystore.key()?, &plaintext)?;
        atomic_write(&self.path, &blob)?;
        tracing::debug!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            bytes = blob.len(),
            "history saved"
        );
        Ok(())
    }

    /// Reads the history file. `Ok(None)` when there is no file yet.
    pub fn try_load(&self) -> Result<Option<PersistedHistory>, PersistenceError> {
        let blob = match std::fs::read(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let plaintext = open(&self.keystore.key()?, &blob)?;
        let history: PersistedHistory = serde_json::from_slice(&plaintext)?;

        if history.version > CURRENT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: history.version,
                supported: CURRENT_VERSION,
            });
        }
        if history.version < CURRENT_VERSION {
            tracing::info!(from = history.version, to = CURRENT_VERSION, "upgrading history format");
        }
        Ok(Some(history))
    }

    /// Like [`Self::try_load`], but never fails.
    ///
    /// An unreadable file yields an empty history and stays on disk untouched,
    /// so it can still be recovered by hand; the next save replaces it.
    pub fn load(&self) -> HistorySnapshot {
        match self.try_load() {
            Ok(Some(history)) => history.into(),
            Ok(None) => HistorySnapshot::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read history, starting empty");
                HistorySnapshot::default()
            }
        }
    }

    /// Deletes the history file. In-memory state is the caller's concern.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        remove_if_exists(&self.path)?;
        tracing::info!(path = %self.path.display(), "history file deleted");
        Ok(())
    }
}
