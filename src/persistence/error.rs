use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("failed to encrypt history")]
    Encrypt,

    /// Wrong key or corrupted file.
    #[error("failed to decrypt history")]
    Decrypt,

    #[error("history is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("history version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl From<keyring::Error> for PersistenceError {
    fn from(err: keyring::Error) -> Self {
        Self::Keystore(err.to_string())
    }
}
