//! Where the history encryption key lives.

use keyring::Entry;
use std::sync::{Mutex, PoisonError};

use super::PersistenceError;
use super::crypto::{KEY_LEN, Key, generate_key};

pub const KEYRING_SERVICE: &str = "cliplens";
const KEYRING_USER: &str = "history-key";

/// Supplies the symmetric history key, creating it on first use.
pub trait KeyStore: Send + Sync {
    fn key(&self) -> Result<Key, PersistenceError>;
}

/// Key held in the platform credential store (Keychain, Credential Manager,
/// Secret Service).
pub struct KeyringKeyStore {
    service: String,
    user: String,
}

impl Default for KeyringKeyStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringKeyStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: KEYRING_USER.to_string(),
        }
    }
}

impl KeyStore for KeyringKeyStore {
    fn key(&self) -> Result<Key, PersistenceError> {
        let entry = Entry::new(&self.service, &self.user)?;
        match entry.get_secret() {
            Ok(secret) => Key::try_from(secret.as_slice()).map_err(|_| {
                PersistenceError::Keystore(format!(
                    "stored key has {} bytes, expected {KEY_LEN}",
                    secret.len()
                ))
            }),
            Err(keyring::Error::NoEntry) => {
                let key = generate_key();
                entry.set_secret(&key)?;
                tracing::info!(service = %self.service, "created history encryption key");
                Ok(key)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Key held in memory only; files it encrypts are unreadable after exit.
#[derive(Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<Key>>,
}

impl MemoryKeyStore {
    pub fn with_key(key: Key) -> Self {
        Self {
            key: Mutex::new(Some(key)),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn key(&self) -> Result<Key, PersistenceError> {
        let mut key = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(*key.get_or_insert_with(generate_key))
    }
}
