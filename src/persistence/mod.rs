//! Encrypted, versioned and debounced storage of the clipboard history.

pub mod crypto;
mod debounce;
mod error;
mod history;
mod keystore;
mod persister;

pub use debounce::{DEFAULT_DEBOUNCE, spawn_debounced};
pub use error::PersistenceError;
pub use history::{CURRENT_VERSION, HistoryStore, PersistedHistory};
pub use keystore::{KEYRING_SERVICE, KeyStore, KeyringKeyStore, MemoryKeyStore};
pub use persister::Persister;
