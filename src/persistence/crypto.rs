//! Authenticated encryption of the history blob.
//!
//! Layout: `nonce (24 bytes) || XChaCha20-Poly1305 ciphertext`.

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{KeyInit, XChaCha20Poly1305, XNonce};
use rand::RngCore;

use super::PersistenceError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;

pub type Key = [u8; KEY_LEN];

pub fn generate_key() -> Key {
    let mut key = [0u8; KEY_LEN];
    rand::rng().fill_bytes(&mut key);
    key
}

pub fn seal(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>, PersistenceError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| PersistenceError::Encrypt)?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| PersistenceError::Encrypt)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

pub fn open(key: &Key, blob: &[u8]) -> Result<Vec<u8>, PersistenceError> {
    if blob.len() < NONCE_LEN {
        return Err(PersistenceError::Decrypt);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = XChaCha20Poly1305::new_from_slice(key).map_err(|_| PersistenceError::Decrypt)?;
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| PersistenceError::Decrypt)
}
