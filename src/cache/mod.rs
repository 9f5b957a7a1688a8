//! Content-fingerprint cache of structured processing results.
//!
//! Results depend on the active model, so the whole cache is dropped whenever
//! the generation backend changes.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::provider::{ProcessedResult, RequestType};

pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Hash of whitespace-normalized text.
///
/// Two captures that differ only in surrounding or repeated whitespace share
/// a fingerprint.
pub fn fingerprint(text: &str) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

fn cache_key(text: &str, request: &RequestType) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint(text).as_bytes());
    hasher.update(request.cache_tag().as_bytes());
    hex::encode(hasher.finalize())
}

struct Entries {
    order: VecDeque<String>,
    results: HashMap<String, ProcessedResult>,
}

pub struct ResultCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries {
                order: VecDeque::new(),
                results: HashMap::new(),
            }),
        }
    }

    pub fn get(&self, text: &str, request: &RequestType) -> Option<ProcessedResult> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.results.get(&cache_key(text, request)).cloned()
    }

    pub fn put(&self, text: &str, request: &RequestType, result: ProcessedResult) {
        let key = cache_key(text, request);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.results.insert(key.clone(), result).is_none() {
            entries.order.push_back(key);
        }
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.results.remove(&oldest);
            }
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.order.clear();
        entries.results.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .results
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
