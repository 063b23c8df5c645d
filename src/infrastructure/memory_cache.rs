// In-memory TTL cache for raw analytics responses
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::application::response_cache::ResponseCache;

struct CacheEntry {
    expires_at: Instant,
    body: Value,
}

/// Mutex-guarded map; expired entries are dropped on access. Concurrent
/// renders sharing a key overwrite each other's immutable snapshots, last
/// writer wins.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: u64) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: u64, body: Value, ttl: Duration) {
        let entry = CacheEntry {
            expires_at: Instant::now() + ttl,
            body,
        };
        self.entries.lock().unwrap().insert(key, entry);
    }
}
