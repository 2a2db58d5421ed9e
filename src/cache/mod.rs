//! Rendered-fragment cache
//!
//! Views cache small rendered values (such as an organization's member
//! count) under a key built from the fragment name and the values the
//! fragment varies on. Mutations that change those values delete the key.

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Fragment holding the member count of one organization
pub const ORG_MEMBER_COUNT_FRAGMENT: &str = "org_member_count";

/// Build the cache key for a named fragment and its vary-on values
///
/// `template.cache.<name>.<sha256 of the values joined by ':'>`
pub fn make_template_fragment_key<V: Display>(fragment_name: &str, vary_on: &[V]) -> String {
    let joined = vary_on
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(":");
    let digest = Sha256::digest(joined.as_bytes());
    format!("template.cache.{}.{}", fragment_name, hex::encode(digest))
}

#[derive(Debug, Clone)]
struct CachedFragment {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedFragment {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Concurrent map of fragment key to rendered value
///
/// Each deleted key gets its generation bumped; a value computed before a
/// delete is never stored after it.
#[derive(Debug, Clone, Default)]
pub struct FragmentCache {
    entries: Arc<DashMap<String, CachedFragment>>,
    generations: Arc<DashMap<String, u64>>,
    ttl: Option<Duration>,
}

impl FragmentCache {
    /// `None` keeps entries until they are deleted
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generations: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let fresh = self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.value.clone());

        if fresh.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_fresh());
        }
        fresh
    }

    fn fresh_entry(&self, value: String) -> CachedFragment {
        CachedFragment {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let entry = self.fresh_entry(value.into());
        self.entries.insert(key.into(), entry);
    }

    fn generation(&self, key: &str) -> u64 {
        self.generations.get(key).map_or(0, |g| *g)
    }

    /// Store `value` unless `key` was deleted since `generation` was read
    fn set_if_current(&self, key: &str, value: String, generation: u64) -> bool {
        // Holding the generation shard lock keeps `delete` out until the insert is done
        let current = self.generations.get(key);
        if current.as_ref().map_or(0, |g| **g) != generation {
            return false;
        }
        self.entries.insert(key.to_string(), self.fresh_entry(value));
        true
    }

    /// Returns whether an entry was removed
    pub fn delete(&self, key: &str) -> bool {
        *self.generations.entry(key.to_string()).or_insert(0) += 1;
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Return the cached value, computing and storing it on a miss
    pub async fn get_or_insert_with<F, Fut, E>(&self, key: &str, compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let generation = self.generation(key);
        let value = compute().await?;
        if !self.set_if_current(key, value.clone(), generation) {
            tracing::debug!(key, "fragment deleted while computing; not cached");
        }
        Ok(value)
    }
}
