//! Shared DNS answer cache and the responder that serves from it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::BlocklistMatcher;
use crate::error::SvcError;

/// Bounded store of raw DNS answers keyed by query name.
///
/// Once full, new entries are refused; eviction belongs to a later layer.
#[derive(Debug)]
pub struct DnsCache {
    capacity: usize,
    entries: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl DnsCache {
    /// Creates an empty cache holding at most `capacity` answers.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, SvcError> {
        if capacity == 0 {
            return Err(SvcError::construction(
                "dns_cache",
                "capacity must be positive",
            ));
        }
        Ok(Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Stores an answer. Returns `false` if the cache is full.
    pub fn put(&self, name: &str, answer: impl Into<Arc<[u8]>>) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity && !entries.contains_key(name) {
            tracing::trace!(name, capacity = self.capacity, "dns cache full");
            return false;
        }
        entries.insert(name.to_string(), answer.into());
        true
    }

    /// Returns the cached answer for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<[u8]>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).cloned()
    }

    /// Maximum number of answers.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Result of consulting the cache responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheAnswer {
    /// The name is on the blocklist.
    Blocked,
    /// A cached answer exists.
    Hit(Arc<[u8]>),
    /// Nothing cached; the resolver must go upstream.
    Miss,
}

/// Answers queries from the shared cache, honoring the blocklist.
#[derive(Debug)]
pub struct DnsCacheResponder {
    blocklist: Arc<BlocklistMatcher>,
    cache: Arc<DnsCache>,
}

impl DnsCacheResponder {
    /// Creates a responder over the shared matcher and cache.
    #[must_use]
    pub fn new(blocklist: Arc<BlocklistMatcher>, cache: Arc<DnsCache>) -> Self {
        Self { blocklist, cache }
    }

    /// Looks `name` up without leaving the process.
    #[must_use]
    pub fn lookup(&self, name: &str) -> CacheAnswer {
        if self.blocklist.is_blocked(name) {
            return CacheAnswer::Blocked;
        }
        self.cache.get(name).map_or(CacheAnswer::Miss, CacheAnswer::Hit)
    }

    /// The cache this responder reads.
    #[must_use]
    pub fn cache(&self) -> &Arc<DnsCache> {
        &self.cache
    }

    /// The blocklist this responder consults.
    #[must_use]
    pub fn blocklist(&self) -> &Arc<BlocklistMatcher> {
        &self.blocklist
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let Err(err) = DnsCache::new(0) else {
            panic!("zero capacity must fail");
        };
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn full_cache_refuses_new_names() {
        let Ok(cache) = DnsCache::new(1) else {
            panic!("valid capacity");
        };
        assert!(cache.put("a.test", vec![1u8]));
        assert!(!cache.put("b.test", vec![2u8]));
        assert!(cache.put("a.test", vec![3u8]));
        assert_eq!(cache.get("a.test").as_deref(), Some(&[3u8][..]));
    }

    #[test]
    fn responder_checks_blocklist_before_cache() {
        let blocklist = Arc::new(BlocklistMatcher::new());
        let Ok(cache) = DnsCache::new(8) else {
            panic!("valid capacity");
        };
        let cache = Arc::new(cache);
        cache.put("ads.test", vec![9u8]);
        cache.put("ok.test", vec![7u8]);
        blocklist.block("ads.test");

        let responder = DnsCacheResponder::new(Arc::clone(&blocklist), Arc::clone(&cache));
        assert_eq!(responder.lookup("ads.test"), CacheAnswer::Blocked);
        assert!(matches!(responder.lookup("ok.test"), CacheAnswer::Hit(_)));
        assert_eq!(responder.lookup("none.test"), CacheAnswer::Miss);
    }
}
