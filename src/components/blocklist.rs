//! Shared blocklist matcher.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Read-mostly set of blocked domain names.
///
/// Shared by reference between the cache responder, the resolver and the
/// command handler. A name is blocked if it, or any parent domain, is in
/// the set.
#[derive(Debug, Default)]
pub struct BlocklistMatcher {
    blocked: RwLock<HashSet<String>>,
}

impl BlocklistMatcher {
    /// Creates an empty matcher. Blocklist data is loaded on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a domain to the blocklist. Returns `false` if already present.
    pub fn block(&self, domain: &str) -> bool {
        let mut blocked = self.blocked.write().unwrap_or_else(PoisonError::into_inner);
        blocked.insert(normalize(domain))
    }

    /// Returns `true` if `name` or one of its parent domains is blocked.
    #[must_use]
    pub fn is_blocked(&self, name: &str) -> bool {
        let blocked = self.blocked.read().unwrap_or_else(PoisonError::into_inner);
        let name = normalize(name);
        let mut candidate = name.as_str();
        loop {
            if blocked.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if !parent.is_empty() => candidate = parent,
                _ => return false,
            }
        }
    }

    /// Number of blocked entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocked.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}
