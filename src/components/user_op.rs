//! Per-user configuration store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Parsed per-user settings, keyed by the user's access token.
///
/// Settings are filled on demand by request handlers; construction only
/// allocates the empty map.
#[derive(Debug, Default)]
pub struct UserOp {
    users: Mutex<HashMap<String, Arc<str>>>,
}

impl UserOp {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the settings for `user`, parsing and storing them with
    /// `load` on first sight.
    pub fn get_or_load(&self, user: &str, load: impl FnOnce() -> String) -> Arc<str> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = users
            .entry(user.to_string())
            .or_insert_with(|| Arc::from(load()));
        Arc::clone(entry)
    }

    /// Number of users seen by this instance.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no user has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_user_once() {
        let users = UserOp::new();
        let first = users.get_or_load("alice", || "flags=1".to_string());
        let second = users.get_or_load("alice", || "flags=2".to_string());
        assert_eq!(&*first, "flags=1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(users.len(), 1);
    }
}
