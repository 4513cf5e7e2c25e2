//! Process-instance identifier.
//!
//! [`InstanceId`] is a newtype wrapper around [`uuid::Uuid`] (v4) tagging
//! every log line and teardown report emitted by one process instance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a process instance.
///
/// Generated once when the [`crate::app_state::AppState`] is built and
/// immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(uuid::Uuid);

impl InstanceId {
    /// Creates a new random `InstanceId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(InstanceId::new(), InstanceId::new());
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = InstanceId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
