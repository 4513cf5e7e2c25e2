//! Administrative command handler.

use std::sync::Arc;

use super::BlocklistMatcher;

/// Handles administrative commands against the shared blocklist.
///
/// Only the construction contract lives here; command routing is layered
/// on top by the request handlers.
#[derive(Debug)]
pub struct CommandControl {
    blocklist: Arc<BlocklistMatcher>,
}

impl CommandControl {
    /// Creates a handler over the shared matcher.
    #[must_use]
    pub fn new(blocklist: Arc<BlocklistMatcher>) -> Self {
        Self { blocklist }
    }

    /// The shared blocklist commands operate on.
    #[must_use]
    pub fn blocklist(&self) -> &Arc<BlocklistMatcher> {
        &self.blocklist
    }
}
