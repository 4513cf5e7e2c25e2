//! Upstream resolver: the one collaborator with a teardown hook.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use super::{BlocklistMatcher, DnsCache, Teardown};
use crate::error::SvcError;

#[derive(Debug, Default)]
struct ConnectionState {
    /// Upstream connections currently open.
    open: usize,
    closed: bool,
}

/// Forwards cache misses upstream.
///
/// Connections are opened lazily on first use and all of them are released
/// by [`Teardown::close`]. After close, new leases are refused.
#[derive(Debug)]
pub struct DnsResolver {
    blocklist: Arc<BlocklistMatcher>,
    cache: Arc<DnsCache>,
    upstream: SocketAddr,
    state: Mutex<ConnectionState>,
}

impl DnsResolver {
    /// Creates a resolver over the shared matcher and cache. Opens nothing.
    #[must_use]
    pub fn new(
        blocklist: Arc<BlocklistMatcher>,
        cache: Arc<DnsCache>,
        upstream: SocketAddr,
    ) -> Self {
        Self {
            blocklist,
            cache,
            upstream,
            state: Mutex::new(ConnectionState::default()),
        }
    }

    /// Opens (or reuses) an upstream connection for a request.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::AlreadyClosed`] once the resolver was torn down.
    pub fn lease(&self) -> Result<usize, SvcError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(SvcError::AlreadyClosed(self.name()));
        }
        state.open = state.open.saturating_add(1);
        tracing::trace!(
            upstream = %self.upstream,
            open = state.open,
            "upstream connection leased"
        );
        Ok(state.open)
    }

    /// Number of upstream connections currently open.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).open
    }

    /// Returns `true` once [`Teardown::close`] succeeded.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Upstream address.
    #[must_use]
    pub const fn upstream(&self) -> SocketAddr {
        self.upstream
    }

    /// The shared cache answers are written back to.
    #[must_use]
    pub fn cache(&self) -> &Arc<DnsCache> {
        &self.cache
    }

    /// The shared blocklist.
    #[must_use]
    pub fn blocklist(&self) -> &Arc<BlocklistMatcher> {
        &self.blocklist
    }
}

impl Teardown for DnsResolver {
    fn name(&self) -> &'static str {
        "dns_resolver"
    }

    fn close(&self) -> Result<(), SvcError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(SvcError::AlreadyClosed(self.name()));
        }
        let released = std::mem::take(&mut state.open);
        state.closed = true;
        tracing::debug!(upstream = %self.upstream, released, "resolver closed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn resolver() -> DnsResolver {
        let Ok(cache) = DnsCache::new(4) else {
            panic!("valid capacity");
        };
        DnsResolver::new(
            Arc::new(BlocklistMatcher::new()),
            Arc::new(cache),
            SocketAddr::from(([127, 0, 0, 1], 53)),
        )
    }

    #[test]
    fn construction_opens_nothing() {
        assert_eq!(resolver().open_connections(), 0);
    }

    #[test]
    fn close_releases_connections_once() {
        let resolver = resolver();
        assert!(matches!(resolver.lease(), Ok(1)));
        assert!(matches!(resolver.lease(), Ok(2)));

        assert!(resolver.close().is_ok());
        assert!(resolver.is_closed());
        assert_eq!(resolver.open_connections(), 0);

        let Err(err) = resolver.close() else {
            panic!("second close must report AlreadyClosed");
        };
        assert_eq!(err, SvcError::AlreadyClosed("dns_resolver"));
        assert!(resolver.lease().is_err());
    }
}
