//! Collaborator constructors and the bundle they produce.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::components::{
    BlocklistMatcher, CommandControl, DnsCache, DnsCacheResponder, DnsResolver, Teardown, UserOp,
};
use crate::config::SvcConfig;
use crate::error::SvcError;

/// Settings the collaborators need at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Capacity of the shared cache.
    pub cache_size: usize,
    /// Upstream resolver address.
    pub upstream: SocketAddr,
}

impl From<&SvcConfig> for ServiceSettings {
    fn from(config: &SvcConfig) -> Self {
        Self {
            cache_size: config.cache_size,
            upstream: config.upstream,
        }
    }
}

/// Builds each collaborator from its declared dependencies.
///
/// The registry calls these in dependency order, leaves first, and stops
/// at the first error. Every method has a default that builds the real
/// collaborator, so an implementation only overrides what it needs.
///
/// All methods must be synchronous and cheap: they run while the hosting
/// environment may not yet allow timers or network I/O.
pub trait ServiceFactory: fmt::Debug + Send + Sync {
    /// Builds the shared blocklist matcher.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if the matcher cannot be built.
    fn blocklist(&self) -> Result<Arc<BlocklistMatcher>, SvcError> {
        Ok(Arc::new(BlocklistMatcher::new()))
    }

    /// Builds the shared cache.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if `capacity` is zero.
    fn cache(&self, capacity: usize) -> Result<Arc<DnsCache>, SvcError> {
        DnsCache::new(capacity).map(Arc::new)
    }

    /// Builds the cache responder over the shared matcher and cache.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if the responder cannot be built.
    fn cache_responder(
        &self,
        blocklist: &Arc<BlocklistMatcher>,
        cache: &Arc<DnsCache>,
    ) -> Result<Arc<DnsCacheResponder>, SvcError> {
        Ok(Arc::new(DnsCacheResponder::new(
            Arc::clone(blocklist),
            Arc::clone(cache),
        )))
    }

    /// Builds the resolver over the shared matcher and cache.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if the resolver cannot be built.
    fn resolver(
        &self,
        blocklist: &Arc<BlocklistMatcher>,
        cache: &Arc<DnsCache>,
        upstream: SocketAddr,
    ) -> Result<Arc<DnsResolver>, SvcError> {
        Ok(Arc::new(DnsResolver::new(
            Arc::clone(blocklist),
            Arc::clone(cache),
            upstream,
        )))
    }

    /// Builds the per-user configuration store.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if the store cannot be built.
    fn user_op(&self) -> Result<Arc<UserOp>, SvcError> {
        Ok(Arc::new(UserOp::new()))
    }

    /// Builds the command handler over the shared matcher.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Construction`] if the handler cannot be built.
    fn command_control(
        &self,
        blocklist: &Arc<BlocklistMatcher>,
    ) -> Result<Arc<CommandControl>, SvcError> {
        Ok(Arc::new(CommandControl::new(Arc::clone(blocklist))))
    }
}

/// Factory that builds the real collaborators.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultServiceFactory;

impl ServiceFactory for DefaultServiceFactory {}

/// The fully constructed collaborators of one process instance.
///
/// Only ever observed complete: the registry publishes it after every
/// slot was filled.
#[derive(Debug)]
pub struct Services {
    /// Shared blocklist matcher.
    pub blocklist: Arc<BlocklistMatcher>,
    /// Shared answer cache.
    pub cache: Arc<DnsCache>,
    /// Serves answers from `cache`.
    pub cache_responder: Arc<DnsCacheResponder>,
    /// Forwards misses upstream.
    pub resolver: Arc<DnsResolver>,
    /// Per-user configuration.
    pub user_op: Arc<UserOp>,
    /// Administrative commands.
    pub command_control: Arc<CommandControl>,
}

impl Services {
    /// Builds every collaborator in dependency order.
    ///
    /// # Errors
    ///
    /// Returns the first constructor error; nothing built so far is kept.
    pub fn build(
        factory: &dyn ServiceFactory,
        settings: ServiceSettings,
    ) -> Result<Self, SvcError> {
        let blocklist = factory.blocklist()?;
        let cache = factory.cache(settings.cache_size)?;

        let cache_responder = factory.cache_responder(&blocklist, &cache)?;
        let resolver = factory.resolver(&blocklist, &cache, settings.upstream)?;

        let user_op = factory.user_op()?;

        let command_control = factory.command_control(&blocklist)?;

        Ok(Self {
            blocklist,
            cache,
            cache_responder,
            resolver,
            user_op,
            command_control,
        })
    }

    /// Collaborators holding long-lived external resources.
    #[must_use]
    pub fn teardown_hooks(&self) -> Vec<Arc<dyn Teardown>> {
        vec![Arc::clone(&self.resolver) as Arc<dyn Teardown>]
    }
}
