//! Singleton collaborators built by the [`crate::service::ServiceRegistry`].
//!
//! These are the boundary types the lifecycle layer constructs and tears
//! down. Construction is synchronous and cheap; anything that needs the
//! network or timers is deferred to first use, because async work is only
//! permitted while a request is being serviced.

pub mod blocklist;
pub mod cache;
pub mod command_control;
pub mod resolver;
pub mod user_op;

pub use blocklist::BlocklistMatcher;
pub use cache::{CacheAnswer, DnsCache, DnsCacheResponder};
pub use command_control::CommandControl;
pub use resolver::DnsResolver;
pub use user_op::UserOp;

use crate::error::SvcError;

/// A collaborator that owns a long-lived external resource.
///
/// The [`crate::service::ShutdownCoordinator`] invokes [`Teardown::close`]
/// at most once per instance when `stop` fires.
pub trait Teardown: Send + Sync {
    /// Name used in logs and the teardown report.
    fn name(&self) -> &'static str;

    /// Releases the resource.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::AlreadyClosed`] on a repeated call, or
    /// [`SvcError::Teardown`] if the resource could not be released.
    fn close(&self) -> Result<(), SvcError>;
}
