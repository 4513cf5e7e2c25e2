//! Lifecycle error types with numeric code mapping.
//!
//! [`SvcError`] is the central error type for the lifecycle layer. Each
//! variant carries a stable numeric code so operators can grep logs for a
//! failure class without parsing messages.

/// Errors raised by the lifecycle layer and its collaborators.
///
/// # Error Code Ranges
///
/// | Range     | Category                      |
/// |-----------|-------------------------------|
/// | 1000–1999 | Configuration / validation    |
/// | 2000–2999 | Lifecycle state               |
/// | 3000–3999 | Collaborator construction / teardown |
///
/// The type is `Clone` because a single construction failure is handed to
/// every caller waiting on [`crate::service::ServiceRegistry::settled`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SvcError {
    /// An environment setting could not be parsed.
    #[error("invalid config {key}: {reason}")]
    InvalidConfig {
        /// Name of the offending environment variable.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The instance failed to bootstrap, or was stopped first, and cannot
    /// serve requests.
    #[error("service instance unusable: {0}")]
    Unusable(String),

    /// A collaborator constructor returned an error.
    #[error("failed to construct {service}: {reason}")]
    Construction {
        /// Slot name of the collaborator that failed.
        service: &'static str,
        /// Underlying failure description.
        reason: String,
    },

    /// A teardown hook failed while releasing its resources.
    #[error("teardown of {service} failed: {reason}")]
    Teardown {
        /// Name of the collaborator being torn down.
        service: &'static str,
        /// Underlying failure description.
        reason: String,
    },

    /// A collaborator was closed more than once.
    #[error("{0} already closed")]
    AlreadyClosed(&'static str),
}

impl SvcError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidConfig { .. } => 1001,
            Self::Unusable(_) => 2001,
            Self::Construction { .. } => 3001,
            Self::Teardown { .. } => 3002,
            Self::AlreadyClosed(_) => 3003,
        }
    }

    /// Shorthand for a [`SvcError::Construction`] failure.
    #[must_use]
    pub fn construction(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Construction {
            service,
            reason: reason.into(),
        }
    }
}
