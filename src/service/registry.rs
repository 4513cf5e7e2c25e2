//! Exactly-once construction of the singleton collaborators.
//!
//! [`ServiceRegistry`] moves through a small state machine driven by the
//! `ready` topic:
//!
//! ```text
//! Uninitialized ──CAS──► Initializing ──► Ready   (publishes `steady`)
//!       │                             └─► Failed  (instance unusable)
//!       └──halt──► Stopped                        (`stop` came first)
//! ```
//!
//! Only the caller that wins the compare-and-swap out of `Uninitialized`
//! runs construction. Every other trigger, concurrent or later, is a no-op.
//! `steady` is never published once `stop` has fired.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::factory::{ServiceFactory, ServiceSettings, Services};
use crate::domain::{EventBus, InstanceId, Topic};
use crate::error::SvcError;

/// Construction state of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ServiceState {
    /// `ready` has not been handled yet.
    Uninitialized = 0,
    /// Construction is running.
    Initializing = 1,
    /// All collaborators are built and `steady` was published.
    Ready = 2,
    /// A constructor failed; the instance must not serve requests.
    Failed = 3,
    /// `stop` fired before construction started; nothing will be built.
    Stopped = 4,
}

impl ServiceState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::Stopped,
        }
    }
}

type Outcome = Option<Result<Arc<Services>, SvcError>>;

/// Owner of the collaborator slots for one process instance.
#[derive(Debug)]
pub struct ServiceRegistry {
    instance_id: InstanceId,
    state: AtomicU8,
    bus: EventBus,
    factory: Arc<dyn ServiceFactory>,
    settings: ServiceSettings,
    outcome: watch::Sender<Outcome>,
}

impl ServiceRegistry {
    /// Creates an uninitialized registry. Nothing is built until
    /// [`ServiceRegistry::initialize`] runs.
    #[must_use]
    pub fn new(
        instance_id: InstanceId,
        bus: EventBus,
        factory: Arc<dyn ServiceFactory>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            instance_id,
            state: AtomicU8::new(ServiceState::Uninitialized as u8),
            bus,
            factory,
            settings,
            outcome: watch::channel(None).0,
        }
    }

    /// Spawns the task that waits for `ready` and then initializes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let ready = self.bus.subscribe(&Topic::READY);
        tokio::spawn(async move {
            ready.wait().await;
            if let Err(err) = registry.initialize() {
                tracing::debug!(
                    instance_id = %registry.instance_id,
                    code = err.error_code(),
                    "ready listener done, construction failed"
                );
            }
        })
    }

    /// Builds every collaborator and publishes `steady`, once.
    ///
    /// Returns `Ok(true)` if this call performed construction and
    /// `Ok(false)` if construction had already been claimed or the registry
    /// was halted. If `stop` fires while construction runs, the services are
    /// still recorded for teardown but `steady` is withheld.
    ///
    /// # Errors
    ///
    /// Returns the constructor error if this call performed construction
    /// and a collaborator failed. The registry is then `Failed`.
    pub fn initialize(&self) -> Result<bool, SvcError> {
        if let Err(current) = self.state.compare_exchange(
            ServiceState::Uninitialized as u8,
            ServiceState::Initializing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            tracing::debug!(
                instance_id = %self.instance_id,
                state = ?ServiceState::from_u8(current),
                "duplicate ready, construction skipped"
            );
            return Ok(false);
        }

        tracing::info!(instance_id = %self.instance_id, "system ready, constructing services");

        match Services::build(self.factory.as_ref(), self.settings) {
            Ok(services) => {
                self.outcome.send_replace(Some(Ok(Arc::new(services))));
                self.state.store(ServiceState::Ready as u8, Ordering::Release);
                if self.bus.publish_unless(&Topic::STEADY, None, &Topic::STOP) {
                    tracing::info!(instance_id = %self.instance_id, "services steady");
                } else {
                    tracing::info!(
                        instance_id = %self.instance_id,
                        "stop fired during construction, steady withheld"
                    );
                }
                Ok(true)
            }
            Err(err) => {
                self.state.store(ServiceState::Failed as u8, Ordering::Release);
                tracing::error!(
                    instance_id = %self.instance_id,
                    code = err.error_code(),
                    error = %err,
                    "service construction failed, instance unusable"
                );
                self.outcome.send_replace(Some(Err(err.clone())));
                Err(err)
            }
        }
    }

    /// Moves an untouched registry to `Stopped` so a later `ready` builds
    /// nothing. Returns the state the registry is in afterwards.
    ///
    /// A registry already past `Uninitialized` is left as it is; the
    /// caller awaits [`ServiceRegistry::settled`] if it is `Initializing`.
    pub fn halt(&self) -> ServiceState {
        match self.state.compare_exchange(
            ServiceState::Uninitialized as u8,
            ServiceState::Stopped as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::debug!(instance_id = %self.instance_id, "halted before ready");
                self.outcome.send_replace(Some(Err(SvcError::Unusable(
                    "stopped before ready".to_string(),
                ))));
                ServiceState::Stopped
            }
            Err(current) => ServiceState::from_u8(current),
        }
    }

    /// Waits until construction has either succeeded or failed.
    ///
    /// Never resolves if `ready` never fires and the registry is not halted.
    ///
    /// # Errors
    ///
    /// Returns the construction error if the registry is `Failed`, or
    /// [`SvcError::Unusable`] if it was halted before `ready`.
    pub async fn settled(&self) -> Result<Arc<Services>, SvcError> {
        let mut rx = self.outcome.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        match outcome {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    /// Returns the collaborators if the registry is `Ready`.
    #[must_use]
    pub fn services(&self) -> Option<Arc<Services>> {
        match self.outcome.borrow().as_ref() {
            Some(Ok(services)) => Some(Arc::clone(services)),
            _ => None,
        }
    }

    /// Current construction state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` once construction succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ServiceState::Ready
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::components::BlocklistMatcher;
    use crate::config::SvcConfig;

    /// Counts blocklist constructions and optionally fails the user store.
    #[derive(Debug, Default)]
    struct CountingFactory {
        built: AtomicUsize,
        fail_user_op: bool,
    }

    impl ServiceFactory for CountingFactory {
        fn blocklist(&self) -> Result<Arc<BlocklistMatcher>, SvcError> {
            self.built.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(BlocklistMatcher::new()))
        }

        fn user_op(&self) -> Result<Arc<crate::components::UserOp>, SvcError> {
            if self.fail_user_op {
                return Err(SvcError::construction("user_op", "bad stamp"));
            }
            Ok(Arc::new(crate::components::UserOp::new()))
        }
    }

    fn registry(factory: Arc<CountingFactory>) -> Arc<ServiceRegistry> {
        Arc::new(ServiceRegistry::new(
            InstanceId::new(),
            EventBus::new(),
            factory,
            ServiceSettings::from(&SvcConfig::default()),
        ))
    }

    #[tokio::test]
    async fn initialize_runs_once() {
        let factory = Arc::new(CountingFactory::default());
        let registry = registry(Arc::clone(&factory));

        assert_eq!(registry.state(), ServiceState::Uninitialized);
        assert!(matches!(registry.initialize(), Ok(true)));
        assert!(matches!(registry.initialize(), Ok(false)));

        assert_eq!(factory.built.load(Ordering::SeqCst), 1);
        assert!(registry.is_ready());
        assert!(registry.bus.is_fired(&Topic::STEADY));
        assert!(registry.services().is_some());
    }

    #[tokio::test]
    async fn repeated_ready_builds_once() {
        let factory = Arc::new(CountingFactory::default());
        let registry = registry(Arc::clone(&factory));
        let _listener = registry.listen();
        let second = registry.listen();

        registry.bus.publish(&Topic::READY, None);
        registry.bus.publish(&Topic::READY, None);
        let _ = second.await;

        let Ok(services) = registry.settled().await else {
            panic!("construction must succeed");
        };
        assert_eq!(factory.built.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&services.blocklist, services.resolver.blocklist()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_initialize_single_winner() {
        let factory = Arc::new(CountingFactory::default());
        let registry = registry(Arc::clone(&factory));

        let calls: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.initialize() })
            })
            .collect();
        let mut winners = 0;
        for call in calls {
            if matches!(call.await, Ok(Ok(true))) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(factory.built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_construction_never_publishes_steady() {
        let factory = Arc::new(CountingFactory {
            fail_user_op: true,
            ..CountingFactory::default()
        });
        let registry = registry(Arc::clone(&factory));

        let Err(err) = registry.initialize() else {
            panic!("user_op failure must surface");
        };
        assert_eq!(err.error_code(), 3001);
        assert_eq!(registry.state(), ServiceState::Failed);
        assert!(!registry.bus.is_fired(&Topic::STEADY));
        assert!(registry.services().is_none());
        assert_eq!(registry.settled().await.err(), Some(err));

        // A later ready does not retry.
        assert!(matches!(registry.initialize(), Ok(false)));
        assert_eq!(factory.built.load(Ordering::SeqCst), 1);
        assert_eq!(registry.halt(), ServiceState::Failed);
    }

    #[tokio::test]
    async fn halted_registry_never_builds() {
        let factory = Arc::new(CountingFactory::default());
        let registry = registry(Arc::clone(&factory));

        assert_eq!(registry.halt(), ServiceState::Stopped);
        assert_eq!(registry.halt(), ServiceState::Stopped);
        assert!(matches!(registry.initialize(), Ok(false)));

        assert_eq!(factory.built.load(Ordering::SeqCst), 0);
        assert!(registry.services().is_none());
        assert!(!registry.bus.is_fired(&Topic::STEADY));
        assert!(matches!(
            registry.settled().await,
            Err(SvcError::Unusable(_))
        ));
    }

    #[test]
    fn steady_withheld_when_stop_fired_during_construction() {
        let factory = Arc::new(CountingFactory::default());
        let registry = registry(Arc::clone(&factory));
        // Stop fired but the registry was not halted yet.
        registry.bus.publish(&Topic::STOP, None);

        assert!(matches!(registry.initialize(), Ok(true)));
        assert!(registry.services().is_some());
        assert!(!registry.bus.is_fired(&Topic::STEADY));
    }
}
