//! Per-instance lifecycle context handed to request-handling code.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::SvcConfig;
use crate::domain::signal::REASON_HOST;
use crate::domain::{EventBus, InstanceId, Signal, Topic};
use crate::error::SvcError;
use crate::service::{
    IdleShutdownTimer, ServiceFactory, ServiceRegistry, ServiceSettings, Services,
    ShutdownCoordinator,
};

/// Everything one process instance needs to bootstrap, serve and stop.
///
/// Built once per instance and shared by reference (`Arc<AppState>`) with
/// request handlers. Construction wires the `ready` and `stop` listeners;
/// dropping the state aborts them.
#[derive(Debug)]
pub struct AppState {
    instance_id: InstanceId,
    bus: EventBus,
    registry: Arc<ServiceRegistry>,
    idle_timer: IdleShutdownTimer,
    shutdown: Arc<ShutdownCoordinator>,
    listeners: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Creates the context and starts listening for `ready` and `stop`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(config: &SvcConfig, factory: Arc<dyn ServiceFactory>) -> Self {
        let instance_id = InstanceId::new();
        let bus = EventBus::new();

        let registry = Arc::new(ServiceRegistry::new(
            instance_id,
            bus.clone(),
            factory,
            ServiceSettings::from(config),
        ));
        let shutdown = Arc::new(ShutdownCoordinator::new(
            instance_id,
            bus.clone(),
            Arc::clone(&registry),
        ));
        let idle_timer = IdleShutdownTimer::new(bus.clone());

        let listeners = vec![registry.listen(), shutdown.listen()];
        tracing::debug!(%instance_id, "lifecycle listeners installed");

        Self {
            instance_id,
            bus,
            registry,
            idle_timer,
            shutdown,
            listeners,
        }
    }

    /// Start hook: signals `ready` and waits for construction to settle.
    ///
    /// Calling it again is harmless and returns the same outcome.
    ///
    /// # Errors
    ///
    /// Returns the construction error if a collaborator failed to build,
    /// or [`SvcError::Unusable`] if `stop` was handled before `ready`.
    pub async fn start(&self) -> Result<Arc<Services>, SvcError> {
        self.bus.publish(&Topic::READY, None);
        self.registry.settled().await
    }

    /// Stop hook: signals `stop` with `reason`. Returns `true` if this call
    /// fired it.
    pub fn stop(&self, reason: Option<&str>) -> bool {
        let reason = reason.unwrap_or(REASON_HOST);
        self.bus.publish(&Topic::STOP, Some(reason.to_string()))
    }

    /// Waits for `steady` and returns the collaborators.
    ///
    /// Request handlers must not dispatch resolution before this resolves.
    /// Never resolves if construction failed; use [`AppState::start`] to
    /// observe the failure.
    ///
    /// # Errors
    ///
    /// Returns [`SvcError::Unusable`] if `steady` was published by someone
    /// other than the registry before construction finished.
    pub async fn wait_steady(&self) -> Result<Arc<Services>, SvcError> {
        self.bus.when(&Topic::STEADY).await;
        self.registry.services().ok_or_else(|| {
            SvcError::Unusable(format!(
                "steady observed in state {:?}",
                self.registry.state()
            ))
        })
    }

    /// Defers automatic shutdown by `duration_ms`. Call after each request.
    pub fn renew_idle_timeout(&self, duration_ms: i64) -> bool {
        self.idle_timer.renew(duration_ms)
    }

    /// Cancels the pending idle timer. Returns `true` if one was pending.
    pub fn cancel_idle_timeout(&self) -> bool {
        self.idle_timer.cancel()
    }

    /// Waits until teardown has finished.
    pub async fn wait_closed(&self) -> Signal {
        self.bus.when(&Topic::CLOSED).await
    }

    /// Identifier of this process instance.
    #[must_use]
    pub const fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// The instance's event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The collaborator registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// The shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::DefaultServiceFactory;

    #[tokio::test]
    async fn start_twice_builds_once() {
        let state = AppState::new(&SvcConfig::default(), Arc::new(DefaultServiceFactory));
        let Ok(first) = state.start().await else {
            panic!("start must succeed");
        };
        let Ok(second) = state.start().await else {
            panic!("second start must succeed");
        };
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn start_surfaces_construction_failure() {
        let config = SvcConfig {
            cache_size: 0,
            ..SvcConfig::default()
        };
        let state = AppState::new(&config, Arc::new(DefaultServiceFactory));
        let Err(err) = state.start().await else {
            panic!("zero cache size must fail");
        };
        assert!(matches!(err, SvcError::Construction { .. }));
        assert!(!state.bus().is_fired(&Topic::STEADY));
    }

    #[tokio::test]
    async fn stop_hook_defaults_to_host_reason() {
        let state = AppState::new(&SvcConfig::default(), Arc::new(DefaultServiceFactory));
        assert!(state.stop(None));
        assert!(!state.stop(Some("late")));
        let closed = state.wait_closed().await;
        assert_eq!(closed.detail(), Some(REASON_HOST));
    }
}
